use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::blank::BlankContext;

/// A finished segment as kept in the story history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorySegment {
    pub id: Uuid,
    /// Final prompt, with any blank already filled in.
    pub target_text: String,
    pub typed_text: String,
    pub filled_word: Option<String>,
    pub finished_at: DateTime<Utc>,
}

/// The segment currently being typed.
pub struct SegmentState {
    pub target: String,
    pub typed: String,
    pub blank: Option<BlankContext>,
    pub filled_word: Option<String>,
    /// Cumulative mistake count when this segment was loaded.
    pub mistakes_at_start: usize,
}

impl SegmentState {
    pub fn new(text: &str, mistakes_at_start: usize) -> Self {
        let blank = BlankContext::detect(text);
        Self {
            target: text.to_string(),
            typed: String::new(),
            blank,
            filled_word: None,
            mistakes_at_start,
        }
    }

    pub fn target_len(&self) -> usize {
        self.target.chars().count()
    }

    pub fn typed_len(&self) -> usize {
        self.typed.chars().count()
    }

    /// An open blank keeps the segment going even when the word typed so
    /// far reaches the end of the target.
    pub fn is_complete(&self) -> bool {
        self.blank.is_none() && self.typed_len() >= self.target_len()
    }

    pub fn progress(&self) -> f64 {
        let total = self.target_len();
        if total == 0 {
            return 0.0;
        }
        self.typed_len() as f64 / total as f64
    }

    /// Store the effective target and typed text for an accepted input. A
    /// filled word closes the blank for the rest of the segment.
    pub(crate) fn commit(&mut self, target: String, typed: String, filled_word: Option<String>) {
        if filled_word.is_some() {
            self.blank = None;
            self.filled_word = filled_word;
        }
        self.target = target;
        self.typed = typed;
    }

    pub fn finish(self) -> StorySegment {
        StorySegment {
            id: Uuid::new_v4(),
            target_text: self.target,
            typed_text: self.typed,
            filled_word: self.filled_word,
            finished_at: Utc::now(),
        }
    }
}

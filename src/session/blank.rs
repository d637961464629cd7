/// Marker the story oracle places where the player gets to choose a word.
pub const PLACEHOLDER: &str = "___";

/// Characters that attach directly to the filled word without a space.
const ATTACHED_PUNCTUATION: [char; 6] = ['.', ',', '!', '?', ';', ':'];

/// The text around an unresolved blank. Only the first placeholder in a
/// segment is a blank; any later marker stays in `text_after` as literal text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlankContext {
    pub text_before: String,
    pub text_after: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlankStep {
    /// The input has not reached the blank yet.
    NotReached,
    /// A word is being typed into the blank.
    Open { target: String },
    /// The word is finished and spliced into the segment.
    Resolved {
        word: String,
        target: String,
        typed: String,
    },
}

impl BlankContext {
    pub fn detect(text: &str) -> Option<Self> {
        let idx = text.find(PLACEHOLDER)?;
        Some(Self {
            text_before: text[..idx].to_string(),
            text_after: text[idx + PLACEHOLDER.len()..].to_string(),
        })
    }

    /// Char offset where the blank begins.
    pub fn start(&self) -> usize {
        self.text_before.chars().count()
    }

    /// Target shown while nothing has been typed into the blank.
    pub fn placeholder_target(&self) -> String {
        format!("{}{PLACEHOLDER}{}", self.text_before, self.text_after)
    }

    fn spliced(&self, middle: &str) -> String {
        format!("{}{middle}{}", self.text_before, self.text_after)
    }

    fn punctuation_follows(&self) -> bool {
        self.text_after
            .chars()
            .next()
            .is_some_and(|c| ATTACHED_PUNCTUATION.contains(&c))
    }

    /// Work out what a candidate input means for the blank.
    pub fn step(&self, value: &str) -> BlankStep {
        let tail: String = value.chars().skip(self.start()).collect();
        if tail.is_empty() {
            return BlankStep::NotReached;
        }
        let word = tail.trim();
        if tail.ends_with(' ') && !word.is_empty() {
            let word = word.to_string();
            // Nothing follows a blank at the very end, so no separator either.
            let separator = if self.text_after.is_empty() || self.punctuation_follows() {
                ""
            } else {
                " "
            };
            return BlankStep::Resolved {
                target: self.spliced(&word),
                typed: format!("{}{word}{separator}", self.text_before),
                word,
            };
        }

        if !tail.contains(' ') {
            if let Some(next) = self.text_after.chars().next() {
                if tail.ends_with(next) {
                    let word: String = tail.chars().take(tail.chars().count() - 1).collect();
                    if !word.is_empty() {
                        return BlankStep::Resolved {
                            target: self.spliced(&word),
                            typed: value.to_string(),
                            word,
                        };
                    }
                }
            }
        }

        BlankStep::Open {
            target: self.spliced(&tail),
        }
    }
}

use std::time::Instant;

use crate::session::blank::BlankStep;
use crate::session::segment::SegmentState;

/// Display classification of one target position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharStatus {
    Correct,
    Incorrect(char),
    Current,
    Pending,
}

#[derive(Clone, Debug)]
pub struct KeystrokeEvent {
    pub expected: char,
    pub actual: char,
    pub timestamp: Instant,
    pub correct: bool,
}

/// What one accepted input change did to the segment.
#[derive(Clone, Debug, Default)]
pub struct InputOutcome {
    /// Set when the input grew, i.e. one forward keystroke happened.
    pub keystroke: Option<KeystrokeEvent>,
    /// Word the player put into the blank, if this input resolved it.
    pub filled_word: Option<String>,
    /// The input ran past the target and was clamped to it.
    pub overflowed: bool,
    pub completed: bool,
}

/// Classify every target position against what has been typed so far.
pub fn classify(target: &str, typed: &str) -> Vec<CharStatus> {
    let typed: Vec<char> = typed.chars().collect();
    target
        .chars()
        .enumerate()
        .map(|(i, expected)| match typed.get(i) {
            Some(&actual) if actual == expected => CharStatus::Correct,
            Some(&actual) => CharStatus::Incorrect(actual),
            None if i == typed.len() => CharStatus::Current,
            None => CharStatus::Pending,
        })
        .collect()
}

/// Apply a candidate input value to the segment.
///
/// Returns `None` when the candidate is rejected: the segment is already
/// complete, or the candidate would shorten the typed text. Resolving a
/// blank may rewrite the typed text shorter; that is not a deletion.
pub fn process_input(
    segment: &mut SegmentState,
    candidate: &str,
    at: Instant,
) -> Option<InputOutcome> {
    if segment.is_complete() {
        return None;
    }

    let mut target = segment.target.clone();
    let mut typed = candidate.to_string();
    let mut filled_word = None;

    if let Some(ref blank) = segment.blank {
        match blank.step(candidate) {
            BlankStep::NotReached => {}
            BlankStep::Open { target: open } => target = open,
            BlankStep::Resolved {
                word,
                target: resolved,
                typed: rewritten,
            } => {
                target = resolved;
                typed = rewritten;
                filled_word = Some(word);
            }
        }
    }

    let target_len = target.chars().count();
    let typed_len = typed.chars().count();
    let previous_len = segment.typed_len();

    if typed_len > target_len {
        segment.commit(target.clone(), target, filled_word.clone());
        return Some(InputOutcome {
            keystroke: None,
            filled_word,
            overflowed: true,
            completed: true,
        });
    }

    if typed_len < previous_len && filled_word.is_none() {
        return None;
    }

    let keystroke = if typed_len > previous_len {
        let idx = typed_len - 1;
        let actual = typed.chars().nth(idx)?;
        let expected = target.chars().nth(idx)?;
        Some(KeystrokeEvent {
            expected,
            actual,
            timestamp: at,
            correct: actual == expected,
        })
    } else {
        None
    };

    segment.commit(target, typed, filled_word.clone());

    Some(InputOutcome {
        keystroke,
        filled_word,
        overflowed: false,
        completed: segment.is_complete(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_all(segment: &mut SegmentState, text: &str) -> Vec<InputOutcome> {
        let mut outcomes = Vec::new();
        for ch in text.chars() {
            let candidate = format!("{}{ch}", segment.typed);
            if let Some(outcome) = process_input(segment, &candidate, Instant::now()) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    #[test]
    fn test_classify_positions() {
        let statuses = classify("abcd", "ax");
        assert_eq!(
            statuses,
            vec![
                CharStatus::Correct,
                CharStatus::Incorrect('x'),
                CharStatus::Current,
                CharStatus::Pending,
            ]
        );
    }

    #[test]
    fn test_classify_complete_has_no_cursor() {
        let statuses = classify("ab", "ab");
        assert_eq!(statuses, vec![CharStatus::Correct, CharStatus::Correct]);
    }

    #[test]
    fn test_correct_keystrokes_complete_segment() {
        let mut segment = SegmentState::new("abc", 0);
        let outcomes = type_all(&mut segment, "abc");
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.keystroke.as_ref().unwrap().correct));
        assert!(outcomes[2].completed);
        assert!(segment.is_complete());
    }

    #[test]
    fn test_incorrect_keystroke_is_reported() {
        let mut segment = SegmentState::new("abc", 0);
        let outcome = process_input(&mut segment, "x", Instant::now()).unwrap();
        let keystroke = outcome.keystroke.unwrap();
        assert!(!keystroke.correct);
        assert_eq!(keystroke.expected, 'a');
        assert_eq!(keystroke.actual, 'x');
        assert_eq!(segment.typed, "x");
    }

    #[test]
    fn test_shorter_input_is_rejected() {
        let mut segment = SegmentState::new("abc", 0);
        process_input(&mut segment, "ab", Instant::now()).unwrap();
        assert!(process_input(&mut segment, "a", Instant::now()).is_none());
        assert_eq!(segment.typed, "ab");
    }

    #[test]
    fn test_overflow_clamps_to_target() {
        let mut segment = SegmentState::new("abc", 0);
        let outcome = process_input(&mut segment, "abcdef", Instant::now()).unwrap();
        assert!(outcome.overflowed);
        assert!(outcome.completed);
        assert!(outcome.keystroke.is_none());
        assert_eq!(segment.typed, "abc");
    }

    #[test]
    fn test_input_after_completion_is_ignored() {
        let mut segment = SegmentState::new("ab", 0);
        type_all(&mut segment, "ab");
        assert!(process_input(&mut segment, "abc", Instant::now()).is_none());
    }

    #[test]
    fn test_blank_word_is_free_typing() {
        let mut segment = SegmentState::new("I saw a ___ today.", 0);
        let outcomes = type_all(&mut segment, "I saw a dragon today.");
        assert!(outcomes.iter().all(|o| o.keystroke.as_ref().is_none_or(|k| k.correct)));
        assert!(segment.is_complete());
        assert_eq!(segment.target, "I saw a dragon today.");
        assert_eq!(segment.filled_word.as_deref(), Some("dragon"));
        assert!(segment.blank.is_none());
    }

    #[test]
    fn test_blank_space_before_punctuation_is_not_counted() {
        let mut segment = SegmentState::new("It was a ___.", 0);
        type_all(&mut segment, "It was a storm");
        let outcome = process_input(&mut segment, "It was a storm ", Instant::now()).unwrap();
        assert!(outcome.keystroke.is_none());
        assert_eq!(outcome.filled_word.as_deref(), Some("storm"));
        assert_eq!(segment.typed, "It was a storm");

        let outcome = process_input(&mut segment, "It was a storm.", Instant::now()).unwrap();
        assert!(outcome.keystroke.unwrap().correct);
        assert!(outcome.completed);
    }

    #[test]
    fn test_blank_leading_space_is_typed_into_the_blank() {
        let mut segment = SegmentState::new("A ___ b", 0);
        type_all(&mut segment, "A ");
        let outcome = process_input(&mut segment, "A  ", Instant::now()).unwrap();
        assert!(outcome.keystroke.unwrap().correct);
        assert_eq!(segment.target, "A   b");
        assert!(segment.blank.is_some());

        type_all(&mut segment, "x ");
        assert_eq!(segment.filled_word.as_deref(), Some("x"));
        assert_eq!(segment.target, "A x b");
        assert_eq!(segment.typed, "A x ");
        type_all(&mut segment, "b");
        assert!(segment.is_complete());
    }

    #[test]
    fn test_blank_at_end_waits_for_the_word_to_finish() {
        let mut segment = SegmentState::new("The end is ___", 0);
        let outcomes = type_all(&mut segment, "The end is n");
        assert!(!outcomes.last().unwrap().completed);
        assert!(!segment.is_complete());
        assert!(segment.filled_word.is_none());

        let outcomes = type_all(&mut segment, "ear");
        assert!(outcomes.iter().all(|o| !o.completed));

        let outcome = process_input(&mut segment, "The end is near ", Instant::now()).unwrap();
        assert!(outcome.completed);
        assert!(!outcome.overflowed);
        assert!(outcome.keystroke.is_none());
        assert_eq!(outcome.filled_word.as_deref(), Some("near"));
        assert_eq!(segment.typed, "The end is near");
        assert_eq!(segment.target, "The end is near");
    }

    #[test]
    fn test_typed_never_exceeds_target() {
        let mut segment = SegmentState::new("The end is ___", 0);
        for ch in "The end is near and more".chars() {
            let candidate = format!("{}{ch}", segment.typed);
            process_input(&mut segment, &candidate, Instant::now());
            assert!(segment.typed_len() <= segment.target_len());
        }
        assert!(segment.is_complete());
        assert_eq!(segment.target, "The end is near");
    }
}

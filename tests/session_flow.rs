use std::time::{Duration, Instant};

use taletype::config::Config;
use taletype::engine::quests::{QuestStub, QuestVerdict};
use taletype::engine::{Effect, Phase, SessionEngine, SessionEvent};
use taletype::oracle::{OracleCall, OracleOutcome, OracleReply, OracleRequest};

fn engine_with_lives(lives: u8) -> SessionEngine {
    SessionEngine::new(&Config {
        starting_lives: lives,
        ..Config::default()
    })
}

fn reply(engine: &mut SessionEngine, outcome: OracleOutcome) -> Vec<Effect> {
    let generation = engine.generation();
    engine.dispatch(SessionEvent::Oracle(OracleReply {
        generation,
        outcome,
    }))
}

fn load(engine: &mut SessionEngine, text: &str) -> Vec<Effect> {
    reply(engine, OracleOutcome::Segment(Ok(text.to_string())))
}

fn type_key(engine: &mut SessionEngine, ch: char) -> Vec<Effect> {
    let mut value = engine
        .segment()
        .map(|s| s.typed.clone())
        .unwrap_or_default();
    value.push(ch);
    engine.dispatch(SessionEvent::Input {
        value,
        at: Instant::now(),
    })
}

fn type_str(engine: &mut SessionEngine, text: &str) -> Vec<Effect> {
    let mut effects = Vec::new();
    for ch in text.chars() {
        effects = type_key(engine, ch);
    }
    effects
}

fn request_names(effects: &[Effect]) -> Vec<&'static str> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Request(OracleRequest { call, .. }) => Some(call.name()),
            _ => None,
        })
        .collect()
}

fn wants_blank(effects: &[Effect]) -> Option<bool> {
    effects.iter().find_map(|e| match e {
        Effect::Request(OracleRequest {
            call: OracleCall::NextSegment { wants_blank, .. },
            ..
        }) => Some(*wants_blank),
        _ => None,
    })
}

#[test]
fn test_three_mistakes_end_the_game() {
    let mut engine = engine_with_lives(3);
    engine.dispatch(SessionEvent::Restart);
    load(&mut engine, "Hello");

    type_str(&mut engine, "Jel");
    assert_eq!(engine.lives(), 2);
    type_str(&mut engine, "xx");
    assert_eq!(engine.lives(), 0);
    assert_eq!(engine.phase(), Phase::GameOver);
    assert!(engine.history().is_empty());

    let stats = engine.stats();
    assert_eq!(stats.chars_typed, 5);
    assert_eq!(stats.mistakes, 3);
}

#[test]
fn test_restart_discards_in_flight_replies() {
    let mut engine = engine_with_lives(3);
    engine.dispatch(SessionEvent::Restart);
    let stale = engine.generation();
    load(&mut engine, "First story.");
    type_str(&mut engine, "Fx");

    let effects = engine.dispatch(SessionEvent::Restart);
    assert_eq!(request_names(&effects), vec!["next_segment"]);
    assert_eq!(engine.lives(), 3);
    assert_eq!(engine.stats().chars_typed, 0);
    assert!(engine.quests().is_empty());

    let effects = engine.dispatch(SessionEvent::Oracle(OracleReply {
        generation: stale,
        outcome: OracleOutcome::Segment(Ok("Old story.".into())),
    }));
    assert!(effects.is_empty());
    assert_eq!(engine.phase(), Phase::Loading);

    load(&mut engine, "New story.");
    assert_eq!(engine.segment().map(|s| s.target.as_str()), Some("New story."));
}

#[test]
fn test_no_evaluation_without_active_quests() {
    let mut engine = engine_with_lives(3);
    engine.dispatch(SessionEvent::Restart);
    load(&mut engine, "ab");

    // Quests arrive but never settle before the segment ends.
    reply(
        &mut engine,
        OracleOutcome::InitialQuests(Ok(vec![QuestStub {
            description: "Find the key".into(),
            reward_points: 5,
        }])),
    );
    let effects = type_str(&mut engine, "ab");
    assert_eq!(request_names(&effects), vec!["refresh_scene", "next_segment"]);
}

#[test]
fn test_single_evaluation_in_flight() {
    let mut engine = engine_with_lives(3);
    engine.dispatch(SessionEvent::Restart);
    load(&mut engine, "ab");
    reply(
        &mut engine,
        OracleOutcome::InitialQuests(Ok(vec![QuestStub {
            description: "Find the key".into(),
            reward_points: 5,
        }])),
    );
    let generation = engine.generation();
    engine.dispatch(SessionEvent::QuestsSettled { generation });

    let effects = type_str(&mut engine, "ab");
    assert_eq!(request_names(&effects)[0], "evaluate_quests");

    load(&mut engine, "cd");
    let effects = type_str(&mut engine, "cd");
    assert_eq!(request_names(&effects), vec!["refresh_scene", "next_segment"]);

    reply(&mut engine, OracleOutcome::Verdict(Ok(QuestVerdict::default())));
    load(&mut engine, "ef");
    let effects = type_str(&mut engine, "ef");
    assert_eq!(request_names(&effects)[0], "evaluate_quests");
}

#[test]
fn test_flawless_streak_earns_blanks_and_lives() {
    let mut engine = engine_with_lives(2);
    engine.dispatch(SessionEvent::Restart);

    load(&mut engine, "One.");
    let effects = type_str(&mut engine, "One.");
    assert_eq!(wants_blank(&effects), Some(true));

    load(&mut engine, "A ___ flew by.");
    type_str(&mut engine, "A ");
    let effects = type_str(&mut engine, "crow ");
    assert!(effects.is_empty());
    assert_eq!(engine.segment().map(|s| s.target.as_str()), Some("A crow flew by."));
    let effects = type_str(&mut engine, "flew by.");
    assert_eq!(wants_blank(&effects), Some(true));
    assert_eq!(engine.history()[1].filled_word.as_deref(), Some("crow"));
    assert_eq!(engine.lives(), 2);

    load(&mut engine, "Three.");
    type_str(&mut engine, "Three.");
    assert_eq!(engine.streak(), 3);
    assert_eq!(engine.lives(), 3);

    load(&mut engine, "Four.");
    let effects = type_str(&mut engine, "Fxur.");
    assert_eq!(wants_blank(&effects), Some(false));
    assert_eq!(engine.streak(), 0);
    assert_eq!(engine.lives(), 2);
    assert_eq!(engine.story_text(), "One. A crow flew by. Three. Fxur.");
}

#[test]
fn test_mistakes_never_exceed_chars_typed() {
    let mut engine = engine_with_lives(5);
    engine.dispatch(SessionEvent::Restart);
    load(&mut engine, "The quick brown fox jumps.");

    let start = Instant::now();
    for (i, ch) in "Thx quick brawn fox".chars().enumerate() {
        let mut value = engine.segment().map(|s| s.typed.clone()).unwrap_or_default();
        value.push(ch);
        engine.dispatch(SessionEvent::Input {
            value,
            at: start + Duration::from_millis(150 * i as u64),
        });
        engine.dispatch(SessionEvent::Tick {
            at: start + Duration::from_millis(150 * i as u64 + 100),
        });
        let stats = engine.stats();
        assert!(stats.mistakes <= stats.chars_typed);
        assert!(stats.accuracy >= 0.0 && stats.accuracy <= 100.0);
        assert!(stats.wpm.is_finite());
    }
}

#[test]
fn test_pasted_overflow_completes_without_counting() {
    let mut engine = engine_with_lives(3);
    engine.dispatch(SessionEvent::Restart);
    load(&mut engine, "abc");
    type_key(&mut engine, 'a');
    let effects = engine.dispatch(SessionEvent::Input {
        value: "abcdef".into(),
        at: Instant::now(),
    });
    assert_eq!(request_names(&effects), vec!["refresh_scene", "next_segment"]);
    assert_eq!(engine.history()[0].typed_text, "abc");
    assert_eq!(engine.stats().chars_typed, 1);
}

#[test]
fn test_input_ignored_outside_typing_phases() {
    let mut engine = engine_with_lives(3);
    assert!(type_key(&mut engine, 'a').is_empty());
    engine.dispatch(SessionEvent::Restart);
    assert!(type_key(&mut engine, 'a').is_empty());
    assert_eq!(engine.stats().chars_typed, 0);
    assert_eq!(engine.phase(), Phase::Loading);
}

#[test]
fn test_blank_closing_the_segment_keeps_the_whole_word() {
    let mut engine = engine_with_lives(3);
    engine.dispatch(SessionEvent::Restart);
    load(&mut engine, "Prologue.");
    type_str(&mut engine, "Prologue.");

    load(&mut engine, "Beyond the hill waited a ___");
    let effects = type_str(&mut engine, "Beyond the hill waited a d");
    assert!(effects.is_empty());
    assert_eq!(engine.phase(), Phase::Typing);
    assert_eq!(engine.history().len(), 1);

    type_str(&mut engine, "ragon");
    assert_eq!(engine.phase(), Phase::Typing);
    let effects = type_str(&mut engine, " ");
    assert_eq!(request_names(&effects), vec!["refresh_scene", "next_segment"]);
    assert_eq!(wants_blank(&effects), Some(true));

    let finished = &engine.history()[1];
    assert_eq!(finished.target_text, "Beyond the hill waited a dragon");
    assert_eq!(finished.typed_text, "Beyond the hill waited a dragon");
    assert_eq!(finished.filled_word.as_deref(), Some("dragon"));
    assert_eq!(engine.streak(), 2);
    assert_eq!(engine.story_text(), "Prologue. Beyond the hill waited a dragon");
}

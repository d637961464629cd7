use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use taletype::app::App;
use taletype::config::Config;
use taletype::engine::quests::{Quest, QuestState, QuestStub, QuestVerdict};
use taletype::engine::{Phase, SessionEngine, SessionEvent};
use taletype::event::AppEvent;
use taletype::oracle::dispatch::OracleDispatcher;
use taletype::oracle::offline::OfflineOracle;
use taletype::oracle::{OracleError, OracleResult, SceneOracle, SceneRef, StoryOracle};
use taletype::session::blank::PLACEHOLDER;
use taletype::ui::theme::Theme;

struct Harness {
    engine: SessionEngine,
    dispatcher: OracleDispatcher<OfflineOracle, OfflineOracle, SessionEvent>,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Harness {
    fn new(seed: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let oracle = Arc::new(OfflineOracle::new(Some(seed), Duration::from_millis(50)).unwrap());
        let config = Config::default();
        Self {
            engine: SessionEngine::new(&config),
            dispatcher: OracleDispatcher::new(Arc::clone(&oracle), oracle, tx, config.oracle_timeout()),
            rx,
        }
    }

    fn send(&mut self, event: SessionEvent) {
        let effects = self.engine.dispatch(event);
        self.dispatcher.dispatch(effects);
    }

    /// Deliver queued replies until `done` holds.
    async fn pump_until(&mut self, done: impl Fn(&SessionEngine) -> bool) {
        tokio::time::timeout(Duration::from_secs(60), async {
            while !done(&self.engine) {
                let event = self.rx.recv().await.expect("dispatcher dropped");
                self.send(event);
            }
        })
        .await
        .expect("engine never reached the expected state");
    }

    fn type_char(&mut self, ch: char) {
        let mut value = self.engine.segment().unwrap().typed.clone();
        value.push(ch);
        self.send(SessionEvent::Input {
            value,
            at: Instant::now(),
        });
    }

    /// Type the current segment without mistakes, filling any blank with `word`.
    fn type_segment(&mut self, word: &str) {
        let segment = self.engine.segment().unwrap();
        let blank_start = segment.blank.as_ref().map(|b| b.start());
        let target: Vec<char> = segment.target.chars().collect();
        for &ch in &target[..blank_start.unwrap_or(target.len())] {
            self.type_char(ch);
        }
        if blank_start.is_some() {
            for ch in word.chars().chain([' ']) {
                self.type_char(ch);
            }
        }
        while let Some(segment) = self.engine.segment() {
            if self.engine.phase() != Phase::Typing || segment.is_complete() {
                break;
            }
            let next = segment.target.chars().nth(segment.typed_len()).unwrap();
            self.type_char(next);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_offline_play_through() {
    let mut h = Harness::new(11);
    h.send(SessionEvent::Restart);
    h.pump_until(|e| e.phase() == Phase::ReadyToType).await;
    assert!(h.engine.segment().unwrap().blank.is_none());

    h.pump_until(|e| !e.quests().is_empty() && e.quests().iter().all(|q| q.state == QuestState::Active))
        .await;
    assert_eq!(h.engine.quests().len(), 3);

    h.type_segment("lantern");
    assert_eq!(h.engine.history().len(), 1);
    assert_eq!(h.engine.streak(), 1);
    assert!(h.engine.scene_pending());

    h.pump_until(|e| e.phase() == Phase::ReadyToType && !e.scene_pending()).await;
    let segment = h.engine.segment().unwrap();
    assert!(segment.blank.is_some(), "flawless segment should earn a blank");
    assert!(segment.target.contains(PLACEHOLDER));
    assert!(h.engine.scene().is_some());

    h.type_segment("lantern");
    assert_eq!(h.engine.history()[1].filled_word.as_deref(), Some("lantern"));
    assert!(!h.engine.history()[1].typed_text.contains(PLACEHOLDER));
    assert!(h.engine.story_text().contains("lantern"));
    assert_eq!(h.engine.stats().mistakes, 0);

    h.pump_until(|e| e.phase() == Phase::ReadyToType && !e.scene_pending()).await;
    assert_eq!(h.engine.lives(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_restart_mid_load_ignores_old_segment() {
    let mut h = Harness::new(5);
    h.send(SessionEvent::Restart);
    h.send(SessionEvent::Restart);
    let generation = h.engine.generation();

    h.pump_until(|e| e.phase() == Phase::ReadyToType).await;
    assert_eq!(h.engine.generation(), generation);
    // Both play-throughs asked for an opening; only one was applied.
    assert!(h.engine.history().is_empty());
}

/// Oracle that hands out one quest and completes every active quest.
struct GenerousOracle;

impl StoryOracle for GenerousOracle {
    async fn next_segment(&self, _history: Vec<String>, _wants_blank: bool) -> OracleResult<String> {
        Ok("go".to_string())
    }

    async fn initial_quests(&self, _segment: String) -> OracleResult<Vec<QuestStub>> {
        Ok(vec![QuestStub {
            description: "Keep going".into(),
            reward_points: 7,
        }])
    }

    async fn evaluate_quests(&self, _story: String, active: Vec<Quest>) -> OracleResult<QuestVerdict> {
        Ok(QuestVerdict {
            completed: active.iter().map(|q| q.id).collect(),
            failed: vec![],
        })
    }

    async fn replacement_quest(&self, _story: String, _current: Vec<Quest>) -> OracleResult<Option<QuestStub>> {
        Ok(None)
    }
}

impl SceneOracle for GenerousOracle {
    async fn refresh_scene(&self, _story: String, _latest: String) -> OracleResult<Option<SceneRef>> {
        Err(OracleError::Unavailable("no painter".into()))
    }
}

async fn pump_app(
    app: &mut App<GenerousOracle, GenerousOracle>,
    rx: &mut mpsc::UnboundedReceiver<AppEvent>,
    done: impl Fn(&App<GenerousOracle, GenerousOracle>) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !done(app) {
            if let AppEvent::Session(event) = rx.recv().await.expect("channel closed") {
                app.apply(event);
            }
        }
    })
    .await
    .expect("app never reached the expected state");
}

#[tokio::test(start_paused = true)]
async fn test_app_shows_points_toast_once() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let oracle = Arc::new(GenerousOracle);
    let theme: &'static Theme = Box::leak(Box::new(Theme::default()));
    let mut app = App::new(Config::default(), theme, Arc::clone(&oracle), oracle, tx);

    assert!(app.can_restart());
    app.restart();
    pump_app(&mut app, &mut rx, |a| {
        a.phase() == Phase::ReadyToType && a.engine.quests().iter().any(|q| q.state == QuestState::Active)
    })
    .await;

    app.type_char('g');
    app.type_char('o');
    pump_app(&mut app, &mut rx, |a| {
        a.engine.score() == 7 && !a.engine.scene_pending() && a.engine.quests().is_empty()
    }).await;

    let toast = app.toast().expect("award should raise a toast");
    assert_eq!(toast.points, 7);
    assert!(app.engine.scene().is_none());
    assert!(app.engine.quests().is_empty());

    app.tick(Instant::now() + Duration::from_secs(2));
    assert!(app.toast().is_none());
    app.tick(Instant::now() + Duration::from_secs(3));
    assert!(app.toast().is_none(), "same award must not toast twice");
}

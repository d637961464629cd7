use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::config::Config;
use crate::engine::{Phase, SessionEngine, SessionEvent};
use crate::event::AppEvent;
use crate::oracle::dispatch::OracleDispatcher;
use crate::oracle::{SceneOracle, StoryOracle};
use crate::ui::theme::Theme;

pub const TOAST_DURATION: Duration = Duration::from_millis(1500);

/// "+N points" notice shown after a quest round pays out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointsToast {
    pub points: u32,
    trigger: Uuid,
    shown_at: Instant,
}

pub struct App<S, I> {
    pub engine: SessionEngine,
    pub theme: &'static Theme,
    pub config: Config,
    pub should_quit: bool,
    toast: Option<PointsToast>,
    shown_trigger: Option<Uuid>,
    dispatcher: OracleDispatcher<S, I, AppEvent>,
}

impl<S: StoryOracle, I: SceneOracle> App<S, I> {
    pub fn new(
        config: Config,
        theme: &'static Theme,
        story: Arc<S>,
        scene: Arc<I>,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        let dispatcher = OracleDispatcher::new(story, scene, events, config.oracle_timeout());
        Self {
            engine: SessionEngine::new(&config),
            theme,
            config,
            should_quit: false,
            toast: None,
            shown_trigger: None,
            dispatcher,
        }
    }

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    pub fn can_restart(&self) -> bool {
        matches!(self.engine.phase(), Phase::Idle | Phase::GameOver)
    }

    pub fn restart(&mut self) {
        self.toast = None;
        self.apply(SessionEvent::Restart);
    }

    /// Feed one typed character to the engine as the new input value.
    pub fn type_char(&mut self, ch: char) {
        let Some(segment) = self.engine.segment() else {
            return;
        };
        let mut value = segment.typed.clone();
        value.push(ch);
        self.apply(SessionEvent::Input {
            value,
            at: Instant::now(),
        });
    }

    pub fn tick(&mut self, at: Instant) {
        self.apply(SessionEvent::Tick { at });
        if self.toast.is_some_and(|t| at.saturating_duration_since(t.shown_at) >= TOAST_DURATION) {
            self.toast = None;
        }
    }

    pub fn apply(&mut self, event: SessionEvent) {
        let effects = self.engine.dispatch(event);
        self.dispatcher.dispatch(effects);
        self.sync_toast(Instant::now());
    }

    fn sync_toast(&mut self, now: Instant) {
        let Some(award) = self.engine.last_award() else {
            return;
        };
        if self.shown_trigger == Some(award.trigger) {
            return;
        }
        self.toast = Some(PointsToast {
            points: award.points,
            trigger: award.trigger,
            shown_at: now,
        });
        self.shown_trigger = Some(award.trigger);
    }

    pub fn toast(&self) -> Option<PointsToast> {
        self.toast
    }
}

//! The session state machine. Everything that changes a play-through goes
//! through [`SessionEngine::dispatch`]: player input, timer ticks and oracle
//! replies come in as [`SessionEvent`]s, and the calls the engine wants made
//! go out as [`Effect`]s. The engine itself never waits on anything.

pub mod quests;
pub mod rules;

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::quests::{PointsAward, Quest, QuestLedger, QuestStub, QuestVerdict};
use crate::oracle::{
    self, FALLBACK_SEGMENT_TEXT, OracleCall, OracleOutcome, OracleReply, OracleRequest,
    OracleResult, SceneRef,
};
use crate::session::input;
use crate::session::segment::{SegmentState, StorySegment};
use crate::session::stats::{StatsSnapshot, StatsTracker};

/// Identity of one play-through. Every oracle request carries the
/// generation it was issued under; replies from an older generation are
/// discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Generation(Uuid);

impl Generation {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    ReadyToType,
    Typing,
    SegmentComplete,
    GameOver,
}

#[derive(Debug)]
pub enum SessionEvent {
    Restart,
    /// The input field now holds `value`.
    Input { value: String, at: Instant },
    Tick { at: Instant },
    QuestsSettled { generation: Generation },
    Oracle(OracleReply),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Request(OracleRequest),
    /// Deliver `QuestsSettled` after the delay.
    SettleQuests {
        generation: Generation,
        after: Duration,
    },
}

pub struct SessionEngine {
    generation: Generation,
    phase: Phase,
    segment: Option<SegmentState>,
    history: Vec<StorySegment>,
    starting_lives: u8,
    lives: u8,
    streak: u32,
    score: u32,
    stats: StatsTracker,
    quests: QuestLedger,
    scene: Option<SceneRef>,
    /// Sequence number of the latest scene refresh issued.
    scene_requested: u64,
    /// Highest sequence number answered so far.
    scene_answered: u64,
    notice: Option<String>,
    last_award: Option<PointsAward>,
    settle_delay: Duration,
}

impl SessionEngine {
    pub fn new(config: &Config) -> Self {
        let starting_lives = rules::clamp_starting_lives(config.starting_lives);
        Self {
            generation: Generation::new(),
            phase: Phase::Idle,
            segment: None,
            history: Vec::new(),
            starting_lives,
            lives: starting_lives,
            streak: 0,
            score: 0,
            stats: StatsTracker::new(config.stats_interval()),
            quests: QuestLedger::new(),
            scene: None,
            scene_requested: 0,
            scene_answered: 0,
            notice: None,
            last_award: None,
            settle_delay: config.quest_settle_delay(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn segment(&self) -> Option<&SegmentState> {
        self.segment.as_ref()
    }

    pub fn history(&self) -> &[StorySegment] {
        &self.history
    }

    pub fn lives(&self) -> u8 {
        self.lives
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn quests(&self) -> &[Quest] {
        self.quests.quests()
    }

    pub fn scene(&self) -> Option<&SceneRef> {
        self.scene.as_ref()
    }

    /// True until the most recent scene refresh has answered.
    pub fn scene_pending(&self) -> bool {
        self.scene_answered < self.scene_requested
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn last_award(&self) -> Option<PointsAward> {
        self.last_award
    }

    /// Typed text of the whole story so far.
    pub fn story_text(&self) -> String {
        self.history
            .iter()
            .map(|s| s.typed_text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn dispatch(&mut self, event: SessionEvent) -> Vec<Effect> {
        match event {
            SessionEvent::Restart => self.restart(),
            SessionEvent::Input { value, at } => self.handle_input(&value, at),
            SessionEvent::Tick { at } => {
                if self.phase == Phase::Typing {
                    self.stats.refresh_if_due(at);
                }
                Vec::new()
            }
            SessionEvent::QuestsSettled { generation } => {
                if generation == self.generation {
                    self.quests.promote_new();
                }
                Vec::new()
            }
            SessionEvent::Oracle(reply) => self.apply_reply(reply),
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!("phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    fn request(&self, call: OracleCall) -> Effect {
        Effect::Request(OracleRequest {
            generation: self.generation,
            call,
        })
    }

    fn restart(&mut self) -> Vec<Effect> {
        self.generation = Generation::new();
        info!("new play-through {}", self.generation);

        self.segment = None;
        self.history.clear();
        self.lives = self.starting_lives;
        self.streak = 0;
        self.score = 0;
        self.stats.reset();
        self.quests.clear();
        self.scene = None;
        self.scene_requested = 0;
        self.scene_answered = 0;
        self.notice = None;
        self.last_award = None;

        vec![self.begin_loading(false)]
    }

    fn begin_loading(&mut self, wants_blank: bool) -> Effect {
        self.set_phase(Phase::Loading);
        self.segment = None;
        self.stats.reset_timer();
        let history = self.history.iter().map(|s| s.typed_text.clone()).collect();
        self.request(OracleCall::NextSegment {
            history,
            wants_blank,
        })
    }

    fn handle_input(&mut self, value: &str, at: Instant) -> Vec<Effect> {
        if !matches!(self.phase, Phase::ReadyToType | Phase::Typing) {
            return Vec::new();
        }
        let Some(segment) = self.segment.as_mut() else {
            return Vec::new();
        };

        if self.phase == Phase::ReadyToType {
            if value.is_empty() {
                return Vec::new();
            }
            self.phase = Phase::Typing;
            debug!("phase ReadyToType -> Typing");
            self.stats.start_timer(at);
        }

        let Some(outcome) = input::process_input(segment, value, at) else {
            return Vec::new();
        };

        if let Some(word) = &outcome.filled_word {
            debug!("blank filled with {word:?}");
        }
        if outcome.overflowed {
            debug!("input ran past the target, finishing the segment");
        }

        if let Some(keystroke) = &outcome.keystroke {
            self.stats.record(keystroke.correct);
            self.stats.refresh_if_due(keystroke.timestamp);
            if !keystroke.correct {
                self.lives = rules::lose_life(self.lives);
                debug!(
                    "mistake: expected {:?}, got {:?}, {} lives left",
                    keystroke.expected, keystroke.actual, self.lives
                );
            }
        }

        if self.lives == 0 {
            self.stats.refresh(at);
            info!("game over with score {}", self.score);
            self.set_phase(Phase::GameOver);
            return Vec::new();
        }

        if outcome.completed {
            self.stats.refresh(at);
            return self.complete_segment();
        }

        Vec::new()
    }

    fn complete_segment(&mut self) -> Vec<Effect> {
        self.set_phase(Phase::SegmentComplete);
        let Some(segment) = self.segment.take() else {
            return Vec::new();
        };

        let flawless = self.stats.mistakes() == segment.mistakes_at_start;
        // A multi-character input only checks its last character, so a
        // zero mistake count alone does not prove the text matches.
        let exact = segment.typed == segment.target;
        let update = rules::apply_segment_result(self.streak, self.lives, flawless);
        self.streak = update.streak;
        self.lives = update.lives;
        if update.life_gained {
            info!("flawless streak of {}, life gained ({} lives)", self.streak, self.lives);
        }

        self.history.push(segment.finish());
        let story = self.story_text();
        let latest = self
            .history
            .last()
            .map(|s| s.typed_text.clone())
            .unwrap_or_default();
        debug!("segment {} finished, flawless: {flawless}", self.history.len());

        let mut effects = Vec::with_capacity(3);
        if let Some(active) = self.quests.begin_evaluation() {
            effects.push(self.request(OracleCall::EvaluateQuests {
                story: story.clone(),
                active,
            }));
        }
        self.scene_requested += 1;
        effects.push(self.request(OracleCall::RefreshScene {
            story,
            latest,
            seq: self.scene_requested,
        }));
        effects.push(self.begin_loading(flawless && exact));
        effects
    }

    fn apply_reply(&mut self, reply: OracleReply) -> Vec<Effect> {
        if reply.generation != self.generation {
            debug!("dropping reply from superseded play-through {}", reply.generation);
            return Vec::new();
        }

        match reply.outcome {
            OracleOutcome::Segment(result) => self.on_segment(result),
            OracleOutcome::InitialQuests(result) => {
                let stubs = result.unwrap_or_else(|err| {
                    warn!("initial quests unavailable: {err}");
                    Vec::new()
                });
                self.add_quests(stubs)
            }
            OracleOutcome::Verdict(result) => {
                let verdict = result.unwrap_or_else(|err| {
                    warn!("quest evaluation failed: {err}");
                    QuestVerdict::default()
                });
                self.on_verdict(verdict)
            }
            OracleOutcome::Replacement { replacing, result } => {
                let replacement = result.unwrap_or_else(|err| {
                    warn!("replacement quest failed: {err}");
                    None
                });
                if replacement.is_none() {
                    info!("dropping quest {replacing} without replacement");
                }
                match self.quests.replace(replacing, replacement) {
                    Some(_) => vec![self.settle_quests()],
                    None => Vec::new(),
                }
            }
            OracleOutcome::Scene { seq, result } => {
                if seq <= self.scene_answered {
                    debug!("dropping scene {seq}, already showing a newer one");
                    return Vec::new();
                }
                self.scene_answered = seq;
                match result {
                    Ok(Some(scene)) => self.scene = Some(scene),
                    Ok(None) => debug!("scene oracle had nothing new to show"),
                    Err(err) => warn!("scene refresh failed: {err}"),
                }
                Vec::new()
            }
        }
    }

    fn on_segment(&mut self, result: OracleResult<String>) -> Vec<Effect> {
        if self.phase != Phase::Loading {
            warn!("segment arrived while {:?}, ignoring it", self.phase);
            return Vec::new();
        }

        let text = match result.and_then(|raw| oracle::clean_segment_text(&raw)) {
            Ok(text) => text,
            Err(err) => {
                warn!("could not load story segment: {err}");
                self.notice = Some(FALLBACK_SEGMENT_TEXT.to_string());
                self.set_phase(Phase::Idle);
                return Vec::new();
            }
        };

        info!("segment ready: {text:?}");
        self.notice = None;
        let segment = SegmentState::new(&text, self.stats.mistakes());
        if segment.blank.is_some() {
            debug!("segment contains a blank");
        }
        self.segment = Some(segment);
        self.set_phase(Phase::ReadyToType);

        if self.history.is_empty() {
            vec![self.request(OracleCall::InitialQuests { segment: text })]
        } else {
            Vec::new()
        }
    }

    fn add_quests(&mut self, stubs: Vec<QuestStub>) -> Vec<Effect> {
        if self.quests.add_stubs(stubs) == 0 {
            return Vec::new();
        }
        vec![self.settle_quests()]
    }

    fn settle_quests(&self) -> Effect {
        Effect::SettleQuests {
            generation: self.generation,
            after: self.settle_delay,
        }
    }

    fn on_verdict(&mut self, verdict: QuestVerdict) -> Vec<Effect> {
        let outcome = self.quests.apply_verdict(verdict);
        if outcome.points > 0 {
            self.score = self.score.saturating_add(outcome.points);
            self.last_award = Some(PointsAward {
                points: outcome.points,
                trigger: Uuid::new_v4(),
            });
        }

        let story = self.story_text();
        let current = self.quests.quests().to_vec();
        outcome
            .finished
            .into_iter()
            .map(|replacing| {
                self.request(OracleCall::ReplacementQuest {
                    story: story.clone(),
                    current: current.clone(),
                    replacing,
                })
            })
            .collect()
    }
}

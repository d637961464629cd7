//! Contracts for the content collaborators: the story oracle that writes
//! segments and judges quests, and the scene oracle that illustrates the
//! story. The engine never calls them directly; it emits [`OracleRequest`]s
//! and consumes [`OracleReply`]s tagged with the session generation.

pub mod dispatch;
pub mod offline;

use std::future::Future;
use std::time::Duration;

use icu_normalizer::ComposingNormalizerBorrowed;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::Generation;
use crate::engine::quests::{Quest, QuestId, QuestStub, QuestVerdict};

/// Shown in place of the story when a segment cannot be fetched.
pub const FALLBACK_SEGMENT_TEXT: &str =
    "The old machine sputtered and died. The story ends here... for now. Press Enter to try again.";

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("malformed oracle payload: {0}")]
    Malformed(String),
}

pub type OracleResult<T> = Result<T, OracleError>;

/// Opaque handle to an illustration of the current scene.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneRef {
    pub uri: String,
    pub caption: String,
}

pub trait StoryOracle: Send + Sync + 'static {
    /// `history` holds the typed text of every finished segment, typos included.
    fn next_segment(
        &self,
        history: Vec<String>,
        wants_blank: bool,
    ) -> impl Future<Output = OracleResult<String>> + Send;

    fn initial_quests(
        &self,
        segment: String,
    ) -> impl Future<Output = OracleResult<Vec<QuestStub>>> + Send;

    fn evaluate_quests(
        &self,
        story: String,
        active: Vec<Quest>,
    ) -> impl Future<Output = OracleResult<QuestVerdict>> + Send;

    fn replacement_quest(
        &self,
        story: String,
        current: Vec<Quest>,
    ) -> impl Future<Output = OracleResult<Option<QuestStub>>> + Send;
}

pub trait SceneOracle: Send + Sync + 'static {
    fn refresh_scene(
        &self,
        story: String,
        latest: String,
    ) -> impl Future<Output = OracleResult<Option<SceneRef>>> + Send;
}

#[derive(Clone, Debug, PartialEq)]
pub enum OracleCall {
    NextSegment {
        history: Vec<String>,
        wants_blank: bool,
    },
    InitialQuests {
        segment: String,
    },
    EvaluateQuests {
        story: String,
        active: Vec<Quest>,
    },
    ReplacementQuest {
        story: String,
        current: Vec<Quest>,
        replacing: QuestId,
    },
    /// `seq` orders refreshes within a play-through so a late reply to an
    /// older refresh cannot replace a newer scene.
    RefreshScene {
        story: String,
        latest: String,
        seq: u64,
    },
}

impl OracleCall {
    pub fn name(&self) -> &'static str {
        match self {
            OracleCall::NextSegment { .. } => "next_segment",
            OracleCall::InitialQuests { .. } => "initial_quests",
            OracleCall::EvaluateQuests { .. } => "evaluate_quests",
            OracleCall::ReplacementQuest { .. } => "replacement_quest",
            OracleCall::RefreshScene { .. } => "refresh_scene",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OracleRequest {
    pub generation: Generation,
    pub call: OracleCall,
}

#[derive(Debug)]
pub enum OracleOutcome {
    Segment(OracleResult<String>),
    InitialQuests(OracleResult<Vec<QuestStub>>),
    Verdict(OracleResult<QuestVerdict>),
    Replacement {
        replacing: QuestId,
        result: OracleResult<Option<QuestStub>>,
    },
    Scene {
        seq: u64,
        result: OracleResult<Option<SceneRef>>,
    },
}

#[derive(Debug)]
pub struct OracleReply {
    pub generation: Generation,
    pub outcome: OracleOutcome,
}

/// Tidy up segment text before it becomes a typing target: trim, drop one
/// pair of wrapping quotes and compose to NFC so it matches keyboard input.
pub fn clean_segment_text(raw: &str) -> OracleResult<String> {
    let mut text = raw.trim();
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            text = text[1..text.len() - 1].trim();
            break;
        }
    }

    if text.is_empty() {
        return Err(OracleError::Malformed("empty story segment".to_string()));
    }

    let nfc = ComposingNormalizerBorrowed::new_nfc();
    Ok(nfc.normalize(text).into_owned())
}

#[derive(Deserialize)]
struct QuestListPayload {
    quests: Option<Vec<QuestStub>>,
}

/// Parse a `{"quests": [{"description", "points"}]}` payload. A missing
/// list is empty; entries missing fields make the whole payload malformed.
pub fn parse_quest_list(json: &str) -> OracleResult<Vec<QuestStub>> {
    let payload: QuestListPayload =
        serde_json::from_str(json).map_err(|e| OracleError::Malformed(e.to_string()))?;
    Ok(payload.quests.unwrap_or_default())
}

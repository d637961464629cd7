use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestId(pub Uuid);

impl QuestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QuestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestState {
    New,
    Active,
    Completed,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub id: QuestId,
    pub description: String,
    pub reward_points: u32,
    pub state: QuestState,
}

/// Quest as produced by the oracle, before the ledger assigns identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestStub {
    pub description: String,
    #[serde(alias = "points")]
    pub reward_points: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestVerdict {
    pub completed: Vec<QuestId>,
    pub failed: Vec<QuestId>,
}

/// "Points earned" notification. `trigger` is fresh for every award so
/// identical totals still re-trigger the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointsAward {
    pub points: u32,
    pub trigger: Uuid,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerdictOutcome {
    pub points: u32,
    /// Quests that left `active` and now wait for a replacement.
    pub finished: Vec<QuestId>,
}

#[derive(Default)]
pub struct QuestLedger {
    quests: Vec<Quest>,
    evaluating: bool,
}

impl QuestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quests(&self) -> &[Quest] {
        &self.quests
    }

    pub fn active(&self) -> Vec<Quest> {
        self.quests
            .iter()
            .filter(|q| q.state == QuestState::Active)
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.quests.clear();
        self.evaluating = false;
    }

    fn insert(&mut self, stub: QuestStub) -> QuestId {
        let id = QuestId::new();
        self.quests.push(Quest {
            id,
            description: stub.description,
            reward_points: stub.reward_points,
            state: QuestState::New,
        });
        id
    }

    /// Add freshly generated quests in the `new` state.
    pub fn add_stubs(&mut self, stubs: Vec<QuestStub>) -> usize {
        let count = stubs.len();
        for stub in stubs {
            self.insert(stub);
        }
        count
    }

    pub fn promote_new(&mut self) -> usize {
        let mut promoted = 0;
        for quest in self.quests.iter_mut().filter(|q| q.state == QuestState::New) {
            quest.state = QuestState::Active;
            promoted += 1;
        }
        promoted
    }

    /// Claim the single evaluation slot. Returns the quests to judge, or
    /// `None` when a round is already in flight or nothing is active.
    pub fn begin_evaluation(&mut self) -> Option<Vec<Quest>> {
        if self.evaluating {
            info!("quest evaluation already in flight, skipping this round");
            return None;
        }
        let active = self.active();
        if active.is_empty() {
            return None;
        }
        self.evaluating = true;
        Some(active)
    }

    /// Apply an evaluation round and release the slot. Ids that are not
    /// currently active are ignored.
    pub fn apply_verdict(&mut self, verdict: QuestVerdict) -> VerdictOutcome {
        self.evaluating = false;
        let mut outcome = VerdictOutcome::default();

        for quest in self.quests.iter_mut().filter(|q| q.state == QuestState::Active) {
            let completed = verdict.completed.contains(&quest.id);
            let failed = verdict.failed.contains(&quest.id);
            if completed && failed {
                warn!("quest {} reported both completed and failed, counting it as completed", quest.id);
            }

            if completed {
                quest.state = QuestState::Completed;
                outcome.points = outcome.points.saturating_add(quest.reward_points);
                outcome.finished.push(quest.id);
                info!("quest completed: {} (+{})", quest.description, quest.reward_points);
            } else if failed {
                quest.state = QuestState::Failed;
                outcome.finished.push(quest.id);
                info!("quest failed: {}", quest.description);
            }
        }

        outcome
    }

    /// Swap a finished quest for its replacement, or drop it when no
    /// replacement was produced. Returns the new quest's id.
    pub fn replace(&mut self, old: QuestId, replacement: Option<QuestStub>) -> Option<QuestId> {
        self.quests.retain(|q| q.id != old);
        replacement.map(|stub| self.insert(stub))
    }
}

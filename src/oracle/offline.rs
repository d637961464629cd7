//! Built-in oracle that plays without any network service. Segments and
//! quests come from embedded text pools; quests are judged by keyword.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use log::debug;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rust_embed::Embed;

use crate::engine::quests::{Quest, QuestStub, QuestVerdict};
use crate::oracle::{
    self, OracleError, OracleResult, SceneOracle, SceneRef, StoryOracle,
};
use crate::session::blank::PLACEHOLDER;

#[derive(Embed)]
#[folder = "assets/story/"]
struct StoryAssets;

const INITIAL_QUEST_COUNT: usize = 3;
const CAPTION_MAX_CHARS: usize = 60;

pub struct OfflineOracle {
    openings: Vec<String>,
    continuations: Vec<String>,
    blanks: Vec<String>,
    quest_pool: Vec<QuestStub>,
    rng: Mutex<SmallRng>,
    /// Story text already judged, so each round only looks at new text.
    judged: Mutex<String>,
    scenes: AtomicUsize,
    latency: Duration,
}

fn asset_text(name: &str) -> OracleResult<String> {
    let file = StoryAssets::get(name)
        .ok_or_else(|| OracleError::Unavailable(format!("missing story asset {name}")))?;
    String::from_utf8(file.data.into_owned())
        .map_err(|e| OracleError::Malformed(format!("{name}: {e}")))
}

fn asset_lines(name: &str) -> OracleResult<Vec<String>> {
    let lines: Vec<String> = asset_text(name)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();
    if lines.is_empty() {
        return Err(OracleError::Malformed(format!("{name} has no entries")));
    }
    Ok(lines)
}

/// Last word of a quest description, lowercased. "Light the lantern"
/// is judged on "lantern".
fn quest_keyword(description: &str) -> Option<String> {
    description
        .split_whitespace()
        .last()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
}

fn is_avoid_quest(description: &str) -> bool {
    description
        .split_whitespace()
        .next()
        .is_some_and(|w| w.eq_ignore_ascii_case("avoid"))
}

fn mentions(text: &str, keyword: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|w| w.to_lowercase() == keyword)
}

impl OfflineOracle {
    pub fn new(seed: Option<u64>, latency: Duration) -> OracleResult<Self> {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let blanks: Vec<String> = asset_lines("blanks.txt")?
            .into_iter()
            .filter(|l| l.contains(PLACEHOLDER))
            .collect();
        if blanks.is_empty() {
            return Err(OracleError::Malformed("blanks.txt has no placeholders".to_string()));
        }

        let quest_pool = oracle::parse_quest_list(&asset_text("quests.json")?)?;

        Ok(Self {
            openings: asset_lines("openings.txt")?,
            continuations: asset_lines("continuations.txt")?,
            blanks,
            quest_pool,
            rng: Mutex::new(rng),
            judged: Mutex::new(String::new()),
            scenes: AtomicUsize::new(0),
            latency,
        })
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut SmallRng) -> T) -> OracleResult<T> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| OracleError::Unavailable("offline rng poisoned".to_string()))?;
        Ok(f(&mut rng))
    }

    fn pick(&self, pool: &[String]) -> OracleResult<String> {
        self.with_rng(|rng| pool.choose(rng).cloned())?
            .ok_or_else(|| OracleError::Unavailable("empty story pool".to_string()))
    }

    /// Text added to the story since the previous round. A story that does
    /// not extend the previous one belongs to a new play-through.
    fn unjudged_text(&self, story: &str) -> OracleResult<String> {
        let mut judged = self
            .judged
            .lock()
            .map_err(|_| OracleError::Unavailable("offline judge poisoned".to_string()))?;
        let fresh = match story.strip_prefix(judged.as_str()) {
            Some(rest) => rest.to_string(),
            None => story.to_string(),
        };
        *judged = story.to_string();
        Ok(fresh)
    }

    async fn think(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl StoryOracle for OfflineOracle {
    async fn next_segment(&self, history: Vec<String>, wants_blank: bool) -> OracleResult<String> {
        self.think().await;
        let pool = if history.is_empty() {
            &self.openings
        } else if wants_blank {
            &self.blanks
        } else {
            &self.continuations
        };
        self.pick(pool)
    }

    async fn initial_quests(&self, _segment: String) -> OracleResult<Vec<QuestStub>> {
        self.think().await;
        self.with_rng(|rng| {
            self.quest_pool
                .choose_multiple(rng, INITIAL_QUEST_COUNT)
                .cloned()
                .collect()
        })
    }

    async fn evaluate_quests(&self, story: String, active: Vec<Quest>) -> OracleResult<QuestVerdict> {
        self.think().await;
        let fresh = self.unjudged_text(&story)?;
        let mut verdict = QuestVerdict::default();

        for quest in &active {
            let Some(keyword) = quest_keyword(&quest.description) else {
                continue;
            };
            if !mentions(&fresh, &keyword) {
                continue;
            }
            if is_avoid_quest(&quest.description) {
                verdict.failed.push(quest.id);
            } else {
                verdict.completed.push(quest.id);
            }
        }

        debug!(
            "offline verdict: {} completed, {} failed",
            verdict.completed.len(),
            verdict.failed.len()
        );
        Ok(verdict)
    }

    async fn replacement_quest(&self, _story: String, current: Vec<Quest>) -> OracleResult<Option<QuestStub>> {
        self.think().await;
        let unused: Vec<&QuestStub> = self
            .quest_pool
            .iter()
            .filter(|stub| !current.iter().any(|q| q.description == stub.description))
            .collect();
        self.with_rng(|rng| unused.choose(rng).map(|stub| (*stub).clone()))
    }
}

impl SceneOracle for OfflineOracle {
    async fn refresh_scene(&self, _story: String, latest: String) -> OracleResult<Option<SceneRef>> {
        self.think().await;
        let latest = latest.trim();
        if latest.is_empty() {
            return Ok(None);
        }

        let n = self.scenes.fetch_add(1, Ordering::Relaxed) + 1;
        let mut caption: String = latest.chars().take(CAPTION_MAX_CHARS).collect();
        if latest.chars().count() > CAPTION_MAX_CHARS {
            caption.push_str("...");
        }
        Ok(Some(SceneRef {
            uri: format!("offline://scene/{n}"),
            caption,
        }))
    }
}

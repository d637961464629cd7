use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::mpsc::UnboundedSender;

use crate::engine::{Effect, SessionEvent};
use crate::oracle::{
    OracleCall, OracleError, OracleOutcome, OracleReply, OracleResult, SceneOracle, StoryOracle,
};

/// Runs engine effects on the tokio runtime and feeds the results back into
/// the event channel as [`SessionEvent`]s. Every call is bounded by
/// `timeout`; nothing here decides whether a reply is still wanted.
pub struct OracleDispatcher<S, I, E> {
    story: Arc<S>,
    scene: Arc<I>,
    events: UnboundedSender<E>,
    timeout: Duration,
}

impl<S, I, E> OracleDispatcher<S, I, E>
where
    S: StoryOracle,
    I: SceneOracle,
    E: From<SessionEvent> + Send + 'static,
{
    pub fn new(story: Arc<S>, scene: Arc<I>, events: UnboundedSender<E>, timeout: Duration) -> Self {
        Self {
            story,
            scene,
            events,
            timeout,
        }
    }

    pub fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&self, effect: Effect) {
        let events = self.events.clone();
        match effect {
            Effect::Request(request) => {
                let story = Arc::clone(&self.story);
                let scene = Arc::clone(&self.scene);
                let timeout = self.timeout;
                tokio::spawn(async move {
                    let generation = request.generation;
                    debug!("{} requested for {generation}", request.call.name());
                    let outcome = run_call(story.as_ref(), scene.as_ref(), request.call, timeout).await;
                    let reply = SessionEvent::Oracle(OracleReply {
                        generation,
                        outcome,
                    });
                    if events.send(reply.into()).is_err() {
                        debug!("session closed before oracle reply was delivered");
                    }
                });
            }
            Effect::SettleQuests { generation, after } => {
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = events.send(SessionEvent::QuestsSettled { generation }.into());
                });
            }
        }
    }
}

async fn bounded<T>(
    name: &str,
    limit: Duration,
    call: impl Future<Output = OracleResult<T>>,
) -> OracleResult<T> {
    let result = match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::Timeout(limit)),
    };
    if let Err(err) = &result {
        warn!("{name} failed: {err}");
    }
    result
}

/// Perform one oracle call and wrap its result in the matching outcome.
pub async fn run_call<S: StoryOracle, I: SceneOracle>(
    story: &S,
    scene: &I,
    call: OracleCall,
    limit: Duration,
) -> OracleOutcome {
    let name = call.name();
    match call {
        OracleCall::NextSegment {
            history,
            wants_blank,
        } => OracleOutcome::Segment(bounded(name, limit, story.next_segment(history, wants_blank)).await),
        OracleCall::InitialQuests { segment } => {
            OracleOutcome::InitialQuests(bounded(name, limit, story.initial_quests(segment)).await)
        }
        OracleCall::EvaluateQuests { story: text, active } => {
            OracleOutcome::Verdict(bounded(name, limit, story.evaluate_quests(text, active)).await)
        }
        OracleCall::ReplacementQuest {
            story: text,
            current,
            replacing,
        } => OracleOutcome::Replacement {
            replacing,
            result: bounded(name, limit, story.replacement_quest(text, current)).await,
        },
        OracleCall::RefreshScene {
            story: text,
            latest,
            seq,
        } => OracleOutcome::Scene {
            seq,
            result: bounded(name, limit, scene.refresh_scene(text, latest)).await,
        },
    }
}

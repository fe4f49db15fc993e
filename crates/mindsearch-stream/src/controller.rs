use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use mindsearch_core::agent::{Agent, AgentInput};
use mindsearch_core::config::StreamConfig;
use mindsearch_core::error::{MindSearchError, Result};
use mindsearch_core::event::StepEvent;
use mindsearch_core::snapshot::StreamFrame;
use mindsearch_core::tree::TreeProjector;

use crate::bridge::{SyncBridge, Termination};
use crate::transport::Transport;

/// Lifecycle of one streaming run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Move to `next`. Callers only request the transitions listed here.
    fn transition(self, next: RunState) -> RunState {
        let allowed = matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        );
        debug_assert!(allowed, "invalid run transition {self:?} -> {next:?}");
        next
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub state: RunState,
    /// Snapshot frames delivered to the transport.
    pub snapshots: usize,
    /// How the producer stopped, as seen when the bridge was closed.
    pub termination: Option<Termination>,
    /// Error detail reported to the transport, if the run failed.
    pub error: Option<String>,
    /// Whether the worker thread finished before the run returned.
    pub worker_released: bool,
}

enum Outcome {
    Completed,
    Failed(String),
}

/// Drives one query from agent to transport.
///
/// Each agent step is projected into a tree and forwarded immediately. The
/// run completes at the first untagged snapshot whose status is `End`, and
/// fails when the agent stops without one, a snapshot cannot be projected,
/// or no step arrives within the configured timeout. The worker is closed
/// on every path before `run` returns.
#[derive(Debug, Clone, Default)]
pub struct StreamController {
    config: StreamConfig,
    projector: TreeProjector,
}

impl StreamController {
    pub fn new(config: StreamConfig, projector: TreeProjector) -> Self {
        Self { config, projector }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Run `agent` on `input`, pushing frames to `transport`.
    ///
    /// Returns `Err` only when the transport fails; agent and graph failures
    /// are reported to the transport as an error frame and in the report.
    pub async fn run(
        &self,
        agent: Arc<dyn Agent>,
        input: AgentInput,
        transport: &mut dyn Transport,
    ) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("stream_run", %run_id, agent = agent.name());
        self.run_inner(run_id, agent, input, transport)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        agent: Arc<dyn Agent>,
        input: AgentInput,
        transport: &mut dyn Transport,
    ) -> Result<RunReport> {
        let mut state = RunState::Idle;
        tracing::info!(query = %input.query, multi_branch = input.multi_branch, "run started");

        let mut bridge = SyncBridge::start(move || agent.stream_chat(input))
            .with_close_timeout(self.config.close_timeout);
        state = state.transition(RunState::Running);

        let mut snapshots = 0usize;
        let outcome = match self.drive(&mut bridge, transport, &mut snapshots).await {
            Ok(Outcome::Failed(detail)) => {
                tracing::error!(error = %detail, "run failed");
                transport
                    .send(StreamFrame::error(detail.clone()))
                    .await
                    .map(|()| Outcome::Failed(detail))
                    .map_err(MindSearchError::from)
            }
            other => other,
        };

        bridge.close().await;
        let termination = bridge.termination().cloned();
        let worker_released = bridge.worker_released();

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = %err, snapshots, "run aborted");
                return Err(err);
            }
        };

        let error = match outcome {
            Outcome::Completed => {
                state = state.transition(RunState::Completed);
                None
            }
            Outcome::Failed(detail) => {
                state = state.transition(RunState::Failed);
                Some(detail)
            }
        };
        tracing::info!(?state, snapshots, worker_released, "run finished");

        Ok(RunReport {
            run_id,
            state,
            snapshots,
            termination,
            error,
            worker_released,
        })
    }

    async fn drive(
        &self,
        bridge: &mut SyncBridge<StepEvent>,
        transport: &mut dyn Transport,
        snapshots: &mut usize,
    ) -> Result<Outcome> {
        loop {
            let next = match self.config.step_timeout {
                Some(limit) => match tokio::time::timeout(limit, bridge.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        let err = MindSearchError::Timeout {
                            elapsed_ms: limit.as_millis() as u64,
                        };
                        return Ok(Outcome::Failed(err.to_string()));
                    }
                },
                None => bridge.next().await,
            };

            let Some(event) = next else {
                let detail = bridge
                    .termination()
                    .map(Termination::detail)
                    .unwrap_or_else(|| Termination::Exhausted.detail());
                return Ok(Outcome::Failed(detail));
            };

            let finished = event.finishes_run();
            let (graph, branch) = event.into_parts();
            tracing::debug!(
                branch = branch.as_deref().unwrap_or("-"),
                status = %graph.state,
                nodes = graph.node_count(),
                "agent step"
            );

            let snapshot = match self.projector.render(graph, branch) {
                Ok(snapshot) => snapshot,
                Err(err) => return Ok(Outcome::Failed(MindSearchError::from(err).to_string())),
            };

            transport.send(snapshot.into_frame()).await?;
            *snapshots += 1;

            if finished {
                return Ok(Outcome::Completed);
            }
        }
    }
}

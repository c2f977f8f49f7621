// Periodic polling job. A single worker task owns the agent state and runs
// cycles from a queue; the scheduler enqueues a cycle on every tick unless
// the previous one is still queued or running, so cycles never overlap.

use tokio::{
    sync::{mpsc, watch},
    task::{self, JoinHandle},
    time::{self, Duration, MissedTickBehavior},
};

use std::sync::Arc;

use crate::poll::{CycleReport, Poller};
use crate::state::AgentState;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollJobState {
    Ready,
    Queued,
    Running,
    Success(CycleReport),
    Failed { error: String },
}

impl PollJobState {
    pub fn finished(&self) -> bool {
        matches!(
            self,
            PollJobState::Ready | PollJobState::Success(_) | PollJobState::Failed { .. }
        )
    }
}

pub type PollJobQueue = mpsc::UnboundedSender<()>;
pub type PollJobStateSender = Arc<watch::Sender<PollJobState>>;
pub type PollJobStateReceiver = watch::Receiver<PollJobState>;

pub struct PollJob {
    queue: PollJobQueue,
    state_sender: PollJobStateSender,
    worker: JoinHandle<()>,
}

impl PollJob {
    /// Spawn the worker. It owns `state` for the rest of the process.
    pub fn listen(poller: Poller, state: AgentState) -> Self {
        let (job_sender, mut job_receiver) = mpsc::unbounded_channel::<()>();
        let (state_sender, _) = watch::channel(PollJobState::Ready);
        let state_sender = Arc::new(state_sender);

        let worker_state_sender = state_sender.clone();
        let worker = task::spawn(async move {
            let mut state = state;
            while job_receiver.recv().await.is_some() {
                worker_state_sender.send_replace(PollJobState::Running);
                match poller.run_cycle(&mut state).await {
                    Ok(report) => {
                        tracing::info!(
                            "Poll cycle done for @{}: {} fetched, {} processed, {} parents fetched",
                            poller.handle(),
                            report.fetched,
                            report.processed,
                            report.parents_fetched
                        );
                        worker_state_sender.send_replace(PollJobState::Success(report));
                    }
                    Err(e) => {
                        tracing::error!("Error checking for mentions: {}", e);
                        worker_state_sender.send_replace(PollJobState::Failed { error: e.to_string() });
                    }
                }
            }
        });

        Self {
            queue: job_sender,
            state_sender,
            worker,
        }
    }

    pub fn subscribe(&self) -> PollJobStateReceiver {
        self.state_sender.subscribe()
    }

    /// Queue a cycle. Returns false, without queueing, if one is already queued or running.
    pub fn send_poll(&self) -> bool {
        if !self.state_sender.borrow().finished() {
            return false;
        }
        self.state_sender.send_replace(PollJobState::Queued);
        if self.queue.send(()).is_err() {
            tracing::error!("Poll worker has stopped");
            self.state_sender.send_replace(PollJobState::Failed {
                error: "worker stopped".to_string(),
            });
            return false;
        }
        true
    }

    /// Queue a cycle now and then once every `interval`, forever.
    pub async fn schedule(&self, interval: Duration) {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if !self.send_poll() {
                tracing::warn!("Poll cycle not queued, skipping this tick");
            }
        }
    }
}

impl Drop for PollJob {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

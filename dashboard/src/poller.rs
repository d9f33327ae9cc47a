use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::NodeClient;
use crate::metrics::{
    NODES_CURRENT, POLLS_TOTAL, POLL_FAILURES_TOTAL, POLL_LATENCY_SECONDS, STALE_RESPONSES_TOTAL,
};
use crate::state::StateHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The node list was replaced with this many nodes
    Applied(usize),
    /// A newer response had already been applied
    Stale,
    Failed,
}

/// Fetches the node list on a fixed cadence.
///
/// Every tick issues its own request without waiting on earlier ones. Requests
/// are numbered, and a response only lands if nothing newer has landed first.
pub struct Poller {
    client: Arc<NodeClient>,
    state: StateHandle,
    interval: Duration,
    cancel: CancellationToken,
    next_seq: AtomicU64,
}

impl Poller {
    pub fn new(
        client: Arc<NodeClient>,
        state: StateHandle,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            state,
            interval,
            cancel,
            next_seq: AtomicU64::new(1),
        }
    }

    fn take_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn poll_once(&self) -> PollOutcome {
        let seq = self.take_seq();
        fetch_and_apply(Arc::clone(&self.client), Arc::clone(&self.state), seq).await
    }

    /// Poll until cancelled. The first request goes out immediately.
    pub async fn run(&self) {
        info!("Starting poller with interval={:?}", self.interval);

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    while in_flight.try_join_next().is_some() {}

                    let seq = self.take_seq();
                    in_flight.spawn(fetch_and_apply(
                        Arc::clone(&self.client),
                        Arc::clone(&self.state),
                        seq,
                    ));
                }

                _ = self.cancel.cancelled() => {
                    debug!("Poller cancelled with {} requests in flight", in_flight.len());
                    break;
                }
            }
        }

        in_flight.abort_all();
        info!("Poller stopped");
    }
}

async fn fetch_and_apply(client: Arc<NodeClient>, state: StateHandle, seq: u64) -> PollOutcome {
    POLLS_TOTAL.inc();
    let start = Instant::now();
    let result = client.list_nodes().await;
    POLL_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());

    let nodes = match result {
        Ok(nodes) => nodes,
        Err(e) => {
            POLL_FAILURES_TOTAL.inc();
            error!("Error fetching data: {}", e);
            return PollOutcome::Failed;
        }
    };

    let count = nodes.len();
    let mut state = state.write().await;
    let previous = state.node_count();

    if !state.apply_nodes(seq, nodes) {
        STALE_RESPONSES_TOTAL.inc();
        warn!(
            "Discarding node list #{}, #{} is already applied",
            seq,
            state.applied_seq()
        );
        return PollOutcome::Stale;
    }

    NODES_CURRENT.set(count as f64);
    if count != previous {
        info!("Node count changed: {} -> {}", previous, count);
    } else {
        debug!("Applied node list #{} ({} nodes)", seq, count);
    }
    PollOutcome::Applied(count)
}

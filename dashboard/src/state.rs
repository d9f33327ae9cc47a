//! Dashboard state shared by the poller, the detail fetcher and the renderer

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::model::{Node, Reading};

/// Side panel showing one node's reading history
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DetailPanel {
    pub open: bool,
    pub node_id: String,
    pub node_name: String,
    pub readings: Vec<Reading>,
}

#[derive(Debug, Default)]
pub struct DashboardState {
    pub nodes: Vec<Node>,
    pub panel: DetailPanel,
    pub last_update: Option<Instant>,
    /// Sequence number of the node list currently held
    applied_seq: u64,
    /// Generation of the most recent selection or close
    selection_gen: u64,
}

pub type StateHandle = Arc<RwLock<DashboardState>>;

pub fn new_state_handle() -> StateHandle {
    Arc::new(RwLock::new(DashboardState::default()))
}

impl DashboardState {
    /// Replace the node list unless a newer response was already applied.
    /// Returns false for a stale response.
    pub fn apply_nodes(&mut self, seq: u64, nodes: Vec<Node>) -> bool {
        if seq <= self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        self.nodes = nodes;
        self.last_update = Some(Instant::now());
        true
    }

    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }

    /// Start a new selection, invalidating any in-flight one
    pub fn begin_selection(&mut self) -> u64 {
        self.selection_gen += 1;
        self.selection_gen
    }

    /// Open the panel with `readings` if `generation` is still the latest selection
    pub fn open_panel(
        &mut self,
        generation: u64,
        node_id: &str,
        node_name: &str,
        readings: Vec<Reading>,
    ) -> bool {
        if generation != self.selection_gen {
            return false;
        }
        self.panel = DetailPanel {
            open: true,
            node_id: node_id.to_string(),
            node_name: node_name.to_string(),
            readings,
        };
        true
    }

    pub fn close_panel(&mut self) {
        self.selection_gen += 1;
        self.panel.open = false;
        self.panel.readings.clear();
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

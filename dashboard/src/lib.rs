//! Fire-risk sensor dashboard
//!
//! Polls a node API for sensor locations and fire-risk readings, keeps the
//! latest node list in shared state, and loads a node's reading history on
//! demand.

pub mod client;
pub mod config;
pub mod detail;
pub mod errors;
pub mod io;
pub mod metrics;
pub mod model;
pub mod poller;
pub mod risk;
pub mod state;
pub mod tui;

pub use client::NodeClient;
pub use config::Config;
pub use detail::{DetailFetcher, DetailOutcome};
pub use errors::{Error, Result};
pub use poller::{PollOutcome, Poller};
pub use state::{new_state_handle, DashboardState, StateHandle};

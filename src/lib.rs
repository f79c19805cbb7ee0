//! ticktrack - client-side timer sync engine for the TickTrack time tracker
//!
//! Keeps a locally ticking stopwatch consistent with the server-held
//! authoritative recorded time across network latency, restarts, and
//! start/pause/finish actions. The server owns the accounting; this crate
//! owns the loaded task collection, the confirmation-gated timer state
//! machine, the one-second display tick, and the persisted selection.

pub mod api;
pub mod config;
pub mod mapper;
pub mod models;
pub mod selection;
pub mod store;
pub mod timer;

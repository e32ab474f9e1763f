// =====================================================================================
// File: core-events/src/lib.rs
// Description: Live event broadcasting for Rapid100 operator dashboards
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

//! # Core Events Module
//!
//! In-process fan-out of call lifecycle events to connected operator
//! dashboards. Publishing is fire-and-forget with at-least-once delivery to
//! currently connected subscribers: the hub never blocks the caller, never
//! holds session locks, and drops events (logged) when nobody listens or a
//! subscriber lags past the ring capacity. Subscribers dedup by
//! `call_sid` + `updated_at`.

pub mod event_bus;
pub mod events;

pub use event_bus::{BroadcastError, BroadcastHub, HubStats};
pub use events::{CallEvent, CallUpdatePayload, StatsSnapshot};

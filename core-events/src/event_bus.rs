// =====================================================================================
// File: core-events/src/event_bus.rs
// Description: Bounded broadcast hub fanning call events out to subscribers
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::events::CallEvent;

/// Broadcast error types.
///
/// Publishing is best-effort; these errors are reported so callers can
/// count the drop, never retried (dashboards resync on their next poll).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BroadcastError {
    /// No dashboard is connected; the event went nowhere
    #[error("No subscribers connected, event '{event}' dropped")]
    NoSubscribers { event: &'static str },
}

/// Publish/drop counters for observability
#[derive(Debug, Default)]
pub struct HubStats {
    pub published: AtomicU64,
    pub dropped: AtomicU64,
}

/// In-process broadcast hub over a bounded ring.
///
/// `publish` is synchronous and never blocks; it must be callable from the
/// session manager without holding any of its locks. When no subscriber is
/// connected, or the ring is saturated and a receiver lags, events are
/// dropped with a warning - dashboards resync on their next poll.
#[derive(Clone)]
pub struct BroadcastHub {
    sender: broadcast::Sender<CallEvent>,
    enabled: bool,
    stats: Arc<HubStats>,
}

impl BroadcastHub {
    pub fn new(capacity: usize, enabled: bool) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            enabled,
            stats: Arc::new(HubStats::default()),
        }
    }

    /// Subscribe a new dashboard connection
    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Fire-and-forget publish. Returns the number of subscribers reached,
    /// or the drop as an error for the caller's counters; never blocks,
    /// never retries.
    pub fn publish(&self, event: CallEvent) -> Result<usize, BroadcastError> {
        if !self.enabled {
            return Ok(0);
        }

        let name = event.name();
        match self.sender.send(event) {
            Ok(reached) => {
                self.stats.published.fetch_add(1, Ordering::Relaxed);
                debug!(event = name, subscribers = reached, "Event published");
                Ok(reached)
            }
            Err(_) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(event = name, "No subscribers connected, event dropped");
                Err(BroadcastError::NoSubscribers { event: name })
            }
        }
    }

    pub fn stats(&self) -> &HubStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StatsSnapshot;

    fn stats_event(total: i64) -> CallEvent {
        CallEvent::StatsUpdate(StatsSnapshot {
            total_calls: total,
            ..StatsSnapshot::default()
        })
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let hub = BroadcastHub::new(16, true);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        assert_eq!(hub.publish(stats_event(5)), Ok(2));

        for receiver in [&mut first, &mut second] {
            match receiver.recv().await.unwrap() {
                CallEvent::StatsUpdate(stats) => assert_eq!(stats.total_calls, 5),
                other => panic!("unexpected event {:?}", other.name()),
            }
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_reports_the_drop() {
        let hub = BroadcastHub::new(16, true);
        assert_eq!(
            hub.publish(stats_event(1)),
            Err(BroadcastError::NoSubscribers {
                event: "stats_update"
            })
        );
        assert_eq!(hub.stats().dropped.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_disabled_hub_is_inert() {
        let hub = BroadcastHub::new(16, false);
        let mut receiver = hub.subscribe();
        assert_eq!(hub.publish(stats_event(1)), Ok(0));
        assert!(matches!(
            receiver.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_lagged_subscriber_resyncs_from_next_event() {
        let hub = BroadcastHub::new(2, true);
        let mut receiver = hub.subscribe();

        for total in 0..8 {
            let _ = hub.publish(stats_event(total));
        }

        // The slow reader observes the lag, then continues with live events
        assert!(matches!(
            receiver.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        assert!(receiver.recv().await.is_ok());
    }
}

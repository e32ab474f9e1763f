// =====================================================================================
// File: service-voice/src/websocket.rs
// Description: Live operator socket - relays call events to connected dashboards
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_ws::Message;
use futures_util::StreamExt as _;
use tracing::{debug, info, warn};

use core_events::CallEvent;

use crate::AppState;

/// GET /ws - upgrade and relay hub events as JSON text frames.
///
/// The client receives an initial `stats_update` on connect, then every hub
/// event. Dedup is the subscriber's job (`call_sid` + `updated_at`).
pub async fn live_events(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (response, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    let mut receiver = state.hub.subscribe();
    state.metrics.live_subscribers.inc();
    info!(subscribers = state.hub.subscriber_count(), "Dashboard connected");

    let initial_stats = state.sessions.stats_snapshot().await;
    let state = state.clone();

    actix_web::rt::spawn(async move {
        if let Ok(payload) = serde_json::to_string(&CallEvent::StatsUpdate(initial_stats)) {
            if session.text(payload).await.is_err() {
                state.metrics.live_subscribers.dec();
                return;
            }
        }

        loop {
            tokio::select! {
                event = receiver.recv() => match event {
                    Ok(event) => {
                        match serde_json::to_string(&event) {
                            Ok(payload) => {
                                if session.text(payload).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!(error = %e, "Failed to encode live event"),
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        // Dashboards resync from the next event
                        warn!(skipped, "Slow dashboard lagged behind the event ring");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
                message = msg_stream.next() => match message {
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(reason))) => {
                        debug!(?reason, "Dashboard closed the socket");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "Socket protocol error");
                        break;
                    }
                    None => break,
                },
            }
        }

        state.metrics.live_subscribers.dec();
        info!("Dashboard disconnected");
        let _ = session.close(None).await;
    });

    Ok(response)
}

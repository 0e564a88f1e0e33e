//! One WebSocket subscriber connection
//!
//! The connection task is the only writer to its socket. It multiplexes:
//! - inbound frames (filter install or clear)
//! - throttled deliveries from the subscriber's channel
//! - heartbeat pings
//!
//! The registry entry lives exactly as long as the `Subscription`; dropping it
//! (connection closed, or upgrade never completed) removes the entry.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use chirp_protocol::{ControlMessage, ErrorFrame, Event};
use chirp_tap::{FilterUpdate, SubscriberId, SubscriberRegistry, TapError, ThrottleReceiver};
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::AppState;

/// Registry entry plus its delivery channel
pub(crate) struct Subscription {
    registry: Arc<SubscriberRegistry>,
    id: SubscriberId,
    rx: ThrottleReceiver<Arc<Event>>,
}

impl Subscription {
    /// Register a new subscriber
    pub(crate) fn open(registry: Arc<SubscriberRegistry>) -> Result<Self, TapError> {
        let (id, rx) = registry.add()?;
        Ok(Self { registry, id, rx })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Already gone after a shutdown close_all
        let _ = self.registry.remove(self.id);
    }
}

/// What the loop should do after handling a frame
enum Flow {
    Continue,
    Close,
}

/// Drive one connection until either side closes
pub(crate) async fn run(socket: WebSocket, state: AppState, mut subscription: Subscription) {
    let id = subscription.id;
    info!(subscriber_id = %id, subscribers = state.registry.count(), "subscriber connected");

    let (mut sink, mut stream) = socket.split();
    let mut heartbeat = state.heartbeat.map(heartbeat_interval);

    loop {
        let flow = tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(message)) => handle_inbound(message, id, &state, &mut sink).await,
                Some(Err(e)) => {
                    debug!(subscriber_id = %id, error = %e, "websocket read failed");
                    Flow::Close
                }
                None => Flow::Close,
            },

            delivery = subscription.rx.recv() => match delivery {
                Some(event) => send_text(&mut sink, event.raw().to_owned()).await,
                None => {
                    // Channel closed by the registry (shutdown)
                    let _ = sink.send(Message::Close(None)).await;
                    Flow::Close
                }
            },

            _ = tick(&mut heartbeat) => match sink.send(Message::Ping(Default::default())).await {
                Ok(()) => Flow::Continue,
                Err(_) => Flow::Close,
            },
        };

        if let Flow::Close = flow {
            break;
        }
    }

    drop(subscription);
    info!(subscriber_id = %id, "subscriber disconnected");
}

async fn handle_inbound(
    message: Message,
    id: SubscriberId,
    state: &AppState,
    sink: &mut SplitSink<WebSocket, Message>,
) -> Flow {
    let control = match &message {
        Message::Text(text) => Ok(ControlMessage::from_text(text.as_str())),
        Message::Binary(bytes) => ControlMessage::from_bytes(bytes),
        Message::Close(_) => return Flow::Close,
        Message::Ping(_) | Message::Pong(_) => return Flow::Continue,
    };

    let result = match control {
        Ok(ControlMessage::Clear) => state
            .registry
            .set_predicate(id, None)
            .map(|()| FilterUpdate::Cleared),
        Ok(ControlMessage::Filter(payload)) => {
            state.registry.update_filter(id, payload, &state.operators)
        }
        Err(e) => {
            warn!(subscriber_id = %id, error = %e, "unreadable control frame");
            return send_text(sink, ErrorFrame::new(e.to_string()).encode()).await;
        }
    };

    match result {
        Ok(update) => {
            debug!(subscriber_id = %id, ?update, "filter updated");
            Flow::Continue
        }
        Err(TapError::Predicate(e)) => {
            warn!(subscriber_id = %id, error = %e, "filter rejected");
            send_text(sink, ErrorFrame::new(e.to_string()).encode()).await
        }
        Err(e) => {
            warn!(subscriber_id = %id, error = %e, "subscriber no longer registered");
            Flow::Close
        }
    }
}

async fn send_text(sink: &mut SplitSink<WebSocket, Message>, text: String) -> Flow {
    match sink.send(Message::Text(text.into())).await {
        Ok(()) => Flow::Continue,
        Err(_) => Flow::Close,
    }
}

fn heartbeat_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Next heartbeat tick; never resolves when heartbeats are disabled
async fn tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

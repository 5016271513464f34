//! Server-sent event stream of power readings
//!
//! Every `/events` connection gets its own stream that samples the register
//! on a fixed interval and emits `data: <reading>\n\n`. When the client goes
//! away hyper fails the write and drops the body; dropping the stream drops
//! its [`ConnectionGuard`], which is the only cleanup path a connection has.

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::audio::power::format_reading;
use crate::audio::register::ReadingRegister;
use crate::ui::server::AppState;

/// Live connection bookkeeping
#[derive(Debug, Default)]
pub struct Subscribers {
    active: AtomicUsize,
    next_id: AtomicU64,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connections currently streaming
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Register a new connection
    pub fn connect(self: &Arc<Self>) -> ConnectionGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("Event client {} connected ({} active)", id, active);

        ConnectionGuard {
            id,
            frames: 0,
            subscribers: self.clone(),
        }
    }
}

/// Held by one connection's stream; releases the slot on drop
pub struct ConnectionGuard {
    id: u64,
    frames: u64,
    subscribers: Arc<Subscribers>,
}

impl ConnectionGuard {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let active = self.subscribers.active.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::debug!(
            "Event client {} disconnected after {} frames ({} active)",
            self.id,
            self.frames,
            active
        );
    }
}

/// One event frame for `value`
pub fn encode_frame(value: f64) -> Bytes {
    Bytes::from(format!("data: {}\n\n", format_reading(value)))
}

/// Endless frame stream: first frame immediately, then one per `period`
pub fn frame_stream(
    register: Arc<ReadingRegister>,
    period: Duration,
    guard: ConnectionGuard,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    let mut ticker = tokio::time::interval(period);
    // A stalled client gets the current value when it drains, not a burst
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    stream::unfold(
        (ticker, register, guard),
        |(mut ticker, register, mut guard)| async move {
            ticker.tick().await;
            let frame = encode_frame(register.read());
            guard.frames += 1;
            Some((Ok(frame), (ticker, register, guard)))
        },
    )
}

/// `GET /events`
pub async fn events_handler(State(state): State<Arc<AppState>>) -> Response {
    let guard = state.subscribers.connect();
    let stream = frame_stream(
        state.register.clone(),
        state.config.broadcast_interval(),
        guard,
    );

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[test]
    fn test_encode_frame() {
        assert_eq!(&encode_frame(42.3)[..], b"data: 42.3\n\n");
        assert_eq!(&encode_frame(0.0)[..], b"data: 0.0\n\n");
    }

    #[test]
    fn test_guard_releases_slot() {
        let subscribers = Arc::new(Subscribers::new());
        let a = subscribers.connect();
        let b = subscribers.connect();
        assert_ne!(a.id(), b.id());
        assert_eq!(subscribers.active(), 2);

        drop(a);
        assert_eq!(subscribers.active(), 1);
        drop(b);
        assert_eq!(subscribers.active(), 0);
    }

    #[tokio::test]
    async fn test_stream_follows_register() {
        let register = Arc::new(ReadingRegister::new());
        let subscribers = Arc::new(Subscribers::new());

        let mut stream = Box::pin(frame_stream(
            register.clone(),
            Duration::from_millis(50),
            subscribers.connect(),
        ));

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(&first[..], b"data: 0.0\n\n");

        register.publish(61.7);
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(&second[..], b"data: 61.7\n\n");

        assert_eq!(subscribers.active(), 1);
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_guard() {
        let register = Arc::new(ReadingRegister::new());
        let subscribers = Arc::new(Subscribers::new());

        let stream = frame_stream(register, Duration::from_millis(50), subscribers.connect());
        assert_eq!(subscribers.active(), 1);

        drop(stream);
        assert_eq!(subscribers.active(), 0);
    }
}

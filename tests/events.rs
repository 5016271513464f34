//! End-to-end checks of the `/events` stream over a real socket

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;

use pcm_power_meter::{
    audio::{spawn_capture_thread, CaptureSource, ReadingRegister},
    config::UiConfig,
    error::AudioError,
    ui::{router, AppState},
};

async fn spawn_server(register: Arc<ReadingRegister>) -> (SocketAddr, Arc<AppState>) {
    let state = Arc::new(AppState::new(register, UiConfig::default()).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

async fn open_events(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /events HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    stream
}

/// Read from `stream` for `window` and return everything received
async fn read_for(stream: &mut TcpStream, window: Duration) -> String {
    let deadline = Instant::now() + window;
    let mut received = Vec::new();
    let mut buf = [0u8; 1024];

    loop {
        match tokio::time::timeout_at(deadline, stream.read(&mut buf)).await {
            Ok(Ok(0)) | Ok(Err(_)) | Err(_) => break,
            Ok(Ok(n)) => received.extend_from_slice(&buf[..n]),
        }
    }

    String::from_utf8_lossy(&received).into_owned()
}

/// Pull the `<value>` out of every complete `data: <value>\n\n` frame
fn frame_values(raw: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut rest = raw;

    while let Some(start) = rest.find("data: ") {
        let after = &rest[start + "data: ".len()..];
        match after.find("\n\n") {
            Some(end) => {
                values.push(after[..end].to_string());
                rest = &after[end + 2..];
            }
            None => break,
        }
    }

    values
}

/// `-?\d+\.\d`
fn is_one_decimal(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    match digits.split_once('.') {
        Some((int, frac)) => {
            !int.is_empty()
                && int.chars().all(|c| c.is_ascii_digit())
                && frac.len() == 1
                && frac.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

async fn wait_for_active(state: &AppState, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while state.subscribers.active() != expected {
        assert!(
            Instant::now() < deadline,
            "expected {} active clients, have {}",
            expected,
            state.subscribers.active()
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_stream_headers_and_frames() {
    let register = Arc::new(ReadingRegister::new());
    register.publish(42.3);
    let (addr, _state) = spawn_server(register).await;

    let mut stream = open_events(addr).await;
    let raw = read_for(&mut stream, Duration::from_millis(300)).await;

    let head = raw.split("\r\n\r\n").next().unwrap().to_ascii_lowercase();
    assert!(head.starts_with("http/1.1 200"));
    assert!(head.contains("content-type: text/event-stream"));
    assert!(head.contains("cache-control: no-cache"));
    assert!(head.contains("connection: keep-alive"));

    let values = frame_values(&raw);
    assert!(values.len() >= 3, "only {} frames in 300 ms", values.len());
    for value in &values {
        assert!(is_one_decimal(value), "bad frame value {:?}", value);
        assert_eq!(value, "42.3");
    }
}

#[tokio::test]
async fn test_frames_only_carry_published_values() {
    let register = Arc::new(ReadingRegister::new());
    let (addr, _state) = spawn_server(register.clone()).await;

    let publisher = {
        let register = register.clone();
        tokio::spawn(async move {
            for v in [10.5, 20.0, 33.3, 47.9, 55.1] {
                register.publish(v);
                tokio::time::sleep(Duration::from_millis(40)).await;
            }
        })
    };

    let mut stream = open_events(addr).await;
    let raw = read_for(&mut stream, Duration::from_millis(300)).await;
    publisher.await.unwrap();

    let allowed = ["0.0", "10.5", "20.0", "33.3", "47.9", "55.1"];
    let values = frame_values(&raw);
    assert!(values.len() >= 3);
    for value in &values {
        assert!(allowed.contains(&value.as_str()), "unpublished value {:?}", value);
    }
}

#[tokio::test]
async fn test_closing_one_client_keeps_others_streaming() {
    let register = Arc::new(ReadingRegister::new());
    register.publish(12.5);
    let (addr, state) = spawn_server(register).await;

    let mut first = open_events(addr).await;
    let mut second = open_events(addr).await;
    let _ = read_for(&mut first, Duration::from_millis(100)).await;
    wait_for_active(&state, 2).await;

    drop(first);
    wait_for_active(&state, 1).await;

    let raw = read_for(&mut second, Duration::from_millis(250)).await;
    let values = frame_values(&raw);
    assert!(values.len() >= 3, "survivor got {} frames", values.len());
    assert!(values.iter().all(|v| v == "12.5"));
}

/// Measures a couple of blocks, then the device disappears
struct FailingSource {
    blocks: VecDeque<Vec<i16>>,
}

impl CaptureSource for FailingSource {
    fn read_block(&mut self, block: &mut [i16]) -> Result<(), AudioError> {
        match self.blocks.pop_front() {
            Some(data) => {
                block.copy_from_slice(&data);
                Ok(())
            }
            None => Err(AudioError::StreamError("device removed".into())),
        }
    }
}

#[tokio::test]
async fn test_stream_survives_capture_failure() {
    let register = Arc::new(ReadingRegister::new());
    let capture = spawn_capture_thread(
        || {
            Ok(FailingSource {
                // 100^2 -> 40.0 dB, then 1000^2 -> 60.0 dB
                blocks: VecDeque::from(vec![vec![100i16; 256], vec![-1000i16; 256]]),
            })
        },
        register.clone(),
        256,
    )
    .unwrap();
    let stats = capture.stats();
    tokio::task::spawn_blocking(move || capture.join())
        .await
        .unwrap();
    assert!(!stats.is_running());
    assert_eq!(stats.blocks(), 2);

    let (addr, _state) = spawn_server(register).await;
    let mut stream = open_events(addr).await;
    let raw = read_for(&mut stream, Duration::from_millis(400)).await;

    let values = frame_values(&raw);
    assert!(values.len() >= 5);
    assert!(values.iter().all(|v| v == "60.0"));
}

#[tokio::test]
async fn test_unknown_path_is_not_a_stream() {
    let (addr, _state) = spawn_server(Arc::new(ReadingRegister::new())).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /nope HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let raw = read_for(&mut stream, Duration::from_millis(200)).await;

    assert!(raw.starts_with("HTTP/1.1 404"));
    assert!(frame_values(&raw).is_empty());
}

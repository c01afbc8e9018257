//! End-to-end monitor pool tests against a mock ICY stream

use castmeta::{IcyClient, IcyMonitorPool, IcyPoller, MonitorPool, PoolConfig};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn icy_response(meta_interval: usize, metadata: &str) -> ResponseTemplate {
    let mut body = vec![0x55u8; meta_interval];
    let mut block = metadata.as_bytes().to_vec();
    let length = block.len().div_ceil(16);
    block.resize(length * 16, 0);
    body.push(length as u8);
    body.extend_from_slice(&block);

    ResponseTemplate::new(200)
        .insert_header("icy-metaint", meta_interval.to_string().as_str())
        .set_body_bytes(body)
}

fn fast_pool() -> IcyMonitorPool {
    MonitorPool::new(
        IcyPoller::new(IcyClient::new().unwrap()),
        PoolConfig {
            poll_interval: Duration::from_millis(25),
        },
    )
}

#[tokio::test]
async fn test_song_change_reaches_cache_and_history() {
    let server = MockServer::start().await;

    // First two polls see song A, later polls see song B.
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(icy_response(32, "StreamTitle='Artist A - First Song';"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(icy_response(32, "StreamTitle='Artist B - Second Song';"))
        .mount(&server)
        .await;

    let pool = fast_pool();
    let url = format!("{}/stream", server.uri());

    pool.start(&url).await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    let entry = pool.get_metadata(&url).await.expect("entry published");
    assert_eq!(entry.artist.as_deref(), Some("Artist B"));
    assert_eq!(entry.title.as_deref(), Some("Second Song"));
    assert_eq!(entry.history.len(), 1);
    assert_eq!(entry.history[0].artist.as_deref(), Some("Artist A"));

    pool.shutdown().await;
}

#[tokio::test]
async fn test_stop_bounds_polling_and_keeps_last_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(icy_response(32, "StreamTitle='Artist A - First Song';"))
        .mount(&server)
        .await;

    let pool = fast_pool();
    let url = format!("{}/stream", server.uri());

    pool.start(&url).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(pool.active_durations().await.len(), 1);

    pool.stop(&url).await;
    assert!(pool.active_durations().await.is_empty());

    // Any in-flight poll may still land; after that the request count must
    // stay flat.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let settled = server.received_requests().await.unwrap().len();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), settled);

    // The last-known entry survives the stop.
    let entry = pool.get_metadata(&url).await.expect("entry retained");
    assert_eq!(entry.artist.as_deref(), Some("Artist A"));
}

#[tokio::test]
async fn test_unsupported_stream_keeps_retrying() {
    let server = MockServer::start().await;

    // Plain audio stream: no icy-metaint header, ever.
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x55u8; 64]))
        .mount(&server)
        .await;

    let pool = fast_pool();
    let url = format!("{}/stream", server.uri());

    pool.start(&url).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // No metadata, but the monitor does not give up on its own.
    assert!(pool.get_metadata(&url).await.is_none());
    assert!(pool.is_monitoring(&url).await);
    assert!(server.received_requests().await.unwrap().len() >= 2);

    pool.shutdown().await;
}

#[tokio::test]
async fn test_poll_failures_do_not_stop_the_monitor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(icy_response(32, "StreamTitle='Artist A - First Song';"))
        .mount(&server)
        .await;

    let pool = fast_pool();
    let url = format!("{}/stream", server.uri());

    pool.start(&url).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The two failed polls were logged and skipped; the third succeeded.
    let entry = pool.get_metadata(&url).await.expect("entry published");
    assert_eq!(entry.artist.as_deref(), Some("Artist A"));

    pool.shutdown().await;
}

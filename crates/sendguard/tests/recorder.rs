//! Integration tests for the send recorder.
//!
//! These tests drive the public API with an in-memory message store and
//! a mock clock, so expiry and draft ageing run in virtual time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use chrono::TimeDelta;

use sendguard::time::{Clock, MockClock};
use sendguard::{
    Attachment, Fingerprint, LookupError, MessageLookup, OutgoingMessage, RecorderConfig,
    RemoteMessage, RemoteState, SendRecorder, SendStatus,
};

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("sendguard=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Message store returning canned results per remote identifier.
#[derive(Default)]
struct MockStore {
    messages: Mutex<HashMap<String, Result<RemoteMessage, LookupError>>>,
    calls: AtomicUsize,
}

impl MockStore {
    fn with(remote_id: &str, result: Result<RemoteMessage, LookupError>) -> Self {
        let store = Self::default();
        store.set(remote_id, result);
        store
    }

    fn set(&self, remote_id: &str, result: Result<RemoteMessage, LookupError>) {
        self.messages
            .lock()
            .unwrap()
            .insert(remote_id.to_string(), result);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MessageLookup for MockStore {
    async fn fetch(&self, remote_id: &str) -> Result<RemoteMessage, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.messages
            .lock()
            .unwrap()
            .get(remote_id)
            .cloned()
            .unwrap_or_else(|| Err(LookupError::not_found(remote_id)))
    }
}

fn setup() -> (SendRecorder<Arc<MockClock>>, Arc<MockClock>) {
    init_tracing();
    let clock = MockClock::shared();
    let recorder = SendRecorder::with_clock(RecorderConfig::default(), Arc::clone(&clock));
    (recorder, clock)
}

fn message() -> OutgoingMessage {
    OutgoingMessage::new("addr-1", "Invoice #42", "Please find the invoice attached.")
        .sender("billing@example.com")
        .to("customer@example.com")
        .cc("accounts@example.com")
        .attachment(Attachment::new("invoice-42.pdf", "application/pdf", 48_213))
}

fn draft_at(clock: &MockClock, age: TimeDelta) -> RemoteMessage {
    RemoteMessage::new(RemoteState::Draft, clock.now() - age)
}

#[tokio::test]
async fn test_fresh_draft_is_sending() {
    let (recorder, clock) = setup();
    let fp = message().fingerprint();
    recorder.record(fp.clone(), "remote-1");

    let store = MockStore::with("remote-1", Ok(draft_at(&clock, TimeDelta::zero())));
    let status = recorder.query_status(&store, &fp).await;

    assert_eq!(
        status,
        SendStatus {
            is_sending: true,
            was_sent: false
        }
    );
    assert!(!status.should_send());
}

#[tokio::test]
async fn test_sent_message_was_sent() {
    let (recorder, clock) = setup();
    let fp = message().fingerprint();
    recorder.record(fp.clone(), "remote-1");

    let store = MockStore::with(
        "remote-1",
        Ok(RemoteMessage::new(RemoteState::Sent, clock.now())),
    );
    assert_eq!(
        recorder.query_status(&store, &fp).await,
        SendStatus::ALREADY_SENT
    );
}

#[tokio::test]
async fn test_sent_to_self_was_sent() {
    let (recorder, clock) = setup();
    let fp = message().fingerprint();
    recorder.record(fp.clone(), "remote-1");

    let store = MockStore::with(
        "remote-1",
        Ok(RemoteMessage::new(RemoteState::SentToSelf, clock.now())),
    );
    assert_eq!(
        recorder.query_status(&store, &fp).await,
        SendStatus::ALREADY_SENT
    );
}

#[tokio::test]
async fn test_stuck_draft_allows_resend() {
    let (recorder, clock) = setup();
    let fp = message().fingerprint();
    recorder.record(fp.clone(), "remote-1");

    let store = MockStore::with("remote-1", Ok(draft_at(&clock, TimeDelta::minutes(11))));
    assert_eq!(
        recorder.query_status(&store, &fp).await,
        SendStatus::NOT_SENT
    );
}

#[tokio::test]
async fn test_other_state_allows_send() {
    let (recorder, clock) = setup();
    let fp = message().fingerprint();
    recorder.record(fp.clone(), "remote-1");

    let store = MockStore::with(
        "remote-1",
        Ok(RemoteMessage::new(RemoteState::Other, clock.now())),
    );
    assert_eq!(
        recorder.query_status(&store, &fp).await,
        SendStatus::NOT_SENT
    );
}

#[tokio::test]
async fn test_expired_record_is_evicted() {
    let (recorder, clock) = setup();
    let fp = message().fingerprint();
    recorder.record(fp.clone(), "remote-1");

    clock.advance(Duration::from_secs(31 * 60));

    let store = MockStore::with(
        "remote-1",
        Ok(RemoteMessage::new(RemoteState::Sent, clock.now())),
    );
    assert_eq!(
        recorder.query_status(&store, &fp).await,
        SendStatus::NOT_SENT
    );
    assert_eq!(store.calls(), 0);
    assert!(recorder.get(&fp).is_none());
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_record_within_window_survives() {
    let (recorder, clock) = setup();
    let fp = message().fingerprint();
    recorder.record(fp.clone(), "remote-1");

    clock.advance(Duration::from_secs(29 * 60));

    let store = MockStore::with(
        "remote-1",
        Ok(RemoteMessage::new(RemoteState::Sent, clock.now())),
    );
    assert_eq!(
        recorder.query_status(&store, &fp).await,
        SendStatus::ALREADY_SENT
    );
}

#[tokio::test]
async fn test_lookup_failure_fails_open() {
    let (recorder, _clock) = setup();
    let fp = message().fingerprint();
    recorder.record(fp.clone(), "remote-1");

    for error in [
        LookupError::not_found("remote-1"),
        LookupError::Network("connection reset".into()),
        LookupError::Transient("503 Service Unavailable".into()),
        LookupError::Other("unexpected response".into()),
    ] {
        let store = MockStore::with("remote-1", Err(error));
        assert_eq!(
            recorder.query_status(&store, &fp).await,
            SendStatus::NOT_SENT
        );
        assert_eq!(store.calls(), 1);
    }
}

#[tokio::test]
async fn test_unknown_fingerprint_does_not_call_lookup() {
    let (recorder, clock) = setup();
    recorder.record(message().fingerprint(), "remote-1");

    let store = MockStore::with(
        "remote-1",
        Ok(RemoteMessage::new(RemoteState::Sent, clock.now())),
    );
    let unseen = message().to("someone-else@example.com").fingerprint();

    assert_eq!(
        recorder.query_status(&store, &unseen).await,
        SendStatus::NOT_SENT
    );
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_overwrite_uses_latest_remote_id() {
    let (recorder, clock) = setup();
    let fp = message().fingerprint();
    recorder.record(fp.clone(), "remote-old");
    recorder.record(fp.clone(), "remote-new");

    let store = MockStore::default();
    store.set("remote-old", Ok(draft_at(&clock, TimeDelta::zero())));
    store.set(
        "remote-new",
        Ok(RemoteMessage::new(RemoteState::Sent, clock.now())),
    );

    assert_eq!(
        recorder.query_status(&store, &fp).await,
        SendStatus::ALREADY_SENT
    );
    assert_eq!(recorder.len(), 1);
}

#[tokio::test]
async fn test_lifecycle() {
    let (recorder, clock) = setup();
    let msg = message();
    let store = MockStore::default();

    let (fp, status) = recorder.check_message(&store, &msg).await;
    assert!(status.should_send());

    // Accepted by the store as a draft, not yet delivered.
    store.set("remote-1", Ok(draft_at(&clock, TimeDelta::zero())));
    recorder.record(fp.clone(), "remote-1");

    let (again, status) = recorder.check_message(&store, &msg).await;
    assert_eq!(again, fp);
    assert_eq!(status, SendStatus::SEND_IN_PROGRESS);

    store.set(
        "remote-1",
        Ok(RemoteMessage::new(RemoteState::Sent, clock.now())),
    );
    assert_eq!(
        recorder.query_status(&store, &fp).await,
        SendStatus::ALREADY_SENT
    );

    clock.advance(Duration::from_secs(31 * 60));
    assert!(recorder.query_status(&store, &fp).await.should_send());
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_shared_lookup_via_arc() {
    let (recorder, clock) = setup();
    let fp = message().fingerprint();
    recorder.record(fp.clone(), "remote-1");

    let store = Arc::new(MockStore::with(
        "remote-1",
        Ok(RemoteMessage::new(RemoteState::Sent, clock.now())),
    ));
    assert_eq!(
        recorder.query_status(&store, &fp).await,
        SendStatus::ALREADY_SENT
    );
    assert_eq!(store.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_records_are_all_visible() {
    init_tracing();
    let recorder = Arc::new(SendRecorder::new());
    let fingerprints: Vec<Fingerprint> = (0..64)
        .map(|i| {
            OutgoingMessage::new("addr-1", format!("Message {i}"), "body")
                .to("bob@example.com")
                .fingerprint()
        })
        .collect();

    let handles: Vec<_> = fingerprints
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, fp)| {
            let recorder = Arc::clone(&recorder);
            tokio::spawn(async move { recorder.record(fp, format!("remote-{i}")) })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let store = MockStore::default();
    for i in 0..fingerprints.len() {
        store.set(
            &format!("remote-{i}"),
            Ok(RemoteMessage::new(RemoteState::Sent, chrono::Utc::now())),
        );
    }

    assert_eq!(recorder.len(), fingerprints.len());
    for (i, fp) in fingerprints.iter().enumerate() {
        assert_eq!(recorder.get(fp).unwrap().remote_id, format!("remote-{i}"));
        assert_eq!(
            recorder.query_status(&store, fp).await,
            SendStatus::ALREADY_SENT
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_and_records() {
    let (recorder, clock) = setup();
    let recorder = Arc::new(recorder);
    let store = Arc::new(MockStore::default());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let recorder = Arc::clone(&recorder);
            let store = Arc::clone(&store);
            let now = clock.now();
            tokio::spawn(async move {
                let msg = OutgoingMessage::new("addr-1", format!("Retry {i}"), "body");
                let (fp, status) = recorder.check_message(&store, &msg).await;
                assert!(status.should_send());

                let remote_id = format!("remote-{i}");
                store.set(&remote_id, Ok(RemoteMessage::new(RemoteState::Draft, now)));
                recorder.record(fp.clone(), remote_id);

                recorder.query_status(&store, &fp).await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), SendStatus::SEND_IN_PROGRESS);
    }
    assert_eq!(recorder.len(), 16);
}

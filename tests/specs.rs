//! End-to-end coverage of spec.md §8's literal scenarios, wiring
//! `td-storage`, `td-coordinator::dispatch`/`lifecycle`, and
//! `td-worker::pipeline`/`retry` together in-process. No real `ffmpeg`
//! or whisper.cpp binary is available in this environment, so the
//! worker side is driven through small local fakes that implement the
//! same `Decoder`/`Transcoder`/`Transcriber`/`NotifyAdapter` traits the
//! production adapters implement.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use td_core::{Clock, FakeClock, TaskId, TaskStatus};
use td_coordinator::dispatch::{router, AppState};
use td_coordinator::{lifecycle, Config as CoordinatorConfig};
use td_storage::TaskStore;
use td_worker::client::DispatchClient;
use td_worker::durability::DurabilityBins;
use td_worker::notify::{NotifyAdapter, NotifyError};
use td_worker::pipeline::{Decoder, IterationOutcome, TranscribeOptions, Transcoder, Transcriber, WorkerLoop};
use td_worker::retry::RetryDriver;
use td_worker::signal::InterruptFlag;
use td_worker::WorkerError;

struct StubDecoder(f64);

#[async_trait]
impl Decoder for StubDecoder {
    async fn duration_secs(&self, _path: &Path) -> Result<f64, WorkerError> {
        Ok(self.0)
    }
}

struct StubTranscoder;

#[async_trait]
impl Transcoder for StubTranscoder {
    async fn transcode(&self, _src: &Path, dst: &Path) -> Result<(), WorkerError> {
        tokio::fs::write(dst, b"stub-wav-bytes")
            .await
            .map_err(|e| WorkerError::TranscodeFailed(e.to_string()))?;
        Ok(())
    }
}

struct StubTranscriber(String);

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, wav: &Path, _language: &str, _opts: &TranscribeOptions) -> Result<PathBuf, WorkerError> {
        let vtt_path = wav.with_extension("wav.vtt");
        tokio::fs::write(&vtt_path, &self.0)
            .await
            .map_err(|e| WorkerError::TranscribeFailed {
                message: e.to_string(),
                stdout_tail: Vec::new(),
                stderr_tail: Vec::new(),
            })?;
        Ok(vtt_path)
    }
}

#[derive(Default)]
struct CountingNotifyAdapter {
    calls: std::sync::Mutex<usize>,
}

#[async_trait]
impl NotifyAdapter for CountingNotifyAdapter {
    async fn notify(&self, _title: &str, _message: &str) -> Result<(), NotifyError> {
        *self.calls.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        Ok(())
    }
}

impl CountingNotifyAdapter {
    fn count(&self) -> usize {
        *self.calls.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn coordinator_config(audio_dir: &Path, db_file: &Path, lease_secs: u64) -> CoordinatorConfig {
    CoordinatorConfig {
        audio_dir: audio_dir.to_path_buf(),
        db_file: db_file.to_path_buf(),
        log_dir: audio_dir.join("logs"),
        bind_addr: "127.0.0.1:0".into(),
        lease_secs,
        sync_secs: 300,
        k_attempts: 10,
    }
}

/// Binds a real coordinator HTTP server to an ephemeral port.
async fn spawn_coordinator(store: Arc<TaskStore>, config: &CoordinatorConfig) -> String {
    let state = AppState::new(store, config);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

fn write_clip(dir: &Path, stem: &str, language: Option<&str>) -> PathBuf {
    let mp3 = dir.join(format!("{stem}.mp3"));
    std::fs::write(&mp3, b"fake-mp3-bytes").unwrap();
    if let Some(language) = language {
        let json = dir.join(format!("{stem}.json"));
        std::fs::write(&json, format!(r#"{{"sql_params":{{"language":"{language}"}}}}"#)).unwrap();
    }
    mp3
}

fn build_worker_loop(
    base_url: String,
    bins: Arc<DurabilityBins>,
    notify: Arc<CountingNotifyAdapter>,
) -> (WorkerLoop, tempfile::TempDir) {
    let scratch = tempfile::tempdir().unwrap();
    let audit = Arc::new(td_worker::audit::WorkerAuditLog::new(scratch.path().join("processed.csv")));
    let client = DispatchClient::new(base_url, None);
    let loop_ = WorkerLoop::new(
        client,
        Arc::new(StubDecoder(42.0)),
        Arc::new(StubTranscoder),
        Arc::new(StubTranscriber("WEBVTT\n\nhello world".into())),
        bins,
        audit,
        notify,
        TranscribeOptions::default(),
        scratch.path().to_path_buf(),
        Duration::from_millis(1),
        Duration::from_millis(1),
    );
    (loop_, scratch)
}

#[tokio::test]
async fn scenario_1_happy_path_completes_and_writes_artifact() {
    let audio_dir = tempfile::tempdir().unwrap();
    write_clip(audio_dir.path(), "clip", Some("en"));

    let store = Arc::new(TaskStore::open_in_memory().unwrap());
    let clock = FakeClock::default();
    lifecycle::reconcile_once(&store, audio_dir.path(), &clock).unwrap();

    let config = coordinator_config(audio_dir.path(), Path::new("unused.db"), 3600);
    let base_url = spawn_coordinator(store.clone(), &config).await;

    let work_dir = tempfile::tempdir().unwrap();
    let bins = Arc::new(DurabilityBins::ensure(work_dir.path()).unwrap());
    let notify = Arc::new(CountingNotifyAdapter::default());
    let (loop_, scratch) = build_worker_loop(base_url, bins, notify.clone());

    let outcome = loop_.run_iteration().await;
    let expected_id = TaskId::for_path(&audio_dir.path().join("clip.mp3").to_string_lossy());
    assert_eq!(outcome, IterationOutcome::Completed { task_id: expected_id.to_string() });

    let vtt_path = audio_dir.path().join("clip.vtt");
    assert_eq!(std::fs::read_to_string(vtt_path).unwrap(), "WEBVTT\n\nhello world");
    assert_eq!(
        store.status_of(&audio_dir.path().join("clip.mp3").to_string_lossy()).unwrap(),
        Some(TaskStatus::Completed)
    );
    assert_eq!(notify.count(), 0);

    let audit_csv = std::fs::read_to_string(scratch.path().join("processed.csv")).unwrap();
    assert!(audit_csv.contains(",success,"));
}

#[tokio::test]
async fn scenario_2_missing_sidecar_fails_the_row_and_then_returns_no_content() {
    let audio_dir = tempfile::tempdir().unwrap();
    let mp3 = write_clip(audio_dir.path(), "clip", None);

    let store = Arc::new(TaskStore::open_in_memory().unwrap());
    let clock = FakeClock::default();
    lifecycle::reconcile_once(&store, audio_dir.path(), &clock).unwrap();

    let config = coordinator_config(audio_dir.path(), Path::new("unused.db"), 3600);
    let base_url = spawn_coordinator(store.clone(), &config).await;

    let dest = tempfile::tempdir().unwrap();
    let client = DispatchClient::new(base_url, None);
    let assignment = client.poll_task(&dest.path().join("poll.mp3")).await.unwrap();
    assert_eq!(assignment, None);

    assert_eq!(store.status_of(&mp3.to_string_lossy()).unwrap(), Some(TaskStatus::Failed));
}

#[tokio::test]
async fn scenario_3_crashed_worker_lease_recovers_and_is_reclaimed() {
    let audio_dir = tempfile::tempdir().unwrap();
    write_clip(audio_dir.path(), "clip", Some("en"));
    let path = audio_dir.path().join("clip.mp3").to_string_lossy().into_owned();

    let store = TaskStore::open_in_memory().unwrap();
    let clock = FakeClock::new(1_000);
    lifecycle::reconcile_once(&store, audio_dir.path(), &clock).unwrap();

    let claimed = store.claim_one("worker-a", clock.now_unix_secs(), 60).unwrap().unwrap();
    assert_eq!(claimed.path, path);

    // Worker A vanishes without ever reporting. Advance well past T_lease.
    clock.advance(120);
    let expired = store.expire_leases(clock.now_unix_secs()).unwrap();
    assert_eq!(expired, 1);
    assert_eq!(store.status_of(&path).unwrap(), Some(TaskStatus::Failed));

    // Next walk observes the artifact is still missing and resurrects it.
    let counts = lifecycle::reconcile_once(&store, audio_dir.path(), &clock).unwrap();
    assert_eq!(counts.reset, 1);
    assert_eq!(store.status_of(&path).unwrap(), Some(TaskStatus::Pending));

    let reclaimed = store.claim_one("worker-b", clock.now_unix_secs(), 60).unwrap();
    assert!(reclaimed.is_some());
}

/// A coordinator fixture that serves exactly one task, then 404s on
/// every `/result` and `/error` call, modeling an unreachable
/// coordinator at upload time.
mod unreachable_fixture {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderValue, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};

    pub const TASK_ID: &str = "abc123deadbeef0123456789abcdef01";

    #[derive(Clone, Default)]
    pub struct State_ {
        has_task: Arc<AtomicBool>,
    }

    async fn get_task(State(fx): State<State_>) -> Response {
        if !fx.has_task.swap(false, Ordering::SeqCst) {
            return StatusCode::NO_CONTENT.into_response();
        }
        let mut response = Response::new(axum::body::Body::from(b"fake-mp3-bytes".to_vec()));
        response.headers_mut().insert(td_wire::headers::X_TASK_ID, HeaderValue::from_static(TASK_ID));
        response.headers_mut().insert(td_wire::headers::X_LANGUAGE, HeaderValue::from_static("en"));
        response
    }

    async fn always_404() -> StatusCode {
        StatusCode::NOT_FOUND
    }

    pub async fn spawn() -> String {
        let app = Router::new()
            .route("/task", get(get_task))
            .route("/result", post(always_404))
            .route("/error", post(always_404))
            .with_state(State_::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }
}

async fn spawn_always_ok() -> String {
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    async fn always_ok() -> (StatusCode, Json<td_wire::OkResponseBody>) {
        (StatusCode::OK, Json(td_wire::OkResponseBody::default()))
    }

    let app = Router::new().route("/result", post(always_ok)).route("/error", post(always_ok));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

#[tokio::test]
async fn scenario_4_coordinator_unreachable_at_upload_then_retry_clears_it() {
    let base_url = unreachable_fixture::spawn().await;
    let work_dir = tempfile::tempdir().unwrap();
    let bins = Arc::new(DurabilityBins::ensure(work_dir.path()).unwrap());
    let notify = Arc::new(CountingNotifyAdapter::default());
    let (loop_, _scratch) = build_worker_loop(base_url, bins.clone(), notify.clone());

    let outcome = loop_.run_iteration().await;
    assert!(matches!(outcome, IterationOutcome::Failed { .. }));

    let task_id = unreachable_fixture::TASK_ID;
    assert!(bins.not_uploaded_dir().join(format!("{task_id}.vtt")).exists());
    assert!(bins.has_failed_report(task_id));
    assert_eq!(notify.count(), 1);

    // A subsequent `--retry-failed` run against a reachable coordinator
    // clears both the artifact and the marker.
    let reachable_url = spawn_always_ok().await;
    let retry_notify = Arc::new(CountingNotifyAdapter::default());
    let driver = RetryDriver::new(
        DispatchClient::new(reachable_url, None),
        bins.clone(),
        retry_notify,
        Duration::from_millis(1),
    );
    let summary = driver.run().await.unwrap();
    assert_eq!(summary.uploaded, 1);
    assert!(bins.uploaded_dir().join(format!("{task_id}.vtt")).exists());
    assert!(!bins.not_uploaded_dir().join(format!("{task_id}.vtt")).exists());
    assert!(!bins.has_failed_report(task_id));
}

#[tokio::test]
async fn scenario_5_belated_result_after_lease_expiry_returns_not_found() {
    // This exercises the terminal-row guard (a late POST landing on an
    // already-`failed` row), not an actual reassignment-then-reclaim —
    // see DESIGN.md's td-storage section for why a genuine second claim
    // on the same path can't be distinguished by this guard, since it
    // re-derives the identical `MD5(path)` task id.
    let audio_dir = tempfile::tempdir().unwrap();
    write_clip(audio_dir.path(), "clip", Some("en"));
    let path = audio_dir.path().join("clip.mp3").to_string_lossy().into_owned();

    let store = Arc::new(TaskStore::open_in_memory().unwrap());
    let clock = FakeClock::new(1_000);
    lifecycle::reconcile_once(&store, audio_dir.path(), &clock).unwrap();

    let claimed = store.claim_one("worker-a", clock.now_unix_secs(), 60).unwrap().unwrap();
    clock.advance(120);
    store.expire_leases(clock.now_unix_secs()).unwrap();
    assert_eq!(store.status_of(&path).unwrap(), Some(TaskStatus::Failed));

    let config = coordinator_config(audio_dir.path(), Path::new("unused.db"), 3600);
    let base_url = spawn_coordinator(store.clone(), &config).await;
    let client = DispatchClient::new(base_url, None);

    // Worker A's belated result lands after the row is already terminal.
    let delivered = client.post_result(claimed.task_id.as_str(), "WEBVTT\n\nstale").await.unwrap();
    assert!(!delivered, "a late result for an expired lease must be rejected");
}

#[tokio::test]
async fn scenario_6_graceful_interrupt_finishes_in_flight_task_and_stops_polling() {
    use axum::extract::State;
    use axum::http::{HeaderValue, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::Json;

    #[derive(Clone, Default)]
    struct Fixture {
        poll_count: Arc<AtomicUsize>,
        has_task: Arc<AtomicBool>,
    }

    async fn get_task(State(fx): State<Fixture>) -> Response {
        fx.poll_count.fetch_add(1, Ordering::SeqCst);
        if !fx.has_task.swap(false, Ordering::SeqCst) {
            return StatusCode::NO_CONTENT.into_response();
        }
        let mut response = Response::new(axum::body::Body::from(b"fake-mp3-bytes".to_vec()));
        response.headers_mut().insert(
            td_wire::headers::X_TASK_ID,
            HeaderValue::from_static("abcdef0123456789abcdef0123456789"),
        );
        response.headers_mut().insert(td_wire::headers::X_LANGUAGE, HeaderValue::from_static("en"));
        response
    }

    async fn post_result(Json(_req): Json<td_wire::ResultRequest>) -> impl IntoResponse {
        (StatusCode::OK, Json(td_wire::OkResponseBody::default()))
    }

    let fx = Fixture { poll_count: Arc::new(AtomicUsize::new(0)), has_task: Arc::new(AtomicBool::new(true)) };
    let poll_count = fx.poll_count.clone();

    let app = axum::Router::new()
        .route("/task", get(get_task))
        .route("/result", post(post_result))
        .with_state(fx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    let base_url = format!("http://{addr}");

    let work_dir = tempfile::tempdir().unwrap();
    let bins = Arc::new(DurabilityBins::ensure(work_dir.path()).unwrap());
    let notify = Arc::new(CountingNotifyAdapter::default());
    let (loop_, _scratch) = build_worker_loop(base_url, bins.clone(), notify);

    // Simulate SIGTERM arriving before the worker loop starts: the
    // in-flight task still runs to completion, but no further poll is
    // issued once it resolves.
    let interrupted = InterruptFlag::new();
    interrupted.set();
    loop_.run(&interrupted, || false).await;

    assert_eq!(poll_count.load(Ordering::SeqCst), 1);
    assert!(bins.uploaded_dir().join("abcdef0123456789abcdef0123456789.vtt").exists());
}

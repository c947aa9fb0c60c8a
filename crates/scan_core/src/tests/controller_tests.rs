use super::*;
use std::{
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
};

use chrono::Utc;
use shared::{
    domain::{HEATMAP_PLACEHOLDER, MODEL_VERSION, TUMOR_TYPE_PLACEHOLDER},
    error::ScanErrorKind,
};

struct StaticPreviewLoader;

#[async_trait]
impl PreviewLoader for StaticPreviewLoader {
    async fn load_preview(
        &self,
        path: &Path,
    ) -> std::result::Result<LoadedPreview, PreviewError> {
        Ok(stub_loaded_preview(path))
    }
}

struct DelayedPreviewLoader {
    delay: Duration,
}

#[async_trait]
impl PreviewLoader for DelayedPreviewLoader {
    async fn load_preview(
        &self,
        path: &Path,
    ) -> std::result::Result<LoadedPreview, PreviewError> {
        tokio::time::sleep(self.delay).await;
        Ok(stub_loaded_preview(path))
    }
}

struct FailingPreviewLoader;

#[async_trait]
impl PreviewLoader for FailingPreviewLoader {
    async fn load_preview(
        &self,
        path: &Path,
    ) -> std::result::Result<LoadedPreview, PreviewError> {
        Err(PreviewError::Read {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file vanished"),
        })
    }
}

struct FixedResultGenerator {
    has_tumor: bool,
    calls: Arc<AtomicUsize>,
}

impl FixedResultGenerator {
    fn tumor() -> Self {
        Self {
            has_tumor: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn clear() -> Self {
        Self {
            has_tumor: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ResultGenerator for FixedResultGenerator {
    fn generate(&self) -> ScanResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ScanResult {
            has_tumor: self.has_tumor,
            confidence: 0.91,
            tumor_type: Some(TUMOR_TYPE_PLACEHOLDER.to_string()),
            heatmap_ref: Some(HEATMAP_PLACEHOLDER.to_string()),
            analysis_id: "AN-FIXED001".to_string(),
            analyzed_at: Utc::now(),
            model_version: MODEL_VERSION.to_string(),
        }
    }
}

fn stub_loaded_preview(path: &Path) -> LoadedPreview {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    LoadedPreview {
        file: SelectedScan {
            path: path.to_path_buf(),
            file_name,
            size_bytes: 2 * 1024 * 1024,
            mime_type: Some("image/jpeg".to_string()),
        },
        preview: ScanPreview {
            width: 8,
            height: 8,
            rgba: vec![128; 8 * 8 * 4],
        },
    }
}

fn tumor_controller() -> Arc<ScanController> {
    ScanController::new_with_dependencies(
        Arc::new(StaticPreviewLoader),
        Arc::new(FixedResultGenerator::tumor()),
    )
}

/// Lets spawned controller tasks run without moving the paused clock.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Advances the paused clock in 1 ms quanta, settling before the first step
/// (so tasks spawned since the last await arm their timers at the current
/// instant) and after every step (so a timer firing at its exact deadline can
/// arm its follow-up timer before the clock moves again).
async fn advance_ms(ms: u64) {
    settle().await;
    for _ in 0..ms {
        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
    }
}

async fn select_scan(controller: &Arc<ScanController>) {
    controller
        .select_file(PathBuf::from("/scans/mri_axial.jpg"))
        .await
        .expect("select scan");
    settle().await;
}

fn drain_events(rx: &mut broadcast::Receiver<WorkflowEvent>) -> Vec<WorkflowEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn phases_in(events: &[WorkflowEvent]) -> Vec<WorkflowPhase> {
    events
        .iter()
        .filter_map(|event| match event {
            WorkflowEvent::PhaseChanged(phase) => Some(*phase),
            _ => None,
        })
        .collect()
}

fn progress_in(events: &[WorkflowEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            WorkflowEvent::UploadProgressed(progress) => Some(*progress),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn preview_resolution_gates_the_preview_ready_phase() {
    let controller = ScanController::new_with_dependencies(
        Arc::new(DelayedPreviewLoader {
            delay: Duration::from_millis(40),
        }),
        Arc::new(FixedResultGenerator::tumor()),
    );

    select_scan(&controller).await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::Idle);
    assert!(snapshot.file.is_none());
    assert!(snapshot.preview.is_none());

    advance_ms(39).await;
    assert_eq!(controller.snapshot().await.phase, WorkflowPhase::Idle);

    advance_ms(1).await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::PreviewReady);
    assert_eq!(
        snapshot.file.as_ref().map(|file| file.file_name.as_str()),
        Some("mri_axial.jpg")
    );
    assert!(snapshot.preview.is_some());
}

#[tokio::test(start_paused = true)]
async fn failed_preview_resolution_surfaces_the_failure_phase() {
    let controller = ScanController::new_with_dependencies(
        Arc::new(FailingPreviewLoader),
        Arc::new(FixedResultGenerator::tumor()),
    );
    let mut rx = controller.subscribe_events();

    select_scan(&controller).await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::Failed);
    assert!(snapshot.file.is_none());
    let error = snapshot.error.expect("failure is recorded");
    assert_eq!(error.kind, ScanErrorKind::FileRead);

    let events = drain_events(&mut rx);
    assert!(events
        .iter()
        .any(|event| matches!(event, WorkflowEvent::ScanFailed { .. })));

    controller.reset().await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::Idle);
    assert!(snapshot.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn start_upload_is_ignored_outside_preview_ready() {
    let controller = tumor_controller();
    controller.start_upload().await.expect("noop from idle");
    settle().await;
    assert_eq!(controller.snapshot().await.phase, WorkflowPhase::Idle);

    advance_ms(10_000).await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::Idle);
    assert_eq!(snapshot.progress, 0);
    assert!(snapshot.result.is_none());

    let failed = ScanController::new_with_dependencies(
        Arc::new(FailingPreviewLoader),
        Arc::new(FixedResultGenerator::tumor()),
    );
    select_scan(&failed).await;
    failed.start_upload().await.expect("noop from failed");
    settle().await;
    assert_eq!(failed.snapshot().await.phase, WorkflowPhase::Failed);
}

#[tokio::test(start_paused = true)]
async fn a_second_start_upload_does_not_restart_the_running_transfer() {
    let generator = FixedResultGenerator::tumor();
    let calls = generator.calls.clone();
    let controller = ScanController::new_with_dependencies(
        Arc::new(StaticPreviewLoader),
        Arc::new(generator),
    );

    select_scan(&controller).await;
    controller.start_upload().await.expect("start upload");
    advance_ms(700).await;
    controller.start_upload().await.expect("double click");
    advance_ms(1300).await;

    // Were the transfer restarted, the deadline would now be 2700ms and the
    // phase still Uploading.
    assert_eq!(controller.snapshot().await.phase, WorkflowPhase::Processing);

    advance_ms(3000).await;
    assert_eq!(
        controller.snapshot().await.phase,
        WorkflowPhase::ResultsReady
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn upload_holds_until_the_fixed_transfer_deadline() {
    let controller = tumor_controller();
    select_scan(&controller).await;
    controller.start_upload().await.expect("start upload");

    advance_ms(1999).await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::Uploading);
    assert_eq!(snapshot.progress, 95);

    advance_ms(1).await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::Processing);
    assert_eq!(snapshot.progress, 100);
}

#[tokio::test(start_paused = true)]
async fn processing_completes_with_a_fabricated_result_after_its_fixed_delay() {
    let generator = FixedResultGenerator::tumor();
    let calls = generator.calls.clone();
    let controller = ScanController::new_with_dependencies(
        Arc::new(StaticPreviewLoader),
        Arc::new(generator),
    );
    let mut rx = controller.subscribe_events();

    select_scan(&controller).await;
    controller.start_upload().await.expect("start upload");
    advance_ms(2000).await;
    assert_eq!(controller.snapshot().await.phase, WorkflowPhase::Processing);

    advance_ms(2999).await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::Processing);
    assert!(snapshot.result.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    advance_ms(1).await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::ResultsReady);
    assert_eq!(snapshot.progress, 100);
    let result = snapshot.result.expect("fabricated result");
    assert!(result.has_tumor);
    assert_eq!(result.confidence, 0.91);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let events = drain_events(&mut rx);
    assert_eq!(
        phases_in(&events),
        vec![
            WorkflowPhase::PreviewReady,
            WorkflowPhase::Uploading,
            WorkflowPhase::Processing,
            WorkflowPhase::ResultsReady,
        ]
    );
    assert!(events.iter().any(|event| matches!(
        event,
        WorkflowEvent::ScanCompleted { result } if result.analysis_id == "AN-FIXED001"
    )));
}

#[tokio::test(start_paused = true)]
async fn tumor_type_is_populated_even_for_a_clear_verdict() {
    let controller = ScanController::new_with_dependencies(
        Arc::new(StaticPreviewLoader),
        Arc::new(FixedResultGenerator::clear()),
    );

    select_scan(&controller).await;
    controller.start_upload().await.expect("start upload");
    advance_ms(5000).await;

    let result = controller
        .snapshot()
        .await
        .result
        .expect("fabricated result");
    assert!(!result.has_tumor);
    assert_eq!(result.tumor_type.as_deref(), Some(TUMOR_TYPE_PLACEHOLDER));
}

#[tokio::test(start_paused = true)]
async fn random_results_fall_in_the_documented_confidence_band() {
    let controller = ScanController::new_with_dependencies(
        Arc::new(StaticPreviewLoader),
        Arc::new(RandomResultGenerator),
    );

    select_scan(&controller).await;
    controller.start_upload().await.expect("start upload");
    advance_ms(5000).await;

    let result = controller
        .snapshot()
        .await
        .result
        .expect("fabricated result");
    assert!((0.87..0.97).contains(&result.confidence));
    assert!(result.analysis_id.starts_with("AN-"));
    assert_eq!(result.heatmap_ref.as_deref(), Some(HEATMAP_PLACEHOLDER));
}

#[tokio::test(start_paused = true)]
async fn upload_progress_is_monotonic_and_clamped() {
    let controller = tumor_controller();
    let mut rx = controller.subscribe_events();

    select_scan(&controller).await;
    controller.start_upload().await.expect("start upload");
    advance_ms(2000).await;

    let values = progress_in(&drain_events(&mut rx));
    assert_eq!(values.first(), Some(&0));
    assert_eq!(values.last(), Some(&100));
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(values.iter().all(|value| *value <= 100));
}

#[tokio::test(start_paused = true)]
async fn reset_during_upload_cancels_the_pending_transfer_timers() {
    let controller = tumor_controller();
    let mut rx = controller.subscribe_events();

    select_scan(&controller).await;
    controller.start_upload().await.expect("start upload");
    advance_ms(1000).await;
    assert_eq!(controller.snapshot().await.phase, WorkflowPhase::Uploading);

    controller.reset().await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::Idle);
    assert!(snapshot.file.is_none());
    assert!(snapshot.preview.is_none());
    assert_eq!(snapshot.progress, 0);

    {
        let inner = controller.inner.lock().await;
        assert!(inner.preview_task.is_none());
        assert!(inner.tick_task.is_none());
        assert!(inner.phase_task.is_none());
    }

    let _ = drain_events(&mut rx);
    advance_ms(10_000).await;
    assert_eq!(controller.snapshot().await.phase, WorkflowPhase::Idle);
    assert!(
        drain_events(&mut rx).is_empty(),
        "no timer may fire after reset"
    );
}

#[tokio::test(start_paused = true)]
async fn reset_during_processing_discards_the_pending_result() {
    let generator = FixedResultGenerator::tumor();
    let calls = generator.calls.clone();
    let controller = ScanController::new_with_dependencies(
        Arc::new(StaticPreviewLoader),
        Arc::new(generator),
    );

    select_scan(&controller).await;
    controller.start_upload().await.expect("start upload");
    advance_ms(2500).await;
    assert_eq!(controller.snapshot().await.phase, WorkflowPhase::Processing);

    controller.reset().await;
    advance_ms(10_000).await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::Idle);
    assert!(snapshot.result.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0, "result was never fabricated");
}

#[tokio::test(start_paused = true)]
async fn reset_cancels_an_in_flight_preview_resolution() {
    let controller = ScanController::new_with_dependencies(
        Arc::new(DelayedPreviewLoader {
            delay: Duration::from_millis(40),
        }),
        Arc::new(FixedResultGenerator::tumor()),
    );

    select_scan(&controller).await;
    advance_ms(20).await;
    controller.reset().await;
    advance_ms(100).await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::Idle);
    assert!(snapshot.file.is_none());
    assert!(snapshot.preview.is_none());
}

#[tokio::test(start_paused = true)]
async fn reset_after_results_clears_the_result_and_is_idempotent() {
    let controller = tumor_controller();
    select_scan(&controller).await;
    controller.start_upload().await.expect("start upload");
    advance_ms(5000).await;
    assert!(controller.snapshot().await.result.is_some());

    controller.reset().await;
    controller.reset().await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::Idle);
    assert!(snapshot.result.is_none());
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.progress, 0);
}

#[tokio::test(start_paused = true)]
async fn selection_is_ignored_while_a_scan_is_in_flight() {
    let controller = tumor_controller();
    select_scan(&controller).await;
    controller.start_upload().await.expect("start upload");

    advance_ms(500).await;
    controller
        .select_file(PathBuf::from("/scans/other.png"))
        .await
        .expect("ignored during upload");
    settle().await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::Uploading);
    assert_eq!(
        snapshot.file.as_ref().map(|file| file.file_name.as_str()),
        Some("mri_axial.jpg")
    );

    advance_ms(1700).await;
    controller
        .select_file(PathBuf::from("/scans/other.png"))
        .await
        .expect("ignored during processing");
    settle().await;
    assert_eq!(controller.snapshot().await.phase, WorkflowPhase::Processing);

    advance_ms(2800).await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::ResultsReady);
    assert_eq!(
        snapshot.file.as_ref().map(|file| file.file_name.as_str()),
        Some("mri_axial.jpg")
    );
}

#[tokio::test(start_paused = true)]
async fn a_new_selection_replaces_the_previous_preview_and_result() {
    let controller = tumor_controller();
    select_scan(&controller).await;
    controller.start_upload().await.expect("start upload");
    advance_ms(5000).await;
    assert!(controller.snapshot().await.result.is_some());

    controller
        .select_file(PathBuf::from("/scans/follow_up.png"))
        .await
        .expect("reselect after results");
    settle().await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::PreviewReady);
    assert!(snapshot.result.is_none());
    assert_eq!(
        snapshot.file.as_ref().map(|file| file.file_name.as_str()),
        Some("follow_up.png")
    );
}

#[tokio::test(start_paused = true)]
async fn a_superseded_preview_resolution_never_lands() {
    let controller = ScanController::new_with_dependencies(
        Arc::new(DelayedPreviewLoader {
            delay: Duration::from_millis(40),
        }),
        Arc::new(FixedResultGenerator::tumor()),
    );

    controller
        .select_file(PathBuf::from("/scans/first.png"))
        .await
        .expect("first selection");
    settle().await;
    advance_ms(20).await;

    controller
        .select_file(PathBuf::from("/scans/second.png"))
        .await
        .expect("second selection");
    settle().await;

    // The first load would have resolved at 40ms; only the second may land.
    advance_ms(40).await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::PreviewReady);
    assert_eq!(
        snapshot.file.as_ref().map(|file| file.file_name.as_str()),
        Some("second.png")
    );
}

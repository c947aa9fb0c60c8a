use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{ScanResult, SelectedScan, WorkflowPhase},
    error::ScanError,
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

pub mod generate;
pub mod preview;

pub use generate::{RandomResultGenerator, ResultGenerator};
pub use preview::{ImagePreviewLoader, LoadedPreview, PreviewError, PreviewLoader, ScanPreview};

pub const UPLOAD_TICK_INTERVAL: Duration = Duration::from_millis(100);
pub const UPLOAD_TICK_STEP: u8 = 5;
pub const UPLOAD_DURATION: Duration = Duration::from_millis(2000);
pub const PROCESSING_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    PhaseChanged(WorkflowPhase),
    UploadProgressed(u8),
    PreviewLoaded {
        file: SelectedScan,
        preview: ScanPreview,
    },
    ScanCompleted {
        result: ScanResult,
    },
    ScanFailed {
        error: ScanError,
    },
}

#[derive(Debug, Clone)]
pub struct WorkflowSnapshot {
    pub phase: WorkflowPhase,
    pub file: Option<SelectedScan>,
    pub preview: Option<ScanPreview>,
    pub progress: u8,
    pub result: Option<ScanResult>,
    pub error: Option<ScanError>,
}

#[async_trait]
pub trait ScanWorkflow: Send + Sync {
    async fn select_file(&self, path: PathBuf) -> Result<()>;
    async fn start_upload(&self) -> Result<()>;
    async fn reset(&self);
    async fn snapshot(&self) -> WorkflowSnapshot;
    fn subscribe_events(&self) -> broadcast::Receiver<WorkflowEvent>;
}

pub struct ScanController {
    preview_loader: Arc<dyn PreviewLoader>,
    result_generator: Arc<dyn ResultGenerator>,
    inner: Mutex<ScanControllerState>,
    events: broadcast::Sender<WorkflowEvent>,
}

struct ScanControllerState {
    phase: WorkflowPhase,
    file: Option<SelectedScan>,
    preview: Option<ScanPreview>,
    progress: u8,
    result: Option<ScanResult>,
    last_error: Option<ScanError>,
    // Bumped on every reset and every accepted selection. Spawned timer
    // tasks re-check it under the lock and bail out on mismatch, so an
    // aborted task that was already past its sleep can never touch state
    // belonging to a newer selection.
    epoch: u64,
    preview_task: Option<JoinHandle<()>>,
    tick_task: Option<JoinHandle<()>>,
    phase_task: Option<JoinHandle<()>>,
}

impl ScanControllerState {
    fn take_tasks(&mut self) -> [Option<JoinHandle<()>>; 3] {
        [
            self.preview_task.take(),
            self.tick_task.take(),
            self.phase_task.take(),
        ]
    }
}

impl ScanController {
    pub fn new() -> Arc<Self> {
        Self::new_with_dependencies(
            Arc::new(ImagePreviewLoader::default()),
            Arc::new(RandomResultGenerator::default()),
        )
    }

    pub fn new_with_dependencies(
        preview_loader: Arc<dyn PreviewLoader>,
        result_generator: Arc<dyn ResultGenerator>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            preview_loader,
            result_generator,
            inner: Mutex::new(ScanControllerState {
                phase: WorkflowPhase::Idle,
                file: None,
                preview: None,
                progress: 0,
                result: None,
                last_error: None,
                epoch: 0,
                preview_task: None,
                tick_task: None,
                phase_task: None,
            }),
            events,
        })
    }

    pub async fn select_file(self: &Arc<Self>, path: PathBuf) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.phase.is_busy() {
            warn!(
                "scan: file selection ignored phase={:?} path={}",
                guard.phase,
                path.display()
            );
            return Ok(());
        }

        guard.epoch += 1;
        let epoch = guard.epoch;
        if let Some(task) = guard.preview_task.take() {
            task.abort();
        }

        let previous_phase = guard.phase;
        guard.phase = WorkflowPhase::Idle;
        guard.file = None;
        guard.preview = None;
        guard.result = None;
        guard.last_error = None;
        guard.progress = 0;
        if previous_phase != WorkflowPhase::Idle {
            let _ = self
                .events
                .send(WorkflowEvent::PhaseChanged(WorkflowPhase::Idle));
        }

        info!("scan: resolving preview path={}", path.display());
        guard.preview_task = Some(self.spawn_preview_task(path, epoch));
        Ok(())
    }

    fn spawn_preview_task(self: &Arc<Self>, path: PathBuf, epoch: u64) -> JoinHandle<()> {
        let loader = Arc::clone(&self.preview_loader);
        let controller = Arc::downgrade(self);
        tokio::spawn(async move {
            let outcome = loader.load_preview(&path).await;
            let Some(controller) = controller.upgrade() else {
                return;
            };
            controller.finish_preview(epoch, outcome).await;
        })
    }

    async fn finish_preview(
        &self,
        epoch: u64,
        outcome: std::result::Result<LoadedPreview, PreviewError>,
    ) {
        let mut guard = self.inner.lock().await;
        if guard.epoch != epoch {
            return;
        }
        guard.preview_task = None;

        match outcome {
            Ok(LoadedPreview { file, preview }) => {
                info!(
                    "scan: preview ready file={} size_bytes={}",
                    file.file_name, file.size_bytes
                );
                guard.file = Some(file.clone());
                guard.preview = Some(preview.clone());
                guard.phase = WorkflowPhase::PreviewReady;
                let _ = self
                    .events
                    .send(WorkflowEvent::PreviewLoaded { file, preview });
                let _ = self
                    .events
                    .send(WorkflowEvent::PhaseChanged(WorkflowPhase::PreviewReady));
            }
            Err(err) => {
                let error = ScanError::from(err);
                warn!("scan: preview failed {error}");
                guard.phase = WorkflowPhase::Failed;
                guard.last_error = Some(error.clone());
                let _ = self.events.send(WorkflowEvent::ScanFailed { error });
                let _ = self
                    .events
                    .send(WorkflowEvent::PhaseChanged(WorkflowPhase::Failed));
            }
        }
    }

    pub async fn start_upload(self: &Arc<Self>) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.phase != WorkflowPhase::PreviewReady {
            warn!("scan: start_upload ignored phase={:?}", guard.phase);
            return Ok(());
        }

        let epoch = guard.epoch;
        guard.progress = 0;
        guard.phase = WorkflowPhase::Uploading;
        let _ = self
            .events
            .send(WorkflowEvent::PhaseChanged(WorkflowPhase::Uploading));
        let _ = self.events.send(WorkflowEvent::UploadProgressed(0));

        guard.tick_task = Some(self.spawn_upload_tick_task(epoch));
        guard.phase_task = Some(self.spawn_phase_task(epoch));
        info!("scan: upload started");
        Ok(())
    }

    /// Cosmetic progress ticks. The phase transition is driven by the
    /// fixed-duration timer in [`Self::spawn_phase_task`], never by the
    /// progress value reaching 100.
    fn spawn_upload_tick_task(self: &Arc<Self>, epoch: u64) -> JoinHandle<()> {
        let controller = Arc::downgrade(self);
        tokio::spawn(async move {
            let first_tick = tokio::time::Instant::now() + UPLOAD_TICK_INTERVAL;
            let mut ticks = tokio::time::interval_at(first_tick, UPLOAD_TICK_INTERVAL);
            loop {
                ticks.tick().await;
                let Some(controller) = controller.upgrade() else {
                    return;
                };
                let mut guard = controller.inner.lock().await;
                if guard.epoch != epoch || guard.phase != WorkflowPhase::Uploading {
                    return;
                }
                guard.progress = guard.progress.saturating_add(UPLOAD_TICK_STEP).min(100);
                let _ = controller
                    .events
                    .send(WorkflowEvent::UploadProgressed(guard.progress));
                if guard.progress >= 100 {
                    return;
                }
            }
        })
    }

    fn spawn_phase_task(self: &Arc<Self>, epoch: u64) -> JoinHandle<()> {
        let controller = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(UPLOAD_DURATION).await;
            {
                let Some(controller) = controller.upgrade() else {
                    return;
                };
                let mut guard = controller.inner.lock().await;
                if guard.epoch != epoch || guard.phase != WorkflowPhase::Uploading {
                    return;
                }
                if let Some(task) = guard.tick_task.take() {
                    task.abort();
                }
                guard.progress = 100;
                guard.phase = WorkflowPhase::Processing;
                let _ = controller.events.send(WorkflowEvent::UploadProgressed(100));
                let _ = controller
                    .events
                    .send(WorkflowEvent::PhaseChanged(WorkflowPhase::Processing));
                info!("scan: upload complete, processing started");
            }

            tokio::time::sleep(PROCESSING_DURATION).await;
            let Some(controller) = controller.upgrade() else {
                return;
            };
            let mut guard = controller.inner.lock().await;
            if guard.epoch != epoch || guard.phase != WorkflowPhase::Processing {
                return;
            }
            guard.phase_task = None;
            let result = controller.result_generator.generate();
            info!(
                "scan: results ready analysis_id={} has_tumor={} confidence={:.3}",
                result.analysis_id, result.has_tumor, result.confidence
            );
            guard.result = Some(result.clone());
            guard.phase = WorkflowPhase::ResultsReady;
            let _ = controller
                .events
                .send(WorkflowEvent::ScanCompleted { result });
            let _ = controller
                .events
                .send(WorkflowEvent::PhaseChanged(WorkflowPhase::ResultsReady));
        })
    }

    pub async fn reset(&self) {
        let mut guard = self.inner.lock().await;
        guard.epoch += 1;
        for task in guard.take_tasks().into_iter().flatten() {
            task.abort();
        }

        if guard.phase != WorkflowPhase::Idle {
            info!("scan: reset from {:?}", guard.phase);
        }
        guard.phase = WorkflowPhase::Idle;
        guard.file = None;
        guard.preview = None;
        guard.result = None;
        guard.last_error = None;
        guard.progress = 0;
        let _ = self
            .events
            .send(WorkflowEvent::PhaseChanged(WorkflowPhase::Idle));
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let guard = self.inner.lock().await;
        WorkflowSnapshot {
            phase: guard.phase,
            file: guard.file.clone(),
            preview: guard.preview.clone(),
            progress: guard.progress,
            result: guard.result.clone(),
            error: guard.last_error.clone(),
        }
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        let state = self.inner.get_mut();
        for task in state.take_tasks().into_iter().flatten() {
            task.abort();
        }
    }
}

#[async_trait]
impl ScanWorkflow for Arc<ScanController> {
    async fn select_file(&self, path: PathBuf) -> Result<()> {
        ScanController::select_file(self, path).await
    }

    async fn start_upload(&self) -> Result<()> {
        ScanController::start_upload(self).await
    }

    async fn reset(&self) {
        ScanController::reset(self).await
    }

    async fn snapshot(&self) -> WorkflowSnapshot {
        ScanController::snapshot(self).await
    }

    fn subscribe_events(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;

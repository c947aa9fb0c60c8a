//! Hosts the tokio runtime that drives the scan workflow off the UI thread.

use std::thread;

use crossbeam_channel::{Receiver, Sender};
use scan_core::{ScanController, ScanWorkflow, WorkflowEvent};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Scan worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::WorkerStartup,
                    format!("scan worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build scan worker runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let controller = ScanController::new();

            let mut events = controller.subscribe_events();
            let ui_tx_events = ui_tx.clone();
            let forward_task = tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    let evt = match event {
                        WorkflowEvent::PhaseChanged(phase) => UiEvent::PhaseChanged(phase),
                        WorkflowEvent::UploadProgressed(progress) => {
                            UiEvent::UploadProgressed(progress)
                        }
                        WorkflowEvent::PreviewLoaded { file, preview } => {
                            UiEvent::PreviewLoaded { file, preview }
                        }
                        WorkflowEvent::ScanCompleted { result } => {
                            UiEvent::ScanCompleted { result }
                        }
                        WorkflowEvent::ScanFailed { error } => UiEvent::ScanFailed { error },
                    };
                    let _ = ui_tx_events.try_send(evt);
                }
            });

            let _ = ui_tx.try_send(UiEvent::WorkerReady);

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::SelectFile { path } => {
                        tracing::info!("worker: select_file path={}", path.display());
                        if let Err(err) = controller.select_file(path).await {
                            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                UiErrorContext::SelectFile,
                                err.to_string(),
                            )));
                        }
                    }
                    BackendCommand::StartUpload => {
                        tracing::info!("worker: start_upload");
                        if let Err(err) = controller.start_upload().await {
                            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                UiErrorContext::StartUpload,
                                err.to_string(),
                            )));
                        }
                    }
                    BackendCommand::Reset => {
                        tracing::info!("worker: reset");
                        controller.reset().await;
                    }
                }
            }

            // UI side hung up; stop forwarding and let the controller drop.
            forward_task.abort();
        });
    });
}

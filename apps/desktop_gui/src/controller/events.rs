//! UI/worker events and error modeling for the desktop controller.

use scan_core::ScanPreview;
use shared::{
    domain::{ScanResult, SelectedScan, WorkflowPhase},
    error::{ScanError, ScanErrorKind},
};

pub enum UiEvent {
    WorkerReady,
    Info(String),
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
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Workflow,
    Preview,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    WorkerStartup,
    SelectFile,
    StartUpload,
}

pub fn classify_worker_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("scan worker startup failure") || lower.contains("failed to build runtime") {
        "Scan worker startup failure; restart the application and retry.".to_string()
    } else {
        format!("Scan workflow error: {message}")
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("read")
            || message_lower.contains("decode")
            || message_lower.contains("preview")
        {
            UiErrorCategory::Preview
        } else if message_lower.contains("worker")
            || message_lower.contains("runtime")
            || message_lower.contains("internal")
        {
            UiErrorCategory::Internal
        } else {
            UiErrorCategory::Workflow
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn from_scan_error(context: UiErrorContext, error: &ScanError) -> Self {
        let category = match error.kind {
            ScanErrorKind::FileRead | ScanErrorKind::ImageDecode => UiErrorCategory::Preview,
            ScanErrorKind::Internal => UiErrorCategory::Internal,
        };
        Self {
            category,
            context,
            message: error.message.clone(),
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

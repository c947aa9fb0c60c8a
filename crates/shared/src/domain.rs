use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MODEL_VERSION: &str = "NeuraScan v3.2.1";
pub const TUMOR_TYPE_PLACEHOLDER: &str = "Glioblastoma";
pub const HEATMAP_PLACEHOLDER: &str = "placeholder://heatmap-512";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    #[default]
    Idle,
    PreviewReady,
    Uploading,
    Processing,
    ResultsReady,
    Failed,
}

impl WorkflowPhase {
    /// Phases whose timers have been started and can only end by
    /// completion or reset.
    pub fn is_busy(self) -> bool {
        matches!(self, WorkflowPhase::Uploading | WorkflowPhase::Processing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedScan {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub has_tumor: bool,
    pub confidence: f64,
    // Always populated, independent of has_tumor. Views decide whether to
    // show it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmap_ref: Option<String>,
    pub analysis_id: String,
    pub analyzed_at: DateTime<Utc>,
    pub model_version: String,
}

impl ScanResult {
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence * 100.0).round() as u8
    }
}

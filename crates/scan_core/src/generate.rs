use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use shared::domain::{ScanResult, HEATMAP_PLACEHOLDER, MODEL_VERSION, TUMOR_TYPE_PLACEHOLDER};

pub const CONFIDENCE_FLOOR: f64 = 0.87;
pub const CONFIDENCE_SPREAD: f64 = 0.10;
const ANALYSIS_ID_LEN: usize = 8;

/// Produces the fabricated outcome at the end of the processing phase.
/// Swapping the implementation is the seam for deterministic tests and for
/// an eventual real inference backend.
pub trait ResultGenerator: Send + Sync {
    fn generate(&self) -> ScanResult;
}

#[derive(Debug, Default)]
pub struct RandomResultGenerator;

impl ResultGenerator for RandomResultGenerator {
    fn generate(&self) -> ScanResult {
        let mut rng = rand::thread_rng();
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ANALYSIS_ID_LEN)
            .map(char::from)
            .collect();
        ScanResult {
            has_tumor: rng.gen_bool(0.5),
            confidence: CONFIDENCE_FLOOR + rng.gen::<f64>() * CONFIDENCE_SPREAD,
            // Constant regardless of the verdict.
            tumor_type: Some(TUMOR_TYPE_PLACEHOLDER.to_string()),
            heatmap_ref: Some(HEATMAP_PLACEHOLDER.to_string()),
            analysis_id: format!("AN-{}", suffix.to_ascii_uppercase()),
            analyzed_at: Utc::now(),
            model_version: MODEL_VERSION.to_string(),
        }
    }
}

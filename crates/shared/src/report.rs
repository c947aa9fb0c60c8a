use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ScanResult;

pub const PROCESSING_TIME_LABEL: &str = "3.2 seconds";
pub const IMAGE_RESOLUTION_LABEL: &str = "512 x 512 px";

const RECOMMENDATION_TUMOR: &str = "Based on the analysis, we recommend consulting with a \
     neurologist for further evaluation and potential treatment options.";
const RECOMMENDATION_CLEAR: &str = "No abnormalities detected. Regular follow-up scans are \
     recommended as per standard medical guidelines.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalDetails {
    pub model_version: String,
    pub analysis_id: String,
    pub processing_time: String,
    pub image_resolution: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TumorCharacteristics {
    pub estimated_size: String,
    pub location: String,
    pub boundary: String,
    pub density: String,
}

impl TumorCharacteristics {
    fn placeholder() -> Self {
        Self {
            estimated_size: "2.3 cm x 1.8 cm".to_string(),
            location: "Frontal Lobe, Right Hemisphere".to_string(),
            boundary: "Irregular".to_string(),
            density: "Heterogeneous".to_string(),
        }
    }
}

/// Presentation payload assembled from a finished [`ScanResult`]. Pure
/// data; the GUI renders it and the inert report export would serialize it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub headline: String,
    pub diagnosis: String,
    pub confidence_percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_type: Option<String>,
    pub recommendation: String,
    pub analyzed_at: DateTime<Utc>,
    pub technical: TechnicalDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_characteristics: Option<TumorCharacteristics>,
}

impl AnalysisReport {
    pub fn from_result(result: &ScanResult) -> Self {
        let (headline, diagnosis, recommendation) = if result.has_tumor {
            ("Tumor Detected", "Abnormal", RECOMMENDATION_TUMOR)
        } else {
            ("No Tumor Detected", "Normal", RECOMMENDATION_CLEAR)
        };
        Self {
            headline: headline.to_string(),
            diagnosis: diagnosis.to_string(),
            confidence_percent: result.confidence_percent(),
            // Shown only for abnormal scans even though the mock result
            // always carries a type.
            tumor_type: result.tumor_type.clone().filter(|_| result.has_tumor),
            recommendation: recommendation.to_string(),
            analyzed_at: result.analyzed_at,
            technical: TechnicalDetails {
                model_version: result.model_version.clone(),
                analysis_id: result.analysis_id.clone(),
                processing_time: PROCESSING_TIME_LABEL.to_string(),
                image_resolution: IMAGE_RESOLUTION_LABEL.to_string(),
            },
            tumor_characteristics: result
                .has_tumor
                .then(TumorCharacteristics::placeholder),
        }
    }
}

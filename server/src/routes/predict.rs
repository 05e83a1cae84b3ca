//! Prediction endpoint - classify an uploaded car photograph.
//!
//! The response is complete-or-error: a failure anywhere in the core
//! predict path returns an error body, never a partially filled result.
//! Only the heatmap field is independently optional.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::error;

use otosearch_specs::SpecRecord;

use crate::state::SharedState;

/// JSON error body returned on every failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn internal(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// One ranked candidate in the response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPrediction {
    pub name: String,
    pub confidence: f32,
}

/// Response payload for POST /predict.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    pub car_name: String,
    pub confidence: f32,
    pub top_predictions: Vec<TopPrediction>,
    /// Grad-CAM overlay as a data URI; null when the explanation was
    /// skipped or failed
    pub heatmap_image: Option<String>,
    /// Specification record (from the store, or parsed from the label)
    pub details: SpecRecord,
    /// Whether `details` came from the seeded store
    pub specs_verified: bool,
}

/// POST /predict - classify an uploaded image (multipart field `file`)
pub async fn predict(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let mut upload: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("Failed to read upload: {}", e)))?;
            upload = Some(bytes.to_vec());
        }
    }

    let bytes = match upload {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(bad_request("No file uploaded")),
    };

    let image = image::load_from_memory(&bytes)
        .map_err(|e| bad_request(format!("Could not decode image: {}", e)))?;

    // The pipeline is CPU-bound; keep it off the async workers.
    let pipeline = state.pipeline.clone();
    let analysis = tokio::task::spawn_blocking(move || pipeline.analyze(&image))
        .await
        .map_err(|e| {
            error!("inference task failed to complete: {}", e);
            internal("Internal error during analysis")
        })?
        .map_err(|e| {
            error!("analysis failed: {}", e);
            internal(format!("Analysis failed: {}", e))
        })?;

    let (car_name, confidence) = match analysis.prediction.best() {
        Some(best) => (best.name.clone(), best.confidence),
        None => {
            error!("pipeline produced an empty prediction result");
            return Err(internal("Internal error during analysis"));
        }
    };

    let top_predictions = analysis
        .prediction
        .predictions
        .iter()
        .map(|p| TopPrediction {
            name: p.name.clone(),
            confidence: p.confidence,
        })
        .collect();

    let (details, specs_verified) =
        otosearch_specs::lookup(state.store.as_deref(), &car_name).await;

    Ok(Json(PredictResponse {
        car_name,
        confidence,
        top_predictions,
        heatmap_image: analysis.heatmap,
        details,
        specs_verified,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use otosearch_specs::fallback_record;

    #[test]
    fn test_response_wire_format() {
        let response = PredictResponse {
            car_name: "Acura RL Sedan 2012".to_string(),
            confidence: 87.0,
            top_predictions: vec![TopPrediction {
                name: "Acura RL Sedan 2012".to_string(),
                confidence: 87.0,
            }],
            heatmap_image: None,
            details: fallback_record("Acura RL Sedan 2012"),
            specs_verified: false,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["carName"], "Acura RL Sedan 2012");
        assert_eq!(value["confidence"], 87.0);
        assert!(value["topPredictions"].is_array());
        // Explicit null, not an omitted field.
        assert!(value["heatmapImage"].is_null());
        assert_eq!(value["details"]["make"], "Acura");
        assert_eq!(value["specsVerified"], false);
    }

    #[test]
    fn test_error_body_shape() {
        let (status, Json(body)) = bad_request("No file uploaded");
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["error"], "No file uploaded");
    }
}

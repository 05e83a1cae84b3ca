//! Direct specification lookup by class label.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use otosearch_specs::SpecRecord;

use crate::state::SharedState;

/// Response for GET /specs/{label}.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecResponse {
    #[serde(flatten)]
    pub record: SpecRecord,
    /// Whether the record came from the seeded store
    pub verified: bool,
}

/// GET /specs/{label} - resolve the specification record for a class
/// label. Total: unknown labels return the parsed fallback record.
pub async fn get_specs(
    State(state): State<SharedState>,
    Path(label): Path<String>,
) -> Json<SpecResponse> {
    let (record, verified) = otosearch_specs::lookup(state.store.as_deref(), &label).await;
    Json(SpecResponse { record, verified })
}

#[cfg(test)]
mod tests {
    use super::*;
    use otosearch_specs::fallback_record;

    #[test]
    fn test_spec_response_flattens_record() {
        let response = SpecResponse {
            record: fallback_record("BMW M3 Coupe 2012"),
            verified: false,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["make"], "BMW");
        assert_eq!(value["model"], "M3 Coupe");
        assert_eq!(value["year"], "2012");
        assert_eq!(value["verified"], false);
    }
}

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{translation_unavailable, ApiError, ApiResponse, AppState};

/// Largest accepted batch.
const MAX_BATCH_TEXTS: usize = 100;

#[derive(Debug, Deserialize)]
pub(super) struct BatchRequest {
    pub texts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct BatchResponse {
    translations: Vec<String>,
}

/// Translates short texts in one call. Output order matches input order;
/// any text that could not be translated comes back unchanged.
pub(super) async fn translate_batch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<BatchRequest>,
) -> Result<Json<ApiResponse<BatchResponse>>, ApiError> {
    let Some(translator) = state.pipeline.translator() else {
        return Err(translation_unavailable(req_id.0));
    };
    if body.texts.len() > MAX_BATCH_TEXTS {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("at most {MAX_BATCH_TEXTS} texts per batch"),
        ));
    }

    let translations = translator.translate_batch(&body.texts).await;
    Ok(ApiResponse::new(req_id.0, BatchResponse { translations }))
}

use axum::{http::StatusCode, response::IntoResponse, response::Response, routing::post, Router};
use serde::Deserialize;
use serde_json::json;

use super::{calculate, BonusInputs, KpiInputs, SalaryResultPayload};

/// Router builder exposing the salary calculator.
pub fn salary_router() -> Router {
    Router::new()
        .route("/api/v1/salary/calculate", post(calculate_handler))
        .route("/api/v1/salary/normalize", post(normalize_handler))
}

#[derive(Debug, Deserialize)]
pub struct SalaryRequest {
    #[serde(flatten)]
    pub kpi: KpiInputs,
    #[serde(default)]
    pub bonuses: BonusInputs,
}

pub(crate) async fn calculate_handler(axum::Json(request): axum::Json<SalaryRequest>) -> Response {
    match calculate(&request.kpi, &request.bonuses) {
        Ok(breakdown) => (StatusCode::OK, axum::Json(breakdown)).into_response(),
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn normalize_handler(
    axum::Json(payload): axum::Json<SalaryResultPayload>,
) -> Response {
    (StatusCode::OK, axum::Json(payload.normalize())).into_response()
}

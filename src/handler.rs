use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::PredictError,
    features,
    model::{round2, Pipeline},
    types::{PredictRequest, PredictResponse},
};

// ---------- Server state ----------

#[derive(Clone, Debug)]
pub struct AppState {
    pub pipeline: Pipeline,
    /// Per-request stage logs at info (LOG_PRED=1) instead of debug.
    pub log_pred: bool,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            log_pred: false,
        }
    }

    pub fn with_log_pred(mut self, on: bool) -> Self {
        self.log_pred = on;
        self
    }
}

macro_rules! stage {
    ($on:expr, $($arg:tt)+) => {
        if $on {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

// ---------- Handler ----------

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, PredictError> {
    let Json(req) = payload.map_err(|e| PredictError::InvalidBody(e.body_text()))?;
    stage!(state.log_pred, "received request: {:?}", req);

    let schema = state.pipeline.schema();
    let features = features::encode(&req, schema)?;
    stage!(state.log_pred, "input vector before scaling ({}): {:?}", schema, features.as_slice());

    let scaled = state.pipeline.scale(&features)?;
    stage!(state.log_pred, "scaled input: {:?}", scaled);

    let raw = state.pipeline.predict_scaled(&scaled)?;
    stage!(state.log_pred, "prediction: {}", raw);

    Ok(Json(PredictResponse {
        prediction: round2(raw),
    }))
}

/// `/api/predict` is canonical; `/predict` is kept for older clients.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/predict", post(predict))
        .route("/predict", post(predict))
        .layer(cors)
        .with_state(state)
}

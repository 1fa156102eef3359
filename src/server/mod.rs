//! Mock inference server for exercising generated UIs without a model.
//!
//! `POST /predict` always answers with the same classification result,
//! whatever the request carries.

use anyhow::Result;
use axum::{
    Router,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub key: u32,
    pub class: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub status: String,
    pub infer_time: f64,
    pub predictions: Vec<Prediction>,
}

/// The canned answer served by `/predict`.
pub fn predict_response() -> PredictResponse {
    PredictResponse {
        status: "success".to_string(),
        infer_time: 0.11,
        predictions: vec![Prediction {
            key: 1,
            class: "dog".to_string(),
            confidence: 0.98,
        }],
    }
}

pub struct MockServer {
    bind: String,
    port: u16,
}

impl MockServer {
    pub fn new(config: &Config) -> Self {
        Self {
            bind: config.mock_server.bind.clone(),
            port: config.mock_server.port,
        }
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.bind, self.port).parse()?)
    }

    pub async fn run(&self) -> Result<()> {
        let addr = self.addr()?;
        let listener = TcpListener::bind(addr).await?;
        info!("Starting mock inference server on http://{}", addr);
        serve(listener).await
    }
}

/// Serve the mock routes on an already bound listener.
pub async fn serve(listener: TcpListener) -> Result<()> {
    axum::serve(listener, router()).await?;
    Ok(())
}

pub fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// Request body is never read.
async fn predict() -> Json<PredictResponse> {
    Json(predict_response())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

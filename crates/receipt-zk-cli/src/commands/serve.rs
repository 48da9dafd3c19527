use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy_primitives::B256;
use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{self, CorsLayer};
use tracing::{error, info, warn};

use receipt_zk_core::artifacts::{self, ProofFile};
use receipt_zk_core::backend::{ProvingBackend, SetupArtifacts};
use receipt_zk_core::source::FixtureSource;
use receipt_zk_native::NativeBackend;

use crate::output;
use crate::session::{self, Overrides, Session};
use crate::AppChoice;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProveRequest {
    #[serde(default)]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProveResponse {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ProveResponse {
    fn success(message: &str, details: String) -> Self {
        Self {
            status: "success".into(),
            message: message.into(),
            details: Some(details),
        }
    }

    fn error(message: &str, details: Option<String>) -> Self {
        Self {
            status: "error".into(),
            message: message.into(),
            details,
        }
    }
}

/// Read-only state shared by every request.
struct ServeState {
    session: Session,
    setup: SetupArtifacts,
    source: Arc<FixtureSource>,
    backend: NativeBackend,
}

impl ServeState {
    async fn prove_tx(&self, tx_hash: B256) -> Result<(PathBuf, ProofFile)> {
        let input = self
            .session
            .build_input(self.source.clone(), tx_hash)
            .await?;
        let proof_file = self
            .session
            .prove(&self.backend, &self.setup, &input)
            .await?;
        let path = proof_path(&self.session.config.out_dir, tx_hash);
        artifacts::save_proof(&proof_file, &path)?;
        Ok((path, proof_file))
    }
}

/// Where the proof for `tx_hash` is stored.
fn proof_path(out_dir: &Path, tx_hash: B256) -> PathBuf {
    out_dir
        .join("proofs")
        .join(format!("{}.json", hex::encode(tx_hash)))
}

/// Browser access to `/prove`: only `cors_origin` when given, otherwise any origin.
fn cors_layer(cors_origin: Option<&str>) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);
    Ok(match cors_origin {
        Some(origin) => {
            let origin = origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS origin: {origin}"))?;
            layer.allow_origin(origin)
        }
        None => layer.allow_origin(cors::Any),
    })
}

/// Serve `POST /prove` for the app on `port`.
///
/// The setup is compiled on startup if none is present, then shared by all
/// requests. Every request proves and verifies one transaction from the
/// fixture.
pub async fn run(
    config_path: &Path,
    overrides: &Overrides,
    app: AppChoice,
    fixture: &Path,
    port: u16,
    cors_origin: Option<&str>,
) -> Result<()> {
    output::print_header("receipt-zk serve");
    let cors = cors_layer(cors_origin)?;

    let config = session::load_config(config_path, overrides)?;
    let session = Session::new(config, app)?;
    let backend = NativeBackend::new();

    output::print_step(1, 2, "Loading setup...");
    let setup = backend.setup(&session.descriptor, &session.config).await?;
    let source = Arc::new(FixtureSource::load(fixture).await?);
    output::print_key_value("App", app.as_str());
    output::print_key_value("Fixture receipts", &source.len().to_string());
    output::print_key_value("CORS origin", cors_origin.unwrap_or("*"));

    let state = Arc::new(ServeState {
        session,
        setup,
        source,
        backend,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    output::print_step(2, 2, &format!("Listening on http://{addr}"));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state, cors)).await?;
    Ok(())
}

fn router(state: Arc<ServeState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/prove", post(prove))
        .layer(cors)
        .with_state(state)
}

async fn prove(
    State(state): State<Arc<ServeState>>,
    payload: Result<Json<ProveRequest>, JsonRejection>,
) -> (StatusCode, Json<ProveResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("rejected request body: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(ProveResponse::error(
                    "txHash is required",
                    Some(rejection.body_text()),
                )),
            );
        }
    };
    let Some(tx) = request.tx_hash.filter(|tx| !tx.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ProveResponse::error("txHash is required", None)),
        );
    };
    let tx_hash = match session::parse_tx_hash(&tx) {
        Ok(tx_hash) => tx_hash,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ProveResponse::error("txHash is invalid", Some(format!("{e:#}")))),
            );
        }
    };

    info!(tx = %tx_hash, "received request to prove transaction");
    match state.prove_tx(tx_hash).await {
        Ok((path, proof_file)) => {
            info!(tx = %tx_hash, path = %path.display(), "proof succeeded");
            let details = format!(
                "proof {} written to {} ({} outputs)",
                hex::encode(&proof_file.proof.bytes),
                path.display(),
                proof_file.public_witness.outputs.len()
            );
            (
                StatusCode::OK,
                Json(ProveResponse::success(
                    "Proof generated and verified successfully!",
                    details,
                )),
            )
        }
        Err(e) => {
            error!(tx = %tx_hash, "proof failed: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ProveResponse::error(
                    "Proof generation failed.",
                    Some(format!("{e:#}")),
                )),
            )
        }
    }
}

pub mod pages;

use crate::cache::ResultCache;
use crate::error::{BranchboardError, Result};
use crate::github::Gateway;
use crate::orphans::{find_orphans, OrphanReport};
use crate::summary::{build_report, round_secs, BranchReport, Dashboard};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::Instant;

pub struct AppState {
    pub gateway: Arc<dyn Gateway>,
    pub org: String,
    pub user_name: String,
    pub concurrency: usize,
    pub branches: ResultCache<BranchReport>,
    pub orphans: ResultCache<OrphanReport>,
}

/// Orphan scan payload for one request.
pub struct OrphanPage {
    pub org_name: String,
    pub elapsed_secs: f64,
    pub report: Arc<OrphanReport>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn Gateway>, org: &str, user_name: &str, concurrency: usize) -> Self {
        Self {
            gateway,
            org: org.to_string(),
            user_name: user_name.to_string(),
            concurrency,
            branches: ResultCache::new(),
            orphans: ResultCache::new(),
        }
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        let start = Instant::now();
        let gateway = self.gateway.as_ref();
        let report = self
            .branches
            .get_or_fetch(&self.org, move || async move {
                let report = build_report(gateway, &self.org, self.concurrency).await?;
                if let Some(remaining) = gateway.rate_limit_remaining().await {
                    tracing::info!(remaining, "api rate limit");
                }
                Ok(report)
            })
            .await?;

        Ok(Dashboard {
            user_name: self.user_name.clone(),
            org_name: self.org.clone(),
            elapsed_secs: round_secs(start.elapsed().as_secs_f64()),
            report,
        })
    }

    pub async fn orphan_page(&self) -> Result<OrphanPage> {
        let start = Instant::now();
        let report = self
            .orphans
            .get_or_fetch(&self.org, move || {
                find_orphans(self.gateway.as_ref(), &self.org, self.concurrency)
            })
            .await?;

        Ok(OrphanPage {
            org_name: self.org.clone(),
            elapsed_secs: round_secs(start.elapsed().as_secs_f64()),
            report,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/orphans.html", get(orphans))
        .route("/api/branches", get(branches_json))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

fn gateway_failure(e: BranchboardError) -> Response {
    tracing::error!("request failed: {e}");
    (StatusCode::BAD_GATEWAY, Html(pages::render_error(&e))).into_response()
}

async fn index(State(state): State<Arc<AppState>>) -> Response {
    match state.dashboard().await {
        Ok(dashboard) => Html(pages::render_index(&dashboard)).into_response(),
        Err(e) => gateway_failure(e),
    }
}

async fn orphans(State(state): State<Arc<AppState>>) -> Response {
    match state.orphan_page().await {
        Ok(page) => Html(pages::render_orphans(&page)).into_response(),
        Err(e) => gateway_failure(e),
    }
}

async fn branches_json(State(state): State<Arc<AppState>>) -> Response {
    match state.dashboard().await {
        Ok(dashboard) => Json(dashboard).into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
}

pub async fn serve(state: Arc<AppState>, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("serving {} at http://{}", state.org, listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("installing ctrl-c handler: {e}");
        std::future::pending::<()>().await;
    }
}

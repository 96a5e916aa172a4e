use std::{net::SocketAddr, time::Duration};

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::{
    articles,
    auth::{self, extractors::require_auth},
    state::AppState,
};

const REVOCATION_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::handlers::protected_routes())
        .merge(articles::router())
        .route_layer(middleware::from_fn_with_state(
            state.gate.clone(),
            require_auth,
        ));

    Router::new()
        .merge(auth::handlers::public_routes())
        .merge(protected)
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

/// Drops revocation entries whose tokens have expired anyway.
pub fn spawn_revocation_sweeper(state: &AppState) {
    if !state.config.jwt.blacklist_enabled {
        return;
    }
    let revocations = state.revocations.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REVOCATION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match revocations.purge_expired().await {
                Ok(n) => debug!(purged = n, "revocation sweep"),
                Err(e) => warn!(error = %e, "revocation sweep failed"),
            }
        }
    });
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

use std::net::SocketAddr;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::hal::Links;
use crate::state::AppState;
use crate::{accounts, auth};

#[derive(Debug, Serialize)]
struct IndexResource {
    #[serde(rename = "_links")]
    links: Links,
}

/// Hypermedia entry point: the one link a fresh client needs.
async fn api_index() -> Json<IndexResource> {
    Json(IndexResource {
        links: Links::new().add("accounts", accounts::dto::ACCOUNTS_HREF),
    })
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .route("/", get(api_index))
                .merge(accounts::router())
                .merge(auth::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_links_to_accounts() {
        let index = IndexResource {
            links: Links::new().add("accounts", accounts::dto::ACCOUNTS_HREF),
        };
        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["_links"]["accounts"]["href"], "/api/accounts");
    }
}

use crate::cache::CachePolicy;
use crate::config::Config;
use crate::error::{ApiError, ErrorResponse};
use crate::tmdb::{self, TmdbApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum_extra::TypedHeader;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
    pub cache_policy: CachePolicy,
}

pub async fn run_server(config: Config) -> Result<()> {
    let client = TmdbClient::from_config(&config)?;
    let cache_policy = client.cache_policy();
    info!(
        "Upstream {} (cache window {}s, {} entries max)",
        config.tmdb_base_url,
        cache_policy.ttl.as_secs(),
        cache_policy.max_entries
    );

    let state = AppState {
        tmdb: Arc::new(client),
        cache_policy,
    };
    let app = build_router(state);

    info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/movies/popular", get(popular_movies))
        .route("/movies/:id", get(movie_details))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn movie_details(
    State(state): State<AppState>,
    raw_id: Result<Path<String>, PathRejection>,
) -> Result<Response, ErrorResponse> {
    let raw_id = match raw_id {
        Ok(Path(raw_id)) => raw_id,
        Err(rejection) => {
            warn!("Rejecting movie request: {}", rejection);
            return Err(detail_failure(&ApiError::InvalidInput("Invalid movie ID")));
        }
    };
    let Some(id) = tmdb::parse_movie_id(&raw_id) else {
        warn!("Rejecting movie request: invalid id {:?}", raw_id);
        return Err(detail_failure(&ApiError::InvalidInput("Invalid movie ID")));
    };

    match state.tmdb.fetch_detail(id).await {
        Ok(movie) => Ok(relay(&state.cache_policy, movie)),
        Err(e) => {
            error!(operation = "movie_details", movie_id = id, "Error fetching movie details: {}", e);
            Err(detail_failure(&e))
        }
    }
}

async fn popular_movies(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, ErrorResponse> {
    let pairs = query.map(|Query(pairs)| pairs).unwrap_or_default();
    // Repeated `page` parameters: the first one wins.
    let raw_page = pairs
        .iter()
        .find(|(key, _)| key == "page")
        .map(|(_, value)| value.as_str());
    let page = tmdb::parse_page(raw_page);

    match state.tmdb.fetch_popular(page).await {
        Ok(listing) => Ok(relay(&state.cache_policy, listing)),
        Err(e) => {
            error!(operation = "popular_movies", page, "Error fetching popular movies: {}", e);
            Err(popular_failure(&e))
        }
    }
}

fn relay<T: Serialize>(policy: &CachePolicy, body: T) -> Response {
    (TypedHeader(policy.cache_control()), Json(body)).into_response()
}

// Detail failures never reveal the upstream status.
fn detail_failure(err: &ApiError) -> ErrorResponse {
    match err {
        ApiError::InvalidInput(msg) => ErrorResponse::new(StatusCode::BAD_REQUEST, *msg),
        _ => ErrorResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to fetch movie details",
        ),
    }
}

// Listing failures pass the upstream status through to the caller.
fn popular_failure(err: &ApiError) -> ErrorResponse {
    match err {
        ApiError::Config => {
            ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "API key not configured")
        }
        ApiError::Upstream { status, .. } => ErrorResponse::new(
            StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "Failed to fetch popular movies from TMDB",
        ),
        ApiError::InvalidInput(_) | ApiError::Transport(_) | ApiError::Decode(_) => ErrorResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to fetch popular movies",
        ),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_failures_collapse_to_500() {
        let upstream = ApiError::Upstream {
            status: 404,
            body: "{\"status_code\":34}".to_string(),
        };
        let res = detail_failure(&upstream);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.message(), "Failed to fetch movie details");
        assert_eq!(
            detail_failure(&ApiError::Config).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn popular_failures_keep_upstream_status() {
        let res = popular_failure(&ApiError::Upstream {
            status: 429,
            body: String::new(),
        });
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.message(), "Failed to fetch popular movies from TMDB");

        let res = popular_failure(&ApiError::Config);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.message(), "API key not configured");
    }

    #[test]
    fn invalid_id_is_a_bad_request() {
        let res = detail_failure(&ApiError::InvalidInput("Invalid movie ID"));
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(res.message(), "Invalid movie ID");
    }
}

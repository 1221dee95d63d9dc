//! HTTP API for the campus dashboard.
//!
//! Every route is a read-only `GET`. Route paths keep their `/mysql` prefix
//! because the dashboard client depends on them.

mod handlers;

use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, Level};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::faces::FaceImages;
use crate::storage::Store;

pub use handlers::{
    AppState, CountResponse, SearchResponse, SharedState, TimelineResponse, TopLocationsResponse,
    TopPersonsResponse,
};

/// Build the API router.
///
/// # Errors
///
/// Returns an error if `cors_origin` is not a valid header value.
pub fn router(state: SharedState, cors_origin: &str) -> Result<Router> {
    let origin = HeaderValue::from_str(cors_origin).map_err(|_| Error::ConfigValidation {
        message: format!("invalid CORS origin: {cors_origin}"),
    })?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    // One info line per request: method, path, status and latency
    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Ok(Router::new()
        .route("/mysql/profile", get(handlers::list_profiles))
        .route("/mysql/data", get(handlers::list_activity))
        .route(
            "/mysql/profile/unique-entities/count",
            get(handlers::unique_entities_count),
        )
        .route(
            "/mysql/wifi/unique-device-hashes/count",
            get(handlers::unique_device_hashes_count),
        )
        .route("/search", get(handlers::search))
        .route("/face/:faceId", get(handlers::face_image))
        .route("/mysql/data/top-locations", get(handlers::top_locations))
        .route("/mysql/data/top-persons", get(handlers::top_persons))
        .route("/mysql/activity-timeline", get(handlers::activity_timeline))
        .layer(cors)
        .layer(trace)
        .with_state(state))
}

/// Serve the API until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(config: &Config, store: Store) -> Result<()> {
    let faces = FaceImages::new(config.face_image_dir());
    info!("Serving face images from {}", faces.dir().display());

    let state = AppState::shared(store, faces);
    let app = router(state, &config.server.cors_origin)?;

    let address = config.bind_address();
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

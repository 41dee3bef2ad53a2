// rest_api/src/lib.rs
// HTTP surface of the lab backend. Every route lives under `/api`.

use std::future::Future;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use lib::config::LabConfig;

pub mod errors;
pub mod gate;
pub mod handlers;
pub mod state;
pub mod validation;

pub use crate::errors::RestApiError;
pub use crate::state::AppState;

use crate::handlers::{auth, bookings, medical_tests, results, users};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password/:token", post(auth::reset_password))
        .route("/medical-tests", get(medical_tests::list).post(medical_tests::create))
        .route(
            "/medical-tests/:id",
            get(medical_tests::get).put(medical_tests::update).delete(medical_tests::delete),
        )
        .route("/bookings", get(bookings::list).post(bookings::create))
        .route("/bookings/patient/:patient_id", get(bookings::for_patient))
        .route("/bookings/doctor/:doctor_id", get(bookings::for_doctor))
        .route("/bookings/id/:id", get(bookings::by_id))
        .route("/bookings/code/:code", get(bookings::by_code))
        .route("/bookings/:id", put(bookings::update).delete(bookings::delete))
        .route("/results/:id", put(results::replace))
        .route("/users/me", get(users::me))
        .route("/users/doctors", get(users::list_doctors))
        .route("/users/patients", get(users::list_patients).post(users::create_patient))
}

/// Builds the application router with tracing and CORS applied.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

/// Serves `router` on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("REST API listening on {}", addr);
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .context("REST API server failed to start or run")?;
    info!("REST API server stopped");
    Ok(())
}

/// Binds the configured address and serves until `shutdown_rx` fires or its
/// sender is dropped.
pub async fn start_server(
    config: &LabConfig,
    state: AppState,
    shutdown_rx: oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;
    let router = build_router(state, &config.server.cors_origins);

    serve(listener, router, async {
        let _ = shutdown_rx.await;
        info!("Received shutdown signal");
    })
    .await
}

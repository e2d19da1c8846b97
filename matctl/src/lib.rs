//! matctl - booking control plane for a martial-arts gym.
//!
//! The service fronts a PostgreSQL database with an HTTP API for browsing the
//! class schedule, booking and cancelling reservations, and managing
//! membership subscriptions. The core booking rules live in [`booking`]:
//! entitlement validation, the atomic capacity ledger, session and free-trial
//! accounting, and FIFO waiting-list promotion.
//!
//! # Architecture
//!
//! - [`api`]: HTTP handlers and request/response models
//! - [`auth`]: caller identity from the trusted proxy header
//! - [`booking`]: the reservation state machine (validate, claim, deduct, promote)
//! - [`db`]: repositories and database models
//! - [`config`]: layered file + environment configuration
//!
//! # Example
//!
//! ```ignore
//! let config = Config::load(&Args::parse())?;
//! let app = Application::new(config).await?;
//! app.serve(shutdown_signal()).await?;
//! ```

pub mod api;
pub mod auth;
pub mod booking;
pub mod config;
pub mod db;
pub mod errors;
pub mod openapi;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod types;

use anyhow::Context;
use axum::{http::HeaderValue, routing::get, routing::post, Router};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, info, Level};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use crate::config::Config;
use crate::openapi::ApiDoc;

/// Shared application state available to all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the matctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        origins.push(origin.as_str().parse::<HeaderValue>()?);
    }
    Ok(CorsLayer::new().allow_origin(origins))
}

/// Build the application router with all endpoints and middleware.
///
/// The booking API is nested under `/api/v1`, interactive documentation is
/// served at `/docs`, and `/healthz` answers liveness probes.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route("/occurrences", get(api::handlers::occurrences::list_occurrences))
        .route("/occurrences/{occurrence_id}", get(api::handlers::occurrences::get_occurrence))
        .route(
            "/occurrences/{occurrence_id}/waitlist",
            get(api::handlers::occurrences::get_waitlist),
        )
        .route(
            "/reservations",
            post(api::handlers::reservations::create_reservation).get(api::handlers::reservations::list_reservations),
        )
        .route(
            "/reservations/{reservation_id}",
            get(api::handlers::reservations::get_reservation),
        )
        .route(
            "/reservations/{reservation_id}/cancel",
            post(api::handlers::reservations::cancel_reservation),
        )
        .route(
            "/subscriptions",
            get(api::handlers::subscriptions::list_subscriptions).post(api::handlers::subscriptions::create_subscription),
        )
        .route("/users/me", get(api::handlers::users::get_current_user))
        .with_state(state.clone());

    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The running application: router, database pool and configuration.
///
/// Construction connects to the database and runs pending migrations, so a
/// successfully built `Application` is ready to serve.
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting booking control plane with configuration: {:#?}", config);

        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await
            .context("failed to connect to database")?;

        migrator().run(&pool).await.context("failed to run database migrations")?;

        let state = AppState {
            db: pool.clone(),
            config: config.clone(),
        };
        let router = build_router(state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Booking control plane listening on http://{}, docs at http://localhost:{}/docs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

//! Router assembly and the server loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::{get, post};
use puerta_auth::SessionManager;
use puerta_core::constants::{CHALLENGE_TTL_SECS, WEBAUTHN_HEADER};
use puerta_door::{DoorActuator, DoorController};
use puerta_storage::{Database, SqliteSessionRepository};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::{debug, error, info, warn};

use crate::browser_session;
use crate::config::Config;
use crate::handlers::{auth, log, rex, webauthn};
use crate::state::AppState;

/// Name of the browser-session cookie holding pending challenges.
pub const BROWSER_SESSION_COOKIE: &str = "_rex";

/// How often expired login sessions are deleted.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(600);

/// How often expired browser sessions, and the challenges in them, are
/// deleted.
const BROWSER_SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// The full API.
///
/// `allowed_origin` is the only origin that may call the API from a
/// browser with credentials. `browser_sessions` backs the `_rex` cookie.
pub fn router(state: AppState, allowed_origin: HeaderValue, browser_sessions: SqliteStore) -> Router {
    let webauthn_header = HeaderName::from_static(WEBAUTHN_HEADER);
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, webauthn_header.clone()])
        .expose_headers([webauthn_header]);

    let sessions = SessionManagerLayer::new(browser_sessions)
        .with_name(BROWSER_SESSION_COOKIE)
        .with_secure(state.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(
            CHALLENGE_TTL_SECS as i64,
        )));

    Router::new()
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/rex", post(rex::rex))
        .route("/api/webauthn/register", post(webauthn::register))
        .route("/api/log", get(log::audit_log))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(sessions),
        )
        .with_state(state)
}

fn spawn_session_purge(sessions: Arc<SessionManager<SqliteSessionRepository>>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "expired sessions deleted"),
                Err(err) => error!(error = %err, "session purge failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// Open the database, connect the door and serve until ctrl-c.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let db = Database::open(&config.db).await?;

    let door = puerta_door::connect(&config.adapter)?;
    let adapter = door.info();
    if door.kind() == "dry-run" {
        warn!("using the dry-run door adapter, no real door will open");
    }
    let controller = DoorController::with_config(door, config.controller());

    let state = AppState::new(&config, &db, controller)?;
    spawn_session_purge(Arc::clone(&state.sessions));

    let browser_sessions = browser_session::open_store(&db).await?;
    browser_session::spawn_expired_sweep(browser_sessions.clone(), BROWSER_SESSION_SWEEP_INTERVAL);

    let origin = config.public_origin();
    let app = router(state, HeaderValue::from_str(&origin)?, browser_sessions);

    let listener = TcpListener::bind(&config.http.listen).await?;
    info!(
        listen = %config.http.listen,
        %origin,
        adapter = %adapter.kind,
        target = %adapter.target,
        db = %config.db,
        "puerta listening"
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    Ok(())
}

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Fleet control plane server.
//!
//! Wires the in-memory store behind the authorization decorator and serves
//! the workspace agent routes.

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use agent_auth::AgentAuthState;
use anyhow::Context;
use authz_resolver_sdk::PolicyEnforcer;
use authz_store::AuthzStore;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{Next, from_fn_with_state};
use axum::response::Response;
use clap::Parser;
use fleet_security::RequestContext;
use fleet_store::{MemStore, Store};
use static_authz_plugin::StaticAuthZPlugin;
use static_authz_plugin::config::AuthZMode;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(name = "fleet-server", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override `server.bind`
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Override `logging.format`
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        anyhow::ensure!(path.is_file(), "config file {} not found", path.display());
    }
    let mut config = AppConfig::extract(&AppConfig::figment(cli.config.as_deref()))
        .context("failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    init_tracing(&config.logging)?;

    let app = build_router(&config)?;
    let addr = config.server.bind;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!(%addr, "fleet server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failure")?;

    tracing::info!("fleet server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("invalid log filter \"{}\"", logging.level))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(anyhow::Error::msg)
    .context("failed to install tracing subscriber")
}

fn build_router(config: &AppConfig) -> anyhow::Result<Router> {
    if config.authz.mode == AuthZMode::AllowAll {
        tracing::warn!("authorization is disabled (authz.mode = allow_all)");
    }
    let engine = StaticAuthZPlugin::init(&config.authz);
    let store: Arc<dyn Store> = Arc::new(AuthzStore::new(
        MemStore::new(),
        PolicyEnforcer::new(engine),
    ));
    let state = AgentAuthState::new(store, &config.agent_auth)
        .context("invalid agent_auth configuration")?;

    let timeout = config.server.request_timeout();
    Ok(agent_auth::router(state)
        .layer(from_fn_with_state(timeout, request_context))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            timeout,
        ))
        .layer(TraceLayer::new_for_http()))
}

/// Give each request a [`RequestContext`] that expires with the request
/// timeout and is cancelled once the request completes or is dropped.
async fn request_context(
    State(timeout): State<Duration>,
    mut req: Request,
    next: Next,
) -> Response {
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();
    let mut ctx = RequestContext::with_cancellation(cancel);
    if let Some(at) = Instant::now().checked_add(timeout) {
        ctx = ctx.deadline(at);
    }
    req.extensions_mut().insert(ctx);
    next.run(req).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::Extension;
    use axum::body::Body;
    use axum::routing::get;
    use fleet_security::ContextError;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[test]
    fn cli_overrides_parse() {
        let cli = Cli::try_parse_from([
            "fleet-server",
            "--config",
            "fleet.yaml",
            "--bind",
            "0.0.0.0:9000",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("fleet.yaml")));
        assert_eq!(cli.bind, Some(SocketAddr::from(([0, 0, 0, 0], 9000))));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!(Cli::try_parse_from(["fleet-server", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn bad_signer_pattern_fails_startup() {
        let mut config = AppConfig::default();
        config.agent_auth.azure.allowed_signer_pattern = "(".to_owned();
        assert!(build_router(&config).is_err());
    }

    async fn observe_context(Extension(ctx): Extension<RequestContext>) -> String {
        match ctx.ensure_live() {
            Ok(()) => "live".to_owned(),
            Err(e) => e.to_string(),
        }
    }

    fn observed(timeout: Duration) -> Router {
        Router::new()
            .route("/ctx", get(observe_context))
            .layer(from_fn_with_state(timeout, request_context))
    }

    async fn observe(router: Router) -> String {
        let response = router
            .oneshot(http::Request::get("/ctx").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn requests_carry_a_live_context() {
        assert_eq!(observe(observed(Duration::from_secs(30))).await, "live");
    }

    #[tokio::test]
    async fn context_deadline_follows_the_request_timeout() {
        assert_eq!(
            observe(observed(Duration::ZERO)).await,
            "request deadline exceeded"
        );
    }

    #[tokio::test]
    async fn context_is_cancelled_once_the_request_completes() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let slot = Arc::clone(&seen);
        let router = Router::new()
            .route(
                "/ctx",
                get(move |Extension(ctx): Extension<RequestContext>| {
                    let slot = Arc::clone(&slot);
                    async move {
                        assert!(ctx.ensure_live().is_ok());
                        *slot.lock().unwrap() = Some(ctx);
                    }
                }),
            )
            .layer(from_fn_with_state(Duration::from_secs(30), request_context));

        router
            .oneshot(http::Request::get("/ctx").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let ctx = seen.lock().unwrap().take().unwrap();
        assert_eq!(ctx.ensure_live(), Err(ContextError::Cancelled));
    }

    #[tokio::test]
    async fn agent_routes_are_served() {
        let app = build_router(&AppConfig::default()).unwrap();
        let response = app
            .oneshot(
                http::Request::get("/api/v2/workspaceagents/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body["message"],
            "Cookie \"fleet_session_token\" must be provided."
        );
    }
}

//! Keyward server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware};
use chrono_tz::Tz;
use keyward_api::{AppState, router as api_router};
use keyward_common::{AppError, Config};
use keyward_core::{
    AuditService, AuthGate, AuthService, BackgroundTasks, CredentialService, LogMailSender,
    LoginIpService, LoginMonitor, NotificationThrottle, SecurityAlertService, SharedClock,
    SharedCodec, SharedMailSender, SmtpMailSender, SystemClock, TracingFailureReporter,
    XorHexCodec,
};
use keyward_db::repositories::{
    AuditEntryRepository, CredentialRepository, LoginIpRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "keyward=debug,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true)))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

/// Pick the SMTP relay when configured, otherwise log alerts only.
fn build_mailer(config: &Config) -> Result<SharedMailSender, Box<dyn std::error::Error>> {
    match &config.mail {
        Some(mail) => {
            info!(host = %mail.smtp_host, port = mail.smtp_port, "Using SMTP relay for alerts");
            Ok(Arc::new(SmtpMailSender::from_config(mail)?))
        }
        None => {
            warn!("No mail relay configured, sign-in alerts will only be logged");
            Ok(Arc::new(LogMailSender))
        }
    }
}

/// Drop expired throttle entries on a fixed interval.
fn spawn_throttle_sweep(throttle: NotificationThrottle, every_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(every_secs.max(1)));
        loop {
            interval.tick().await;
            let removed = throttle.sweep().await;
            if removed > 0 {
                tracing::debug!(removed, "Swept expired alert throttle entries");
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv = dotenvy::dotenv();

    // Load configuration
    let config = Config::load()?;

    init_tracing(config.log.json);
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    info!("Starting keyward server...");

    // Connect to database
    let db = keyward_db::connect(&config.database).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    keyward_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);
    let clock: SharedClock = Arc::new(SystemClock);
    let codec: SharedCodec = Arc::new(XorHexCodec);
    let mailer = build_mailer(&config)?;
    let timezone: Tz = config
        .security
        .alert_timezone
        .parse()
        .map_err(|e| AppError::Config(format!("alert_timezone: {e}")))?;
    let app_name = config
        .mail
        .as_ref()
        .map_or_else(|| "Keyward".to_string(), |m| m.from_name.clone());

    // Initialize repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let credential_repo = CredentialRepository::new(Arc::clone(&db));
    let login_ip_repo = LoginIpRepository::new(Arc::clone(&db));
    let audit_repo = AuditEntryRepository::new(Arc::clone(&db));

    // Initialize services
    let auth_gate = AuthGate::new(user_repo.clone());
    let auth_service = AuthService::new(
        user_repo.clone(),
        auth_gate.clone(),
        config.auth.jwt_secret.clone(),
        config.auth.token_ttl_secs,
    );
    let audit_service = AuditService::new(
        audit_repo,
        user_repo.clone(),
        auth_gate.clone(),
        codec,
        clock.clone(),
        config.security.audit_page_size,
    );
    let credential_service =
        CredentialService::new(credential_repo, audit_service.clone(), auth_gate);
    let login_ip_service = LoginIpService::new(login_ip_repo, user_repo, clock.clone());

    let throttle =
        NotificationThrottle::new(config.security.notification_window_secs, clock.clone());
    spawn_throttle_sweep(throttle.clone(), config.security.throttle_sweep_secs);

    let alerts = SecurityAlertService::new(throttle, mailer, clock, timezone, app_name);
    let login_monitor = LoginMonitor::new(
        login_ip_service.clone(),
        alerts,
        BackgroundTasks::new(Arc::new(TracingFailureReporter)),
    );

    let state = AppState {
        auth_service,
        credential_service,
        login_ip_service,
        login_monitor,
        audit_service,
    };

    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            keyward_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

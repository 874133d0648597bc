//! # YelpCamp Binary
//!
//! Assembles the application from configuration and the adapters compiled in.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_adapters::{AppState, LocalMediaMount, WebSettings};
use auth_adapters::JwtIdentityVerifier;
use axum::extract::Request;
use axum::ServiceExt;
use configs::{AppConfig, LogFormat, LoggingConfig, MediaBackend};
use domains::{CampgroundRepository, IdentityVerifier, MediaStore};
use services::{CampgroundService, OwnershipGuard};
use secrecy::{ExposeSecret, SecretString};
use storage_adapters::{MemoryCampgroundRepository, MemoryMediaStore};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.logging);

    // 1. Persistence
    let repo = build_repository(&config).await?;

    // 2. Media
    let (media, local_media) = build_media_store(&config)?;

    // 3. Identity
    let identities: Arc<dyn IdentityVerifier> =
        Arc::new(JwtIdentityVerifier::new(&config.auth.jwt_secret));

    let state = AppState {
        campgrounds: Arc::new(CampgroundService::new(Arc::clone(&repo), media)),
        guard: Arc::new(OwnershipGuard::new(repo)),
        identities,
        settings: Arc::new(WebSettings {
            auth_cookie: config.auth.cookie_name.clone(),
            login_path: config.auth.login_path.clone(),
            max_upload_bytes: config.server.max_upload_bytes,
            local_media,
        }),
    };

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "YelpCamp listening");

    let app = api_adapters::app(state);
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shut down cleanly");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

async fn build_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn CampgroundRepository>> {
    if let Some(repo) = connect_postgres(config).await? {
        return Ok(repo);
    }

    warn!("using in-memory repository; data is lost on restart");
    Ok(Arc::new(MemoryCampgroundRepository::new()))
}

#[cfg(feature = "db-postgres")]
async fn connect_postgres(
    config: &AppConfig,
) -> anyhow::Result<Option<Arc<dyn CampgroundRepository>>> {
    use storage_adapters::PgCampgroundRepository;

    let Some(url) = &config.database.url else {
        return Ok(None);
    };

    let repo = PgCampgroundRepository::connect(url.expose_secret(), config.database.max_connections)
        .await
        .context("connecting to PostgreSQL")?;
    repo.migrate().await.context("running migrations")?;
    info!("using PostgreSQL repository");
    Ok(Some(Arc::new(repo)))
}

#[cfg(not(feature = "db-postgres"))]
async fn connect_postgres(
    config: &AppConfig,
) -> anyhow::Result<Option<Arc<dyn CampgroundRepository>>> {
    if config.database.url.is_some() {
        warn!("database.url is set but PostgreSQL support is not compiled in");
    }
    Ok(None)
}

fn build_media_store(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn MediaStore>, Option<LocalMediaMount>)> {
    match config.media.backend {
        MediaBackend::Memory => {
            warn!("using in-memory media store; uploads are lost on restart");
            let store: Arc<dyn MediaStore> = Arc::new(MemoryMediaStore::new());
            Ok((store, None))
        }
        #[cfg(feature = "media-local")]
        MediaBackend::Local => {
            let local = &config.media.local;
            info!(root = %local.root.display(), "storing media on the local filesystem");
            let store: Arc<dyn MediaStore> = Arc::new(storage_adapters::LocalMediaStore::new(
                local.root.clone(),
                local.url_prefix.clone(),
            ));
            let mount = LocalMediaMount {
                url_prefix: local.url_prefix.trim_end_matches('/').to_owned(),
                root: local.root.clone(),
            };
            Ok((store, Some(mount)))
        }
        #[cfg(feature = "media-cloudinary")]
        MediaBackend::Cloudinary => {
            let cloudinary = config
                .media
                .cloudinary
                .as_ref()
                .context("media.cloudinary section missing")?;
            let store = storage_adapters::CloudinaryMediaStore::new(
                cloudinary.cloud_name.clone(),
                cloudinary.api_key.clone(),
                SecretString::from(cloudinary.api_secret.expose_secret().to_owned()),
                cloudinary.folder.clone(),
                Duration::from_secs(cloudinary.timeout_secs),
            )?;
            info!(cloud = %cloudinary.cloud_name, "storing media on Cloudinary");
            let store: Arc<dyn MediaStore> = Arc::new(store);
            Ok((store, None))
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("media backend {other:?} is not compiled into this binary"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "could not listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

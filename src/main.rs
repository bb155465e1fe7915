mod api;
mod backup;
mod config;
mod models;
mod scrape;
mod store;
mod transfer;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::Request;
use clap::Parser;
use dotenvy::dotenv;
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::api::auth::tokens::AuthKeys;
use crate::backup::BackupRunner;
use crate::models::Role;
use crate::store::Store;

#[derive(Parser)]
#[command(name = "prompthive", about = "Multi-user prompt library server")]
enum Cli {
    /// Start the HTTP server (default when no subcommand is given)
    #[command(alias = "run")]
    Serve {
        /// Start without the scheduled backup loop
        #[arg(long)]
        no_backups: bool,
    },
    /// Create an ADMIN account from the command line
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// Read from PROMPTHIVE_ADMIN_PASSWORD when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    // Parse CLI args — default to Serve when no subcommand is given,
    // but still allow --help and --version to work.
    let args: Vec<String> = std::env::args().collect();
    let cli = if args.len() <= 1 {
        Cli::Serve { no_backups: false }
    } else {
        Cli::parse()
    };

    match cli {
        Cli::Serve { no_backups } => run_server(no_backups).await,
        Cli::CreateAdmin { username, email, password } => {
            create_admin(&username, &email, password)?;
            Ok(())
        }
    }
}

fn create_admin(username: &str, email: &str, password: Option<String>) -> Result<()> {
    let config = config::Config::from_env();
    let password = password
        .or_else(|| std::env::var("PROMPTHIVE_ADMIN_PASSWORD").ok())
        .filter(|p| !p.is_empty())
        .context("pass --password or set PROMPTHIVE_ADMIN_PASSWORD")?;
    if password.len() < 8 {
        anyhow::bail!("password must be at least 8 characters");
    }

    let store = Store::open(&config.database_path())?;
    let password_hash =
        bcrypt::hash(&password, bcrypt::DEFAULT_COST).context("failed to hash password")?;
    let user = store
        .create_user(username, email, &password_hash, Role::Admin)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("Created admin account '{}' ({})", user.username, user.id);
    Ok(())
}

async fn run_server(no_backups: bool) -> Result<(), Box<dyn Error>> {
    let config = config::Config::from_env();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("prompthive=info,tower_http=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true).with_bracketed_fields(false))
        .with(sentry::integrations::tracing::layer().event_filter(
            |metadata| match *metadata.level() {
                tracing::Level::ERROR => sentry::integrations::tracing::EventFilter::Event,
                tracing::Level::WARN | tracing::Level::INFO => {
                    sentry::integrations::tracing::EventFilter::Breadcrumb
                }
                _ => sentry::integrations::tracing::EventFilter::Ignore,
            },
        ))
        .init();

    let _guard = sentry::init((
        config.sentry_dsn.clone().unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(config.environment.clone().into()),
            send_default_pii: true,
            traces_sample_rate: 0.2,
            enable_logs: true,
            ..Default::default()
        },
    ));

    let http_client = Arc::new(
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?,
    );

    let store = Arc::new(Store::open(&config.database_path()).context("failed to open store")?);

    let jwt_secret = match &config.jwt_secret {
        Some(secret) => secret.clone(),
        None => {
            tracing::warn!("JWT_SECRET not set — generating a random one; tokens won't survive restarts");
            AuthKeys::generate_secret()?
        }
    };
    let auth = Arc::new(AuthKeys::new(&jwt_secret));

    let backup_runner = Arc::new(BackupRunner::new(
        store.clone(),
        config.backup_dir(),
        config.backup_keep,
        config.base_url.clone(),
    ));
    if no_backups {
        tracing::info!("Scheduled backups disabled (--no-backups)");
    } else {
        backup::spawn_backup_loop(backup_runner.clone(), config.backup_schedule.clone());
    }

    let app_state = api::AppState {
        store,
        http_client,
        backup: backup_runner,
        auth,
    };

    let app = api::create_app(app_state)
        .layer(SentryHttpLayer::new().enable_transaction())
        .layer(NewSentryLayer::<Request<Body>>::new_from_top());

    let port = config.port;
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("Listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

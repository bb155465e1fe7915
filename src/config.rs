use std::path::PathBuf;

/// Server configuration loaded from environment variables.
pub struct Config {
    pub port: u16,
    /// Base directory for the SQLite database, attachments and backups.
    pub data_dir: PathBuf,
    /// HS256 signing secret. Generated at startup when not configured.
    pub jwt_secret: Option<String>,
    /// Public base URL, used in export metadata.
    pub base_url: String,
    /// Cron expression for the scheduled backup loop.
    pub backup_schedule: String,
    /// How many backup files to retain.
    pub backup_keep: usize,
    pub sentry_dsn: Option<String>,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Self {
        let default_data_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".prompthive")
            .display()
            .to_string();

        Self::from_raw_values(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("DATA_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .as_deref()
                .or(Some(&default_data_dir)),
            std::env::var("JWT_SECRET").ok().as_deref(),
            std::env::var("BASE_URL").ok().as_deref(),
            std::env::var("BACKUP_SCHEDULE").ok().as_deref(),
            std::env::var("BACKUP_KEEP").ok().as_deref(),
            std::env::var("SENTRY_DSN").ok().as_deref(),
            std::env::var("ENVIRONMENT").ok().as_deref(),
        )
    }

    /// Build a Config from raw string values (as they would come from env vars).
    /// Used directly in tests to avoid mutating process-global environment.
    #[allow(clippy::too_many_arguments)]
    pub fn from_raw_values(
        port: Option<&str>,
        data_dir: Option<&str>,
        jwt_secret: Option<&str>,
        base_url: Option<&str>,
        backup_schedule: Option<&str>,
        backup_keep: Option<&str>,
        sentry_dsn: Option<&str>,
        environment: Option<&str>,
    ) -> Self {
        let port = port.and_then(|v| v.parse().ok()).unwrap_or(8080);

        let data_dir = data_dir
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".prompthive"));

        let jwt_secret = jwt_secret.filter(|s| !s.is_empty()).map(String::from);

        let base_url = base_url
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let backup_schedule = backup_schedule
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| "30 3 * * *".to_string());

        let backup_keep = backup_keep.and_then(|v| v.parse().ok()).unwrap_or(14);

        let sentry_dsn = sentry_dsn.filter(|s| !s.is_empty()).map(String::from);

        let environment = environment
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| "local".to_string());

        Config {
            port,
            data_dir,
            jwt_secret,
            base_url,
            backup_schedule,
            backup_keep,
            sentry_dsn,
            environment,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("prompthive.db")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }
}

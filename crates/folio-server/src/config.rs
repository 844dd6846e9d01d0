use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_EDITOR_IDLE_MINUTES: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub admins: HashSet<String>,
    /// Initial password for admin accounts that do not exist yet.
    pub admin_password: Option<String>,
    pub max_image_bytes: usize,
    /// Editor sessions untouched this long are torn down.
    pub editor_idle: Duration,
}

impl Config {
    /// Read `FOLIO_*` variables. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = var("FOLIO_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("FOLIO_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let port = match var("FOLIO_PORT") {
            Some(raw) => raw.parse().with_context(|| format!("invalid FOLIO_PORT '{}'", raw))?,
            None => 3000,
        };
        let max_image_bytes = match var("FOLIO_MAX_IMAGE_BYTES") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid FOLIO_MAX_IMAGE_BYTES '{}'", raw))?,
            None => DEFAULT_MAX_IMAGE_BYTES,
        };
        let editor_idle_minutes = match var("FOLIO_EDITOR_IDLE_MINUTES") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid FOLIO_EDITOR_IDLE_MINUTES '{}'", raw))?,
            None => DEFAULT_EDITOR_IDLE_MINUTES,
        };

        Ok(Self {
            jwt_secret,
            db_path: var("FOLIO_DB_PATH").unwrap_or_else(|| "folio.db".into()).into(),
            host: var("FOLIO_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            admins: parse_admins(&var("FOLIO_ADMINS").unwrap_or_default()),
            admin_password: var("FOLIO_ADMIN_PASSWORD").filter(|p| !p.is_empty()),
            max_image_bytes,
            editor_idle: Duration::from_secs(editor_idle_minutes * 60),
        })
    }
}

fn parse_admins(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

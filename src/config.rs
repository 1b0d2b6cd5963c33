use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use tracing::info;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db: DbConfig,
    pub backup_dir: PathBuf,
    pub seed_demo: bool,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    pub pool_size: u32,
    pub idle_timeout: Duration,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool_size: 20,
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let pool_size: u32 = try_load("RECORDS_POOL_SIZE", "20")?;
        if pool_size == 0 {
            return Err(anyhow!("RECORDS_POOL_SIZE must be at least 1"));
        }
        let idle_secs: u64 = try_load("RECORDS_POOL_IDLE_SECS", "60")?;

        Ok(Self {
            host: try_load("RECORDS_HOST", "0.0.0.0")?,
            port: try_load("RECORDS_PORT", "3000")?,
            db: DbConfig {
                path: try_load("RECORDS_DB_PATH", "data/records.sqlite3")?,
                pool_size,
                idle_timeout: Duration::from_secs(idle_secs),
            },
            backup_dir: try_load("RECORDS_BACKUP_DIR", "backups")?,
            seed_demo: try_load("RECORDS_SEED_DEMO", "false")?,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("invalid {key} value: {raw}"))
}

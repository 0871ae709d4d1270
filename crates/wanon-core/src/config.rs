use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{cache::EvictorConfig, errors::Error, Result};

const DEFAULT_DATABASE_PATH: &str = "wanon.db";
const DEFAULT_CLEAN_INTERVAL: Duration = Duration::from_secs(10 * 60);
const DEFAULT_KEEP_DURATION: Duration = Duration::from_secs(48 * 60 * 60);

/// Typed configuration, read from the environment (and `.env` when present).
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    // Chat allowlist
    pub allowed_chat_ids: Vec<i64>,
    pub auto_leave_unauthorized: bool,

    // Storage
    pub database_path: PathBuf,

    // Message cache
    pub cache_clean_interval: Duration,
    pub cache_keep_duration: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(env_str)
    }

    /// Build the config from an arbitrary key lookup instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let allowed_chat_ids = parse_csv_i64(lookup("WANON_ALLOWED_CHAT_IDS"));
        let auto_leave_unauthorized = lookup("WANON_AUTO_LEAVE_UNAUTHORIZED")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        let database_path = PathBuf::from(
            lookup("WANON_DATABASE_PATH")
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
        );

        let cache_clean_interval = duration_var(
            &lookup,
            "WANON_CACHE_CLEAN_INTERVAL",
            DEFAULT_CLEAN_INTERVAL,
        )?;
        let cache_keep_duration =
            duration_var(&lookup, "WANON_CACHE_KEEP_DURATION", DEFAULT_KEEP_DURATION)?;

        Ok(Self {
            telegram_bot_token,
            allowed_chat_ids,
            auto_leave_unauthorized,
            database_path,
            cache_clean_interval,
            cache_keep_duration,
        })
    }

    pub fn evictor_config(&self) -> EvictorConfig {
        EvictorConfig {
            clean_interval: self.cache_clean_interval,
            keep_duration: self.cache_keep_duration,
        }
    }
}

fn duration_var<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key).and_then(non_empty) else {
        return Ok(default);
    };
    parse_duration(&raw).map_err(|e| Error::Config(format!("{key}: {e}")))
}

/// Parse a humantime duration (`10m`, `1h30m`, `500ms`, `2d`) or bare seconds.
pub fn parse_duration(raw: &str) -> std::result::Result<Duration, String> {
    let s = raw.trim();
    let d = match s.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(s)
            .map_err(|e| format!("invalid duration {raw:?}: {e}"))?,
    };
    if d.is_zero() {
        return Err(format!("duration {raw:?} must be positive"));
    }
    Ok(d)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{errors::Error, Result};

/// Tunables of the query engine. Plain data so tests can build it directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryConfig {
    /// Tag occurrences examined by a channel-scope count before stopping.
    pub channel_scan_budget: i64,
    /// Team-scope budget when the caller gives no `max`.
    pub team_default_max: i64,
    /// Messages requested per store page while scanning.
    pub message_page_size: usize,
    /// Channels requested per listing call.
    pub channel_page_size: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            channel_scan_budget: 5000,
            team_default_max: 1000,
            message_page_size: 200,
            channel_page_size: 200,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// Process configuration, read from the environment (and `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    pub snapshot_path: PathBuf,
    pub query: QueryConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let snapshot_path = env_str("HASHTAGS_SNAPSHOT_PATH")
            .and_then(non_empty)
            .map(PathBuf::from)
            .ok_or_else(|| {
                Error::Config("HASHTAGS_SNAPSHOT_PATH environment variable is required".to_string())
            })?;

        let query = query_config_from(env_str)?;

        Ok(Self {
            snapshot_path,
            query,
        })
    }
}

/// Unset or unparsable values fall back to the defaults.
fn query_config_from(get: impl Fn(&str) -> Option<String>) -> Result<QueryConfig> {
    let d = QueryConfig::default();
    let int = |key: &str| get(key).and_then(|s| s.trim().parse::<i64>().ok());
    let size = |key: &str| get(key).and_then(|s| s.trim().parse::<usize>().ok());

    let cfg = QueryConfig {
        channel_scan_budget: int("HASHTAGS_CHANNEL_SCAN_BUDGET").unwrap_or(d.channel_scan_budget),
        team_default_max: int("HASHTAGS_TEAM_DEFAULT_MAX").unwrap_or(d.team_default_max),
        message_page_size: size("HASHTAGS_MESSAGE_PAGE_SIZE").unwrap_or(d.message_page_size),
        channel_page_size: size("HASHTAGS_CHANNEL_PAGE_SIZE").unwrap_or(d.channel_page_size),
        default_page_size: size("HASHTAGS_DEFAULT_PAGE_SIZE").unwrap_or(d.default_page_size),
        max_page_size: size("HASHTAGS_MAX_PAGE_SIZE").unwrap_or(d.max_page_size),
    };
    cfg.validate()?;
    Ok(cfg)
}

impl QueryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.message_page_size == 0 {
            return Err(Error::Config("HASHTAGS_MESSAGE_PAGE_SIZE must be > 0".to_string()));
        }
        if self.channel_page_size == 0 {
            return Err(Error::Config("HASHTAGS_CHANNEL_PAGE_SIZE must be > 0".to_string()));
        }
        if self.max_page_size == 0 || self.default_page_size == 0 {
            return Err(Error::Config("page sizes must be > 0".to_string()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(Error::Config(format!(
                "default page size {} exceeds max page size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        Ok(())
    }
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

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

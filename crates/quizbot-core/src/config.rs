use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

pub const DEFAULT_BANK_FILE: &str = "тест.txt";
pub const DEFAULT_TOPIC_MARKER: &str = "МДК";
pub const DEFAULT_ALL_TOPICS_NAME: &str = "🎲 Все темы (рандом)";

/// Typed configuration for the quiz bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Question bank
    pub bank_file: PathBuf,
    pub topic_marker: String,
    pub all_topics_name: String,

    // Per-user state lifecycle
    pub session_ttl: Duration,
    pub cleanup_interval: Duration,
    /// Keep correctly answered questions for the whole process lifetime, even after
    /// a user's session state expires.
    pub remember_progress: bool,

    // Bank file watcher
    pub watch_enabled: bool,
    pub watch_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bank_file: PathBuf::from(DEFAULT_BANK_FILE),
            topic_marker: DEFAULT_TOPIC_MARKER.to_string(),
            all_topics_name: DEFAULT_ALL_TOPICS_NAME.to_string(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            cleanup_interval: Duration::from_secs(60 * 60),
            remember_progress: false,
            watch_enabled: true,
            watch_interval: Duration::from_secs(15),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let defaults = Self::default();

        let bank_file = env_path("QUIZ_BANK_FILE").unwrap_or(defaults.bank_file);

        let topic_marker = env_str("QUIZ_TOPIC_MARKER")
            .and_then(non_empty)
            .unwrap_or(defaults.topic_marker);
        if topic_marker.starts_with('+')
            || topic_marker.starts_with('-')
            || topic_marker.starts_with(|c: char| c.is_ascii_digit())
        {
            return Err(Error::Config(format!(
                "QUIZ_TOPIC_MARKER must not look like an answer or question line: {topic_marker:?}"
            )));
        }

        let all_topics_name = env_str("QUIZ_ALL_TOPICS_NAME")
            .and_then(non_empty)
            .unwrap_or(defaults.all_topics_name);

        let session_ttl = env_u64("QUIZ_SESSION_TTL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.session_ttl);
        let cleanup_interval = env_u64("QUIZ_CLEANUP_INTERVAL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.cleanup_interval);
        if cleanup_interval.is_zero() {
            return Err(Error::Config(
                "QUIZ_CLEANUP_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        let remember_progress =
            env_bool("QUIZ_REMEMBER_PROGRESS").unwrap_or(defaults.remember_progress);

        let watch_enabled = env_bool("QUIZ_WATCH_ENABLED").unwrap_or(defaults.watch_enabled);
        let watch_interval = env_u64("QUIZ_WATCH_INTERVAL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.watch_interval);
        if watch_enabled && watch_interval.is_zero() {
            return Err(Error::Config(
                "QUIZ_WATCH_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bank_file,
            topic_marker,
            all_topics_name,
            session_ttl,
            cleanup_interval,
            remember_progress,
            watch_enabled,
            watch_interval,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

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
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, strip_quotes(v.trim()));
    }
}

fn strip_quotes(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}

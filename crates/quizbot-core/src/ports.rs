//! Narrow interfaces to the outside world.
//!
//! The core only needs two external facts: the raw bank text and a per-user record
//! of questions already answered correctly.

use std::{
    collections::{HashMap, HashSet},
    fs, io,
    path::PathBuf,
    sync::{Mutex, PoisonError},
    time::SystemTime,
};

use crate::{domain::UserId, errors::Error, Result};

/// Where the question bank text comes from.
pub trait BankSource: Send + Sync {
    /// Human-readable origin for logs.
    fn describe(&self) -> String;

    fn load_text(&self) -> Result<String>;

    /// Last modification time, if the source can tell. Used by the bank watcher.
    fn modified(&self) -> Option<SystemTime> {
        None
    }
}

#[derive(Clone, Debug)]
pub struct FileBankSource {
    path: PathBuf,
}

impl FileBankSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BankSource for FileBankSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load_text(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::FileMissing {
                path: self.path.clone(),
            },
            _ => Error::Io(e),
        })
    }

    fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }
}

/// In-memory bank text; `set_text` simulates an edited file.
#[derive(Debug, Default)]
pub struct StaticBankSource {
    text: Mutex<Option<String>>,
}

impl StaticBankSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(Some(text.into())),
        }
    }

    /// A source that behaves like a missing file.
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn set_text(&self, text: Option<String>) {
        *self.text.lock().unwrap_or_else(PoisonError::into_inner) = text;
    }
}

impl BankSource for StaticBankSource {
    fn describe(&self) -> String {
        "<memory>".to_string()
    }

    fn load_text(&self) -> Result<String> {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Error::FileMissing {
                path: PathBuf::from("<memory>"),
            })
    }
}

/// Per-user record of questions answered correctly, keyed by real topic.
///
/// Implementations must be cheap; they are called while a user's state is locked.
pub trait ProgressStore: Send + Sync {
    fn load_correct(&self, user: UserId) -> HashMap<String, HashSet<String>>;
    fn record_correct(&self, user: UserId, topic: &str, key: &str);
    fn clear(&self, user: UserId);
}

/// Keeps nothing: user progress lives only as long as the in-memory session.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgressStore;

impl ProgressStore for NoProgressStore {
    fn load_correct(&self, _user: UserId) -> HashMap<String, HashSet<String>> {
        HashMap::new()
    }

    fn record_correct(&self, _user: UserId, _topic: &str, _key: &str) {}

    fn clear(&self, _user: UserId) {}
}

/// Process-lifetime record; survives TTL eviction of session state.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    inner: Mutex<HashMap<UserId, HashMap<String, HashSet<String>>>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load_correct(&self, user: UserId) -> HashMap<String, HashSet<String>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .cloned()
            .unwrap_or_default()
    }

    fn record_correct(&self, user: UserId, topic: &str, key: &str) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user)
            .or_default()
            .entry(topic.to_string())
            .or_default()
            .insert(key.to_string());
    }

    fn clear(&self, user: UserId) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.txt"))
    }

    #[test]
    fn missing_file_maps_to_file_missing() {
        let src = FileBankSource::new(tmp_file("quizbot-missing"));
        assert!(matches!(src.load_text(), Err(Error::FileMissing { .. })));
        assert!(src.modified().is_none());
    }

    #[test]
    fn file_source_reads_text_and_mtime() {
        let path = tmp_file("quizbot-bank");
        fs::write(&path, "МДК 1\n1. q\n+ a\n").unwrap();
        let src = FileBankSource::new(&path);
        assert!(src.load_text().unwrap().starts_with("МДК 1"));
        assert!(src.modified().is_some());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn static_source_can_go_missing() {
        let src = StaticBankSource::new("x");
        assert_eq!(src.load_text().unwrap(), "x");
        src.set_text(None);
        assert!(matches!(src.load_text(), Err(Error::FileMissing { .. })));
    }

    #[test]
    fn memory_store_records_and_clears() {
        let store = MemoryProgressStore::new();
        let u = UserId(5);
        store.record_correct(u, "T", "1. q");
        store.record_correct(u, "T", "1. q");
        assert_eq!(store.load_correct(u)["T"].len(), 1);
        store.clear(u);
        assert!(store.load_correct(u).is_empty());
    }
}

//! The quiz store: owns the current question bank and all per-user state.
//!
//! Locking:
//! - the bank is an `Arc` behind an `RwLock`; a load builds the new bank first and
//!   swaps it in one write, so readers see either the old or the new bank.
//! - each user has its own `Mutex`; every operation holds it for the whole
//!   read-modify-write. The map lock is only held to look up or insert a slot.
//! - the idle purge marks a slot `evicted` under the user's lock before dropping it;
//!   an operation that raced with the purge notices and retries on a fresh slot.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError},
    time::Duration,
};

use rand::{rngs::StdRng, RngCore, SeedableRng};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    bank::{parse_bank, LineClassifier, QuestionBank},
    config::Config,
    domain::UserId,
    errors::Error,
    ports::{BankSource, FileBankSource, MemoryProgressStore, NoProgressStore, ProgressStore},
    progress::{Tier, TopicStanding, UserProgress},
    quiz::{ActiveQuestion, AskOutcome, Grade, PresentedQuestion},
    selector::{self, SelectedQuestion, Selection},
    stats::UserStats,
    Result,
};

#[derive(Debug)]
struct UserEntry {
    progress: UserProgress,
    stats: UserStats,
    active: Option<ActiveQuestion>,
    last_active: Instant,
    evicted: bool,
}

type UserSlot = Arc<Mutex<UserEntry>>;

pub struct QuizStore {
    classifier: LineClassifier,
    all_topics_name: String,
    source: Arc<dyn BankSource>,
    progress_store: Arc<dyn ProgressStore>,
    bank: RwLock<Option<Arc<QuestionBank>>>,
    users: RwLock<HashMap<UserId, UserSlot>>,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl QuizStore {
    pub fn new(
        topic_marker: &str,
        all_topics_name: &str,
        source: Arc<dyn BankSource>,
        progress_store: Arc<dyn ProgressStore>,
    ) -> Self {
        Self {
            classifier: LineClassifier::new(topic_marker),
            all_topics_name: all_topics_name.to_string(),
            source,
            progress_store,
            bank: RwLock::new(None),
            users: RwLock::new(HashMap::new()),
            rng: Mutex::new(Box::new(StdRng::from_os_rng())),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let progress_store: Arc<dyn ProgressStore> = if cfg.remember_progress {
            Arc::new(MemoryProgressStore::new())
        } else {
            Arc::new(NoProgressStore)
        };
        Self::new(
            &cfg.topic_marker,
            &cfg.all_topics_name,
            Arc::new(FileBankSource::new(&cfg.bank_file)),
            progress_store,
        )
    }

    /// Replace the random source (tests use a seeded `StdRng`).
    pub fn with_rng(self, rng: impl RngCore + Send + 'static) -> Self {
        *lock(&self.rng) = Box::new(rng);
        self
    }

    pub fn source(&self) -> &Arc<dyn BankSource> {
        &self.source
    }

    // ============== Bank ==============

    /// Parse `text` and swap it in as the current bank.
    pub fn load_bank(&self, text: &str) -> bool {
        let report = parse_bank(text, &self.classifier, &self.all_topics_name);

        for diag in &report.diagnostics {
            if diag.is_minor() {
                debug!(%diag, "question bank note");
            } else {
                warn!(%diag, "question bank anomaly");
            }
        }

        let bank = Arc::new(report.bank);
        if bank.topics().iter().any(|t| bank.is_aggregate(&t.name)) {
            warn!(
                topic = bank.all_topics_name(),
                "a parsed topic shadows the aggregate topic name"
            );
        }

        info!(
            topics = bank.topics().len(),
            questions = bank.total_questions(),
            anomalies = report.diagnostics.iter().filter(|d| !d.is_minor()).count(),
            "question bank loaded"
        );
        for topic in bank.topics() {
            debug!(topic = %topic.name, questions = topic.questions.len(), "topic loaded");
        }

        *write(&self.bank) = Some(bank);
        true
    }

    /// Read the bank source and load it. On failure the current bank (if any) stays.
    pub fn load_from_source(&self) -> bool {
        match self.source.load_text() {
            Ok(text) => self.load_bank(&text),
            Err(Error::FileMissing { path }) => {
                warn!(path = %path.display(), "question bank file not found");
                false
            }
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "failed to read question bank");
                false
            }
        }
    }

    pub fn bank(&self) -> Option<Arc<QuestionBank>> {
        read(&self.bank).clone()
    }

    pub fn is_loaded(&self) -> bool {
        read(&self.bank).is_some()
    }

    /// Real topics followed by the aggregate topic; empty until a bank is loaded.
    pub fn list_topics(&self) -> Vec<String> {
        self.bank().map(|b| b.list_topics()).unwrap_or_default()
    }

    pub fn count_questions(&self, topic: &str) -> usize {
        self.bank().map(|b| b.count_questions(topic)).unwrap_or(0)
    }

    // ============== Selection / progress ==============

    pub fn next(&self, user: UserId, topic: &str) -> Selection {
        let Some(bank) = self.bank() else {
            debug!(%user, topic, "selection requested before the bank was loaded");
            return Selection::TopicComplete;
        };
        if !bank.has_topic(topic) {
            warn!(%user, topic, "selection requested for unknown topic");
            return Selection::TopicComplete;
        }

        self.with_user(user, |entry| self.select(&bank, topic, &entry.progress))
    }

    /// Record an answer for `key` in `topic`.
    ///
    /// Through the aggregate topic the caller does not say which copy was served,
    /// so the answer is recorded in every real topic holding that key.
    pub fn mark_answered(&self, user: UserId, topic: &str, key: &str, correct: bool) {
        let source_topics: Vec<String> = match self.bank() {
            Some(bank) if bank.is_aggregate(topic) => bank
                .source_topics_of(key)
                .into_iter()
                .map(str::to_string)
                .collect(),
            _ => vec![topic.to_string()],
        };
        if source_topics.is_empty() {
            warn!(%user, key, "answer for a question not in the bank; ignored");
            return;
        }

        self.with_user(user, |entry| {
            for source_topic in &source_topics {
                self.record_answer(user, entry, source_topic, key, correct);
            }
        });
    }

    /// Clear the retry state of `topic` (every real topic for the aggregate).
    pub fn restart_topic(&self, user: UserId, topic: &str) {
        let aggregate = topic == self.all_topics_name;
        self.with_user(user, |entry| {
            if aggregate {
                entry.progress.restart_all();
            } else {
                entry.progress.restart_topic(topic);
            }
            entry.active = None;
        });
        debug!(%user, topic, "topic restarted");
    }

    /// Forget everything about the user: lifetime progress, statistics, active question.
    pub fn reset_lifetime(&self, user: UserId) {
        self.with_user(user, |entry| {
            entry.progress.reset();
            entry.stats = UserStats::default();
            entry.active = None;
            self.progress_store.clear(user);
        });
        info!(%user, "user progress reset");
    }

    // ============== Quiz flow ==============

    /// Select the next question and make it the user's active question.
    pub fn ask(&self, user: UserId, topic: &str) -> Result<AskOutcome> {
        let bank = self.bank().ok_or(Error::NotLoaded)?;
        if !bank.has_topic(topic) {
            return Err(Error::UnknownTopic(topic.to_string()));
        }

        Ok(self.with_user(user, |entry| {
            let Selection::Question(selected) = self.select(&bank, topic, &entry.progress) else {
                entry.active = None;
                return AskOutcome::TopicComplete {
                    topic: topic.to_string(),
                };
            };

            let active = {
                let mut rng = lock(&self.rng);
                ActiveQuestion::from_selected(&selected, &mut **rng)
            };
            entry.stats.mark_started();
            let presented = PresentedQuestion::new(&selected, &active, entry.stats.clone());
            entry.active = Some(active);
            AskOutcome::Question(presented)
        }))
    }

    /// Grade a 1-based choice against the user's active question.
    pub fn answer(&self, user: UserId, choice: usize) -> Result<Grade> {
        self.with_user(user, |entry| {
            let active = entry.active.as_ref().ok_or(Error::NoActiveQuestion)?;
            let selected = active.choice(choice)?.clone();
            let correct_answers = active.correct_texts();
            let source_topic = active.source_topic.clone();
            let key = active.key.clone();

            entry.stats.record(selected.correct);
            self.record_answer(user, entry, &source_topic, &key, selected.correct);
            entry.active = None;

            Ok(Grade {
                correct: selected.correct,
                selected: selected.text,
                correct_answers,
                stats: entry.stats.clone(),
            })
        })
    }

    pub fn stats(&self, user: UserId) -> UserStats {
        self.existing_slot(user)
            .map(|slot| lock(&slot).stats.clone())
            .unwrap_or_default()
    }

    /// Mastered and pending-retry counts for `topic`; `None` for unknown topics.
    pub fn standing(&self, user: UserId, topic: &str) -> Option<TopicStanding> {
        let bank = self.bank()?;
        if !bank.has_topic(topic) {
            return None;
        }

        let tally = |progress: &UserProgress| {
            let candidates = bank.candidates(topic);
            let mut standing = TopicStanding {
                total: candidates.len(),
                ..TopicStanding::default()
            };
            for c in &candidates {
                let key = c.question.key();
                let Some(tp) = progress.topic(c.source_topic) else {
                    continue;
                };
                if tp.is_lifetime_correct(key) {
                    standing.mastered += 1;
                } else if tp.tier(key) == Tier::Retry {
                    standing.pending_retries += 1;
                }
            }
            standing
        };

        let live = self.existing_slot(user).and_then(|slot| {
            let entry = lock(&slot);
            (!entry.evicted).then(|| tally(&entry.progress))
        });
        Some(live.unwrap_or_else(|| {
            tally(&UserProgress::from_correct(
                self.progress_store.load_correct(user),
            ))
        }))
    }

    /// Close the user's quiz session and return its final statistics.
    ///
    /// Topic progress is kept; use `restart_topic`/`reset_lifetime` for that.
    pub fn end_session(&self, user: UserId) -> Option<UserStats> {
        let slot = self.existing_slot(user)?;
        let mut entry = lock(&slot);
        if entry.evicted {
            return None;
        }
        entry.active = None;
        Some(std::mem::take(&mut entry.stats))
    }

    // ============== Lifecycle ==============

    pub fn user_count(&self) -> usize {
        read(&self.users).len()
    }

    pub fn purge_idle(&self, ttl: Duration) -> usize {
        self.purge_idle_at(Instant::now(), ttl)
    }

    /// Drop users idle for at least `ttl` as of `now`. Users busy in another
    /// operation are skipped; they are active by definition.
    pub fn purge_idle_at(&self, now: Instant, ttl: Duration) -> usize {
        let mut users = write(&self.users);
        let before = users.len();
        users.retain(|_, slot| {
            let mut entry = match slot.try_lock() {
                Ok(entry) => entry,
                Err(TryLockError::Poisoned(p)) => p.into_inner(),
                Err(TryLockError::WouldBlock) => return true,
            };
            if now.saturating_duration_since(entry.last_active) < ttl {
                return true;
            }
            entry.evicted = true;
            false
        });
        before - users.len()
    }

    // ============== Internals ==============

    fn select(&self, bank: &QuestionBank, topic: &str, progress: &UserProgress) -> Selection {
        let candidates = bank.candidates(topic);
        let picked = {
            let mut rng = lock(&self.rng);
            selector::pick(&candidates, progress, &mut **rng)
        };
        match picked {
            Some((c, tier)) => Selection::Question(SelectedQuestion {
                topic: topic.to_string(),
                source_topic: c.source_topic.to_string(),
                question: c.question.clone(),
                tier,
            }),
            None => Selection::TopicComplete,
        }
    }

    fn record_answer(
        &self,
        user: UserId,
        entry: &mut UserEntry,
        source_topic: &str,
        key: &str,
        correct: bool,
    ) {
        entry.progress.mark_answered(source_topic, key, correct);
        if correct {
            self.progress_store.record_correct(user, source_topic, key);
        }
        debug!(%user, topic = source_topic, key, correct, "answer recorded");
    }

    fn with_user<T>(&self, user: UserId, f: impl FnOnce(&mut UserEntry) -> T) -> T {
        loop {
            let slot = self.slot(user);
            let mut entry = lock(&slot);
            if entry.evicted {
                continue;
            }
            entry.last_active = Instant::now();
            return f(&mut entry);
        }
    }

    fn existing_slot(&self, user: UserId) -> Option<UserSlot> {
        read(&self.users).get(&user).cloned()
    }

    fn slot(&self, user: UserId) -> UserSlot {
        if let Some(slot) = self.existing_slot(user) {
            return slot;
        }
        write(&self.users)
            .entry(user)
            .or_insert_with(|| {
                Arc::new(Mutex::new(UserEntry {
                    progress: UserProgress::from_correct(self.progress_store.load_correct(user)),
                    stats: UserStats::default(),
                    active: None,
                    last_active: Instant::now(),
                    evicted: false,
                }))
            })
            .clone()
    }
}

// State behind these locks stays consistent between statements, so a panic
// elsewhere does not invalidate it.
fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}

//! Per-user, per-topic answer tracking.
//!
//! Two independent records per topic:
//! - `lifetime_correct`: questions ever answered correctly; survives topic restarts.
//! - `session_incorrect`: questions answered wrong during the current topic session
//!   (`false`), flipped to `true` once resolved. Cleared by a topic restart.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

/// How the selector should treat a question for a given user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    New,
    Retry,
    Excluded,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopicProgress {
    lifetime_correct: HashSet<String>,
    session_incorrect: HashMap<String, bool>,
}

impl TopicProgress {
    pub fn tier(&self, key: &str) -> Tier {
        if self.lifetime_correct.contains(key) {
            return Tier::Excluded;
        }
        match self.session_incorrect.get(key) {
            None => Tier::New,
            Some(false) => Tier::Retry,
            Some(true) => Tier::Excluded,
        }
    }

    pub fn mark_answered(&mut self, key: &str, correct: bool) {
        if correct {
            self.lifetime_correct.insert(key.to_string());
            if let Some(resolved) = self.session_incorrect.get_mut(key) {
                *resolved = true;
            }
        } else {
            self.session_incorrect.insert(key.to_string(), false);
        }
    }

    pub fn restart(&mut self) {
        self.session_incorrect.clear();
    }

    pub fn is_lifetime_correct(&self, key: &str) -> bool {
        self.lifetime_correct.contains(key)
    }
}

/// A user's position in one topic, counted over the questions currently in the bank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TopicStanding {
    pub total: usize,
    pub mastered: usize,
    pub pending_retries: usize,
}

impl TopicStanding {
    pub fn remaining(&self) -> usize {
        self.total - self.mastered
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserProgress {
    topics: HashMap<String, TopicProgress>,
}

impl UserProgress {
    /// Build from an externally persisted "already answered correctly" record.
    pub fn from_correct(correct: HashMap<String, HashSet<String>>) -> Self {
        let topics = correct
            .into_iter()
            .map(|(topic, keys)| {
                (
                    topic,
                    TopicProgress {
                        lifetime_correct: keys,
                        session_incorrect: HashMap::new(),
                    },
                )
            })
            .collect();
        Self { topics }
    }

    pub fn topic(&self, topic: &str) -> Option<&TopicProgress> {
        self.topics.get(topic)
    }

    pub fn tier(&self, topic: &str, key: &str) -> Tier {
        self.topics
            .get(topic)
            .map(|t| t.tier(key))
            .unwrap_or(Tier::New)
    }

    pub fn mark_answered(&mut self, topic: &str, key: &str, correct: bool) {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .mark_answered(key, correct);
    }

    pub fn restart_topic(&mut self, topic: &str) {
        if let Some(t) = self.topics.get_mut(topic) {
            t.restart();
        }
    }

    pub fn restart_all(&mut self) {
        self.topics.values_mut().for_each(TopicProgress::restart);
    }

    pub fn reset(&mut self) {
        self.topics.clear();
    }
}

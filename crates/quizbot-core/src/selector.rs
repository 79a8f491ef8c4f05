//! Next-question policy: any New question first, then Retry, then the topic is complete.
//! Within a tier the pick is uniform over the injected RNG.

use rand::{seq::IndexedRandom, Rng};

use crate::{
    bank::{Candidate, Question},
    progress::{Tier, UserProgress},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedQuestion {
    /// Topic the user asked for (may be the aggregate topic).
    pub topic: String,
    /// Real topic the question belongs to; progress is recorded here.
    pub source_topic: String,
    pub question: Question,
    pub tier: Tier,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Question(SelectedQuestion),
    TopicComplete,
}

impl Selection {
    pub fn is_complete(&self) -> bool {
        matches!(self, Selection::TopicComplete)
    }

    pub fn question(&self) -> Option<&SelectedQuestion> {
        match self {
            Selection::Question(q) => Some(q),
            Selection::TopicComplete => None,
        }
    }
}

/// Split candidates into (New, Retry); excluded ones are dropped.
pub fn partition<'a>(
    candidates: &[Candidate<'a>],
    progress: &UserProgress,
) -> (Vec<Candidate<'a>>, Vec<Candidate<'a>>) {
    let mut fresh = Vec::new();
    let mut retry = Vec::new();
    for c in candidates {
        match progress.tier(c.source_topic, c.question.key()) {
            Tier::New => fresh.push(*c),
            Tier::Retry => retry.push(*c),
            Tier::Excluded => {}
        }
    }
    (fresh, retry)
}

pub fn pick<'a, R>(
    candidates: &[Candidate<'a>],
    progress: &UserProgress,
    rng: &mut R,
) -> Option<(Candidate<'a>, Tier)>
where
    R: Rng + ?Sized,
{
    let (fresh, retry) = partition(candidates, progress);
    if let Some(c) = fresh.choose(rng) {
        return Some((*c, Tier::New));
    }
    retry.choose(rng).map(|c| (*c, Tier::Retry))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::bank::{Answer, QuestionBank, Topic};

    fn bank() -> QuestionBank {
        let topic = |name: &str, n: u32| Topic {
            name: name.to_string(),
            questions: (1..=n)
                .map(|i| {
                    Question::new(
                        Some(i),
                        &i.to_string(),
                        format!("q{i}"),
                        vec![Answer {
                            text: "a".to_string(),
                            correct: true,
                        }],
                    )
                })
                .collect(),
        };
        QuestionBank::new(vec![topic("A", 3), topic("B", 2)], "ALL")
    }

    #[test]
    fn new_questions_come_before_retries() {
        let b = bank();
        let candidates = b.candidates("A");
        let mut progress = UserProgress::default();
        progress.mark_answered("A", "1. q1", false);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let (c, tier) = pick(&candidates, &progress, &mut rng).unwrap();
            assert_eq!(tier, Tier::New);
            assert_ne!(c.question.key(), "1. q1");
        }

        progress.mark_answered("A", "2. q2", true);
        progress.mark_answered("A", "3. q3", true);
        let (c, tier) = pick(&candidates, &progress, &mut rng).unwrap();
        assert_eq!(tier, Tier::Retry);
        assert_eq!(c.question.key(), "1. q1");
    }

    #[test]
    fn exhausted_topic_yields_nothing() {
        let b = bank();
        let candidates = b.candidates("B");
        let mut progress = UserProgress::default();
        progress.mark_answered("B", "1. q1", true);
        progress.mark_answered("B", "2. q2", true);

        let mut rng = StdRng::seed_from_u64(1);
        assert!(pick(&candidates, &progress, &mut rng).is_none());
    }

    #[test]
    fn aggregate_uses_source_topic_state() {
        let b = bank();
        let candidates = b.candidates("ALL");
        let mut progress = UserProgress::default();
        // Same key in both topics; only A's copy is done.
        progress.mark_answered("A", "1. q1", true);

        let (fresh, retry) = partition(&candidates, &progress);
        assert_eq!(fresh.len(), 4);
        assert!(retry.is_empty());
        assert!(fresh
            .iter()
            .any(|c| c.source_topic == "B" && c.question.key() == "1. q1"));
        assert!(!fresh
            .iter()
            .any(|c| c.source_topic == "A" && c.question.key() == "1. q1"));
    }

    #[test]
    fn seeded_selection_covers_the_whole_tier() {
        let b = bank();
        let candidates = b.candidates("ALL");
        let progress = UserProgress::default();
        let mut rng = StdRng::seed_from_u64(42);

        let mut seen: HashMap<(String, String), usize> = HashMap::new();
        for _ in 0..500 {
            let (c, _) = pick(&candidates, &progress, &mut rng).unwrap();
            *seen
                .entry((c.source_topic.to_string(), c.question.key().to_string()))
                .or_default() += 1;
        }
        assert_eq!(seen.len(), 5);
        // Uniform over 5 items: expect ~100 each.
        assert!(seen.values().all(|n| *n > 50), "{seen:?}");
    }
}

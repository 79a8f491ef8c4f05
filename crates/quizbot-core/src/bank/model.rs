use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    pub correct: bool,
}

/// A parsed question. At least one answer is correct once the bank is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Question {
    pub number: Option<u32>,
    pub text: String,
    pub answers: Vec<Answer>,
    key: String,
}

impl Question {
    /// `label` is the number as written in the file (used even when it does not fit `u32`).
    pub fn new(number: Option<u32>, label: &str, text: String, answers: Vec<Answer>) -> Self {
        let key = if label.is_empty() {
            text.clone()
        } else {
            format!("{label}. {text}")
        };
        Self {
            number,
            text,
            answers,
            key,
        }
    }

    /// Display text (`"12. What is ..."`); also the identity used by per-user progress.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn correct_answers(&self) -> impl Iterator<Item = &Answer> {
        self.answers.iter().filter(|a| a.correct)
    }

    pub fn has_correct_answer(&self) -> bool {
        self.answers.iter().any(|a| a.correct)
    }

    pub fn is_multi_select(&self) -> bool {
        self.correct_answers().count() > 1
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Topic {
    pub name: String,
    pub questions: Vec<Question>,
}

/// A question together with the real topic it was parsed under.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'a> {
    pub source_topic: &'a str,
    pub question: &'a Question,
}

#[derive(Clone, Debug, Serialize)]
pub struct TopicSummary {
    pub name: String,
    pub questions: usize,
    pub aggregate: bool,
}

/// Immutable question bank produced by one load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionBank {
    topics: Vec<Topic>,
    all_topics_name: String,
}

impl QuestionBank {
    pub fn new(topics: Vec<Topic>, all_topics_name: impl Into<String>) -> Self {
        Self {
            topics,
            all_topics_name: all_topics_name.into(),
        }
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn all_topics_name(&self) -> &str {
        &self.all_topics_name
    }

    pub fn is_aggregate(&self, topic: &str) -> bool {
        topic == self.all_topics_name
    }

    /// Real topic lookup; the aggregate name never resolves here.
    pub fn topic(&self, name: &str) -> Option<&Topic> {
        if self.is_aggregate(name) {
            return None;
        }
        self.topics.iter().find(|t| t.name == name)
    }

    pub fn has_topic(&self, name: &str) -> bool {
        self.is_aggregate(name) || self.topic(name).is_some()
    }

    /// Real topics in file order, followed by the aggregate topic.
    pub fn list_topics(&self) -> Vec<String> {
        self.topics
            .iter()
            .map(|t| t.name.clone())
            .chain(std::iter::once(self.all_topics_name.clone()))
            .collect()
    }

    pub fn total_questions(&self) -> usize {
        self.topics.iter().map(|t| t.questions.len()).sum()
    }

    pub fn count_questions(&self, topic: &str) -> usize {
        if self.is_aggregate(topic) {
            return self.total_questions();
        }
        self.topic(topic).map(|t| t.questions.len()).unwrap_or(0)
    }

    /// Selection candidates for `topic`; empty for unknown topics.
    pub fn candidates(&self, topic: &str) -> Vec<Candidate<'_>> {
        if self.is_aggregate(topic) {
            return self.topics.iter().flat_map(tagged).collect();
        }
        self.topic(topic)
            .map(|t| tagged(t).collect())
            .unwrap_or_default()
    }

    /// Every real topic containing a question with this key, in file order.
    ///
    /// Numbering restarts per topic, so the same key can live in several topics.
    pub fn source_topics_of(&self, key: &str) -> Vec<&str> {
        self.topics
            .iter()
            .filter(|t| t.questions.iter().any(|q| q.key() == key))
            .map(|t| t.name.as_str())
            .collect()
    }

    pub fn summary(&self) -> Vec<TopicSummary> {
        self.topics
            .iter()
            .map(|t| TopicSummary {
                name: t.name.clone(),
                questions: t.questions.len(),
                aggregate: false,
            })
            .chain(std::iter::once(TopicSummary {
                name: self.all_topics_name.clone(),
                questions: self.total_questions(),
                aggregate: true,
            }))
            .collect()
    }
}

fn tagged(topic: &Topic) -> impl Iterator<Item = Candidate<'_>> {
    topic.questions.iter().map(move |question| Candidate {
        source_topic: topic.name.as_str(),
        question,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: u32, text: &str) -> Question {
        Question::new(
            Some(n),
            &n.to_string(),
            text.to_string(),
            vec![Answer {
                text: "a".to_string(),
                correct: true,
            }],
        )
    }

    fn bank() -> QuestionBank {
        QuestionBank::new(
            vec![
                Topic {
                    name: "T1".to_string(),
                    questions: vec![q(1, "one"), q(2, "two")],
                },
                Topic {
                    name: "T2".to_string(),
                    questions: vec![q(1, "uno")],
                },
            ],
            "ALL",
        )
    }

    #[test]
    fn key_uses_label_and_text() {
        assert_eq!(q(7, "seven").key(), "7. seven");
        let unnumbered = Question::new(None, "", "bare".to_string(), vec![]);
        assert_eq!(unnumbered.key(), "bare");
    }

    #[test]
    fn aggregate_candidates_are_tagged_with_source_topic() {
        let b = bank();
        let c = b.candidates("ALL");
        assert_eq!(c.len(), 3);
        assert_eq!(c[0].source_topic, "T1");
        assert_eq!(c[2].source_topic, "T2");
        assert_eq!(c[2].question.key(), "1. uno");
    }

    #[test]
    fn unknown_topic_has_no_candidates() {
        let b = bank();
        assert!(b.candidates("nope").is_empty());
        assert_eq!(b.count_questions("nope"), 0);
        assert!(!b.has_topic("nope"));
    }

    #[test]
    fn list_topics_appends_aggregate_last() {
        let b = bank();
        assert_eq!(b.list_topics(), vec!["T1", "T2", "ALL"]);
        assert_eq!(b.count_questions("ALL"), 3);
        assert_eq!(b.source_topics_of("1. uno"), vec!["T2"]);
        assert!(b.source_topics_of("9. nine").is_empty());
        assert!(b.summary().last().is_some_and(|s| s.aggregate));
    }

    #[test]
    fn shared_key_resolves_to_every_topic_holding_it() {
        let b = QuestionBank::new(
            vec![
                Topic {
                    name: "A".to_string(),
                    questions: vec![q(1, "same")],
                },
                Topic {
                    name: "B".to_string(),
                    questions: vec![q(1, "same"), q(2, "other")],
                },
            ],
            "ALL",
        );
        assert_eq!(b.source_topics_of("1. same"), vec!["A", "B"]);
        assert_eq!(b.source_topics_of("2. other"), vec!["B"]);
    }
}

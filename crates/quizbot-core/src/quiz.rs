//! Presenting a selected question with numbered choices, and grading a choice.

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use crate::{
    bank::Answer,
    errors::Error,
    selector::SelectedQuestion,
    stats::UserStats,
    Result,
};

/// The question a user is currently looking at, with choices in display order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveQuestion {
    pub topic: String,
    pub source_topic: String,
    pub key: String,
    pub choices: Vec<Answer>,
}

impl ActiveQuestion {
    /// Shuffle the answers so the correct one does not sit in a predictable slot.
    pub fn from_selected<R: Rng + ?Sized>(selected: &SelectedQuestion, rng: &mut R) -> Self {
        let mut choices = selected.question.answers.clone();
        choices.shuffle(rng);
        Self {
            topic: selected.topic.clone(),
            source_topic: selected.source_topic.clone(),
            key: selected.question.key().to_string(),
            choices,
        }
    }

    /// Look up a 1-based choice.
    pub fn choice(&self, choice: usize) -> Result<&Answer> {
        choice
            .checked_sub(1)
            .and_then(|idx| self.choices.get(idx))
            .ok_or(Error::InvalidChoice {
                choice,
                max: self.choices.len(),
            })
    }

    pub fn correct_texts(&self) -> Vec<String> {
        self.choices
            .iter()
            .filter(|a| a.correct)
            .map(|a| a.text.clone())
            .collect()
    }
}

/// What the messaging layer renders for a question.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PresentedQuestion {
    pub topic: String,
    pub source_topic: String,
    pub number: Option<u32>,
    pub text: String,
    /// Display text of the question; pass back to `mark_answered` if grading elsewhere.
    pub key: String,
    /// Choice texts in display order; choice `n` is `choices[n - 1]`.
    pub choices: Vec<String>,
    pub correct_count: usize,
    /// More than one choice is correct; any of them is accepted.
    pub multi_select: bool,
    pub stats: UserStats,
}

impl PresentedQuestion {
    pub fn new(selected: &SelectedQuestion, active: &ActiveQuestion, stats: UserStats) -> Self {
        Self {
            topic: selected.topic.clone(),
            source_topic: selected.source_topic.clone(),
            number: selected.question.number,
            text: selected.question.text.clone(),
            key: active.key.clone(),
            choices: active.choices.iter().map(|a| a.text.clone()).collect(),
            correct_count: active.choices.iter().filter(|a| a.correct).count(),
            multi_select: selected.question.is_multi_select(),
            stats,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum AskOutcome {
    Question(PresentedQuestion),
    TopicComplete { topic: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Grade {
    pub correct: bool,
    pub selected: String,
    pub correct_answers: Vec<String>,
    pub stats: UserStats,
}

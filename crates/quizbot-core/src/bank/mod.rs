//! Question bank: line classification, parsing, and the immutable bank model.

pub mod classify;
pub mod model;
pub mod parser;

pub use classify::{LineClassifier, LineKind};
pub use model::{Answer, Candidate, Question, QuestionBank, Topic, TopicSummary};
pub use parser::{parse_bank, Diagnostic, ParseReport};

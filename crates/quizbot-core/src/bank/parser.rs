//! Question bank parser.
//!
//! A single forward pass: every non-blank line is classified and folded into
//! [`ParserState`]. A pending question is committed whenever a topic or
//! question header arrives, and once more at end of input.

use std::fmt;

use super::{
    classify::{LineClassifier, LineKind},
    model::{Answer, Question, QuestionBank, Topic},
};
use crate::utils::normalize_whitespace;

/// Placeholder prefix for questions whose header carries no text.
const PLACEHOLDER_PREFIX: &str = "Вопрос";

/// A recoverable anomaly found while parsing. Line numbers are 1-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// No answer was marked correct; the first one was promoted.
    ParseDegraded {
        topic: String,
        question: String,
        line: usize,
    },
    /// A question without answers was discarded.
    EmptyQuestion {
        topic: String,
        question: String,
        line: usize,
    },
    /// A question appeared before the first topic header and was discarded.
    QuestionOutsideTopic { question: String, line: usize },
    /// An answer line with no open question was dropped.
    OrphanAnswer { line: usize },
    /// Plain text with nothing to continue was dropped.
    StrayText { line: usize },
}

impl Diagnostic {
    /// Stray text is common (topic descriptions, notes) and only worth a debug line.
    pub fn is_minor(&self) -> bool {
        matches!(self, Diagnostic::StrayText { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ParseDegraded {
                topic,
                question,
                line,
            } => write!(
                f,
                "line {line}: no correct answer for {question:?} in {topic:?}; first answer promoted"
            ),
            Diagnostic::EmptyQuestion {
                topic,
                question,
                line,
            } => write!(
                f,
                "line {line}: question {question:?} in {topic:?} has no answers; discarded"
            ),
            Diagnostic::QuestionOutsideTopic { question, line } => write!(
                f,
                "line {line}: question {question:?} precedes the first topic header; discarded"
            ),
            Diagnostic::OrphanAnswer { line } => {
                write!(f, "line {line}: answer without a question; dropped")
            }
            Diagnostic::StrayText { line } => {
                write!(f, "line {line}: text outside any question; dropped")
            }
        }
    }
}

#[derive(Debug)]
pub struct ParseReport {
    pub bank: QuestionBank,
    pub diagnostics: Vec<Diagnostic>,
}

/// A classified line with its 1-based position.
#[derive(Clone, Copy, Debug)]
pub struct Classified<'a> {
    pub line: usize,
    pub kind: LineKind<'a>,
}

/// Where the next plain-text line goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Cursor {
    #[default]
    Nothing,
    QuestionText,
    Answer,
}

#[derive(Debug)]
struct PendingQuestion {
    topic: Option<usize>,
    number: Option<u32>,
    label: String,
    fragments: Vec<String>,
    answers: Vec<Answer>,
    line: usize,
}

impl PendingQuestion {
    fn text(&self) -> String {
        let text = normalize_whitespace(&self.fragments.join(" "));
        if text.is_empty() {
            format!("{PLACEHOLDER_PREFIX} {}", self.label)
        } else {
            text
        }
    }
}

#[derive(Debug, Default)]
pub struct ParserState {
    topics: Vec<Topic>,
    // Source line of each committed question, parallel to `topics[i].questions`.
    question_lines: Vec<Vec<usize>>,
    current_topic: Option<usize>,
    pending: Option<PendingQuestion>,
    cursor: Cursor,
    diagnostics: Vec<Diagnostic>,
}

impl ParserState {
    pub fn fold(mut self, item: Classified<'_>) -> Self {
        match item.kind {
            LineKind::TopicHeader(name) => {
                self.commit_pending();
                self.current_topic = Some(self.open_topic(name));
                self.cursor = Cursor::Nothing;
            }
            LineKind::QuestionHeader {
                number,
                digits,
                rest,
            } => {
                self.commit_pending();
                let mut fragments = Vec::new();
                if !rest.is_empty() {
                    fragments.push(rest.to_string());
                }
                self.pending = Some(PendingQuestion {
                    topic: self.current_topic,
                    number,
                    label: digits.to_string(),
                    fragments,
                    answers: Vec::new(),
                    line: item.line,
                });
                self.cursor = Cursor::QuestionText;
            }
            LineKind::AnswerLine { correct, text } => match self.pending.as_mut() {
                Some(pending) => {
                    pending.answers.push(Answer {
                        text: text.to_string(),
                        correct,
                    });
                    self.cursor = Cursor::Answer;
                }
                None => {
                    self.diagnostics
                        .push(Diagnostic::OrphanAnswer { line: item.line });
                    self.cursor = Cursor::Nothing;
                }
            },
            LineKind::PlainText(text) => {
                let pending = self.pending.as_mut();
                match (self.cursor, pending) {
                    (Cursor::QuestionText, Some(p)) => p.fragments.push(text.to_string()),
                    (Cursor::Answer, Some(p)) => {
                        if let Some(last) = p.answers.last_mut() {
                            if !last.text.is_empty() {
                                last.text.push(' ');
                            }
                            last.text.push_str(text);
                        }
                    }
                    _ => self
                        .diagnostics
                        .push(Diagnostic::StrayText { line: item.line }),
                }
            }
        }
        self
    }

    /// Flush the pending question and apply the bank-wide repair pass.
    pub fn finish(mut self, all_topics_name: &str) -> ParseReport {
        self.commit_pending();

        for (topic, lines) in self.topics.iter_mut().zip(self.question_lines.iter()) {
            for (question, line) in topic.questions.iter_mut().zip(lines.iter()) {
                if question.has_correct_answer() {
                    continue;
                }
                // Answerless questions never get here (dropped at commit).
                if let Some(first) = question.answers.first_mut() {
                    first.correct = true;
                    self.diagnostics.push(Diagnostic::ParseDegraded {
                        topic: topic.name.clone(),
                        question: question.key().to_string(),
                        line: *line,
                    });
                }
            }
        }

        ParseReport {
            bank: QuestionBank::new(self.topics, all_topics_name),
            diagnostics: self.diagnostics,
        }
    }

    fn open_topic(&mut self, name: &str) -> usize {
        if let Some(idx) = self.topics.iter().position(|t| t.name == name) {
            return idx;
        }
        self.topics.push(Topic {
            name: name.to_string(),
            questions: Vec::new(),
        });
        self.question_lines.push(Vec::new());
        self.topics.len() - 1
    }

    fn commit_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.cursor = Cursor::Nothing;

        let text = pending.text();
        let question = Question::new(
            pending.number,
            &pending.label,
            text,
            pending
                .answers
                .into_iter()
                .map(|a| Answer {
                    text: normalize_whitespace(&a.text),
                    correct: a.correct,
                })
                .collect(),
        );

        let Some(topic_idx) = pending.topic else {
            self.diagnostics.push(Diagnostic::QuestionOutsideTopic {
                question: question.key().to_string(),
                line: pending.line,
            });
            return;
        };

        if question.answers.is_empty() {
            self.diagnostics.push(Diagnostic::EmptyQuestion {
                topic: self.topics[topic_idx].name.clone(),
                question: question.key().to_string(),
                line: pending.line,
            });
            return;
        }

        self.topics[topic_idx].questions.push(question);
        self.question_lines[topic_idx].push(pending.line);
    }
}

/// Parse a whole bank text.
pub fn parse_bank(text: &str, classifier: &LineClassifier, all_topics_name: &str) -> ParseReport {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    text.lines()
        .enumerate()
        .map(|(idx, raw)| (idx + 1, raw.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(line, trimmed)| Classified {
            line,
            kind: classifier.classify(trimmed),
        })
        .fold(ParserState::default(), ParserState::fold)
        .finish(all_topics_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &str = "ALL";

    fn parse(text: &str) -> ParseReport {
        parse_bank(text, &LineClassifier::new("МДК"), ALL)
    }

    const SAMPLE: &str = "\
МДК 01 Сети
1. Что такое IP?
+ Протокол
- Напиток
2. Что такое TCP?
+ Транспорт
- Фрукт
3. Что такое DNS?
- Город
+ Имена

МДК 02 Базы
1. Что такое SQL?
+ Язык запросов
- Зверь
2. Что такое индекс?
- Цена
+ Структура
3. Что такое JOIN?
+ Соединение
- Разделение
";

    #[test]
    fn sample_round_trips_structure() {
        let report = parse(SAMPLE);
        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
        let bank = report.bank;
        assert_eq!(
            bank.list_topics(),
            vec!["МДК 01 Сети", "МДК 02 Базы", ALL]
        );
        assert_eq!(bank.count_questions("МДК 01 Сети"), 3);
        assert_eq!(bank.count_questions("МДК 02 Базы"), 3);
        assert_eq!(bank.count_questions(ALL), 6);

        let q = &bank.topics()[0].questions[2];
        assert_eq!(q.number, Some(3));
        assert_eq!(q.key(), "3. Что такое DNS?");
        assert_eq!(q.answers.len(), 2);
        assert!(!q.answers[0].correct);
        assert!(q.answers[1].correct);
    }

    #[test]
    fn multi_line_question_and_answer_are_space_joined() {
        let report = parse(
            "МДК 1\n1.\nПервая   строка\nвторая строка\n+ ответ\n  продолжение\n- нет\n",
        );
        let q = &report.bank.topics()[0].questions[0];
        assert_eq!(q.text, "Первая строка вторая строка");
        assert_eq!(q.answers[0].text, "ответ продолжение");
        assert_eq!(q.answers[1].text, "нет");
    }

    #[test]
    fn same_line_text_is_taken_verbatim() {
        let report = parse("МДК 1\n7. Вопрос на той же строке\n+ да\n");
        let q = &report.bank.topics()[0].questions[0];
        assert_eq!(q.number, Some(7));
        assert_eq!(q.text, "Вопрос на той же строке");
    }

    #[test]
    fn missing_question_text_gets_placeholder() {
        let report = parse("МДК 1\n4.\n+ да\n");
        let q = &report.bank.topics()[0].questions[0];
        assert_eq!(q.text, "Вопрос 4");
        assert_eq!(q.key(), "4. Вопрос 4");
    }

    #[test]
    fn question_without_correct_answer_promotes_first() {
        let report = parse("МДК 1\n1. Q\n- a\n- b\n");
        let q = &report.bank.topics()[0].questions[0];
        assert!(q.answers[0].correct);
        assert!(!q.answers[1].correct);
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::ParseDegraded {
                topic: "МДК 1".to_string(),
                question: "1. Q".to_string(),
                line: 2,
            }]
        );
    }

    #[test]
    fn question_without_answers_is_discarded() {
        let report = parse("МДК 1\n1. Empty\n2. Full\n+ yes\n");
        let topic = &report.bank.topics()[0];
        assert_eq!(topic.questions.len(), 1);
        assert_eq!(topic.questions[0].key(), "2. Full");
        assert!(matches!(
            report.diagnostics.as_slice(),
            [Diagnostic::EmptyQuestion { line: 2, .. }]
        ));
    }

    #[test]
    fn repeated_topic_header_reuses_topic() {
        let report = parse("МДК A\n1. x\n+ y\nМДК B\n1. z\n+ w\nМДК A\n2. u\n+ v\n");
        let bank = report.bank;
        assert_eq!(bank.list_topics(), vec!["МДК A", "МДК B", ALL]);
        assert_eq!(bank.count_questions("МДК A"), 2);
        assert_eq!(bank.count_questions("МДК B"), 1);
    }

    #[test]
    fn last_question_is_committed_once() {
        let report = parse("МДК 1\n1. only\n+ a\n- b");
        assert_eq!(report.bank.count_questions("МДК 1"), 1);
        assert_eq!(report.bank.total_questions(), 1);
    }

    #[test]
    fn questions_before_first_topic_and_orphan_answers_are_reported() {
        let report = parse("+ orphan\n1. early\n+ a\nМДК 1\nnote\n1. ok\n+ b\n");
        assert_eq!(report.bank.total_questions(), 1);
        assert_eq!(
            report.diagnostics,
            vec![
                Diagnostic::OrphanAnswer { line: 1 },
                Diagnostic::QuestionOutsideTopic {
                    question: "1. early".to_string(),
                    line: 2,
                },
                Diagnostic::StrayText { line: 5 },
            ]
        );
    }

    #[test]
    fn crlf_and_bom_are_tolerated() {
        let report = parse("\u{feff}МДК 1\r\n1. Q\r\n+ a\r\n");
        assert_eq!(report.bank.list_topics(), vec!["МДК 1", ALL]);
        assert_eq!(report.bank.topics()[0].questions[0].answers[0].text, "a");
    }

    #[test]
    fn parsing_is_deterministic() {
        assert_eq!(parse(SAMPLE).bank, parse(SAMPLE).bank);
    }
}

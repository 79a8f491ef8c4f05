use std::sync::OnceLock;

use regex::Regex;

/// What a single trimmed, non-empty bank line means.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Starts a topic. The name is the whole line, marker included.
    TopicHeader(&'a str),
    /// `12. text`. `digits` is kept verbatim so oversized numbers still get a stable label.
    QuestionHeader {
        number: Option<u32>,
        digits: &'a str,
        rest: &'a str,
    },
    /// `+ text` (correct) or `- text` (incorrect).
    AnswerLine { correct: bool, text: &'a str },
    /// Anything else: continues the question text or the latest answer.
    PlainText(&'a str),
}

fn question_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\.").expect("valid regex"))
}

#[derive(Clone, Debug)]
pub struct LineClassifier {
    topic_marker: String,
}

impl LineClassifier {
    pub fn new(topic_marker: impl Into<String>) -> Self {
        Self {
            topic_marker: topic_marker.into(),
        }
    }

    /// Classify a trimmed, non-empty line. Blank lines are the caller's business.
    pub fn classify<'a>(&self, line: &'a str) -> LineKind<'a> {
        if !self.topic_marker.is_empty() && line.starts_with(self.topic_marker.as_str()) {
            return LineKind::TopicHeader(line);
        }

        if let Some(caps) = question_header_re().captures(line) {
            let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
                return LineKind::PlainText(line);
            };
            return LineKind::QuestionHeader {
                number: digits.as_str().parse::<u32>().ok(),
                digits: digits.as_str(),
                rest: line[whole.end()..].trim(),
            };
        }

        if let Some(text) = line.strip_prefix('+') {
            return LineKind::AnswerLine {
                correct: true,
                text: strip_one_space(text),
            };
        }
        if let Some(text) = line.strip_prefix('-') {
            return LineKind::AnswerLine {
                correct: false,
                text: strip_one_space(text),
            };
        }

        LineKind::PlainText(line)
    }
}

fn strip_one_space(s: &str) -> &str {
    s.strip_prefix(' ').unwrap_or(s)
}

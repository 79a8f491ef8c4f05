//! Line-oriented driver for the quiz core (stdin/stdout).
//!
//! Each command names the user it acts for, so several users can be simulated
//! from one terminal: `topic 1 2`, `ask 1`, `answer 1 3`, ...

use std::{collections::HashMap, fmt::Write as _, sync::Arc};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use quizbot_core::{
    domain::UserId,
    quiz::{AskOutcome, Grade, PresentedQuestion},
    stats::{Rating, UserStats},
    Error, QuizStore,
};

const HELP: &str = "\
Commands:
  topics [--json]          list topics
  topic <user> <n|name>    choose a topic for a user
  ask <user>               next question for the user's topic
  answer <user> <n>        answer the active question with choice n
  stats <user>             show session statistics
  restart <user>           retry the topic from scratch (keeps mastered questions)
  reset <user>             forget all progress and statistics
  end <user>               end the session and show final statistics
  reload                   reload the question bank file
  help                     this text
  quit                     exit";

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Reply(String),
    Quit,
}

pub struct Console {
    store: Arc<QuizStore>,
    topics: HashMap<UserId, String>,
}

impl Console {
    pub fn new(store: Arc<QuizStore>) -> Self {
        Self {
            store,
            topics: HashMap::new(),
        }
    }

    pub fn handle_line(&mut self, line: &str) -> Flow {
        let (cmd, args) = parse_command(line);
        debug!(cmd = %cmd, args = ?args, "console command");

        let reply = match cmd.as_str() {
            "" => return Flow::Reply(String::new()),
            "quit" | "exit" => return Flow::Quit,
            "help" | "start" => HELP.to_string(),
            "topics" => self.topics_cmd(args.first().copied() == Some("--json")),
            "reload" => self.reload_cmd(),
            "topic" => match parse_user(&args) {
                Some(user) if args.len() >= 2 => self.topic_cmd(user, &args[1..].join(" ")),
                _ => "usage: topic <user> <n|name>".to_string(),
            },
            "ask" => self.with_user_arg(&args, "ask <user>", Self::ask_cmd),
            "answer" => match (parse_user(&args), args.get(1).and_then(|s| s.parse().ok())) {
                (Some(user), Some(choice)) => self.answer_cmd(user, choice),
                _ => "usage: answer <user> <n>".to_string(),
            },
            "stats" => self.with_user_arg(&args, "stats <user>", Self::stats_cmd),
            "restart" => self.with_user_arg(&args, "restart <user>", Self::restart_cmd),
            "reset" => self.with_user_arg(&args, "reset <user>", Self::reset_cmd),
            "end" | "stop" => self.with_user_arg(&args, "end <user>", Self::end_cmd),
            other => format!("unknown command: {other} (try `help`)"),
        };
        Flow::Reply(reply)
    }

    fn with_user_arg(
        &mut self,
        args: &[&str],
        usage: &str,
        f: impl FnOnce(&mut Self, UserId) -> String,
    ) -> String {
        match parse_user(args) {
            Some(user) => f(self, user),
            None => format!("usage: {usage}"),
        }
    }

    fn topics_cmd(&self, json: bool) -> String {
        let Some(bank) = self.store.bank() else {
            return not_loaded();
        };
        if json {
            return serde_json::to_string_pretty(&bank.summary())
                .unwrap_or_else(|e| format!("failed to encode topics: {e}"));
        }

        let mut out = String::from("Topics:\n");
        for (i, t) in bank.summary().iter().enumerate() {
            let _ = writeln!(out, "{}. {} ({} questions)", i + 1, t.name, t.questions);
        }
        out.push_str("\nChoose one with `topic <user> <n>`.");
        out
    }

    fn reload_cmd(&self) -> String {
        if self.store.load_from_source() {
            format!(
                "Question bank reloaded: {} topics.",
                self.store.list_topics().len().saturating_sub(1)
            )
        } else {
            format!(
                "Failed to load {}; keeping the current bank.",
                self.store.source().describe()
            )
        }
    }

    fn topic_cmd(&mut self, user: UserId, which: &str) -> String {
        let topics = self.store.list_topics();
        if topics.is_empty() {
            return not_loaded();
        }

        let chosen = match which.parse::<usize>() {
            Ok(n) => n.checked_sub(1).and_then(|i| topics.get(i)).cloned(),
            Err(_) => topics.iter().find(|t| t.as_str() == which).cloned(),
        };
        let Some(topic) = chosen else {
            return format!("No such topic: {which}");
        };

        let count = self.store.count_questions(&topic);
        if count == 0 {
            return format!("Topic {topic} has no questions.");
        }

        let mut out = format!("Topic: {topic}\nQuestions: {count}");
        let stats = self.store.stats(user);
        if let Some(line) = stats_line(&stats) {
            let _ = write!(out, "\nYour stats: {line}");
        }
        out.push_str("\n\nUse `ask <user>` to get a question.");
        self.topics.insert(user, topic);
        out
    }

    fn ask_cmd(&mut self, user: UserId) -> String {
        let Some(topic) = self.topics.get(&user).cloned() else {
            return "Choose a topic first: `topic <user> <n>`.".to_string();
        };
        match self.store.ask(user, &topic) {
            Ok(AskOutcome::Question(q)) => render_question(&q),
            Ok(AskOutcome::TopicComplete { topic }) => format!(
                "Topic {topic} complete: every question answered correctly.\n\
                 Use `restart <user>` to retry or `reset <user>` to start over."
            ),
            Err(e) => render_error(&e),
        }
    }

    fn answer_cmd(&mut self, user: UserId, choice: usize) -> String {
        match self.store.answer(user, choice) {
            Ok(grade) => render_grade(&grade),
            Err(e) => render_error(&e),
        }
    }

    fn stats_cmd(&mut self, user: UserId) -> String {
        let mut out = render_stats("Your statistics", &self.store.stats(user));
        let Some(topic) = self.topics.get(&user) else {
            return out;
        };
        if let Some(st) = self.store.standing(user, topic) {
            let _ = write!(
                out,
                "\n\n{topic}: {}/{} mastered, {} waiting for retry, {} left",
                st.mastered,
                st.total,
                st.pending_retries,
                st.remaining()
            );
        }
        out
    }

    fn restart_cmd(&mut self, user: UserId) -> String {
        let Some(topic) = self.topics.get(&user) else {
            return "Choose a topic first: `topic <user> <n>`.".to_string();
        };
        self.store.restart_topic(user, topic);
        format!("Topic {topic} restarted.")
    }

    fn reset_cmd(&mut self, user: UserId) -> String {
        self.store.reset_lifetime(user);
        "All progress and statistics cleared.".to_string()
    }

    fn end_cmd(&mut self, user: UserId) -> String {
        self.topics.remove(&user);
        match self.store.end_session(user) {
            Some(stats) if stats.total_answered > 0 => {
                format!("Session ended.\n\n{}", render_stats("Final statistics", &stats))
            }
            _ => "Session ended.".to_string(),
        }
    }
}

pub async fn run(mut console: Console) -> anyhow::Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match console.handle_line(&line) {
            Flow::Quit => break,
            Flow::Reply(text) if text.is_empty() => {}
            Flow::Reply(text) => println!("{text}\n"),
        }
    }
    Ok(())
}

fn parse_command(text: &str) -> (String, Vec<&str>) {
    let mut parts = text.split_whitespace();
    let cmd = parts
        .next()
        .unwrap_or("")
        .trim_start_matches('/')
        .to_lowercase();
    (cmd, parts.collect())
}

fn parse_user(args: &[&str]) -> Option<UserId> {
    args.first()?.parse::<i64>().ok().map(UserId)
}

fn not_loaded() -> String {
    "Questions are not loaded yet. Put the bank file in place and run `reload`.".to_string()
}

fn render_question(q: &PresentedQuestion) -> String {
    let mut out = format!("Topic: {}\n", q.topic);
    if q.source_topic != q.topic {
        let _ = writeln!(out, "From: {}", q.source_topic);
    }
    if let Some(line) = stats_line(&q.stats) {
        let _ = writeln!(out, "Stats: {line}");
    }
    let _ = writeln!(out, "\n{}\n", q.key);
    for (i, choice) in q.choices.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, choice);
    }
    if q.multi_select {
        let _ = write!(out, "\n({} answers are correct; pick one)", q.correct_count);
    } else {
        out.push_str("\nAnswer with `answer <user> <n>`.");
    }
    out
}

fn render_grade(g: &Grade) -> String {
    let mut out = if g.correct {
        "Correct!\n\n".to_string()
    } else {
        format!("Wrong. You chose: {}\n\n", g.selected)
    };
    match g.correct_answers.as_slice() {
        [one] => {
            let _ = write!(out, "Correct answer: {one}");
        }
        many => {
            out.push_str("Correct answers:");
            for (i, a) in many.iter().enumerate() {
                let _ = write!(out, "\n{}. {}", i + 1, a);
            }
        }
    }
    if let Some(line) = stats_line(&g.stats) {
        let _ = write!(out, "\n\nStats: {line}");
    }
    out
}

fn render_stats(title: &str, s: &UserStats) -> String {
    let Some(accuracy) = s.accuracy() else {
        return "No questions answered yet.".to_string();
    };
    let verdict = match s.rating() {
        Some(Rating::Excellent) => "Excellent result!",
        Some(Rating::Good) => "Good result!",
        _ => "Keep practicing!",
    };
    format!(
        "{title}\n\nAnswered: {}\nCorrect: {}\nWrong: {}\nAccuracy: {accuracy:.1}%\n\n{verdict}",
        s.total_answered, s.correct, s.incorrect
    )
}

fn stats_line(s: &UserStats) -> Option<String> {
    let accuracy = s.accuracy()?;
    Some(format!(
        "{}/{} ({accuracy:.1}%)",
        s.correct, s.total_answered
    ))
}

fn render_error(e: &Error) -> String {
    match e {
        Error::NotLoaded => not_loaded(),
        Error::NoActiveQuestion => "No active question. Use `ask <user>` first.".to_string(),
        Error::InvalidChoice { max, .. } => format!("Pick a number from 1 to {max}."),
        Error::UnknownTopic(t) => {
            format!("Topic {t} is no longer in the bank; choose another with `topic`.")
        }
        other => format!("Error: {other}"),
    }
}

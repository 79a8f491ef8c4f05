//! Core of the quiz bot: question-bank parsing and per-user question selection.
//!
//! This crate is framework-agnostic. The messaging layer talks to [`store::QuizStore`];
//! the bank text and the long-term progress record come in through [`ports`].

pub mod bank;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod progress;
pub mod quiz;
pub mod reaper;
pub mod selector;
pub mod stats;
pub mod store;
pub mod utils;
pub mod watcher;

pub use errors::{Error, Result};
pub use store::QuizStore;

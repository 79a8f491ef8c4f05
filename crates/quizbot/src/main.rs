mod console;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use quizbot_core::{config::Config, reaper, watcher, QuizStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    quizbot_core::logging::init("quizbot")?;

    let cfg = Config::load()?;
    let store = Arc::new(QuizStore::from_config(&cfg));

    if store.load_from_source() {
        info!(topics = store.list_topics().len().saturating_sub(1), "question bank ready");
    } else if cfg.watch_enabled {
        warn!(file = %cfg.bank_file.display(), "question bank not loaded; waiting for the file");
    } else {
        warn!(file = %cfg.bank_file.display(), "question bank not loaded; use `reload` once the file exists");
    }

    let cancel = CancellationToken::new();
    let mut tasks = vec![reaper::spawn(
        store.clone(),
        cfg.session_ttl,
        cfg.cleanup_interval,
        cancel.clone(),
    )];
    if cfg.watch_enabled {
        tasks.push(watcher::spawn(store.clone(), cfg.watch_interval, cancel.clone()));
    }

    let result = console::run(console::Console::new(store)).await;

    cancel.cancel();
    for task in tasks {
        let _ = task.await;
    }
    info!("quiz bot stopped");
    result
}

use std::path::PathBuf;

use serde_json::json;

use adpush_store::{AlertHistoryRepository, FileStore};

use super::CommandResult;

#[derive(Debug, Clone)]
pub struct AlertsArgs {
    pub store_dir: PathBuf,
    pub limit: Option<usize>,
}

/// Prints the bounded automation alert history, most recent first.
pub fn run(args: AlertsArgs) -> CommandResult {
    let store = FileStore::new(&args.store_dir);
    let mut history = match AlertHistoryRepository::new(&store).history() {
        Ok(history) => history,
        Err(error) => return CommandResult::failure("alerts", "history_load", error.to_string(), 2),
    };
    if let Some(limit) = args.limit {
        history.truncate(limit);
    }

    let alerts = match serde_json::to_value(&history) {
        Ok(value) => value,
        Err(error) => {
            return CommandResult::failure("alerts", "history_encode", error.to_string(), 3)
        }
    };

    CommandResult::success(json!({
        "command": "alerts",
        "status": "ok",
        "count": history.len(),
        "alerts": alerts,
    }))
}

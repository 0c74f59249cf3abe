//! Fetch notifications rendered on the terminal

use std::sync::Arc;

use acorn_registry::FetchObserver;

use super::OutputHandler;

/// Shows "operation started" as a step and logged messages as warnings
#[derive(Debug, Clone)]
pub struct ConsoleObserver {
    output: Arc<OutputHandler>,
}

impl ConsoleObserver {
    pub fn new(output: Arc<OutputHandler>) -> Self {
        Self { output }
    }
}

impl FetchObserver for ConsoleObserver {
    fn operation_started(&self, operation: &str) {
        self.output
            .step("↓", &format!("Fetching {}", self.output.colors().bold(operation)));
    }

    fn message_logged(&self, message: &str) {
        self.output.warn(message);
    }
}

//! Line-based console shared by the prompt loop and confirmations.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::Mutex;

use webpilot_agent::ConfirmationHandler;

type LineSource = Lines<Box<dyn AsyncBufRead + Unpin + Send>>;

/// Reads answers one line at a time. `None` means the input is closed.
pub(crate) struct Console {
    lines: Mutex<LineSource>,
}

impl Console {
    pub fn stdin() -> Self {
        Self::from_reader(Box::new(BufReader::new(tokio::io::stdin())))
    }

    pub fn from_reader(reader: Box<dyn AsyncBufRead + Unpin + Send>) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
        }
    }

    /// Print `label` without a newline and read the reply, trimmed.
    pub async fn prompt(&self, label: &str) -> Option<String> {
        print!("{}", label);
        let _ = std::io::stdout().flush();
        let line = self.lines.lock().await.next_line().await.ok().flatten()?;
        Some(line.trim().to_string())
    }
}

/// `Some(true)` for yes, `Some(false)` for no, `None` when unrecognised.
pub(crate) fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "yes" | "y" | "да" | "д" => Some(true),
        "no" | "n" | "нет" | "н" => Some(false),
        _ => None,
    }
}

/// Asks on the console before a gated action runs.
pub(crate) struct ConsoleConfirmation {
    console: Arc<Console>,
}

impl ConsoleConfirmation {
    pub fn new(console: Arc<Console>) -> Self {
        Self { console }
    }
}

#[async_trait]
impl ConfirmationHandler for ConsoleConfirmation {
    async fn confirm(&self, request: &str) -> bool {
        println!("\n{}\n{}\n{}", "=".repeat(60), request, "=".repeat(60));
        loop {
            let Some(answer) = self.console.prompt("Proceed? (yes/no): ").await else {
                return false;
            };
            match parse_answer(&answer) {
                Some(decision) => return decision,
                None => println!("Please answer 'yes' or 'no'."),
            }
        }
    }
}

//! Task runner and the interactive prompt.

use std::sync::Arc;

use tracing::{info, warn};

use webpilot_agent::{AgentStatus, ExecutionResult, Orchestrator};
use webpilot_protocols::BrowserDriver;

use crate::console::Console;

const HELP: &str = "\
Commands:
  <task>      run a task, e.g. \"find a laptop under $500\"
  url         show the current page URL
  go <url>    open a URL
  help        show this help
  quit        exit (also: exit, q)";

/// One line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReplCommand {
    Empty,
    Quit,
    Help,
    Url,
    Go(String),
    Task(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => return Self::Empty,
            "quit" | "exit" | "q" => return Self::Quit,
            "help" => return Self::Help,
            "url" => return Self::Url,
            _ => {}
        }
        match line.split_once(char::is_whitespace) {
            Some((head, rest)) if head.eq_ignore_ascii_case("go") && !rest.trim().is_empty() => {
                Self::Go(normalize_url(rest.trim()))
            }
            _ => Self::Task(line.to_string()),
        }
    }
}

/// Prefix `https://` when the address has no scheme.
pub(crate) fn normalize_url(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Text of the follow-up run after the user answered a question.
pub(crate) fn follow_up_task(task: &str, response: &str) -> String {
    format!("{}\n\nUser provided: {}", task, response)
}

/// Owns the loop and browser for one process.
pub(crate) struct Session {
    orchestrator: Orchestrator,
    driver: Arc<dyn BrowserDriver>,
    console: Arc<Console>,
}

impl Session {
    pub fn new(orchestrator: Orchestrator, driver: Arc<dyn BrowserDriver>, console: Arc<Console>) -> Self {
        Self {
            orchestrator,
            driver,
            console,
        }
    }

    /// Run `task`, asking the user whenever the model needs input.
    pub async fn run_task(&mut self, task: &str) -> ExecutionResult {
        let mut task = task.to_string();
        loop {
            let result = self.execute_interruptible(&task).await;
            print_result(&result);
            if result.status != AgentStatus::NeedUserInput {
                return result;
            }
            let Some(response) = self.console.prompt("Your response: ").await else {
                return result;
            };
            if response.is_empty() {
                return result;
            }
            task = follow_up_task(&task, &response);
        }
    }

    /// Ctrl-C stops the running task at its next iteration.
    async fn execute_interruptible(&mut self, task: &str) -> ExecutionResult {
        let signal = self.orchestrator.abort_signal();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Stop requested, finishing the current step");
                signal.abort();
            }
        });
        let result = self.orchestrator.execute_task(task).await;
        watcher.abort();
        result
    }

    /// Interactive prompt until `quit` or end of input.
    pub async fn repl(&mut self) {
        println!("webpilot ready. Type a task, or 'help'.");
        loop {
            let Some(line) = self.console.prompt("\n> ").await else {
                break;
            };
            match ReplCommand::parse(&line) {
                ReplCommand::Empty => {}
                ReplCommand::Quit => break,
                ReplCommand::Help => println!("{}", HELP),
                ReplCommand::Url => match self.driver.current_url().await {
                    Ok(url) => println!("{}", url),
                    Err(e) => println!("Could not read URL: {}", e),
                },
                ReplCommand::Go(url) => match self.driver.navigate(&url).await {
                    Ok(()) => println!("Opened {}", url),
                    Err(e) => println!("Navigation failed: {}", e),
                },
                ReplCommand::Task(task) => {
                    self.run_task(&task).await;
                }
            }
        }
        info!("Leaving interactive prompt");
    }
}

fn print_result(result: &ExecutionResult) {
    println!("\n{}", "=".repeat(60));
    println!("Status: {}", result.status);
    println!("Summary: {}", result.summary);
    println!("Steps: {}", result.steps_taken);
    if !result.final_url.is_empty() {
        println!("URL: {}", result.final_url);
    }
    println!("{}", "=".repeat(60));
}

use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::Result;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::assistant::Response;
use crate::config::UIConfig;
use crate::intent::Intent;

const WELCOME_BANNER: &str = r#"
╔══════════════════════════════════════════════╗
║       Welcome to the AI Assistant!           ║
╠══════════════════════════════════════════════╣
║ You can ask questions, perform calculations, ║
║ convert currencies, or check the weather.    ║
║                                              ║
║ Examples:                                    ║
║ • Who was Albert Einstein?                   ║
║ • What is 128 * 46?                          ║
║ • Weather in New York                        ║
║ • Convert 100 USD to BRL                     ║
╠══════════════════════════════════════════════╣
║ Type 'exit', 'quit', or 'sair' to leave.     ║
╚══════════════════════════════════════════════╝
"#;

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "sair"];

/// What the read loop should do with a line of input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Question(String),
    Skip,
    Exit,
}

/// Classify a raw input line.
pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Input::Skip
    } else if EXIT_WORDS.contains(&trimmed.to_lowercase().as_str()) {
        Input::Exit
    } else {
        Input::Question(trimmed.to_string())
    }
}

/// Render the framed answer block.
pub fn format_response(source: &str, content: &str, elapsed: Duration) -> String {
    let rule = "-".repeat(36);
    format!(
        "\n{rule}\n\nAssistant Response\n\nSource: {source}\n\n{content}\n\n(response time: {} ms)\n\n{rule}\n",
        elapsed.as_millis()
    )
}

/// Terminal presentation for the interactive assistant.
pub struct UIHandler {
    config: UIConfig,
}

impl UIHandler {
    pub fn new(config: UIConfig) -> Self {
        if !config.colorful {
            colored::control::set_override(false);
        }
        Self { config }
    }

    pub fn welcome(&self) {
        println!("{}", WELCOME_BANNER.bright_blue());
    }

    /// Prompt for the next line. `None` on end of input.
    pub fn read_line(&self) -> Result<Option<String>> {
        print!("{} ", "You:".bright_white().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            println!();
            return Ok(None);
        }
        Ok(Some(line))
    }

    pub fn status(&self, intent: Intent) {
        let message = match intent {
            Intent::Math => &self.config.math_message,
            Intent::Weather => &self.config.weather_message,
            Intent::Currency => &self.config.currency_message,
            Intent::General => &self.config.llm_message,
        };
        println!("{}", message.cyan());
    }

    /// Spinner shown while a network-backed handler runs.
    pub fn spinner(&self, intent: Intent) -> Option<ProgressBar> {
        if !self.config.colorful || intent == Intent::Math {
            return None;
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Working...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        Some(spinner)
    }

    pub fn show(&self, response: &Response) {
        let content = if response.ok {
            response.content.normal()
        } else {
            response.content.bright_red()
        };
        println!(
            "{}",
            format_response(response.source(), &content.to_string(), response.elapsed)
        );
    }

    pub fn goodbye(&self) {
        println!("{}", "Exiting.".bright_white());
    }
}

use anyhow::Result;
use clap::Parser;
use log::info;

mod assistant;
mod calculator;
mod config;
mod intent;
mod llm_manager;
mod logger;
mod providers;
mod services;
mod ui;

use assistant::Assistant;
use config::Config;
use ui::{Input, UIHandler};

#[derive(Parser)]
#[command(name = "quick_assist")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
    /// Disable colors and spinners
    #[arg(long)]
    plain: bool,
    /// Ask a single question and exit
    #[arg(trailing_var_arg = true)]
    question: Vec<String>,
}

async fn answer(assistant: &Assistant, ui: &UIHandler, question: &str) {
    let intent = assistant.classify(question);
    ui.status(intent);
    let spinner = ui.spinner(intent);
    let response = assistant.respond(intent, question).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    ui.show(&response);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.verbose);
    dotenv::dotenv().ok();

    let mut config = Config::load(&args.config)?;
    config.apply_env();
    config.merge_with_args(args.plain);

    let ui = UIHandler::new(config.ui.clone());
    let assistant = Assistant::new(&config)?;

    if !args.question.is_empty() {
        if let Input::Question(question) = ui::parse_input(&args.question.join(" ")) {
            answer(&assistant, &ui, &question).await;
        }
        return Ok(());
    }

    ui.welcome();
    while let Some(line) = ui.read_line()? {
        match ui::parse_input(&line) {
            Input::Skip => continue,
            Input::Exit => break,
            Input::Question(question) => answer(&assistant, &ui, &question).await,
        }
    }
    info!("Session ended");
    ui.goodbye();
    Ok(())
}

//! Design Wizard terminal front end
//!
//! Drives one wizard session from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Against a local Design Service
//! wizard_cli --service-url http://localhost:8000
//!
//! # With a config file and debug logging
//! RUST_LOG=design_wizard=debug wizard_cli --config config/wizard.yaml
//! ```
//!
//! At the prompt, type an option number, or one of:
//! `date YYYY-MM-DD`, `n <number>`, `view <base> <variation>`,
//! `edit <instructions>`, `publish`, `publish-all`, `refresh`, `quit`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use design_wizard::conversation::{HistoryContent, Speaker};
use design_wizard::script::RenderedMessage;
use design_wizard::{
    ActionOutcome, CatalogService, DesignService, HttpDesignService, SessionView, StepOutcome,
    WizardConfig, WizardError, WizardSession,
};

#[derive(Parser)]
#[command(name = "wizard_cli")]
#[command(version = "0.1.0")]
#[command(about = "Interactive catalog design wizard")]
#[command(long_about = None)]
struct Cli {
    /// YAML configuration file (defaults to $WIZARD_CONFIG or config/wizard.yaml)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Design Service base URL, overrides the configuration
    #[arg(long, env = "DESIGN_SERVICE_URL")]
    service_url: Option<String>,
}

#[derive(Debug, PartialEq)]
enum Command {
    Option(usize),
    Date(NaiveDate),
    Number(u32),
    View(u32, u32),
    Edit(String),
    Publish,
    PublishAll,
    Refresh,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match head {
        "quit" | "exit" => Ok(Command::Quit),
        "publish" => Ok(Command::Publish),
        "publish-all" => Ok(Command::PublishAll),
        "refresh" => Ok(Command::Refresh),
        "date" => NaiveDate::parse_from_str(rest, "%Y-%m-%d")
            .map(Command::Date)
            .map_err(|_| format!("'{}' is not a YYYY-MM-DD date", rest)),
        "n" => rest
            .parse()
            .map(Command::Number)
            .map_err(|_| format!("'{}' is not a number", rest)),
        "edit" if !rest.is_empty() => Ok(Command::Edit(rest.to_string())),
        "edit" => Err("usage: edit <instructions>".into()),
        "view" => {
            let mut parts = rest.split_whitespace().map(str::parse::<u32>);
            match (parts.next(), parts.next()) {
                (Some(Ok(base)), Some(Ok(variation))) => Ok(Command::View(base, variation)),
                _ => Err("usage: view <base> <variation>".into()),
            }
        }
        number => number
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(Command::Option)
            .ok_or_else(|| format!("unknown command '{}'", line)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = WizardConfig::load(path)?;
            config.apply_overrides(|key| std::env::var(key).ok())?;
            config
        }
        None => WizardConfig::from_env()?,
    };
    if let Some(url) = cli.service_url {
        config.service.base_url = url;
        config.validate()?;
    }

    let service: Arc<dyn DesignService> = Arc::new(HttpDesignService::new(&config.service)?);
    let catalog = Arc::new(CatalogService::new(service.clone(), config.script.clone())?);
    if let Err(e) = catalog.load().await {
        eprintln!("{}: catalog unavailable ({})", "warning".yellow().bold(), e);
    }

    let session = WizardSession::new(catalog, service, &config).await;
    let mut editor = DefaultEditor::new().context("failed to start line editor")?;
    let mut printed = 0;

    loop {
        let view = session.view().await?;
        printed = render(&view, printed);

        let line = match editor.readline(&format!("{} ", ">".cyan().bold())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line.as_str());

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}: {}", "error".red().bold(), message);
                continue;
            }
        };

        let result = match command {
            Command::Quit => break,
            Command::Option(n) => match view.node.options.get(n - 1) {
                Some(option) => session.choose_option(&view.node.node_id, &option.text).await,
                None => {
                    eprintln!("{}: no option {}", "error".red().bold(), n);
                    continue;
                }
            },
            Command::Date(date) => session.submit_date(date).await,
            Command::Number(n) => session.submit_number(n).await,
            Command::Edit(instructions) => session.request_edit(&instructions).await,
            Command::Publish => session.request_publish().await,
            Command::PublishAll => session.request_publish_all().await,
            Command::View(base, variation) => match session.view_artifact(base, variation).await {
                Ok(viewed) => {
                    println!("  {} {}", "viewing".green(), viewed.url);
                    continue;
                }
                Err(e) => Err(e),
            },
            Command::Refresh => match session.refresh_catalog().await {
                Ok(reset) => {
                    println!("{} catalog reloaded", "OK".green());
                    if reset {
                        printed = 0;
                    }
                    continue;
                }
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(outcome) => {
                if matches!(outcome, StepOutcome::Reset) {
                    printed = 0;
                }
                report(&outcome);
            }
            Err(e) => report_error(&e),
        }
    }

    Ok(())
}

/// Print history entries added since the last render, then the current
/// prompt. Returns the new history length.
fn render(view: &SessionView, printed: usize) -> usize {
    let start = if printed > view.history.len() { 0 } else { printed };
    for entry in view.history.iter().skip(start) {
        match &entry.content {
            HistoryContent::Text { text } if entry.speaker == Speaker::User => {
                println!("  {} {}", "you:".cyan(), text)
            }
            HistoryContent::Text { text } => println!("  {}", text.dimmed()),
            HistoryContent::Table { table } => {
                for row in &table.rows {
                    println!("  {:<24} {}", row.label.dimmed(), row.value);
                }
            }
            HistoryContent::ImageSet { designs } => {
                for design in designs {
                    for artifact in &design.variations {
                        println!(
                            "  Base {} - Var {}: {}",
                            design.base_design_index,
                            artifact.variation_index.unwrap_or_default(),
                            artifact.url
                        );
                    }
                }
            }
        }
    }

    println!();
    match &view.node.message {
        RenderedMessage::Text(text) => println!("{}", text.bold()),
        RenderedMessage::Table(table) => {
            for row in &table.rows {
                println!("  {:<24} {}", row.label, row.value.green());
            }
            println!("{}", table.prompt.bold());
        }
    }
    for (i, option) in view.node.options.iter().enumerate() {
        let text = if option.enabled {
            option.text.normal()
        } else {
            option.text.dimmed()
        };
        println!("  {}. {}", i + 1, text);
    }
    if let Some(viewed) = &view.viewed {
        println!(
            "  {} Base {} - Var {}",
            "viewing".cyan(),
            viewed.location.base_design_index,
            viewed.location.variation_index
        );
    }

    view.history.len()
}

fn report(outcome: &StepOutcome) {
    match outcome {
        StepOutcome::Action(ActionOutcome::Published { url }) => {
            println!("{} added to Lark: {}", "OK".green().bold(), url)
        }
        StepOutcome::Action(ActionOutcome::PublishedBatch(report)) => {
            println!("{} {}", "OK".green().bold(), report.summary())
        }
        StepOutcome::Action(ActionOutcome::Edited { new_url, .. }) => {
            println!("{} edited: {}", "OK".green().bold(), new_url)
        }
        StepOutcome::Action(ActionOutcome::Discarded) => {
            println!("{} result arrived after the conversation moved on", "note".yellow())
        }
        StepOutcome::Ignored => println!("{} another action is in progress", "note".yellow()),
        _ => {}
    }
}

fn report_error(err: &WizardError) {
    let label = if err.is_rejection() { "rejected" } else { "error" };
    eprintln!("{}: {}", label.red().bold(), err);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("2"), Ok(Command::Option(2)));
        assert_eq!(parse_command(" quit "), Ok(Command::Quit));
        assert_eq!(parse_command("n 4"), Ok(Command::Number(4)));
        assert_eq!(parse_command("view 2 3"), Ok(Command::View(2, 3)));
        assert_eq!(
            parse_command("edit make it blue"),
            Ok(Command::Edit("make it blue".into()))
        );
        assert_eq!(
            parse_command("date 2030-05-01"),
            Ok(Command::Date(NaiveDate::from_ymd_opt(2030, 5, 1).unwrap()))
        );
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(parse_command("0").is_err());
        assert!(parse_command("edit").is_err());
        assert!(parse_command("view 2").is_err());
        assert!(parse_command("date tomorrow").is_err());
        assert!(parse_command("dance").is_err());
    }
}

//! instasheet CLI
//!
//! Scrapes recent Instagram posts and stories for the accounts listed in a
//! Google Sheet and appends them to the same spreadsheet.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use instasheet::{
    config::{InstagramCredentials, load_config},
    error::{AppError, Result},
    pipeline,
    services::{CodePrompt, SessionManager},
    storage::{ConsoleSink, TargetSource, Workbook},
    utils::log as progress,
};

/// instasheet - Instagram to Google Sheets scraper
#[derive(Parser, Debug)]
#[command(
    name = "instasheet",
    version,
    about = "Collect recent Instagram posts and stories into a spreadsheet"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in, fetch every target and append the results
    Run {
        /// Print rows instead of writing them to the spreadsheet
        #[arg(long)]
        dry_run: bool,
    },

    /// Log in (or refresh the stored session) without scraping
    Login,

    /// List the target usernames from the input sheet
    Targets,

    /// Validate the configuration file and credentials
    Validate,
}

/// Asks for the verification code on the terminal.
struct ConsolePrompt;

impl CodePrompt for ConsolePrompt {
    fn verification_code(&self, message: &str) -> Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(message)
            .interact_text()
            .map(|code| code.trim().to_string())
            .map_err(|e| AppError::Prompt(e.to_string()))
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli.config)?;
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run { dry_run } => {
            let credentials = InstagramCredentials::from_env()?;
            let sheets = Workbook::connect(&config.sheets)?;

            let client = SessionManager::new(&config.instagram, &credentials)
                .login(&ConsolePrompt)
                .await?;

            let report = if dry_run {
                let targets = Workbook::open_targets(sheets, &config.sheets).await?;
                let posts = ConsoleSink::new(&config.sheets.posts_sheet);
                let stories = ConsoleSink::new(&config.sheets.stories_sheet);
                pipeline::run_scrape(&config, &client, &targets, &posts, &stories).await?
            } else {
                let workbook = Workbook::open(sheets, &config.sheets).await?;
                let report = pipeline::run_scrape(
                    &config,
                    &client,
                    &workbook.targets,
                    &workbook.posts,
                    &workbook.stories,
                )
                .await?;
                workbook.targets.format_header().await?;
                report
            };

            progress::separator();
            if report.failures.is_empty() {
                progress::success("All targets processed");
            } else {
                progress::warn(&format!(
                    "{} of {} targets failed",
                    report.failures.len(),
                    report.targets
                ));
            }
        }

        Command::Login => {
            let credentials = InstagramCredentials::from_env()?;
            let client = SessionManager::new(&config.instagram, &credentials)
                .login(&ConsolePrompt)
                .await?;

            let session = client.session();
            progress::success(&format!(
                "Logged in as @{} (user id {})",
                session.username,
                session.user_id.as_deref().unwrap_or("unknown")
            ));
            log::info!("Session stored at {}", config.instagram.session_file.display());
        }

        Command::Targets => {
            let sheets = Workbook::connect(&config.sheets)?;
            let worksheet = Workbook::open_targets(sheets, &config.sheets).await?;
            let targets = worksheet.read_targets().await?;

            progress::header(&format!("{} ({} rows)", worksheet.title(), targets.len()));
            for target in &targets {
                progress::sub_item(target);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            progress::success("Config OK");

            match InstagramCredentials::from_env() {
                Ok(credentials) => progress::success(&format!(
                    "Instagram credentials found for @{}",
                    credentials.username
                )),
                Err(e) => {
                    progress::error(&format!("Credential check failed: {}", e));
                    return Err(e);
                }
            }

            if !config.sheets.credentials_file.exists() {
                let message = format!(
                    "Service account key not found at {}",
                    config.sheets.credentials_file.display()
                );
                progress::error(&message);
                return Err(AppError::config(message));
            }
            progress::success("Service account key present");

            log::info!("All validations passed!");
        }
    }

    log::info!("Done!");

    Ok(())
}

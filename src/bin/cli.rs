//! Intent browser command line
//!
//! `install` fetches a browser for the automation engine; `auth` opens a
//! headed browser so a human can log in and prints the resulting storage state.

use clap::{Parser, Subcommand};
use intent_browser::{ApiConfig, Browser, GotoOptions, LaunchOptions};
use std::process::{Command, ExitCode};
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_INSTALL_COMMAND: &str = "npx @puppeteer/browsers install chrome@stable";

#[derive(Parser)]
#[command(name = "intent-browser")]
#[command(version)]
#[command(about = "Intent-driven browser automation tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the browser used for automation
    Install {
        /// Command that performs the installation
        #[arg(long, default_value = DEFAULT_INSTALL_COMMAND)]
        command: String,
    },
    /// Log in by hand and print the browser's storage state as JSON
    Auth {
        /// Page to open
        #[arg(long)]
        url: String,

        /// Path to custom browser executable
        #[arg(long, value_name = "PATH")]
        executable_path: Option<String>,
    },
}

fn install(command: &str) -> ExitCode {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        eprintln!("Install command is empty");
        return ExitCode::FAILURE;
    };

    log::info!("Running `{}`", command);
    match Command::new(program).args(parts).status() {
        Ok(status) if status.success() => {
            println!("Browser installed");
            ExitCode::SUCCESS
        }
        Ok(status) => {
            eprintln!("Installation failed: `{}` exited with {}", command, status);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Installation failed: could not run `{}`: {}", program, e);
            ExitCode::FAILURE
        }
    }
}

async fn auth(url: &str, executable_path: Option<String>) -> intent_browser::Result<()> {
    let mut options = LaunchOptions::new().headless(false);
    if let Some(path) = executable_path {
        options = options.chrome_path(path);
    }

    let browser = Browser::launch(options, ApiConfig::from_env()?).await?;
    browser.goto(url, GotoOptions::default()).await?;

    eprintln!("Log in in the browser window, then press Enter here.");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;

    let state = browser.storage_state().await?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    browser.close().await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Install { command } => install(&command),
        Commands::Auth { url, executable_path } => match auth(&url, executable_path).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Authentication failed: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

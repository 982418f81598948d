use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ads_dashboard::client::DEFAULT_API;
use ads_dashboard::output::{write_report, Destination};
use ads_dashboard::render::{render_html, render_text, RenderContext};
use ads_dashboard::{Dashboard, FileSessionStore, HttpAdsSource, ViewState};

#[derive(Debug, Parser)]
#[command(name = "ads_dashboard", about = "Meta ads dashboard", version)]
struct Cli {
    /// Base URL of the ads server
    #[arg(long, env = "DASHBOARD_API", default_value = DEFAULT_API)]
    api: String,

    /// Directory holding session.json (default: the user config directory)
    #[arg(long)]
    session_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Save credentials and load the account once
    Login {
        #[arg(long, env = "META_ACCESS_TOKEN", default_value = "")]
        token: String,
        #[arg(long, env = "META_AD_ACCOUNT_ID", default_value = "")]
        account_id: String,
    },
    /// Forget saved credentials
    Logout,
    /// Load ads and print the dashboard
    Show {
        /// Also write the HTML dashboard to a path or s3://bucket/key
        #[arg(long)]
        out: Option<String>,
    },
    /// Load ads and push them to the spreadsheet
    Sync,
}

fn session_store(dir: Option<PathBuf>) -> Result<FileSessionStore> {
    match dir {
        Some(dir) => Ok(FileSessionStore::in_dir(dir)),
        None => FileSessionStore::default_location()
            .context("No configuration directory on this platform; pass --session-dir"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = session_store(cli.session_dir)?;
    let mut dashboard = Dashboard::new(store, HttpAdsSource::new(&cli.api));

    match cli.command {
        Command::Login { token, account_id } => {
            dashboard.configure(&token, &account_id)?;
            dashboard.refresh().await;
            print!("{}", render_text(dashboard.view(), dashboard.notice()));
        }
        Command::Logout => {
            dashboard.logout()?;
            println!("Logged out.");
        }
        Command::Show { out } => {
            dashboard.init().await;
            print!("{}", render_text(dashboard.view(), dashboard.notice()));

            if let Some(target) = out {
                let destination = Destination::parse(&target)?;
                let generated_at = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
                let ctx = RenderContext {
                    notice: dashboard.notice(),
                    account_id: dashboard.credentials().map(|c| c.account_id.as_str()),
                    generated_at: &generated_at,
                };
                let html = render_html(dashboard.view(), &ctx)
                    .context("Failed to serialize dashboard to JSON")?;
                write_report(&destination, html).await?;
                println!("\nDashboard written to {destination}");
            }
        }
        Command::Sync => {
            dashboard.init().await;
            if let ViewState::Error(message) = dashboard.view() {
                bail!("{message}");
            }
            if dashboard.credentials().is_none() {
                bail!("Not configured; run `ads_dashboard login` first");
            }
            let summary = dashboard.sync().await?;
            println!("{}", summary.message);
            println!("{}", summary.details);
            println!(
                "{} rows written ({} updated, {} added) to spreadsheet {}",
                summary.rows_added, summary.updated, summary.added, summary.spreadsheet_id
            );
        }
    }

    Ok(())
}

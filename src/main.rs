mod app;
mod cache;
mod config;
mod logging;
mod metrics;
mod refresh;
mod resolve;
mod sheets;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use crate::metrics::channel::Classifier;
use crate::metrics::{DashboardReport, ReportOptions};
use crate::sheets::{SheetFetcher, SheetsClient};

#[derive(Parser, Debug)]
#[command(name = "funnelboard")]
#[command(about = "Outreach funnel analytics served from Google Sheets")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./funnelboard.yaml, then $XDG_CONFIG_HOME/funnelboard/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Address to listen on, overriding server.bind
  #[arg(short, long, global = true)]
  bind: Option<SocketAddr>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Serve the HTTP API (default)
  Serve,
  /// Fetch sources once and print the dashboard report as JSON
  Report {
    /// Source ids to include (default: all configured sources)
    #[arg(short, long = "source")]
    sources: Vec<String>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;

  match args.command.unwrap_or(Command::Serve) {
    Command::Serve => {
      let bind = args.bind.unwrap_or(config.server.bind);
      app::serve(&config, bind).await
    }
    Command::Report { sources } => report(&config, sources).await,
  }
}

async fn report(config: &config::Config, sources: Vec<String>) -> Result<()> {
  let sources = if sources.is_empty() {
    config.sources.iter().map(|s| s.id.clone()).collect()
  } else {
    if let Some(unknown) = sources.iter().find(|id| config.source(id).is_none()) {
      return Err(eyre!("Unknown source: {}", unknown));
    }
    sources
  };

  let fetcher = SheetFetcher::new(SheetsClient::new()?, config);
  let batches = fetcher.fetch_all(&sources).await.map_err(|e| match e.remediation() {
    Some(hint) => eyre!("{} {}", e, hint),
    None => eyre!("{}", e),
  })?;
  info!(sheets = batches.len(), "fetched");

  let report = DashboardReport::build(
    &batches,
    &Classifier::new(&config.sources),
    &ReportOptions::default(),
    Utc::now().date_naive(),
  );
  let json =
    serde_json::to_string_pretty(&report).map_err(|e| eyre!("Failed to encode report: {}", e))?;
  println!("{}", json);
  Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use market_pulse::config::Config;
use market_pulse::feed::{aggregator, server, simulator::PriceFeedSimulator};
use market_pulse::feed::broadcaster::Broadcaster;
use market_pulse::model::report::{format_currency, PnlReport};
use market_pulse::monitor::client::MonitorClient;
use market_pulse::price_store::{PriceStore, StorePriceSink};
use market_pulse::strategy::historical;
use market_pulse::strategy::ma_crossover::MaCrossoverStrategy;

#[derive(Parser)]
#[command(name = "market-pulse", about = "Simulated market feed and crossover backtester")]
struct Cli {
    /// Path to the TOML config file; defaults apply when absent.
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the price feed server: simulator, websocket fan-out, persistence
    /// and rolling-average aggregation.
    Serve,
    /// Run the monitoring client against a feed server.
    Monitor,
    /// Run the moving-average crossover strategy over historical data and
    /// print the P&L report.
    Backtest {
        /// JSON file with rows {ticker, date, price}; when omitted the
        /// persisted price store is used.
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .level
                    .parse()
                    .unwrap_or_else(|_| "info".parse().unwrap())
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Monitor => monitor(config).await,
        Command::Backtest { input } => backtest(config, input),
    }
}

async fn serve(config: Config) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_ctrl_c_handler(shutdown_tx);

    let store = Arc::new(PriceStore::new(&config.storage.db_path));
    let sink = Arc::new(StorePriceSink::new(Arc::clone(&store)));
    let broadcaster = Arc::new(Broadcaster::with_sink(Some(sink)));

    let simulator = PriceFeedSimulator::new(&config.feed);
    tokio::spawn(simulator.run(Arc::clone(&broadcaster), shutdown_rx.clone()));

    tokio::spawn(aggregator::run(
        Arc::clone(&store),
        config.feed.tickers.clone(),
        Duration::from_secs(config.storage.average_interval_secs),
        Duration::from_secs(config.storage.average_window_secs),
        shutdown_rx.clone(),
    ));

    let listener = server::bind(&config.feed.host, config.feed.port).await?;
    server::serve(listener, broadcaster, shutdown_rx).await
}

async fn monitor(config: Config) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_ctrl_c_handler(shutdown_tx);
    MonitorClient::from_config(&config).run(shutdown_rx).await
}

fn backtest(config: Config, input: Option<PathBuf>) -> Result<()> {
    let strategy =
        MaCrossoverStrategy::new(config.strategy.short_period, config.strategy.long_period)
            .context("invalid strategy configuration")?;

    let rows = match input {
        Some(path) => historical::load_history_json(&path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => PriceStore::new(&config.storage.db_path)
            .load_history()
            .context("failed to load history from price store")?,
    };
    if rows.is_empty() {
        bail!("no historical data to backtest");
    }

    let reports = strategy.run(&rows)?;
    print_reports(&reports, strategy.short_period(), strategy.long_period());
    Ok(())
}

fn spawn_ctrl_c_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });
}

fn print_reports(reports: &[PnlReport], short_period: usize, long_period: usize) {
    let rule = "=".repeat(80);
    println!("{rule}");
    println!("MOVING AVERAGE CROSSOVER STRATEGY REPORT");
    println!("{rule}");
    println!("Short MA period: {short_period}");
    println!("Long MA period:  {long_period}");
    println!();

    let mut total_pnl = 0.0;
    let mut total_signals = 0;
    for report in reports {
        println!("{}", report.ticker);
        println!("  Total signals:  {}", report.total_signals);
        println!("  Profit/Loss:    {}", format_currency(report.total_pnl));
        println!("  Winning trades: {}", report.winning_trades);
        println!("  Losing trades:  {}", report.losing_trades);
        println!("  Win rate:       {:.1}%", report.win_rate);
        if !report.signals.is_empty() {
            println!("  Recent signals:");
            for signal in report.signals.iter().rev().take(5).rev() {
                println!(
                    "    {}: {} at {} (MA{}={:.2}, MA{}={:.2})",
                    signal.timestamp.format("%Y-%m-%d"),
                    signal.kind,
                    format_currency(signal.price),
                    short_period,
                    signal.short_ma,
                    long_period,
                    signal.long_ma
                );
            }
        }
        println!();
        total_pnl += report.total_pnl;
        total_signals += report.total_signals;
    }

    println!("{rule}");
    println!("OVERALL SUMMARY");
    println!("{rule}");
    println!("Tickers:       {}", reports.len());
    println!("Total signals: {total_signals}");
    println!("Total P&L:     {}", format_currency(total_pnl));
    println!("{rule}");
}

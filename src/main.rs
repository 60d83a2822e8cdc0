mod models;
mod repo;
mod service;
mod session;
mod utils;

use crate::models::backup_log_record::BackupLogRecord;
use crate::models::config::{read_log_directory, setup_config_or_default, Config};
use crate::models::error::ErrorKind;
use crate::repo::sqlite::SqliteHistory;
use crate::service::backup::{BackupOptions, BackupOrchestrator};
use crate::service::history::HistoryRecorder;
use crate::service::listeners::{EventChannel, LogListener};
use crate::session::BackupSession;
use crate::utils::logger::{init_file_logger, parse_level};
use crate::utils::progress::{format_bytes, format_duration, ConsoleRenderer};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{debug, info, warn, LevelFilter};
use std::sync::Arc;
use std::thread;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser)]
#[command(name = "RustyTreeBackUp")]
#[command(about = "Directory tree backup utility with a backup history", long_about = None)]
struct Cli {
    #[arg(
        short = 'c',
        long = "config",
        default_value = "config.json",
        env = "RUSTYTREEBACKUP_CONFIG"
    )]
    config_file: String,

    #[arg(
        short = 'l',
        long = "log-level",
        default_value = "info",
        env = "LOG_LEVEL"
    )]
    log_level: String,

    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Print events and results as JSON lines
    #[arg(long = "json")]
    json: bool,

    #[arg(short = 'v', long = "validate-only")]
    validate_only: bool,

    /// Show the most recent backups instead of running one
    #[arg(long = "history", conflicts_with_all = ["source_path", "destination_path"])]
    history: bool,

    #[arg(short = 'n', long = "limit", requires = "history")]
    limit: Option<usize>,

    #[arg(
        short = 's',
        long = "source",
        required_unless_present_any = ["history", "validate_only"]
    )]
    source_path: Option<String>,

    #[arg(
        short = 'd',
        long = "destination",
        required_unless_present_any = ["history", "validate_only"]
    )]
    destination_path: Option<String>,

    #[arg(short = 't', long = "ticket")]
    ticket: Option<String>,

    #[arg(
        short = 'u',
        long = "user-id",
        default_value_t = 0,
        env = "RUSTYTREEBACKUP_USER_ID"
    )]
    user_id: i64,

    #[arg(long = "user-name", env = "RUSTYTREEBACKUP_USER")]
    user_name: Option<String>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let log_level = parse_level(&args.log_level);

    // Strip any surrounding quotes from config file path
    let config_file_path = args
        .config_file
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    init_logging(read_log_directory(&config_file_path).as_deref(), log_level);
    info!("RustyTreeBackUp starting...");

    let result = cli_main(&args, &config_file_path);
    log::logger().flush();
    result
}

fn cli_main(args: &Cli, config_file_path: &str) -> Result<()> {
    let config: Config =
        setup_config_or_default(config_file_path).context("Failed to load configuration")?;
    debug!("Loaded config: {:?}", &config);

    if args.validate_only {
        info!("Configuration is valid. Exiting (--validate-only mode).");
        return Ok(());
    }

    let history = open_history(&config).context("Failed to open backup history")?;

    if args.history {
        let limit = args.limit.unwrap_or(config.history_page_size);
        return print_history(&history, limit, args.json);
    }

    run_backup(args, &config, Arc::new(history))
}

fn init_logging(log_directory: Option<&str>, level: LevelFilter) {
    if let Some(directory) = log_directory {
        match init_file_logger(directory, level) {
            Ok(()) => return,
            Err(e) => eprintln!("{}; logging to stderr only", e),
        }
    }

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_secs()
        .init();
}

fn open_history(config: &Config) -> models::error::Result<SqliteHistory> {
    Ok(SqliteHistory::open(&config.database_file)?)
}

fn run_backup(args: &Cli, config: &Config, history: Arc<SqliteHistory>) -> Result<()> {
    let (source_path, destination_path) =
        match (&args.source_path, &args.destination_path) {
            (Some(source), Some(destination)) => (source, destination),
            _ => return Err(anyhow!("Both --source and --destination are required")),
        };

    let session = BackupSession::new();
    session.set_user(args.user_id, args.user_name.clone());
    session.set_ticket_number(args.ticket.clone());
    let request = session
        .request(source_path, destination_path)
        .context("Invalid backup request")?;

    let user = session.get_user();
    info!(
        "Backup requested by {} (user id {})",
        user.user_name.as_deref().unwrap_or("unknown user"),
        user.user_id
    );

    let interrupt = session.clone();
    ctrlc::set_handler(move || {
        warn!("Received interrupt, stopping after the current file...");
        interrupt.request_stop();
    })
    .context("Failed to set Ctrl+C handler")?;

    let mut orchestrator = BackupOrchestrator::new(
        BackupOptions::from_config(config),
        session.get_stop_signal(),
        Some(history),
    );
    orchestrator.attach(Arc::new(LogListener));

    // The orchestrator owns the only handle, so the channel closes when the run ends
    let channel = Arc::new(EventChannel::default());
    let mut events = channel.subscribe();
    orchestrator.attach(channel);

    let worker = thread::spawn(move || {
        let result = orchestrator.run(&request);
        debug!("Orchestrator stopped in state {:?}", orchestrator.state());
        result
    });

    let mut renderer = (!args.quiet && !args.json).then(ConsoleRenderer::new);
    loop {
        match events.blocking_recv() {
            Ok(event) => {
                if args.json {
                    println!(
                        "{}",
                        serde_json::to_string(&event).context("Failed to serialize event")?
                    );
                } else if let Some(renderer) = renderer.as_mut() {
                    renderer.render(&event);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                debug!("Console fell behind, {} events skipped", skipped)
            }
            Err(RecvError::Closed) => break,
        }
    }
    if let Some(renderer) = renderer.as_mut() {
        renderer.finish();
    }

    let result = worker.join().map_err(|_| {
        anyhow!(
            "Backup failed [{}]: backup worker thread panicked",
            ErrorKind::Unknown
        )
    })?;
    if session.is_stop_requested() {
        warn!("Backup was stopped at the user's request");
    }
    session.end_session();

    if args.json {
        println!(
            "{}",
            serde_json::to_string(&result).context("Failed to serialize result")?
        );
    }

    match result.error {
        None => {
            info!(
                "Backup finished: {} files ({}) in {}",
                result.metrics.copied_files,
                format_bytes(result.metrics.total_bytes),
                format_duration(result.duration_seconds)
            );
            Ok(())
        }
        Some(error) => Err(anyhow!("Backup failed [{}]: {}", error.kind, error.message)),
    }
}

fn print_history(history: &SqliteHistory, limit: usize, json: bool) -> Result<()> {
    let records = history
        .list_recent(limit)
        .context("Failed to read backup history")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&records).context("Failed to serialize history")?
        );
        return Ok(());
    }

    if records.is_empty() {
        println!("No backups recorded yet");
        return Ok(());
    }

    println!(
        "{:>5}  {:<19}  {:>8}  {:>7}  {:>11}  {:<12}  {:<12}  PATHS",
        "ID", "STARTED", "DURATION", "FILES", "SIZE", "STATUS", "TICKET"
    );
    for record in &records {
        println!("{}", history_row(record));
    }
    Ok(())
}

fn history_row(record: &BackupLogRecord) -> String {
    format!(
        "{:>5}  {:<19}  {:>8}  {:>7}  {:>11}  {:<12}  {:<12}  {} -> {}",
        record.backup_id,
        record.start_time.format("%Y-%m-%d %H:%M:%S"),
        record.duration.map(format_duration).unwrap_or_default(),
        record
            .copied_files
            .map(|files| files.to_string())
            .unwrap_or_default(),
        record.total_size.map(format_bytes).unwrap_or_default(),
        record.status.label(),
        record.ticket_number.as_deref().unwrap_or("-"),
        record.source_path.as_deref().unwrap_or("?"),
        record.destination_path.as_deref().unwrap_or("?"),
    )
}

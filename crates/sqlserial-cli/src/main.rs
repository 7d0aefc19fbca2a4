// crates/sqlserial-cli/src/main.rs
// ============================================================================
// Module: SQL Serial CLI Entry Point
// Description: Command dispatcher for serialized SQLite execution.
// Purpose: Run statements through the engine and maintain the database file.
// Dependencies: clap, serde_json, sqlserial-config, sqlserial-core, tracing.
// ============================================================================

//! ## Overview
//! The `sqlserial` binary opens the configured `SQLite` database, starts a
//! serialized engine over it, and routes every statement through the engine
//! queue. Results are written to stdout as one JSON object per operation;
//! diagnostics go to stderr through `tracing`. Security posture: SQL text is
//! operator-supplied and trusted, script files are size-limited.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use sqlserial_config::SqlSerialConfig;
use sqlserial_core::Engine;
use sqlserial_core::Operation;
use sqlserial_core::OperationId;
use sqlserial_core::OperationOutcome;
use sqlserial_core::SqlValue;
use sqlserial_core::Statement;
use sqlserial_core::WaitHandle;
use sqlserial_store_sqlite::SqliteStorage;
use sqlserial_store_sqlite::snapshot_database;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a statement script file.
const MAX_SCRIPT_BYTES: usize = 4 * 1024 * 1024;
/// Maximum number of statements accepted from one script.
const MAX_SCRIPT_STATEMENTS: usize = 10_000;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "sqlserial", disable_help_subcommand = true, version)]
struct Cli {
    /// Config file path (defaults to sqlserial.toml or `SQLSERIAL_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Database path overriding `storage.path` from the config.
    #[arg(long, value_name = "PATH", global = true)]
    database: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute one statement and print its rows.
    Exec(ExecCommand),
    /// Execute the statements in a JSON script file.
    Run(RunCommand),
    /// Copy the database to a new file.
    Backup(BackupCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `exec`.
#[derive(Args, Debug)]
struct ExecCommand {
    /// Statement text.
    #[arg(value_name = "SQL")]
    sql: String,
    /// Positional parameter as a JSON value; repeat in binding order.
    #[arg(long = "param", value_name = "JSON", action = ArgAction::Append)]
    params: Vec<String>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// JSON file holding an array of `{ "sql": ..., "params": [...] }`.
    #[arg(value_name = "FILE")]
    script: PathBuf,
    /// Run the whole script as one transaction instead of one operation per
    /// statement.
    #[arg(long, action = ArgAction::SetTrue)]
    atomic: bool,
}

/// Arguments for `backup`.
#[derive(Args, Debug)]
struct BackupCommand {
    /// Destination file; must not exist.
    #[arg(value_name = "DEST")]
    destination: PathBuf,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the config, then print the effective settings.
    Check,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let mut config = SqlSerialConfig::load(cli.config.as_deref())
        .or_else(|err| default_when_absent(cli.config.as_deref(), err))?;
    if let Some(database) = cli.database {
        config.storage.path = database;
        config
            .validate()
            .map_err(|err| CliError::new(format!("invalid --database: {err}")))?;
    }
    init_tracing(&config);

    match cli.command {
        Commands::Exec(command) => command_exec(&config, command),
        Commands::Run(command) => command_run(&config, &command),
        Commands::Backup(command) => command_backup(&config, &command),
        Commands::Config {
            command: ConfigCommand::Check,
        } => command_config_check(&config),
    }
}

/// Falls back to defaults when no config file was requested and none exists.
fn default_when_absent(
    explicit: Option<&Path>,
    error: sqlserial_config::ConfigError,
) -> CliResult<SqlSerialConfig> {
    let implicit = explicit.is_none() && std::env::var_os(sqlserial_config::CONFIG_ENV_VAR).is_none();
    let missing = matches!(error, sqlserial_config::ConfigError::Io(_))
        && !Path::new(sqlserial_config::DEFAULT_CONFIG_NAME).exists();
    if implicit && missing {
        return Ok(SqlSerialConfig::default());
    }
    Err(CliError::new(format!("failed to load config: {error}")))
}

/// Installs the stderr tracing subscriber; `RUST_LOG` overrides the config.
fn init_tracing(config: &SqlSerialConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new(sqlserial_config::DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.logging.ansi)
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// SECTION: Engine Commands
// ============================================================================

/// Executes the `exec` command.
fn command_exec(config: &SqlSerialConfig, command: ExecCommand) -> CliResult<ExitCode> {
    let params = command
        .params
        .iter()
        .map(String::as_str)
        .map(parse_param)
        .collect::<CliResult<Vec<_>>>()?;
    let engine = start_engine(config)?;
    let handle = WaitHandle::new();
    let id = engine
        .submit(Statement::with_params(command.sql, params), &handle)
        .map_err(|err| CliError::new(format!("submit failed: {err}")))?;
    handle.wait();
    let outcome = engine.collect(id);
    let ok = outcome.is_ok();
    write_outcome(id, &outcome)?;
    finish(&engine);
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Executes the `run` command.
fn command_run(config: &SqlSerialConfig, command: &RunCommand) -> CliResult<ExitCode> {
    let statements = read_script(&command.script)?;
    let engine = start_engine(config)?;
    let operations: Vec<Operation> = if command.atomic {
        vec![Operation::batch(statements)]
    } else {
        statements.into_iter().map(Operation::single).collect()
    };
    let mut submitted = Vec::with_capacity(operations.len());
    for operation in operations {
        let handle = WaitHandle::new();
        let id = engine
            .submit(operation, &handle)
            .map_err(|err| CliError::new(format!("submit failed: {err}")))?;
        submitted.push((id, handle));
    }
    let mut failures = 0_usize;
    for (id, handle) in submitted {
        handle.wait();
        let outcome = engine.collect(id);
        if outcome.is_err() {
            failures += 1;
        }
        write_outcome(id, &outcome)?;
    }
    finish(&engine);
    Ok(if failures == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Opens storage and starts an engine over it.
fn start_engine(config: &SqlSerialConfig) -> CliResult<Engine> {
    let storage = SqliteStorage::open(&config.storage)
        .map_err(|err| CliError::new(format!("failed to open database: {err}")))?;
    let engine = Engine::new(storage, config.engine.clone())
        .map_err(|err| CliError::new(format!("failed to build engine: {err}")))?;
    engine.start().map_err(|err| CliError::new(format!("failed to start engine: {err}")))?;
    Ok(engine)
}

/// Shuts the engine down and logs its counters.
fn finish(engine: &Engine) {
    engine.shutdown();
    let stats = engine.stats();
    info!(
        submitted = stats.submitted,
        succeeded = stats.succeeded,
        failed = stats.failed,
        "engine finished"
    );
}

// ============================================================================
// SECTION: Maintenance Commands
// ============================================================================

/// Executes the `backup` command.
fn command_backup(config: &SqlSerialConfig, command: &BackupCommand) -> CliResult<ExitCode> {
    snapshot_database(&config.storage, &command.destination)
        .map_err(|err| CliError::new(format!("backup failed: {err}")))?;
    write_stdout_line(&format!("backup written to {}", command.destination.display()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `config check` command.
fn command_config_check(config: &SqlSerialConfig) -> CliResult<ExitCode> {
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line(&format!(
        "database: {} (journal {}, synchronous {}, foreign keys {})",
        config.storage.path.display(),
        config.storage.journal_mode.pragma_value(),
        config.storage.sync_mode.pragma_value(),
        if config.storage.foreign_keys { "on" } else { "off" }
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line(&format!(
        "engine: retention {} ms, sweep every {} ms, worker {}",
        config.engine.retention_ms, config.engine.sweep_interval_ms, config.engine.worker_name
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads and parses a statement script.
fn read_script(path: &Path) -> CliResult<Vec<Statement>> {
    let bytes = read_bytes_with_limit(path, MAX_SCRIPT_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read script {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "script {} is {size} bytes, exceeding the {limit} byte limit",
            path.display()
        )),
    })?;
    parse_script(&bytes)
        .map_err(|err| CliError::new(format!("invalid script {}: {}", path.display(), err.message)))
}

/// Parses script JSON into statements.
fn parse_script(bytes: &[u8]) -> CliResult<Vec<Statement>> {
    let statements: Vec<Statement> =
        serde_json::from_slice(bytes).map_err(|err| CliError::new(err.to_string()))?;
    if statements.is_empty() {
        return Err(CliError::new("script holds no statements".to_string()));
    }
    if statements.len() > MAX_SCRIPT_STATEMENTS {
        return Err(CliError::new(format!(
            "script holds {} statements (max {MAX_SCRIPT_STATEMENTS})",
            statements.len()
        )));
    }
    Ok(statements)
}

/// Parses one `--param` value; booleans bind as 0 or 1.
fn parse_param(raw: &str) -> CliResult<SqlValue> {
    let json: serde_json::Value = serde_json::from_str(raw)
        .map_err(|err| CliError::new(format!("invalid --param `{raw}`: {err}")))?;
    if let serde_json::Value::Bool(flag) = json {
        return Ok(SqlValue::from(flag));
    }
    serde_json::from_value(json).map_err(|_| {
        CliError::new(format!(
            "invalid --param `{raw}`: expected null, a number, a string, or a byte array"
        ))
    })
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// One line of command output.
#[derive(Debug, Serialize)]
struct OutcomeRecord {
    /// Operation id.
    id: u64,
    /// Whether the operation succeeded.
    ok: bool,
    /// Result columns on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    columns: Option<Vec<String>>,
    /// Result rows keyed by column on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<serde_json::Value>,
    /// Rows changed on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    rows_affected: Option<usize>,
    /// Failure detail for operators.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    /// Short failure message safe to show end users.
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

impl OutcomeRecord {
    /// Builds the record for one outcome.
    fn new(id: OperationId, outcome: &OperationOutcome) -> Self {
        match outcome {
            Ok(rows) => Self {
                id: id.get(),
                ok: true,
                columns: Some(rows.columns.clone()),
                rows: Some(rows.to_json_objects()),
                rows_affected: Some(rows.rows_affected),
                error: None,
                message: None,
            },
            Err(err) => Self {
                id: id.get(),
                ok: false,
                columns: None,
                rows: None,
                rows_affected: None,
                error: Some(err.to_string()),
                message: Some(err.user_message()),
            },
        }
    }
}

/// Writes one outcome as a JSON line.
fn write_outcome(id: OperationId, outcome: &OperationOutcome) -> CliResult<()> {
    let line = serde_json::to_string(&OutcomeRecord::new(id, outcome))
        .map_err(|err| CliError::new(format!("failed to encode output: {err}")))?;
    write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

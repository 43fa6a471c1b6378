use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lincloud::config::Config;
use lincloud::modules::{module_names, run_module};
use lincloud::reconcile::ModuleResult;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Declarative Linode resource modules
#[derive(Parser, Debug)]
#[command(name = "lincloud", version, about, long_about = None)]
struct Args {
    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a module and print its result as JSON
    Run {
        /// Module name, e.g. database_mysql_v2
        module: String,

        /// JSON or YAML arguments file; `-` or omitted reads JSON from stdin
        args: Option<PathBuf>,
    },
    /// List available modules
    Modules,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Logs go to a file; stdout is reserved for the result document
fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("lincloud started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("lincloud").join("lincloud.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".lincloud").join("lincloud.log");
    }
    PathBuf::from("lincloud.log")
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn parse_module_args(content: &str, yaml: bool) -> Result<Value> {
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }

    if yaml {
        serde_yaml::from_str(content).context("Failed to parse YAML module arguments")
    } else {
        serde_json::from_str(content).context("Failed to parse JSON module arguments")
    }
}

/// Read module arguments from a file, or from stdin for `-`/no path
fn read_module_args(source: Option<&Path>) -> Result<Value> {
    match source {
        Some(path) if path != Path::new("-") => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read arguments file {:?}", path))?;
            parse_module_args(&content, is_yaml(path))
        }
        _ => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read module arguments from stdin")?;
            parse_module_args(&content, false)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level);

    let failed = match args.command {
        Command::Modules => {
            for name in module_names() {
                println!("{}", name);
            }
            false
        }
        Command::Run {
            module,
            args: source,
        } => {
            let (document, failed) = match read_module_args(source.as_deref()) {
                Ok(module_args) => {
                    let config = Config::load();
                    let outcome = run_module(&module, module_args, &config).await;
                    (outcome.to_document(), outcome.is_failure())
                }
                Err(err) => {
                    tracing::error!("{:#}", err);
                    (ModuleResult::default().to_failure(&format!("{:#}", err)), true)
                }
            };

            println!("{}", serde_json::to_string_pretty(&document)?);
            failed
        }
    };

    // Flush buffered log lines before exiting
    drop(log_guard);

    if failed {
        std::process::exit(1);
    }

    Ok(())
}

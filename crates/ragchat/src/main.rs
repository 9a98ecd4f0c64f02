//! ragchat: terminal client for a RAG chat backend
//!
//! Usage:
//!   ragchat                  - Start interactive mode
//!   ragchat -e "question"    - Ask one question and exit
//!   ragchat -f prompt.txt    - Ask the contents of a file and exit
//!   ragchat --help           - Show help

mod cli;
mod transcript;

use std::path::PathBuf;

use ragchat_core::{ChatClient, Config, Mode};
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq)]
enum RunMode {
    /// Interactive REPL
    Interactive,
    /// Send one query and exit
    Execute(String),
    /// Send the contents of a file and exit
    File(PathBuf),
    /// Show help
    Help,
    /// Show version
    Version,
}

/// Parsed command line
#[derive(Debug, PartialEq)]
struct Args {
    mode: RunMode,
    config_path: Option<PathBuf>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    rag: bool,
    show_context: bool,
    verbose: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            mode: RunMode::Interactive,
            config_path: None,
            base_url: None,
            timeout_secs: None,
            rag: false,
            show_context: false,
            verbose: false,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1)).map_err(|e| anyhow::anyhow!("{}", e))?;

    match args.mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("ragchat {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Logs go to stderr so they never mix with replies on stdout
    let level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = load_config(&args).map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting ragchat...");
    tracing::info!("Backend: {}", config.chat_url());

    let client = ChatClient::new(&config)
        .map_err(|e| anyhow::anyhow!("Failed to create chat client: {}", e))?;

    match args.mode {
        RunMode::Interactive => cli::run_cli(client).await,
        RunMode::Execute(query) => cli::run_execute(client, &query, args.show_context).await,
        RunMode::File(path) => cli::run_file(client, &path, args.show_context).await,
        RunMode::Help | RunMode::Version => Ok(()),
    }
}

/// Resolve configuration: file, then environment, then command line flags
fn load_config(args: &Args) -> ragchat_core::Result<Config> {
    let mut config = match &args.config_path {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::load()?,
    };

    if let Some(base_url) = &args.base_url {
        config.backend.base_url = base_url.clone();
    }
    if let Some(timeout) = args.timeout_secs {
        config.backend.timeout_secs = timeout;
    }
    if args.rag {
        config.chat.default_mode = Mode::Rag;
    }

    config.validate()?;
    Ok(config)
}

/// Parse command line arguments (without the program name)
fn parse_args<I>(args: I) -> Result<Args, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => parsed.mode = RunMode::Help,
            "--version" | "-V" => parsed.mode = RunMode::Version,
            "--execute" | "-e" => {
                let query = args.next().ok_or("--execute requires a query")?;
                parsed.mode = RunMode::Execute(query);
            }
            "--file" | "-f" => {
                let path = args.next().ok_or("--file requires a path")?;
                parsed.mode = RunMode::File(PathBuf::from(path));
            }
            "--config" | "-c" => {
                let path = args.next().ok_or("--config requires a path")?;
                parsed.config_path = Some(PathBuf::from(path));
            }
            "--base-url" => {
                parsed.base_url = Some(args.next().ok_or("--base-url requires a URL")?);
            }
            "--timeout" => {
                let value = args.next().ok_or("--timeout requires a number of seconds")?;
                let secs = value
                    .parse()
                    .map_err(|_| format!("invalid --timeout value: {}", value))?;
                parsed.timeout_secs = Some(secs);
            }
            "--rag" => parsed.rag = true,
            "--show-context" => parsed.show_context = true,
            "--verbose" | "-v" => parsed.verbose = true,
            other => return Err(format!("unknown argument: {} (see --help)", other)),
        }

        if matches!(parsed.mode, RunMode::Help | RunMode::Version) {
            break;
        }
    }

    Ok(parsed)
}

/// Print help message
fn print_help() {
    println!("ragchat - chat with a plain or retrieval-augmented (RAG) backend");
    println!();
    println!("Usage:");
    println!("  ragchat                    Start interactive mode");
    println!("  ragchat -e, --execute <Q>  Ask one question and print the reply");
    println!("  ragchat -f, --file <PATH>  Ask the contents of a file");
    println!("  ragchat -h, --help         Show this help message");
    println!("  ragchat -V, --version      Show version");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>  Config file (default: ./ragchat.toml)");
    println!("  --base-url <URL>     Backend address (default: http://localhost:8000)");
    println!("  --timeout <SECS>     Request deadline in seconds (default: 60)");
    println!("  --rag                Start in RAG mode");
    println!("  --show-context       Print retrieved context after the reply");
    println!("  -v, --verbose        Log requests to stderr");
    println!();
    println!("Environment Variables:");
    println!("  RAGCHAT_BASE_URL      Backend address");
    println!("  RAGCHAT_TIMEOUT_SECS  Request deadline in seconds");
    println!("  RAGCHAT_DEFAULT_MODE  plain or rag");
    println!("  RUST_LOG              Log filter");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_no_args_is_interactive() {
        assert_eq!(parse(&[]).unwrap(), Args::default());
    }

    #[test]
    fn test_execute_with_options() {
        let args = parse(&[
            "--rag",
            "-e",
            "What is X?",
            "--base-url",
            "http://127.0.0.1:9000",
            "--timeout",
            "5",
            "--show-context",
        ])
        .unwrap();

        assert_eq!(args.mode, RunMode::Execute("What is X?".to_string()));
        assert!(args.rag);
        assert!(args.show_context);
        assert_eq!(args.base_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(args.timeout_secs, Some(5));
    }

    #[test]
    fn test_file_and_config() {
        let args = parse(&["-f", "q.txt", "-c", "custom.toml"]).unwrap();
        assert_eq!(args.mode, RunMode::File(PathBuf::from("q.txt")));
        assert_eq!(args.config_path, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_help_stops_parsing() {
        assert_eq!(parse(&["--help", "--bogus"]).unwrap().mode, RunMode::Help);
        assert_eq!(parse(&["-V"]).unwrap().mode, RunMode::Version);
    }

    #[test]
    fn test_errors() {
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["-e"]).is_err());
        assert!(parse(&["--timeout", "soon"]).is_err());
    }

    #[test]
    fn test_cli_flags_override_config() {
        let args = Args {
            config_path: None,
            base_url: Some("http://10.1.1.1:8000".to_string()),
            timeout_secs: Some(7),
            rag: true,
            ..Args::default()
        };

        let config = load_config(&args).unwrap();
        assert_eq!(config.backend.base_url, "http://10.1.1.1:8000");
        assert_eq!(config.backend.timeout_secs, 7);
        assert_eq!(config.chat.default_mode, Mode::Rag);
    }

    #[test]
    fn test_invalid_flag_value_fails_validation() {
        let args = Args {
            base_url: Some("localhost".to_string()),
            ..Args::default()
        };
        assert!(load_config(&args).is_err());
    }
}

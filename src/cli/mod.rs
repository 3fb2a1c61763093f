//! CLI subcommand definitions and handlers.
//!
//! - `start` (default) -- run the poll server
//! - `config show|get|path` -- inspect configuration
//! - `status` -- query a running instance's health endpoint
//! - `version` -- print build/version info

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::config;
use crate::server::DEFAULT_PORT;

/// Pollgate: a poll server with Slack delivery.
#[derive(Parser, Debug)]
#[command(
    name = "pollgate",
    version = env!("CARGO_PKG_VERSION"),
    about = "Pollgate, a poll server with Slack delivery"
)]
pub struct Cli {
    /// Path to the JSON5 configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the poll server (default when no subcommand is given).
    Start,

    /// Inspect configuration values.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Query a running instance for health information.
    Status {
        /// Port of the running instance (default: from config or 3000).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host of the running instance.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration (secrets redacted) as JSON.
    Show,

    /// Print a specific configuration value by dot-notation path.
    Get {
        /// Dot-notation key (e.g. "server.port", "slack.defaultChannel").
        key: String,
    },

    /// Print the resolved configuration file path.
    Path,
}

/// Key fragments whose values are redacted when printing config.
const SECRET_KEYS: &[&str] = &["token", "secret", "password"];

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

/// Run the `config show` subcommand.
pub fn handle_config_show(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = serde_json::to_value(config::load_config(path)?)?;
    let pretty = serde_json::to_string_pretty(&redact_secrets(cfg))?;
    println!("{}", pretty);
    Ok(())
}

/// Run the `config get <key>` subcommand.
pub fn handle_config_get(path: Option<&Path>, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = redact_secrets(serde_json::to_value(config::load_config(path)?)?);
    match get_value_at_path(&cfg, key) {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        None => {
            eprintln!("Key not found: {}", key);
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path(path: Option<&Path>) {
    let resolved = path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::get_config_path);
    println!("{}", resolved.display());
}

/// Run the `status` subcommand against a running instance's `/health`.
pub async fn handle_status(
    config_path: Option<&Path>,
    host: &str,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let port = resolve_port(config_path, port);
    let url = format!("http://{}:{}/health", host, port);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    let response = match client.get(&url).send().await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Could not connect to pollgate at {}:{}", host, port);
            eprintln!("  Error: {}", e);
            eprintln!();
            eprintln!("Is the server running? Start it with: pollgate start");
            std::process::exit(1);
        }
    };

    if !response.status().is_success() {
        eprintln!(
            "Health endpoint returned HTTP {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        );
        std::process::exit(1);
    }

    let body: Value = response.json().await?;

    println!("Pollgate status");
    println!("===============");
    if let Some(version) = body.get("version").and_then(|v| v.as_str()) {
        println!("  Version:  {}", version);
    }
    println!("  Address:  {}:{}", host, port);
    if let Some(status) = body.get("status").and_then(|v| v.as_str()) {
        println!("  Status:   {}", status);
    }
    if let Some(polls) = body.get("polls").and_then(|v| v.as_u64()) {
        println!("  Polls:    {}", polls);
    }

    Ok(())
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("pollgate {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("POLLGATE_BUILD_DATE"));
    println!("  Git commit: {}", env!("POLLGATE_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Navigate a JSON value by dot-notation path and return the leaf value.
fn get_value_at_path(root: &Value, path: &str) -> Option<Value> {
    let mut current = root;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current.clone())
}

/// Redact secret-looking keys in a JSON value (recursive). Empty strings are
/// left alone so an unset secret reads as unset.
fn redact_secrets(mut value: Value) -> Value {
    match &mut value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                let lower = key.to_lowercase();
                if SECRET_KEYS.iter().any(|s| lower.contains(s)) {
                    if child.as_str() != Some("") {
                        *child = Value::String("[REDACTED]".to_string());
                    }
                } else {
                    *child = redact_secrets(child.take());
                }
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                *item = redact_secrets(item.take());
            }
        }
        _ => {}
    }
    value
}

/// Resolve the port of a running instance.
/// Tries (in order): explicit flag, config file value, DEFAULT_PORT.
fn resolve_port(config_path: Option<&Path>, explicit: Option<u16>) -> u16 {
    if let Some(p) = explicit {
        return p;
    }
    config::load_config(config_path)
        .map(|cfg| cfg.server.port)
        .unwrap_or(DEFAULT_PORT)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_args_defaults_to_none() {
        let cli = Cli::try_parse_from(["pollgate"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_start_subcommand() {
        let cli = Cli::try_parse_from(["pollgate", "start"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Start)));
    }

    #[test]
    fn test_cli_global_config_flag() {
        let cli =
            Cli::try_parse_from(["pollgate", "start", "--config", "/etc/pollgate.json5"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/pollgate.json5")));
    }

    #[test]
    fn test_cli_version_subcommand() {
        let cli = Cli::try_parse_from(["pollgate", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
    }

    #[test]
    fn test_cli_config_show() {
        let cli = Cli::try_parse_from(["pollgate", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand::Show))
        ));
    }

    #[test]
    fn test_cli_config_get() {
        let cli = Cli::try_parse_from(["pollgate", "config", "get", "server.port"]).unwrap();
        match cli.command {
            Some(Command::Config(ConfigCommand::Get { key })) => assert_eq!(key, "server.port"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::try_parse_from(["pollgate", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand::Path))
        ));
    }

    #[test]
    fn test_cli_status_defaults() {
        let cli = Cli::try_parse_from(["pollgate", "status"]).unwrap();
        match cli.command {
            Some(Command::Status { port, host }) => {
                assert_eq!(port, None);
                assert_eq!(host, "127.0.0.1");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_status_with_port() {
        let cli = Cli::try_parse_from(["pollgate", "status", "--port", "9000"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Status { port: Some(9000), .. })
        ));
    }

    #[test]
    fn test_get_value_at_path() {
        let val = serde_json::json!({"server": {"port": 3000}});
        assert_eq!(
            get_value_at_path(&val, "server.port"),
            Some(serde_json::json!(3000))
        );
        assert!(get_value_at_path(&val, "server.missing").is_none());
        assert!(get_value_at_path(&val, "server.port.deeper").is_none());
    }

    #[test]
    fn test_redact_secrets() {
        let val = serde_json::json!({
            "server": { "port": 3000 },
            "slack": {
                "botToken": "xoxb-123",
                "signingSecret": "",
                "defaultChannel": "C1"
            }
        });
        let redacted = redact_secrets(val);
        assert_eq!(redacted["slack"]["botToken"], "[REDACTED]");
        assert_eq!(redacted["slack"]["signingSecret"], "");
        assert_eq!(redacted["slack"]["defaultChannel"], "C1");
        assert_eq!(redacted["server"]["port"], 3000);
    }

    #[test]
    fn test_redact_secrets_array() {
        let val = serde_json::json!([{"token": "secret"}, {"safe": "ok"}]);
        let redacted = redact_secrets(val);
        assert_eq!(redacted[0]["token"], "[REDACTED]");
        assert_eq!(redacted[1]["safe"], "ok");
    }

    #[test]
    fn test_resolve_port_explicit() {
        assert_eq!(resolve_port(None, Some(1234)), 1234);
    }

    #[test]
    fn test_resolve_port_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json5");
        std::fs::write(&path, "{ server: { port: 4100 } }").unwrap();
        assert_eq!(resolve_port(Some(&path), None), 4100);
    }
}

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LoggingConfig};
use crate::executor::{split_statements, Outcome, Val, VM};

#[derive(Parser)]
#[command(name = "fetchflow")]
#[command(about = "Fetchflow - run scripts that suspend on every external fetch", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a script, answering each fetch from a responses file
    Run {
        /// Script file to execute
        script: PathBuf,

        /// JSON array of fetch responses, consumed in order
        #[arg(short = 'r', long = "responses")]
        responses: Option<PathBuf>,
    },

    /// Print the statements a script splits into
    Split {
        /// Script file to split
        script: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load and validate configuration before executing any command
    let config = Config::builder().config_path(cli.config.clone()).build()?;
    init_tracing(&config.logging);

    let stdout = std::io::stdout();
    execute(cli.command, &config, &mut stdout.lock())
}

/// Install the stderr log subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // Ignore the error when a subscriber is already installed (embedding hosts)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Execute one command, writing its output to `out`
pub fn execute(command: Commands, config: &Config, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Run { script, responses } => {
            let source = read_script(&script)?;
            let mut responses = match responses {
                Some(path) => load_responses(&path)?,
                None => VecDeque::new(),
            };

            let mut vm = VM::with_config(&config.engine);
            let mut outcome = vm.run(&source)?;

            loop {
                writeln!(out, "{}", outcome.to_json())?;

                let Outcome::Suspended {
                    continuation_id, ..
                } = outcome
                else {
                    break;
                };

                let Some(response) = responses.pop_front() else {
                    info!(continuation_id, "No responses left, leaving script suspended");
                    break;
                };

                outcome = vm.resume(continuation_id, response)?;
            }

            if !responses.is_empty() {
                info!(unused = responses.len(), "Script finished with unused responses");
            }
        }

        Commands::Split { script } => {
            let source = read_script(&script)?;
            for (i, stmt) in split_statements(&source).iter().enumerate() {
                writeln!(out, "{:>3}: {}", i + 1, stmt)?;
            }
        }

        Commands::Config => {
            let rendered = toml::to_string_pretty(config).context("Failed to render config")?;
            write!(out, "{}", rendered)?;
        }
    }

    Ok(())
}

fn read_script(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))
}

fn load_responses(path: &Path) -> Result<VecDeque<Val>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read responses {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let serde_json::Value::Array(items) = json else {
        bail!("Responses file {} must contain a JSON array", path.display());
    };
    Ok(items.into_iter().map(Val::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn temp_file(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    fn run_command(command: Commands) -> Result<Vec<String>> {
        let mut out = Vec::new();
        execute(command, &Config::default(), &mut out)?;
        Ok(String::from_utf8(out)
            .expect("utf8 output")
            .lines()
            .map(str::to_string)
            .collect())
    }

    #[test]
    fn test_run_without_fetch_prints_completion() {
        let script = temp_file("const x = 5; x * 2", ".js");
        let lines = run_command(Commands::Run {
            script: script.path().to_path_buf(),
            responses: None,
        })
        .unwrap();
        assert_eq!(lines, vec![r#"{"type":"completed","value":10}"#]);
    }

    #[test]
    fn test_run_answers_fetches_in_order() {
        let script = temp_file(
            r#"const a = fetch("/a"); const b = fetch("/b"); a.n + b.n"#,
            ".js",
        );
        let responses = temp_file(r#"[{"n": 1}, {"n": 2}]"#, ".json");
        let lines = run_command(Commands::Run {
            script: script.path().to_path_buf(),
            responses: Some(responses.path().to_path_buf()),
        })
        .unwrap();

        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["type"], "suspended");
        assert_eq!(first["fetchRequest"]["url"], "/a");
        let second: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second["continuationId"], 2);
        assert_eq!(lines[2], r#"{"type":"completed","value":3}"#);
    }

    #[test]
    fn test_run_stops_when_responses_run_out() {
        let script = temp_file(r#"const a = fetch("/a"); a"#, ".js");
        let lines = run_command(Commands::Run {
            script: script.path().to_path_buf(),
            responses: None,
        })
        .unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(r#""type":"suspended""#));
    }

    #[test]
    fn test_run_surfaces_script_error() {
        let script = temp_file(r#"throw new Error("boom")"#, ".js");
        let err = run_command(Commands::Run {
            script: script.path().to_path_buf(),
            responses: None,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_responses_must_be_an_array() {
        let script = temp_file("1", ".js");
        let responses = temp_file(r#"{"n": 1}"#, ".json");
        let err = run_command(Commands::Run {
            script: script.path().to_path_buf(),
            responses: Some(responses.path().to_path_buf()),
        })
        .unwrap_err();
        assert!(err.to_string().contains("must contain a JSON array"));
    }

    #[test]
    fn test_split_lists_statements() {
        let script = temp_file("a = 1; f(b; c);\n d", ".js");
        let lines = run_command(Commands::Split {
            script: script.path().to_path_buf(),
        })
        .unwrap();
        assert_eq!(lines, vec!["  1: a = 1", "  2: f(b; c)", "  3: d"]);
    }

    #[test]
    fn test_config_renders_toml() {
        let lines = run_command(Commands::Config).unwrap();
        assert!(lines.contains(&"[engine]".to_string()));
        assert!(lines.contains(&r#"suspend_function = "fetch""#.to_string()));
    }

    #[test]
    fn test_cli_parses_global_config_flag() {
        let cli = Cli::parse_from(["fetchflow", "run", "script.js", "--config", "custom.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Run { responses: None, .. }));
    }
}

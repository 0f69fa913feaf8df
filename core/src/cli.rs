use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::interpreter::{self, parse_program, ExecutionResult};

#[derive(Parser)]
#[command(name = "jstrace")]
#[command(about = "jstrace - step-by-step JavaScript execution traces", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a program and print its trace as JSON
    Run {
        /// Source file, or `-` for stdin
        file: String,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Step ceiling for this run
        #[arg(long)]
        max_steps: Option<usize>,

        /// Truncate the trace after this many steps
        #[arg(long)]
        max_trace_steps: Option<usize>,
    },

    /// Run a program and print only its console output
    Console {
        /// Source file, or `-` for stdin
        file: String,

        /// Step ceiling for this run
        #[arg(long)]
        max_steps: Option<usize>,
    },

    /// Parse a program without running it
    Check {
        /// Source file, or `-` for stdin
        file: String,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with an explicit argument list
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    let builder = Config::builder().config_path(cli.config);

    match cli.command {
        Commands::Run {
            file,
            pretty,
            max_steps,
            max_trace_steps,
        } => {
            let config = builder
                .max_steps(max_steps)
                .max_trace_steps(max_trace_steps)
                .pretty(pretty)
                .build()?;
            let source = read_source(&file)?;

            let mut result = interpreter::execute_code_with(&source, config.limits());
            if let Some(max) = config.output.max_trace_steps {
                result = interpreter::truncate_trace(result, max);
            }

            let json = if config.output.pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{}", json);
            exit_on_error(&result);
        }

        Commands::Console { file, max_steps } => {
            let config = builder.max_steps(max_steps).build()?;
            let source = read_source(&file)?;
            let result = interpreter::execute_code_with(&source, config.limits());

            for line in result.console_lines() {
                println!("{}", line);
            }
            if let Some(error) = &result.error {
                eprintln!("{}", error);
            }
            exit_on_error(&result);
        }

        Commands::Check { file } => {
            let source = read_source(&file)?;
            match parse_program(&source) {
                Ok(program) => println!("✓ {} statement(s) parsed", program.body.len()),
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Config => {
            let config = builder.build()?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn read_source(file: &str) -> Result<String> {
    if file == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read program from stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))
}

fn exit_on_error(result: &ExecutionResult) {
    if result.error.is_some() {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_program(name: &str, source: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("jstrace-cli-{}-{}.js", std::process::id(), name));
        std::fs::write(&path, source).unwrap();
        path
    }

    fn args(rest: &[&str]) -> Vec<String> {
        std::iter::once("jstrace")
            .chain(rest.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parses_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(args(&["run", "prog.js", "--max-steps", "50", "--config", "x.toml"]))
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        match cli.command {
            Commands::Run {
                file,
                pretty,
                max_steps,
                max_trace_steps,
            } => {
                assert_eq!(file, "prog.js");
                assert!(!pretty);
                assert_eq!(max_steps, Some(50));
                assert_eq!(max_trace_steps, None);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_console_and_check_succeed() {
        let path = write_program("ok", "const xs = [1, 2]\nconsole.log(xs.length)\n");
        let file = path.to_string_lossy().to_string();

        run_cli_from_args(args(&["run", &file, "--pretty", "--max-trace-steps", "3"])).unwrap();
        run_cli_from_args(args(&["console", &file, "--max-steps", "500"])).unwrap();
        run_cli_from_args(args(&["check", &file])).unwrap();

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_source_file_is_reported() {
        let err = run_cli_from_args(args(&["run", "/nonexistent/jstrace/prog.js"])).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read /nonexistent/jstrace/prog.js"));
    }

    #[test]
    fn test_zero_step_ceiling_flag_is_rejected() {
        let path = write_program("zero", "let a = 1\n");
        let file = path.to_string_lossy().to_string();
        let err = run_cli_from_args(args(&["console", &file, "--max-steps", "0"])).unwrap_err();
        assert!(err.to_string().contains("max_steps"));
        std::fs::remove_file(path).ok();
    }
}

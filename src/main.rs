use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use log::{LevelFilter, debug};

use nblint_lib::config::Config;
use nblint_lib::executor::ToolExecutor;
use nblint_lib::exit_codes;
use nblint_lib::runner::{RunError, find_notebooks, run_notebook};

/// Run any line-oriented code-quality tool on Jupyter notebooks.
#[derive(Parser)]
#[command(name = "nblint", version, about)]
struct Cli {
    /// Tool to run (e.g. flake8, mypy, black)
    command: String,

    /// Notebook files or directories to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Write tool-made changes back into the notebooks
    #[arg(long)]
    allow_mutation: bool,

    /// Skip cells tagged with any of these tags
    #[arg(long, value_delimiter = ',', value_name = "TAG")]
    skip_celltags: Vec<String>,

    /// Additional cell magics whose cells should be processed
    #[arg(long, value_delimiter = ',', value_name = "MAGIC")]
    process_cells: Vec<String>,

    /// Project cells that fail the syntax sanity check instead of skipping them
    #[arg(long)]
    dont_skip_bad_cells: bool,

    /// Configuration file (default: nearest .nblint.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Arguments passed through to the tool, after `--`
    #[arg(last = true)]
    tool_args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        LevelFilter::Error
    } else {
        match cli.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("nblint: {e:#}");
            exit_codes::ERROR
        }
    };
    process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    config.skip_celltags.extend(cli.skip_celltags);
    config.process_cells.extend(cli.process_cells);
    config.dont_skip_bad_cells |= cli.dont_skip_bad_cells;
    config.allow_mutation |= cli.allow_mutation;

    let notebooks = find_notebooks(&cli.paths);
    if notebooks.is_empty() {
        anyhow::bail!("no notebooks found under the given paths");
    }
    debug!("processing {} notebooks", notebooks.len());

    let executor = ToolExecutor::new();
    let mut code = exit_codes::SUCCESS;
    for notebook in &notebooks {
        match run_notebook(&cli.command, notebook, &cli.tool_args, &config, &executor) {
            Ok(outcome) => {
                print!("{}", outcome.stdout);
                eprint!("{}", outcome.stderr);
                code = exit_codes::worst(code, outcome.exit_code);
            }
            Err(e) => {
                // A rejected mutation still carries what the tool said.
                if let RunError::MutationDetected { stdout, stderr, .. } = &e {
                    print!("{stdout}");
                    eprint!("{stderr}");
                }
                eprintln!("nblint: {e}");
                code = exit_codes::worst(code, exit_codes::ERROR);
            }
        }
    }
    Ok(code)
}

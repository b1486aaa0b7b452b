// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Vaxflow CLI - equity-weighted vaccine supply allocation

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ModelArgs, OutputOptions, SolverArgs};

#[derive(Parser)]
#[command(name = "vaxflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "VAXFLOW_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(
        long,
        env = "NO_COLOR",
        global = true,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the graph and report invalid records
    Validate {
        #[command(flatten)]
        model: ModelArgs,
    },

    /// Centrality measures and bottleneck detection
    Analyze {
        #[command(flatten)]
        model: ModelArgs,

        /// Write network_analysis.json into this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Allocate supply and evaluate the equity change
    Optimize {
        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        solver: SolverArgs,

        /// Write optimization_results.json into this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Analysis, allocation and equity evaluation in one pass
    Run {
        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        solver: SolverArgs,

        /// Write both result files into this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Export graph to various formats
    Export {
        #[command(flatten)]
        model: ModelArgs,

        /// Output format (dot, json)
        #[arg(short, long, default_value = "dot")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(short = 'O', long)]
        output: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Configuration key (omit to show everything)
        key: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = vaxflow::config::load(cli.config.as_deref())?;

    // Initialize logging; RUST_LOG wins over flags, flags over the config file
    let log_level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output = OutputOptions {
        json: cli.json,
        color: !cli.no_color,
    };

    // Execute command
    match cli.command {
        Commands::Validate { model } => {
            model.apply(&mut config);
            commands::validate::run(&model, &config, output)
        }
        Commands::Analyze { model, output_dir } => {
            model.apply(&mut config);
            commands::analyze::run(&model, &config, output_dir.as_deref(), output)
        }
        Commands::Optimize {
            model,
            solver,
            output_dir,
        } => {
            model.apply(&mut config);
            solver.apply(&mut config)?;
            commands::optimize::run(&model, &config, output_dir.as_deref(), output)
        }
        Commands::Run {
            model,
            solver,
            output_dir,
        } => {
            model.apply(&mut config);
            solver.apply(&mut config)?;
            commands::run::run(&model, &config, output_dir.as_deref(), output)
        }
        Commands::Export {
            model,
            format,
            output: path,
        } => {
            model.apply(&mut config);
            commands::export::run(&model, &config, &format, path)
        }
        Commands::Config { key } => commands::config::run(&config, key.as_deref(), output),
        Commands::Completions { shell } => commands::completions::run(shell, &mut Cli::command()),
    }
}

mod cli_args;
mod commands;
mod menu;
mod output;
mod prompt;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::*;
use log;
use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;

use cli_args::{Cli, Commands, ProjectOpts};
use codexport_core::{AppError, Config, detect_stack};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose, cli_args.log_file.as_deref());

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let core_err = e.downcast_ref::<AppError>();
            let exit_code = match core_err {
                Some(AppError::Config(_)) => 1,
                Some(AppError::ConfigRead { .. }) => 1,
                Some(AppError::ConfigParse { .. }) => 1,
                Some(AppError::ConfigWrite { .. }) => 2,
                Some(AppError::StackExists(_)) => 1,
                Some(AppError::StackNotFound(_)) => 1,
                Some(AppError::ProjectExists { .. }) => 1,
                Some(AppError::ProjectNotFound { .. }) => 1,
                Some(AppError::InvalidArgument(_)) => 1,
                Some(AppError::InvalidProjectRoot(_)) => 2,
                Some(AppError::Io(_)) => 2,
                Some(AppError::FileWrite { .. }) => 2,
                Some(AppError::DirCreation { .. }) => 2,
                Some(AppError::DirectoryScan { .. }) => 2,
                Some(AppError::JsonSerialize(_)) => 6,
                Some(_) => 1,
                None => 1,
            };

            if !quiet || exit_code == 1 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn setup_logging(quiet: bool, verbose: u8, log_file: Option<&Path>) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log_level).format_timestamp(None);
    if let Some(path) = log_file {
        match File::create(path) {
            Ok(file) => {
                // file logs keep timestamps and record everything down to debug
                builder
                    .target(env_logger::Target::Pipe(Box::new(file)))
                    .format_timestamp_secs()
                    .filter_level(log_level.max(log::LevelFilter::Debug));
            }
            Err(e) => eprintln!(
                "{} Cannot open log file {}: {}",
                "⚠️".yellow(),
                path.display(),
                e
            ),
        }
    }
    builder.init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    let config_path = Config::resolve_config_path(cli.config.as_ref())
        .context("Failed to resolve configuration path")?;
    let config = Config::load_or_default(&config_path);

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => {
            log::debug!("Executing 'menu' command...");
            commands::menu::handle_menu_command(config, config_path)?;
        }
        Commands::Export(args) => {
            log::debug!("Executing 'export' command...");
            commands::export::handle_export_command(&args, &config, quiet)?;
        }
        Commands::Tree(args) => {
            log::debug!("Executing 'tree' command...");
            commands::tree::handle_tree_command(&args, &config)?;
        }
        Commands::Detect(args) => {
            log::debug!("Executing 'detect' command...");
            commands::detect::handle_detect_command(&args, &config)?;
        }
        Commands::Discover(args) => {
            log::debug!("Executing 'discover' command...");
            commands::discover::handle_discover_command(&args, config, &config_path, quiet)?;
        }
        Commands::Stacks(args) => {
            log::debug!("Executing 'stacks' command...");
            commands::stacks::handle_stacks_command(args, config, &config_path, quiet)?;
        }
        Commands::ScanDirs(args) => {
            log::debug!("Executing 'scan-dirs' command...");
            commands::scan_dirs::handle_scan_dirs_command(&args, config, &config_path, quiet)?;
        }
        Commands::Completion(args) => {
            log::debug!("Executing 'completion' command...");
            commands::completion::handle_completion_command(&args, quiet)?;
        }
    }
    Ok(())
}

/// Resolves `(stack name, project root)` from the shared project options.
///
/// `--project` is looked up in `--stack` or, without it, in every stack in
/// declaration order. Without `--stack` the stack is detected from the root.
pub fn resolve_project(config: &Config, opts: &ProjectOpts) -> Result<(String, PathBuf)> {
    // a registered project carries its own stack
    let (owner, root) = match (&opts.project, &opts.path) {
        (Some(project), _) => match &opts.stack {
            Some(stack) => (Some(stack.clone()), config.project_path(stack, project)?),
            None => config
                .stacks
                .iter()
                .find_map(|(name, rule)| {
                    rule.projects
                        .get(project)
                        .map(|path| (Some(name.clone()), path.clone()))
                })
                .ok_or_else(|| {
                    AppError::InvalidArgument(format!(
                        "Project '{}' is not registered in any stack",
                        project
                    ))
                })?,
        },
        (None, Some(path)) => (
            opts.stack.clone(),
            codexport_core::config::expand_path(&path.to_string_lossy()),
        ),
        (None, None) => (
            opts.stack.clone(),
            env::current_dir().context("Failed to determine current directory")?,
        ),
    };
    if !root.is_dir() {
        bail!(AppError::InvalidProjectRoot(root));
    }

    let stack = match owner {
        Some(stack) => {
            config.stack(&stack)?;
            stack
        }
        None => match detect_stack(&root, config) {
            Some(stack) => {
                log::info!("Detected stack '{}' for {}", stack, root.display());
                stack.to_string()
            }
            None => bail!(AppError::InvalidArgument(format!(
                "Could not detect the stack of {}; pass --stack",
                root.display()
            ))),
        },
    };
    Ok((stack, root))
}

/// Saves the config after a command mutated it.
pub fn save_config(config: &Config, config_path: &Path) -> Result<()> {
    config
        .save(config_path)
        .with_context(|| format!("Failed to save configuration to {}", config_path.display()))
}

use crate::cli_args::DetectArgs;
use anyhow::{Context, Result};
use codexport_core::{AppError, Config, config::expand_path, detect_stack};
use colored::*;
use std::env;

pub fn handle_detect_command(args: &DetectArgs, config: &Config) -> Result<()> {
    let path = match &args.path {
        Some(p) => expand_path(&p.to_string_lossy()),
        None => env::current_dir().context("Failed to determine current directory")?,
    };
    if !path.is_dir() {
        anyhow::bail!(AppError::InvalidProjectRoot(path));
    }
    match detect_stack(&path, config) {
        Some(stack) => println!("{}", stack.green()),
        None => println!("{}", "(no matching stack)".yellow()),
    }
    Ok(())
}

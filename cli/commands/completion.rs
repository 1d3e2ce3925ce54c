use crate::cli_args::{Cli, CompletionArgs};
use crate::output::print_success;
use crate::prompt::{Prompter, TerminalPrompter};
use anyhow::{Context, Result, anyhow, bail};
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use codexport_core::AppError;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

const SUPPORTED_SHELLS: [Shell; 3] = [Shell::Fish, Shell::Bash, Shell::Zsh];

pub fn handle_completion_command(args: &CompletionArgs, quiet: bool) -> Result<()> {
    let shell_name = args.shell.as_deref().unwrap_or("fish");
    let shell = SUPPORTED_SHELLS
        .into_iter()
        .find(|s| s.to_string().eq_ignore_ascii_case(shell_name))
        .ok_or_else(|| {
            AppError::InvalidArgument(format!(
                "Unsupported shell for completion: {} (expected fish, bash or zsh)",
                shell_name
            ))
        })?;

    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();

    if !args.save {
        generate(shell, &mut command, bin_name, &mut io::stdout());
        return Ok(());
    }

    let save_path = completion_path(shell, &bin_name)?;
    if save_path.exists() {
        if quiet {
            bail!(
                "Completion file {} exists; refusing to overwrite in quiet mode",
                save_path.display()
            );
        }
        let stdin = io::stdin();
        let mut prompter = TerminalPrompter::new(stdin.lock(), io::stdout());
        let prompt = format!("{} already exists. Overwrite?", save_path.display());
        if !prompter.confirm(&prompt, false)? {
            prompter.message("Nothing written.")?;
            return Ok(());
        }
    }

    if let Some(dir) = save_path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    let mut file = File::create(&save_path)
        .with_context(|| format!("Failed to create file {}", save_path.display()))?;
    generate(shell, &mut command, bin_name, &mut file);
    print_success(
        &format!("{} completions saved to {}", shell, save_path.display()),
        quiet,
    );
    Ok(())
}

/// Conventional per-user location of a completion script.
fn completion_path(shell: Shell, bin_name: &str) -> Result<PathBuf> {
    let (base, relative) = match shell {
        Shell::Fish => (
            dirs::config_dir(),
            PathBuf::from("fish/completions").join(format!("{}.fish", bin_name)),
        ),
        Shell::Bash => (
            dirs::data_local_dir(),
            PathBuf::from("bash-completion/completions").join(bin_name),
        ),
        Shell::Zsh => (
            dirs::data_local_dir(),
            PathBuf::from("zsh/site-functions").join(format!("_{}", bin_name)),
        ),
        other => bail!(AppError::InvalidArgument(format!(
            "No default completion location for {}",
            other
        ))),
    };
    base.map(|dir| dir.join(relative))
        .ok_or_else(|| anyhow!("Could not determine the user's data directory"))
}

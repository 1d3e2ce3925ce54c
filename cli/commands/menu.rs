use crate::menu::Menu;
use crate::prompt::TerminalPrompter;
use anyhow::Result;
use codexport_core::Config;
use colored::*;
use log;
use std::io;
use std::path::PathBuf;

pub fn handle_menu_command(config: Config, config_path: PathBuf) -> Result<()> {
    let stdin = io::stdin();
    let mut prompter = TerminalPrompter::new(stdin.lock(), io::stdout());
    let final_config = Menu::new(config, config_path, &mut prompter).run()?;
    log::debug!(
        "Menu closed with {} stacks configured",
        final_config.stacks.len()
    );
    println!("{}", "Bye.".dimmed());
    Ok(())
}

use crate::cli_args::ScanDirsArgs;
use crate::output::{print_success, print_warning};
use crate::save_config;
use anyhow::Result;
use codexport_core::Config;
use colored::*;
use std::path::Path;

pub fn handle_scan_dirs_command(
    args: &ScanDirsArgs,
    mut config: Config,
    config_path: &Path,
    quiet: bool,
) -> Result<()> {
    if args.dirs.is_empty() {
        for (raw, expanded) in config.scan_dirs.iter().zip(config.expanded_scan_dirs()) {
            let marker = if expanded.is_dir() {
                "✓".green()
            } else {
                "✗".red()
            };
            println!("{} {}", marker, raw);
        }
        return Ok(());
    }

    let rejected = config.set_scan_dirs(&args.dirs);
    if !rejected.is_empty() {
        print_warning(
            &format!("Skipped missing directories: {}", rejected.join(", ")),
            quiet,
        );
    }
    save_config(&config, config_path)?;
    print_success("Scan directories updated", quiet);
    Ok(())
}

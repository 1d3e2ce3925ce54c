use crate::cli_args::DiscoverArgs;
use crate::output::{print_json, print_success};
use crate::save_config;
use anyhow::Result;
use codexport_core::{Config, discover_projects};
use colored::*;
use std::path::Path;

pub fn handle_discover_command(
    args: &DiscoverArgs,
    mut config: Config,
    config_path: &Path,
    quiet: bool,
) -> Result<()> {
    let roots = config.expanded_scan_dirs();
    let found = discover_projects(&roots, &config, args.depth);

    if args.json {
        print_json(&found)?;
    } else if found.is_empty() {
        println!("{}", "(No projects found)".yellow());
    } else {
        for (stack, projects) in &found {
            println!("{}", stack.green().bold());
            for (name, path) in projects {
                let known = config
                    .stacks
                    .get(stack)
                    .is_some_and(|rule| rule.projects.contains_key(name));
                let marker = if known { "·".dimmed() } else { "+".green() };
                println!(
                    "  {} {:<24} {}",
                    marker,
                    name.cyan(),
                    path.display().to_string().dimmed()
                );
            }
        }
    }

    if args.save {
        let added = config.merge_discovered(&found);
        if added > 0 {
            save_config(&config, config_path)?;
        }
        print_success(&format!("Registered {} new projects", added), quiet);
    }
    Ok(())
}

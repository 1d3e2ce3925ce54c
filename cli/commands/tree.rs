use crate::cli_args::TreeArgs;
use crate::output::{print_json, print_tree};
use crate::resolve_project;
use anyhow::{Context, Result};
use codexport_core::{self as core, Config, ExportRules};
use log;

pub fn handle_tree_command(args: &TreeArgs, config: &Config) -> Result<()> {
    let (stack, root) = resolve_project(config, &args.project)?;
    log::info!("Building tree for {} (stack {})", root.display(), stack);
    let rules = ExportRules::from_stack(config.stack(&stack)?, args.project.max_depth);
    let entries = core::build_project_tree(&root, &rules)
        .with_context(|| format!("Failed to build tree for {}", root.display()))?;
    if args.json {
        print_json(&entries)
    } else {
        print_tree(&entries);
        Ok(())
    }
}

use crate::cli_args::ExportArgs;
use crate::output::print_export_summary;
use crate::resolve_project;
use anyhow::{Context, Result, bail};
use codexport_core::{
    self as core, AppError, Config, DEFAULT_OUTPUT_FILENAME, EntryKind, ExportLimits, ExportRules,
    ExportSelection, Pick, TreeEntry,
};
use log;
use std::path::{Component, Path, PathBuf};

pub fn handle_export_command(args: &ExportArgs, config: &Config, quiet: bool) -> Result<()> {
    let (stack, root) = resolve_project(config, &args.project)?;
    let root = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve project root {}", root.display()))?;
    let rules = ExportRules::from_stack(config.stack(&stack)?, args.project.max_depth);

    let mut limits = ExportLimits::default();
    if let Some(max_lines) = args.max_lines {
        limits.max_lines = max_lines;
    }
    if let Some(max_file_size) = args.max_file_size {
        limits.max_file_size = max_file_size;
    }

    let selection = if args.select.is_empty() {
        ExportSelection::Entire
    } else {
        let picks = args
            .select
            .iter()
            .map(|rel| selection_pick(&root, rel))
            .collect::<Result<Vec<_>>>()?;
        core::expand_selection(&root, &rules, &picks)?
    };

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILENAME));
    log::info!(
        "Exporting {} with stack '{}' to {}",
        root.display(),
        stack,
        output_path.display()
    );
    let report = core::export_project(&root, &rules, &selection, limits, &output_path)
        .with_context(|| format!("Failed to export {}", root.display()))?;
    print_export_summary(&report, &output_path, quiet);
    Ok(())
}

/// Turns a `--select` argument into a tree pick rooted at `root`.
fn selection_pick(root: &Path, relative: &str) -> Result<Pick> {
    let relative = relative
        .trim_start_matches("./")
        .trim_end_matches(['/', '\\'])
        .replace('\\', "/");
    let stays_inside = Path::new(&relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !stays_inside {
        bail!(AppError::InvalidArgument(format!(
            "Selected path '{}' is outside the project",
            relative
        )));
    }
    let path = root.join(&relative);
    let kind = if path.is_dir() {
        EntryKind::Directory
    } else if path.is_file() {
        EntryKind::File
    } else {
        bail!(AppError::InvalidArgument(format!(
            "Selected path '{}' does not exist in {}",
            relative,
            root.display()
        )));
    };
    Ok(Pick::Entry(TreeEntry {
        kind,
        depth: relative.matches('/').count(),
        path,
        relative,
    }))
}

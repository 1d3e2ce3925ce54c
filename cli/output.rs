use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use codexport_core::{Config, ExportReport, TreeEntry};
use colored::*;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

pub fn print_success(message: &str, quiet: bool) {
    if !quiet {
        println!("{} {}", "✅".green(), message);
    }
}

pub fn print_warning(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{} {}", "⚠️".yellow(), message);
    }
}

pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(data).context("Failed to serialize output")?;
    write_to_stdout(&content)
}

pub fn human_bytes(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

pub fn print_export_summary(report: &ExportReport, output_path: &Path, quiet: bool) {
    if quiet {
        return;
    }
    println!(
        "{} Code exported to {} ({} files, {})",
        "✅".green(),
        output_path.display().to_string().blue(),
        report.included.len().to_string().cyan(),
        human_bytes(report.bytes_written).cyan()
    );
    if !report.truncated.is_empty() {
        println!(
            "{} Truncated: {}",
            "✂️".yellow(),
            report.truncated.join(", ").dimmed()
        );
    }
    if !report.skipped.is_empty() {
        println!(
            "{} {} files skipped (run with -v for details)",
            "ℹ️".blue(),
            report.skipped.len()
        );
    }
}

pub fn print_stacks_table(config: &Config) {
    if config.stacks.is_empty() {
        println!("{}", "(No stacks configured)".yellow());
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Stack").fg(Color::Green),
        Cell::new("Extensions").fg(Color::Green),
        Cell::new("Excluded dirs").fg(Color::Green),
        Cell::new("Signature files").fg(Color::Green),
        Cell::new("Projects").fg(Color::Green),
    ]);
    for (name, rule) in &config.stacks {
        table.add_row(vec![
            Cell::new(name).fg(Color::Cyan),
            Cell::new(rule.extensions.join(" ")),
            Cell::new(rule.exclude_dirs.join(" ")).fg(Color::DarkGrey),
            Cell::new(rule.signature_files.join(" ")),
            Cell::new(rule.projects.len()).set_alignment(comfy_table::CellAlignment::Right),
        ]);
    }
    println!("{table}");
}

pub fn print_stack_details(name: &str, config: &Config) -> Result<()> {
    let rule = config.stack(name)?;
    println!("{}", name.green().bold().underline());
    println!("{:<18} {}", "Extensions:".green(), rule.extensions.join(" "));
    println!("{:<18} {}", "Excluded dirs:".green(), rule.exclude_dirs.join(" "));
    println!(
        "{:<18} {}",
        "Signature files:".green(),
        rule.signature_files.join(" ")
    );
    if rule.projects.is_empty() {
        println!("{}", "(No projects registered)".yellow());
    } else {
        println!("{}", "Projects:".green());
        for (project, path) in &rule.projects {
            println!("  {:<20} {}", project.cyan(), path.display().to_string().dimmed());
        }
    }
    Ok(())
}

pub fn print_tree(entries: &[TreeEntry]) {
    if entries.is_empty() {
        println!("{}", "(No matching files)".yellow());
        return;
    }
    for entry in entries {
        match entry.kind {
            codexport_core::EntryKind::Directory => println!("📁 {}", entry.label().blue()),
            codexport_core::EntryKind::File => println!("📄 {}", entry.label()),
        }
    }
}

fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}


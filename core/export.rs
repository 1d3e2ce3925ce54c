use crate::config::StackRule;
use crate::error::{AppError, Result};
use log;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

pub const MAX_FILE_SIZE: u64 = 1_000_000;
pub const MAX_LINES_PER_FILE: usize = 1000;
const SNIFF_LEN: usize = 8192;

/// Filters derived from a stack rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRules {
    pub extensions: Vec<String>,
    /// Lowercased directory names pruned during traversal.
    pub exclude_dirs: HashSet<String>,
    /// Deepest directory (in path segments below the root) whose files are
    /// considered. `None` walks the whole tree.
    pub max_depth: Option<usize>,
}

impl ExportRules {
    pub fn new(extensions: &[String], exclude_dirs: &[String], max_depth: Option<usize>) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            exclude_dirs: exclude_dirs.iter().map(|d| d.to_lowercase()).collect(),
            max_depth,
        }
    }

    pub fn from_stack(rule: &StackRule, max_depth: Option<usize>) -> Self {
        Self::new(&rule.extensions, &rule.exclude_dirs, max_depth)
    }

    pub fn matches_extension(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }

    pub fn is_excluded_dir(&self, dir_name: &str) -> bool {
        self.exclude_dirs.contains(&dir_name.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportLimits {
    pub max_file_size: u64,
    pub max_lines: usize,
}

impl Default for ExportLimits {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            max_lines: MAX_LINES_PER_FILE,
        }
    }
}

/// Which files of a project to export.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExportSelection {
    #[default]
    Entire,
    /// Relative paths with `/` separators.
    Paths(BTreeSet<String>),
}

impl ExportSelection {
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ExportSelection::Paths(
            paths
                .into_iter()
                .map(|p| normalize_relative(p.as_ref()))
                .collect(),
        )
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        match self {
            ExportSelection::Entire => true,
            ExportSelection::Paths(paths) => paths.contains(relative_path),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub included: Vec<String>,
    pub skipped: Vec<String>,
    pub truncated: Vec<String>,
    pub bytes_written: u64,
}

/// Why a file did not make it into the export. Logged, never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SkipReason {
    NotSelected,
    ExtensionMismatch,
    Oversized { size: u64, limit: u64 },
    NotText,
    NotRegularFile,
    Destination,
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotSelected => write!(f, "not in selected paths"),
            SkipReason::ExtensionMismatch => write!(f, "extension not allowed"),
            SkipReason::Oversized { size, limit } => {
                write!(f, "file too large ({} bytes, limit {})", size, limit)
            }
            SkipReason::NotText => write!(f, "not a text file"),
            SkipReason::NotRegularFile => write!(f, "link target is not a regular file"),
            SkipReason::Destination => write!(f, "export destination"),
            SkipReason::Unreadable(e) => write!(f, "read error: {}", e),
        }
    }
}

/// Relative path rendered with `/` separators, the form used in headers and
/// selections.
pub fn relative_key(relative_path: &Path) -> String {
    relative_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_relative(raw: &str) -> String {
    relative_key(Path::new(&raw.replace('\\', "/")))
}

pub(crate) fn ensure_project_root(project_root: &Path) -> Result<PathBuf> {
    if !project_root.is_dir() {
        return Err(AppError::InvalidProjectRoot(project_root.to_path_buf()));
    }
    Ok(project_root.canonicalize()?)
}

/// Sorted depth-first walk that prunes excluded directories and stops
/// descending below `max_depth`.
pub(crate) fn walk_project(
    project_root: &Path,
    rules: &ExportRules,
) -> impl Iterator<Item = walkdir::Result<DirEntry>> + use<> {
    let mut walker = WalkDir::new(project_root)
        .follow_links(false)
        .sort_by_file_name();
    if let Some(max_depth) = rules.max_depth {
        // files of a directory at depth d sit at walk depth d + 1
        walker = walker.max_depth(max_depth + 1);
    }
    let rules = rules.clone();
    walker.into_iter().filter_entry(move |entry| {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        if rules.is_excluded_dir(&name) {
            log::debug!("Pruning excluded directory: {}", entry.path().display());
            return false;
        }
        true
    })
}

/// Metadata of the file an entry stands for, or `None` for entries that are
/// not files. A symlink resolves to its target; symlinked directories are
/// never followed.
pub(crate) fn file_metadata(entry: &DirEntry) -> Option<std::io::Result<fs::Metadata>> {
    let file_type = entry.file_type();
    if file_type.is_file() {
        return Some(entry.metadata().map_err(std::io::Error::from));
    }
    if !file_type.is_symlink() {
        return None;
    }
    match fs::metadata(entry.path()) {
        Ok(meta) if meta.is_dir() => {
            log::debug!("Not following symlinked directory: {}", entry.path().display());
            None
        }
        other => Some(other),
    }
}

pub(crate) fn is_file_entry(entry: &DirEntry) -> bool {
    matches!(file_metadata(entry), Some(Ok(meta)) if meta.is_file())
}

/// Binary sniff: a NUL byte in the leading block marks the file as binary.
pub fn is_text_file(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < buffer.len() {
        let n = file.read(&mut buffer[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(!buffer[..filled].contains(&0))
}

/// UTF-8 first, Latin-1 otherwise. The second boolean reports the fallback.
pub fn decode_text(bytes: Vec<u8>) -> (String, bool) {
    match String::from_utf8(bytes) {
        Ok(text) => (text, false),
        Err(e) => {
            let text = e.into_bytes().iter().map(|&b| char::from(b)).collect();
            (text, true)
        }
    }
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Splits on every line boundary: `\r\n`, a lone `\r`, `\n` and the other
/// Unicode line separators. A trailing break does not start an extra line.
fn split_lines(content: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = content.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&content[start..i]);
        start = i + c.len_utf8();
        if c == '\r' {
            if let Some(&(j, '\n')) = chars.peek() {
                chars.next();
                start = j + 1;
            }
        }
    }
    if start < content.len() {
        lines.push(&content[start..]);
    }
    lines
}

/// Keeps at most `max_lines` lines. Returns `None` when nothing was cut.
pub fn truncate_lines(content: &str, max_lines: usize) -> Option<String> {
    let lines = split_lines(content);
    if lines.len() <= max_lines {
        return None;
    }
    Some(lines[..max_lines].join("\n"))
}

struct Exporter<'a, W: Write> {
    rules: &'a ExportRules,
    selection: &'a ExportSelection,
    limits: ExportLimits,
    destination: Option<PathBuf>,
    out: W,
    report: ExportReport,
}

impl<'a, W: Write> Exporter<'a, W> {
    fn skip(&mut self, relative: String, reason: SkipReason) {
        match reason {
            SkipReason::Oversized { .. } | SkipReason::Unreadable(_) => {
                log::warn!("Skipped file {}: {}", relative, reason)
            }
            _ => log::debug!("Skipped file {}: {}", relative, reason),
        }
        self.report.skipped.push(relative);
    }

    fn admit(&self, path: &Path, relative: &str, size: u64) -> Option<SkipReason> {
        if !self.selection.contains(relative) {
            return Some(SkipReason::NotSelected);
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if !self.rules.matches_extension(&file_name) {
            return Some(SkipReason::ExtensionMismatch);
        }
        if size > self.limits.max_file_size {
            return Some(SkipReason::Oversized {
                size,
                limit: self.limits.max_file_size,
            });
        }
        if self.destination.as_deref() == Some(path) {
            return Some(SkipReason::Destination);
        }
        match is_text_file(path) {
            Ok(true) => None,
            Ok(false) => Some(SkipReason::NotText),
            Err(e) => Some(SkipReason::Unreadable(e.to_string())),
        }
    }

    fn process_file(&mut self, path: &Path, relative: String, size: u64) -> Result<()> {
        if let Some(reason) = self.admit(path, &relative, size) {
            self.skip(relative, reason);
            return Ok(());
        }
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.skip(relative, SkipReason::Unreadable(e.to_string()));
                return Ok(());
            }
        };
        log::info!("Processing file: {}", relative);
        let (mut content, fell_back) = decode_text(bytes);
        if fell_back {
            log::warn!("File {} was decoded as latin-1", relative);
        }
        if let Some(cut) = truncate_lines(&content, self.limits.max_lines) {
            log::warn!(
                "File {} truncated to {} lines",
                relative,
                self.limits.max_lines
            );
            content = cut;
            self.report.truncated.push(relative.clone());
        }

        let block = format!("\n=== {} ===\n\n{}\n", relative, content);
        self.out
            .write_all(block.as_bytes())
            .map_err(|e| match &self.destination {
                Some(dest) => AppError::FileWrite {
                    path: dest.clone(),
                    source: e,
                },
                None => AppError::Io(e),
            })?;
        self.report.bytes_written += block.len() as u64;
        self.report.included.push(relative);
        Ok(())
    }

    fn run(mut self, project_root: &Path) -> Result<(ExportReport, W)> {
        for entry_result in walk_project(project_root, self.rules) {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("{}", AppError::from(e));
                    continue;
                }
            };
            let Some(metadata) = file_metadata(&entry) else {
                continue;
            };
            let Some(relative_path) = pathdiff::diff_paths(entry.path(), project_root) else {
                log::warn!("Could not get relative path for: {}", entry.path().display());
                continue;
            };
            let relative = relative_key(&relative_path);
            let size = match metadata {
                Ok(meta) if meta.is_file() => meta.len(),
                Ok(_) => {
                    self.skip(relative, SkipReason::NotRegularFile);
                    continue;
                }
                Err(e) => {
                    self.skip(relative, SkipReason::Unreadable(e.to_string()));
                    continue;
                }
            };
            self.process_file(entry.path(), relative, size)?;
        }

        self.out.flush().map_err(|e| match &self.destination {
            Some(dest) => AppError::FileWrite {
                path: dest.clone(),
                source: e,
            },
            None => AppError::Io(e),
        })?;

        if !self.report.skipped.is_empty() {
            log::info!("Skipped files: {}", self.report.skipped.len());
            log::debug!("Skipped: {}", self.report.skipped.join(", "));
        }
        log::info!("Included files: {}", self.report.included.len());
        log::debug!("Included: {}", self.report.included.join(", "));
        Ok((self.report, self.out))
    }
}

/// Streams the export of `project_root` into `out`.
pub fn export_to_writer<W: Write>(
    project_root: &Path,
    rules: &ExportRules,
    selection: &ExportSelection,
    limits: ExportLimits,
    out: W,
) -> Result<ExportReport> {
    let root = ensure_project_root(project_root)?;
    let exporter = Exporter {
        rules,
        selection,
        limits,
        destination: None,
        out,
        report: ExportReport::default(),
    };
    exporter.run(&root).map(|(report, _)| report)
}

/// Exports `project_root` into the file at `output_path`, creating parent
/// directories. Only a destination that cannot be opened or written fails the
/// run; per-file problems end up in [`ExportReport::skipped`].
pub fn export_project(
    project_root: &Path,
    rules: &ExportRules,
    selection: &ExportSelection,
    limits: ExportLimits,
    output_path: &Path,
) -> Result<ExportReport> {
    let root = ensure_project_root(project_root)?;
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| AppError::DirCreation {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }
    let file = File::create(output_path).map_err(|e| AppError::FileWrite {
        path: output_path.to_path_buf(),
        source: e,
    })?;
    let destination = output_path
        .canonicalize()
        .unwrap_or_else(|_| output_path.to_path_buf());
    log::info!(
        "Exporting {} to {}",
        root.display(),
        destination.display()
    );

    let exporter = Exporter {
        rules,
        selection,
        limits,
        destination: Some(destination),
        out: BufWriter::new(file),
        report: ExportReport::default(),
    };
    exporter.run(&root).map(|(report, _)| report)
}

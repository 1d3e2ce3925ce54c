use crate::error::{AppError, Result};
use crate::export::{
    ExportRules, ExportSelection, ensure_project_root, is_file_entry, relative_key, walk_project,
};
use log;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Directory,
    File,
}

/// One selectable row of the project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub kind: EntryKind,
    pub path: PathBuf,
    /// `/`-separated path relative to the project root.
    pub relative: String,
    /// Number of directories between the root and this entry.
    pub depth: usize,
}

impl TreeEntry {
    pub fn label(&self) -> String {
        let indent = "  ".repeat(self.depth);
        match self.kind {
            EntryKind::Directory => format!("{}{}/", indent, self.relative),
            EntryKind::File => format!("{}{}", indent, self.relative),
        }
    }
}

/// What the user picked from the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pick {
    EntireProject,
    Entry(TreeEntry),
}

/// Directories and extension-matching files of the project in sorted
/// depth-first order. Excluded directories and anything below `max_depth`
/// are left out.
pub fn build_project_tree(project_root: &Path, rules: &ExportRules) -> Result<Vec<TreeEntry>> {
    let root = ensure_project_root(project_root)?;
    log::debug!("Building project tree for {}", root.display());
    let mut entries = Vec::new();
    for entry_result in walk_project(&root, rules) {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("{}", AppError::from(e));
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let kind = if entry.file_type().is_dir() {
            if rules.max_depth.is_some_and(|max| entry.depth() > max) {
                continue;
            }
            EntryKind::Directory
        } else if is_file_entry(&entry)
            && rules.matches_extension(&entry.file_name().to_string_lossy())
        {
            EntryKind::File
        } else {
            continue;
        };
        let Some(relative_path) = pathdiff::diff_paths(entry.path(), &root) else {
            continue;
        };
        entries.push(TreeEntry {
            kind,
            path: entry.path().to_path_buf(),
            relative: relative_key(&relative_path),
            depth: entry.depth() - 1,
        });
    }
    log::debug!("Project tree has {} entries", entries.len());
    Ok(entries)
}

/// Turns picked tree rows into an export selection.
///
/// A directory contributes every matching file beneath it, pruning excluded
/// directories. Picking the entire project wins over everything else.
pub fn expand_selection(
    project_root: &Path,
    rules: &ExportRules,
    picks: &[Pick],
) -> Result<ExportSelection> {
    let root = ensure_project_root(project_root)?;
    let mut selected = BTreeSet::new();
    for pick in picks {
        let entry = match pick {
            Pick::EntireProject => return Ok(ExportSelection::Entire),
            Pick::Entry(entry) => entry,
        };
        match entry.kind {
            EntryKind::File => {
                selected.insert(entry.relative.clone());
            }
            EntryKind::Directory => {
                let dir_rules = ExportRules {
                    max_depth: None,
                    ..rules.clone()
                };
                for file_result in walk_project(&entry.path, &dir_rules) {
                    let Ok(file) = file_result else { continue };
                    if !is_file_entry(&file)
                        || !rules.matches_extension(&file.file_name().to_string_lossy())
                    {
                        continue;
                    }
                    if let Some(relative_path) = pathdiff::diff_paths(file.path(), &root) {
                        let key = relative_key(&relative_path);
                        log::debug!("Added file from directory: {}", key);
                        selected.insert(key);
                    }
                }
            }
        }
    }
    Ok(ExportSelection::Paths(selected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for rel in ["main.py", "README.md", "app/views.py", "app/venv/lib.py", "app/sub/models.py"] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }
        temp_dir
    }

    fn rules(max_depth: Option<usize>) -> ExportRules {
        ExportRules::new(&[".py".into()], &["venv".into()], max_depth)
    }

    #[test]
    fn test_tree_lists_dirs_and_matching_files() {
        let temp_dir = fixture();
        let tree = build_project_tree(temp_dir.path(), &rules(None)).unwrap();
        let labels: Vec<String> = tree.iter().map(TreeEntry::label).collect();
        assert_eq!(
            labels,
            vec!["app/", "  app/sub/", "    app/sub/models.py", "  app/views.py", "main.py"]
        );
    }

    #[test]
    fn test_tree_respects_max_depth() {
        let temp_dir = fixture();
        let tree = build_project_tree(temp_dir.path(), &rules(Some(0))).unwrap();
        let rel: Vec<&str> = tree.iter().map(|e| e.relative.as_str()).collect();
        assert_eq!(rel, vec!["main.py"]);
    }

    #[test]
    fn test_expand_directory_pick() {
        let temp_dir = fixture();
        let tree = build_project_tree(temp_dir.path(), &rules(None)).unwrap();
        let app = tree.iter().find(|e| e.relative == "app").unwrap().clone();
        let main = tree.iter().find(|e| e.relative == "main.py").unwrap().clone();

        let selection =
            expand_selection(temp_dir.path(), &rules(None), &[Pick::Entry(app), Pick::Entry(main)])
                .unwrap();
        assert_eq!(
            selection,
            ExportSelection::from_paths(["app/sub/models.py", "app/views.py", "main.py"])
        );
    }

    #[test]
    fn test_entire_project_pick_wins() {
        let temp_dir = fixture();
        let tree = build_project_tree(temp_dir.path(), &rules(None)).unwrap();
        let picks = vec![Pick::Entry(tree[0].clone()), Pick::EntireProject];
        assert_eq!(
            expand_selection(temp_dir.path(), &rules(None), &picks).unwrap(),
            ExportSelection::Entire
        );
    }
}

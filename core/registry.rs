use crate::config::{Config, StackRule, default_scan_dirs, expand_path};
use crate::error::{AppError, Result};
use indexmap::IndexMap;
use log;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Projects found during discovery, grouped by stack name then project name.
pub type DiscoveredProjects = IndexMap<String, IndexMap<String, PathBuf>>;

/// Subdirectory depth searched by default: immediate children of each root.
pub const DEFAULT_DISCOVERY_DEPTH: usize = 1;

/// Replacement lists for `edit_stack`. `None` or an empty list keeps the
/// current value.
#[derive(Debug, Clone, Default)]
pub struct StackEdit {
    pub extensions: Option<Vec<String>>,
    pub exclude_dirs: Option<Vec<String>>,
    pub signature_files: Option<Vec<String>>,
}

/// Outcome of registering a project manually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectAdded {
    pub path: PathBuf,
    /// What `detect_stack` reports for the directory.
    pub detected: Option<String>,
}

impl ProjectAdded {
    pub fn matches(&self, stack_name: &str) -> bool {
        self.detected.as_deref() == Some(stack_name)
    }
}

/// Splits a whitespace-separated answer into list items.
pub fn parse_list(text: &str) -> Vec<String> {
    text.split_whitespace().map(String::from).collect()
}

/// First stack, in declaration order, with a signature file present in `path`.
pub fn detect_stack<'a>(path: &Path, config: &'a Config) -> Option<&'a str> {
    for (stack_name, rule) in &config.stacks {
        for signature in &rule.signature_files {
            if path.join(signature).exists() {
                log::debug!(
                    "Found signature file {} in {} (stack: {})",
                    signature,
                    path.display(),
                    stack_name
                );
                return Some(stack_name.as_str());
            }
        }
    }
    log::debug!("No signature files found in {}", path.display());
    None
}

/// Searches each scan root for subdirectories that look like projects.
///
/// `depth` counts levels below the root (1 lists immediate subdirectories).
/// Missing roots and unreadable directories are logged and skipped. When two
/// directories share a name within a stack, the first one visited is kept.
pub fn discover_projects(roots: &[PathBuf], config: &Config, depth: usize) -> DiscoveredProjects {
    let mut found = DiscoveredProjects::new();
    for root in roots {
        if !root.is_dir() {
            log::warn!("Scan directory does not exist: {}", root.display());
            continue;
        }
        log::info!("Scanning directory: {}", root.display());
        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(depth.max(1))
            .follow_links(false)
            .sort_by_file_name();
        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("{}", AppError::from(e));
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(stack_name) = detect_stack(entry.path(), config) else {
                continue;
            };
            let project_name = entry.file_name().to_string_lossy().into_owned();
            log::info!(
                "Found project: {} (stack: {})",
                project_name,
                stack_name
            );
            found
                .entry(stack_name.to_string())
                .or_default()
                .entry(project_name)
                .or_insert_with(|| entry.path().to_path_buf());
        }
    }
    let total: usize = found.values().map(IndexMap::len).sum();
    if total == 0 {
        log::info!("No projects found in the scan directories");
    } else {
        log::info!("Found {} projects", total);
    }
    found
}

impl Config {
    /// Registers a new stack after the existing ones.
    pub fn create_stack(
        &mut self,
        name: &str,
        extensions: Vec<String>,
        exclude_dirs: Vec<String>,
        signature_files: Vec<String>,
    ) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidArgument(
                "Stack name cannot be empty".to_string(),
            ));
        }
        if self.stacks.contains_key(name) {
            return Err(AppError::StackExists(name.to_string()));
        }
        self.stacks.insert(
            name.to_string(),
            StackRule::new(extensions, exclude_dirs, signature_files),
        );
        log::info!("Stack '{}' created", name);
        Ok(())
    }

    pub fn edit_stack(&mut self, name: &str, edit: StackEdit) -> Result<()> {
        let rule = self.stack_mut(name)?;
        if let Some(extensions) = edit.extensions.filter(|v| !v.is_empty()) {
            rule.extensions = extensions;
        }
        if let Some(exclude_dirs) = edit.exclude_dirs.filter(|v| !v.is_empty()) {
            rule.exclude_dirs = exclude_dirs;
        }
        if let Some(signature_files) = edit.signature_files.filter(|v| !v.is_empty()) {
            rule.signature_files = signature_files;
        }
        log::info!("Stack '{}' updated", name);
        Ok(())
    }

    /// Registers `path` as `project_name` under `stack_name`.
    ///
    /// The directory is stored canonicalized. A project whose signature files
    /// point at another stack is still added; callers inspect
    /// [`ProjectAdded::matches`] to warn about it.
    pub fn add_project(
        &mut self,
        stack_name: &str,
        project_name: &str,
        path: &Path,
    ) -> Result<ProjectAdded> {
        let project_name = project_name.trim();
        if project_name.is_empty() {
            return Err(AppError::InvalidArgument(
                "Project name cannot be empty".to_string(),
            ));
        }
        if !path.is_dir() {
            return Err(AppError::InvalidProjectRoot(path.to_path_buf()));
        }
        let resolved = path.canonicalize()?;
        let detected = detect_stack(&resolved, self).map(String::from);

        let rule = self.stack_mut(stack_name)?;
        if rule.projects.contains_key(project_name) {
            return Err(AppError::ProjectExists {
                stack: stack_name.to_string(),
                project: project_name.to_string(),
            });
        }
        if detected.as_deref() != Some(stack_name) {
            log::warn!(
                "Project {} does not match stack {}. Detected stack: {}",
                project_name,
                stack_name,
                detected.as_deref().unwrap_or("none")
            );
        }
        rule.projects
            .insert(project_name.to_string(), resolved.clone());
        log::info!("Project '{}' added to stack {}", project_name, stack_name);
        Ok(ProjectAdded {
            path: resolved,
            detected,
        })
    }

    pub fn remove_project(&mut self, stack_name: &str, project_name: &str) -> Result<PathBuf> {
        let rule = self.stack_mut(stack_name)?;
        let removed = rule
            .projects
            .shift_remove(project_name)
            .ok_or_else(|| AppError::ProjectNotFound {
                stack: stack_name.to_string(),
                project: project_name.to_string(),
            })?;
        log::info!(
            "Project '{}' removed from stack {}",
            project_name,
            stack_name
        );
        Ok(removed)
    }

    /// Registers discovered projects that are not yet known. Stacks absent
    /// from the registry are ignored. Returns how many projects were added.
    pub fn merge_discovered(&mut self, found: &DiscoveredProjects) -> usize {
        let mut added = 0;
        for (stack_name, projects) in found {
            let Some(rule) = self.stacks.get_mut(stack_name) else {
                log::debug!("Discovered stack {} is not registered, skipping", stack_name);
                continue;
            };
            for (name, path) in projects {
                if !rule.projects.contains_key(name) {
                    rule.projects.insert(name.clone(), path.clone());
                    added += 1;
                }
            }
        }
        log::info!("Added {} discovered projects", added);
        added
    }

    /// Replaces the scan roots with the entries that exist on disk and
    /// returns the rejected ones. Falls back to the defaults when nothing
    /// valid is left.
    pub fn set_scan_dirs(&mut self, dirs: &[String]) -> Vec<String> {
        let mut valid = Vec::new();
        let mut rejected = Vec::new();
        for raw in dirs {
            let expanded = expand_path(raw);
            let resolved = expanded.canonicalize().unwrap_or(expanded);
            let as_string = resolved.to_string_lossy().into_owned();
            if resolved.is_dir() {
                valid.push(as_string);
            } else {
                rejected.push(as_string);
            }
        }
        if !rejected.is_empty() {
            log::warn!("Skipped missing scan directories: {}", rejected.join(", "));
        }
        self.scan_dirs = if valid.is_empty() {
            log::info!("No valid scan directories given, restoring defaults");
            default_scan_dirs()
        } else {
            valid
        };
        rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn two_node_stacks() -> Config {
        let mut config = Config::default();
        config.stacks.clear();
        config
            .create_stack(
                "Node A",
                vec![".js".into()],
                vec!["node_modules".into()],
                vec!["package.json".into()],
            )
            .unwrap();
        config
            .create_stack(
                "Node B",
                vec![".ts".into()],
                vec![],
                vec!["tsconfig.json".into(), "package.json".into()],
            )
            .unwrap();
        config
    }

    #[test]
    fn test_detect_single_signature() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("tsconfig.json"), "{}").unwrap();
        let config = two_node_stacks();
        assert_eq!(detect_stack(temp_dir.path(), &config), Some("Node B"));
    }

    #[test]
    fn test_detect_shared_signature_prefers_first_declared() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("package.json"), "{}").unwrap();
        let config = two_node_stacks();
        assert_eq!(detect_stack(temp_dir.path(), &config), Some("Node A"));
    }

    #[test]
    fn test_detect_none() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("README.md"), "hi").unwrap();
        assert_eq!(detect_stack(temp_dir.path(), &two_node_stacks()), None);
    }

    #[test]
    fn test_discover_groups_immediate_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("web")).unwrap();
        fs::write(root.join("web/package.json"), "{}").unwrap();
        fs::create_dir_all(root.join("api")).unwrap();
        fs::write(root.join("api/manage.py"), "").unwrap();
        fs::create_dir_all(root.join("notes")).unwrap();
        fs::create_dir_all(root.join("deep/inner")).unwrap();
        fs::write(root.join("deep/inner/manage.py"), "").unwrap();

        let config = Config::default();
        let found = discover_projects(&[root.to_path_buf()], &config, DEFAULT_DISCOVERY_DEPTH);

        assert_eq!(
            found["React + TypeScript (Vite)"].get("web"),
            Some(&root.join("web"))
        );
        assert_eq!(
            found["Python (Django)"].keys().collect::<Vec<_>>(),
            vec!["api"]
        );

        let nested = discover_projects(&[root.to_path_buf()], &config, 2);
        assert!(nested["Python (Django)"].contains_key("inner"));
    }

    #[test]
    fn test_discover_skips_missing_roots() {
        let temp_dir = TempDir::new().unwrap();
        let found = discover_projects(
            &[temp_dir.path().join("missing")],
            &Config::default(),
            DEFAULT_DISCOVERY_DEPTH,
        );
        assert!(found.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_continues_past_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let locked = temp_dir.path().join("archive");
        fs::create_dir_all(locked.join("old")).unwrap();
        fs::create_dir(temp_dir.path().join("shop")).unwrap();
        fs::write(temp_dir.path().join("shop/requirements.txt"), "").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // permissions are not enforced (running as root)
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let found = discover_projects(&[temp_dir.path().to_path_buf()], &Config::default(), 2);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let names: Vec<_> = found.values().flat_map(|p| p.keys().cloned()).collect();
        assert_eq!(names, vec!["shop"]);
        assert!(found["Python (Django)"].contains_key("shop"));
    }

    #[test]
    fn test_create_stack_validation() {
        let mut config = Config::default();
        assert!(matches!(
            config.create_stack("  ", vec![], vec![], vec![]),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            config.create_stack("Python (Django)", vec![], vec![], vec![]),
            Err(AppError::StackExists(_))
        ));
        config
            .create_stack("Rust", parse_list(".rs .toml"), parse_list("target"), parse_list("Cargo.toml"))
            .unwrap();
        assert_eq!(config.stack_names().last().map(String::as_str), Some("Rust"));
        assert_eq!(config.stack("Rust").unwrap().extensions, vec![".rs", ".toml"]);
    }

    #[test]
    fn test_edit_stack_keeps_fields_without_answers() {
        let mut config = Config::default();
        config
            .edit_stack(
                "Python (Django)",
                StackEdit {
                    extensions: Some(parse_list(".py .txt")),
                    exclude_dirs: Some(Vec::new()),
                    signature_files: None,
                },
            )
            .unwrap();
        let rule = config.stack("Python (Django)").unwrap();
        assert_eq!(rule.extensions, vec![".py", ".txt"]);
        assert_eq!(rule.exclude_dirs, vec!["venv", "__pycache__", ".git"]);
        assert_eq!(rule.signature_files, vec!["manage.py", "requirements.txt"]);

        assert!(matches!(
            config.edit_stack("Nope", StackEdit::default()),
            Err(AppError::StackNotFound(_))
        ));
    }

    #[test]
    fn test_add_and_remove_project() {
        let temp_dir = TempDir::new().unwrap();
        let project = temp_dir.path().join("shop");
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("manage.py"), "").unwrap();

        let mut config = Config::default();
        let added = config
            .add_project("Python (Django)", "shop", &project)
            .unwrap();
        assert!(added.matches("Python (Django)"));
        assert_eq!(
            config.project_path("Python (Django)", "shop").unwrap(),
            project.canonicalize().unwrap()
        );

        assert!(matches!(
            config.add_project("Python (Django)", "shop", &project),
            Err(AppError::ProjectExists { .. })
        ));

        let mismatch = config
            .add_project("React + TypeScript (Vite)", "shop", &project)
            .unwrap();
        assert!(!mismatch.matches("React + TypeScript (Vite)"));

        config.remove_project("Python (Django)", "shop").unwrap();
        assert!(matches!(
            config.remove_project("Python (Django)", "shop"),
            Err(AppError::ProjectNotFound { .. })
        ));
    }

    #[test]
    fn test_add_project_rejects_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        assert!(matches!(
            config.add_project("Python (Django)", "ghost", &temp_dir.path().join("ghost")),
            Err(AppError::InvalidProjectRoot(_))
        ));
    }

    #[test]
    fn test_merge_discovered_only_adds_new_projects() {
        let mut config = Config::default();
        config
            .stack_mut("Python (Django)")
            .unwrap()
            .projects
            .insert("api".into(), PathBuf::from("/old/api"));

        let mut found = DiscoveredProjects::new();
        let py = found.entry("Python (Django)".to_string()).or_default();
        py.insert("api".into(), PathBuf::from("/new/api"));
        py.insert("blog".into(), PathBuf::from("/new/blog"));
        found
            .entry("Unknown".to_string())
            .or_default()
            .insert("x".into(), PathBuf::from("/x"));

        assert_eq!(config.merge_discovered(&found), 1);
        let projects = &config.stack("Python (Django)").unwrap().projects;
        assert_eq!(projects["api"], PathBuf::from("/old/api"));
        assert_eq!(projects["blog"], PathBuf::from("/new/blog"));
    }

    #[test]
    fn test_set_scan_dirs_filters_missing() {
        let temp_dir = TempDir::new().unwrap();
        let existing = temp_dir.path().to_string_lossy().into_owned();
        let missing = temp_dir.path().join("nope").to_string_lossy().into_owned();

        let mut config = Config::default();
        let rejected = config.set_scan_dirs(&[existing.clone(), missing.clone()]);
        assert_eq!(rejected, vec![missing.clone()]);
        assert_eq!(config.scan_dirs.len(), 1);

        let rejected = config.set_scan_dirs(&[missing]);
        assert_eq!(rejected.len(), 1);
        assert_eq!(config.scan_dirs, default_scan_dirs());
    }
}

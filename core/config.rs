use crate::error::{AppError, Result};
use indexmap::IndexMap;
use log;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILENAME: &str = ".code_export_configs.json";
pub const DEFAULT_OUTPUT_FILENAME: &str = "exported_code.txt";
pub const CONFIG_PATH_ENV: &str = "CODE_EXPORT_CONFIG";

const DEFAULT_SCAN_SUBDIRS: [&str; 4] = ["Projects", "Dev", "Work", "Code"];

/// The persisted registry document: stack rules keyed by name plus scan roots.
///
/// Stack order is significant. Detection walks `stacks` in declaration order
/// and the first stack whose signature file is present wins, so the map keeps
/// insertion order through load and save.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub stacks: IndexMap<String, StackRule>,
    #[serde(default = "default_scan_dirs")]
    pub scan_dirs: Vec<String>,
    /// Top-level fields this version does not interpret. Written back as-is.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct StackRule {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
    #[serde(default)]
    pub signature_files: Vec<String>,
    #[serde(default)]
    pub projects: IndexMap<String, PathBuf>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl StackRule {
    pub fn new(
        extensions: Vec<String>,
        exclude_dirs: Vec<String>,
        signature_files: Vec<String>,
    ) -> Self {
        Self {
            extensions,
            exclude_dirs,
            signature_files,
            projects: IndexMap::new(),
            extra: IndexMap::new(),
        }
    }

    fn normalize(&mut self) {
        normalize_list(&mut self.extensions);
        normalize_list(&mut self.exclude_dirs);
        normalize_list(&mut self.signature_files);
        self.projects.retain(|name, _| !name.trim().is_empty());
    }
}

fn normalize_list(items: &mut Vec<String>) {
    for item in items.iter_mut() {
        let trimmed = item.trim();
        if trimmed.len() != item.len() {
            *item = trimmed.to_string();
        }
    }
    items.retain(|item| !item.is_empty());
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn default_scan_dirs() -> Vec<String> {
    let mut dirs_out = Vec::new();
    if let Some(home) = dirs::home_dir() {
        for sub in DEFAULT_SCAN_SUBDIRS {
            dirs_out.push(home.join(sub).to_string_lossy().into_owned());
        }
    }
    if let Ok(cwd) = env::current_dir() {
        dirs_out.push(cwd.to_string_lossy().into_owned());
    }
    dirs_out
}

impl Default for Config {
    fn default() -> Self {
        let mut stacks = IndexMap::new();
        stacks.insert(
            "React + TypeScript (Vite)".to_string(),
            StackRule::new(
                strings(&[
                    ".ts", ".tsx", ".js", ".jsx", ".css", ".scss", ".html", ".json", ".d.ts",
                ]),
                strings(&["node_modules", "dist", ".git", ".vite"]),
                strings(&["vite.config.ts", "vite.config.js", "package.json"]),
            ),
        );
        stacks.insert(
            "Python (Django)".to_string(),
            StackRule::new(
                strings(&[".py", ".html", ".css", ".js"]),
                strings(&["venv", "__pycache__", ".git"]),
                strings(&["manage.py", "requirements.txt"]),
            ),
        );
        Self {
            stacks,
            scan_dirs: default_scan_dirs(),
            extra: IndexMap::new(),
        }
    }
}

/// Expands a leading `~` to the home directory.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw.trim()).as_ref())
}

impl Config {
    /// Config path precedence: explicit CLI value, then `CODE_EXPORT_CONFIG`,
    /// then `~/.code_export_configs.json`.
    pub fn resolve_config_path(cli_config_file: Option<&String>) -> Result<PathBuf> {
        let from_env = env::var(CONFIG_PATH_ENV).ok().filter(|s| !s.is_empty());
        match cli_config_file.cloned().or(from_env) {
            Some(p) => {
                let path = expand_path(&p);
                log::debug!("Using config file path: {}", path.display());
                Ok(path)
            }
            None => {
                let home = dirs::home_dir().ok_or_else(|| {
                    AppError::Config("Could not determine the home directory".to_string())
                })?;
                let path = home.join(DEFAULT_CONFIG_FILENAME);
                log::debug!("Using default config file path: {}", path.display());
                Ok(path)
            }
        }
    }

    /// Loads the document at `config_path`. A missing, unreadable or corrupt
    /// file yields the in-memory defaults; nothing is written until a mutation.
    pub fn load_or_default(config_path: &Path) -> Self {
        if !config_path.exists() {
            log::info!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Config::default();
        }
        match Config::load_from_path(config_path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{}. Falling back to default configuration.", e);
                Config::default()
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let content = fs::read_to_string(config_path).map_err(|e| AppError::ConfigRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        let mut config: Config =
            serde_json::from_str(&content).map_err(|e| AppError::ConfigParse {
                path: config_path.to_path_buf(),
                source: e,
            })?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| AppError::DirCreation {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        fs::write(config_path, content).map_err(|e| AppError::ConfigWrite {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        log::info!("Configuration saved to {}", config_path.display());
        Ok(())
    }

    /// Load-time schema check: stacks with blank names are dropped, list
    /// entries are trimmed and blanks removed.
    fn normalize(&mut self) {
        self.stacks.retain(|name, _| {
            let keep = !name.trim().is_empty();
            if !keep {
                log::warn!("Ignoring stack with an empty name in configuration");
            }
            keep
        });
        for rule in self.stacks.values_mut() {
            rule.normalize();
        }
        normalize_list(&mut self.scan_dirs);
    }

    pub fn stack(&self, name: &str) -> Result<&StackRule> {
        self.stacks
            .get(name)
            .ok_or_else(|| AppError::StackNotFound(name.to_string()))
    }

    pub fn stack_mut(&mut self, name: &str) -> Result<&mut StackRule> {
        self.stacks
            .get_mut(name)
            .ok_or_else(|| AppError::StackNotFound(name.to_string()))
    }

    pub fn stack_names(&self) -> Vec<String> {
        self.stacks.keys().cloned().collect()
    }

    pub fn expanded_scan_dirs(&self) -> Vec<PathBuf> {
        self.scan_dirs.iter().map(|d| expand_path(d)).collect()
    }

    /// Resolves a registered project to its directory.
    pub fn project_path(&self, stack_name: &str, project: &str) -> Result<PathBuf> {
        let rule = self.stack(stack_name)?;
        rule.projects
            .get(project)
            .cloned()
            .ok_or_else(|| AppError::ProjectNotFound {
                stack: stack_name.to_string(),
                project: project.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_has_builtin_stacks_in_order() {
        let config = Config::default();
        let names = config.stack_names();
        assert_eq!(names, vec!["React + TypeScript (Vite)", "Python (Django)"]);
        let py = config.stack("Python (Django)").unwrap();
        assert!(py.extensions.contains(&".py".to_string()));
        assert!(py.projects.is_empty());
    }

    #[test]
    fn test_missing_file_gives_defaults_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cfg.json");
        let config = Config::load_or_default(&path);
        assert_eq!(config.stacks.len(), 2);
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cfg.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Config::load_from_path(&path),
            Err(AppError::ConfigParse { .. })
        ));
        let config = Config::load_or_default(&path);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unknown_fields_and_order_survive_save() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cfg.json");
        fs::write(
            &path,
            r#"{
  "stacks": {
    "Zeta": {"extensions": [".z"], "exclude_dirs": [], "signature_files": ["z.lock"], "projects": {}, "color": "red"},
    "Alpha": {"extensions": [".a"], "exclude_dirs": [], "signature_files": ["a.lock"], "projects": {}}
  },
  "scan_dirs": ["/tmp"],
  "theme": {"dark": true}
}"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.stack_names(), vec!["Zeta", "Alpha"]);
        assert_eq!(config.extra.get("theme"), Some(&serde_json::json!({"dark": true})));

        let out = temp_dir.path().join("nested").join("out.json");
        config.save(&out).unwrap();
        let reloaded = Config::load_from_path(&out).unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(
            reloaded.stack("Zeta").unwrap().extra.get("color"),
            Some(&serde_json::json!("red"))
        );
    }

    #[test]
    fn test_load_normalizes_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cfg.json");
        fs::write(
            &path,
            r#"{"stacks": {" ": {}, "Go": {"extensions": [" .go ", ""], "signature_files": ["go.mod"]}}}"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.stack_names(), vec!["Go"]);
        assert_eq!(config.stack("Go").unwrap().extensions, vec![".go"]);
        // scan_dirs absent from the document falls back to the defaults
        assert_eq!(config.scan_dirs, default_scan_dirs());
    }

    #[test]
    fn test_save_keeps_non_ascii_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cfg.json");
        let mut config = Config::default();
        config
            .stacks
            .insert("Проект".to_string(), StackRule::default());
        config.save(&path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Проект"));
        assert!(raw.contains("\n  \"stacks\""));
    }

    #[test]
    fn test_project_path_lookup_errors() {
        let config = Config::default();
        assert!(matches!(
            config.project_path("Nope", "x"),
            Err(AppError::StackNotFound(_))
        ));
        assert!(matches!(
            config.project_path("Python (Django)", "x"),
            Err(AppError::ProjectNotFound { .. })
        ));
    }
}

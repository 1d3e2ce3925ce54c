use crate::prompt::{Answer, Prompter};
use anyhow::Result;
use codexport_core::{
    self as core, Config, DEFAULT_DISCOVERY_DEPTH, DEFAULT_OUTPUT_FILENAME, DiscoveredProjects,
    ExportLimits, ExportRules, Pick, StackEdit, config::expand_path, parse_list,
};
use colored::*;
use log;
use std::path::{Path, PathBuf};

/// Screens of the interactive menu. Every screen has a parent reached by the
/// `Back` answer; backing out of `Main` exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Main,
    ExportPickStack,
    ExportPickProject { stack: String },
    ExportChooseFiles { stack: String, root: PathBuf },
    Configs,
    CreateStack,
    PickStackToEdit,
    EditStack { stack: String },
    EditStackRules { stack: String },
    AddProject { stack: String },
    RemoveProject { stack: String },
    ScanStack { stack: String },
    Discover,
    ScanDirs,
    Exit,
}

impl Screen {
    pub fn parent(&self) -> Screen {
        match self {
            Screen::Main | Screen::Exit => Screen::Exit,
            Screen::ExportPickStack | Screen::Configs | Screen::Discover | Screen::ScanDirs => {
                Screen::Main
            }
            Screen::ExportPickProject { .. } => Screen::ExportPickStack,
            Screen::ExportChooseFiles { stack, .. } => Screen::ExportPickProject {
                stack: stack.clone(),
            },
            Screen::CreateStack | Screen::PickStackToEdit | Screen::EditStack { .. } => {
                Screen::Configs
            }
            Screen::EditStackRules { stack }
            | Screen::AddProject { stack }
            | Screen::RemoveProject { stack }
            | Screen::ScanStack { stack } => Screen::EditStack {
                stack: stack.clone(),
            },
        }
    }
}

/// Unwraps a prompt answer or leaves the current screen for its parent.
macro_rules! answer_or_back {
    ($answer:expr, $screen:expr) => {
        match $answer {
            Answer::Value(v) => v,
            Answer::Back => return Ok($screen.parent()),
        }
    };
}

pub struct Menu<'p, P: Prompter> {
    config: Config,
    config_path: PathBuf,
    prompter: &'p mut P,
}

impl<'p, P: Prompter> Menu<'p, P> {
    pub fn new(config: Config, config_path: PathBuf, prompter: &'p mut P) -> Self {
        Self {
            config,
            config_path,
            prompter,
        }
    }

    /// Drives the menu until the user exits and hands back the final config.
    pub fn run(mut self) -> Result<Config> {
        let mut screen = Screen::Main;
        while screen != Screen::Exit {
            log::debug!("Menu screen: {:?}", screen);
            screen = self.step(screen)?;
        }
        log::debug!("Menu exited");
        Ok(self.config)
    }

    fn step(&mut self, screen: Screen) -> Result<Screen> {
        match &screen {
            Screen::Main => self.main_menu(&screen),
            Screen::ExportPickStack => self.export_pick_stack(&screen),
            Screen::ExportPickProject { stack } => self.export_pick_project(&screen, stack),
            Screen::ExportChooseFiles { stack, root } => {
                self.export_choose_files(&screen, stack, root)
            }
            Screen::Configs => self.configs_menu(&screen),
            Screen::CreateStack => self.create_stack(&screen),
            Screen::PickStackToEdit => self.pick_stack_to_edit(&screen),
            Screen::EditStack { stack } => self.edit_stack_menu(&screen, stack),
            Screen::EditStackRules { stack } => self.edit_stack_rules(&screen, stack),
            Screen::AddProject { stack } => self.add_project(&screen, stack),
            Screen::RemoveProject { stack } => self.remove_project(&screen, stack),
            Screen::ScanStack { stack } => self.scan_stack(&screen, stack),
            Screen::Discover => self.discover(&screen),
            Screen::ScanDirs => self.scan_dirs(&screen),
            Screen::Exit => Ok(Screen::Exit),
        }
    }

    /// Writes the config after a mutation. A failed save is reported but the
    /// session keeps the in-memory state.
    fn persist(&mut self) -> Result<()> {
        if let Err(e) = self.config.save(&self.config_path) {
            log::error!("Failed to save configuration: {}", e);
            self.warn(&format!("Failed to save configuration: {}", e))?;
        }
        Ok(())
    }

    fn success(&mut self, text: &str) -> Result<()> {
        self.prompter
            .message(&format!("{} {}", "✅".green(), text))
    }

    fn warn(&mut self, text: &str) -> Result<()> {
        self.prompter
            .message(&format!("{} {}", "⚠️".yellow(), text))
    }

    fn pick_stack(&mut self, title: &str) -> Result<Answer<String>> {
        let names = self.config.stack_names();
        Ok(match self.prompter.select(title, &names, "[Back]")? {
            Answer::Value(i) => Answer::Value(names[i].clone()),
            Answer::Back => Answer::Back,
        })
    }

    fn main_menu(&mut self, screen: &Screen) -> Result<Screen> {
        let choices = [
            "Export code",
            "Manage configs",
            "Discover projects",
            "Scan settings",
        ]
        .map(String::from);
        let choice = answer_or_back!(
            self.prompter
                .select("Code Export - Main menu:", &choices, "[Exit]")?,
            screen
        );
        Ok(match choice {
            0 if self.config.stacks.is_empty() => {
                self.warn("No stacks available. Create one under 'Manage configs'.")?;
                Screen::Main
            }
            0 => Screen::ExportPickStack,
            1 => Screen::Configs,
            2 => Screen::Discover,
            _ => Screen::ScanDirs,
        })
    }

    fn export_pick_stack(&mut self, screen: &Screen) -> Result<Screen> {
        let stack = answer_or_back!(self.pick_stack("Choose a stack:")?, screen);
        Ok(Screen::ExportPickProject { stack })
    }

    fn export_pick_project(&mut self, screen: &Screen, stack: &str) -> Result<Screen> {
        let mut choices: Vec<String> = self.config.stack(stack)?.projects.keys().cloned().collect();
        let manual_index = choices.len();
        choices.push("Enter path manually".to_string());

        let choice = answer_or_back!(
            self.prompter
                .select("Choose a project:", &choices, "[Back to stacks]")?,
            screen
        );
        let root = if choice == manual_index {
            let raw = answer_or_back!(self.prompter.text("Project path:", "")?, screen);
            if raw.is_empty() {
                return Ok(screen.clone());
            }
            let path = expand_path(&raw);
            if !path.is_dir() {
                self.warn(&format!("Not a directory: {}", path.display()))?;
                return Ok(screen.clone());
            }
            path
        } else {
            self.config.project_path(stack, &choices[choice])?
        };
        Ok(Screen::ExportChooseFiles {
            stack: stack.to_string(),
            root,
        })
    }

    fn ask_max_depth(&mut self, screen: &Screen) -> Result<Answer<Option<usize>>> {
        loop {
            let raw = match self
                .prompter
                .text("Maximum directory depth (empty for the whole tree):", "")?
            {
                Answer::Value(raw) => raw,
                Answer::Back => return Ok(Answer::Back),
            };
            if raw.is_empty() {
                return Ok(Answer::Value(None));
            }
            match raw.parse::<usize>() {
                Ok(depth) => return Ok(Answer::Value(Some(depth))),
                Err(_) => {
                    log::debug!("Rejected depth '{}' on {:?}", raw, screen);
                    self.warn("Enter a non-negative number or leave empty.")?;
                }
            }
        }
    }

    fn export_choose_files(
        &mut self,
        screen: &Screen,
        stack: &str,
        root: &Path,
    ) -> Result<Screen> {
        let rule = self.config.stack(stack)?.clone();
        let tree_rules = ExportRules::from_stack(&rule, None);
        let tree = match core::build_project_tree(root, &tree_rules) {
            Ok(tree) => tree,
            Err(e) => {
                log::error!("Failed to read project tree: {}", e);
                self.warn(&format!("Failed to read project: {}", e))?;
                return Ok(screen.parent());
            }
        };

        let mut choices = vec!["Entire project".to_string()];
        choices.extend(tree.iter().map(|entry| entry.label()));
        let picked = answer_or_back!(
            self.prompter
                .multi_select("Select folders/files to export:", &choices)?,
            screen
        );
        let picks: Vec<Pick> = picked
            .into_iter()
            .map(|i| match i {
                0 => Pick::EntireProject,
                i => Pick::Entry(tree[i - 1].clone()),
            })
            .collect();
        let selection = core::expand_selection(root, &tree_rules, &picks)?;

        let max_depth = answer_or_back!(self.ask_max_depth(screen)?, screen);
        let output = answer_or_back!(
            self.prompter
                .text("Output file name:", DEFAULT_OUTPUT_FILENAME)?,
            screen
        );
        let output = if output.is_empty() {
            PathBuf::from(DEFAULT_OUTPUT_FILENAME)
        } else {
            expand_path(&output)
        };

        log::info!(
            "Exporting {} (stack {}), max depth {:?}",
            root.display(),
            stack,
            max_depth
        );
        let rules = ExportRules::from_stack(&rule, max_depth);
        match core::export_project(root, &rules, &selection, ExportLimits::default(), &output) {
            Ok(report) => {
                self.success(&format!(
                    "Exported {} files to {} ({} skipped, {} truncated)",
                    report.included.len(),
                    output.display(),
                    report.skipped.len(),
                    report.truncated.len()
                ))?;
            }
            Err(e) => {
                log::error!("Export failed: {}", e);
                self.warn(&format!("Export failed: {}", e))?;
            }
        }

        if self.prompter.confirm("Export another project?", false)? {
            Ok(Screen::ExportPickStack)
        } else {
            Ok(Screen::Main)
        }
    }

    fn configs_menu(&mut self, screen: &Screen) -> Result<Screen> {
        let choices = ["Create new stack", "Edit stack"].map(String::from);
        let choice = answer_or_back!(
            self.prompter.select("Manage configs:", &choices, "[Back]")?,
            screen
        );
        Ok(if choice == 0 {
            Screen::CreateStack
        } else {
            Screen::PickStackToEdit
        })
    }

    fn create_stack(&mut self, screen: &Screen) -> Result<Screen> {
        let name = loop {
            let name = answer_or_back!(self.prompter.text("Stack name:", "")?, screen);
            let name = name.trim().to_string();
            if name.is_empty() {
                return Ok(screen.parent());
            }
            if self.config.stacks.contains_key(&name) {
                self.warn(&format!("Stack '{}' already exists.", name))?;
                continue;
            }
            break name;
        };
        let extensions = answer_or_back!(
            self.prompter
                .text("File extensions (space separated):", ".py .html .js .css")?,
            screen
        );
        let exclude_dirs = answer_or_back!(
            self.prompter
                .text("Directories to exclude (space separated):", "node_modules .git")?,
            screen
        );
        let signature_files = answer_or_back!(
            self.prompter
                .text("Signature files (space separated):", "package.json")?,
            screen
        );
        if extensions.is_empty() || exclude_dirs.is_empty() || signature_files.is_empty() {
            return Ok(screen.parent());
        }

        self.config.create_stack(
            &name,
            parse_list(&extensions),
            parse_list(&exclude_dirs),
            parse_list(&signature_files),
        )?;
        self.persist()?;
        self.success(&format!("Stack '{}' created", name))?;
        Ok(screen.parent())
    }

    fn pick_stack_to_edit(&mut self, screen: &Screen) -> Result<Screen> {
        let stack = answer_or_back!(self.pick_stack("Choose a stack to edit:")?, screen);
        Ok(Screen::EditStack { stack })
    }

    fn edit_stack_menu(&mut self, screen: &Screen, stack: &str) -> Result<Screen> {
        if self.config.stack(stack).is_err() {
            self.warn(&format!("Stack '{}' does not exist", stack))?;
            return Ok(screen.parent());
        }
        let choices = [
            "Edit stack rules",
            "Add project manually",
            "Remove project",
            "Scan folders",
        ]
        .map(String::from);
        let choice = answer_or_back!(
            self.prompter
                .select(&format!("Manage stack ({}):", stack), &choices, "[Back]")?,
            screen
        );
        let stack = stack.to_string();
        Ok(match choice {
            0 => Screen::EditStackRules { stack },
            1 => Screen::AddProject { stack },
            2 => Screen::RemoveProject { stack },
            _ => Screen::ScanStack { stack },
        })
    }

    fn edit_stack_rules(&mut self, screen: &Screen, stack: &str) -> Result<Screen> {
        let rule = self.config.stack(stack)?.clone();
        let extensions = answer_or_back!(
            self.prompter.text(
                "File extensions (space separated):",
                &rule.extensions.join(" ")
            )?,
            screen
        );
        let exclude_dirs = answer_or_back!(
            self.prompter.text(
                "Directories to exclude (space separated):",
                &rule.exclude_dirs.join(" ")
            )?,
            screen
        );
        let signature_files = answer_or_back!(
            self.prompter.text(
                "Signature files (space separated):",
                &rule.signature_files.join(" ")
            )?,
            screen
        );
        self.config.edit_stack(
            stack,
            StackEdit {
                extensions: Some(parse_list(&extensions)),
                exclude_dirs: Some(parse_list(&exclude_dirs)),
                signature_files: Some(parse_list(&signature_files)),
            },
        )?;
        self.persist()?;
        self.success(&format!("Stack '{}' updated", stack))?;
        Ok(screen.parent())
    }

    fn add_project(&mut self, screen: &Screen, stack: &str) -> Result<Screen> {
        let name = loop {
            let name = answer_or_back!(
                self.prompter
                    .text("Project name (empty to cancel):", "")?,
                screen
            );
            let name = name.trim().to_string();
            if name.is_empty() {
                self.prompter.message("Input cancelled")?;
                return Ok(screen.parent());
            }
            if self.config.stack(stack)?.projects.contains_key(&name) {
                self.warn(&format!("Project '{}' already exists.", name))?;
                continue;
            }
            break name;
        };
        let path = loop {
            let raw = answer_or_back!(self.prompter.text("Project path:", "")?, screen);
            if raw.is_empty() {
                self.prompter.message("Input cancelled")?;
                return Ok(screen.parent());
            }
            let path = expand_path(&raw);
            if path.is_dir() {
                break path;
            }
            self.warn(&format!("Not a directory: {}", path.display()))?;
        };

        let detected = core::detect_stack(&path, &self.config).map(String::from);
        if detected.as_deref() != Some(stack) {
            self.warn(&format!(
                "The project has no signature files of stack {} (detected: {}). It can still be added.",
                stack,
                detected.as_deref().unwrap_or("none")
            ))?;
            if !self.prompter.confirm("Continue adding the project?", false)? {
                return Ok(screen.parent());
            }
        }

        match self.config.add_project(stack, &name, &path) {
            Ok(_) => {
                self.persist()?;
                self.success(&format!("Project '{}' added", name))?;
            }
            Err(e) => {
                log::error!("Failed to add project: {}", e);
                self.warn(&format!("Failed to add project: {}", e))?;
            }
        }
        Ok(screen.parent())
    }

    fn remove_project(&mut self, screen: &Screen, stack: &str) -> Result<Screen> {
        let projects: Vec<String> = self.config.stack(stack)?.projects.keys().cloned().collect();
        if projects.is_empty() {
            self.warn("No projects to remove")?;
            return Ok(screen.parent());
        }
        let choice = answer_or_back!(
            self.prompter
                .select("Choose a project to remove:", &projects, "[Back]")?,
            screen
        );
        self.config.remove_project(stack, &projects[choice])?;
        self.persist()?;
        self.success(&format!("Project '{}' removed", projects[choice]))?;
        Ok(screen.parent())
    }

    fn scan_stack(&mut self, screen: &Screen, stack: &str) -> Result<Screen> {
        let found = core::discover_projects(
            &self.config.expanded_scan_dirs(),
            &self.config,
            DEFAULT_DISCOVERY_DEPTH,
        );
        let Some(projects) = found.get(stack) else {
            self.warn("No new projects found")?;
            return Ok(screen.parent());
        };
        let mut only_this = DiscoveredProjects::new();
        only_this.insert(stack.to_string(), projects.clone());
        let added = self.config.merge_discovered(&only_this);
        self.persist()?;
        self.success(&format!("Added {} projects", added))?;
        Ok(screen.parent())
    }

    fn discover(&mut self, screen: &Screen) -> Result<Screen> {
        let found = core::discover_projects(
            &self.config.expanded_scan_dirs(),
            &self.config,
            DEFAULT_DISCOVERY_DEPTH,
        );
        if found.is_empty() {
            self.warn("No projects found")?;
            return Ok(screen.parent());
        }
        let total: usize = found.values().map(|p| p.len()).sum();
        let added = self.config.merge_discovered(&found);
        self.persist()?;
        self.success(&format!("Found {} projects, {} newly registered", total, added))?;
        Ok(screen.parent())
    }

    fn scan_dirs(&mut self, screen: &Screen) -> Result<Screen> {
        let current = self.config.scan_dirs.join(" ");
        let answer = answer_or_back!(
            self.prompter
                .text("Scan directories (space separated):", &current)?,
            screen
        );
        let rejected = self.config.set_scan_dirs(&parse_list(&answer));
        if !rejected.is_empty() {
            self.warn(&format!("Skipped missing directories: {}", rejected.join(", ")))?;
        }
        self.persist()?;
        self.success("Scan directories updated")?;
        Ok(screen.parent())
    }
}

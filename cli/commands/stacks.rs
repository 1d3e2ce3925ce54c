use crate::cli_args::{StackLists, StacksAction, StacksArgs};
use crate::output::{print_json, print_stack_details, print_stacks_table, print_success, print_warning};
use crate::save_config;
use anyhow::{Result, bail};
use codexport_core::{AppError, Config, StackEdit, config::expand_path, detect_stack};
use std::path::Path;

pub fn handle_stacks_command(
    args: StacksArgs,
    mut config: Config,
    config_path: &Path,
    quiet: bool,
) -> Result<()> {
    match args.action {
        StacksAction::List { json } => {
            if json {
                print_json(&config.stacks)?;
            } else {
                print_stacks_table(&config);
            }
            return Ok(());
        }
        StacksAction::Show { name } => return print_stack_details(&name, &config),
        StacksAction::Create { name, lists } => {
            if lists.extensions.is_empty() {
                bail!(AppError::InvalidArgument(
                    "A new stack needs at least one --ext".to_string()
                ));
            }
            config.create_stack(
                &name,
                lists.extensions,
                lists.exclude_dirs,
                lists.signature_files,
            )?;
            save_config(&config, config_path)?;
            print_success(&format!("Stack '{}' created", name.trim()), quiet);
        }
        StacksAction::Edit { name, lists } => {
            config.edit_stack(&name, stack_edit(lists))?;
            save_config(&config, config_path)?;
            print_success(&format!("Stack '{}' updated", name), quiet);
        }
        StacksAction::AddProject {
            stack,
            name,
            path,
            force,
        } => {
            let path = expand_path(&path.to_string_lossy());
            if !path.is_dir() {
                bail!(AppError::InvalidProjectRoot(path));
            }
            config.stack(&stack)?;
            let detected = detect_stack(&path, &config).map(String::from);
            if detected.as_deref() != Some(stack.as_str()) {
                let message = format!(
                    "{} does not look like a '{}' project (detected: {})",
                    path.display(),
                    stack,
                    detected.as_deref().unwrap_or("none")
                );
                if !force {
                    bail!(AppError::InvalidArgument(format!(
                        "{}; pass --force to add it anyway",
                        message
                    )));
                }
                print_warning(&message, quiet);
            }
            let added = config.add_project(&stack, &name, &path)?;
            save_config(&config, config_path)?;
            print_success(
                &format!(
                    "Project '{}' added to '{}' ({})",
                    name.trim(),
                    stack,
                    added.path.display()
                ),
                quiet,
            );
        }
        StacksAction::RemoveProject { stack, name } => {
            let removed = config.remove_project(&stack, &name)?;
            save_config(&config, config_path)?;
            print_success(
                &format!(
                    "Project '{}' removed from '{}' ({})",
                    name,
                    stack,
                    removed.display()
                ),
                quiet,
            );
        }
    }
    Ok(())
}

fn stack_edit(lists: StackLists) -> StackEdit {
    let non_empty = |v: Vec<String>| Some(v).filter(|v| !v.is_empty());
    StackEdit {
        extensions: non_empty(lists.extensions),
        exclude_dirs: non_empty(lists.exclude_dirs),
        signature_files: non_empty(lists.signature_files),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn run(action: StacksAction, config: Config, config_path: &Path) -> Result<()> {
        handle_stacks_command(StacksArgs { action }, config, config_path, true)
    }

    #[test]
    fn test_create_then_edit_persists() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("configs.json");

        run(
            StacksAction::Create {
                name: "Rust".to_string(),
                lists: StackLists {
                    extensions: vec![".rs".to_string()],
                    exclude_dirs: vec!["target".to_string()],
                    signature_files: vec!["Cargo.toml".to_string()],
                },
            },
            Config::default(),
            &config_path,
        )
        .unwrap();

        let saved = Config::load_from_path(&config_path).unwrap();
        assert_eq!(saved.stack_names().last().map(String::as_str), Some("Rust"));

        run(
            StacksAction::Edit {
                name: "Rust".to_string(),
                lists: StackLists {
                    extensions: vec![".rs".to_string(), ".toml".to_string()],
                    ..StackLists::default()
                },
            },
            saved,
            &config_path,
        )
        .unwrap();

        let saved = Config::load_from_path(&config_path).unwrap();
        let rule = saved.stack("Rust").unwrap();
        assert_eq!(rule.extensions, vec![".rs", ".toml"]);
        assert_eq!(rule.exclude_dirs, vec!["target"]);
    }

    #[test]
    fn test_add_project_requires_force_on_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("configs.json");
        let project = temp_dir.path().join("shop");
        fs::create_dir(&project).unwrap();
        fs::write(project.join("requirements.txt"), "django\n").unwrap();

        let add = |force| StacksAction::AddProject {
            stack: "React + TypeScript (Vite)".to_string(),
            name: "shop".to_string(),
            path: project.clone(),
            force,
        };

        let err = run(add(false), Config::default(), &config_path).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert!(!config_path.exists());

        run(add(true), Config::default(), &config_path).unwrap();
        let saved = Config::load_from_path(&config_path).unwrap();
        assert!(
            saved
                .stack("React + TypeScript (Vite)")
                .unwrap()
                .projects
                .contains_key("shop")
        );
    }

    #[test]
    fn test_remove_unknown_project_fails() {
        let temp_dir = TempDir::new().unwrap();
        let err = run(
            StacksAction::RemoveProject {
                stack: "Python (Django)".to_string(),
                name: "ghost".to_string(),
            },
            Config::default(),
            &temp_dir.path().join("configs.json"),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::ProjectNotFound { .. })
        ));
    }
}

use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::config_io::{self, STORE_DIR};

/// Tidy a directory name into a workspace name: hyphens and underscores
/// become spaces, words are title-cased.
fn tidy_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + chars.as_str()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn cmd_init(args: InitArgs, root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Note a parent workspace so nested ones are not created by accident
    if let Some(parent) = root.parent()
        && let Ok(parent_root) = config_io::discover_workspace(parent)
    {
        eprintln!(
            "Note: parent workspace found at {}/",
            parent_root.join(STORE_DIR).display()
        );
        eprintln!("Creating new workspace in ./{}/", STORE_DIR);
    }

    let name = args
        .name
        .unwrap_or_else(|| tidy_name(&config_io::infer_name(root)));
    if name.trim().is_empty() {
        return Err("workspace name cannot be empty".into());
    }

    let config = config_io::init_workspace(root, &name, args.force)?;
    tracing::info!(root = %root.display(), "initialized workspace");

    println!("Initialized leadboard workspace: {}", config.workspace.name);
    println!("  leads: {}.json", config.storage.leads_key);
    println!("  tasks: {}.json", config.storage.tasks_key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tidy_name_title_cases_words() {
        assert_eq!(tidy_name("acme-sales"), "Acme Sales");
        assert_eq!(tidy_name("q4_pipeline"), "Q4 Pipeline");
        assert_eq!(tidy_name("crm"), "Crm");
        assert_eq!(tidy_name("--x--"), "X");
    }
}

use std::path::PathBuf;

use clap::Subcommand;

use codebreak_core::{ExportFormat, Profile};

use super::AppContext;

#[derive(Subcommand)]
pub enum ProfileAction {
    /// List all profiles
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one profile (the current one by default)
    Show { name: Option<String> },
    /// Add a profile inheriting the current settings
    Add { name: String },
    /// Delete a profile (built-in presets require --force)
    Delete {
        name: String,
        /// Also allow deleting built-in presets
        #[arg(long)]
        force: bool,
    },
    /// Create a profile from bare durations with derived settings
    Quick {
        /// Work minutes
        #[arg(value_parser = clap::value_parser!(u32).range(1..=180))]
        work: u32,
        /// Break minutes
        #[arg(value_parser = clap::value_parser!(u32).range(1..=60))]
        break_minutes: u32,
        /// Profile name (derived from the durations when omitted)
        name: Option<String>,
    },
    /// Copy a profile under a new name
    Duplicate {
        src: String,
        new_name: Option<String>,
    },
    /// Switch the current profile
    Use { name: String },
    /// Write all profiles to a file
    Export {
        path: PathBuf,
        /// json or text
        #[arg(long, default_value = "json")]
        format: ExportFormat,
    },
    /// Read profiles from a file (json or text, auto-detected)
    Import {
        path: PathBuf,
        /// Replace the whole list instead of appending
        #[arg(long)]
        replace: bool,
    },
    /// Check all stored profiles for problems
    Validate,
}

pub fn run(action: ProfileAction, ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = ctx.registry.lock().expect("registry lock");

    match action {
        ProfileAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(registry.profiles())?);
            } else {
                let current = registry.current_profile().name.clone();
                for profile in registry.profiles() {
                    let marker = if profile.name == current { "*" } else { " " };
                    println!("{marker} {profile}");
                }
            }
        }
        ProfileAction::Show { name } => {
            let profile = match name {
                Some(ref name) => registry
                    .find(name)
                    .ok_or_else(|| format!("no profile named '{name}'"))?,
                None => registry.current_with_pending(),
            };
            println!("{}", serde_json::to_string_pretty(profile)?);
        }
        ProfileAction::Add { name } => {
            let added = registry.add_profile(&name)?;
            println!("added {added}");
        }
        ProfileAction::Delete { name, force } => {
            if force {
                registry.delete_profile(&name)?;
            } else {
                registry.safe_delete_profile(&name)?;
            }
            println!("deleted '{name}'");
        }
        ProfileAction::Quick {
            work,
            break_minutes,
            name,
        } => {
            let created =
                registry.create_quick_profile(work, break_minutes, name.as_deref())?;
            println!("created {created}");
        }
        ProfileAction::Duplicate { src, new_name } => {
            let copy = registry.duplicate_profile(&src, new_name.as_deref().unwrap_or(""))?;
            println!("duplicated '{src}' as {copy}");
        }
        ProfileAction::Use { name } => {
            if !registry.set_current_profile(&name) {
                return Err(format!("no profile named '{name}'").into());
            }
            println!("current profile: {name}");
        }
        ProfileAction::Export { path, format } => {
            registry.commit_pending();
            let profiles: Vec<Profile> = registry.profiles().to_vec();
            ctx.store.export_to_file(&profiles, &path, format)?;
            println!("exported {} profile(s) to {}", profiles.len(), path.display());
        }
        ProfileAction::Import { path, replace } => {
            let report = if replace {
                registry.replace_all_profiles(ctx.store.as_ref(), &path)
            } else {
                registry.import_profiles(ctx.store.as_ref(), &path)
            };
            println!("{}", report.message);
            if !report.success {
                return Err("import failed".into());
            }
            println!("added: {}, skipped: {}", report.added, report.skipped);
        }
        ProfileAction::Validate => {
            let issues = ctx.store.validate(registry.profiles());
            if issues.is_empty() {
                println!("all {} profile(s) valid", registry.profiles().len());
            } else {
                for issue in &issues {
                    println!("issue: {issue}");
                }
                return Err(format!("{} validation issue(s)", issues.len()).into());
            }
        }
    }

    Ok(())
}

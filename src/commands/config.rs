//! Config subcommands handler

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::{self, BufRead, Write};

use msgsift::config::migrate_config;
use msgsift::Config;

const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Show current configuration as TOML.
#[cfg(not(tarpaulin_include))]
pub fn handle_show() -> Result<()> {
    let config = Config::load()?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// Open configuration file in the default editor.
///
/// Uses $EDITOR environment variable (defaults to 'vi').
#[cfg(not(tarpaulin_include))]
pub fn handle_edit() -> Result<()> {
    let config_path = Config::config_path()?;

    if !config_path.exists() {
        Config::default().save()?;
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    println!("Opening {} with {}", config_path.display(), editor);

    std::process::Command::new(&editor)
        .arg(&config_path)
        .status()
        .with_context(|| format!("Failed to open editor '{}'", editor))?;

    Ok(())
}

/// Add missing fields to the config file.
///
/// Shows a preview of the added lines and asks before writing unless `yes`
/// is set. A missing file is created with full defaults.
#[cfg(not(tarpaulin_include))]
pub fn handle_migrate(yes: bool) -> Result<()> {
    let config_path = Config::config_path()?;
    let file_exists = config_path.exists();

    let content = if file_exists {
        fs::read_to_string(&config_path)?
    } else {
        String::new()
    };

    let result = migrate_config(&content)?;

    if !result.has_changes() {
        println!("Config is already up to date.");
        return Ok(());
    }

    if file_exists {
        let fields = result.added_fields.len();
        let sections = result.sections_added.len();
        if sections > 0 {
            println!(
                "Found {} missing field(s) in {} new section(s):",
                fields, sections
            );
        } else {
            println!("Found {} missing field(s):", fields);
        }
    } else {
        println!("Config file does not exist. Will create with default settings.");
    }
    println!();
    print!(
        "{}",
        diff_preview(
            &result.content,
            &result.added_fields,
            !file_exists,
            atty::is(atty::Stream::Stdout)
        )
    );
    println!();

    let action = if file_exists {
        format!("Apply these changes to {}?", config_path.display())
    } else {
        format!("Create {}?", config_path.display())
    };
    if !yes && !prompt_confirmation(&action)? {
        println!("No changes made.");
        return Ok(());
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&config_path, &result.content)
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    println!("Config written to {}", config_path.display());

    Ok(())
}

/// Render the lines of `new_content` that carry added fields, prefixed `+`.
///
/// For a new file every non-blank line counts as added.
fn diff_preview(
    new_content: &str,
    added_fields: &[String],
    is_new_file: bool,
    color: bool,
) -> String {
    let added: HashSet<&str> = added_fields.iter().map(String::as_str).collect();
    let (green, reset) = if color { (GREEN, RESET) } else { ("", "") };

    let mut out = String::new();
    let mut current_section = String::new();
    let mut pending_header: Option<&str> = None;

    for line in new_content.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            current_section = trimmed[1..trimmed.len() - 1].to_string();
            pending_header = Some(line);
            continue;
        }

        let is_added = match trimmed.find('=') {
            Some(eq_pos) => {
                let key = trimmed[..eq_pos].trim();
                is_new_file || added.contains(format!("{}.{}", current_section, key).as_str())
            }
            None => is_new_file && !trimmed.is_empty(),
        };

        if is_added {
            if let Some(header) = pending_header.take() {
                if is_new_file || new_section(&current_section, new_content, added_fields) {
                    out.push_str(&format!("{}+ {}{}\n", green, header, reset));
                } else {
                    out.push_str(&format!("  {}\n", header));
                }
            }
            out.push_str(&format!("{}+ {}{}\n", green, line, reset));
        }
    }

    out
}

/// A section is new when every key under it was added.
fn new_section(section: &str, content: &str, added_fields: &[String]) -> bool {
    let mut in_section = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            in_section = &trimmed[1..trimmed.len() - 1] == section;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some(eq_pos) = trimmed.find('=') {
            let field = format!("{}.{}", section, trimmed[..eq_pos].trim());
            if !added_fields.contains(&field) {
                return false;
            }
        }
    }
    true
}

/// Prompt user for yes/no confirmation.
///
/// Returns true if user confirms (y/yes), false otherwise.
/// If stdin is not a TTY (non-interactive), returns false.
fn prompt_confirmation(message: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        println!("Non-interactive mode: use --yes to apply changes automatically");
        return Ok(false);
    }

    print!("{} [y/N] ", message);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;

    let response = input.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}

//! Shared `.gitignore` patching logic.
//!
//! A project vault directory must never reach version control: the
//! vault dir gets its own `.gitignore` containing `*`, and the project
//! root `.gitignore` gains an entry for the directory.

use std::fs;
use std::path::Path;

use crate::cli::output;

/// Write `<vault_dir>/.gitignore` containing `*`.
pub fn write_vault_gitignore(vault_dir: &Path) {
    let _ = fs::write(vault_dir.join(".gitignore"), "*\n");
}

/// Append `entry` to `<project_dir>/.gitignore` if not already present.
///
/// Creates the file if it doesn't exist. Silently ignores write errors
/// (non-fatal — gitignore is a convenience, not a requirement).
pub fn patch_gitignore(project_dir: &Path, entry: &str) {
    let gitignore_path = project_dir.join(".gitignore");

    let existing = fs::read_to_string(&gitignore_path).unwrap_or_default();

    if existing.lines().any(|line| line.trim() == entry) {
        return;
    }

    let separator = if existing.ends_with('\n') || existing.is_empty() {
        ""
    } else {
        "\n"
    };

    if fs::write(&gitignore_path, format!("{existing}{separator}{entry}\n")).is_ok() {
        output::info(&format!("Added '{entry}' to .gitignore"));
    }
}

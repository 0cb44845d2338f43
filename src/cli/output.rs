//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::{RotationConfig, SecretMetadata, Sensitivity};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of secret metadata.  Values are never shown here;
/// the sensitivity column tells the reader why.
pub fn print_secrets_table(secrets: &[SecretMetadata]) {
    if secrets.is_empty() {
        info("No secrets in this vault yet.");
        tip("Run `secret-keeper set <NAME>` to add your first secret.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Kind", "Tags", "Updated", "Description"]);

    for s in secrets {
        let kind = match s.sensitivity {
            Sensitivity::Sensitive => "sensitive",
            Sensitivity::Credential => "credential",
        };
        table.add_row(vec![
            s.name.clone(),
            kind.to_string(),
            s.tags.join(", "),
            s.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            s.description.clone().unwrap_or_default(),
        ]);
    }

    println!("{table}");
}

/// Print a table of rotation configs.
pub fn print_rotation_table(configs: &[RotationConfig]) {
    if configs.is_empty() {
        info("No rotations configured.");
        tip("Run `secret-keeper rotation configure <NAME> --provider <TAG> --days <N>`.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Secret", "Provider", "Every", "Last", "Next", "Enabled"]);

    for c in configs {
        let fmt = |t: Option<chrono::DateTime<chrono::Utc>>| {
            t.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
        };
        table.add_row(vec![
            c.secret_name.clone(),
            c.provider.clone(),
            format!("{}d", c.schedule_days),
            fmt(c.last_rotated),
            fmt(c.next_rotation),
            if c.enabled { "yes" } else { "no" }.to_string(),
        ]);
    }

    println!("{table}");
}

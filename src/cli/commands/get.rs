//! `secret-keeper get` — print a secret's value.

use crate::cli::{open_unlocked, Cli};
use crate::errors::Result;

/// Execute the `get` command.  Prints the raw value so the output can
/// be piped; callers asked for it explicitly.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let store = open_unlocked(cli)?;
    let value = store.get_secret(name)?;
    println!("{value}");
    Ok(())
}

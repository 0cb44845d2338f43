//! Best-effort secure file erasure.
//!
//! Overwrites a regular file with random bytes for a configurable number
//! of passes, syncs, overwrites with zeros, syncs again, then unlinks.
//! Any failure falls back to a plain unlink.  None of this defends
//! against copy-on-write filesystems or SSD wear leveling; it raises the
//! bar for casual recovery, nothing more.

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use rand::RngCore;

/// Default number of random-overwrite passes.
pub const DEFAULT_PASSES: u32 = 3;

/// Securely erase a file.  Returns `true` if the full overwrite sequence
/// completed, `false` if it degraded to (or failed at) a plain unlink.
pub fn secure_erase(path: &Path, passes: u32) -> bool {
    match overwrite_file(path, passes) {
        Ok(()) => fs::remove_file(path).is_ok(),
        Err(_) => {
            // Overwrite failed partway; still try to unlink.
            let _ = fs::remove_file(path);
            false
        }
    }
}

fn overwrite_file(path: &Path, passes: u32) -> std::io::Result<()> {
    let meta = fs::metadata(path)?;
    if !meta.is_file() {
        return Err(std::io::Error::other("not a regular file"));
    }

    let len = usize::try_from(meta.len()).map_err(std::io::Error::other)?;
    let mut file = OpenOptions::new().write(true).open(path)?;

    let mut buf = vec![0u8; len];
    for _ in 0..passes {
        rand::rngs::OsRng.fill_bytes(&mut buf);
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&buf)?;
        file.sync_all()?;
    }

    buf.iter_mut().for_each(|b| *b = 0);
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&buf)?;
    file.sync_all()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn erase_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.txt");
        fs::write(&path, b"very secret contents").unwrap();

        assert!(secure_erase(&path, DEFAULT_PASSES));
        assert!(!path.exists());
    }

    #[test]
    fn erase_missing_file_returns_false() {
        let dir = TempDir::new().unwrap();
        assert!(!secure_erase(&dir.path().join("nope"), 1));
    }

    #[test]
    fn erase_directory_returns_false_and_keeps_it() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        assert!(!secure_erase(&sub, 1));
        assert!(sub.exists());
    }
}

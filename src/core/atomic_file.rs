//! Whole-file replacement through a sibling temporary file
//!
//! Readers either see the old contents or the new ones, never a truncated file.

use crate::types::LedgerError;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const TMP_SUFFIX: &str = "tmp";

/// Sibling path used while a rewrite is in flight (`ledger.csv` -> `ledger.csv.tmp`)
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

/// Create the parent directory of `path` if it is missing
pub fn ensure_parent(path: &Path) -> Result<(), LedgerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Replace the contents of `path` with `data`
///
/// The data is written and synced to a temporary sibling, which is then
/// renamed over the target. On failure the temporary file is removed and the
/// target is left untouched.
///
/// # Errors
///
/// Returns `LedgerError::Io` if the temporary file cannot be written or renamed.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), LedgerError> {
    ensure_parent(path)?;
    let tmp = tmp_path(path);

    let result = (|| -> Result<(), LedgerError> {
        let mut file = File::create(&tmp)?;
        file.write_all(data)?;
        file.flush()?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_tmp_path_appends_suffix() {
        assert_eq!(tmp_path(Path::new("data/ledger.csv")), PathBuf::from("data/ledger.csv.tmp"));
        assert_eq!(tmp_path(Path::new("ledger")), PathBuf::from("ledger.tmp"));
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("file.csv");

        write_atomic(&path, b"first\n").unwrap();
        write_atomic(&path, b"second\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
        assert!(!tmp_path(&path).exists());
    }
}

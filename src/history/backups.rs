//! Discovery of exported backup files.
//!
//! Exports are named `hearing-test-backup-<YYYY-MM-DD>.json`, so sorting
//! by file name sorts by export date.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::history::store::{BACKUP_EXTENSION, BACKUP_PREFIX};

/// Backup files directly inside `dir`, newest first.
///
/// A missing directory has no backups.
pub fn list_backups(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }

    let mut backups: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_EXTENSION)
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();

    backups.sort_by(|a, b| {
        let a_name = a.file_name().unwrap_or_default().to_string_lossy();
        let b_name = b.file_name().unwrap_or_default().to_string_lossy();
        b_name.cmp(&a_name)
    });

    backups
}

/// The most recent backup in `dir`
pub fn latest_backup(dir: &Path) -> Option<PathBuf> {
    list_backups(dir).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_missing_dir() {
        assert!(list_backups(Path::new("/nonexistent/backup/dir")).is_empty());
    }

    #[test]
    fn test_filters_and_sorts() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("hearing-test-backup-2024-01-05.json"), "[]").unwrap();
        fs::write(temp.path().join("hearing-test-backup-2024-03-01.json"), "[]").unwrap();
        fs::write(temp.path().join("hearing-test-results.json"), "[]").unwrap();
        fs::write(temp.path().join("hearing-test-backup-2024-02-01.txt"), "[]").unwrap();

        let names: Vec<String> = list_backups(temp.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(
            names,
            vec![
                "hearing-test-backup-2024-03-01.json".to_string(),
                "hearing-test-backup-2024-01-05.json".to_string(),
            ]
        );
        assert!(latest_backup(temp.path())
            .unwrap()
            .ends_with("hearing-test-backup-2024-03-01.json"));
    }
}

//! Reconciliation of current-state and version-history listings.
//!
//! Providers attach delete markers to object versions but not to folder
//! placeholder objects, so a soft-deleted folder is only visible as a common
//! prefix that the version-history listing still reports and the
//! current-state listing no longer does. The two listings paginate
//! independently and are not snapshot-isolated; under concurrent mutation a
//! folder can be misclassified. This is a documented best-effort heuristic,
//! not a correctness guarantee.

use crate::entry::{FileEntry, FolderContents, FolderEntry};

/// A folder's contents classified into live and soft-deleted entries.
#[derive(Debug, Clone, Default)]
pub struct ReconciledContents {
    /// Folders present in the current listing.
    pub folders: Vec<FolderEntry>,
    /// Folders only the version-history listing still knows about.
    pub deleted_folders: Vec<FolderEntry>,
    /// Files whose latest version is live.
    pub files: Vec<FileEntry>,
    /// Files whose latest version is a delete marker.
    pub deleted_files: Vec<FileEntry>,
}

/// Classify a folder's entries from its two listings.
///
/// `current` comes from the current-state listing, `history` from the
/// version-history listing of the same folder. Files are split on their
/// `deleted` flag (latest version is a delete marker); deleted folders are
/// the set difference of history common-prefixes minus current
/// common-prefixes. Every output group is stable-sorted case-insensitively
/// by name for display.
pub fn reconcile(current: &FolderContents, history: &FolderContents) -> ReconciledContents {
    let mut result = ReconciledContents {
        folders: current.folders.clone(),
        ..Default::default()
    };

    for folder in &history.folders {
        let seen_live = current
            .folders
            .iter()
            .any(|live| live.path() == folder.path());
        if !seen_live {
            result.deleted_folders.push(folder.clone());
        }
    }

    for file in &history.files {
        if file.deleted {
            result.deleted_files.push(file.clone());
        } else {
            result.files.push(file.clone());
        }
    }

    sort_folders(&mut result.folders);
    sort_folders(&mut result.deleted_folders);
    sort_files(&mut result.files);
    sort_files(&mut result.deleted_files);

    result
}

fn sort_folders(folders: &mut [FolderEntry]) {
    folders.sort_by(|a, b| a.name().to_lowercase().cmp(&b.name().to_lowercase()));
}

fn sort_files(files: &mut [FileEntry]) {
    files.sort_by(|a, b| a.name().to_lowercase().cmp(&b.name().to_lowercase()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FileVersion;
    use crate::path::RemotePath;
    use chrono::{TimeZone, Utc};

    fn folder(path: &str) -> FolderEntry {
        FolderEntry::new(RemotePath::parse(path)).unwrap()
    }

    fn file(path: &str, deleted: bool) -> FileEntry {
        let mut entry = FileEntry::new(RemotePath::parse(path)).unwrap();
        entry.deleted = deleted;
        entry.versions = vec![FileVersion {
            version_id: "v1".to_string(),
            last_modified: Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
            latest: true,
            delete_marker: deleted,
            download_link: None,
        }];
        entry
    }

    #[test]
    fn test_history_only_folder_is_deleted_exactly_once() {
        let current = FolderContents {
            folders: vec![folder("docs/live/")],
            files: vec![],
        };
        let history = FolderContents {
            folders: vec![folder("docs/live/"), folder("docs/gone/")],
            files: vec![],
        };

        let reconciled = reconcile(&current, &history);
        assert_eq!(reconciled.folders.len(), 1);
        assert_eq!(reconciled.folders[0].name(), "live");
        assert_eq!(reconciled.deleted_folders.len(), 1);
        assert_eq!(reconciled.deleted_folders[0].name(), "gone");

        // Never duplicated among the live folders.
        assert!(reconciled.folders.iter().all(|f| f.name() != "gone"));
    }

    #[test]
    fn test_files_split_on_delete_marker() {
        let current = FolderContents::default();
        let history = FolderContents {
            folders: vec![],
            files: vec![file("docs/kept.txt", false), file("docs/gone.txt", true)],
        };

        let reconciled = reconcile(&current, &history);
        assert_eq!(reconciled.files.len(), 1);
        assert_eq!(reconciled.files[0].name(), "kept.txt");
        assert_eq!(reconciled.deleted_files.len(), 1);
        assert_eq!(reconciled.deleted_files[0].name(), "gone.txt");
    }

    #[test]
    fn test_output_sorted_case_insensitively() {
        let current = FolderContents {
            folders: vec![folder("r/Zeta/"), folder("r/alpha/"), folder("r/Beta/")],
            files: vec![],
        };
        let history = FolderContents {
            folders: current.folders.clone(),
            files: vec![file("r/b.txt", false), file("r/A.txt", false)],
        };

        let reconciled = reconcile(&current, &history);
        let names: Vec<&str> = reconciled.folders.iter().map(|f| f.name()).collect();
        assert_eq!(names, ["alpha", "Beta", "Zeta"]);

        let file_names: Vec<&str> = reconciled.files.iter().map(|f| f.name()).collect();
        assert_eq!(file_names, ["A.txt", "b.txt"]);
    }
}

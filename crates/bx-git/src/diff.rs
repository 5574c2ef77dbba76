/// A single `git diff --name-status` change, before it is folded into a
/// [`GitDiff`]'s added/modified/deleted buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
    Added(String),
    Modified(String),
    Deleted(String),
    /// Rename from `old` to `new`; the caller expands this into a delete of
    /// `old` plus an add of `new`.
    Renamed { old: String, new: String },
    /// Copy to `new`; the caller expands this into an add of `new`.
    Copied { new: String },
    Unknown,
}

/// Diff of a feature branch against its base, bucketed by change kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GitDiff {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl GitDiff {
    pub fn from_changes(changes: Vec<ChangeStatus>) -> Self {
        let mut diff = GitDiff::default();
        for change in changes {
            match change {
                ChangeStatus::Added(p) => diff.added.push(p),
                ChangeStatus::Modified(p) => diff.modified.push(p),
                ChangeStatus::Deleted(p) => diff.deleted.push(p),
                ChangeStatus::Renamed { old, new } => {
                    diff.deleted.push(old);
                    diff.added.push(new);
                }
                ChangeStatus::Copied { new } => diff.added.push(new),
                ChangeStatus::Unknown => {}
            }
        }
        diff
    }
}

/// Parse `git diff --name-status` output.
///
/// Each line is TAB-delimited: `<status><score?>\t<path>` for plain
/// add/modify/delete, or `<status><score?>\t<old>\t<new>` for rename/copy.
/// Paths may themselves contain literal TAB bytes (unusual, but git does not
/// escape them without `-z`), so for non-rename/copy statuses we take
/// everything after the first TAB as the path.
pub fn parse_name_status(output: &str) -> Vec<ChangeStatus> {
    let mut out = Vec::new();
    for line in output.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let Some(tab_idx) = line.find('\t') else {
            continue;
        };
        let (code, rest) = line.split_at(tab_idx);
        let rest = &rest[1..]; // drop the leading TAB
        let Some(status_char) = code.chars().next() else {
            continue;
        };

        let change = match status_char {
            'A' => ChangeStatus::Added(rest.to_string()),
            'M' => ChangeStatus::Modified(rest.to_string()),
            'D' => ChangeStatus::Deleted(rest.to_string()),
            'R' => {
                if let Some(tab2) = rest.find('\t') {
                    let old = rest[..tab2].to_string();
                    let new = rest[tab2 + 1..].to_string();
                    ChangeStatus::Renamed { old, new }
                } else {
                    ChangeStatus::Unknown
                }
            }
            'C' => {
                if let Some(tab2) = rest.find('\t') {
                    let new = rest[tab2 + 1..].to_string();
                    ChangeStatus::Copied { new }
                } else {
                    ChangeStatus::Unknown
                }
            }
            _ => ChangeStatus::Unknown,
        };
        out.push(change);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_expands_to_delete_and_add() {
        let changes = parse_name_status("R100\told.ts\tnew.ts\n");
        let diff = GitDiff::from_changes(changes);
        assert_eq!(diff.deleted, vec!["old.ts".to_string()]);
        assert_eq!(diff.added, vec!["new.ts".to_string()]);
    }

    #[test]
    fn plain_delete() {
        let changes = parse_name_status("D\tfoo.ts\n");
        let diff = GitDiff::from_changes(changes);
        assert_eq!(diff.deleted, vec!["foo.ts".to_string()]);
        assert!(diff.added.is_empty());
    }

    #[test]
    fn copy_expands_to_add_only() {
        let changes = parse_name_status("C100\tsrc.ts\tdst.ts\n");
        let diff = GitDiff::from_changes(changes);
        assert_eq!(diff.added, vec!["dst.ts".to_string()]);
        assert!(diff.deleted.is_empty());
    }

    #[test]
    fn mixed_statuses_sort_into_buckets() {
        let changes = parse_name_status(
            "A\tn.ts\nM\tm.ts\nD\td.ts\nR90\told2.ts\tnew2.ts\n",
        );
        let diff = GitDiff::from_changes(changes);
        assert_eq!(diff.added, vec!["n.ts".to_string(), "new2.ts".to_string()]);
        assert_eq!(diff.modified, vec!["m.ts".to_string()]);
        assert_eq!(diff.deleted, vec!["d.ts".to_string(), "old2.ts".to_string()]);
    }

    #[test]
    fn unknown_status_is_ignored() {
        let changes = parse_name_status("U\tconflict.ts\n");
        let diff = GitDiff::from_changes(changes);
        assert!(diff.added.is_empty() && diff.modified.is_empty() && diff.deleted.is_empty());
    }

    #[test]
    fn blank_lines_are_skipped() {
        let changes = parse_name_status("A\ta.ts\n\n\nM\tb.ts\n");
        assert_eq!(changes.len(), 2);
    }
}

/// One line of `git diff --numstat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumstatEntry {
    pub path: String,
    pub additions: u64,
    pub deletions: u64,
}

/// Parse `git diff --numstat` output.
///
/// Binary files report `-` counts, read as zero. Renames (`old => new`) are
/// skipped, as are malformed lines.
pub fn parse_numstat(output: &str) -> Vec<NumstatEntry> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\t');
            let additions = parse_count(fields.next()?)?;
            let deletions = parse_count(fields.next()?)?;
            let path = fields.next()?.trim();

            if path.is_empty() || path.contains(" => ") {
                return None;
            }

            Some(NumstatEntry {
                path: path.to_string(),
                additions,
                deletions,
            })
        })
        .collect()
}

fn parse_count(field: &str) -> Option<u64> {
    match field.trim() {
        "-" => Some(0),
        n => n.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numstat() {
        let output = "10\t2\tsrc/main.py\n20\t0\tweb/app.js\n-\t-\tassets/logo.png\n";
        let entries = parse_numstat(output);

        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0],
            NumstatEntry {
                path: "src/main.py".to_string(),
                additions: 10,
                deletions: 2
            }
        );
        assert_eq!(entries[2].additions, 0);
        assert_eq!(entries[2].deletions, 0);
    }

    #[test]
    fn test_renames_and_garbage_skipped() {
        let output = "1\t1\tsrc/{old.rs => new.rs}\n3\t0\told.txt => new.txt\nnot numstat\n\n4\t4\tkept.go\n";
        let entries = parse_numstat(output);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "kept.go");
    }

    #[test]
    fn test_path_with_spaces() {
        let entries = parse_numstat("5\t0\tdocs/my notes.md\n");
        assert_eq!(entries[0].path, "docs/my notes.md");
    }
}

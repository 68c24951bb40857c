use std::path::Path;

use chrono::{DateTime, Local};

use crate::Result;

/// File extension used for captured frames.
pub const FRAME_EXT: &str = "jpg";

/// Allocates a unique filename for a frame captured at `now`.
///
/// Names have the form `YYYYMMDD_HHMMSS[_N].jpg`. Captures landing in the
/// same calendar second get a 1-based disambiguation suffix: the first
/// collision becomes `_1`, later ones take the highest existing suffix plus
/// one. The scan cost grows with directory size, which is acceptable at a
/// seconds-scale cadence.
///
/// Suffixes are not zero-padded, so a plain string sort misorders `_10`
/// against `_2`; [`crate::assembler`] restores chronological order by
/// comparing parsed suffixes numerically.
pub fn allocate(dir: &Path, now: DateTime<Local>) -> Result<String> {
    let prefix = now.format("%Y%m%d_%H%M%S").to_string();

    let mut matches = 0usize;
    let mut max_suffix = 0u64;
    if dir.is_dir() {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(&format!(".{FRAME_EXT}")) else {
                continue;
            };
            if !stem.contains(&prefix) {
                continue;
            }
            matches += 1;
            // Files matching the prefix but without a parseable numeric
            // suffix count toward the collision threshold only.
            if let Some(n) = parse_suffix(stem, &prefix) {
                max_suffix = max_suffix.max(n);
            }
        }
    }

    let stem = match matches {
        0 => prefix,
        1 => format!("{prefix}_1"),
        _ => format!("{prefix}_{}", max_suffix + 1),
    };
    Ok(format!("{stem}.{FRAME_EXT}"))
}

/// Parses the disambiguation suffix of `stem`, if it has one.
pub(crate) fn parse_suffix(stem: &str, prefix: &str) -> Option<u64> {
    let rest = stem.strip_prefix(prefix)?;
    rest.strip_prefix('_')?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn empty_directory_gets_bare_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let name = allocate(dir.path(), noon()).unwrap();
        assert_eq!(name, "20240101_120000.jpg");
    }

    #[test]
    fn missing_directory_behaves_like_empty() {
        let dir = tempfile::tempdir().unwrap();
        let name = allocate(&dir.path().join("absent"), noon()).unwrap();
        assert_eq!(name, "20240101_120000.jpg");
    }

    #[test]
    fn first_collision_gets_suffix_one() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "20240101_120000.jpg");
        let name = allocate(dir.path(), noon()).unwrap();
        assert_eq!(name, "20240101_120000_1.jpg");
    }

    #[test]
    fn later_collisions_increment_the_max_suffix() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "20240101_120000.jpg");
        touch(dir.path(), "20240101_120000_1.jpg");
        touch(dir.path(), "20240101_120000_3.jpg");
        let name = allocate(dir.path(), noon()).unwrap();
        assert_eq!(name, "20240101_120000_4.jpg");
    }

    #[test]
    fn unparseable_suffix_counts_toward_threshold_only() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "20240101_120000.jpg");
        touch(dir.path(), "20240101_120000_copy.jpg");
        let name = allocate(dir.path(), noon()).unwrap();
        assert_eq!(name, "20240101_120000_1.jpg");
    }

    #[test]
    fn other_seconds_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "20240101_115959.jpg");
        let name = allocate(dir.path(), noon()).unwrap();
        assert_eq!(name, "20240101_120000.jpg");
    }

    #[test]
    fn same_second_allocations_are_pairwise_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..12 {
            let name = allocate(dir.path(), noon()).unwrap();
            assert!(seen.insert(name.clone()), "duplicate name {name}");
            touch(dir.path(), &name);
        }
    }
}

//! Raster file discovery and ordering.
//!
//! A dataset is a directory tree of grid files whose names begin with a
//! sortable timestamp. Scanning resolves the tree into a [`FileManifest`],
//! the ordered catalog every later stage indexes into: batch plans are
//! ranges of manifest indices and projection rows are written back at
//! manifest positions.

use std::ops::Range;
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};

/// Characters of the file name (after the suffix is stripped) that carry
/// the timestamp.
const TIMESTAMP_WIDTH: usize = 10;

/// One raster file together with the timestamp taken from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub timestamp: String,
    pub path: PathBuf,
}

/// Ordered catalog of input rasters.
///
/// Sorted ascending by timestamp at construction, with the full path as a
/// tie breaker, and index-stable afterwards.
#[derive(Debug, Clone, Default)]
pub struct FileManifest {
    entries: Vec<ManifestEntry>,
}

impl FileManifest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }

    /// Entries covered by one planned batch range.
    pub fn slice(&self, range: Range<usize>) -> &[ManifestEntry] {
        &self.entries[range]
    }

    /// A copy of this manifest in seeded pseudo-random order.
    ///
    /// Used to decorrelate the fit ordering from the timestamp ordering;
    /// the original manifest keeps its indices, so projections stay
    /// aligned with it.
    pub fn shuffled(&self, seed: u64) -> FileManifest {
        let mut entries = self.entries.clone();
        entries.shuffle(&mut StdRng::seed_from_u64(seed));
        FileManifest { entries }
    }
}

impl<'a> IntoIterator for &'a FileManifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Recursively enumerates raster files under `root` whose names end with
/// `suffix` and returns them as a timestamp-ordered manifest.
///
/// The timestamp is the first [`TIMESTAMP_WIDTH`] characters of the file
/// name once the suffix is stripped. Both `root` and `suffix` are taken
/// literally, even where they contain glob metacharacters. Files with
/// non-UTF-8 names are skipped. A root with no matching files yields an
/// empty manifest; the caller decides whether that is an error.
pub fn scan<P: AsRef<Path>>(root: P, suffix: &str) -> Result<FileManifest> {
    // Only the `**` and `*` spliced in here are pattern syntax.
    let escaped = PathBuf::from(Pattern::escape(&root.as_ref().to_string_lossy()));
    let pattern = escaped.join("**").join(format!("*{}", Pattern::escape(suffix)));
    let pattern = pattern.to_string_lossy().into_owned();
    debug!("scanning for rasters with pattern {pattern}");

    let paths = glob(&pattern)
        .map_err(|e| Error::InvalidConfiguration(format!("bad scan pattern {pattern}: {e}")))?;

    let mut entries = Vec::new();
    for path in paths {
        let path = path.map_err(|e| Error::Io(e.into_error()))?;
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stem) = name.strip_suffix(suffix) else {
            continue;
        };
        let timestamp: String = stem.chars().take(TIMESTAMP_WIDTH).collect();
        entries.push(ManifestEntry { timestamp, path });
    }
    entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.path.cmp(&b.path)));
    Ok(FileManifest { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    fn synthetic(count: usize) -> FileManifest {
        let entries = (0..count)
            .map(|i| ManifestEntry {
                timestamp: format!("{i:010}"),
                path: PathBuf::from(format!("{i:010}.bin")),
            })
            .collect();
        FileManifest { entries }
    }

    #[test]
    fn scan_sorts_by_timestamp_and_recurses() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "2021033112_t2m.bin");
        touch(dir.path(), "deep/2021013100_t2m.bin");
        touch(dir.path(), "2021020300_t2m.bin");
        touch(dir.path(), "notes.txt");

        let manifest = scan(dir.path(), ".bin").unwrap();
        let stamps: Vec<_> = manifest.iter().map(|e| e.timestamp.as_str()).collect();
        assert_eq!(stamps, vec!["2021013100", "2021020300", "2021033112"]);
    }

    #[test]
    fn timestamp_is_a_fixed_width_prefix() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "2021013100_z500_regridded.bin");
        touch(dir.path(), "short.bin");

        let manifest = scan(dir.path(), ".bin").unwrap();
        assert_eq!(manifest.entries()[0].timestamp, "2021013100");
        assert_eq!(manifest.entries()[1].timestamp, "short");
    }

    #[test]
    fn scan_of_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let manifest = scan(dir.path().join("nope"), ".bin").unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn scan_treats_metacharacters_in_the_root_as_literal() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "data[2021]/2021013100_t2m.bin");
        touch(dir.path(), "data[2021]/deep/2021020300_t2m.bin");
        // Read as a character class, "data[2021]" would match this sibling.
        touch(dir.path(), "data2/2021033112_t2m.bin");

        let manifest = scan(dir.path().join("data[2021]"), ".bin").unwrap();
        let stamps: Vec<_> = manifest.iter().map(|e| e.timestamp.as_str()).collect();
        assert_eq!(stamps, vec!["2021013100", "2021020300"]);
    }

    #[test]
    fn shuffled_is_a_seeded_permutation() {
        let manifest = synthetic(20);
        let a = manifest.shuffled(7);
        let b = manifest.shuffled(7);
        assert_eq!(a.entries, b.entries);
        assert_ne!(a.entries, manifest.entries);

        let mut sorted = a.entries.clone();
        sorted.sort_by(|x, y| x.timestamp.cmp(&y.timestamp));
        assert_eq!(sorted, manifest.entries);
    }

    #[test]
    fn different_seeds_give_different_orders() {
        let manifest = synthetic(20);
        assert_ne!(manifest.shuffled(1).entries, manifest.shuffled(2).entries);
    }
}

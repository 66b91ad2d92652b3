//! Directory trees with known contents, and validation of copies of them
use crate::Result;
use rand::prelude::*;
use sha2::Digest;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Create files under `root` with random contents of the given sizes.
///
/// The paths are relative to `root`; missing parent directories are created.  Returns the
/// contents written, keyed by relative path.
pub fn make_tree<'a>(
    root: &Path,
    files: impl IntoIterator<Item = (&'a str, usize)>,
) -> Result<BTreeMap<PathBuf, Vec<u8>>> {
    let mut rand = rand::thread_rng();
    let mut written = BTreeMap::new();

    for (relative_path, size) in files {
        let path = root.join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut data = vec![0u8; size];
        rand.fill(&mut data[..]);

        std::fs::write(&path, &data)?;
        assert!(
            written.insert(PathBuf::from(relative_path), data).is_none(),
            "BUG: test tree contains the same path '{relative_path}' more than once"
        );
    }

    Ok(written)
}

/// SHA-256 hash of every file under `root`, keyed by path relative to `root`
pub fn tree_hashes(root: &Path) -> Result<BTreeMap<PathBuf, [u8; 32]>> {
    println!("Directory {} contains the following files:", root.display());

    let mut hashes = BTreeMap::new();

    for entry in walkdir::WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }

        let relative_path = entry.path().strip_prefix(root)?.to_owned();
        let data = std::fs::read(entry.path())?;

        println!("  {} ({} bytes)", relative_path.display(), data.len());

        hashes.insert(relative_path, hash(&data));
    }

    Ok(hashes)
}

/// Assert that `actual` contains exactly the same files with the same contents as `expected`
#[track_caller]
pub fn assert_same_tree(expected: &Path, actual: &Path) -> Result<()> {
    let expected_hashes = tree_hashes(expected)?;
    let actual_hashes = tree_hashes(actual)?;

    let expected_paths = expected_hashes.keys().collect::<Vec<_>>();
    let actual_paths = actual_hashes.keys().collect::<Vec<_>>();
    assert_eq!(
        expected_paths,
        actual_paths,
        "Directory '{}' doesn't contain the same files as '{}'",
        actual.display(),
        expected.display()
    );

    for (path, hash) in &expected_hashes {
        assert_eq!(
            Some(hash),
            actual_hashes.get(path),
            "File '{}' hash doesn't match expected value",
            path.display()
        );
    }

    Ok(())
}

/// Assert that the file at `path` has exactly the contents `expected`
#[track_caller]
pub fn assert_file_contents(path: &Path, expected: &[u8]) -> Result<()> {
    let data = std::fs::read(path)?;

    assert_eq!(
        hash(&data),
        hash(expected),
        "File '{}' ({} bytes) doesn't have the expected {} bytes of content",
        path.display(),
        data.len(),
        expected.len()
    );

    Ok(())
}

fn hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = sha2::Sha256::new();
    hasher.update(data);

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

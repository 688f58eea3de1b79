//! Order-independent directory content fingerprinting
//!
//! A fingerprint is a two-level SHA-256: every matching file is hashed, the
//! per-file hex strings are sorted and joined with `#`, and the joined string
//! is hashed again. Sorting makes the digest independent of filesystem
//! enumeration order, which is not stable across local and remote hosts.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncReadExt;
use walkdir::WalkDir;

use crate::error::{CheckError, Result};

/// Separator for joining sorted per-file hashes. Never appears in a hex hash
/// string.
pub const HASH_SEPARATOR: &str = "#";

/// Case-sensitive filename suffix filter applied to both sides of a
/// comparison.
///
/// The same filter value must feed the local and the remote executor;
/// divergent filters make identical directories look divergent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    suffixes: Vec<String>,
}

impl ExtensionFilter {
    /// Create a filter from a set of filename suffixes (e.g. `.fastq.gz`)
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes.into_iter().map(Into::into).collect(),
        }
    }

    /// The suffixes hashed by sequencing-run replication checks
    pub fn sequencing_defaults() -> Self {
        Self::new([".fastq.gz", ".fastq", ".fast5", ".csv"])
    }

    /// Whether a file name matches one of the suffixes (case-sensitive)
    pub fn matches(&self, file_name: &str) -> bool {
        self.suffixes.iter().any(|s| file_name.ends_with(s))
    }

    /// The configured suffixes
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::sequencing_defaults()
    }
}

/// Compute the fingerprint of a directory: SHA-256 over the sorted,
/// `#`-joined SHA-256 hex hashes of every file matching `filter`.
///
/// Zero matching files is not an error; it yields the hash of the empty
/// string (`e3b0c442...`), so genuinely empty directories compare equal on
/// both sides.
pub async fn fingerprint(root: &Path, filter: &ExtensionFilter) -> Result<String> {
    if !root.is_dir() {
        return Err(CheckError::hash_error(
            root,
            "Directory does not exist or is not readable",
        ));
    }

    let mut file_hashes = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            CheckError::hash_error(root, format!("Walk error: {e}"))
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if !filter.matches(&name) {
            continue;
        }

        file_hashes.push(hash_file(entry.path()).await?);
    }

    Ok(combine_hashes(file_hashes))
}

/// Hash one file's bytes with SHA-256, streaming through a fixed buffer
pub async fn hash_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).await.map_err(|e| {
        CheckError::hash_error(path, format!("Failed to open file: {e}"))
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let bytes_read = file.read(&mut buffer).await.map_err(|e| {
            CheckError::hash_error(path, format!("Failed to read file: {e}"))
        })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Fold per-file hashes into a single digest: pure byte-lexicographic sort,
/// join with [`HASH_SEPARATOR`], SHA-256 over the joined string.
///
/// Shared by the local and remote executors so that both sides assemble
/// digests through the same code path, immune to remote locale collation.
pub fn combine_hashes(mut file_hashes: Vec<String>) -> String {
    file_hashes.sort_unstable();
    let joined = file_hashes.join(HASH_SEPARATOR);

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;
    use tokio::fs;

    /// SHA-256 of the empty string: the digest of a directory with no
    /// matching files.
    const EMPTY_DIGEST: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[tokio::test]
    async fn test_empty_directory_digest_is_well_defined() {
        let temp_dir = TempDir::new().unwrap();
        let filter = ExtensionFilter::sequencing_defaults();

        let digest = fingerprint(temp_dir.path(), &filter).await.unwrap();
        assert_eq!(digest, EMPTY_DIGEST);
    }

    #[tokio::test]
    async fn test_non_matching_files_equal_empty_digest() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("notes.txt"), b"irrelevant")
            .await
            .unwrap();
        fs::write(temp_dir.path().join("image.png"), b"pixels")
            .await
            .unwrap();

        let filter = ExtensionFilter::sequencing_defaults();
        let digest = fingerprint(temp_dir.path(), &filter).await.unwrap();
        assert_eq!(digest, EMPTY_DIGEST);
    }

    #[tokio::test]
    async fn test_insertion_order_does_not_change_digest() {
        let filter = ExtensionFilter::sequencing_defaults();

        let first = TempDir::new().unwrap();
        fs::write(first.path().join("a.fastq"), b"AAAA").await.unwrap();
        fs::write(first.path().join("b.fastq"), b"BBBB").await.unwrap();
        fs::write(first.path().join("c.csv"), b"1,2,3").await.unwrap();

        let second = TempDir::new().unwrap();
        fs::write(second.path().join("c.csv"), b"1,2,3").await.unwrap();
        fs::write(second.path().join("b.fastq"), b"BBBB").await.unwrap();
        fs::write(second.path().join("a.fastq"), b"AAAA").await.unwrap();

        let d1 = fingerprint(first.path(), &filter).await.unwrap();
        let d2 = fingerprint(second.path(), &filter).await.unwrap();
        assert_eq!(d1, d2);
    }

    #[tokio::test]
    async fn test_matching_file_change_flips_digest() {
        let temp_dir = TempDir::new().unwrap();
        let filter = ExtensionFilter::sequencing_defaults();

        fs::write(temp_dir.path().join("reads.fastq"), b"ACGT")
            .await
            .unwrap();
        let before = fingerprint(temp_dir.path(), &filter).await.unwrap();

        fs::write(temp_dir.path().join("reads.fastq"), b"TGCA")
            .await
            .unwrap();
        let after = fingerprint(temp_dir.path(), &filter).await.unwrap();

        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_non_matching_file_change_keeps_digest() {
        let temp_dir = TempDir::new().unwrap();
        let filter = ExtensionFilter::sequencing_defaults();

        fs::write(temp_dir.path().join("reads.fastq"), b"ACGT")
            .await
            .unwrap();
        fs::write(temp_dir.path().join("log.txt"), b"v1").await.unwrap();
        let before = fingerprint(temp_dir.path(), &filter).await.unwrap();

        fs::write(temp_dir.path().join("log.txt"), b"v2").await.unwrap();
        let after = fingerprint(temp_dir.path(), &filter).await.unwrap();

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_nested_files_are_included() {
        let temp_dir = TempDir::new().unwrap();
        let filter = ExtensionFilter::sequencing_defaults();

        let flat = fingerprint(temp_dir.path(), &filter).await.unwrap();

        fs::create_dir_all(temp_dir.path().join("pass/barcode01"))
            .await
            .unwrap();
        fs::write(
            temp_dir.path().join("pass/barcode01/reads.fastq.gz"),
            b"compressed",
        )
        .await
        .unwrap();

        let nested = fingerprint(temp_dir.path(), &filter).await.unwrap();
        assert_ne!(flat, nested);
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");
        let filter = ExtensionFilter::sequencing_defaults();

        let result = fingerprint(&missing, &filter).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_suffix_match_is_case_sensitive() {
        let filter = ExtensionFilter::sequencing_defaults();
        assert!(filter.matches("sample.fastq"));
        assert!(filter.matches("sample.fastq.gz"));
        assert!(!filter.matches("sample.FASTQ"));
        assert!(!filter.matches("sample.fastq.gz.bak"));
    }

    proptest! {
        /// The combined digest is invariant under any permutation of the
        /// per-file hash list.
        #[test]
        fn prop_combine_hashes_is_order_invariant(
            mut hashes in proptest::collection::vec("[0-9a-f]{64}", 0..8)
        ) {
            let combined = combine_hashes(hashes.clone());
            hashes.reverse();
            prop_assert_eq!(combine_hashes(hashes), combined);
        }
    }
}

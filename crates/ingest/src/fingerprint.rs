//! Content fingerprints for archive files.

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Hex SHA-256 of the file's raw (still compressed) bytes.
pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_depends_on_content_only() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pgn");
        let b = dir.path().join("b.pgn");
        let c = dir.path().join("c.pgn");
        std::fs::write(&a, "1. e4 e5 1-0").unwrap();
        std::fs::write(&b, "1. e4 e5 1-0").unwrap();
        std::fs::write(&c, "1. d4 d5 1-0").unwrap();

        let fa = fingerprint_file(&a).unwrap();
        assert_eq!(fa.len(), 64);
        assert_eq!(fa, fingerprint_file(&b).unwrap());
        assert_ne!(fa, fingerprint_file(&c).unwrap());
    }
}

//! Opening archives on disk.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use chess_core::ArchiveReader;

use crate::error::IngestError;

/// Decoded byte stream of an archive file.
pub type ArchiveStream = Box<dyn Read + Send>;

fn is_zstd(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "zst")
}

/// Open a PGN archive for streaming. `.zst` files are decompressed on the fly;
/// anything else is read as plain PGN text.
pub fn open_archive(path: &Path) -> io::Result<ArchiveReader<ArchiveStream>> {
    let file = File::open(path)?;

    let input: ArchiveStream = if is_zstd(path) {
        Box::new(zstd::Decoder::new(file)?)
    } else {
        Box::new(BufReader::new(file))
    };

    Ok(ArchiveReader::new(input))
}

/// All archives directly inside `dir`, compressed or not, in path order.
pub fn find_archives(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut found = Vec::new();

    for pattern in ["*.pgn.zst", "*.pgn"] {
        let pattern = dir.join(pattern);
        let pattern = pattern.to_string_lossy();
        found.extend(glob::glob(&pattern)?.filter_map(|p| p.ok()));
    }

    found.sort();
    found.dedup();
    Ok(found)
}

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One PGN game. `None` headers are left out entirely.
pub fn pgn_game(white_elo: Option<&str>, black_elo: Option<&str>, result: Option<&str>, movetext: &str) -> String {
    let mut pgn = String::from("[Event \"Rated Blitz game\"]\n[Site \"https://lichess.org/synthetic\"]\n");
    if let Some(elo) = white_elo {
        pgn.push_str(&format!("[WhiteElo \"{elo}\"]\n"));
    }
    if let Some(elo) = black_elo {
        pgn.push_str(&format!("[BlackElo \"{elo}\"]\n"));
    }
    if let Some(result) = result {
        pgn.push_str(&format!("[Result \"{result}\"]\n"));
    }
    pgn.push('\n');
    pgn.push_str(movetext);
    pgn.push_str("\n\n");
    pgn
}

/// Write `games` as a zstd-compressed archive, the way monthly dumps ship.
pub fn write_zst_archive(dir: &Path, name: &str, games: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut encoder = zstd::Encoder::new(File::create(&path).unwrap(), 3).unwrap();
    for game in games {
        encoder.write_all(game.as_bytes()).unwrap();
    }
    encoder.finish().unwrap();
    path
}

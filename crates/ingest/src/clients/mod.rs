pub mod lichess;

pub use lichess::{ExportedGame, LichessClient};

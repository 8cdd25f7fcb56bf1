//! Move statistics per position.
//!
//! SQL does the heavy grouping (count and mean outcome per position + move);
//! play share and ranking are computed per position over the grouped rows.

use chess_core::position::{canonical_key, normalize_fen};
use rusqlite::types::ToSql;
use serde::{Deserialize, Serialize};

use crate::bracket::{RatingBracket, DEFAULT_BRACKET_WIDTH};
use crate::{Error, MoveStore, Result};

/// Rating column a query filters or buckets on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingColumn {
    /// Floor of the mean of both players' ratings. Always set for bulk rows.
    #[default]
    AverageRating,
    /// The mover's own rating, the convention of per-player ingestion.
    PlayerRating,
}

impl RatingColumn {
    fn column(self) -> &'static str {
        match self {
            RatingColumn::AverageRating => "average_rating",
            RatingColumn::PlayerRating => "player_rating",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopMovesQuery {
    /// Inclusive.
    pub min_rating: i32,
    /// Inclusive.
    pub max_rating: i32,
    pub k: u32,
    pub min_samples_move: u32,
    pub rating_column: RatingColumn,
    /// Restrict to a single position (any FEN; counters are ignored).
    pub position: Option<String>,
}

impl Default for TopMovesQuery {
    fn default() -> Self {
        Self {
            min_rating: 800,
            max_rating: 1200,
            k: 15,
            min_samples_move: 5,
            rating_column: RatingColumn::AverageRating,
            position: None,
        }
    }
}

impl TopMovesQuery {
    pub fn validate(&self) -> Result<()> {
        if self.min_rating < 0 || self.max_rating < 0 {
            return Err(Error::InvalidQuery("ratings must not be negative".into()));
        }
        if self.min_rating > self.max_rating {
            return Err(Error::InvalidQuery(format!(
                "min_rating {} is greater than max_rating {}",
                self.min_rating, self.max_rating
            )));
        }
        if self.k == 0 {
            return Err(Error::InvalidQuery("k must be at least 1".into()));
        }
        if self.min_samples_move == 0 {
            return Err(Error::InvalidQuery("min_samples_move must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BracketQuery {
    pub width: u32,
    pub min_samples_move: u32,
    pub rating_column: RatingColumn,
    pub position: Option<String>,
}

impl Default for BracketQuery {
    fn default() -> Self {
        Self {
            width: DEFAULT_BRACKET_WIDTH,
            min_samples_move: 1,
            rating_column: RatingColumn::AverageRating,
            position: None,
        }
    }
}

impl BracketQuery {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(Error::InvalidQuery("bracket width must be at least 1".into()));
        }
        if self.width > i32::MAX as u32 {
            return Err(Error::InvalidQuery(format!(
                "bracket width must be at most {}",
                i32::MAX
            )));
        }
        if self.min_samples_move == 0 {
            return Err(Error::InvalidQuery("min_samples_move must be at least 1".into()));
        }
        Ok(())
    }
}

/// A move from a position, ranked among the moves played from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMoveStat {
    pub position_before: String,
    pub move_notation: String,
    pub sample_count: u64,
    /// Mean outcome for the mover, in [0, 1].
    pub mean_outcome: f64,
    pub play_share: f64,
    /// 1-based.
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BracketMoveStat {
    pub rating_bracket: RatingBracket,
    pub position_before: String,
    pub move_notation: String,
    pub sample_count: u64,
    pub mean_outcome: f64,
    pub play_share: f64,
}

/// Grouped (position, move) row straight out of SQL.
#[derive(Debug, Clone)]
struct MoveGroup {
    bin: Option<i64>,
    position: String,
    mv: String,
    count: u64,
    mean: f64,
}

/// Best first: higher mean outcome, then more samples. `sort_by` is stable,
/// so rows that tie on both keep their incoming (move_san) order.
fn sort_by_strength(group: &mut [MoveGroup]) {
    group.sort_by(|a, b| {
        b.mean
            .total_cmp(&a.mean)
            .then_with(|| b.count.cmp(&a.count))
    });
}

fn share(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn position_filter_key(fen: &str) -> String {
    canonical_key(fen).unwrap_or_else(|| normalize_fen(fen))
}

fn query_groups(
    store: &MoveStore,
    sql: &str,
    params: &[(&str, &dyn ToSql)],
) -> Result<Vec<MoveGroup>> {
    let mut stmt = store.conn().prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok(MoveGroup {
            bin: row.get(0)?,
            position: row.get(1)?,
            mv: row.get(2)?,
            count: row.get::<_, i64>(3)? as u64,
            mean: row.get(4)?,
        })
    })?;
    let groups = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(groups)
}

/// Top `k` moves per position among games inside the rating range.
///
/// Play share is relative to all moves from the same position that meet the
/// sample threshold, not only the returned top `k`.
pub fn top_moves(store: &MoveStore, query: &TopMovesQuery) -> Result<Vec<RankedMoveStat>> {
    query.validate()?;

    let column = query.rating_column.column();
    let position = query.position.as_deref().map(position_filter_key);
    let position_filter = if position.is_some() {
        "AND fen_before = :fen"
    } else {
        ""
    };

    let sql = format!(
        "SELECT NULL, fen_before, move_san, COUNT(*), AVG(mover_score) / 2.0
         FROM moves
         WHERE {column} BETWEEN :min_rating AND :max_rating {position_filter}
         GROUP BY fen_before, move_san
         HAVING COUNT(*) >= :min_samples
         ORDER BY fen_before, move_san"
    );

    let min_samples = i64::from(query.min_samples_move);
    let mut params: Vec<(&str, &dyn ToSql)> = vec![
        (":min_rating", &query.min_rating),
        (":max_rating", &query.max_rating),
        (":min_samples", &min_samples),
    ];
    if let Some(fen) = &position {
        params.push((":fen", fen));
    }

    let mut groups = query_groups(store, &sql, &params)?;
    let mut out = Vec::new();

    for position_moves in groups.chunk_by_mut(|a, b| a.position == b.position) {
        let total: u64 = position_moves.iter().map(|g| g.count).sum();
        sort_by_strength(position_moves);

        for (i, g) in position_moves.iter().take(query.k as usize).enumerate() {
            out.push(RankedMoveStat {
                position_before: g.position.clone(),
                move_notation: g.mv.clone(),
                sample_count: g.count,
                mean_outcome: g.mean,
                play_share: share(g.count, total),
                rank: i as u32 + 1,
            });
        }
    }

    Ok(out)
}

/// Every (bracket, position, move) triple with at least `min_samples_move`
/// samples. No top-k cut.
pub fn stats_by_bracket(store: &MoveStore, query: &BracketQuery) -> Result<Vec<BracketMoveStat>> {
    query.validate()?;

    let column = query.rating_column.column();
    let position = query.position.as_deref().map(position_filter_key);
    let position_filter = if position.is_some() {
        "WHERE fen_before = :fen"
    } else {
        ""
    };

    // NULL bin is the unknown bracket.
    let sql = format!(
        "SELECT CASE WHEN {column} > 0 THEN {column} / :width END AS bin,
                fen_before, move_san, COUNT(*), AVG(mover_score) / 2.0
         FROM moves
         {position_filter}
         GROUP BY bin, fen_before, move_san
         HAVING COUNT(*) >= :min_samples
         ORDER BY bin, fen_before, move_san"
    );

    let width = i64::from(query.width);
    let min_samples = i64::from(query.min_samples_move);
    let mut params: Vec<(&str, &dyn ToSql)> =
        vec![(":width", &width), (":min_samples", &min_samples)];
    if let Some(fen) = &position {
        params.push((":fen", fen));
    }

    let mut groups = query_groups(store, &sql, &params)?;
    let mut out = Vec::with_capacity(groups.len());

    for cell in groups.chunk_by_mut(|a, b| a.bin == b.bin && a.position == b.position) {
        let total: u64 = cell.iter().map(|g| g.count).sum();
        sort_by_strength(cell);

        for g in cell.iter() {
            let rating_bracket = match g.bin {
                Some(bin) => RatingBracket::from_bin(bin, query.width),
                None => RatingBracket::Unknown,
            };
            out.push(BracketMoveStat {
                rating_bracket,
                position_before: g.position.clone(),
                move_notation: g.mv.clone(),
                sample_count: g.count,
                mean_outcome: g.mean,
                play_share: share(g.count, total),
            });
        }
    }

    Ok(out)
}

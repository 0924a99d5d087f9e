//! Turns per-game player-count polls into the flat, ranked table the charts
//! are drawn from. Pure transformation, no I/O.

use std::cmp::Ordering;
use std::collections::HashSet;

use failure::{ensure, Error};

use crate::{GameRecord, SuggestedPlayerRow};

/// Player count used by the synthetic playing-time separator rows.
pub const SEPARATOR_PLAYERS: u32 = 0;

const BEST_MARKER: &str = "\u{1f538} "; // 🔸

/// Builds one row per recommended player count per game, ranked by average
/// rating, with playing-time separator rows appended for presentation.
///
/// A count is recommended when `best + recommended - not_recommended > 0`;
/// category options like "4+" never produce rows. Games whose poll has no
/// numeric options (or no positive score) simply contribute nothing.
pub fn suggested_players(games: &[GameRecord]) -> Result<Vec<SuggestedPlayerRow>, Error> {
    let mut seen = HashSet::new();
    for game in games {
        ensure!(
            seen.insert(game.id),
            "duplicate game id {} breaks the one-to-many row join",
            game.id
        );
    }

    let mut rows = Vec::new();
    for game in games {
        let best = match game.suggested_players.best_player_count() {
            Some(best) => best,
            None => continue,
        };
        let short_name = game.short_name();
        for entry in &game.suggested_players.counts {
            if entry.votes.score() <= 0 {
                continue;
            }
            let is_best = entry.players == best;
            rows.push(SuggestedPlayerRow {
                id: game.id,
                name: game.name.clone(),
                players: entry.players,
                best_player_count: best,
                is_best_player: is_best,
                average_rating: game.stats.average,
                playing_time: game.playing_time,
                short_name: short_name.clone(),
                cool_name: cool_name(&short_name, is_best),
            });
        }
    }

    // stable: games with equal ratings keep their input order
    rows.sort_by(|a, b| {
        b.average_rating
            .partial_cmp(&a.average_rating)
            .unwrap_or(Ordering::Equal)
    });
    let separators = separator_rows(&rows);
    rows.extend(separators);
    Ok(rows)
}

fn cool_name(short_name: &str, is_best: bool) -> String {
    if is_best {
        format!("{}{}", BEST_MARKER, short_name)
    } else {
        short_name.to_string()
    }
}

/// One separator per distinct playing time present in the table, longest
/// first, pinned to the table's minimum rating so they sort after every real
/// row of their tier.
fn separator_rows(rows: &[SuggestedPlayerRow]) -> Vec<SuggestedPlayerRow> {
    if rows.is_empty() {
        return Vec::new();
    }
    let floor = rows
        .iter()
        .map(|row| row.average_rating)
        .fold(std::f64::INFINITY, f64::min);
    let mut times: Vec<u32> = Vec::new();
    for row in rows {
        if !times.contains(&row.playing_time) {
            times.push(row.playing_time);
        }
    }
    times.sort_by(|a, b| b.cmp(a));
    times
        .into_iter()
        .map(|minutes| {
            let name = format!("{} minutes", minutes);
            SuggestedPlayerRow {
                id: minutes,
                name: name.clone(),
                players: SEPARATOR_PLAYERS,
                best_player_count: 0,
                is_best_player: false,
                average_rating: floor,
                playing_time: minutes,
                short_name: name.clone(),
                cool_name: name,
            }
        })
        .collect()
}

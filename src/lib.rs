pub mod bgg;
pub mod cli;
pub mod core;
pub mod parse;
pub mod table;

use chrono::NaiveDate;
use serde_derive::Serialize;

/// One catalog game, as parsed from a `/thing` item.
/// Immutable once constructed.
#[derive(Debug, PartialEq, Clone)]
pub struct GameRecord {
    pub id: u32,
    pub name: String,
    pub thumbnail: Option<String>,
    pub min_players: u32,
    pub max_players: u32,
    pub playing_time: u32, // minutes
    pub stats: RatingSummary,
    pub expansions: Vec<ExpansionRef>,
    pub suggested_players: SuggestionPoll,
    pub versions: Vec<GameVersion>,
}

impl GameRecord {
    pub fn url(&self) -> String {
        format!("https://boardgamegeek.com/boardgame/{}", self.id)
    }

    /// Chart-friendly name: cut at the first colon, and collapse to word
    /// initials when still longer than 20 characters.
    pub fn short_name(&self) -> String {
        let cut = match self.name.find(':') {
            Some(i) => &self.name[..i],
            None => self.name.as_str(),
        };
        if cut.chars().count() > 20 {
            cut.split_whitespace()
                .filter_map(|word| word.chars().next())
                .collect()
        } else {
            cut.to_string()
        }
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct RatingSummary {
    pub users_rated: u32,
    pub average: f64,
    pub bayes_average: f64,
    pub std_dev: f64,
    pub median: f64,
    pub average_weight: f64,
    pub ranks: Vec<RankEntry>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct RankEntry {
    pub id: String,
    pub name: String,
    pub friendly_name: String,
    /// None for the "Not Ranked" sentinel.
    pub value: Option<u32>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ExpansionRef {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, PartialEq, Clone)]
pub struct GameVersion {
    pub item_id: u32,
    pub language: String,
    pub width: f64,
    pub length: f64,
    pub depth: f64,
}

/// The suggested-player-count poll of one game. Numeric options keep their
/// document order in `counts`; category labels like "4+" land in `ignored`.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct SuggestionPoll {
    pub total_votes: u32,
    pub counts: Vec<PollEntry>,
    pub ignored: Vec<String>,
}

impl SuggestionPoll {
    /// Player count with the most "Best" votes. Ties go to the entry seen
    /// first in the poll; None when the poll has no numeric options.
    pub fn best_player_count(&self) -> Option<u32> {
        let mut best: Option<&PollEntry> = None;
        for entry in &self.counts {
            match best {
                Some(b) if entry.votes.best <= b.votes.best => {}
                _ => best = Some(entry),
            }
        }
        best.map(|entry| entry.players)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct PollEntry {
    pub players: u32,
    pub votes: PollVotes,
}

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct PollVotes {
    pub best: u32,
    pub recommended: u32,
    pub not_recommended: u32,
}

impl PollVotes {
    pub fn score(&self) -> i64 {
        i64::from(self.best) + i64::from(self.recommended) - i64::from(self.not_recommended)
    }
}

/// One item of a user's collection. Lighter than a GameRecord; the private
/// and wishlist fields only populate when they were requested and available.
#[derive(Debug, PartialEq, Clone)]
pub struct CollectionItem {
    pub id: u32,
    pub name: String,
    pub thumbnail: Option<String>,
    pub min_players: u32,
    pub max_players: u32,
    pub rating: Option<f64>,
    pub wishlist_priority: Option<u32>,
    pub num_plays: u32,
    pub inventory_location: Option<String>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct PlayLogEntry {
    pub date: NaiveDate,
    pub quantity: u32, // >= 1
    pub game_id: u32,
    pub game_name: String,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MarketplaceListing {
    pub item_id: u32,
    pub price: f64,
    pub currency: String,
    pub condition: Option<String>,
    pub product_id: u64,
    pub link: String,
}

/// One row of the suggested-players table. Serialized field names are the
/// column names downstream chart code expects.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct SuggestedPlayerRow {
    pub id: u32,
    pub name: String,
    pub players: u32,
    pub best_player_count: u32,
    pub is_best_player: bool,
    pub average_rating: f64,
    #[serde(rename = "playingtime")]
    pub playing_time: u32,
    pub short_name: String,
    pub cool_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> GameRecord {
        GameRecord {
            id: 13,
            name: name.to_string(),
            thumbnail: None,
            min_players: 1,
            max_players: 4,
            playing_time: 60,
            stats: RatingSummary::default(),
            expansions: Vec::new(),
            suggested_players: SuggestionPoll::default(),
            versions: Vec::new(),
        }
    }

    #[test]
    fn url_is_derived_from_id() {
        assert_eq!(named("Catan").url(), "https://boardgamegeek.com/boardgame/13");
    }

    #[test]
    fn short_name_cuts_at_colon() {
        let game = named("Pandemic Legacy: Season 1");
        assert_eq!(game.short_name(), "Pandemic Legacy");
    }

    #[test]
    fn short_name_collapses_long_names_to_initials() {
        let game = named("Dungeons and Dragons and More Dragons");
        assert_eq!(game.short_name(), "DaDaMD");
    }

    #[test]
    fn short_name_keeps_short_names() {
        assert_eq!(named("Catan").short_name(), "Catan");
    }

    #[test]
    fn best_player_count_prefers_most_best_votes() {
        let poll = SuggestionPoll {
            total_votes: 20,
            counts: vec![
                PollEntry { players: 2, votes: PollVotes { best: 3, recommended: 1, not_recommended: 0 } },
                PollEntry { players: 3, votes: PollVotes { best: 9, recommended: 0, not_recommended: 0 } },
            ],
            ignored: Vec::new(),
        };
        assert_eq!(poll.best_player_count(), Some(3));
    }

    #[test]
    fn best_player_count_tie_goes_to_first_entry() {
        let poll = SuggestionPoll {
            total_votes: 10,
            counts: vec![
                PollEntry { players: 4, votes: PollVotes { best: 5, recommended: 0, not_recommended: 0 } },
                PollEntry { players: 2, votes: PollVotes { best: 5, recommended: 3, not_recommended: 0 } },
            ],
            ignored: Vec::new(),
        };
        assert_eq!(poll.best_player_count(), Some(4));
    }

    #[test]
    fn best_player_count_is_none_without_numeric_options() {
        let poll = SuggestionPoll {
            total_votes: 0,
            counts: Vec::new(),
            ignored: vec![String::from("4+")],
        };
        assert_eq!(poll.best_player_count(), None);
    }
}

//! Maps catalog service documents into records. The wire format is sparse and
//! drifts between service revisions, so every field access falls back to a
//! default instead of failing.

use std::cmp;
use std::convert::TryFrom;

use chrono::NaiveDate;
use select::document::Document;
use select::node::Node;
use select::predicate::{And, Attr, Name};
use serde_json::Value;

use crate::{
    CollectionItem, ExpansionRef, GameRecord, GameVersion, MarketplaceListing, PlayLogEntry,
    PollEntry, PollVotes, RankEntry, RatingSummary, SuggestionPoll,
};

/// Rank and rating fields carry this text instead of a number.
const NOT_RANKED: &str = "Not Ranked";

pub fn game(item: Node, include_versions: bool) -> GameRecord {
    let id = item.attr("id").and_then(|v| v.parse().ok()).unwrap_or(0);
    let name = item
        .find(And(Name("name"), Attr("type", "primary")))
        .next()
        .or_else(|| item.find(Name("name")).next())
        .and_then(|n| n.attr("value"))
        .unwrap_or("Unknown")
        .to_string();
    let thumbnail = item
        .find(Name("thumbnail"))
        .next()
        .map(|n| n.text().trim().to_string())
        .filter(|t| !t.is_empty());
    let min_players = tag_value_u32(item, "minplayers", 1);
    let max_players = cmp::max(min_players, tag_value_u32(item, "maxplayers", 1));
    let playing_time = tag_value_u32(item, "playingtime", 0);
    let versions = if include_versions {
        versions(item)
    } else {
        Vec::new()
    };
    GameRecord {
        id,
        name,
        thumbnail,
        min_players,
        max_players,
        playing_time,
        stats: stats(item),
        expansions: expansions(item),
        suggested_players: poll(item),
        versions,
    }
}

/// The suggested-player-count poll, grouped by option. Options with a numeric
/// label become counted entries in document order; anything else ("4+" and
/// friends) is kept aside as an ignored category.
fn poll(item: Node) -> SuggestionPoll {
    let mut poll = SuggestionPoll::default();
    let node = match item
        .find(And(Name("poll"), Attr("name", "suggested_numplayers")))
        .next()
    {
        Some(node) => node,
        None => return poll,
    };
    poll.total_votes = node
        .attr("totalvotes")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    for option in node.find(Name("results")) {
        let label = match option.attr("numplayers") {
            Some(label) if !label.is_empty() => label,
            _ => continue,
        };
        let mut votes = PollVotes::default();
        for result in option.find(Name("result")) {
            let count = result
                .attr("numvotes")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            match result.attr("value") {
                Some("Best") => votes.best = count,
                Some("Recommended") => votes.recommended = count,
                Some("Not Recommended") => votes.not_recommended = count,
                _ => {}
            }
        }
        match label.parse::<u32>() {
            Ok(players) => poll.counts.push(PollEntry { players, votes }),
            Err(_) => poll.ignored.push(label.to_string()),
        }
    }
    poll
}

fn stats(item: Node) -> RatingSummary {
    let mut summary = RatingSummary::default();
    let ratings = match item
        .find(Name("statistics"))
        .next()
        .and_then(|s| s.find(Name("ratings")).next())
    {
        Some(ratings) => ratings,
        None => return summary,
    };
    summary.users_rated = tag_value_f64(ratings, "usersrated") as u32;
    summary.average = tag_value_f64(ratings, "average");
    summary.bayes_average = tag_value_f64(ratings, "bayesaverage");
    summary.std_dev = tag_value_f64(ratings, "stddev");
    summary.median = tag_value_f64(ratings, "median");
    summary.average_weight = tag_value_f64(ratings, "averageweight");
    for rank in ratings.find(Name("rank")) {
        summary.ranks.push(RankEntry {
            id: rank.attr("id").unwrap_or("").to_string(),
            name: rank.attr("name").unwrap_or("").to_string(),
            friendly_name: rank.attr("friendlyname").unwrap_or("").to_string(),
            value: rank
                .attr("value")
                .filter(|v| *v != NOT_RANKED)
                .and_then(|v| v.parse().ok()),
        });
    }
    summary
}

/// Only outbound expansion links describe this game's own expansions; inbound
/// ones point from an expansion back at its base game.
fn expansions(item: Node) -> Vec<ExpansionRef> {
    item.find(And(Name("link"), Attr("type", "boardgameexpansion")))
        .filter(|link| link.attr("inbound") != Some("true"))
        .filter_map(|link| {
            let id = link.attr("id").and_then(|v| v.parse().ok())?;
            let name = link.attr("value").unwrap_or("Unknown").to_string();
            Some(ExpansionRef { id, name })
        })
        .collect()
}

fn versions(item: Node) -> Vec<GameVersion> {
    item.find(Name("version"))
        .map(|version| GameVersion {
            item_id: version.attr("id").and_then(|v| v.parse().ok()).unwrap_or(0),
            language: version
                .find(And(Name("link"), Attr("type", "language")))
                .next()
                .and_then(|link| link.attr("value"))
                .unwrap_or("Unknown")
                .to_string(),
            width: tag_value_f64(version, "width"),
            length: tag_value_f64(version, "length"),
            depth: tag_value_f64(version, "depth"),
        })
        .collect()
}

pub fn collection_item(item: Node, wishlist: bool) -> CollectionItem {
    let id = item
        .attr("objectid")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let name = item
        .find(Name("name"))
        .next()
        .map(|n| n.text().trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| String::from("Unknown"));
    let thumbnail = item
        .find(Name("thumbnail"))
        .next()
        .map(|n| n.text().trim().to_string())
        .filter(|t| !t.is_empty());
    let stats = item.find(Name("stats")).next();
    let min_players = stats
        .and_then(|s| s.attr("minplayers"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);
    let max_players = cmp::max(
        min_players,
        stats
            .and_then(|s| s.attr("maxplayers"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(1),
    );
    let rating = stats
        .and_then(|s| s.find(Name("average")).next())
        .map(|r| r.attr("value").and_then(|v| v.parse().ok()).unwrap_or(0.0));
    let wishlist_priority = if wishlist {
        item.find(Name("status"))
            .next()
            .and_then(|s| s.attr("wishlistpriority"))
            .and_then(|v| v.parse().ok())
    } else {
        None
    };
    let num_plays = item
        .find(Name("numplays"))
        .next()
        .and_then(|n| n.text().trim().parse().ok())
        .unwrap_or(0);
    // only present when the caller holds an authenticated session
    let inventory_location = item
        .find(Name("privateinfo"))
        .next()
        .and_then(|p| p.attr("inventorylocation"))
        .map(String::from)
        .filter(|l| !l.is_empty());
    CollectionItem {
        id,
        name,
        thumbnail,
        min_players,
        max_players,
        rating,
        wishlist_priority,
        num_plays,
        inventory_location,
    }
}

/// Play entries of one page. Entries without a parsable date are dropped.
pub fn plays(doc: &Document) -> Vec<PlayLogEntry> {
    doc.find(Name("play"))
        .filter_map(|play| {
            let date = play
                .attr("date")
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())?;
            let quantity = play
                .attr("quantity")
                .and_then(|q| q.parse().ok())
                .unwrap_or(1)
                .max(1);
            let item = play.find(Name("item")).next()?;
            let game_id = item
                .attr("objectid")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let game_name = item.attr("name").unwrap_or("Unknown").to_string();
            Some(PlayLogEntry {
                date,
                quantity,
                game_id,
                game_name,
            })
        })
        .collect()
}

/// Marketplace products arrive as JSON with loosely typed fields; numbers may
/// come as strings. Listings missing an id or a price are dropped.
pub fn marketplace(data: &Value) -> Vec<MarketplaceListing> {
    let products = match data.get("products").and_then(Value::as_array) {
        Some(products) => products,
        None => return Vec::new(),
    };
    products
        .iter()
        .filter_map(|product| {
            let item_id = field_u64(product, "objectid").and_then(|v| u32::try_from(v).ok())?;
            let price = field_f64(product, "price")?;
            let product_id = field_u64(product, "productid").unwrap_or(0);
            Some(MarketplaceListing {
                item_id,
                price,
                currency: field_str(product, "currency").unwrap_or_default(),
                condition: field_str(product, "condition"),
                product_id,
                link: format!("https://boardgamegeek.com/market/product/{}", product_id),
            })
        })
        .collect()
}

fn tag_value_u32(scope: Node, tag: &str, default: u32) -> u32 {
    scope
        .find(Name(tag))
        .next()
        .and_then(|n| n.attr("value"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn tag_value_f64(scope: Node, tag: &str) -> f64 {
    match scope.find(Name(tag)).next().and_then(|n| n.attr("value")) {
        Some(v) if v != NOT_RANKED => v.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn field_u64(value: &Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn field_f64(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn field_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

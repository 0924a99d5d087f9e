use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use failure::{Error, ResultExt};
use serde_derive::{Deserialize, Serialize};
use serde_json::{from_str, to_string_pretty};
use threadpool::ThreadPool;

use crate::bgg::{BggClient, CollectionFilter, GameQuery, HttpTransport, RetryPolicy, Transport};
use crate::table;
use crate::{CollectionItem, GameRecord, MarketplaceListing, PlayLogEntry, SuggestedPlayerRow};

const CONFIG_FILE_NAME: &str = "app.config";
pub const TABLE_FILE_NAME: &str = "data/suggested_players.json";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub user_name: String,
    pub exclude_list: Vec<u32>, // game ids never wanted in the table
    pub mapping: HashMap<String, String>, // play-log rename map for reprinted titles
    pub timeout: u64,     // s, per http call
    pub retries: u32,     // attempts per request
    pub retry_delay: u64, // s between attempts
    pub batch_size: usize, // ids per thing request
    pub threads: usize,   // parallel detail fetch workers
}

impl Default for Config {
    fn default() -> Config {
        Config {
            user_name: String::new(),
            exclude_list: Vec::new(),
            mapping: HashMap::new(),
            timeout: 15,
            retries: 3,
            retry_delay: 5,
            batch_size: 20,
            threads: 8,
        }
    }
}

pub fn create_structure() -> Result<(), Error> {
    let new_conf = to_string_pretty(&Config::default())?;
    fs::write(CONFIG_FILE_NAME, new_conf)?;
    Ok(())
}

pub fn config() -> Result<Config, Error> {
    let conf = fs::read_to_string(CONFIG_FILE_NAME)
        .with_context(|_| format!("Can't open: {}", CONFIG_FILE_NAME))?;
    let conf = from_str(&conf)?;
    Ok(conf)
}

pub fn make_client(config: &Config) -> Result<BggClient<HttpTransport>, Error> {
    let policy = RetryPolicy {
        retries: config.retries,
        delay: Duration::from_secs(config.retry_delay),
        backoff: 1.0,
    };
    BggClient::from_env(
        Duration::from_secs(config.timeout),
        policy,
        config.batch_size,
    )
}

/// Collection → game metadata → suggested-players table, persisted to
/// data/suggested_players.json for the chart and metrics steps.
pub fn build_table(
    config: &Config,
    progress: impl Fn(&str),
) -> Result<Vec<SuggestedPlayerRow>, Error> {
    let client = make_client(config)?;
    let items = owned_collection(&client, config)?;
    progress(&format!("Got {} owned games.", items.len()));
    let ids: Vec<u32> = items.iter().map(|item| item.id).collect();
    let games = client.game_list(&ids)?;
    progress(&format!("Got metadata for {} games.", games.len()));
    let rows = table::suggested_players(&games)?;
    write_table(Path::new(TABLE_FILE_NAME), &rows)?;
    progress(&format!("Wrote {} rows to {}.", rows.len(), TABLE_FILE_NAME));
    Ok(rows)
}

/// Owned base games, with the configured exclude list applied.
pub fn owned_collection<T: Transport>(
    client: &BggClient<T>,
    config: &Config,
) -> Result<Vec<CollectionItem>, Error> {
    let items = client.collection(&config.user_name, &CollectionFilter::owned())?;
    Ok(items
        .into_iter()
        .filter(|item| !config.exclude_list.contains(&item.id))
        .collect())
}

pub fn write_table(path: &Path, rows: &[SuggestedPlayerRow]) -> Result<(), Error> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string(rows)?;
    fs::write(path, json).with_context(|_| format!("Can't write: {}", path.display()))?;
    Ok(())
}

/// Full play log with the rename mapping applied, so reprints count as plays
/// of the canonical title.
pub fn pull_plays<T: Transport>(
    client: &BggClient<T>,
    config: &Config,
) -> Result<Vec<PlayLogEntry>, Error> {
    let mut plays = client.plays(&config.user_name)?;
    for play in plays.iter_mut() {
        if let Some(canonical) = config.mapping.get(&play.game_name) {
            play.game_name = canonical.clone();
        }
    }
    Ok(plays)
}

/// Latest play date per game name.
pub fn last_played(plays: &[PlayLogEntry]) -> HashMap<String, NaiveDate> {
    let mut latest: HashMap<String, NaiveDate> = HashMap::new();
    for play in plays {
        let entry = latest.entry(play.game_name.clone()).or_insert(play.date);
        if play.date > *entry {
            *entry = play.date;
        }
    }
    latest
}

pub fn pull_market(config: &Config) -> Result<Vec<MarketplaceListing>, Error> {
    let client = make_client(config)?.with_policy(RetryPolicy::batch());
    client.marketplace_listings(&config.user_name)
}

/// Worker → orchestrator protocol for the parallel detail fetch. `Fetched`,
/// `Failed` and `Interrupted` are each worker's final message.
#[derive(Debug)]
pub enum Message {
    Asking(u32),
    Fetched(Box<GameRecord>),
    Failed(u32, Error),
    Interrupted,
}

pub struct DetailFetch {
    pub games: Vec<GameRecord>,
    pub failures: Vec<(u32, Error)>,
}

/// Fetches every game one by one over a worker pool, versions included when
/// asked. Workers share the client's session but retry on the patient batch
/// schedule, and a failed game lands in `failures` instead of sinking the
/// whole run.
pub fn pull_details(
    client: &BggClient<HttpTransport>,
    threads: usize,
    ids: Vec<u32>,
    include_versions: bool,
    running: Arc<AtomicBool>,
    mut progress: impl FnMut(&Message),
) -> DetailFetch {
    let pool = ThreadPool::new(threads.max(1));
    let (tx, rx) = mpsc::channel();
    let job_size = ids.len();
    for id in ids {
        let tx = tx.clone();
        let running = running.clone();
        let worker = client.with_policy(RetryPolicy::batch());
        pool.execute(move || runner(worker, id, include_versions, running, tx));
    }
    drop(tx);

    let mut games = Vec::new();
    let mut failures = Vec::new();
    let mut finished = 0;
    for received in rx {
        progress(&received);
        match received {
            Message::Fetched(game) => {
                games.push(*game);
                finished += 1;
            }
            Message::Failed(id, e) => {
                failures.push((id, e));
                finished += 1;
            }
            Message::Interrupted => finished += 1,
            Message::Asking(_) => {}
        }
        if finished == job_size {
            break;
        }
    }
    pool.join();
    DetailFetch { games, failures }
}

fn runner(
    client: BggClient<HttpTransport>,
    id: u32,
    versions: bool,
    running: Arc<AtomicBool>,
    tx: Sender<Message>,
) {
    // NB. Errors from mpsc channels use unwrap(). If channels fail,
    // the core of the program is severely damaged, panic is the only option.
    if !running.load(Ordering::SeqCst) {
        tx.send(Message::Interrupted).unwrap();
        return;
    }
    tx.send(Message::Asking(id)).unwrap();
    match client.game(&GameQuery::Id(id), versions) {
        Ok(game) => tx.send(Message::Fetched(Box::new(game))).unwrap(),
        Err(e) => tx.send(Message::Failed(id, e)).unwrap(),
    }
}

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bgg_table::bgg::GameQuery;
use bgg_table::cli::Cli;
use bgg_table::core::{self, Message};
use exitfailure::ExitFailure;
use failure::Error;
use structopt::StructOpt;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn main() -> Result<(), ExitFailure> {
    env_logger::init();
    let cli = Cli::from_args();
    match cli {
        Cli::New {} => create_structure()?,
        Cli::Table {} => build_table()?,
        Cli::Game { query, versions } => show_game(&query, versions)?,
        Cli::Plays {} => show_plays()?,
        Cli::Details {} => pull_details()?,
        Cli::Market {} => show_market()?,
    }
    Ok(())
}

fn create_structure() -> Result<(), Error> {
    core::create_structure()?;
    println!("Created initial config file.");
    Ok(())
}

fn build_table() -> Result<(), Error> {
    let config = core::config()?;
    println!("Starting download.");
    let rows = core::build_table(&config, |note| {
        println!("{}", note);
    })?;
    println!("Finished, {} rows.", rows.len());
    Ok(())
}

fn show_game(query: &str, versions: bool) -> Result<(), Error> {
    let config = core::config()?;
    let client = core::make_client(&config)?;
    let game = client.game(&GameQuery::parse(query), versions)?;
    println!("{} ({})", game.name, game.url());
    println!(
        "Players: {}-{}\tPlaytime: {} min\tRating: {:.2} ({} votes)",
        game.min_players,
        game.max_players,
        game.playing_time,
        game.stats.average,
        game.stats.users_rated
    );
    if let Some(best) = game.suggested_players.best_player_count() {
        println!("Best with {} players.", best);
    }
    for entry in &game.suggested_players.counts {
        println!(
            "{} players:\t{} best\t{} recommended\t{} not recommended",
            entry.players, entry.votes.best, entry.votes.recommended, entry.votes.not_recommended
        );
    }
    if !game.expansions.is_empty() {
        println!("Expansions:");
        for expansion in &game.expansions {
            println!("\t{} ({})", expansion.name, expansion.id);
        }
    }
    for version in &game.versions {
        println!(
            "Version {}:\t{}\t{} x {} x {}",
            version.item_id, version.language, version.width, version.length, version.depth
        );
    }
    Ok(())
}

fn show_plays() -> Result<(), Error> {
    let config = core::config()?;
    let client = core::make_client(&config)?;
    let plays = core::pull_plays(&client, &config)?;
    println!("Logged {} plays.", plays.len());
    let last = core::last_played(&plays);
    let mut names: Vec<&String> = last.keys().collect();
    names.sort();
    for name in names {
        println!("{}\t{}", name, last[name]);
    }
    Ok(())
}

fn pull_details() -> Result<(), Error> {
    // Cancellation token
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    // Bind cancellation token with ctrl+c command
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;
    let config = core::config()?;
    let client = core::make_client(&config)?;
    let items = core::owned_collection(&client, &config)?;
    let ids: Vec<u32> = items.iter().map(|item| item.id).collect();
    println!("Fetching details for {} games.", ids.len());
    // Prettify output a bit
    let mut stdout = StandardStream::stdout(ColorChoice::Always);
    let result = core::pull_details(&client, config.threads, ids, true, running, |message| {
        match message {
            Message::Asking(id) => {
                stdout
                    .set_color(ColorSpec::new().set_fg(Some(Color::Green)))
                    .unwrap();
                writeln!(&mut stdout, "About to ask bgg about {}.", id).unwrap();
            }
            Message::Fetched(game) => {
                stdout
                    .set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))
                    .unwrap();
                writeln!(
                    &mut stdout,
                    "{} has {} versions.",
                    game.name,
                    game.versions.len()
                )
                .unwrap();
            }
            Message::Failed(id, error) => {
                stdout
                    .set_color(ColorSpec::new().set_fg(Some(Color::Red)))
                    .unwrap();
                writeln!(&mut stdout, "Game {} failed: {}", id, error).unwrap();
            }
            Message::Interrupted => {}
        }
    });
    println!(
        "Fetched {} games, {} failures.",
        result.games.len(),
        result.failures.len()
    );
    Ok(())
}

fn show_market() -> Result<(), Error> {
    let config = core::config()?;
    let listings = core::pull_market(&config)?;
    if listings.is_empty() {
        println!("No marketplace listings found.");
    } else {
        println!("Id\tPrice\tCondition\tLink");
        for listing in listings {
            println!(
                "{}\t{} {}\t{}\t{}",
                listing.item_id,
                listing.price,
                listing.currency,
                listing.condition.unwrap_or_else(|| String::from("-")),
                listing.link
            );
        }
    }
    Ok(())
}

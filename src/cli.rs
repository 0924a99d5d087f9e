use structopt::StructOpt;

#[derive(Debug, StructOpt)]
/// Pulls a bgg collection and builds the
/// suggested player counts table.
pub enum Cli {
    #[structopt(name = "new")]
    /// Creates a new .config file with defaults.
    New {},
    #[structopt(name = "table")]
    /// Fetches the collection and writes the
    /// suggested players table.
    Table {},
    #[structopt(name = "game")]
    /// Shows one game, by id or by name search.
    Game {
        /// Game id or name to look up.
        query: String,
        /// Include physical versions.
        #[structopt(long = "versions")]
        versions: bool,
    },
    #[structopt(name = "plays")]
    /// Prints logged plays and last played dates.
    Plays {},
    #[structopt(name = "details")]
    /// Fetches per-game details with versions
    /// over a worker pool.
    Details {},
    #[structopt(name = "market")]
    /// Lists the user's marketplace inventory.
    Market {},
}

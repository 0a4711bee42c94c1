use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape a catalog page and write one CBZ archive per chapter.
    Run(RunArgs),
    /// Print the archive file name for a chapter without touching the network.
    Name(NameArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OverwriteMode {
    /// Ask before replacing an existing catalog directory.
    Ask,
    /// Replace an existing catalog directory without asking.
    Yes,
    /// Abort when the catalog directory already exists.
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompressionMode {
    Stored,
    Deflated,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Catalog URL (must be http/https). Prompted for when omitted.
    #[arg(long)]
    pub url: Option<String>,

    /// Root directory that receives one folder per catalog (default: ~/Manga).
    #[arg(long)]
    pub manga_root: Option<String>,

    /// What to do when the catalog directory already exists.
    #[arg(long, value_enum, default_value_t = OverwriteMode::Ask)]
    pub overwrite: OverwriteMode,

    /// Write the scraped catalog as JSON next to the archives.
    #[arg(long)]
    pub dump_catalog: bool,

    /// Minimum zero-padding width of chapter keys (widened to fit the chapter count).
    #[arg(long, default_value_t = 3)]
    pub min_key_width: usize,

    /// Image bodies at or below this many bytes are treated as error pages.
    #[arg(long, default_value_t = 1024)]
    pub min_image_bytes: usize,

    /// Also reject image responses whose Content-Type is not image/*.
    #[arg(long)]
    pub require_image_content_type: bool,

    /// Extension used when an image URL has none.
    #[arg(long, default_value = "jpg")]
    pub default_extension: String,

    /// Timeout for catalog and chapter page loads.
    #[arg(long, default_value_t = 10)]
    pub page_timeout_secs: u64,

    /// Timeout for each image download.
    #[arg(long, default_value_t = 30)]
    pub image_timeout_secs: u64,

    /// Delay before each chapter page visit (politeness).
    #[arg(long, default_value_t = 50)]
    pub delay_ms: u64,

    /// Delay after each chapter page load before reading it.
    #[arg(long, default_value_t = 300)]
    pub settle_ms: u64,

    /// Compression method used inside the CBZ archives.
    #[arg(long, value_enum, default_value_t = CompressionMode::Stored)]
    pub compression: CompressionMode,

    /// User-Agent header sent with every request.
    #[arg(long, default_value = concat!("mangapack/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,

    /// Never draw progress bars (they are also hidden when stderr is not a terminal).
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Debug, Args)]
pub struct NameArgs {
    /// Catalog title.
    #[arg(long)]
    pub title: String,

    /// Zero-based chapter index.
    #[arg(long)]
    pub index: usize,

    /// Total number of chapters in the catalog.
    #[arg(long)]
    pub chapters: usize,

    /// Chapter source URL (volume marker `tom-<n>`).
    #[arg(long)]
    pub url: String,

    /// Minimum zero-padding width of chapter keys.
    #[arg(long, default_value_t = 3)]
    pub min_key_width: usize,
}

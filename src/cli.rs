use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wikiref", about = "Resolve free-text references to pages on remote wikis")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a page reference against a wiki
    Resolve {
        /// Wiki domain or URL (defaults to the configured wiki)
        #[arg(short, long)]
        wiki: Option<String>,

        /// Page reference: title, optional #section, optional ?key=value
        #[arg(required = true)]
        reference: Vec<String>,

        /// Invocation prefix echoed back in command hints
        #[arg(long)]
        prefix: Option<String>,

        /// Elevated caller tier: deeper interwiki bound, report previews
        #[arg(long)]
        elevated: bool,

        /// Wrap the result in spoiler markers
        #[arg(long)]
        spoiler: bool,

        /// Plain link only, no rich summary
        #[arg(long)]
        no_embed: bool,
    },
    /// Show a wiki's normalized metadata snapshot
    Siteinfo {
        /// Wiki domain or URL
        wiki: String,
    },
}

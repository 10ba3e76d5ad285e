use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cosmetic-filters")]
#[command(about = "Manage cosmetic filters for rethread", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Suppress informational messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config directory (default: $XDG_CONFIG_HOME/rethread)
    #[arg(long, global = true, env = "COSMETIC_FILTERS_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Defaults to `add`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the picker and save a cosmetic filter (default command)
    Add {
        /// Override host match (default = active tab hostname)
        #[arg(long)]
        host: Option<String>,

        /// Run in the background and return immediately
        #[arg(long)]
        detach: bool,
    },

    /// Show stored filters
    List,

    /// Remove a filter
    Rm {
        /// Host entry to edit
        host: String,

        /// 1-based index printed by the list command
        #[arg(allow_negative_numbers = true)]
        index: i64,
    },

    /// Re-register userscripts for all saved hosts
    Sync,

    /// Print the userscript generated for a host
    Preview {
        /// Host entry to render
        host: String,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

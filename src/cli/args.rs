//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Rack-aware cluster topology: inspect racks, leaves and ensemble placement
#[derive(Parser, Debug)]
#[command(name = "racktopo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (repeat for more: -d -d -d)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Cluster file listing nodes and racks
    #[arg(short, long, global = true, env = "RACKTOPO_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the topology as a tree
    Tree,

    /// List leaves within a scope ("~/rack" excludes a subtree)
    Leaves {
        /// Scope path; the whole cluster when omitted
        #[arg(default_value = "", allow_hyphen_values = true)]
        scope: String,
    },

    /// Pick a random leaf within a scope
    Choose {
        /// Scope path; the whole cluster when omitted
        #[arg(default_value = "", allow_hyphen_values = true)]
        scope: String,
    },

    /// List rack paths
    Racks,

    /// Print rack count, leaf count and every leaf path
    Summary,

    /// Choose a rack-diverse ensemble
    Ensemble {
        /// Number of nodes
        #[arg(short = 'n', long)]
        size: usize,

        /// Bookie ids that must not be chosen
        #[arg(short, long, num_args = 1..)]
        exclude: Vec<String>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a config template
    Template,

    /// Show config paths
    Path,
}

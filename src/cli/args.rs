//! CLI argument parsing

use crate::serve::DEFAULT_PORT;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Generate a static study site from vocabulary and grammar data
#[derive(Parser, Debug)]
#[command(name = "studysite")]
#[command(about = "Generate a static study site from vocabulary and grammar data")]
#[command(version)]
pub struct Args {
    /// Config file path
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Directory overrides shared by the commands
#[derive(ClapArgs, Debug, Default, Clone, PartialEq)]
pub struct DirArgs {
    /// Source data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Template directory
    #[arg(long)]
    pub template_dir: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the whole site
    Build {
        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Serve the generated site locally, building it first if needed
    Preview {
        /// Port to serve on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Remove the output directory
    Clean {
        #[command(flatten)]
        dirs: DirArgs,
    },
}

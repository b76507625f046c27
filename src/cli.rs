use crate::error::Result;
use crate::output_formats::OutputFormat;
use crate::search::SearchOptions;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Traffic dump (JSON) to search
    #[clap(long, global = true, value_parser)]
    pub traffic: Option<PathBuf>,

    /// Config file, instead of the discovered one
    #[clap(long, global = true, value_parser)]
    pub config: Option<PathBuf>,

    #[clap(long, global = true, value_parser)]
    pub log: Option<PathBuf>,

    #[clap(long, global = true, value_parser, default_value_t = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a grep scan over the traffic dump
    Search {
        pattern: String,

        #[clap(flatten)]
        options: SearchArgs,

        #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,

        /// Write results to a file instead of stdout
        #[clap(long, value_parser)]
        out: Option<PathBuf>,

        #[clap(long, value_parser, default_value_t = false)]
        copy: bool,

        /// Print scan counters to stderr when done
        #[clap(long, value_parser, default_value_t = false)]
        metrics: bool,
    },
    /// Print the host filter expression a search would use
    Filter {
        pattern: String,

        #[clap(flatten)]
        options: SearchArgs,
    },
    /// Manage saved patterns
    Patterns {
        #[clap(subcommand)]
        action: PatternAction,
    },
    Completions {
        #[clap(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct SearchArgs {
    #[clap(long, value_parser, default_value_t = false)]
    pub no_requests: bool,

    #[clap(long, value_parser, default_value_t = false)]
    pub no_responses: bool,

    #[clap(long, value_parser)]
    pub max_results: Option<usize>,

    /// Capture groups to prefer, in priority order
    #[clap(long = "group", value_parser, use_value_delimiter = true)]
    pub groups: Vec<usize>,

    #[clap(long, value_parser, default_value_t = false)]
    pub in_scope: bool,

    /// Skip responses of 10 MiB and larger
    #[clap(long, value_parser, default_value_t = false)]
    pub skip_large: bool,

    /// Extra filter expression ANDed into the host query
    #[clap(long, value_parser)]
    pub filter: Option<String>,

    /// Drop matches with non-printable characters
    #[clap(long, value_parser, default_value_t = false)]
    pub cleanup: bool,

    /// JavaScript function body run on every match as `match`
    #[clap(long, value_parser, conflicts_with = "transform_file")]
    pub transform: Option<String>,

    #[clap(long, value_parser)]
    pub transform_file: Option<PathBuf>,
}

impl SearchArgs {
    pub fn to_options(&self) -> Result<SearchOptions> {
        let transform_script = match (&self.transform, &self.transform_file) {
            (Some(script), _) => Some(script.clone()),
            (None, Some(path)) => Some(fs::read_to_string(path)?),
            (None, None) => None,
        };

        Ok(SearchOptions {
            include_requests: !self.no_requests,
            include_responses: !self.no_responses,
            max_results: self.max_results,
            match_groups: (!self.groups.is_empty()).then(|| self.groups.clone()),
            only_in_scope: self.in_scope,
            skip_large_responses: self.skip_large,
            custom_filter: self.filter.clone(),
            cleanup_output: self.cleanup,
            transform_script,
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum PatternAction {
    List,
    Upsert { id: String, pattern: String },
    Delete { id: String },
}

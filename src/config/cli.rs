use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the lectern binary.
#[derive(Debug, Parser)]
#[command(name = "lectern", version, about = "Lectern article repository tool")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "LECTERN_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate,
    /// Print the most recently updated published articles.
    Recent(CountArgs),
    /// Print a random sample of published articles.
    Random(RandomArgs),
    /// Print the article published under a permalink.
    Show(ShowArgs),
    /// Print the previous and next published articles around an id.
    Neighbors(NeighborsArgs),
}

#[derive(Debug, Args, Clone)]
pub struct CountArgs {
    /// Number of articles to return.
    #[arg(short = 'n', long, default_value_t = 10)]
    pub count: u32,
}

#[derive(Debug, Args, Clone)]
pub struct RandomArgs {
    #[command(flatten)]
    pub count: CountArgs,

    /// Seed for the sampling pivot, for reproducible runs.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[arg(value_name = "PERMALINK")]
    pub permalink: String,
}

#[derive(Debug, Args, Clone)]
pub struct NeighborsArgs {
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT", global = true)]
    pub database_max_connections: Option<u32>,

    /// Override the article cache capacity (0 keeps every article).
    #[arg(long = "cache-article-limit", value_name = "COUNT", global = true)]
    pub cache_article_limit: Option<usize>,

    /// Override the offset added to the random sampling pivot.
    #[arg(long = "sampling-pivot-offset", value_name = "OFFSET", global = true)]
    pub sampling_pivot_offset: Option<f64>,
}

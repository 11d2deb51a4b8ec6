mod cmd;
mod context;
mod notify;
mod output;

use clap::{Parser, Subcommand};
use cmd::{
    activity::ActivitySubcommand, config::ConfigSubcommand, objective::ObjectiveSubcommand,
    token::TokenSubcommand,
};
use context::Context;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "okr",
    about = "OKR dashboard mutations with double-submit protection",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (missing file = defaults)
    #[arg(long, global = true, env = "OKR_CONFIG", default_value = "okr.yaml")]
    config: PathBuf,

    /// REST API base URL (overrides api.base_url)
    #[arg(long, global = true, env = "OKR_API_URL")]
    api_url: Option<String>,

    /// Session token (overrides api.token)
    #[arg(long, global = true, env = "OKR_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Work against a local YAML data file instead of the REST API
    #[arg(long, global = true)]
    local: bool,

    /// Data file used with --local
    #[arg(long, global = true, env = "OKR_DATA", default_value = "okr-data.yaml")]
    data: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage objectives
    Objective {
        #[command(subcommand)]
        subcommand: ObjectiveSubcommand,
    },

    /// Manage activities within an objective
    Activity {
        #[command(subcommand)]
        subcommand: ActivitySubcommand,
    },

    /// Inspect or watch the session token
    Token {
        #[command(subcommand)]
        subcommand: TokenSubcommand,
    },

    /// Run a scripted double-submit scenario against an in-memory store
    Demo,

    /// Show, validate or initialize the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Token {
            subcommand: TokenSubcommand::Watch,
        } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = Context::load(
        &cli.config,
        cli.api_url,
        cli.token,
        cli.local.then_some(cli.data),
        cli.json,
    )
    .and_then(|ctx| match cli.command {
        Commands::Objective { subcommand } => cmd::objective::run(&ctx, subcommand),
        Commands::Activity { subcommand } => cmd::activity::run(&ctx, subcommand),
        Commands::Token { subcommand } => cmd::token::run(&ctx, subcommand),
        Commands::Demo => cmd::demo::run(&ctx),
        Commands::Config { subcommand } => cmd::config::run(&ctx, &cli.config, subcommand),
    });

    if let Err(e) = result {
        // Full error chain
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

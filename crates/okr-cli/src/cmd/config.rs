use crate::context::Context;
use crate::output::print_json;
use clap::Subcommand;
use okr_core::config::WarnLevel;
use okr_core::OkrConfig;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration (file plus flag overrides)
    Show,

    /// Validate the config for settings that break the coordinator
    Validate,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(ctx: &Context, config_path: &Path, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Validate => validate(ctx),
        ConfigSubcommand::Init { force } => init(config_path, force),
    }
}

fn show(ctx: &Context) -> anyhow::Result<()> {
    if ctx.json {
        print_json(&ctx.config)?;
    } else {
        print!("{}", serde_yaml::to_string(&ctx.config)?);
    }
    Ok(())
}

fn validate(ctx: &Context) -> anyhow::Result<()> {
    let warnings = ctx.config.validate();

    if ctx.json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    OkrConfig::default().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

use clap::Subcommand;
use okr_core::{NewObjective, Objective};

use super::{require, runtime};
use crate::context::Context;
use crate::output::{print_json, print_table};

#[derive(Subcommand)]
pub enum ObjectiveSubcommand {
    /// List objectives
    List,
    /// Create an objective
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete an objective and its activities
    Delete { id: String },
}

pub fn run(ctx: &Context, subcmd: ObjectiveSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ObjectiveSubcommand::List => list(ctx),
        ObjectiveSubcommand::Add { title, description } => add(ctx, title, description),
        ObjectiveSubcommand::Delete { id } => delete(ctx, &id),
    }
}

fn list(ctx: &Context) -> anyhow::Result<()> {
    let source = ctx.source()?;
    let objectives = runtime()?.block_on(source.list_objectives())?;

    if ctx.json {
        print_json(&objectives)?;
    } else if objectives.is_empty() {
        println!("No objectives.");
    } else {
        print_objectives(&objectives);
    }
    Ok(())
}

fn add(ctx: &Context, title: String, description: String) -> anyhow::Result<()> {
    let handlers = ctx.handlers()?;
    let data = NewObjective::new(title.clone(), description);
    let outcome = runtime()?.block_on(handlers.add_objective(data));
    let id = require(outcome, "add objective")?;
    ctx.persist()?;

    if ctx.json {
        print_json(&serde_json::json!({ "id": id, "title": title }))?;
    } else {
        println!("Created objective [{id}]: {title}");
    }
    Ok(())
}

fn delete(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let handlers = ctx.handlers()?;
    let outcome = runtime()?.block_on(handlers.delete_objective(id));
    require(outcome, "delete objective")?;
    ctx.persist()?;

    if ctx.json {
        print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
    } else {
        println!("Deleted objective [{id}]");
    }
    Ok(())
}

pub(crate) fn print_objectives(objectives: &[Objective]) {
    let rows: Vec<Vec<String>> = objectives
        .iter()
        .map(|o| {
            vec![
                o.id.clone(),
                o.title.clone(),
                format!("{}%", o.progress),
                o.activities.len().to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "TITLE", "PROGRESS", "ACTIVITIES"], &rows);
}

use clap::{Args, Subcommand};
use okr_core::{ActivityStatus, NewActivity};

use super::{require, runtime};
use crate::context::Context;
use crate::output::print_json;

#[derive(Args)]
pub struct ActivityFields {
    #[arg(long)]
    pub title: String,
    /// Not Started, In Progress, At Risk, Completed or On Hold
    #[arg(long, default_value = "Not Started")]
    pub status: ActivityStatus,
    /// Percentage, 0-100
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub progress: u8,
    #[arg(long, default_value = "")]
    pub assignee: String,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due_date: Option<String>,
    #[arg(long)]
    pub observation: Option<String>,
}

impl From<ActivityFields> for NewActivity {
    fn from(f: ActivityFields) -> Self {
        NewActivity {
            title: f.title,
            status: f.status,
            progress: f.progress,
            assignee: f.assignee,
            due_date: f.due_date,
            observation: f.observation,
        }
    }
}

#[derive(Subcommand)]
pub enum ActivitySubcommand {
    /// Add an activity to an objective
    Add {
        objective: String,
        #[command(flatten)]
        fields: ActivityFields,
    },
    /// Replace an activity's fields
    Update {
        objective: String,
        activity: String,
        #[command(flatten)]
        fields: ActivityFields,
    },
    /// Remove an activity
    Delete { objective: String, activity: String },
}

pub fn run(ctx: &Context, subcmd: ActivitySubcommand) -> anyhow::Result<()> {
    match subcmd {
        ActivitySubcommand::Add { objective, fields } => add(ctx, &objective, fields.into()),
        ActivitySubcommand::Update {
            objective,
            activity,
            fields,
        } => update(ctx, &objective, &activity, fields.into()),
        ActivitySubcommand::Delete {
            objective,
            activity,
        } => delete(ctx, &objective, &activity),
    }
}

fn add(ctx: &Context, objective: &str, activity: NewActivity) -> anyhow::Result<()> {
    let handlers = ctx.handlers()?;
    let title = activity.title.clone();
    let outcome = runtime()?.block_on(handlers.add_activity(objective, activity));
    let id = require(outcome, "add activity")?;
    ctx.persist()?;

    if ctx.json {
        print_json(&serde_json::json!({ "objective": objective, "id": id, "title": title }))?;
    } else {
        println!("Added activity [{id}] to objective [{objective}]: {title}");
    }
    Ok(())
}

fn update(ctx: &Context, objective: &str, id: &str, fields: NewActivity) -> anyhow::Result<()> {
    let handlers = ctx.handlers()?;
    let item = fields.with_id(id.to_string());
    let progress = item.progress;
    let status = item.status;
    let outcome = runtime()?.block_on(handlers.update_activity(objective, item));
    require(outcome, "update activity")?;
    ctx.persist()?;

    if ctx.json {
        print_json(&serde_json::json!({
            "objective": objective,
            "id": id,
            "status": status,
            "progress": progress,
        }))?;
    } else {
        println!("Updated activity [{id}]: {status}, {progress}%");
    }
    Ok(())
}

fn delete(ctx: &Context, objective: &str, id: &str) -> anyhow::Result<()> {
    let handlers = ctx.handlers()?;
    let outcome = runtime()?.block_on(handlers.delete_activity(objective, id));
    require(outcome, "delete activity")?;
    ctx.persist()?;

    if ctx.json {
        print_json(&serde_json::json!({ "objective": objective, "id": id, "deleted": true }))?;
    } else {
        println!("Deleted activity [{id}] from objective [{objective}]");
    }
    Ok(())
}

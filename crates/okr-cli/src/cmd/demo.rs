use std::sync::Arc;
use std::time::Duration;

use okr_core::handlers::COMPLETION_DELAY;
use okr_core::{ActionOutcome, ActivityStatus, LocalObjectiveStore, NewActivity, NewObjective};

use super::{require, runtime};
use crate::context::Context;
use crate::output::print_json;

/// Scripted walk through the coordinator against a throwaway in-memory store.
pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let store = Arc::new(LocalObjectiveStore::new());
    let handlers = ctx.handlers_for(store.clone());
    let settle = ctx.config.coordinator.trailing_delay().max(COMPLETION_DELAY) + Duration::from_millis(50);

    runtime()?.block_on(async {
        let objective_id = require(
            handlers
                .add_objective(NewObjective::new("Grow revenue", "Demo objective"))
                .await,
            "add objective",
        )?;
        println!("created objective [{objective_id}]");
        tokio::time::sleep(settle).await;

        let activity = NewActivity {
            assignee: "Ana".into(),
            ..NewActivity::new("Sign three enterprise customers")
        };
        let activity_id = require(
            handlers.add_activity(&objective_id, activity.clone()).await,
            "add activity",
        )?;
        println!("added activity [{activity_id}]");
        tokio::time::sleep(settle).await;

        // Same update submitted twice, as a double click would.
        let update = NewActivity {
            status: ActivityStatus::InProgress,
            progress: 40,
            ..activity.clone()
        }
        .with_id(activity_id.clone());
        let (first, second) = tokio::join!(
            handlers.update_activity(&objective_id, update.clone()),
            handlers.update_activity(&objective_id, update),
        );
        println!("double submit: first {}, second {}", describe(&first), describe(&second));

        tokio::time::sleep(settle).await;
        let retry = NewActivity {
            status: ActivityStatus::Completed,
            progress: 100,
            ..activity
        }
        .with_id(activity_id);
        let outcome = handlers.update_activity(&objective_id, retry).await;
        println!("retry after {}ms: {}", settle.as_millis(), describe(&outcome));
        require(outcome, "update activity")?;
        Ok::<_, anyhow::Error>(())
    })?;

    let objectives = store.objectives();
    if ctx.json {
        print_json(&objectives)?;
    } else {
        super::objective::print_objectives(&objectives);
    }
    Ok(())
}

fn describe<T>(outcome: &ActionOutcome<T>) -> String {
    match outcome {
        ActionOutcome::Completed(_) => "completed".to_string(),
        ActionOutcome::Failed(reason) => format!("failed ({reason})"),
        ActionOutcome::Dropped => "dropped".to_string(),
    }
}

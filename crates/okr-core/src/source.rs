use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ActivityItem, NewActivity, NewObjective, Objective};

/// The mutations the dashboard can perform.
///
/// Implemented by the in-memory [`LocalObjectiveStore`](crate::store::LocalObjectiveStore)
/// and the REST-backed [`RemoteObjectiveStore`](crate::remote::RemoteObjectiveStore);
/// which one backs a dashboard is decided by the caller.
#[async_trait]
pub trait ObjectiveSource: Send + Sync {
    async fn list_objectives(&self) -> Result<Vec<Objective>>;

    /// Returns the id of the created objective.
    async fn add_objective(&self, data: NewObjective) -> Result<String>;

    /// Returns the id of the created activity.
    async fn add_activity(&self, objective_id: &str, activity: NewActivity) -> Result<String>;

    async fn update_activity(&self, objective_id: &str, activity: ActivityItem) -> Result<()>;

    async fn delete_activity(&self, objective_id: &str, activity_id: &str) -> Result<()>;

    async fn delete_objective(&self, objective_id: &str) -> Result<()>;
}

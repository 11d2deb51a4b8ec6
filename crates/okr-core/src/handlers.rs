use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::CoordinatorConfig;
use crate::error::Result;
use crate::executor::{ActionExecutor, ActionOptions, ActionOutcome};
use crate::lifetime::MountLifetime;
use crate::notify::Notifier;
use crate::pending::{PendingActionId, PendingActions};
use crate::source::ObjectiveSource;
use crate::types::{ActivityItem, NewActivity, NewObjective};

pub const OBJECTIVE_CREATED: &str = "Objetivo criado com sucesso";
pub const OBJECTIVE_DELETED: &str = "Objetivo removido com sucesso";
pub const ACTIVITY_ADDED: &str = "Atividade adicionada com sucesso";
pub const ACTIVITY_UPDATED: &str = "Atividade atualizada com sucesso";
pub const ACTIVITY_DELETED: &str = "Atividade removida com sucesso";

/// Grace period before a finished action leaves the pending registry.
pub const COMPLETION_DELAY: Duration = Duration::from_millis(300);

/// Dashboard mutations guarded against double submission.
///
/// Each handler builds a fresh [`PendingActionId`], refuses to run while the
/// id is registered or any action is in flight, and otherwise runs the
/// mutation through the shared [`ActionExecutor`]. Nothing is returned as an
/// error: failures become an error notification and
/// [`ActionOutcome::Failed`], refusals become [`ActionOutcome::Dropped`].
#[derive(Clone)]
pub struct DomainActionHandlers {
    source: Arc<dyn ObjectiveSource>,
    executor: ActionExecutor,
    pending: PendingActions,
}

impl DomainActionHandlers {
    pub fn new(
        source: Arc<dyn ObjectiveSource>,
        notifier: Arc<dyn Notifier>,
        config: CoordinatorConfig,
    ) -> Self {
        Self::with_lifetime(source, notifier, config, MountLifetime::new())
    }

    pub fn with_lifetime(
        source: Arc<dyn ObjectiveSource>,
        notifier: Arc<dyn Notifier>,
        config: CoordinatorConfig,
        lifetime: MountLifetime,
    ) -> Self {
        let pending = PendingActions::from_config(lifetime.clone(), &config);
        let executor = ActionExecutor::with_lifetime(lifetime, notifier, config);
        Self {
            source,
            executor,
            pending,
        }
    }

    pub fn source(&self) -> &Arc<dyn ObjectiveSource> {
        &self.source
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    pub fn is_processing(&self) -> bool {
        self.executor.is_processing()
    }

    pub fn is_action_pending(&self, id: &PendingActionId) -> bool {
        self.pending.is_action_pending(id)
    }

    pub fn pending_actions_count(&self) -> usize {
        self.pending.pending_actions_count()
    }

    pub fn any_actions_pending(&self) -> bool {
        self.pending.any_actions_pending()
    }

    /// Tear down: suppress further writes and abort every timer.
    pub fn unmount(&self) {
        self.executor.lifetime().unmount();
        self.executor.state().dispose();
        self.pending.dispose();
    }

    pub async fn add_objective(&self, data: NewObjective) -> ActionOutcome<String> {
        let id = PendingActionId::new("addObjective", None);
        self.run(id, OBJECTIVE_CREATED, self.source.add_objective(data))
            .await
    }

    pub async fn add_activity(&self, objective_id: &str, activity: NewActivity) -> ActionOutcome<String> {
        let id = PendingActionId::new("addActivity", Some(objective_id));
        self.run(
            id,
            ACTIVITY_ADDED,
            self.source.add_activity(objective_id, activity),
        )
        .await
    }

    pub async fn update_activity(&self, objective_id: &str, activity: ActivityItem) -> ActionOutcome<()> {
        let id = PendingActionId::new("updateActivity", Some(&activity.id));
        debug!(
            activity = %activity.id,
            progress = activity.progress,
            "starting activity update"
        );
        self.run(
            id,
            ACTIVITY_UPDATED,
            self.source.update_activity(objective_id, activity),
        )
        .await
    }

    pub async fn delete_activity(&self, objective_id: &str, activity_id: &str) -> ActionOutcome<()> {
        let id = PendingActionId::new("deleteActivity", Some(activity_id));
        self.run(
            id,
            ACTIVITY_DELETED,
            self.source.delete_activity(objective_id, activity_id),
        )
        .await
    }

    pub async fn delete_objective(&self, objective_id: &str) -> ActionOutcome<()> {
        let id = PendingActionId::new("deleteObjective", Some(objective_id));
        self.run(
            id,
            OBJECTIVE_DELETED,
            self.source.delete_objective(objective_id),
        )
        .await
    }

    async fn run<T, Fut>(&self, id: PendingActionId, success: &str, mutation: Fut) -> ActionOutcome<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        if self.pending.is_action_pending(&id) || self.executor.is_processing() {
            debug!(action = %id, "action blocked - already processing");
            return ActionOutcome::Dropped;
        }

        let _pending = self.pending.track(id, COMPLETION_DELAY);
        self.executor
            .execute(|| mutation, ActionOptions::new().success_message(success))
            .await
    }
}

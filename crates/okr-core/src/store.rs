use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{OkrError, Result};
use crate::source::ObjectiveSource;
use crate::types::{calculate_average_progress, ActivityItem, NewActivity, NewObjective, Objective};

/// On-disk shape of a saved store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    objectives: Vec<Objective>,
}

#[derive(Debug)]
struct StoreState {
    objectives: Vec<Objective>,
    version: u64,
}

/// In-memory objective store.
///
/// Every mutation recomputes the touched objective's progress and bumps a
/// version counter that views can use to detect changes.
#[derive(Debug)]
pub struct LocalObjectiveStore {
    state: Mutex<StoreState>,
}

impl LocalObjectiveStore {
    pub fn new() -> Self {
        Self::with_objectives(Vec::new())
    }

    pub fn with_objectives(objectives: Vec<Objective>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                objectives,
                version: 1,
            }),
        }
    }

    /// Load a store saved with [`save`](Self::save). A missing file yields an
    /// empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = std::fs::read_to_string(path)?;
        let file: StoreFile = if data.trim().is_empty() {
            StoreFile::default()
        } else {
            serde_yaml::from_str(&data)?
        };
        Ok(Self::with_objectives(file.objectives))
    }

    /// Write the store to `path` through a tempfile in the same directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = StoreFile {
            objectives: self.objectives(),
        };
        let data = serde_yaml::to_string(&file)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn objectives(&self) -> Vec<Objective> {
        self.lock().objectives.clone()
    }

    pub fn objective(&self, objective_id: &str) -> Option<Objective> {
        self.lock()
            .objectives
            .iter()
            .find(|o| o.id == objective_id)
            .cloned()
    }

    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Rename an assignee across every activity. Returns how many changed.
    pub fn update_assignee_names(&self, old_name: &str, new_name: &str) -> usize {
        let mut state = self.lock();
        let mut changed = 0;
        for activity in state
            .objectives
            .iter_mut()
            .flat_map(|o| o.activities.iter_mut())
            .filter(|a| a.assignee == old_name)
        {
            activity.assignee = new_name.to_string();
            changed += 1;
        }
        state.version += 1;
        changed
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LocalObjectiveStore {
    fn default() -> Self {
        Self::new()
    }
}

fn recompute(objective: &mut Objective) {
    objective.progress = calculate_average_progress(&objective.activities);
}

#[async_trait]
impl ObjectiveSource for LocalObjectiveStore {
    async fn list_objectives(&self) -> Result<Vec<Objective>> {
        Ok(self.objectives())
    }

    async fn add_objective(&self, data: NewObjective) -> Result<String> {
        data.validate()?;
        let objective = Objective {
            id: uuid::Uuid::new_v4().to_string(),
            title: data.title.trim().to_string(),
            description: data.description,
            progress: 0,
            activities: Vec::new(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        let id = objective.id.clone();

        let mut state = self.lock();
        state.objectives.push(objective);
        state.version += 1;
        debug!(objective = %id, "objective added");
        Ok(id)
    }

    async fn add_activity(&self, objective_id: &str, activity: NewActivity) -> Result<String> {
        activity.validate()?;
        let mut state = self.lock();
        let objective = state
            .objectives
            .iter_mut()
            .find(|o| o.id == objective_id)
            .ok_or_else(|| OkrError::ObjectiveNotFound(objective_id.to_string()))?;

        let item = activity.with_id(uuid::Uuid::new_v4().to_string());
        let id = item.id.clone();
        objective.activities.push(item);
        recompute(objective);
        state.version += 1;
        debug!(objective = objective_id, activity = %id, "activity added");
        Ok(id)
    }

    async fn update_activity(&self, objective_id: &str, activity: ActivityItem) -> Result<()> {
        activity.validate()?;
        let mut state = self.lock();

        // Trust where the activity actually lives over the caller's objective id.
        let owner = state
            .objectives
            .iter()
            .position(|o| o.activities.iter().any(|a| a.id == activity.id))
            .ok_or_else(|| OkrError::ActivityNotFound(activity.id.clone()))?;
        if state.objectives[owner].id != objective_id {
            warn!(
                activity = %activity.id,
                expected = objective_id,
                actual = %state.objectives[owner].id,
                "activity found in a different objective than expected"
            );
        }

        let objective = &mut state.objectives[owner];
        if let Some(slot) = objective.activities.iter_mut().find(|a| a.id == activity.id) {
            *slot = activity;
        }
        recompute(objective);
        state.version += 1;
        Ok(())
    }

    async fn delete_activity(&self, objective_id: &str, activity_id: &str) -> Result<()> {
        let mut state = self.lock();
        let objective = state
            .objectives
            .iter_mut()
            .find(|o| o.id == objective_id)
            .ok_or_else(|| OkrError::ObjectiveNotFound(objective_id.to_string()))?;

        let before = objective.activities.len();
        objective.activities.retain(|a| a.id != activity_id);
        if objective.activities.len() == before {
            return Err(OkrError::ActivityNotFound(activity_id.to_string()));
        }
        recompute(objective);
        state.version += 1;
        Ok(())
    }

    async fn delete_objective(&self, objective_id: &str) -> Result<()> {
        let mut state = self.lock();
        let before = state.objectives.len();
        state.objectives.retain(|o| o.id != objective_id);
        if state.objectives.len() == before {
            return Err(OkrError::ObjectiveNotFound(objective_id.to_string()));
        }
        state.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActivityStatus;

    async fn seeded() -> (LocalObjectiveStore, String) {
        let store = LocalObjectiveStore::new();
        let id = store
            .add_objective(NewObjective::new("Grow revenue", "Q3 target"))
            .await
            .unwrap();
        (store, id)
    }

    fn activity(title: &str, progress: u8) -> NewActivity {
        NewActivity {
            progress,
            assignee: "Ana".into(),
            ..NewActivity::new(title)
        }
    }

    #[tokio::test]
    async fn add_objective_starts_empty() {
        let (store, id) = seeded().await;
        let objective = store.objective(&id).unwrap();
        assert_eq!(objective.title, "Grow revenue");
        assert_eq!(objective.progress, 0);
        assert!(objective.activities.is_empty());
        assert!(objective.created_at.is_some());
        assert_eq!(store.version(), 2);
    }

    #[tokio::test]
    async fn add_objective_rejects_blank_title() {
        let store = LocalObjectiveStore::new();
        let err = store
            .add_objective(NewObjective::new("  ", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, OkrError::InvalidInput(_)));
        assert_eq!(store.version(), 1);
    }

    #[tokio::test]
    async fn activities_drive_objective_progress() {
        let (store, id) = seeded().await;
        store.add_activity(&id, activity("Hire", 20)).await.unwrap();
        let second = store.add_activity(&id, activity("Launch", 60)).await.unwrap();
        assert_eq!(store.objective(&id).unwrap().progress, 40);

        let mut updated = store
            .objective(&id)
            .unwrap()
            .activities
            .into_iter()
            .find(|a| a.id == second)
            .unwrap();
        updated.progress = 100;
        updated.status = ActivityStatus::Completed;
        store.update_activity(&id, updated).await.unwrap();
        assert_eq!(store.objective(&id).unwrap().progress, 60);

        store.delete_activity(&id, &second).await.unwrap();
        assert_eq!(store.objective(&id).unwrap().progress, 20);
    }

    #[tokio::test]
    async fn add_activity_to_unknown_objective_fails() {
        let store = LocalObjectiveStore::new();
        let err = store
            .add_activity("missing", activity("Hire", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, OkrError::ObjectiveNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn update_corrects_mismatched_objective_id() {
        let (store, first) = seeded().await;
        let second = store
            .add_objective(NewObjective::new("Retain users", ""))
            .await
            .unwrap();
        let activity_id = store.add_activity(&first, activity("Survey", 10)).await.unwrap();

        let mut item = store.objective(&first).unwrap().activities[0].clone();
        item.progress = 90;
        store.update_activity(&second, item).await.unwrap();

        assert_eq!(store.objective(&first).unwrap().activities[0].id, activity_id);
        assert_eq!(store.objective(&first).unwrap().progress, 90);
        assert!(store.objective(&second).unwrap().activities.is_empty());
    }

    #[tokio::test]
    async fn update_unknown_activity_fails() {
        let (store, id) = seeded().await;
        let ghost = activity("Ghost", 0).with_id("nope".into());
        let err = store.update_activity(&id, ghost).await.unwrap_err();
        assert!(matches!(err, OkrError::ActivityNotFound(_)));
    }

    #[tokio::test]
    async fn delete_objective_removes_it() {
        let (store, id) = seeded().await;
        store.delete_objective(&id).await.unwrap();
        assert!(store.objectives().is_empty());
        assert!(store.delete_objective(&id).await.is_err());
    }

    #[tokio::test]
    async fn save_then_load_keeps_objectives() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data/okr-data.yaml");
        let (store, id) = seeded().await;
        store.add_activity(&id, activity("Hire", 40)).await.unwrap();
        store.save(&path).unwrap();

        let loaded = LocalObjectiveStore::load(&path).unwrap();
        let objective = loaded.objective(&id).unwrap();
        assert_eq!(objective.progress, 40);
        assert_eq!(objective.activities[0].assignee, "Ana");
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = LocalObjectiveStore::load(&dir.path().join("absent.yaml")).unwrap();
        assert!(store.objectives().is_empty());
    }

    #[tokio::test]
    async fn rename_assignee_everywhere() {
        let (store, id) = seeded().await;
        store.add_activity(&id, activity("Hire", 0)).await.unwrap();
        store.add_activity(&id, activity("Launch", 0)).await.unwrap();
        let version = store.version();

        assert_eq!(store.update_assignee_names("Ana", "Ana Souza"), 2);
        assert!(store
            .objective(&id)
            .unwrap()
            .activities
            .iter()
            .all(|a| a.assignee == "Ana Souza"));
        assert_eq!(store.version(), version + 1);
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{OkrError, Result};

// ---------------------------------------------------------------------------
// ActivityStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ActivityStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "On Hold")]
    OnHold,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::NotStarted => "Not Started",
            ActivityStatus::InProgress => "In Progress",
            ActivityStatus::AtRisk => "At Risk",
            ActivityStatus::Completed => "Completed",
            ActivityStatus::OnHold => "On Hold",
        }
    }

    /// Backend key-result status used by the REST source.
    pub fn as_api_status(&self) -> &'static str {
        match self {
            ActivityStatus::NotStarted => "PLANNED",
            ActivityStatus::InProgress => "ON_TRACK",
            ActivityStatus::AtRisk => "AT_RISK",
            ActivityStatus::Completed => "COMPLETED",
            ActivityStatus::OnHold => "BEHIND",
        }
    }
}

impl ActivityStatus {
    /// Inverse of [`as_api_status`](Self::as_api_status). Unknown values map
    /// to `NotStarted`.
    pub fn from_api_status(status: &str) -> Self {
        match status {
            "ON_TRACK" => ActivityStatus::InProgress,
            "AT_RISK" => ActivityStatus::AtRisk,
            "COMPLETED" => ActivityStatus::Completed,
            "BEHIND" => ActivityStatus::OnHold,
            _ => ActivityStatus::NotStarted,
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityStatus {
    type Err = OkrError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "not started" => Ok(ActivityStatus::NotStarted),
            "in progress" => Ok(ActivityStatus::InProgress),
            "at risk" => Ok(ActivityStatus::AtRisk),
            "completed" => Ok(ActivityStatus::Completed),
            "on hold" => Ok(ActivityStatus::OnHold),
            _ => Err(OkrError::InvalidInput(format!("unknown activity status '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// ActivityItem / NewActivity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub id: String,
    pub title: String,
    pub status: ActivityStatus,
    /// Percentage in `0..=100`.
    pub progress: u8,
    pub assignee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

/// An activity that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub title: String,
    #[serde(default)]
    pub status: ActivityStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub assignee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

impl NewActivity {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: ActivityStatus::default(),
            progress: 0,
            assignee: String::new(),
            due_date: None,
            observation: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_progress(self.progress)
    }

    pub fn with_id(self, id: String) -> ActivityItem {
        ActivityItem {
            id,
            title: self.title,
            status: self.status,
            progress: self.progress,
            assignee: self.assignee,
            due_date: self.due_date,
            observation: self.observation,
        }
    }
}

impl ActivityItem {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(OkrError::InvalidInput("activity id must not be empty".into()));
        }
        validate_title(&self.title)?;
        validate_progress(self.progress)
    }
}

// ---------------------------------------------------------------------------
// Objective / NewObjective
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub activities: Vec<ActivityItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObjective {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl NewObjective {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        if self.description.chars().count() > 1000 {
            return Err(OkrError::InvalidInput(
                "description must be at most 1000 characters".into(),
            ));
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<()> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(OkrError::InvalidInput("title must not be empty".into()));
    }
    if trimmed.chars().count() > 200 {
        return Err(OkrError::InvalidInput(
            "title must be at most 200 characters".into(),
        ));
    }
    Ok(())
}

fn validate_progress(progress: u8) -> Result<()> {
    if progress > 100 {
        return Err(OkrError::InvalidInput(format!(
            "progress must be between 0 and 100, got {progress}"
        )));
    }
    Ok(())
}

/// Rounded mean of the activities' progress; 0 when there are none.
pub fn calculate_average_progress(activities: &[ActivityItem]) -> u8 {
    if activities.is_empty() {
        return 0;
    }
    let total: u32 = activities.iter().map(|a| u32::from(a.progress)).sum();
    let mean = f64::from(total) / activities.len() as f64;
    mean.round().min(100.0) as u8
}

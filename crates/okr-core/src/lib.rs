//! Mutation coordinator for the OKR dashboard.
//!
//! Dashboard mutations (add/update/delete objectives and activities) run
//! through a small stack of state holders that keeps at most one mutation in
//! flight per view and never leaves the view stuck in a loading state.
//!
//! # Architecture
//!
//! ```text
//! DomainActionHandlers   ← add_objective / add_activity / update_activity / …
//!     │   checks PendingActions + processing flag, then delegates
//!     ▼
//! ActionExecutor         ← success / error notification, trailing delay
//!     │
//!     ▼
//! ProcessingState        ← in-flight flag + 5 s safety reset
//!
//! ObjectiveSource        ← LocalObjectiveStore (memory) | RemoteObjectiveStore (REST)
//! Notifier               ← toast sink
//! MountLifetime          ← suppresses writes after the view goes away
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use okr_core::{CoordinatorConfig, DomainActionHandlers, LocalObjectiveStore, NewObjective, TracingNotifier};
//!
//! let handlers = DomainActionHandlers::new(
//!     Arc::new(LocalObjectiveStore::new()),
//!     Arc::new(TracingNotifier),
//!     CoordinatorConfig::default(),
//! );
//! let outcome = handlers.add_objective(NewObjective::new("Grow revenue", "")).await;
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod lifetime;
pub mod notify;
pub mod pending;
pub mod processing;
pub mod remote;
pub mod source;
pub mod store;
pub mod token;
pub mod types;

pub use config::{ApiConfig, CoordinatorConfig, OkrConfig, TokenWatchConfig};
pub use error::{OkrError, Result};
pub use executor::{ActionExecutor, ActionOptions, ActionOutcome};
pub use handlers::DomainActionHandlers;
pub use lifetime::MountLifetime;
pub use notify::{Notification, NotificationKind, Notifier, RecordingNotifier, TracingNotifier};
pub use pending::{PendingActionId, PendingActions};
pub use processing::ProcessingState;
pub use remote::{RemoteObjectiveStore, ServerTokenStatus};
pub use source::ObjectiveSource;
pub use store::LocalObjectiveStore;
pub use token::{spawn_token_watchdog, spawn_token_watchdog_with_clock, TokenCheck, TokenChecker};
pub use types::{ActivityItem, ActivityStatus, NewActivity, NewObjective, Objective};

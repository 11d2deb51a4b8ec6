use anyhow::Context as _;
use okr_core::{
    DomainActionHandlers, LocalObjectiveStore, ObjectiveSource, OkrConfig, RemoteObjectiveStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::notify::ConsoleNotifier;

/// Effective settings for one invocation: config file plus flag overrides.
pub struct Context {
    pub config: OkrConfig,
    pub json: bool,
    /// Set when `--local` is given: the YAML-backed store and its file.
    local: Option<(Arc<LocalObjectiveStore>, PathBuf)>,
}

impl Context {
    pub fn load(
        config_path: &Path,
        api_url: Option<String>,
        token: Option<String>,
        local_data: Option<PathBuf>,
        json: bool,
    ) -> anyhow::Result<Self> {
        let mut config = OkrConfig::load(config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?;
        if let Some(url) = api_url {
            config.api.base_url = url;
        }
        if token.is_some() {
            config.api.token = token;
        }

        let local = match local_data {
            Some(path) => {
                let store = LocalObjectiveStore::load(&path)
                    .with_context(|| format!("failed to load {}", path.display()))?;
                Some((Arc::new(store), path))
            }
            None => None,
        };

        Ok(Self {
            config,
            json,
            local,
        })
    }

    pub fn source(&self) -> anyhow::Result<Arc<dyn ObjectiveSource>> {
        if let Some((store, path)) = &self.local {
            tracing::debug!(data = %path.display(), "using local objective store");
            let source: Arc<dyn ObjectiveSource> = store.clone();
            return Ok(source);
        }
        tracing::debug!(base_url = %self.config.api.base_url, "using remote objective store");
        let store =
            RemoteObjectiveStore::new(&self.config.api).context("failed to build API client")?;
        Ok(Arc::new(store))
    }

    pub fn handlers(&self) -> anyhow::Result<DomainActionHandlers> {
        Ok(self.handlers_for(self.source()?))
    }

    pub fn handlers_for(&self, source: Arc<dyn ObjectiveSource>) -> DomainActionHandlers {
        DomainActionHandlers::new(
            source,
            Arc::new(ConsoleNotifier),
            self.config.coordinator.clone(),
        )
    }

    /// Write the local store back to disk. No-op against the REST API.
    pub fn persist(&self) -> anyhow::Result<()> {
        if let Some((store, path)) = &self.local {
            store
                .save(path)
                .with_context(|| format!("failed to save {}", path.display()))?;
        }
        Ok(())
    }
}

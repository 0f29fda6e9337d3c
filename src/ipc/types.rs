use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::Session;
use crate::config::GradebookConfig;
use crate::repo::Repository;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Sidecar state: at most one open workspace and its store connection.
pub struct AppState {
    pub config: GradebookConfig,
    pub workspace: Option<PathBuf>,
    pub repo: Option<Repository>,
    pub session: Option<Session>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            config: GradebookConfig::default(),
            workspace: None,
            repo: None,
            session: None,
        }
    }

    /// Loads the workspace config and acquires its store connection,
    /// releasing any previously open one.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let config = GradebookConfig::load(path)?;
        let repo = Repository::open(path, &config.store)?;
        self.close_workspace();
        self.config = config;
        self.workspace = Some(path.to_path_buf());
        self.repo = Some(repo);
        Ok(())
    }

    /// Returns whether a workspace was open.
    pub fn close_workspace(&mut self) -> bool {
        self.session = None;
        self.workspace = None;
        match self.repo.take() {
            Some(repo) => {
                if let Err(e) = repo.close() {
                    warn!(error = %e, "store did not close cleanly");
                }
                true
            }
            None => false,
        }
    }

    pub fn shutdown(&mut self) {
        if self.close_workspace() {
            info!("workspace released on shutdown");
        }
    }
}

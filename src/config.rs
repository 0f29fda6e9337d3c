//! Workspace configuration.
//!
//! Load order: `<workspace>/gradebook.toml` -> environment variables -> defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

pub const CONFIG_FILE: &str = "gradebook.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GradebookConfig {
    pub store: StoreConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file created inside the workspace directory.
    pub database_file: String,
    /// Table holding the student documents.
    pub collection: String,
    /// How long a writer waits on another process's lock before giving up.
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When set, every data method needs a logged-in session and student
    /// sessions only see their own record.
    pub enforce: bool,
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_file: "student_grades.sqlite3".to_string(),
            collection: "grades".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enforce: false,
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}

/// Returns false when the variable is set but does not parse; the value is then ignored.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) -> bool {
    let Ok(v) = std::env::var(var) else {
        return true;
    };
    match v.trim().parse() {
        Ok(parsed) => {
            *target = parsed;
            true
        }
        Err(_) => {
            warn!(var, value = %v, "ignoring unparseable environment override");
            false
        }
    }
}

/// Accepts plain SQL identifiers only, since the name is spliced into statements.
pub fn is_valid_collection_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl GradebookConfig {
    pub fn load(workspace: &Path) -> Result<Self> {
        let path = workspace.join(CONFIG_FILE);
        let mut config = if path.is_file() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
            toml::from_str(&text)
                .with_context(|| format!("invalid config {}", path.to_string_lossy()))?
        } else {
            Self::default()
        };

        env_override("GRADEBOOK_DATABASE_FILE", &mut config.store.database_file);
        env_override("GRADEBOOK_COLLECTION", &mut config.store.collection);
        env_override("GRADEBOOK_BUSY_TIMEOUT_MS", &mut config.store.busy_timeout_ms);
        env_override("GRADEBOOK_AUTH_ENFORCE", &mut config.auth.enforce);
        env_override("GRADEBOOK_ADMIN_USERNAME", &mut config.auth.admin_username);
        env_override("GRADEBOOK_ADMIN_PASSWORD", &mut config.auth.admin_password);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_collection_name(&self.store.collection) {
            anyhow::bail!(
                "collection name must be a plain identifier: {:?}",
                self.store.collection
            );
        }
        let db_file = self.store.database_file.trim();
        if db_file.is_empty() || db_file.contains('/') || db_file.contains('\\') {
            anyhow::bail!(
                "database_file must be a bare file name: {:?}",
                self.store.database_file
            );
        }
        Ok(())
    }
}

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use termgraph_ecl::EclSettings;
use termgraph_store::{IdentifierPolicy, StoreSettings};

pub const ENV_STRICT_IDENTIFIERS: &str = "TERMGRAPH_STRICT_IDENTIFIERS";
pub const ENV_REMOTE_URL: &str = "TERMGRAPH_REMOTE_URL";
pub const ENV_BRANCH: &str = "TERMGRAPH_BRANCH";
pub const ENV_PAGE_SIZE: &str = "TERMGRAPH_PAGE_SIZE";
pub const ENV_REMOTE_TIMEOUT_SECS: &str = "TERMGRAPH_REMOTE_TIMEOUT_SECS";

/// Terminology server used for expressions the local store cannot answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub identifier_policy: IdentifierPolicy,
    /// Also check the Verhoeff digit of identifiers
    pub verify_check_digit: bool,
    pub detect_no_change_deltas: bool,
    /// Hierarchy recursion guard
    pub max_hierarchy_depth: usize,
    /// Concepts the store must exceed before simple ECL is answered locally
    pub ecl_local_threshold: usize,
    pub ecl_page_size: usize,
    pub default_branch: String,
    pub remote: Option<RemoteConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identifier_policy: IdentifierPolicy::Lenient,
            verify_check_digit: false,
            detect_no_change_deltas: false,
            max_hierarchy_depth: termgraph_store::DEFAULT_MAX_DEPTH,
            ecl_local_threshold: 100,
            ecl_page_size: 10_000,
            default_branch: "MAIN".to_string(),
            remote: None,
        }
    }
}

impl SessionConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read session config {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("invalid session config {}", path.display()))
    }

    /// Apply `TERMGRAPH_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(raw) = lookup(ENV_STRICT_IDENTIFIERS) {
            self.identifier_policy = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => IdentifierPolicy::Strict,
                "0" | "false" | "no" => IdentifierPolicy::Lenient,
                other => return Err(anyhow!("{ENV_STRICT_IDENTIFIERS}: expected a boolean, got `{other}`")),
            };
        }
        if let Some(url) = lookup(ENV_REMOTE_URL).filter(|u| !u.trim().is_empty()) {
            let timeout_secs = self
                .remote
                .as_ref()
                .map_or_else(default_timeout_secs, |r| r.timeout_secs);
            self.remote = Some(RemoteConfig {
                base_url: url.trim().to_string(),
                timeout_secs,
            });
        }
        if let Some(secs) = lookup(ENV_REMOTE_TIMEOUT_SECS) {
            let secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{ENV_REMOTE_TIMEOUT_SECS}: `{secs}` is not a number of seconds"))?;
            if let Some(remote) = self.remote.as_mut() {
                remote.timeout_secs = secs;
            }
        }
        if let Some(branch) = lookup(ENV_BRANCH).filter(|b| !b.trim().is_empty()) {
            self.default_branch = branch.trim().to_string();
        }
        if let Some(size) = lookup(ENV_PAGE_SIZE) {
            self.ecl_page_size = size
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PAGE_SIZE}: `{size}` is not a page size"))?;
        }
        Ok(())
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            identifier_policy: self.identifier_policy,
            verify_check_digit: self.verify_check_digit,
            max_depth: self.max_hierarchy_depth,
        }
    }

    pub fn ecl_settings(&self) -> EclSettings {
        EclSettings {
            local_threshold: self.ecl_local_threshold,
            page_size: self.ecl_page_size,
        }
    }
}

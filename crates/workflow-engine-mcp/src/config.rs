//! Tool-server config file loading (spec.md §4.4, §6).
//!
//! JSON at `<config-home>/mcp-servers.json` of shape
//! `{ "<server-name>": {"command": "...", "args": ["..."], "env": {"KEY": "${ENV_VAR}"}} }`.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use workflow_engine_core::error::{Result, WorkflowError};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolServerConfig(pub HashMap<String, ServerConfig>);

impl ToolServerConfig {
    /// Missing file means stub-only mode for every server, per spec.md §6:
    /// "Absence of the file causes the Tool Client to switch to stub-only
    /// mode for unknown servers."
    pub fn load(path: &Path) -> Result<ToolServerConfig> {
        if !path.is_file() {
            return Ok(ToolServerConfig::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| WorkflowError::StorageError {
            message: format!("could not read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&text).map_err(|e| WorkflowError::ValidationError {
            violations: vec![format!("invalid mcp-servers.json: {}", e)],
        })
    }

    pub fn get(&self, server_name: &str) -> Option<&ServerConfig> {
        self.0.get(server_name)
    }
}

static ENV_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// spec.md §4.4: "Entries of the form `${VAR}` in the server config's env
/// map are replaced by the corresponding process-environment variable
/// value (empty when unset) before spawn."
pub fn interpolate_env(env: &HashMap<String, String>) -> HashMap<String, String> {
    env.iter()
        .map(|(k, v)| {
            let resolved = ENV_PLACEHOLDER
                .replace_all(v, |caps: &regex::Captures| std::env::var(&caps[1]).unwrap_or_default())
                .into_owned();
            (k.clone(), resolved)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_empty_config() {
        let cfg = ToolServerConfig::load(Path::new("/nonexistent/mcp-servers.json")).unwrap();
        assert!(cfg.0.is_empty());
    }

    #[test]
    fn interpolates_known_env_var_and_blanks_unknown() {
        std::env::set_var("WF_TEST_TOKEN", "secret-value");
        let mut env = HashMap::new();
        env.insert("TOKEN".to_string(), "${WF_TEST_TOKEN}".to_string());
        env.insert("MISSING".to_string(), "${WF_TEST_UNSET_VAR}".to_string());
        let resolved = interpolate_env(&env);
        assert_eq!(resolved.get("TOKEN").unwrap(), "secret-value");
        assert_eq!(resolved.get("MISSING").unwrap(), "");
        std::env::remove_var("WF_TEST_TOKEN");
    }
}

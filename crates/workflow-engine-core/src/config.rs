//! Config/data home directory resolution (spec.md §6, SPEC_FULL.md §4.11).
//!
//! `$XDG_CONFIG_HOME` or `~/.config/<product>`, matching the teacher's own
//! preference for environment-first configuration over hardcoded paths.

use std::path::PathBuf;

pub const PRODUCT_NAME: &str = "workflow-engine";

/// Resolves `<config-home>`, creating it if missing.
pub fn config_home() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    let dir = base.join(PRODUCT_NAME);
    let _ = std::fs::create_dir_all(&dir);
    dir
}

pub fn database_path() -> PathBuf {
    config_home().join(format!("{}.db", PRODUCT_NAME))
}

pub fn mcp_servers_config_path() -> PathBuf {
    config_home().join("mcp-servers.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_lives_under_config_home() {
        assert!(database_path().starts_with(config_home()));
        assert_eq!(database_path().file_name().unwrap(), "workflow-engine.db");
    }
}

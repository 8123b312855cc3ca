//! Workflow Registry: in-memory + on-disk lookup by name (spec.md §2).
//!
//! Grounded on the teacher's `ai/templates/registry.rs` `TemplateRegistry`
//! shape (`Arc<RwLock<HashMap<...>>>` guarding the lookup table) but without
//! its compiled-template cache, which has no counterpart here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{Result, WorkflowError};
use crate::workflow::{self, Workflow};

/// Holds workflows registered directly in memory and a search path for
/// on-disk `<name>.yaml`/`<name>.yml` documents loaded lazily on first lookup.
#[derive(Clone)]
pub struct WorkflowRegistry {
    workflows: Arc<RwLock<HashMap<String, Arc<Workflow>>>>,
    search_paths: Arc<RwLock<Vec<PathBuf>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self {
            workflows: Arc::new(RwLock::new(HashMap::new())),
            search_paths: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Registers a workflow document directly, keyed by its own `name`.
    pub fn register(&self, workflow: Workflow) {
        let mut guard = self.workflows.write().expect("registry lock poisoned");
        guard.insert(workflow.name.clone(), Arc::new(workflow));
    }

    /// Adds a directory to search for `<name>.yaml`/`<name>.yml` files when a
    /// lookup misses the in-memory map.
    pub fn add_search_path(&self, dir: impl Into<PathBuf>) {
        self.search_paths
            .write()
            .expect("registry lock poisoned")
            .push(dir.into());
    }

    /// Resolves `name` to a workflow, per spec.md §4.8 step 1: "Resolve the
    /// referenced workflow through the Registry. Failure: 'Workflow '<name>'
    /// not found'." Falls back to the on-disk search paths, caching the
    /// parsed document under its own name on success.
    pub fn resolve(&self, name: &str) -> Result<Arc<Workflow>> {
        if let Some(wf) = self.workflows.read().expect("registry lock poisoned").get(name) {
            return Ok(wf.clone());
        }

        for dir in self.search_paths.read().expect("registry lock poisoned").iter() {
            if let Some(wf) = self.try_load_from_dir(dir, name)? {
                self.register(wf.clone());
                return Ok(self
                    .workflows
                    .read()
                    .expect("registry lock poisoned")
                    .get(name)
                    .expect("just inserted")
                    .clone());
            }
        }

        Err(WorkflowError::WorkflowNotFound {
            name: name.to_string(),
        })
    }

    fn try_load_from_dir(&self, dir: &Path, name: &str) -> Result<Option<Workflow>> {
        for ext in ["yaml", "yml"] {
            let path = dir.join(format!("{}.{}", name, ext));
            if path.is_file() {
                let text = std::fs::read_to_string(&path).map_err(|e| WorkflowError::StorageError {
                    message: format!("could not read workflow file {}: {}", path.display(), e),
                })?;
                return Ok(Some(workflow::load(&text)?));
            }
        }
        Ok(None)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.workflows.read().expect("registry lock poisoned").contains_key(name)
    }
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::load;

    fn wf(name: &str) -> Workflow {
        load(&format!(
            "name: {}\nsteps:\n  - action: log.info\n    params: {{ message: hi }}\n",
            name
        ))
        .unwrap()
    }

    #[test]
    fn registers_and_resolves_by_name() {
        let registry = WorkflowRegistry::new();
        registry.register(wf("a"));
        assert!(registry.resolve("a").is_ok());
        assert!(registry.resolve("missing").is_err());
    }

    #[test]
    fn resolves_from_disk_search_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("on-disk.yaml"),
            "name: on-disk\nsteps:\n  - action: log.info\n",
        )
        .unwrap();
        let registry = WorkflowRegistry::new();
        registry.add_search_path(dir.path());
        let resolved = registry.resolve("on-disk").unwrap();
        assert_eq!(resolved.name, "on-disk");
    }
}

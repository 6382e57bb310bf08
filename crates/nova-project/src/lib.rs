//! `ModuleRegistry`: the workspace's path → module mapping.
//!
//! Built from whatever the (external) `ClassPathResolver` collaborator
//! resolves; `CompilerClassPath::refresh`'s step 5 calls
//! [`ModuleRegistry::refresh`] to swap in a freshly resolved module set, and
//! `nova-vfs::SourcePath` consults [`ModuleRegistry::find_module_for_file`]
//! (through the [`nova_vfs::ModuleLookup`] seam) on every `put`.

use std::sync::RwLock;

use nova_core::{AbsPathBuf, ModuleId};
use nova_modules::ModuleInfo;
use nova_vfs::ModuleLookup;

/// Guarded by a single `RwLock`: reads (`find_module_for_file`,
/// `all_modules`) take the read side, `register`/`refresh` take the write
/// side and replace the table atomically so no reader ever observes a
/// half-updated project model.
pub struct ModuleRegistry {
    modules: RwLock<Vec<ModuleInfo>>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: RwLock::new(Vec::new()),
        }
    }

    /// Adds or replaces (by name) a single module's description.
    pub fn register(&self, module: ModuleInfo) {
        let mut modules = self.modules.write().unwrap();
        if let Some(existing) = modules.iter_mut().find(|m| m.name == module.name) {
            *existing = module;
        } else {
            modules.push(module);
        }
    }

    /// Atomically replaces the whole table, e.g. after a classpath refresh
    /// resolves a new project model from scratch.
    pub fn refresh(&self, modules: Vec<ModuleInfo>) {
        *self.modules.write().unwrap() = modules;
    }

    pub fn all_modules(&self) -> Vec<ModuleInfo> {
        self.modules.read().unwrap().clone()
    }

    pub fn module_by_id(&self, id: &ModuleId) -> Option<ModuleInfo> {
        self.modules
            .read()
            .unwrap()
            .iter()
            .find(|m| m.name.as_str() == id.as_str())
            .cloned()
    }

    /// First module (in registration order) whose source directories
    /// contain `path`. `None` when nothing is registered or nothing matches
    /// — callers then treat the whole workspace as a single compilation unit.
    pub fn find_module_for_file(&self, path: &AbsPathBuf) -> Option<ModuleId> {
        self.modules
            .read()
            .unwrap()
            .iter()
            .find(|m| m.contains_path(path))
            .map(|m| ModuleId::new(m.name.as_str()))
    }
}

impl ModuleLookup for ModuleRegistry {
    fn find_module_for_file(&self, path: &AbsPathBuf) -> Option<ModuleId> {
        ModuleRegistry::find_module_for_file(self, path)
    }
}

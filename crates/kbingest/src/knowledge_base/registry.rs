use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::RegistryError;

use super::{KnowledgeBase, DEFAULT_KNOWLEDGE_BASE_ID};

struct RegistryState {
    bases: Vec<KnowledgeBase>,
    current: String,
}

impl RegistryState {
    fn contains(&self, id: &str) -> bool {
        self.bases.iter().any(|kb| kb.id == id)
    }

    fn ensure_default(&mut self) {
        if !self.contains(DEFAULT_KNOWLEDGE_BASE_ID) {
            self.bases.insert(0, KnowledgeBase::default_base());
        }
    }

    fn ensure_current(&mut self) {
        if !self.contains(&self.current) {
            self.current = DEFAULT_KNOWLEDGE_BASE_ID.to_string();
        }
    }
}

/// Known knowledge bases plus the current selection.
///
/// The current id always names a known base. The default base is always
/// present and cannot be deleted.
pub struct KnowledgeBaseRegistry {
    backend: Arc<dyn Backend>,
    state: RwLock<RegistryState>,
}

impl KnowledgeBaseRegistry {
    /// Creates a registry holding only the default base. Call
    /// [`KnowledgeBaseRegistry::refresh`] to load the backend's list.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: RwLock::new(RegistryState {
                bases: vec![KnowledgeBase::default_base()],
                current: DEFAULT_KNOWLEDGE_BASE_ID.to_string(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Knowledge base registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Knowledge base registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn list(&self) -> Vec<KnowledgeBase> {
        self.read().bases.clone()
    }

    pub fn current_id(&self) -> String {
        self.read().current.clone()
    }

    pub fn current(&self) -> KnowledgeBase {
        let state = self.read();
        state
            .bases
            .iter()
            .find(|kb| kb.id == state.current)
            .cloned()
            .unwrap_or_else(KnowledgeBase::default_base)
    }

    pub fn get(&self, id: &str) -> Option<KnowledgeBase> {
        self.read().bases.iter().find(|kb| kb.id == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains(id)
    }

    /// Replaces the local list with the backend's.
    pub async fn refresh(&self) -> Result<Vec<KnowledgeBase>, RegistryError> {
        let bases = self.backend.list_knowledge_bases().await?;

        let mut state = self.write();
        let previous = state.current.clone();
        state.bases = bases;
        state.ensure_default();
        state.ensure_current();
        if state.current != previous {
            warn!(
                "Current knowledge base '{}' no longer exists, selected '{}'",
                previous, state.current
            );
        }
        Ok(state.bases.clone())
    }

    /// Creates a base on the backend. The current selection is not changed.
    pub async fn create(
        &self,
        name: &str,
        description: &str,
    ) -> Result<KnowledgeBase, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::InvalidName(
                "name must not be blank".to_string(),
            ));
        }

        let created = self
            .backend
            .create_knowledge_base(name, description.trim())
            .await?;

        let mut state = self.write();
        match state.bases.iter().position(|kb| kb.id == created.id) {
            Some(index) => state.bases[index] = created.clone(),
            None => state.bases.push(created.clone()),
        }
        info!("Created knowledge base '{}' ({})", created.name, created.id);
        Ok(created)
    }

    /// Selects a base as the default embed target. Unknown ids are ignored
    /// and `false` is returned.
    pub fn switch_current(&self, id: &str) -> bool {
        let mut state = self.write();
        if !state.contains(id) {
            warn!("Ignoring switch to unknown knowledge base '{}'", id);
            return false;
        }
        state.current = id.to_string();
        true
    }

    /// Drops every embedding in a base. There is no undo.
    pub async fn reset(&self, id: &str) -> Result<(), RegistryError> {
        self.backend.reset_knowledge_base(id).await?;
        info!("Reset knowledge base '{}'", id);
        Ok(())
    }

    /// Deletes a base. Deleting the current base selects the default one
    /// before this returns.
    pub async fn delete(&self, id: &str) -> Result<(), RegistryError> {
        if id == DEFAULT_KNOWLEDGE_BASE_ID {
            return Err(RegistryError::ProtectedDefault);
        }

        self.backend.delete_knowledge_base(id).await?;

        let mut state = self.write();
        state.bases.retain(|kb| kb.id != id);
        if state.current == id {
            state.current = DEFAULT_KNOWLEDGE_BASE_ID.to_string();
            info!("Deleted current knowledge base '{}', selected default", id);
        } else {
            info!("Deleted knowledge base '{}'", id);
        }
        Ok(())
    }
}

//! Knowledge bases and the current-selection registry.

pub mod registry;

use serde::{Deserialize, Serialize};

pub use registry::KnowledgeBaseRegistry;

/// Id of the knowledge base that always exists.
pub const DEFAULT_KNOWLEDGE_BASE_ID: &str = "default";

/// Display name the backend gives the default knowledge base.
pub const DEFAULT_KNOWLEDGE_BASE_NAME: &str = "預設知識庫";

/// A named embedding target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl KnowledgeBase {
    pub fn default_base() -> Self {
        Self {
            id: DEFAULT_KNOWLEDGE_BASE_ID.to_string(),
            name: DEFAULT_KNOWLEDGE_BASE_NAME.to_string(),
            description: String::new(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_KNOWLEDGE_BASE_ID
    }
}

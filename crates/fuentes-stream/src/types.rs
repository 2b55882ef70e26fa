//! Request and response types for the retrieval backend

use serde::{Deserialize, Deserializer, Serialize};

/// Body of a query submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The user's question
    pub query: String,
    /// Collections to search, in selection order
    pub collections: Vec<String>,
}

impl QueryRequest {
    /// Create a new query request
    pub fn new(query: impl Into<String>, collections: Vec<String>) -> Self {
        Self {
            query: query.into(),
            collections,
        }
    }
}

/// Health of a vector collection as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Active,
    Error,
}

/// One searchable collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    /// Missing or null counts read as zero
    #[serde(default, deserialize_with = "null_as_zero")]
    pub vectors_count: u64,
    pub status: CollectionStatus,
}

impl CollectionInfo {
    /// Whether the collection can be searched
    pub fn is_active(&self) -> bool {
        self.status == CollectionStatus::Active
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response of the collection listing endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CollectionList {
    #[serde(default)]
    pub collections: Vec<CollectionInfo>,
}

//! Content registry collaborator types.
//!
//! The registry itself (relational store + re-embedding pipeline) lives
//! outside this workspace; these are the shapes it hands back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content-base identifier in the external registry.
pub type ContentBaseId = i64;
/// Content-item identifier in the external registry.
pub type ContentItemId = i64;

/// Source material kind of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Url,
    Pdf,
    YoutubeVideo,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Url => write!(f, "url"),
            SourceType::Pdf => write!(f, "pdf"),
            SourceType::YoutubeVideo => write!(f, "youtube_video"),
        }
    }
}

/// A grouping of refreshable source material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBase {
    pub id: ContentBaseId,
    pub owner_id: String,
    pub name: String,
}

/// A single refreshable document/URL/video inside a content base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentItemId,
    pub base_id: ContentBaseId,
    pub title: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

use serde::{Deserialize, Serialize};

/// A stored blog post. Timestamps are RFC 3339 UTC strings written by the
/// store on create and update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Payload accepted by the create endpoint and forwarded as-is to the
/// mirror. Both fields are required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewBlogPost {
    pub title: String,
    pub body: String,
}

/// Partial update. Absent fields leave the stored value untouched.
///
/// Serialization keeps explicit `null`s for absent fields, so the mirror
/// always receives the full field set of the patch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlogPostPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Pagination window. The same value drives the primary listing and the
/// query string sent to the mirror.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageParams {
    pub limit: u32,
    pub offset: u32,
}

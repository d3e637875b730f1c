use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BlogPost, BlogPostPatch, NewBlogPost, PageParams};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    SerdeJson(serde_json::Error),
    SchemaVersionMismatch { expected: u32, got: u32 },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::SerdeJson(e) => write!(f, "json error: {e}"),
            Self::SchemaVersionMismatch { expected, got } => {
                write!(f, "schema_version mismatch: expected {expected}, got {got}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::SerdeJson(e) => Some(e),
            Self::SchemaVersionMismatch { .. } => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::SerdeJson(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedState {
    pub schema_version: u32,
    #[serde(default = "default_next_post_id")]
    pub next_post_id: i64,
    #[serde(default)]
    pub posts: BTreeMap<i64, BlogPost>,
}

fn default_next_post_id() -> i64 {
    1
}

impl PersistedState {
    pub fn empty() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            next_post_id: 1,
            posts: BTreeMap::new(),
        }
    }
}

/// The authoritative store for blog posts. Every mutation saves the JSON
/// snapshot before returning; the save is the commit point the mirror
/// subsystem keys off.
pub struct BlogStore {
    state_path: PathBuf,
    state: PersistedState,
}

impl BlogStore {
    pub fn load_or_init(data_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(data_dir)?;

        let state_path = data_dir.join("blog.json");
        let (state, is_new_state) = if state_path.exists() {
            let bytes = fs::read(&state_path)?;
            let state: PersistedState = serde_json::from_slice(&bytes)?;
            if state.schema_version != SCHEMA_VERSION {
                return Err(StoreError::SchemaVersionMismatch {
                    expected: SCHEMA_VERSION,
                    got: state.schema_version,
                });
            }
            (state, false)
        } else {
            (PersistedState::empty(), true)
        };

        let store = Self { state_path, state };

        if is_new_state {
            store.save()?;
        }

        Ok(store)
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&self.state)?;
        write_atomic(&self.state_path, &bytes)?;
        Ok(())
    }

    pub fn create(&mut self, post: &NewBlogPost) -> Result<BlogPost, StoreError> {
        let post_id = self.state.next_post_id;
        let now = now_rfc3339();

        let created = BlogPost {
            id: post_id,
            title: post.title.clone(),
            body: post.body.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.state.next_post_id += 1;
        self.state.posts.insert(post_id, created.clone());
        self.save()?;
        Ok(created)
    }

    /// Posts in ascending id order within the window, plus the total count.
    pub fn list(&self, page: PageParams) -> (Vec<BlogPost>, u64) {
        let total = self.state.posts.len() as u64;
        let items = self
            .state
            .posts
            .values()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        (items, total)
    }

    pub fn get(&self, post_id: i64) -> Option<BlogPost> {
        self.state.posts.get(&post_id).cloned()
    }

    pub fn update(
        &mut self,
        post_id: i64,
        patch: &BlogPostPatch,
    ) -> Result<Option<BlogPost>, StoreError> {
        let post = match self.state.posts.get_mut(&post_id) {
            Some(post) => post,
            None => return Ok(None),
        };

        if let Some(title) = &patch.title {
            post.title = title.clone();
        }
        if let Some(body) = &patch.body {
            post.body = body.clone();
        }
        post.updated_at = now_rfc3339();

        let post = post.clone();
        self.save()?;
        Ok(Some(post))
    }

    pub fn delete(&mut self, post_id: i64) -> Result<bool, StoreError> {
        let deleted = self.state.posts.remove(&post_id).is_some();
        if deleted {
            self.save()?;
        }
        Ok(deleted)
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), io::Error> {
    let dir = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory")
    })?;
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let tmp_path = dir.join(format!("{}.tmp", file_name.to_string_lossy()));
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.write_all(b"\n")?;
        let _ = file.sync_all();
    }

    #[cfg(windows)]
    {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }

    fs::rename(tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    fn new_post(title: &str, body: &str) -> NewBlogPost {
        NewBlogPost {
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn bootstrap_creates_empty_blog_json() {
        let tmp = tempfile::tempdir().unwrap();

        let _store = BlogStore::load_or_init(tmp.path()).unwrap();
        let state_path = tmp.path().join("blog.json");

        assert!(state_path.exists());

        let bytes = fs::read(&state_path).unwrap();
        let state: PersistedState = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(state.schema_version, SCHEMA_VERSION);
        assert_eq!(state.next_post_id, 1);
        assert_eq!(state.posts.len(), 0);
    }

    #[test]
    fn create_assigns_sequential_ids_and_timestamps() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = BlogStore::load_or_init(tmp.path()).unwrap();

        let first = store.create(&new_post("first", "a")).unwrap();
        let second = store.create(&new_post("second", "b")).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.created_at, first.updated_at);
        assert!(first.created_at.ends_with('Z'));
    }

    #[test]
    fn save_load_roundtrip_persists_posts() {
        let tmp = tempfile::tempdir().unwrap();

        let mut store = BlogStore::load_or_init(tmp.path()).unwrap();
        let created = store.create(&new_post("hello", "world")).unwrap();

        drop(store);

        let store = BlogStore::load_or_init(tmp.path()).unwrap();
        assert_eq!(store.get(created.id), Some(created));
    }

    #[test]
    fn update_applies_only_set_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = BlogStore::load_or_init(tmp.path()).unwrap();

        let created = store.create(&new_post("title", "body")).unwrap();
        let patch = BlogPostPatch {
            title: Some("new title".to_string()),
            body: None,
        };
        let updated = store.update(created.id, &patch).unwrap().unwrap();

        assert_eq!(updated.title, "new title");
        assert_eq!(updated.body, "body");
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn update_unknown_id_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = BlogStore::load_or_init(tmp.path()).unwrap();

        let updated = store.update(42, &BlogPostPatch::default()).unwrap();
        assert_eq!(updated, None);
    }

    #[test]
    fn delete_reports_whether_post_existed() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = BlogStore::load_or_init(tmp.path()).unwrap();

        let created = store.create(&new_post("gone", "soon")).unwrap();

        assert!(store.delete(created.id).unwrap());
        assert!(!store.delete(created.id).unwrap());
        assert_eq!(store.get(created.id), None);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = BlogStore::load_or_init(tmp.path()).unwrap();

        let first = store.create(&new_post("one", "1")).unwrap();
        store.delete(first.id).unwrap();

        drop(store);

        let mut store = BlogStore::load_or_init(tmp.path()).unwrap();
        let second = store.create(&new_post("two", "2")).unwrap();
        assert_eq!(second.id, 2);
    }

    #[test]
    fn list_pages_in_id_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = BlogStore::load_or_init(tmp.path()).unwrap();

        for n in 1..=5 {
            store.create(&new_post(&format!("post {n}"), "x")).unwrap();
        }

        let (items, total) = store.list(PageParams { limit: 2, offset: 1 });
        assert_eq!(total, 5);
        assert_eq!(
            items.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![2, 3]
        );

        let (items, total) = store.list(PageParams { limit: 10, offset: 10 });
        assert_eq!(total, 5);
        assert!(items.is_empty());
    }

    #[test]
    fn schema_version_mismatch_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();

        let _store = BlogStore::load_or_init(tmp.path()).unwrap();
        let state_path = tmp.path().join("blog.json");
        let mut raw: serde_json::Value =
            serde_json::from_slice(&fs::read(&state_path).unwrap()).unwrap();
        raw["schema_version"] = serde_json::json!(99);
        fs::write(&state_path, serde_json::to_vec_pretty(&raw).unwrap()).unwrap();

        let Err(err) = BlogStore::load_or_init(tmp.path()) else {
            panic!("expected schema mismatch")
        };
        assert!(matches!(
            err,
            StoreError::SchemaVersionMismatch { expected: 1, got: 99 }
        ));
    }
}

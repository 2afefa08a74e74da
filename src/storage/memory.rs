use std::{
    collections::{BTreeMap, HashMap},
    ops::Bound,
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{BlobStore, KeyPage, SessionStore, StorageError, StoredObject};

pub const DEFAULT_LIST_PAGE_SIZE: usize = 1000;

/// Process-local blob store, used when no Cloudflare account is configured.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        let object = StoredObject {
            size: body.len() as u64,
            body,
            content_type: Some(content_type.to_string()),
        };
        self.objects.write().await.insert(key.to_string(), object);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        Ok(self.objects.read().await.get(key).cloned())
    }
}

/// Process-local session store. Listing is paginated by `page_size` so the
/// cursor contract matches the remote backend.
#[derive(Debug)]
pub struct MemorySessionStore {
    entries: RwLock<BTreeMap<String, String>>,
    page_size: usize,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_LIST_PAGE_SIZE)
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn list(&self, cursor: Option<&str>) -> Result<KeyPage, StorageError> {
        let entries = self.entries.read().await;
        let lower = match cursor {
            Some(after) => Bound::Excluded(after.to_string()),
            None => Bound::Unbounded,
        };

        let mut remaining = entries.range((lower, Bound::Unbounded)).map(|(key, _)| key);
        let keys: Vec<String> = remaining.by_ref().take(self.page_size).cloned().collect();
        let cursor = if remaining.next().is_some() {
            keys.last().cloned()
        } else {
            None
        };

        Ok(KeyPage { keys, cursor })
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blob_store_keeps_content_type_and_size() {
        let store = MemoryBlobStore::new();
        store
            .put("uploads/1-a.txt", Bytes::from_static(b"hello"), "text/plain")
            .await
            .expect("put");

        let object = store
            .get("uploads/1-a.txt")
            .await
            .expect("get")
            .expect("object present");
        assert_eq!(object.body, Bytes::from_static(b"hello"));
        assert_eq!(object.content_type.as_deref(), Some("text/plain"));
        assert_eq!(object.size, 5);
        assert!(store.get("uploads/missing").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn session_listing_pages_until_cursor_is_exhausted() {
        let store = MemorySessionStore::with_page_size(2);
        for key in ["a", "b", "c", "d", "e"] {
            store.put(key, "{}").await.expect("put");
        }

        let first = store.list(None).await.expect("first page");
        assert_eq!(first.keys, vec!["a", "b"]);
        assert_eq!(first.cursor.as_deref(), Some("b"));

        let second = store.list(first.cursor.as_deref()).await.expect("second page");
        assert_eq!(second.keys, vec!["c", "d"]);

        let last = store.list(second.cursor.as_deref()).await.expect("last page");
        assert_eq!(last.keys, vec!["e"]);
        assert!(last.cursor.is_none());
    }

    #[tokio::test]
    async fn exact_page_boundary_has_no_trailing_cursor() {
        let store = MemorySessionStore::with_page_size(2);
        store.put("a", "{}").await.expect("put");
        store.put("b", "{}").await.expect("put");

        let page = store.list(None).await.expect("page");
        assert_eq!(page.keys.len(), 2);
        assert!(page.cursor.is_none());
    }
}

//! In-memory reference implementation of the store collaborator.
//!
//! # Responsibilities
//! - Keep documents per collection, keyed by id
//! - Assign increasing ids that are never handed out twice
//! - Apply JSON patches and run the small query language in `query.rs`
//!
//! # Design Decisions
//! - Sharded map (`DashMap`) so the store can be shared across threads
//! - Query visits run on a snapshot, outside the shard lock, so a visitor
//!   may call back into the store

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde_json::Value;

use super::patch;
use super::query::{self, MemoryQuery};
use super::{Document, DocumentStore, QueryVisitor, StoreError};

#[derive(Debug, Default)]
struct Collection {
    /// Highest id ever stored in this collection.
    last_id: i64,
    docs: BTreeMap<i64, Document>,
}

impl Collection {
    fn insert(&mut self, id: i64, doc: Document) {
        self.last_id = self.last_id.max(id);
        self.docs.insert(id, doc);
    }
}

/// Thread-safe in-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, Collection>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`, zero if it does not exist.
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|c| c.docs.len()).unwrap_or(0)
    }

    pub fn has_collection(&self, collection: &str) -> bool {
        self.collections.contains_key(collection)
    }
}

impl DocumentStore for MemoryStore {
    type Query = MemoryQuery;

    fn get(&self, collection: &str, id: i64) -> Result<Document, StoreError> {
        self.collections
            .get(collection)
            .and_then(|c| c.docs.get(&id).cloned())
            .ok_or(StoreError::NotFound)
    }

    fn put(&self, collection: &str, doc: &Document, id: i64) -> Result<(), StoreError> {
        if id < 1 {
            return Err(StoreError::Internal(format!("invalid document id {id}")));
        }
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, doc.clone());
        Ok(())
    }

    fn put_new(&self, collection: &str, doc: &Document) -> Result<i64, StoreError> {
        let mut entry = self.collections.entry(collection.to_string()).or_default();
        let id = entry
            .last_id
            .checked_add(1)
            .ok_or_else(|| StoreError::Internal("document id space exhausted".into()))?;
        entry.insert(id, doc.clone());
        Ok(id)
    }

    fn remove(&self, collection: &str, id: i64) -> Result<(), StoreError> {
        self.collections
            .get_mut(collection)
            .and_then(|mut c| c.docs.remove(&id))
            .map(drop)
            .ok_or(StoreError::NotFound)
    }

    fn patch(&self, collection: &str, patch_json: &str, id: i64) -> Result<(), StoreError> {
        let patch_value: Value = serde_json::from_str(patch_json)?;
        let mut coll = self.collections.get_mut(collection).ok_or(StoreError::NotFound)?;
        let doc = coll.docs.get_mut(&id).ok_or(StoreError::NotFound)?;
        let mut value = doc.as_value().clone();
        patch::apply(&mut value, &patch_value)?;
        *doc = Document::new(value);
        Ok(())
    }

    fn parse_query(&self, text: &str) -> Result<MemoryQuery, StoreError> {
        query::parse(text)
    }

    fn execute(&self, query: &MemoryQuery, visitor: &mut dyn QueryVisitor) -> Result<(), StoreError> {
        if let Some(sink) = visitor.explain_sink() {
            sink.push_str(&query.explain());
            sink.push('\n');
        }
        let limit = query.limit.unwrap_or(usize::MAX);
        let matched: Vec<(i64, Document)> = match &query.apply {
            None => match self.collections.get(&query.collection) {
                Some(coll) => coll
                    .docs
                    .iter()
                    .filter(|(_, doc)| query.matches(doc.as_value()))
                    .take(limit)
                    .map(|(id, doc)| (*id, doc.clone()))
                    .collect(),
                None => Vec::new(),
            },
            Some(merge) => match self.collections.get_mut(&query.collection) {
                Some(mut coll) => coll
                    .docs
                    .iter_mut()
                    .filter(|(_, doc)| query.matches(doc.as_value()))
                    .take(limit)
                    .map(|(id, doc)| {
                        let mut value = doc.as_value().clone();
                        patch::merge(&mut value, merge);
                        *doc = Document::new(value);
                        (*id, doc.clone())
                    })
                    .collect(),
                None => Vec::new(),
            },
        };
        for (id, doc) in &matched {
            visitor.visit(*id, doc)?;
        }
        Ok(())
    }
}

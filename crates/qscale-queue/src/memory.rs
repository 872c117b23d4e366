//! In-process backlog source.
//!
//! Holds hashes in a `BTreeMap` so scans return keys in a stable order.
//! Supports failure injection for exercising the sampler's error paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{QueueError, QueueResult};
use crate::source::BacklogSource;

#[derive(Default)]
struct Inner {
    hashes: BTreeMap<String, HashMap<String, String>>,
    unavailable: bool,
    fields_unavailable: bool,
    broken_keys: HashSet<String>,
}

/// A `BacklogSource` backed by process memory.
#[derive(Default)]
pub struct MemoryBacklog {
    inner: Mutex<Inner>,
}

impl MemoryBacklog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set one hash field.
    pub fn hset(&self, key: &str, field: &str, value: &str) {
        self.lock()
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
    }

    /// Insert a work item with the given status and file name.
    pub fn push_item(&self, key: &str, status: &str, file_name: &str) {
        self.hset(key, "status", status);
        self.hset(key, "file_name", file_name);
    }

    /// Remove a key entirely.
    pub fn remove(&self, key: &str) {
        self.lock().hashes.remove(key);
    }

    /// Make every call fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Make field reads fail as if the store went away after a scan.
    pub fn set_fields_unavailable(&self, unavailable: bool) {
        self.lock().fields_unavailable = unavailable;
    }

    /// Make field reads on `key` fail.
    pub fn break_key(&self, key: &str) {
        self.lock().broken_keys.insert(key.to_string());
    }
}

fn glob_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[async_trait]
impl BacklogSource for MemoryBacklog {
    async fn keys_matching(&self, pattern: &str) -> QueueResult<Vec<String>> {
        let inner = self.lock();
        if inner.unavailable {
            return Err(QueueError::Unavailable("memory backlog offline".to_string()));
        }
        Ok(inner
            .hashes
            .keys()
            .filter(|k| glob_matches(pattern, k))
            .cloned()
            .collect())
    }

    async fn field(&self, key: &str, field: &str) -> QueueResult<Option<String>> {
        let inner = self.lock();
        if inner.unavailable || inner.fields_unavailable {
            return Err(QueueError::Unavailable("memory backlog offline".to_string()));
        }
        if inner.broken_keys.contains(key) {
            return Err(QueueError::Command {
                command: "HGET",
                message: format!("WRONGTYPE {key}"),
            });
        }
        Ok(inner.hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

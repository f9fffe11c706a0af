//! In-Memory Cache Backend
//!
//! Implements the `CacheBackend` port over a concurrent hash map with
//! Redis-compatible value semantics: hashes, sets, lists, and scalar strings
//! live in one keyspace, commands against a key of the wrong type fail, and
//! RENAME of a missing key fails. Batched submissions apply sequentially with
//! best-effort semantics, mirroring a pipelined backend.
//!
//! This is the single backend used by tests and embedded deployments; a
//! networked store plugs in through the same port.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::ports::{BatchCommand, CacheBackend};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum Value {
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
    List(Vec<String>),
    Str(String),
}

/// Concurrent in-memory keyspace
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, Value>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys. Test helper.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of every live key. Test helper.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn wrong_type(key: &str, expected: &'static str) -> Error {
        Error::WrongType {
            key: key.to_string(),
            expected,
        }
    }

    fn apply_hset(&self, key: &str, fields: Vec<(String, String)>) -> Result<()> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(HashMap::new()));
        match entry.value_mut() {
            Value::Hash(hash) => {
                hash.extend(fields);
                Ok(())
            }
            _ => Err(Self::wrong_type(key, "hash")),
        }
    }

    fn apply_del(&self, keys: &[String]) -> u64 {
        let mut removed = 0;
        for key in keys {
            if self.entries.remove(key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    fn apply_sadd(&self, key: &str, members: Vec<String>) -> Result<u64> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(HashSet::new()));
        match entry.value_mut() {
            Value::Set(set) => {
                let mut added = 0;
                for member in members {
                    if set.insert(member) {
                        added += 1;
                    }
                }
                Ok(added)
            }
            _ => Err(Self::wrong_type(key, "set")),
        }
    }

    fn apply_srem(&self, key: &str, members: &[String]) -> Result<u64> {
        let Some(mut entry) = self.entries.get_mut(key) else {
            return Ok(0);
        };
        match entry.value_mut() {
            Value::Set(set) => {
                let mut removed = 0;
                for member in members {
                    if set.remove(member) {
                        removed += 1;
                    }
                }
                Ok(removed)
            }
            _ => Err(Self::wrong_type(key, "set")),
        }
    }

    fn apply_rename(&self, old: &str, new: &str) -> Result<()> {
        match self.entries.remove(old) {
            Some((_, value)) => {
                self.entries.insert(new.to_string(), value);
                Ok(())
            }
            None => Err(Error::NoSuchKey {
                key: old.to_string(),
            }),
        }
    }

    fn apply_set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .insert(key.to_string(), Value::Str(value.to_string()));
        Ok(())
    }

    fn apply_rpush(&self, key: &str, values: Vec<String>) -> Result<()> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::List(Vec::new()));
        match entry.value_mut() {
            Value::List(list) => {
                list.extend(values);
                Ok(())
            }
            _ => Err(Self::wrong_type(key, "list")),
        }
    }

    fn apply(&self, command: BatchCommand) -> Result<()> {
        match command {
            BatchCommand::HSet { key, fields } => self.apply_hset(&key, fields),
            BatchCommand::Del { keys } => {
                self.apply_del(&keys);
                Ok(())
            }
            BatchCommand::SAdd { key, members } => self.apply_sadd(&key, members).map(|_| ()),
            BatchCommand::SRem { key, members } => self.apply_srem(&key, &members).map(|_| ()),
            BatchCommand::Rename { old, new } => self.apply_rename(&old, &new),
            BatchCommand::Set { key, value } => self.apply_set(&key, &value),
            BatchCommand::RPush { key, values } => self.apply_rpush(&key, values),
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn hset(&self, key: &str, fields: Vec<(String, String)>) -> Result<()> {
        self.apply_hset(key, fields)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        match self.entries.get(key).map(|e| e.value().clone()) {
            None => Ok(HashMap::new()),
            Some(Value::Hash(hash)) => Ok(hash),
            Some(_) => Err(Self::wrong_type(key, "hash")),
        }
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        Ok(self.apply_del(keys))
    }

    async fn sadd(&self, key: &str, members: Vec<String>) -> Result<u64> {
        self.apply_sadd(key, members)
    }

    async fn srem(&self, key: &str, members: Vec<String>) -> Result<u64> {
        self.apply_srem(key, &members)
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        match self.entries.get(key).map(|e| e.value().clone()) {
            None => Ok(HashSet::new()),
            Some(Value::Set(set)) => Ok(set),
            Some(_) => Err(Self::wrong_type(key, "set")),
        }
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        match self.entries.get(key) {
            None => Ok(false),
            Some(entry) => match entry.value() {
                Value::Set(set) => Ok(set.contains(member)),
                _ => Err(Self::wrong_type(key, "set")),
            },
        }
    }

    async fn rename(&self, old: &str, new: &str) -> Result<()> {
        self.apply_rename(old, new)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(entry) => match entry.value() {
                Value::Str(value) => Ok(Some(value.clone())),
                _ => Err(Self::wrong_type(key, "string")),
            },
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.apply_set(key, value)
    }

    async fn lrange(&self, key: &str) -> Result<Vec<String>> {
        match self.entries.get(key).map(|e| e.value().clone()) {
            None => Ok(Vec::new()),
            Some(Value::List(list)) => Ok(list),
            Some(_) => Err(Self::wrong_type(key, "list")),
        }
    }

    /// Apply commands in submission order, stopping at the first failure.
    /// All-or-nothing submission, best-effort application.
    async fn exec(&self, batch: Vec<BatchCommand>) -> Result<()> {
        for command in batch {
            self.apply(command)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_hash_round_trip() {
        let backend = MemoryBackend::new();
        backend
            .hset(
                "h",
                vec![
                    ("a".to_string(), "1".to_string()),
                    ("b".to_string(), "2".to_string()),
                ],
            )
            .await
            .unwrap();
        backend
            .hset("h", vec![("b".to_string(), "3".to_string())])
            .await
            .unwrap();
        let hash = backend.hgetall("h").await.unwrap();
        assert_eq!(hash.get("a").map(String::as_str), Some("1"));
        assert_eq!(hash.get("b").map(String::as_str), Some("3"));
    }

    #[tokio::test]
    async fn test_set_semantics_are_idempotent() {
        let backend = MemoryBackend::new();
        let added = backend
            .sadd("s", vec!["x".to_string(), "y".to_string()])
            .await
            .unwrap();
        assert_eq!(added, 2);
        let added = backend.sadd("s", vec!["x".to_string()]).await.unwrap();
        assert_eq!(added, 0);
        assert!(backend.sismember("s", "y").await.unwrap());

        let removed = backend.srem("s", vec!["y".to_string()]).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!backend.sismember("s", "y").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_keys_read_as_empty() {
        let backend = MemoryBackend::new();
        assert!(backend.hgetall("nope").await.unwrap().is_empty());
        assert!(backend.smembers("nope").await.unwrap().is_empty());
        assert!(backend.lrange("nope").await.unwrap().is_empty());
        assert_eq!(backend.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_wrong_type_is_rejected() {
        let backend = MemoryBackend::new();
        backend.set("k", "scalar").await.unwrap();
        assert_matches!(
            backend.hgetall("k").await,
            Err(Error::WrongType { .. })
        );
        assert_matches!(
            backend.sadd("k", vec!["m".to_string()]).await,
            Err(Error::WrongType { .. })
        );
    }

    #[tokio::test]
    async fn test_rename_moves_value_and_rejects_missing() {
        let backend = MemoryBackend::new();
        backend.set("a", "v").await.unwrap();
        backend.rename("a", "b").await.unwrap();
        assert_eq!(backend.get("b").await.unwrap().as_deref(), Some("v"));
        assert!(!backend.contains_key("a"));

        assert_matches!(
            backend.rename("missing", "x").await,
            Err(Error::NoSuchKey { .. })
        );
    }

    #[tokio::test]
    async fn test_exec_stops_at_first_failure() {
        let backend = MemoryBackend::new();
        let outcome = backend
            .exec(vec![
                BatchCommand::Set {
                    key: "applied".to_string(),
                    value: "yes".to_string(),
                },
                BatchCommand::Rename {
                    old: "missing".to_string(),
                    new: "x".to_string(),
                },
                BatchCommand::Set {
                    key: "not-applied".to_string(),
                    value: "no".to_string(),
                },
            ])
            .await;
        assert!(outcome.is_err());
        assert!(backend.contains_key("applied"));
        assert!(!backend.contains_key("not-applied"));
    }

    #[tokio::test]
    async fn test_rpush_preserves_order() {
        let backend = MemoryBackend::new();
        backend
            .exec(vec![
                BatchCommand::RPush {
                    key: "l".to_string(),
                    values: vec!["a".to_string(), "b".to_string()],
                },
                BatchCommand::RPush {
                    key: "l".to_string(),
                    values: vec!["c".to_string()],
                },
            ])
            .await
            .unwrap();
        assert_eq!(backend.lrange("l").await.unwrap(), vec!["a", "b", "c"]);
    }
}

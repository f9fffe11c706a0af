//! Index Store
//!
//! Per-kind master sets recording every live cache key, plus the cascading
//! rename/delete machinery over the sample index.
//!
//! Entity-kind behavior is dispatched through one strategy per kind behind the
//! closed [`EntityKind`] enum. Strategies are pure batch builders: they turn an
//! operation into a `Vec<BatchCommand>`, and the store (or the synchronizer,
//! when composing a larger cascade) submits the batch as one unit of work.
//!
//! Cascading rename/delete scans the entire sample master index per call. That
//! is O(total sample count) by design: renames are rare relative to sample
//! reads and writes, and the scan keeps the index authoritative without a
//! secondary structure.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::model::{EntityKind, SAMPLE_SEPARATOR};
use crate::domain::ports::{BatchCommand, CacheBackend};
use crate::error::Result;
use crate::store::key;

/// Which name part of a sample a cascading operation matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePart {
    Subject,
    Aspect,
}

impl std::fmt::Display for NamePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamePart::Subject => write!(f, "subject"),
            NamePart::Aspect => write!(f, "aspect"),
        }
    }
}

// =============================================================================
// Key-ops strategies
// =============================================================================

/// Capability interface every entity kind implements: build the batch for
/// adding, removing, and renaming keys of that kind.
///
/// `members` carries the current sample master index; only the sample strategy
/// reads it. Cascade deletion is a sample-only capability: the other kinds
/// contribute no commands.
trait KeyOps: Send + Sync {
    fn add(&self, name: &str) -> Vec<BatchCommand>;

    fn remove(&self, name: &str) -> Vec<BatchCommand>;

    fn rename(
        &self,
        members: &HashSet<String>,
        part: NamePart,
        old: &str,
        new: &str,
    ) -> Vec<BatchCommand>;

    fn cascade_delete(
        &self,
        _members: &HashSet<String>,
        _part: NamePart,
        _name: &str,
    ) -> Vec<BatchCommand> {
        Vec::new()
    }
}

struct SubjectKeyOps;
struct AspectKeyOps;
struct SampleKeyOps;

fn ops(kind: EntityKind) -> &'static dyn KeyOps {
    match kind {
        EntityKind::Subject => &SubjectKeyOps,
        EntityKind::Aspect => &AspectKeyOps,
        EntityKind::Sample => &SampleKeyOps,
    }
}

/// Shared non-sample behavior: one index membership and one hash per entity.
fn scalar_add(kind: EntityKind, name: &str) -> Vec<BatchCommand> {
    vec![BatchCommand::SAdd {
        key: key::index_key(kind),
        members: vec![key::to_key(kind, name)],
    }]
}

fn scalar_remove(kind: EntityKind, name: &str) -> Vec<BatchCommand> {
    let entity_key = key::to_key(kind, name);
    vec![
        BatchCommand::SRem {
            key: key::index_key(kind),
            members: vec![entity_key.clone()],
        },
        BatchCommand::Del {
            keys: vec![entity_key],
        },
    ]
}

/// Non-sample rename: swap the index membership and rename the hash itself,
/// three commands in one batch.
fn scalar_rename(kind: EntityKind, old: &str, new: &str) -> Vec<BatchCommand> {
    let old_key = key::to_key(kind, old);
    let new_key = key::to_key(kind, new);
    vec![
        BatchCommand::SRem {
            key: key::index_key(kind),
            members: vec![old_key.clone()],
        },
        BatchCommand::SAdd {
            key: key::index_key(kind),
            members: vec![new_key.clone()],
        },
        BatchCommand::Rename {
            old: old_key,
            new: new_key,
        },
    ]
}

impl KeyOps for SubjectKeyOps {
    fn add(&self, name: &str) -> Vec<BatchCommand> {
        scalar_add(EntityKind::Subject, name)
    }

    fn remove(&self, name: &str) -> Vec<BatchCommand> {
        scalar_remove(EntityKind::Subject, name)
    }

    fn rename(
        &self,
        _members: &HashSet<String>,
        _part: NamePart,
        old: &str,
        new: &str,
    ) -> Vec<BatchCommand> {
        scalar_rename(EntityKind::Subject, old, new)
    }
}

impl KeyOps for AspectKeyOps {
    fn add(&self, name: &str) -> Vec<BatchCommand> {
        scalar_add(EntityKind::Aspect, name)
    }

    fn remove(&self, name: &str) -> Vec<BatchCommand> {
        scalar_remove(EntityKind::Aspect, name)
    }

    fn rename(
        &self,
        _members: &HashSet<String>,
        _part: NamePart,
        old: &str,
        new: &str,
    ) -> Vec<BatchCommand> {
        scalar_rename(EntityKind::Aspect, old, new)
    }
}

impl KeyOps for SampleKeyOps {
    fn add(&self, name: &str) -> Vec<BatchCommand> {
        scalar_add(EntityKind::Sample, name)
    }

    fn remove(&self, name: &str) -> Vec<BatchCommand> {
        scalar_remove(EntityKind::Sample, name)
    }

    /// Renaming a subject or aspect renames every sample key whose matching
    /// name part equals the old name: one RENAME per affected pair, one SREM
    /// of all old members, one SADD of all new members.
    fn rename(
        &self,
        members: &HashSet<String>,
        part: NamePart,
        old: &str,
        new: &str,
    ) -> Vec<BatchCommand> {
        let pairs = sample_rename_pairs(members, part, old, new);
        if pairs.is_empty() {
            return Vec::new();
        }
        let mut batch = Vec::with_capacity(pairs.len() + 2);
        let mut old_keys = Vec::with_capacity(pairs.len());
        let mut new_keys = Vec::with_capacity(pairs.len());
        for (old_key, new_key) in pairs {
            batch.push(BatchCommand::Rename {
                old: old_key.clone(),
                new: new_key.clone(),
            });
            old_keys.push(old_key);
            new_keys.push(new_key);
        }
        batch.push(BatchCommand::SRem {
            key: key::index_key(EntityKind::Sample),
            members: old_keys,
        });
        batch.push(BatchCommand::SAdd {
            key: key::index_key(EntityKind::Sample),
            members: new_keys,
        });
        batch
    }

    fn cascade_delete(
        &self,
        members: &HashSet<String>,
        part: NamePart,
        name: &str,
    ) -> Vec<BatchCommand> {
        let matches = sample_cascade_matches(members, part, name);
        if matches.is_empty() {
            return Vec::new();
        }
        vec![
            BatchCommand::SRem {
                key: key::index_key(EntityKind::Sample),
                members: matches.clone(),
            },
            BatchCommand::Del { keys: matches },
        ]
    }
}

// =============================================================================
// Scan helpers
// =============================================================================

/// Collect `(old_key, new_key)` pairs for every sample member whose matching
/// name part equals `old`. Members that do not parse as sample keys are
/// skipped with a warning rather than failing the whole cascade.
pub(crate) fn sample_rename_pairs(
    members: &HashSet<String>,
    part: NamePart,
    old: &str,
    new: &str,
) -> Vec<(String, String)> {
    let old = old.to_lowercase();
    let mut pairs: Vec<(String, String)> = members
        .iter()
        .filter_map(|member| {
            let (subject_part, aspect_part) = match key::parse_sample_key(member) {
                Ok(parts) => parts,
                Err(_) => {
                    warn!(member = %member, "Skipping unparseable sample index member");
                    return None;
                }
            };
            let renamed = match part {
                NamePart::Subject if subject_part == old => {
                    format!("{new}{SAMPLE_SEPARATOR}{aspect_part}")
                }
                NamePart::Aspect if aspect_part == old => {
                    format!("{subject_part}{SAMPLE_SEPARATOR}{new}")
                }
                _ => return None,
            };
            Some((
                member.clone(),
                key::to_key(EntityKind::Sample, &renamed),
            ))
        })
        .collect();
    pairs.sort();
    pairs
}

/// Collect every sample member whose matching name part equals `name`.
pub(crate) fn sample_cascade_matches(
    members: &HashSet<String>,
    part: NamePart,
    name: &str,
) -> Vec<String> {
    let name = name.to_lowercase();
    let mut matches: Vec<String> = members
        .iter()
        .filter_map(|member| {
            let (subject_part, aspect_part) = match key::parse_sample_key(member) {
                Ok(parts) => parts,
                Err(_) => {
                    warn!(member = %member, "Skipping unparseable sample index member");
                    return None;
                }
            };
            let hit = match part {
                NamePart::Subject => subject_part == name,
                NamePart::Aspect => aspect_part == name,
            };
            hit.then(|| member.clone())
        })
        .collect();
    matches.sort();
    matches
}

// =============================================================================
// Index Store
// =============================================================================

/// Master index sets over an injected cache backend.
pub struct IndexStore {
    backend: Arc<dyn CacheBackend>,
}

impl IndexStore {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Record a key in its kind's master set. Idempotent.
    pub async fn add_key(&self, kind: EntityKind, name: &str) -> Result<()> {
        self.backend.exec(ops(kind).add(name)).await
    }

    /// Remove a key from the master set and delete its hash, one batch.
    pub async fn delete_key(&self, kind: EntityKind, name: &str) -> Result<()> {
        self.backend.exec(ops(kind).remove(name)).await
    }

    pub async fn key_exists(&self, kind: EntityKind, name: &str) -> Result<bool> {
        self.backend
            .sismember(&key::index_key(kind), &key::to_key(kind, name))
            .await
    }

    pub async fn list_keys(&self, kind: EntityKind) -> Result<HashSet<String>> {
        self.backend.smembers(&key::index_key(kind)).await
    }

    /// Rename keys of `kind` affected by a subject/aspect rename. Submits its
    /// own batch; use [`IndexStore::rename_cmds`] to fold the commands into a
    /// larger cascade instead.
    pub async fn rename_keys(
        &self,
        kind: EntityKind,
        part: NamePart,
        old: &str,
        new: &str,
    ) -> Result<()> {
        let batch = self.rename_cmds(kind, part, old, new).await?;
        if batch.is_empty() {
            debug!(kind = %kind, old = %old, "Rename matched no keys");
            return Ok(());
        }
        self.backend.exec(batch).await
    }

    /// Cascade-delete sample keys whose `part` matches `name`. Only the sample
    /// kind has cascade semantics; other kinds produce an empty batch.
    pub async fn delete_keys(&self, kind: EntityKind, part: NamePart, name: &str) -> Result<()> {
        let batch = self.cascade_delete_cmds(kind, part, name).await?;
        if batch.is_empty() {
            debug!(kind = %kind, name = %name, "Cascade delete matched no keys");
            return Ok(());
        }
        self.backend.exec(batch).await
    }

    // -------------------------------------------------------------------------
    // Batch builders for synchronizer composition
    // -------------------------------------------------------------------------

    pub fn add_cmds(kind: EntityKind, name: &str) -> Vec<BatchCommand> {
        ops(kind).add(name)
    }

    pub fn remove_cmds(kind: EntityKind, name: &str) -> Vec<BatchCommand> {
        ops(kind).remove(name)
    }

    /// Build the rename batch, scanning the sample index when required.
    pub async fn rename_cmds(
        &self,
        kind: EntityKind,
        part: NamePart,
        old: &str,
        new: &str,
    ) -> Result<Vec<BatchCommand>> {
        let members = self.scan_for(kind).await?;
        Ok(ops(kind).rename(&members, part, old, new))
    }

    /// Build the cascade-delete batch, scanning the sample index when required.
    pub async fn cascade_delete_cmds(
        &self,
        kind: EntityKind,
        part: NamePart,
        name: &str,
    ) -> Result<Vec<BatchCommand>> {
        let members = self.scan_for(kind).await?;
        Ok(ops(kind).cascade_delete(&members, part, name))
    }

    /// Members fed into a strategy: only the sample strategy reads them, so
    /// skip the round-trip for the other kinds.
    async fn scan_for(&self, kind: EntityKind) -> Result<HashSet<String>> {
        if kind == EntityKind::Sample {
            self.list_keys(EntityKind::Sample).await
        } else {
            Ok(HashSet::new())
        }
    }
}

//! Aspect Auxiliary Store
//!
//! Per-aspect tag set, writer set, and ordered range list, materialized only
//! while the aspect is published. Tags and writers update by membership diff;
//! the range list carries ordering semantics and is always rewritten
//! wholesale. Subjects carry the analogous tag set plus an `exists` marker.
//!
//! Range list encoding: one member per non-null bound, insertion order OK,
//! Info, Warning, Critical, each member
//! `<boundIndex>:<boundKind>:<severity>:<value>`.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::model::{Aspect, EntityKind, Status, Subject};
use crate::domain::ports::{BatchCommand, CacheBackend};
use crate::error::Result;
use crate::store::key::{self, AuxField};

fn severity_label(status: Status) -> &'static str {
    match status {
        Status::Critical => "critical",
        Status::Warning => "warning",
        Status::Info => "info",
        Status::Ok => "ok",
        Status::Timeout => "timeout",
        Status::Invalid => "invalid",
    }
}

/// Encode an aspect's ranges into ordered list members.
pub fn encode_range_members(aspect: &Aspect) -> Vec<String> {
    let mut members = Vec::new();
    for (status, range) in aspect.ranges_by_insertion() {
        let Some(range) = range else { continue };
        let severity = severity_label(status);
        for (bound_index, bound_kind, bound) in
            [(0, "min", range.0), (1, "max", range.1)]
        {
            if let Some(value) = bound {
                members.push(format!("{bound_index}:{bound_kind}:{severity}:{value}"));
            }
        }
    }
    members
}

pub struct AspectAuxStore {
    backend: Arc<dyn CacheBackend>,
}

impl AspectAuxStore {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub async fn tags(&self, aspect_name: &str) -> Result<BTreeSet<String>> {
        let members = self
            .backend
            .smembers(&key::aux_key(EntityKind::Aspect, aspect_name, AuxField::Tags))
            .await?;
        Ok(members.into_iter().collect())
    }

    pub async fn writers(&self, aspect_name: &str) -> Result<BTreeSet<String>> {
        let members = self
            .backend
            .smembers(&key::aux_key(
                EntityKind::Aspect,
                aspect_name,
                AuxField::Writers,
            ))
            .await?;
        Ok(members.into_iter().collect())
    }

    pub async fn ranges(&self, aspect_name: &str) -> Result<Vec<String>> {
        self.backend
            .lrange(&key::aux_key(
                EntityKind::Aspect,
                aspect_name,
                AuxField::Ranges,
            ))
            .await
    }

    pub async fn is_writer(&self, aspect_name: &str, user_name: &str) -> Result<bool> {
        self.backend
            .sismember(
                &key::aux_key(EntityKind::Aspect, aspect_name, AuxField::Writers),
                user_name,
            )
            .await
    }

    pub async fn has_writers(&self, aspect_name: &str) -> Result<bool> {
        Ok(!self.writers(aspect_name).await?.is_empty())
    }

    // -------------------------------------------------------------------------
    // Batch builders
    // -------------------------------------------------------------------------

    /// Materialize tags, writers, and ranges for a published aspect. Clears
    /// first, so the same batch serves create and publish transitions.
    /// Produces nothing for an unpublished aspect.
    pub fn materialize_cmds(aspect: &Aspect) -> Vec<BatchCommand> {
        if !aspect.is_published {
            return Vec::new();
        }
        let mut batch = Self::clear_cmds(&aspect.name);
        if !aspect.tags.is_empty() {
            batch.push(BatchCommand::SAdd {
                key: key::aux_key(EntityKind::Aspect, &aspect.name, AuxField::Tags),
                members: aspect.tags.iter().cloned().collect(),
            });
        }
        let writer_names = aspect.writer_names();
        if !writer_names.is_empty() {
            batch.push(BatchCommand::SAdd {
                key: key::aux_key(EntityKind::Aspect, &aspect.name, AuxField::Writers),
                members: writer_names.into_iter().collect(),
            });
        }
        let range_members = encode_range_members(aspect);
        if !range_members.is_empty() {
            batch.push(BatchCommand::RPush {
                key: key::aux_key(EntityKind::Aspect, &aspect.name, AuxField::Ranges),
                values: range_members,
            });
        }
        batch
    }

    /// Clear all three aux keys regardless of publish state.
    pub fn clear_cmds(aspect_name: &str) -> Vec<BatchCommand> {
        vec![BatchCommand::Del {
            keys: vec![
                key::aux_key(EntityKind::Aspect, aspect_name, AuxField::Tags),
                key::aux_key(EntityKind::Aspect, aspect_name, AuxField::Writers),
                key::aux_key(EntityKind::Aspect, aspect_name, AuxField::Ranges),
            ],
        }]
    }

    /// Incremental membership diff for the tag set.
    pub fn diff_tags_cmds(
        aspect_name: &str,
        old: &BTreeSet<String>,
        new: &BTreeSet<String>,
    ) -> Vec<BatchCommand> {
        diff_set_cmds(
            key::aux_key(EntityKind::Aspect, aspect_name, AuxField::Tags),
            old,
            new,
        )
    }

    /// Incremental membership diff for the writer set.
    pub fn diff_writers_cmds(
        aspect_name: &str,
        old: &BTreeSet<String>,
        new: &BTreeSet<String>,
    ) -> Vec<BatchCommand> {
        diff_set_cmds(
            key::aux_key(EntityKind::Aspect, aspect_name, AuxField::Writers),
            old,
            new,
        )
    }

    /// Full rewrite of the range list. Partial diffs are not attempted because
    /// the list is ordered.
    pub fn rewrite_ranges_cmds(aspect: &Aspect) -> Vec<BatchCommand> {
        let ranges_key = key::aux_key(EntityKind::Aspect, &aspect.name, AuxField::Ranges);
        let mut batch = vec![BatchCommand::Del {
            keys: vec![ranges_key.clone()],
        }];
        let members = encode_range_members(aspect);
        if !members.is_empty() {
            batch.push(BatchCommand::RPush {
                key: ranges_key,
                values: members,
            });
        }
        batch
    }

    /// Move aux data under the renamed key. Only keys that actually exist are
    /// renamed, so an unpublished aspect (no aux data) is a no-op.
    pub async fn rename_cmds(&self, old: &str, new: &str) -> Result<Vec<BatchCommand>> {
        let mut batch = Vec::new();
        for field in [AuxField::Tags, AuxField::Writers] {
            let old_key = key::aux_key(EntityKind::Aspect, old, field);
            if !self.backend.smembers(&old_key).await?.is_empty() {
                batch.push(BatchCommand::Rename {
                    old: old_key,
                    new: key::aux_key(EntityKind::Aspect, new, field),
                });
            }
        }
        let old_ranges = key::aux_key(EntityKind::Aspect, old, AuxField::Ranges);
        if !self.backend.lrange(&old_ranges).await?.is_empty() {
            batch.push(BatchCommand::Rename {
                old: old_ranges,
                new: key::aux_key(EntityKind::Aspect, new, AuxField::Ranges),
            });
        }
        Ok(batch)
    }

    // -------------------------------------------------------------------------
    // Subject auxiliary data
    // -------------------------------------------------------------------------

    /// Subject aux data: an `exists` marker for every cached subject, plus the
    /// tag set while published.
    pub fn subject_write_cmds(subject: &Subject) -> Vec<BatchCommand> {
        let mut batch = vec![BatchCommand::Set {
            key: key::aux_key(
                EntityKind::Subject,
                &subject.absolute_path,
                AuxField::Exists,
            ),
            value: "true".to_string(),
        }];
        if subject.is_published && !subject.tags.is_empty() {
            batch.push(BatchCommand::SAdd {
                key: key::aux_key(EntityKind::Subject, &subject.absolute_path, AuxField::Tags),
                members: subject.tags.iter().cloned().collect(),
            });
        }
        batch
    }

    pub fn subject_clear_cmds(subject_path: &str) -> Vec<BatchCommand> {
        vec![BatchCommand::Del {
            keys: vec![
                key::aux_key(EntityKind::Subject, subject_path, AuxField::Tags),
                key::aux_key(EntityKind::Subject, subject_path, AuxField::Exists),
            ],
        }]
    }

    pub fn subject_diff_tags_cmds(
        subject_path: &str,
        old: &BTreeSet<String>,
        new: &BTreeSet<String>,
    ) -> Vec<BatchCommand> {
        diff_set_cmds(
            key::aux_key(EntityKind::Subject, subject_path, AuxField::Tags),
            old,
            new,
        )
    }

    pub async fn subject_rename_cmds(&self, old: &str, new: &str) -> Result<Vec<BatchCommand>> {
        let mut batch = Vec::new();
        let old_tags = key::aux_key(EntityKind::Subject, old, AuxField::Tags);
        if !self.backend.smembers(&old_tags).await?.is_empty() {
            batch.push(BatchCommand::Rename {
                old: old_tags,
                new: key::aux_key(EntityKind::Subject, new, AuxField::Tags),
            });
        }
        let old_exists = key::aux_key(EntityKind::Subject, old, AuxField::Exists);
        if self.backend.get(&old_exists).await?.is_some() {
            batch.push(BatchCommand::Rename {
                old: old_exists,
                new: key::aux_key(EntityKind::Subject, new, AuxField::Exists),
            });
        }
        Ok(batch)
    }
}

fn diff_set_cmds(set_key: String, old: &BTreeSet<String>, new: &BTreeSet<String>) -> Vec<BatchCommand> {
    let added: Vec<String> = new.difference(old).cloned().collect();
    let removed: Vec<String> = old.difference(new).cloned().collect();
    let mut batch = Vec::new();
    if !added.is_empty() {
        batch.push(BatchCommand::SAdd {
            key: set_key.clone(),
            members: added,
        });
    }
    if !removed.is_empty() {
        batch.push(BatchCommand::SRem {
            key: set_key,
            members: removed,
        });
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ThresholdRange;

    fn aspect() -> Aspect {
        let mut aspect = Aspect::new("Temperature").with_tags(["weather"]);
        aspect.ok_range = Some(ThresholdRange::new(Some(2.0), None));
        aspect.warning_range = Some(ThresholdRange::new(Some(1.0), Some(2.0)));
        aspect.critical_range = Some(ThresholdRange::new(Some(0.0), Some(1.0)));
        aspect
    }

    #[test]
    fn test_range_encoding_order_and_shape() {
        let members = encode_range_members(&aspect());
        // OK contributes only its lower bound; warning and critical both bounds
        assert_eq!(
            members,
            vec![
                "0:min:ok:2".to_string(),
                "0:min:warning:1".to_string(),
                "1:max:warning:2".to_string(),
                "0:min:critical:0".to_string(),
                "1:max:critical:1".to_string(),
            ]
        );
    }

    #[test]
    fn test_unpublished_aspect_materializes_nothing() {
        let aspect = aspect().unpublished();
        assert!(AspectAuxStore::materialize_cmds(&aspect).is_empty());
    }

    #[test]
    fn test_materialize_clears_then_writes() {
        let batch = AspectAuxStore::materialize_cmds(&aspect());
        assert!(matches!(&batch[0], BatchCommand::Del { keys } if keys.len() == 3));
        assert!(batch
            .iter()
            .any(|c| matches!(c, BatchCommand::RPush { key, .. } if key.ends_with(":ranges"))));
        assert!(batch
            .iter()
            .any(|c| matches!(c, BatchCommand::SAdd { key, .. } if key.ends_with(":tags"))));
    }

    #[test]
    fn test_tag_diff_is_incremental() {
        let old: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let new: BTreeSet<String> = ["b", "c"].iter().map(|s| s.to_string()).collect();
        let batch = AspectAuxStore::diff_tags_cmds("Temperature", &old, &new);
        assert_eq!(batch.len(), 2);
        assert!(matches!(&batch[0], BatchCommand::SAdd { members, .. }
            if members == &vec!["c".to_string()]));
        assert!(matches!(&batch[1], BatchCommand::SRem { members, .. }
            if members == &vec!["a".to_string()]));
    }

    #[test]
    fn test_identical_sets_diff_to_nothing() {
        let tags: BTreeSet<String> = ["a"].iter().map(|s| s.to_string()).collect();
        assert!(AspectAuxStore::diff_tags_cmds("t", &tags, &tags).is_empty());
    }

    #[test]
    fn test_range_rewrite_always_deletes_first() {
        let mut no_ranges = aspect();
        no_ranges.critical_range = None;
        no_ranges.warning_range = None;
        no_ranges.ok_range = None;
        let batch = AspectAuxStore::rewrite_ranges_cmds(&no_ranges);
        assert_eq!(batch.len(), 1);
        assert!(matches!(&batch[0], BatchCommand::Del { .. }));
    }

    #[test]
    fn test_subject_aux_gates_tags_on_publish() {
        let published = Subject::new("NA.Canada").with_tags(["prod"]);
        let batch = AspectAuxStore::subject_write_cmds(&published);
        assert_eq!(batch.len(), 2);

        let unpublished = Subject::new("NA.Canada").with_tags(["prod"]).unpublished();
        let batch = AspectAuxStore::subject_write_cmds(&unpublished);
        assert_eq!(batch.len(), 1);
        assert!(matches!(&batch[0], BatchCommand::Set { key, .. } if key.ends_with(":exists")));
    }
}

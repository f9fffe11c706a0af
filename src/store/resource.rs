//! Resource Maps
//!
//! Derived sets recording which aspects have samples under a subject and
//! which subjects carry samples for an aspect. The maps are exactly the
//! projection of the live sample master index onto its name parts, so
//! hierarchy membership checks are O(1) instead of a sample scan.
//!
//! The maps hold lower-cased name parts, matching the case-normalized sample
//! keys they are derived from. No locking: last write wins per command, and
//! every mutation travels inside the batch of the operation that caused it.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use crate::domain::ports::{BatchCommand, CacheBackend};
use crate::error::Result;
use crate::store::key;

pub struct ResourceMaps {
    backend: Arc<dyn CacheBackend>,
}

impl ResourceMaps {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Aspect names with a live sample under this subject.
    pub async fn aspects_of(&self, subject_path: &str) -> Result<HashSet<String>> {
        self.backend
            .smembers(&key::subject_aspect_map_key(subject_path))
            .await
    }

    /// Subject paths with a live sample for this aspect.
    pub async fn subjects_of(&self, aspect_name: &str) -> Result<HashSet<String>> {
        self.backend
            .smembers(&key::aspect_subject_map_key(aspect_name))
            .await
    }

    pub async fn has_aspect(&self, subject_path: &str, aspect_name: &str) -> Result<bool> {
        self.backend
            .sismember(
                &key::subject_aspect_map_key(subject_path),
                &aspect_name.to_lowercase(),
            )
            .await
    }

    // -------------------------------------------------------------------------
    // Batch builders
    // -------------------------------------------------------------------------

    /// Record one sample's membership in both maps.
    pub fn link_cmds(subject_part: &str, aspect_part: &str) -> Vec<BatchCommand> {
        vec![
            BatchCommand::SAdd {
                key: key::subject_aspect_map_key(subject_part),
                members: vec![aspect_part.to_lowercase()],
            },
            BatchCommand::SAdd {
                key: key::aspect_subject_map_key(aspect_part),
                members: vec![subject_part.to_lowercase()],
            },
        ]
    }

    /// Remove one sample's membership from both maps. Safe because sample
    /// identity is unique per subject+aspect pair.
    pub fn unlink_cmds(subject_part: &str, aspect_part: &str) -> Vec<BatchCommand> {
        vec![
            BatchCommand::SRem {
                key: key::subject_aspect_map_key(subject_part),
                members: vec![aspect_part.to_lowercase()],
            },
            BatchCommand::SRem {
                key: key::aspect_subject_map_key(aspect_part),
                members: vec![subject_part.to_lowercase()],
            },
        ]
    }

    /// Derive both maps from a full set of sample keys: one SADD per derived
    /// key carrying its complete member list. Used by bulk population.
    pub fn derive_cmds(sample_keys: &HashSet<String>) -> Vec<BatchCommand> {
        let mut by_subject: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut by_aspect: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for sample_key in sample_keys {
            let (subject_part, aspect_part) = match key::parse_sample_key(sample_key) {
                Ok(parts) => parts,
                Err(_) => {
                    warn!(key = %sample_key, "Skipping unparseable sample key during map derivation");
                    continue;
                }
            };
            by_subject
                .entry(subject_part.to_string())
                .or_default()
                .push(aspect_part.to_string());
            by_aspect
                .entry(aspect_part.to_string())
                .or_default()
                .push(subject_part.to_string());
        }
        let mut batch = Vec::with_capacity(by_subject.len() + by_aspect.len());
        for (subject, aspects) in by_subject {
            batch.push(BatchCommand::SAdd {
                key: key::subject_aspect_map_key(&subject),
                members: aspects,
            });
        }
        for (aspect, subjects) in by_aspect {
            batch.push(BatchCommand::SAdd {
                key: key::aspect_subject_map_key(&aspect),
                members: subjects,
            });
        }
        batch
    }

    /// Every resource-map key derivable from a set of sample keys. Used by
    /// eradication to sweep the maps alongside the sample hashes.
    pub fn derived_keys(sample_keys: &HashSet<String>) -> Vec<String> {
        let mut keys = HashSet::new();
        for sample_key in sample_keys {
            if let Ok((subject_part, aspect_part)) = key::parse_sample_key(sample_key) {
                keys.insert(key::subject_aspect_map_key(subject_part));
                keys.insert(key::aspect_subject_map_key(aspect_part));
            }
        }
        let mut keys: Vec<String> = keys.into_iter().collect();
        keys.sort();
        keys
    }

    /// Rewrite both maps for a subject rename: merge the subject's members
    /// into the new map key (the target subject may already carry samples)
    /// and update the reverse entry in every affected aspect map.
    pub async fn rename_subject_cmds(&self, old: &str, new: &str) -> Result<Vec<BatchCommand>> {
        let aspects = self.aspects_of(old).await?;
        if aspects.is_empty() {
            return Ok(Vec::new());
        }
        let mut batch = vec![
            BatchCommand::SAdd {
                key: key::subject_aspect_map_key(new),
                members: aspects.iter().cloned().collect(),
            },
            BatchCommand::Del {
                keys: vec![key::subject_aspect_map_key(old)],
            },
        ];
        for aspect in &aspects {
            batch.push(BatchCommand::SRem {
                key: key::aspect_subject_map_key(aspect),
                members: vec![old.to_lowercase()],
            });
            batch.push(BatchCommand::SAdd {
                key: key::aspect_subject_map_key(aspect),
                members: vec![new.to_lowercase()],
            });
        }
        Ok(batch)
    }

    /// Rewrite both maps for an aspect rename.
    pub async fn rename_aspect_cmds(&self, old: &str, new: &str) -> Result<Vec<BatchCommand>> {
        let subjects = self.subjects_of(old).await?;
        if subjects.is_empty() {
            return Ok(Vec::new());
        }
        let mut batch = vec![
            BatchCommand::SAdd {
                key: key::aspect_subject_map_key(new),
                members: subjects.iter().cloned().collect(),
            },
            BatchCommand::Del {
                keys: vec![key::aspect_subject_map_key(old)],
            },
        ];
        for subject in &subjects {
            batch.push(BatchCommand::SRem {
                key: key::subject_aspect_map_key(subject),
                members: vec![old.to_lowercase()],
            });
            batch.push(BatchCommand::SAdd {
                key: key::subject_aspect_map_key(subject),
                members: vec![new.to_lowercase()],
            });
        }
        Ok(batch)
    }

    /// Drop a subject's map key and its reverse entries after a cascade
    /// delete.
    pub async fn drop_subject_cmds(&self, subject_path: &str) -> Result<Vec<BatchCommand>> {
        let aspects = self.aspects_of(subject_path).await?;
        let mut batch = vec![BatchCommand::Del {
            keys: vec![key::subject_aspect_map_key(subject_path)],
        }];
        for aspect in &aspects {
            batch.push(BatchCommand::SRem {
                key: key::aspect_subject_map_key(aspect),
                members: vec![subject_path.to_lowercase()],
            });
        }
        Ok(batch)
    }

    /// Drop an aspect's map key and its reverse entries.
    pub async fn drop_aspect_cmds(&self, aspect_name: &str) -> Result<Vec<BatchCommand>> {
        let subjects = self.subjects_of(aspect_name).await?;
        let mut batch = vec![BatchCommand::Del {
            keys: vec![key::aspect_subject_map_key(aspect_name)],
        }];
        for subject in &subjects {
            batch.push(BatchCommand::SRem {
                key: key::subject_aspect_map_key(subject),
                members: vec![aspect_name.to_lowercase()],
            });
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::EntityKind;

    fn sample_keys(names: &[&str]) -> HashSet<String> {
        names
            .iter()
            .map(|n| key::to_key(EntityKind::Sample, n))
            .collect()
    }

    #[test]
    fn test_link_and_unlink_are_symmetric() {
        let link = ResourceMaps::link_cmds("NA.Canada", "Temperature");
        let unlink = ResourceMaps::unlink_cmds("NA.Canada", "Temperature");
        assert_eq!(link.len(), 2);
        assert_eq!(unlink.len(), 2);
        assert!(matches!(&link[0], BatchCommand::SAdd { key, members }
            if key == "vigil:subaspmap:na.canada" && members == &vec!["temperature".to_string()]));
        assert!(matches!(&unlink[1], BatchCommand::SRem { key, members }
            if key == "vigil:aspsubmap:temperature" && members == &vec!["na.canada".to_string()]));
    }

    #[test]
    fn test_derive_groups_members_per_key() {
        let keys = sample_keys(&[
            "NA.Canada|temperature",
            "NA.Canada|humidity",
            "NA.Mexico|temperature",
        ]);
        let batch = ResourceMaps::derive_cmds(&keys);
        // Two subject maps + two aspect maps, one SADD each
        assert_eq!(batch.len(), 4);
        let canada = batch
            .iter()
            .find_map(|c| match c {
                BatchCommand::SAdd { key, members } if key == "vigil:subaspmap:na.canada" => {
                    Some(members.clone())
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(canada.len(), 2);
        let temperature = batch
            .iter()
            .find_map(|c| match c {
                BatchCommand::SAdd { key, members } if key == "vigil:aspsubmap:temperature" => {
                    Some(members.clone())
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(temperature.len(), 2);
    }

    #[test]
    fn test_derived_keys_for_eradication() {
        let keys = sample_keys(&["NA.Canada|temperature", "NA.Mexico|temperature"]);
        let derived = ResourceMaps::derived_keys(&keys);
        assert_eq!(derived.len(), 3);
        assert!(derived.contains(&"vigil:aspsubmap:temperature".to_string()));
        assert!(derived.contains(&"vigil:subaspmap:na.canada".to_string()));
        assert!(derived.contains(&"vigil:subaspmap:na.mexico".to_string()));
    }

    #[test]
    fn test_derive_skips_unparseable_keys() {
        let mut keys = sample_keys(&["NA.Canada|temperature"]);
        keys.insert("vigil:sample:not-a-sample".to_string());
        let batch = ResourceMaps::derive_cmds(&keys);
        assert_eq!(batch.len(), 2);
    }
}

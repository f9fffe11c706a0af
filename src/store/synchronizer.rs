//! Cache Synchronizer
//!
//! Orchestrates every mutation of the denormalized cache: bulk population
//! from the relational store, bulk eradication, and the incremental
//! create/update/delete/rename entry points invoked by relational-store
//! hooks. Each logical operation collects its index, hash, resource-map, and
//! auxiliary mutations into one pipelined batch, so the backend receives the
//! whole cascade as a single unit of work.
//!
//! There is no isolation between concurrently submitted batches: two cascades
//! touching overlapping sample keys can interleave. The source system accepts
//! this; callers needing stronger guarantees must serialize above this layer.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::model::{
    Aspect, EntityKind, Sample, SampleInput, Status, Subject, SAMPLE_SEPARATOR,
};
use crate::domain::ports::{BatchCommand, CacheBackend, RelationalStore};
use crate::error::{Error, Result};
use crate::status::compute_status;
use crate::store::aspect_aux::AspectAuxStore;
use crate::store::index::{IndexStore, NamePart};
use crate::store::key::{self, AuxField, PREVIOUS_FLAG_KEY};
use crate::store::metrics::SyncMetrics;
use crate::store::resource::ResourceMaps;

pub struct CacheSynchronizer {
    backend: Arc<dyn CacheBackend>,
    relational: Arc<dyn RelationalStore>,
    index: IndexStore,
    maps: ResourceMaps,
    aux: AspectAuxStore,
    metrics: Arc<SyncMetrics>,
}

impl CacheSynchronizer {
    pub fn new(backend: Arc<dyn CacheBackend>, relational: Arc<dyn RelationalStore>) -> Self {
        Self {
            index: IndexStore::new(backend.clone()),
            maps: ResourceMaps::new(backend.clone()),
            aux: AspectAuxStore::new(backend.clone()),
            metrics: Arc::new(SyncMetrics::new()),
            backend,
            relational,
        }
    }

    pub fn metrics(&self) -> Arc<SyncMetrics> {
        self.metrics.clone()
    }

    pub fn index(&self) -> &IndexStore {
        &self.index
    }

    pub fn resource_maps(&self) -> &ResourceMaps {
        &self.maps
    }

    pub fn aspect_aux(&self) -> &AspectAuxStore {
        &self.aux
    }

    /// Submit one batch, skipping the round-trip when it is empty.
    async fn submit(&self, batch: Vec<BatchCommand>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.metrics.record_batch(batch.len() as u64);
        self.backend.exec(batch).await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_subject(&self, absolute_path: &str) -> Result<Option<Subject>> {
        let cache_key = key::to_key(EntityKind::Subject, absolute_path);
        let hash = self.backend.hgetall(&cache_key).await?;
        if hash.is_empty() {
            return Ok(None);
        }
        Subject::from_hash(&cache_key, &hash).map(Some)
    }

    pub async fn get_aspect(&self, name: &str) -> Result<Option<Aspect>> {
        let cache_key = key::to_key(EntityKind::Aspect, name);
        let hash = self.backend.hgetall(&cache_key).await?;
        if hash.is_empty() {
            return Ok(None);
        }
        Aspect::from_hash(&cache_key, &hash).map(Some)
    }

    pub async fn get_sample(&self, name: &str) -> Result<Option<Sample>> {
        let cache_key = key::to_key(EntityKind::Sample, name);
        let hash = self.backend.hgetall(&cache_key).await?;
        if hash.is_empty() {
            return Ok(None);
        }
        Sample::from_hash(&cache_key, &hash).map(Some)
    }

    // =========================================================================
    // Subjects
    // =========================================================================

    #[instrument(skip(self, subject), fields(subject = %subject.absolute_path))]
    pub async fn create_subject(&self, subject: &Subject) -> Result<()> {
        let mut batch = vec![BatchCommand::HSet {
            key: key::to_key(EntityKind::Subject, &subject.absolute_path),
            fields: subject.to_hash()?,
        }];
        batch.extend(IndexStore::add_cmds(
            EntityKind::Subject,
            &subject.absolute_path,
        ));
        batch.extend(AspectAuxStore::subject_write_cmds(subject));
        self.submit(batch).await?;
        info!("Subject cached");
        Ok(())
    }

    /// Mirror a relational subject update. Handles rename cascades and
    /// publish transitions before rewriting the hash.
    #[instrument(skip(self, old, new), fields(subject = %new.absolute_path))]
    pub async fn update_subject(&self, old: &Subject, new: &Subject) -> Result<()> {
        if !old.absolute_path.eq_ignore_ascii_case(&new.absolute_path) {
            self.rename_subject(&old.absolute_path, &new.absolute_path)
                .await?;
        }

        // Delete-then-write so fields dropped by the update do not linger
        let subject_key = key::to_key(EntityKind::Subject, &new.absolute_path);
        let mut batch = vec![
            BatchCommand::Del {
                keys: vec![subject_key.clone()],
            },
            BatchCommand::HSet {
                key: subject_key,
                fields: new.to_hash()?,
            },
        ];

        match (old.is_published, new.is_published) {
            (true, false) => {
                // Dependent samples leave the cache with the unpublish
                batch.push(BatchCommand::Del {
                    keys: vec![key::aux_key(
                        EntityKind::Subject,
                        &new.absolute_path,
                        AuxField::Tags,
                    )],
                });
                batch.extend(
                    self.index
                        .cascade_delete_cmds(
                            EntityKind::Sample,
                            NamePart::Subject,
                            &new.absolute_path,
                        )
                        .await?,
                );
                batch.extend(self.maps.drop_subject_cmds(&new.absolute_path).await?);
                self.metrics.record_cascade_delete();
            }
            (false, true) => {
                batch.extend(AspectAuxStore::subject_write_cmds(new));
            }
            (true, true) => {
                batch.extend(AspectAuxStore::subject_diff_tags_cmds(
                    &new.absolute_path,
                    &old.tags,
                    &new.tags,
                ));
            }
            (false, false) => {}
        }

        self.submit(batch).await?;
        debug!("Subject updated");
        Ok(())
    }

    /// Rename a subject and cascade over every sample keyed under it: index
    /// swap, hash rename, aux keys, sample keys, and both resource maps, all
    /// in one batch. Scans the full sample index once.
    #[instrument(skip(self))]
    pub async fn rename_subject(&self, old_path: &str, new_path: &str) -> Result<()> {
        let old_key = key::to_key(EntityKind::Subject, old_path);
        let hash = self.backend.hgetall(&old_key).await?;
        if hash.is_empty() {
            return Err(Error::ResourceNotFound {
                kind: "subject",
                name: old_path.to_string(),
            });
        }

        // A display-case-only change keeps every key; only the stored path
        // needs rewriting.
        if old_path.eq_ignore_ascii_case(new_path) {
            return self
                .submit(vec![BatchCommand::HSet {
                    key: key::to_key(EntityKind::Subject, new_path),
                    fields: subject_path_fields(new_path),
                }])
                .await;
        }

        let mut batch = self
            .index
            .rename_cmds(EntityKind::Subject, NamePart::Subject, old_path, new_path)
            .await?;
        // The renamed hash keeps display case for the new path
        batch.push(BatchCommand::HSet {
            key: key::to_key(EntityKind::Subject, new_path),
            fields: subject_path_fields(new_path),
        });
        batch.extend(self.aux.subject_rename_cmds(old_path, new_path).await?);

        let sample_batch = self
            .index
            .rename_cmds(EntityKind::Sample, NamePart::Subject, old_path, new_path)
            .await?;
        let refresh = sample_name_refresh_cmds(&sample_batch, NamePart::Subject, new_path);
        batch.extend(sample_batch);
        // After the renames, so the refreshed field lands on the moved hash
        batch.extend(refresh);
        batch.extend(self.maps.rename_subject_cmds(old_path, new_path).await?);

        self.submit(batch).await?;
        self.metrics.record_cascade_rename();
        info!("Subject renamed");
        Ok(())
    }

    /// Hard-remove a subject from cache, cascading over its samples.
    #[instrument(skip(self))]
    pub async fn delete_subject(&self, absolute_path: &str) -> Result<()> {
        let mut batch = IndexStore::remove_cmds(EntityKind::Subject, absolute_path);
        batch.extend(AspectAuxStore::subject_clear_cmds(absolute_path));
        batch.extend(
            self.index
                .cascade_delete_cmds(EntityKind::Sample, NamePart::Subject, absolute_path)
                .await?,
        );
        batch.extend(self.maps.drop_subject_cmds(absolute_path).await?);
        self.submit(batch).await?;
        self.metrics.record_cascade_delete();
        info!("Subject removed from cache");
        Ok(())
    }

    // =========================================================================
    // Aspects
    // =========================================================================

    #[instrument(skip(self, aspect), fields(aspect = %aspect.name))]
    pub async fn create_aspect(&self, aspect: &Aspect) -> Result<()> {
        let mut batch = vec![BatchCommand::HSet {
            key: key::to_key(EntityKind::Aspect, &aspect.name),
            fields: aspect.to_hash()?,
        }];
        batch.extend(IndexStore::add_cmds(EntityKind::Aspect, &aspect.name));
        batch.extend(AspectAuxStore::materialize_cmds(aspect));
        self.submit(batch).await?;
        info!(published = aspect.is_published, "Aspect cached");
        Ok(())
    }

    /// Mirror a relational aspect update: rename cascade, publish
    /// transitions, incremental tag/writer diffs, full range rewrite.
    #[instrument(skip(self, old, new), fields(aspect = %new.name))]
    pub async fn update_aspect(&self, old: &Aspect, new: &Aspect) -> Result<()> {
        if !old.name.eq_ignore_ascii_case(&new.name) {
            self.rename_aspect(&old.name, &new.name).await?;
        }

        // Delete-then-write so fields dropped by the update do not linger
        let aspect_key = key::to_key(EntityKind::Aspect, &new.name);
        let mut batch = vec![
            BatchCommand::Del {
                keys: vec![aspect_key.clone()],
            },
            BatchCommand::HSet {
                key: aspect_key,
                fields: new.to_hash()?,
            },
        ];

        match (old.is_published, new.is_published) {
            (true, false) => {
                batch.extend(AspectAuxStore::clear_cmds(&new.name));
                batch.extend(
                    self.index
                        .cascade_delete_cmds(EntityKind::Sample, NamePart::Aspect, &new.name)
                        .await?,
                );
                batch.extend(self.maps.drop_aspect_cmds(&new.name).await?);
                self.metrics.record_cascade_delete();
            }
            (false, true) => {
                batch.extend(AspectAuxStore::materialize_cmds(new));
            }
            (true, true) => {
                batch.extend(AspectAuxStore::diff_tags_cmds(
                    &new.name, &old.tags, &new.tags,
                ));
                batch.extend(AspectAuxStore::diff_writers_cmds(
                    &new.name,
                    &old.writer_names(),
                    &new.writer_names(),
                ));
                if ranges_changed(old, new) {
                    batch.extend(AspectAuxStore::rewrite_ranges_cmds(new));
                }
            }
            (false, false) => {}
        }

        self.submit(batch).await?;
        debug!("Aspect updated");
        Ok(())
    }

    /// Rename an aspect and cascade over every sample keyed under it.
    /// Aux data follows the renamed key; an unpublished aspect has none, so
    /// that part is naturally a no-op.
    #[instrument(skip(self))]
    pub async fn rename_aspect(&self, old_name: &str, new_name: &str) -> Result<()> {
        let old_key = key::to_key(EntityKind::Aspect, old_name);
        let hash = self.backend.hgetall(&old_key).await?;
        if hash.is_empty() {
            return Err(Error::ResourceNotFound {
                kind: "aspect",
                name: old_name.to_string(),
            });
        }

        if old_name.eq_ignore_ascii_case(new_name) {
            return self
                .submit(vec![BatchCommand::HSet {
                    key: key::to_key(EntityKind::Aspect, new_name),
                    fields: vec![("name".to_string(), new_name.to_string())],
                }])
                .await;
        }

        let mut batch = self
            .index
            .rename_cmds(EntityKind::Aspect, NamePart::Aspect, old_name, new_name)
            .await?;
        batch.push(BatchCommand::HSet {
            key: key::to_key(EntityKind::Aspect, new_name),
            fields: vec![("name".to_string(), new_name.to_string())],
        });
        batch.extend(self.aux.rename_cmds(old_name, new_name).await?);

        let sample_batch = self
            .index
            .rename_cmds(EntityKind::Sample, NamePart::Aspect, old_name, new_name)
            .await?;
        let refresh = sample_name_refresh_cmds(&sample_batch, NamePart::Aspect, new_name);
        batch.extend(sample_batch);
        batch.extend(refresh);
        batch.extend(self.maps.rename_aspect_cmds(old_name, new_name).await?);

        self.submit(batch).await?;
        self.metrics.record_cascade_rename();
        info!("Aspect renamed");
        Ok(())
    }

    /// Hard-remove an aspect from cache, cascading over its samples. Aux data
    /// is cleared regardless of publish state.
    #[instrument(skip(self))]
    pub async fn delete_aspect(&self, name: &str) -> Result<()> {
        let mut batch = IndexStore::remove_cmds(EntityKind::Aspect, name);
        batch.extend(AspectAuxStore::clear_cmds(name));
        batch.extend(
            self.index
                .cascade_delete_cmds(EntityKind::Sample, NamePart::Aspect, name)
                .await?,
        );
        batch.extend(self.maps.drop_aspect_cmds(name).await?);
        self.submit(batch).await?;
        self.metrics.record_cascade_delete();
        info!("Aspect removed from cache");
        Ok(())
    }

    // =========================================================================
    // Samples
    // =========================================================================

    /// Write one sample, deriving its status from the aspect's ranges. Both
    /// endpoints must be cached and published.
    #[instrument(skip(self, input), fields(sample = %input.name))]
    pub async fn upsert_sample(&self, input: &SampleInput) -> Result<Sample> {
        let (subject_part, aspect_part) = Sample::split_name(&input.name)?;

        let subject = self.get_subject(subject_part).await?;
        if !subject.map(|s| s.is_published).unwrap_or(false) {
            return Err(Error::ResourceNotFound {
                kind: "subject",
                name: subject_part.to_string(),
            });
        }
        let aspect = self
            .get_aspect(aspect_part)
            .await?
            .filter(|a| a.is_published)
            .ok_or_else(|| Error::ResourceNotFound {
                kind: "aspect",
                name: aspect_part.to_string(),
            })?;

        let previous = self.get_sample(&input.name).await?;
        let status = compute_status(Some(&aspect), &input.value);
        let now = Utc::now();
        let sample = match previous {
            Some(existing) if existing.status == status => Sample {
                name: input.name.clone(),
                value: input.value.clone(),
                status,
                previous_status: existing.previous_status,
                status_changed_at: existing.status_changed_at,
                updated_at: now,
                related_links: input.related_links.clone(),
            },
            Some(existing) => Sample {
                name: input.name.clone(),
                value: input.value.clone(),
                status,
                previous_status: existing.status,
                status_changed_at: now,
                updated_at: now,
                related_links: input.related_links.clone(),
            },
            None => Sample {
                name: input.name.clone(),
                value: input.value.clone(),
                status,
                previous_status: Status::Invalid,
                status_changed_at: now,
                updated_at: now,
                related_links: input.related_links.clone(),
            },
        };

        let mut batch = vec![BatchCommand::HSet {
            key: key::to_key(EntityKind::Sample, &sample.name),
            fields: sample.to_hash()?,
        }];
        batch.extend(IndexStore::add_cmds(EntityKind::Sample, &sample.name));
        batch.extend(ResourceMaps::link_cmds(subject_part, aspect_part));
        self.submit(batch).await?;
        self.metrics.record_sample_upsert();
        debug!(status = %sample.status, "Sample upserted");
        Ok(sample)
    }

    /// Remove one sample from index, hash, and both resource maps.
    #[instrument(skip(self))]
    pub async fn delete_sample(&self, name: &str) -> Result<()> {
        let (subject_part, aspect_part) = Sample::split_name(name)?;
        let mut batch = IndexStore::remove_cmds(EntityKind::Sample, name);
        batch.extend(ResourceMaps::unlink_cmds(subject_part, aspect_part));
        self.submit(batch).await?;
        self.metrics.record_sample_delete();
        debug!("Sample removed from cache");
        Ok(())
    }

    /// Writer-permission check for sample writes against an aspect. An empty
    /// writer set means anyone may write. Bulk callers get a quiet `false`
    /// so one forbidden row does not fail a whole upload.
    pub async fn check_write_permission(
        &self,
        aspect_name: &str,
        user_name: &str,
        is_bulk: bool,
    ) -> Result<bool> {
        if !self.aux.has_writers(aspect_name).await? {
            return Ok(true);
        }
        if self.aux.is_writer(aspect_name, user_name).await? {
            return Ok(true);
        }
        if is_bulk {
            return Ok(false);
        }
        Err(Error::UpdateDeleteForbidden {
            aspect: aspect_name.to_string(),
            user: user_name.to_string(),
        })
    }

    // =========================================================================
    // Bulk lifecycle
    // =========================================================================

    /// Mirror the full relational store into the cache: aspects, then
    /// subjects, then samples with their index and resource maps. Phases run
    /// sequentially to bound memory and connection pressure; each phase is one
    /// pipelined batch. Per-entity serialization failures are logged and
    /// skipped; a phase failure rejects the whole populate.
    #[instrument(skip(self))]
    pub async fn populate(&self) -> Result<()> {
        self.populate_aspects().await?;
        self.populate_subjects().await?;
        self.populate_samples().await?;
        self.metrics.record_populate();
        info!("Cache populated");
        Ok(())
    }

    async fn populate_aspects(&self) -> Result<()> {
        let aspects = self.relational.find_aspects().await?;
        let mut batch = Vec::new();
        let mut keys = Vec::new();
        for aspect in &aspects {
            let fields = match aspect.to_hash() {
                Ok(fields) => fields,
                Err(e) => {
                    warn!(aspect = %aspect.name, error = %e, "Skipping aspect during populate");
                    self.metrics.record_swallowed_error();
                    continue;
                }
            };
            batch.push(BatchCommand::HSet {
                key: key::to_key(EntityKind::Aspect, &aspect.name),
                fields,
            });
            keys.push(key::to_key(EntityKind::Aspect, &aspect.name));
            batch.extend(AspectAuxStore::materialize_cmds(aspect));
        }
        if !keys.is_empty() {
            batch.push(BatchCommand::SAdd {
                key: key::index_key(EntityKind::Aspect),
                members: keys,
            });
        }
        self.submit(batch).await.map_err(|e| {
            error!(error = %e, "Aspect populate phase failed");
            e
        })?;
        info!(count = aspects.len(), "Aspects populated");
        Ok(())
    }

    async fn populate_subjects(&self) -> Result<()> {
        let subjects = self.relational.find_subjects().await?;
        let mut batch = Vec::new();
        let mut keys = Vec::new();
        for subject in &subjects {
            let fields = match subject.to_hash() {
                Ok(fields) => fields,
                Err(e) => {
                    warn!(subject = %subject.absolute_path, error = %e, "Skipping subject during populate");
                    self.metrics.record_swallowed_error();
                    continue;
                }
            };
            batch.push(BatchCommand::HSet {
                key: key::to_key(EntityKind::Subject, &subject.absolute_path),
                fields,
            });
            keys.push(key::to_key(EntityKind::Subject, &subject.absolute_path));
            batch.extend(AspectAuxStore::subject_write_cmds(subject));
        }
        if !keys.is_empty() {
            batch.push(BatchCommand::SAdd {
                key: key::index_key(EntityKind::Subject),
                members: keys,
            });
        }
        self.submit(batch).await.map_err(|e| {
            error!(error = %e, "Subject populate phase failed");
            e
        })?;
        info!(count = subjects.len(), "Subjects populated");
        Ok(())
    }

    /// One combined derivation pass: sample hashes, the sample master index,
    /// and both resource maps.
    async fn populate_samples(&self) -> Result<()> {
        let samples = self.relational.find_samples().await?;
        let mut batch = Vec::new();
        let mut keys = HashSet::new();
        for sample in &samples {
            let fields = match sample.to_hash() {
                Ok(fields) => fields,
                Err(e) => {
                    warn!(sample = %sample.name, error = %e, "Skipping sample during populate");
                    self.metrics.record_swallowed_error();
                    continue;
                }
            };
            let sample_key = key::to_key(EntityKind::Sample, &sample.name);
            batch.push(BatchCommand::HSet {
                key: sample_key.clone(),
                fields,
            });
            keys.insert(sample_key);
        }
        if !keys.is_empty() {
            batch.push(BatchCommand::SAdd {
                key: key::index_key(EntityKind::Sample),
                members: keys.iter().cloned().collect(),
            });
        }
        batch.extend(ResourceMaps::derive_cmds(&keys));
        self.submit(batch).await.map_err(|e| {
            error!(error = %e, "Sample populate phase failed");
            e
        })?;
        info!(count = samples.len(), "Samples populated");
        Ok(())
    }

    /// Best-effort global wipe: the persisted flag marker, every master index
    /// set, every hash, every derived resource-map key, and every aux key.
    /// Per-kind failures are logged and swallowed so sibling kinds still get
    /// cleaned.
    #[instrument(skip(self))]
    pub async fn eradicate(&self) -> Result<()> {
        if let Err(e) = self
            .backend
            .del(&[PREVIOUS_FLAG_KEY.to_string()])
            .await
        {
            warn!(error = %e, "Failed to delete persisted flag marker");
            self.metrics.record_swallowed_error();
        }

        let cleanups = EntityKind::all().map(|kind| self.eradicate_kind(kind));
        for (kind, outcome) in EntityKind::all().into_iter().zip(join_all(cleanups).await) {
            if let Err(e) = outcome {
                error!(kind = %kind, error = %e, "Eradicate failed for kind");
                self.metrics.record_swallowed_error();
            }
        }
        self.metrics.record_eradicate();
        info!("Cache eradicated");
        Ok(())
    }

    async fn eradicate_kind(&self, kind: EntityKind) -> Result<()> {
        let members = self.index.list_keys(kind).await?;
        let mut keys: Vec<String> = members.iter().cloned().collect();
        match kind {
            EntityKind::Sample => {
                keys.extend(ResourceMaps::derived_keys(&members));
            }
            EntityKind::Subject | EntityKind::Aspect => {
                for member in &members {
                    if let Ok(name) = key::name_of(kind, member) {
                        for field in AuxField::all() {
                            keys.push(key::aux_key(kind, name, field));
                        }
                    }
                }
            }
        }
        keys.push(key::index_key(kind));
        let removed = self.backend.del(&keys).await?;
        debug!(kind = %kind, candidates = keys.len(), removed, "Eradicated kind");
        Ok(())
    }
}

/// Hash fields refreshed on a subject rename: the stored display path and its
/// derived parent.
fn subject_path_fields(new_path: &str) -> Vec<(String, String)> {
    let mut fields = vec![("absolute_path".to_string(), new_path.to_string())];
    if let Some(parent) = crate::domain::model::parent_of(new_path) {
        fields.push(("parent_absolute_path".to_string(), parent));
    }
    fields
}

/// Keep the display `name` field of renamed sample hashes coherent with their
/// new keys. The untouched name part comes from the key, so it is lower-cased.
fn sample_name_refresh_cmds(
    sample_batch: &[BatchCommand],
    part: NamePart,
    new_display: &str,
) -> Vec<BatchCommand> {
    sample_batch
        .iter()
        .filter_map(|cmd| match cmd {
            BatchCommand::Rename { new, .. } => {
                let (subject_part, aspect_part) = key::parse_sample_key(new).ok()?;
                let name = match part {
                    NamePart::Subject => format!("{new_display}{SAMPLE_SEPARATOR}{aspect_part}"),
                    NamePart::Aspect => format!("{subject_part}{SAMPLE_SEPARATOR}{new_display}"),
                };
                Some(BatchCommand::HSet {
                    key: new.clone(),
                    fields: vec![("name".to_string(), name)],
                })
            }
            _ => None,
        })
        .collect()
}

fn ranges_changed(old: &Aspect, new: &Aspect) -> bool {
    old.critical_range != new.critical_range
        || old.warning_range != new.warning_range
        || old.info_range != new.info_range
        || old.ok_range != new.ok_range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ThresholdRange;

    #[test]
    fn test_ranges_changed_detects_each_field() {
        let base = Aspect::new("t");
        let mut changed = base.clone();
        assert!(!ranges_changed(&base, &changed));
        changed.info_range = Some(ThresholdRange::new(Some(0.0), None));
        assert!(ranges_changed(&base, &changed));
    }

    #[test]
    fn test_sample_name_refresh_follows_renames() {
        let batch = vec![
            BatchCommand::Rename {
                old: "vigil:sample:na.canada|temperature".to_string(),
                new: "vigil:sample:eu.france|temperature".to_string(),
            },
            BatchCommand::SRem {
                key: "vigil:samples".to_string(),
                members: vec!["vigil:sample:na.canada|temperature".to_string()],
            },
        ];
        let refresh = sample_name_refresh_cmds(&batch, NamePart::Subject, "EU.France");
        assert_eq!(refresh.len(), 1);
        assert!(matches!(&refresh[0], BatchCommand::HSet { key, fields }
            if key == "vigil:sample:eu.france|temperature"
                && fields[0].1 == "EU.France|temperature"));
    }

    #[test]
    fn test_subject_path_fields_include_parent() {
        let fields = subject_path_fields("NA.Canada.Quebec");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].1, "NA.Canada");

        let fields = subject_path_fields("NA");
        assert_eq!(fields.len(), 1);
    }
}

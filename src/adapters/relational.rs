//! In-Memory Relational Store
//!
//! A `RwLock`-backed implementation of the `RelationalStore` port with seed
//! helpers. Useful for development, populate/reconcile tests, and embedded
//! deployments without a database.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::model::{Aspect, Sample, Subject};
use crate::domain::ports::RelationalStore;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct InMemoryRelationalStore {
    subjects: RwLock<Vec<Subject>>,
    aspects: RwLock<Vec<Aspect>>,
    samples: RwLock<Vec<Sample>>,
}

impl InMemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_subject(&self, subject: Subject) {
        self.subjects.write().push(subject);
    }

    pub fn add_aspect(&self, aspect: Aspect) {
        self.aspects.write().push(aspect);
    }

    pub fn add_sample(&self, sample: Sample) {
        self.samples.write().push(sample);
    }

    pub fn clear(&self) {
        self.subjects.write().clear();
        self.aspects.write().clear();
        self.samples.write().clear();
    }
}

#[async_trait]
impl RelationalStore for InMemoryRelationalStore {
    async fn find_subjects(&self) -> Result<Vec<Subject>> {
        Ok(self.subjects.read().clone())
    }

    async fn find_aspects(&self) -> Result<Vec<Aspect>> {
        Ok(self.aspects.read().clone())
    }

    /// Applies the published-endpoints contract: rows whose subject or aspect
    /// is missing or unpublished are not returned.
    async fn find_samples(&self) -> Result<Vec<Sample>> {
        let subjects = self.subjects.read();
        let aspects = self.aspects.read();
        let samples = self
            .samples
            .read()
            .iter()
            .filter(|sample| {
                let Ok((subject_part, aspect_part)) = Sample::split_name(&sample.name) else {
                    return false;
                };
                let subject_published = subjects.iter().any(|s| {
                    s.is_published && s.absolute_path.eq_ignore_ascii_case(subject_part)
                });
                let aspect_published = aspects
                    .iter()
                    .any(|a| a.is_published && a.name.eq_ignore_ascii_case(aspect_part));
                subject_published && aspect_published
            })
            .cloned()
            .collect();
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Status;
    use chrono::Utc;

    fn sample(name: &str) -> Sample {
        let now = Utc::now();
        Sample {
            name: name.to_string(),
            value: "1".to_string(),
            status: Status::Ok,
            previous_status: Status::Invalid,
            status_changed_at: now,
            updated_at: now,
            related_links: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_find_samples_filters_unpublished_endpoints() {
        let store = InMemoryRelationalStore::new();
        store.add_subject(Subject::new("NA.Canada"));
        store.add_subject(Subject::new("NA.Mexico").unpublished());
        store.add_aspect(Aspect::new("temperature"));

        store.add_sample(sample("NA.Canada|temperature"));
        store.add_sample(sample("NA.Mexico|temperature"));
        store.add_sample(sample("NA.Canada|humidity"));

        let samples = store.find_samples().await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name, "NA.Canada|temperature");
    }

    #[tokio::test]
    async fn test_find_samples_matches_case_insensitively() {
        let store = InMemoryRelationalStore::new();
        store.add_subject(Subject::new("NA.Canada"));
        store.add_aspect(Aspect::new("Temperature"));
        store.add_sample(sample("na.canada|temperature"));

        assert_eq!(store.find_samples().await.unwrap().len(), 1);
    }
}

//! Domain entities mirrored between the relational store and the cache.
//!
//! Subjects form a dot-separated hierarchy, aspects define metric thresholds,
//! and samples record one observed value per subject+aspect pair. Every entity
//! can round-trip through the flat string-to-string hash representation the
//! cache backend stores.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Reserved separator between the subject and aspect parts of a sample name.
/// Must not appear inside subject paths or aspect names.
pub const SAMPLE_SEPARATOR: char = '|';

/// Conceptual lower bound standing in for a null range bound.
pub const RANGE_FLOOR: f64 = -2_147_483_648.0;

/// Conceptual upper bound standing in for a null range bound.
pub const RANGE_CEILING: f64 = 2_147_483_648.0;

// =============================================================================
// Entity Kinds
// =============================================================================

/// The three entity kinds the cache knows about.
///
/// This is a closed set: key naming, index membership, and cascade behavior
/// all dispatch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Subject,
    Aspect,
    Sample,
}

impl EntityKind {
    /// Key segment used inside canonical cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Subject => "subject",
            EntityKind::Aspect => "aspect",
            EntityKind::Sample => "sample",
        }
    }

    /// Segment naming this kind's master index set.
    pub fn index_segment(&self) -> &'static str {
        match self {
            EntityKind::Subject => "subjects",
            EntityKind::Aspect => "aspects",
            EntityKind::Sample => "samples",
        }
    }

    /// All kinds, in the order bulk operations walk them.
    pub fn all() -> [EntityKind; 3] {
        [EntityKind::Subject, EntityKind::Aspect, EntityKind::Sample]
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Status
// =============================================================================

/// Health status of a sample, derived from its aspect's threshold ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Critical,
    Warning,
    Info,
    Ok,
    Timeout,
    Invalid,
}

impl Status {
    /// Canonical string form stored in sample hashes. Also the exact sentinel
    /// value (`"Timeout"`) a sweep writes into `value` on timeout.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Critical => "Critical",
            Status::Warning => "Warning",
            Status::Info => "Info",
            Status::Ok => "OK",
            Status::Timeout => "Timeout",
            Status::Invalid => "Invalid",
        }
    }

    /// Parse the canonical string form back into a status.
    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "Critical" => Some(Status::Critical),
            "Warning" => Some(Status::Warning),
            "Info" => Some(Status::Info),
            "OK" => Some(Status::Ok),
            "Timeout" => Some(Status::Timeout),
            "Invalid" => Some(Status::Invalid),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Threshold Ranges
// =============================================================================

/// One severity's threshold range: `[lower, upper]`, either bound nullable.
///
/// A `None` bound means unbounded in that direction. A range is well-formed
/// only when at least one bound is present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRange(pub Option<f64>, pub Option<f64>);

impl ThresholdRange {
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self(lower, upper)
    }

    /// Both bounds null makes the range inert rather than all-containing.
    pub fn is_well_formed(&self) -> bool {
        self.0.is_some() || self.1.is_some()
    }

    /// Effective lower bound with the null substitution applied.
    pub fn lower(&self) -> f64 {
        self.0.unwrap_or(RANGE_FLOOR)
    }

    /// Effective upper bound with the null substitution applied.
    pub fn upper(&self) -> f64 {
        self.1.unwrap_or(RANGE_CEILING)
    }

    /// Inclusive containment check; malformed ranges contain nothing.
    pub fn contains(&self, value: f64) -> bool {
        self.is_well_formed() && value >= self.lower() && value <= self.upper()
    }
}

// =============================================================================
// Users
// =============================================================================

/// Reference to a user allowed to write samples for an aspect.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
}

impl UserRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

// =============================================================================
// Subject
// =============================================================================

/// A monitored entity, identified by a dot-separated absolute path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    pub absolute_path: String,
    pub tags: BTreeSet<String>,
    pub is_published: bool,
    /// Back-reference only; the parent subject is not owned.
    pub parent_absolute_path: Option<String>,
}

impl Subject {
    pub fn new(absolute_path: impl Into<String>) -> Self {
        let absolute_path = absolute_path.into();
        let parent_absolute_path = parent_of(&absolute_path);
        Self {
            id: Uuid::new_v4(),
            absolute_path,
            tags: BTreeSet::new(),
            is_published: true,
            parent_absolute_path,
        }
    }

    pub fn unpublished(mut self) -> Self {
        self.is_published = false;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Flatten into hash fields. Display case of the path is preserved here;
    /// only key lookup is case-normalized.
    pub fn to_hash(&self) -> Result<Vec<(String, String)>> {
        let mut fields = vec![
            ("id".to_string(), self.id.to_string()),
            ("absolute_path".to_string(), self.absolute_path.clone()),
            ("is_published".to_string(), self.is_published.to_string()),
            ("tags".to_string(), serde_json::to_string(&self.tags)?),
        ];
        if let Some(parent) = &self.parent_absolute_path {
            fields.push(("parent_absolute_path".to_string(), parent.clone()));
        }
        Ok(fields)
    }

    pub fn from_hash(key: &str, hash: &HashMap<String, String>) -> Result<Self> {
        let id = parse_uuid_field(key, hash, "id")?;
        let absolute_path = require_field(key, hash, "absolute_path")?;
        let is_published = parse_bool_field(key, hash, "is_published")?;
        let tags = parse_json_field(key, hash, "tags")?;
        Ok(Self {
            id,
            parent_absolute_path: hash.get("parent_absolute_path").cloned(),
            absolute_path,
            tags,
            is_published,
        })
    }
}

/// Parent path of a dot-separated absolute path, `None` at the root.
pub fn parent_of(absolute_path: &str) -> Option<String> {
    absolute_path
        .rsplit_once('.')
        .map(|(parent, _)| parent.to_string())
}

// =============================================================================
// Aspect
// =============================================================================

/// A metric definition: severity threshold ranges, a timeout spec, tags, and
/// the set of users allowed to write its samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aspect {
    pub id: Uuid,
    /// Unique, case-insensitive.
    pub name: String,
    pub is_published: bool,
    /// Duration spec such as `"30s"`, `"10m"`, `"1d"`.
    pub timeout: String,
    pub critical_range: Option<ThresholdRange>,
    pub warning_range: Option<ThresholdRange>,
    pub info_range: Option<ThresholdRange>,
    pub ok_range: Option<ThresholdRange>,
    pub tags: BTreeSet<String>,
    pub writers: BTreeSet<UserRef>,
}

impl Aspect {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_published: true,
            timeout: "30s".to_string(),
            critical_range: None,
            warning_range: None,
            info_range: None,
            ok_range: None,
            tags: BTreeSet::new(),
            writers: BTreeSet::new(),
        }
    }

    pub fn unpublished(mut self) -> Self {
        self.is_published = false;
        self
    }

    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_writers<I>(mut self, writers: I) -> Self
    where
        I: IntoIterator<Item = UserRef>,
    {
        self.writers = writers.into_iter().collect();
        self
    }

    /// Ranges in severity precedence order (most severe first). This order is
    /// load-bearing: overlapping ranges resolve by precedence, not storage
    /// order.
    pub fn ranges_by_precedence(&self) -> [(Status, Option<&ThresholdRange>); 4] {
        [
            (Status::Critical, self.critical_range.as_ref()),
            (Status::Warning, self.warning_range.as_ref()),
            (Status::Info, self.info_range.as_ref()),
            (Status::Ok, self.ok_range.as_ref()),
        ]
    }

    /// Ranges in the insertion order the auxiliary range list preserves.
    pub fn ranges_by_insertion(&self) -> [(Status, Option<&ThresholdRange>); 4] {
        [
            (Status::Ok, self.ok_range.as_ref()),
            (Status::Info, self.info_range.as_ref()),
            (Status::Warning, self.warning_range.as_ref()),
            (Status::Critical, self.critical_range.as_ref()),
        ]
    }

    /// Names of users allowed to write this aspect's samples.
    pub fn writer_names(&self) -> BTreeSet<String> {
        self.writers.iter().map(|w| w.name.clone()).collect()
    }

    pub fn to_hash(&self) -> Result<Vec<(String, String)>> {
        let mut fields = vec![
            ("id".to_string(), self.id.to_string()),
            ("name".to_string(), self.name.clone()),
            ("is_published".to_string(), self.is_published.to_string()),
            ("timeout".to_string(), self.timeout.clone()),
            ("tags".to_string(), serde_json::to_string(&self.tags)?),
            ("writers".to_string(), serde_json::to_string(&self.writers)?),
        ];
        for (field, range) in [
            ("critical_range", &self.critical_range),
            ("warning_range", &self.warning_range),
            ("info_range", &self.info_range),
            ("ok_range", &self.ok_range),
        ] {
            if let Some(range) = range {
                fields.push((field.to_string(), serde_json::to_string(range)?));
            }
        }
        Ok(fields)
    }

    pub fn from_hash(key: &str, hash: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            id: parse_uuid_field(key, hash, "id")?,
            name: require_field(key, hash, "name")?,
            is_published: parse_bool_field(key, hash, "is_published")?,
            timeout: require_field(key, hash, "timeout")?,
            critical_range: parse_optional_json_field(key, hash, "critical_range")?,
            warning_range: parse_optional_json_field(key, hash, "warning_range")?,
            info_range: parse_optional_json_field(key, hash, "info_range")?,
            ok_range: parse_optional_json_field(key, hash, "ok_range")?,
            tags: parse_json_field(key, hash, "tags")?,
            writers: parse_json_field(key, hash, "writers")?,
        })
    }
}

// =============================================================================
// Sample
// =============================================================================

/// Link attached to a sample, pointing at a runbook or dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedLink {
    pub name: String,
    pub url: String,
}

/// An observed value for one subject+aspect pair.
///
/// Identity is `subjectPath|aspectName`, case-insensitive. The status is
/// computed when the sample is written and cached in the hash, never
/// recomputed on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    pub value: String,
    pub status: Status,
    pub previous_status: Status,
    pub status_changed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub related_links: Vec<RelatedLink>,
}

impl Sample {
    /// Split a sample name into `(subject_part, aspect_part)`.
    pub fn split_name(name: &str) -> Result<(&str, &str)> {
        let mut parts = name.split(SAMPLE_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(subject), Some(aspect), None) if !subject.is_empty() && !aspect.is_empty() => {
                Ok((subject, aspect))
            }
            _ => Err(Error::MalformedKey {
                name: name.to_string(),
            }),
        }
    }

    pub fn to_hash(&self) -> Result<Vec<(String, String)>> {
        Ok(vec![
            ("name".to_string(), self.name.clone()),
            ("value".to_string(), self.value.clone()),
            ("status".to_string(), self.status.as_str().to_string()),
            (
                "previous_status".to_string(),
                self.previous_status.as_str().to_string(),
            ),
            (
                "status_changed_at".to_string(),
                self.status_changed_at.to_rfc3339(),
            ),
            ("updated_at".to_string(), self.updated_at.to_rfc3339()),
            (
                "related_links".to_string(),
                serde_json::to_string(&self.related_links)?,
            ),
        ])
    }

    pub fn from_hash(key: &str, hash: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            name: require_field(key, hash, "name")?,
            value: require_field(key, hash, "value")?,
            status: parse_status_field(key, hash, "status")?,
            previous_status: parse_status_field(key, hash, "previous_status")?,
            status_changed_at: parse_time_field(key, hash, "status_changed_at")?,
            updated_at: parse_time_field(key, hash, "updated_at")?,
            related_links: parse_json_field(key, hash, "related_links")?,
        })
    }
}

/// Incoming sample write from a client, before status derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleInput {
    /// `subjectPath|aspectName`
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub related_links: Vec<RelatedLink>,
}

impl SampleInput {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            related_links: Vec::new(),
        }
    }
}

// =============================================================================
// Hash field helpers
// =============================================================================

fn require_field(key: &str, hash: &HashMap<String, String>, field: &str) -> Result<String> {
    hash.get(field).cloned().ok_or_else(|| Error::CorruptHash {
        key: key.to_string(),
        reason: format!("missing field {field}"),
    })
}

fn parse_bool_field(key: &str, hash: &HashMap<String, String>, field: &str) -> Result<bool> {
    match require_field(key, hash, field)?.as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(Error::CorruptHash {
            key: key.to_string(),
            reason: format!("field {field} is not a boolean: {other}"),
        }),
    }
}

fn parse_uuid_field(key: &str, hash: &HashMap<String, String>, field: &str) -> Result<Uuid> {
    let raw = require_field(key, hash, field)?;
    raw.parse().map_err(|_| Error::CorruptHash {
        key: key.to_string(),
        reason: format!("field {field} is not a uuid: {raw}"),
    })
}

fn parse_status_field(key: &str, hash: &HashMap<String, String>, field: &str) -> Result<Status> {
    let raw = require_field(key, hash, field)?;
    Status::parse(&raw).ok_or_else(|| Error::CorruptHash {
        key: key.to_string(),
        reason: format!("field {field} is not a status: {raw}"),
    })
}

fn parse_time_field(
    key: &str,
    hash: &HashMap<String, String>,
    field: &str,
) -> Result<DateTime<Utc>> {
    let raw = require_field(key, hash, field)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::CorruptHash {
            key: key.to_string(),
            reason: format!("field {field} is not a timestamp: {e}"),
        })
}

fn parse_json_field<T: serde::de::DeserializeOwned + Default>(
    key: &str,
    hash: &HashMap<String, String>,
    field: &str,
) -> Result<T> {
    match hash.get(field) {
        None => Ok(T::default()),
        Some(raw) => serde_json::from_str(raw).map_err(|e| Error::CorruptHash {
            key: key.to_string(),
            reason: format!("field {field} is not valid json: {e}"),
        }),
    }
}

fn parse_optional_json_field<T: serde::de::DeserializeOwned>(
    key: &str,
    hash: &HashMap<String, String>,
    field: &str,
) -> Result<Option<T>> {
    match hash.get(field) {
        None => Ok(None),
        Some(raw) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| Error::CorruptHash {
                key: key.to_string(),
                reason: format!("field {field} is not valid json: {e}"),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_containment() {
        let range = ThresholdRange::new(Some(0.0), Some(1.0));
        assert!(range.contains(0.0));
        assert!(range.contains(1.0));
        assert!(!range.contains(1.5));
        assert!(!range.contains(-0.5));
    }

    #[test]
    fn test_unbounded_ranges() {
        let below_one = ThresholdRange::new(None, Some(1.0));
        assert!(below_one.contains(-1_000_000.0));
        assert!(!below_one.contains(2.0));

        let above_zero = ThresholdRange::new(Some(0.0), None);
        assert!(above_zero.contains(1_000_000.0));
        assert!(!above_zero.contains(-1.0));
    }

    #[test]
    fn test_malformed_range_contains_nothing() {
        let range = ThresholdRange::new(None, None);
        assert!(!range.contains(0.0));
    }

    #[test]
    fn test_sample_name_split() {
        let (subject, aspect) = Sample::split_name("NA.Canada|temperature").unwrap();
        assert_eq!(subject, "NA.Canada");
        assert_eq!(aspect, "temperature");

        assert!(Sample::split_name("no-separator").is_err());
        assert!(Sample::split_name("a|b|c").is_err());
        assert!(Sample::split_name("|aspect").is_err());
    }

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of("NA.Canada.Quebec"), Some("NA.Canada".to_string()));
        assert_eq!(parent_of("NA.Canada"), Some("NA".to_string()));
        assert_eq!(parent_of("NA"), None);
    }

    #[test]
    fn test_subject_hash_round_trip() {
        let subject = Subject::new("NA.Canada").with_tags(["prod", "edge"]);
        let hash: HashMap<String, String> = subject.to_hash().unwrap().into_iter().collect();
        let decoded = Subject::from_hash("vigil:subject:na.canada", &hash).unwrap();
        assert_eq!(decoded, subject);
    }

    #[test]
    fn test_aspect_hash_round_trip() {
        let mut aspect = Aspect::new("temperature")
            .with_timeout("5m")
            .with_tags(["weather"])
            .with_writers([UserRef::new("alice@example.com")]);
        aspect.critical_range = Some(ThresholdRange::new(Some(0.0), Some(1.0)));
        aspect.ok_range = Some(ThresholdRange::new(Some(2.0), None));

        let hash: HashMap<String, String> = aspect.to_hash().unwrap().into_iter().collect();
        let decoded = Aspect::from_hash("vigil:aspect:temperature", &hash).unwrap();
        assert_eq!(decoded, aspect);
        assert_eq!(decoded.warning_range, None);
    }

    #[test]
    fn test_sample_hash_round_trip() {
        let now = Utc::now();
        let sample = Sample {
            name: "NA.Canada|temperature".to_string(),
            value: "0".to_string(),
            status: Status::Critical,
            previous_status: Status::Invalid,
            status_changed_at: now,
            updated_at: now,
            related_links: vec![RelatedLink {
                name: "runbook".to_string(),
                url: "https://example.com/runbook".to_string(),
            }],
        };
        let hash: HashMap<String, String> = sample.to_hash().unwrap().into_iter().collect();
        let decoded = Sample::from_hash("vigil:sample:na.canada|temperature", &hash).unwrap();
        assert_eq!(decoded.status, Status::Critical);
        assert_eq!(decoded.related_links.len(), 1);
        // RFC3339 round-trip keeps sub-second precision
        assert_eq!(decoded.status_changed_at, sample.status_changed_at);
    }

    #[test]
    fn test_corrupt_hash_reports_field() {
        let hash = HashMap::new();
        let err = Subject::from_hash("vigil:subject:x", &hash).unwrap_err();
        assert!(err.to_string().contains("missing field id"));
    }

    #[test]
    fn test_status_parse_round_trip() {
        for status in [
            Status::Critical,
            Status::Warning,
            Status::Info,
            Status::Ok,
            Status::Timeout,
            Status::Invalid,
        ] {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
        assert_eq!(Status::parse("ok"), None);
    }
}

//! Key Codec
//!
//! Canonical cache key construction and parsing. Keys are
//! `vigil:<kind>:<name>` with the name lower-cased, so lookups are
//! case-insensitive while display case survives inside the stored hash.
//! Sample names keep their internal `subject|aspect` structure unmodified.

use crate::domain::model::{EntityKind, SAMPLE_SEPARATOR};
use crate::error::{Error, Result};

/// Prefix shared by every key this engine owns.
pub const KEY_PREFIX: &str = "vigil";

/// Separator between key segments.
pub const KEY_SEPARATOR: char = ':';

/// Scalar key persisting the last-observed feature-flag value as the literal
/// strings `"true"` / `"false"`.
pub const PREVIOUS_FLAG_KEY: &str = "vigil:flag:previous";

const SUBJECT_ASPECT_MAP_SEGMENT: &str = "subaspmap";
const ASPECT_SUBJECT_MAP_SEGMENT: &str = "aspsubmap";

/// Build the canonical cache key for an entity. Idempotent and total: feeding
/// an already-lowercased name back in yields the same key.
pub fn to_key(kind: EntityKind, name: &str) -> String {
    format!(
        "{KEY_PREFIX}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
        kind.as_str(),
        name.to_lowercase()
    )
}

/// Key of the master index set recording every live key of one kind.
pub fn index_key(kind: EntityKind) -> String {
    format!("{KEY_PREFIX}{KEY_SEPARATOR}{}", kind.index_segment())
}

/// Recover the (lower-cased) name portion of a canonical key.
pub fn name_of(kind: EntityKind, key: &str) -> Result<&str> {
    let prefix = format!(
        "{KEY_PREFIX}{KEY_SEPARATOR}{}{KEY_SEPARATOR}",
        kind.as_str()
    );
    key.strip_prefix(prefix.as_str())
        .ok_or_else(|| Error::MalformedKey {
            name: key.to_string(),
        })
}

/// Split a sample key into its `(subject_part, aspect_part)` name parts.
pub fn parse_sample_key(key: &str) -> Result<(&str, &str)> {
    let name = name_of(EntityKind::Sample, key)?;
    let mut parts = name.split(SAMPLE_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(subject), Some(aspect), None) if !subject.is_empty() && !aspect.is_empty() => {
            Ok((subject, aspect))
        }
        _ => Err(Error::MalformedKey {
            name: key.to_string(),
        }),
    }
}

/// Key of the derived set listing every aspect with a sample under a subject.
pub fn subject_aspect_map_key(subject_part: &str) -> String {
    format!(
        "{KEY_PREFIX}{KEY_SEPARATOR}{SUBJECT_ASPECT_MAP_SEGMENT}{KEY_SEPARATOR}{}",
        subject_part.to_lowercase()
    )
}

/// Key of the derived set listing every subject with a sample for an aspect.
pub fn aspect_subject_map_key(aspect_part: &str) -> String {
    format!(
        "{KEY_PREFIX}{KEY_SEPARATOR}{ASPECT_SUBJECT_MAP_SEGMENT}{KEY_SEPARATOR}{}",
        aspect_part.to_lowercase()
    )
}

// =============================================================================
// Auxiliary keys
// =============================================================================

/// Per-entity auxiliary keys hanging off a subject or aspect hash key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxField {
    Tags,
    Writers,
    Ranges,
    Exists,
}

impl AuxField {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuxField::Tags => "tags",
            AuxField::Writers => "writers",
            AuxField::Ranges => "ranges",
            AuxField::Exists => "exists",
        }
    }

    /// Every aux suffix, the full set eradication sweeps for each entity.
    pub fn all() -> [AuxField; 4] {
        [
            AuxField::Tags,
            AuxField::Writers,
            AuxField::Ranges,
            AuxField::Exists,
        ]
    }
}

/// Auxiliary key for one field of a subject or aspect.
pub fn aux_key(kind: EntityKind, name: &str, field: AuxField) -> String {
    format!(
        "{}{KEY_SEPARATOR}{}",
        to_key(kind, name),
        field.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_key_lowercases_name() {
        assert_eq!(
            to_key(EntityKind::Subject, "NA.Canada"),
            "vigil:subject:na.canada"
        );
        assert_eq!(
            to_key(EntityKind::Sample, "NA.Canada|Temperature"),
            "vigil:sample:na.canada|temperature"
        );
    }

    #[test]
    fn test_to_key_is_idempotent_on_names() {
        let once = to_key(EntityKind::Aspect, "Temperature");
        let name = name_of(EntityKind::Aspect, &once).unwrap();
        assert_eq!(to_key(EntityKind::Aspect, name), once);
    }

    #[test]
    fn test_index_keys() {
        assert_eq!(index_key(EntityKind::Subject), "vigil:subjects");
        assert_eq!(index_key(EntityKind::Aspect), "vigil:aspects");
        assert_eq!(index_key(EntityKind::Sample), "vigil:samples");
    }

    #[test]
    fn test_parse_sample_key() {
        let key = to_key(EntityKind::Sample, "NA.Canada|temperature");
        let (subject, aspect) = parse_sample_key(&key).unwrap();
        assert_eq!(subject, "na.canada");
        assert_eq!(aspect, "temperature");
    }

    #[test]
    fn test_parse_sample_key_rejects_bad_shapes() {
        assert!(parse_sample_key("vigil:sample:no-separator").is_err());
        assert!(parse_sample_key("vigil:sample:a|b|c").is_err());
        assert!(parse_sample_key("vigil:subject:na.canada").is_err());
    }

    #[test]
    fn test_resource_map_keys() {
        assert_eq!(
            subject_aspect_map_key("NA.Canada"),
            "vigil:subaspmap:na.canada"
        );
        assert_eq!(
            aspect_subject_map_key("Temperature"),
            "vigil:aspsubmap:temperature"
        );
    }

    #[test]
    fn test_aux_keys() {
        assert_eq!(
            aux_key(EntityKind::Aspect, "Temperature", AuxField::Tags),
            "vigil:aspect:temperature:tags"
        );
        assert_eq!(
            aux_key(EntityKind::Subject, "NA", AuxField::Exists),
            "vigil:subject:na:exists"
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// to_key never panics and is idempotent for any printable name.
            #[test]
            fn to_key_total_and_idempotent(name in "[a-zA-Z0-9._-]{1,40}") {
                let key = to_key(EntityKind::Subject, &name);
                let recovered = name_of(EntityKind::Subject, &key).unwrap();
                prop_assert_eq!(to_key(EntityKind::Subject, recovered), key);
            }

            /// Sample keys built from two clean parts always parse back.
            #[test]
            fn sample_key_round_trip(
                subject in "[a-zA-Z0-9.]{1,20}",
                aspect in "[a-zA-Z0-9_-]{1,20}",
            ) {
                let key = to_key(EntityKind::Sample, &format!("{subject}|{aspect}"));
                let (s, a) = parse_sample_key(&key).unwrap();
                prop_assert_eq!(s, subject.to_lowercase());
                prop_assert_eq!(a, aspect.to_lowercase());
            }
        }
    }
}

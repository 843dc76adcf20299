//! Shared identifier and descriptor types for the NogDB graph database.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a class, assigned on creation and never reused.
///
/// Persisted ids are positive; [`SYNTHETIC_CLASS_ID`] marks result rows
/// that are not backed by storage (projections, aggregates).
pub type ClassId = i32;

/// Identifier of a property, unique within its owning class.
pub type PropertyId = u16;

/// Position of a record within its class table, monotonically increasing.
pub type PositionalId = u64;

/// Identifier of a secondary index.
pub type IndexId = u32;

/// Class id carried by synthetic result rows (e.g. `SELECT count(*)`).
pub const SYNTHETIC_CLASS_ID: ClassId = -2;

/// Persistent identifier of a record: the owning class plus the record's
/// position within that class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub class_id: ClassId,
    pub position: PositionalId,
}

impl RecordId {
    pub const fn new(class_id: ClassId, position: PositionalId) -> Self {
        Self { class_id, position }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class_id, self.position)
    }
}

impl FromStr for RecordId {
    type Err = ParseRecordIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('#').unwrap_or(s);
        let (class, position) = s.split_once(':').ok_or(ParseRecordIdError)?;
        Ok(Self {
            class_id: class.trim().parse().map_err(|_| ParseRecordIdError)?,
            position: position.trim().parse().map_err(|_| ParseRecordIdError)?,
        })
    }
}

/// Error returned when a record id literal is not of the form `[#]c:p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseRecordIdError;

impl fmt::Display for ParseRecordIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record id literal must be of the form [#]<class>:<position>")
    }
}

impl std::error::Error for ParseRecordIdError {}

/// A [`RecordId`] plus an informational traversal depth.
///
/// `depth` is set by the traversal engine (discovery depth of the vertex)
/// and is zero everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordDescriptor {
    pub rid: RecordId,
    pub depth: u32,
}

impl RecordDescriptor {
    pub const fn new(class_id: ClassId, position: PositionalId) -> Self {
        Self {
            rid: RecordId::new(class_id, position),
            depth: 0,
        }
    }

    pub const fn with_depth(rid: RecordId, depth: u32) -> Self {
        Self { rid, depth }
    }

    /// Whether this descriptor names a synthetic (non-persisted) row.
    pub const fn is_synthetic(&self) -> bool {
        self.rid.class_id == SYNTHETIC_CLASS_ID
    }
}

impl From<RecordId> for RecordDescriptor {
    fn from(rid: RecordId) -> Self {
        Self { rid, depth: 0 }
    }
}

impl fmt::Display for RecordDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.rid)
    }
}

/// Tag distinguishing vertex classes from edge classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassType {
    Vertex,
    Edge,
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassType::Vertex => write!(f, "VERTEX"),
            ClassType::Edge => write!(f, "EDGE"),
        }
    }
}

/// Declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    TinyInt,
    UnsignedTinyInt,
    SmallInt,
    UnsignedSmallInt,
    Integer,
    UnsignedInteger,
    BigInt,
    UnsignedBigInt,
    Real,
    Text,
    Blob,
}

impl PropertyType {
    /// Stable on-disk tag for the type.
    pub const fn tag(self) -> u8 {
        match self {
            PropertyType::TinyInt => 1,
            PropertyType::UnsignedTinyInt => 2,
            PropertyType::SmallInt => 3,
            PropertyType::UnsignedSmallInt => 4,
            PropertyType::Integer => 5,
            PropertyType::UnsignedInteger => 6,
            PropertyType::BigInt => 7,
            PropertyType::UnsignedBigInt => 8,
            PropertyType::Real => 9,
            PropertyType::Text => 10,
            PropertyType::Blob => 11,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => PropertyType::TinyInt,
            2 => PropertyType::UnsignedTinyInt,
            3 => PropertyType::SmallInt,
            4 => PropertyType::UnsignedSmallInt,
            5 => PropertyType::Integer,
            6 => PropertyType::UnsignedInteger,
            7 => PropertyType::BigInt,
            8 => PropertyType::UnsignedBigInt,
            9 => PropertyType::Real,
            10 => PropertyType::Text,
            11 => PropertyType::Blob,
            _ => return None,
        })
    }

    /// Whether values of this type are an integer family.
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            PropertyType::TinyInt
                | PropertyType::UnsignedTinyInt
                | PropertyType::SmallInt
                | PropertyType::UnsignedSmallInt
                | PropertyType::Integer
                | PropertyType::UnsignedInteger
                | PropertyType::BigInt
                | PropertyType::UnsignedBigInt
        )
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::TinyInt => "TINYINT",
            PropertyType::UnsignedTinyInt => "UNSIGNED_TINYINT",
            PropertyType::SmallInt => "SMALLINT",
            PropertyType::UnsignedSmallInt => "UNSIGNED_SMALLINT",
            PropertyType::Integer => "INTEGER",
            PropertyType::UnsignedInteger => "UNSIGNED_INTEGER",
            PropertyType::BigInt => "BIGINT",
            PropertyType::UnsignedBigInt => "UNSIGNED_BIGINT",
            PropertyType::Real => "REAL",
            PropertyType::Text => "TEXT",
            PropertyType::Blob => "BLOB",
        };
        write!(f, "{name}")
    }
}

/// Descriptor of a class as seen through the schema catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub id: ClassId,
    pub name: String,
    pub class_type: ClassType,
    pub parent: Option<ClassId>,
}

/// Descriptor of a property as seen through the schema catalog.
///
/// `inherited` is set when the property is resolved through an ancestor
/// class rather than declared on the class itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub id: PropertyId,
    pub name: String,
    pub property_type: PropertyType,
    pub inherited: bool,
}

/// Descriptor of a secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub id: IndexId,
    pub class_id: ClassId,
    pub property_id: PropertyId,
    pub unique: bool,
}

/// Aggregate counts describing a database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbInfo {
    pub num_class: u64,
    pub num_property: u64,
    pub num_index: u64,
    pub max_class_id: ClassId,
    pub max_index_id: IndexId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_round_trips_through_display() {
        let rid = RecordId::new(3, 42);
        assert_eq!(rid.to_string(), "3:42");
        assert_eq!("3:42".parse::<RecordId>().unwrap(), rid);
        assert_eq!("#3:42".parse::<RecordId>().unwrap(), rid);
    }

    #[test]
    fn record_id_rejects_malformed_literals() {
        assert!("".parse::<RecordId>().is_err());
        assert!("3".parse::<RecordId>().is_err());
        assert!("a:b".parse::<RecordId>().is_err());
    }

    #[test]
    fn property_type_tags_are_stable() {
        for ty in [
            PropertyType::TinyInt,
            PropertyType::UnsignedTinyInt,
            PropertyType::SmallInt,
            PropertyType::UnsignedSmallInt,
            PropertyType::Integer,
            PropertyType::UnsignedInteger,
            PropertyType::BigInt,
            PropertyType::UnsignedBigInt,
            PropertyType::Real,
            PropertyType::Text,
            PropertyType::Blob,
        ] {
            assert_eq!(PropertyType::from_tag(ty.tag()), Some(ty));
        }
        assert_eq!(PropertyType::from_tag(0), None);
    }

    #[test]
    fn synthetic_descriptor_is_flagged() {
        let d = RecordDescriptor::new(SYNTHETIC_CLASS_ID, 0);
        assert!(d.is_synthetic());
        assert!(!RecordDescriptor::new(1, 0).is_synthetic());
    }
}

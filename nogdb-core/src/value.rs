//! Typed property values and the in-memory record representation.

use std::cmp::Ordering;

use indexmap::IndexMap;
use nogdb_api::{PropertyId, PropertyType};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A typed property value.
///
/// Each variant corresponds to one [`PropertyType`]. Conversions between
/// integer families are lossless when widening and range-checked when
/// narrowing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    TinyInt(i8),
    UnsignedTinyInt(u8),
    SmallInt(i16),
    UnsignedSmallInt(u16),
    Integer(i32),
    UnsignedInteger(u32),
    BigInt(i64),
    UnsignedBigInt(u64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn property_type(&self) -> PropertyType {
        match self {
            Value::TinyInt(_) => PropertyType::TinyInt,
            Value::UnsignedTinyInt(_) => PropertyType::UnsignedTinyInt,
            Value::SmallInt(_) => PropertyType::SmallInt,
            Value::UnsignedSmallInt(_) => PropertyType::UnsignedSmallInt,
            Value::Integer(_) => PropertyType::Integer,
            Value::UnsignedInteger(_) => PropertyType::UnsignedInteger,
            Value::BigInt(_) => PropertyType::BigInt,
            Value::UnsignedBigInt(_) => PropertyType::UnsignedBigInt,
            Value::Real(_) => PropertyType::Real,
            Value::Text(_) => PropertyType::Text,
            Value::Blob(_) => PropertyType::Blob,
        }
    }

    pub fn is_integer(&self) -> bool {
        self.property_type().is_integer()
    }

    /// The value of any integer variant, widened losslessly.
    pub(crate) fn as_i128(&self) -> Option<i128> {
        Some(match self {
            Value::TinyInt(v) => *v as i128,
            Value::UnsignedTinyInt(v) => *v as i128,
            Value::SmallInt(v) => *v as i128,
            Value::UnsignedSmallInt(v) => *v as i128,
            Value::Integer(v) => *v as i128,
            Value::UnsignedInteger(v) => *v as i128,
            Value::BigInt(v) => *v as i128,
            Value::UnsignedBigInt(v) => *v as i128,
            _ => return None,
        })
    }

    fn integer_in_range(&self, min: i128, max: i128, target: PropertyType) -> Result<i128> {
        let wide = self
            .as_i128()
            .ok_or_else(|| mismatch(self.property_type(), target))?;
        if wide < min || wide > max {
            return Err(Error::DataTypeMismatch(format!(
                "value {wide} out of range for {target}"
            )));
        }
        Ok(wide)
    }

    pub fn to_tiny_int(&self) -> Result<i8> {
        Ok(self.integer_in_range(i8::MIN as i128, i8::MAX as i128, PropertyType::TinyInt)? as i8)
    }

    pub fn to_unsigned_tiny_int(&self) -> Result<u8> {
        Ok(self.integer_in_range(0, u8::MAX as i128, PropertyType::UnsignedTinyInt)? as u8)
    }

    pub fn to_small_int(&self) -> Result<i16> {
        Ok(self.integer_in_range(i16::MIN as i128, i16::MAX as i128, PropertyType::SmallInt)? as i16)
    }

    pub fn to_unsigned_small_int(&self) -> Result<u16> {
        Ok(self.integer_in_range(0, u16::MAX as i128, PropertyType::UnsignedSmallInt)? as u16)
    }

    pub fn to_int(&self) -> Result<i32> {
        Ok(self.integer_in_range(i32::MIN as i128, i32::MAX as i128, PropertyType::Integer)? as i32)
    }

    pub fn to_unsigned_int(&self) -> Result<u32> {
        Ok(self.integer_in_range(0, u32::MAX as i128, PropertyType::UnsignedInteger)? as u32)
    }

    pub fn to_big_int(&self) -> Result<i64> {
        Ok(self.integer_in_range(i64::MIN as i128, i64::MAX as i128, PropertyType::BigInt)? as i64)
    }

    pub fn to_unsigned_big_int(&self) -> Result<u64> {
        Ok(self.integer_in_range(0, u64::MAX as i128, PropertyType::UnsignedBigInt)? as u64)
    }

    pub fn to_real(&self) -> Result<f64> {
        match self {
            Value::Real(v) => Ok(*v),
            other => match other.as_i128() {
                Some(wide) => Ok(wide as f64),
                None => Err(mismatch(other.property_type(), PropertyType::Real)),
            },
        }
    }

    pub fn to_text(&self) -> Result<&str> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(mismatch(other.property_type(), PropertyType::Text)),
        }
    }

    /// Raw bytes of a BLOB value.
    pub fn as_blob(&self) -> Result<&[u8]> {
        match self {
            Value::Blob(b) => Ok(b),
            other => Err(mismatch(other.property_type(), PropertyType::Blob)),
        }
    }

    /// Re-types the value to the declared property type.
    ///
    /// Integer widenings are lossless; narrowing fails when out of range.
    /// Integer-to-real is accepted; everything else must already match.
    pub fn coerce_to(&self, target: PropertyType) -> Result<Value> {
        if self.property_type() == target {
            return Ok(self.clone());
        }
        Ok(match target {
            PropertyType::TinyInt => Value::TinyInt(self.to_tiny_int()?),
            PropertyType::UnsignedTinyInt => Value::UnsignedTinyInt(self.to_unsigned_tiny_int()?),
            PropertyType::SmallInt => Value::SmallInt(self.to_small_int()?),
            PropertyType::UnsignedSmallInt => {
                Value::UnsignedSmallInt(self.to_unsigned_small_int()?)
            }
            PropertyType::Integer => Value::Integer(self.to_int()?),
            PropertyType::UnsignedInteger => Value::UnsignedInteger(self.to_unsigned_int()?),
            PropertyType::BigInt => Value::BigInt(self.to_big_int()?),
            PropertyType::UnsignedBigInt => Value::UnsignedBigInt(self.to_unsigned_big_int()?),
            PropertyType::Real => Value::Real(self.to_real()?),
            PropertyType::Text => {
                return Err(mismatch(self.property_type(), target));
            }
            PropertyType::Blob => {
                return Err(mismatch(self.property_type(), target));
            }
        })
    }

    /// Typed comparison used by the condition evaluator.
    ///
    /// Integers of different families compare through a common widening;
    /// REAL against an integer compares numerically; TEXT and BLOB compare
    /// byte-lexicographically against their own kind. Incomparable pairs
    /// (e.g. TEXT against a number) return `None`, never an error.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Value::Blob(a), Value::Blob(b)) => Some(a.cmp(b)),
            (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
            (Value::Real(a), b) if b.is_integer() => a.partial_cmp(&(b.as_i128()? as f64)),
            (a, Value::Real(b)) if a.is_integer() => (a.as_i128()? as f64).partial_cmp(b),
            (a, b) if a.is_integer() && b.is_integer() => Some(a.as_i128()?.cmp(&b.as_i128()?)),
            _ => None,
        }
    }
}

fn mismatch(found: PropertyType, requested: PropertyType) -> Error {
    Error::DataTypeMismatch(format!("cannot read {found} value as {requested}"))
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::TinyInt(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::UnsignedTinyInt(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::UnsignedSmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UnsignedInteger(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UnsignedBigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

/// An insertion-ordered property map.
///
/// Records fetched from the store additionally carry the read-only
/// synthetic columns (`@recordId`, `@className`, `@version`, `@depth`);
/// names starting with `@` are never written back to disk. Encoded pairs
/// whose property id is unknown to the current schema are preserved
/// verbatim in a side table and survive a fetch-then-update round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    props: IndexMap<String, Value>,
    unknown: Vec<(PropertyId, Vec<u8>)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property, replacing any previous value under the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    /// Removes a property; absent names are a no-op.
    pub fn unset(&mut self, name: &str) -> &mut Self {
        self.props.shift_remove(name);
        self
    }

    /// Persistable properties, in insertion order, synthetic columns skipped.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.props
            .iter()
            .filter(|(name, _)| !name.starts_with('@'))
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Number of persistable properties.
    pub fn len(&self) -> usize {
        self.properties().count()
    }

    pub fn is_empty(&self) -> bool {
        self.properties().next().is_none()
    }

    pub(crate) fn set_synthetic(&mut self, name: &str, value: Value) {
        self.props.insert(name.to_owned(), value);
    }

    pub(crate) fn unknown_pairs(&self) -> &[(PropertyId, Vec<u8>)] {
        &self.unknown
    }

    pub(crate) fn push_unknown(&mut self, id: PropertyId, bytes: Vec<u8>) {
        self.unknown.push((id, bytes));
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widening_is_lossless() {
        let v = Value::TinyInt(-7);
        assert_eq!(v.to_big_int().unwrap(), -7);
        assert_eq!(v.to_int().unwrap(), -7);
        assert_eq!(Value::UnsignedInteger(70_000).to_big_int().unwrap(), 70_000);
    }

    #[test]
    fn narrowing_out_of_range_fails() {
        assert!(Value::Integer(300).to_tiny_int().is_err());
        assert!(Value::BigInt(-1).to_unsigned_big_int().is_err());
        assert!(Value::Integer(-1).to_unsigned_tiny_int().is_err());
        assert_eq!(Value::Integer(100).to_tiny_int().unwrap(), 100);
    }

    #[test]
    fn cross_family_compare_widens() {
        use std::cmp::Ordering::*;
        assert_eq!(
            Value::UnsignedBigInt(u64::MAX).compare(&Value::BigInt(-1)),
            Some(Greater)
        );
        assert_eq!(Value::TinyInt(2).compare(&Value::UnsignedInteger(2)), Some(Equal));
        assert_eq!(Value::Real(1.5).compare(&Value::Integer(2)), Some(Less));
    }

    #[test]
    fn text_against_number_is_incomparable() {
        assert_eq!(Value::Text("100".into()).compare(&Value::Integer(100)), None);
        assert_eq!(Value::Integer(100).compare(&Value::Text("100".into())), None);
    }

    #[test]
    fn coerce_checks_range() {
        assert_eq!(
            Value::BigInt(365).coerce_to(PropertyType::UnsignedInteger).unwrap(),
            Value::UnsignedInteger(365)
        );
        assert!(Value::BigInt(-1).coerce_to(PropertyType::UnsignedInteger).is_err());
        assert!(Value::Text("x".into()).coerce_to(PropertyType::Integer).is_err());
        assert_eq!(
            Value::Integer(3).coerce_to(PropertyType::Real).unwrap(),
            Value::Real(3.0)
        );
    }

    #[test]
    fn record_skips_synthetic_columns() {
        let mut r = Record::new();
        r.set("title", "A");
        r.set_synthetic("@version", Value::UnsignedBigInt(1));
        assert_eq!(r.len(), 1);
        assert!(r.get("@version").is_some());
        assert_eq!(r.properties().count(), 1);
    }
}

//! Binary codecs: the record property blob, schema catalog rows, and the
//! adjacency / endpoint blobs of the graph relation tables.
//!
//! A record blob is the concatenation, per present property, of
//! `(property id : uvarint) (length : uvarint) (bytes)`. Fixed-width
//! numeric values occupy their natural little-endian width; TEXT and BLOB
//! are raw bytes. Pairs whose property id is unknown to the current
//! schema are preserved verbatim.

use nogdb_api::{ClassId, ClassType, PositionalId, PropertyId, PropertyType, RecordId};

use crate::error::{Error, Result};
use crate::value::{Record, Value};

pub(crate) fn write_uvarint(buf: &mut Vec<u8>, mut v: u64) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

pub(crate) fn read_uvarint(bytes: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *bytes
            .get(*pos)
            .ok_or(Error::Corrupted("varint past end of buffer"))?;
        *pos += 1;
        if shift >= 64 {
            return Err(Error::Corrupted("varint overflows u64"));
        }
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Serialized width and bytes of a single value.
pub(crate) fn value_bytes(value: &Value) -> Vec<u8> {
    match value {
        Value::TinyInt(v) => v.to_le_bytes().to_vec(),
        Value::UnsignedTinyInt(v) => v.to_le_bytes().to_vec(),
        Value::SmallInt(v) => v.to_le_bytes().to_vec(),
        Value::UnsignedSmallInt(v) => v.to_le_bytes().to_vec(),
        Value::Integer(v) => v.to_le_bytes().to_vec(),
        Value::UnsignedInteger(v) => v.to_le_bytes().to_vec(),
        Value::BigInt(v) => v.to_le_bytes().to_vec(),
        Value::UnsignedBigInt(v) => v.to_le_bytes().to_vec(),
        Value::Real(v) => v.to_le_bytes().to_vec(),
        Value::Text(s) => s.as_bytes().to_vec(),
        Value::Blob(b) => b.clone(),
    }
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| Error::Corrupted("numeric value has wrong width"))
}

pub(crate) fn value_from_bytes(ty: PropertyType, bytes: &[u8]) -> Result<Value> {
    Ok(match ty {
        PropertyType::TinyInt => Value::TinyInt(i8::from_le_bytes(fixed(bytes)?)),
        PropertyType::UnsignedTinyInt => Value::UnsignedTinyInt(u8::from_le_bytes(fixed(bytes)?)),
        PropertyType::SmallInt => Value::SmallInt(i16::from_le_bytes(fixed(bytes)?)),
        PropertyType::UnsignedSmallInt => {
            Value::UnsignedSmallInt(u16::from_le_bytes(fixed(bytes)?))
        }
        PropertyType::Integer => Value::Integer(i32::from_le_bytes(fixed(bytes)?)),
        PropertyType::UnsignedInteger => Value::UnsignedInteger(u32::from_le_bytes(fixed(bytes)?)),
        PropertyType::BigInt => Value::BigInt(i64::from_le_bytes(fixed(bytes)?)),
        PropertyType::UnsignedBigInt => Value::UnsignedBigInt(u64::from_le_bytes(fixed(bytes)?)),
        PropertyType::Real => Value::Real(f64::from_le_bytes(fixed(bytes)?)),
        PropertyType::Text => Value::Text(
            String::from_utf8(bytes.to_vec())
                .map_err(|_| Error::Corrupted("text value is not valid UTF-8"))?,
        ),
        PropertyType::Blob => Value::Blob(bytes.to_vec()),
    })
}

/// Encodes known pairs in ascending property id, then the preserved
/// unknown pairs.
pub(crate) fn encode_record(
    known: &mut Vec<(PropertyId, Vec<u8>)>,
    unknown: &[(PropertyId, Vec<u8>)],
) -> Vec<u8> {
    known.sort_by_key(|(id, _)| *id);
    let mut out = Vec::new();
    for (id, bytes) in known.iter().map(|(id, b)| (*id, b.as_slice())).chain(
        unknown.iter().map(|(id, b)| (*id, b.as_slice())),
    ) {
        write_uvarint(&mut out, id as u64);
        write_uvarint(&mut out, bytes.len() as u64);
        out.extend_from_slice(bytes);
    }
    out
}

/// Decodes a record blob against the owning class's resolved properties.
///
/// `lookup` maps a property id to its name and declared type; pairs it
/// does not know are kept verbatim.
pub(crate) fn decode_record(
    bytes: &[u8],
    mut lookup: impl FnMut(PropertyId) -> Option<(String, PropertyType)>,
) -> Result<Record> {
    let mut record = Record::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let id = read_uvarint(bytes, &mut pos)?;
        let id = PropertyId::try_from(id).map_err(|_| Error::Corrupted("property id overflow"))?;
        let len = read_uvarint(bytes, &mut pos)? as usize;
        let end = pos
            .checked_add(len)
            .filter(|end| *end <= bytes.len())
            .ok_or(Error::Corrupted("property length past end of blob"))?;
        let raw = &bytes[pos..end];
        pos = end;
        match lookup(id) {
            Some((name, ty)) => {
                let value = value_from_bytes(ty, raw)?;
                record.set(name, value);
            }
            None => record.push_unknown(id, raw.to_vec()),
        }
    }
    Ok(record)
}

// --- schema catalog rows ---

pub(crate) fn encode_class_row(name: &str, class_type: ClassType, parent: Option<ClassId>) -> Vec<u8> {
    let mut out = Vec::with_capacity(6 + name.len());
    out.push(match class_type {
        ClassType::Vertex => 0,
        ClassType::Edge => 1,
    });
    out.extend_from_slice(&parent.unwrap_or(-1).to_le_bytes());
    write_uvarint(&mut out, name.len() as u64);
    out.extend_from_slice(name.as_bytes());
    out
}

pub(crate) fn decode_class_row(bytes: &[u8]) -> Result<(String, ClassType, Option<ClassId>)> {
    if bytes.len() < 5 {
        return Err(Error::Corrupted("class row too short"));
    }
    let class_type = match bytes[0] {
        0 => ClassType::Vertex,
        1 => ClassType::Edge,
        _ => return Err(Error::Corrupted("unknown class type tag")),
    };
    let parent = ClassId::from_le_bytes(fixed(&bytes[1..5])?);
    let parent = (parent >= 0).then_some(parent);
    let mut pos = 5usize;
    let len = read_uvarint(bytes, &mut pos)? as usize;
    let name = bytes
        .get(pos..pos + len)
        .ok_or(Error::Corrupted("class name past end of row"))?;
    let name = String::from_utf8(name.to_vec())
        .map_err(|_| Error::Corrupted("class name is not valid UTF-8"))?;
    Ok((name, class_type, parent))
}

pub(crate) fn encode_property_row(name: &str, ty: PropertyType) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + name.len());
    out.push(ty.tag());
    write_uvarint(&mut out, name.len() as u64);
    out.extend_from_slice(name.as_bytes());
    out
}

pub(crate) fn decode_property_row(bytes: &[u8]) -> Result<(String, PropertyType)> {
    let tag = *bytes.first().ok_or(Error::Corrupted("property row empty"))?;
    let ty = PropertyType::from_tag(tag).ok_or(Error::Corrupted("unknown property type tag"))?;
    let mut pos = 1usize;
    let len = read_uvarint(bytes, &mut pos)? as usize;
    let name = bytes
        .get(pos..pos + len)
        .ok_or(Error::Corrupted("property name past end of row"))?;
    let name = String::from_utf8(name.to_vec())
        .map_err(|_| Error::Corrupted("property name is not valid UTF-8"))?;
    Ok((name, ty))
}

pub(crate) fn encode_index_row(class_id: ClassId, property_id: PropertyId, unique: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(7);
    out.extend_from_slice(&class_id.to_le_bytes());
    out.extend_from_slice(&property_id.to_le_bytes());
    out.push(unique as u8);
    out
}

pub(crate) fn decode_index_row(bytes: &[u8]) -> Result<(ClassId, PropertyId, bool)> {
    if bytes.len() != 7 {
        return Err(Error::Corrupted("index row has wrong width"));
    }
    Ok((
        ClassId::from_le_bytes(fixed(&bytes[0..4])?),
        PropertyId::from_le_bytes(fixed(&bytes[4..6])?),
        bytes[6] != 0,
    ))
}

// --- graph relation blobs ---

fn write_rid(buf: &mut Vec<u8>, rid: RecordId) {
    buf.extend_from_slice(&rid.class_id.to_le_bytes());
    buf.extend_from_slice(&rid.position.to_le_bytes());
}

fn read_rid(bytes: &[u8], pos: &mut usize) -> Result<RecordId> {
    let end = *pos + 12;
    if end > bytes.len() {
        return Err(Error::Corrupted("record id past end of blob"));
    }
    let class_id = ClassId::from_le_bytes(fixed(&bytes[*pos..*pos + 4])?);
    let position = PositionalId::from_le_bytes(fixed(&bytes[*pos + 4..end])?);
    *pos = end;
    Ok(RecordId::new(class_id, position))
}

/// In/out edge sets of one vertex, each kept sorted for deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Adjacency {
    pub inbound: Vec<RecordId>,
    pub outbound: Vec<RecordId>,
}

impl Adjacency {
    pub fn insert_inbound(&mut self, edge: RecordId) {
        if let Err(at) = self.inbound.binary_search(&edge) {
            self.inbound.insert(at, edge);
        }
    }

    pub fn insert_outbound(&mut self, edge: RecordId) {
        if let Err(at) = self.outbound.binary_search(&edge) {
            self.outbound.insert(at, edge);
        }
    }

    pub fn remove_edge(&mut self, edge: RecordId) {
        if let Ok(at) = self.inbound.binary_search(&edge) {
            self.inbound.remove(at);
        }
        if let Ok(at) = self.outbound.binary_search(&edge) {
            self.outbound.remove(at);
        }
    }
}

pub(crate) fn encode_adjacency(adj: &Adjacency) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 12 * (adj.inbound.len() + adj.outbound.len()));
    write_uvarint(&mut out, adj.inbound.len() as u64);
    for rid in &adj.inbound {
        write_rid(&mut out, *rid);
    }
    write_uvarint(&mut out, adj.outbound.len() as u64);
    for rid in &adj.outbound {
        write_rid(&mut out, *rid);
    }
    out
}

pub(crate) fn decode_adjacency(bytes: &[u8]) -> Result<Adjacency> {
    let mut pos = 0usize;
    let n_in = read_uvarint(bytes, &mut pos)? as usize;
    let mut inbound = Vec::with_capacity(n_in);
    for _ in 0..n_in {
        inbound.push(read_rid(bytes, &mut pos)?);
    }
    let n_out = read_uvarint(bytes, &mut pos)? as usize;
    let mut outbound = Vec::with_capacity(n_out);
    for _ in 0..n_out {
        outbound.push(read_rid(bytes, &mut pos)?);
    }
    Ok(Adjacency { inbound, outbound })
}

pub(crate) fn encode_endpoints(src: RecordId, dst: RecordId) -> Vec<u8> {
    let mut out = Vec::with_capacity(24);
    write_rid(&mut out, src);
    write_rid(&mut out, dst);
    out
}

pub(crate) fn decode_endpoints(bytes: &[u8]) -> Result<(RecordId, RecordId)> {
    let mut pos = 0usize;
    let src = read_rid(bytes, &mut pos)?;
    let dst = read_rid(bytes, &mut pos)?;
    if pos != bytes.len() {
        return Err(Error::Corrupted("endpoint blob has trailing bytes"));
    }
    Ok((src, dst))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uvarint_round_trips() {
        for v in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            write_uvarint(&mut buf, v);
            let mut pos = 0;
            assert_eq!(read_uvarint(&buf, &mut pos).unwrap(), v);
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn record_blob_round_trips_every_type() {
        let values = vec![
            (1u16, Value::TinyInt(-5)),
            (2, Value::UnsignedTinyInt(200)),
            (3, Value::SmallInt(-1234)),
            (4, Value::UnsignedSmallInt(65000)),
            (5, Value::Integer(-100_000)),
            (6, Value::UnsignedInteger(4_000_000_000)),
            (7, Value::BigInt(i64::MIN)),
            (8, Value::UnsignedBigInt(u64::MAX)),
            (9, Value::Real(49.99)),
            (10, Value::Text("Harry Potter".into())),
            (11, Value::Blob(vec![0, 1, 2, 255])),
        ];
        let mut known: Vec<(PropertyId, Vec<u8>)> = values
            .iter()
            .map(|(id, v)| (*id, value_bytes(v)))
            .collect();
        let blob = encode_record(&mut known, &[]);

        let table: Vec<(PropertyId, PropertyType)> = values
            .iter()
            .map(|(id, v)| (*id, v.property_type()))
            .collect();
        let decoded = decode_record(&blob, |id| {
            table
                .iter()
                .find(|(pid, _)| *pid == id)
                .map(|(pid, ty)| (format!("p{pid}"), *ty))
        })
        .unwrap();
        for (id, value) in &values {
            assert_eq!(decoded.get(&format!("p{id}")), Some(value));
        }
    }

    #[test]
    fn unknown_pairs_survive_decode_and_reencode() {
        let mut known = vec![(1u16, value_bytes(&Value::Integer(7)))];
        let unknown = vec![(9u16, vec![0xde, 0xad])];
        let blob = encode_record(&mut known, &unknown);

        let decoded = decode_record(&blob, |id| {
            (id == 1).then(|| ("known".to_owned(), PropertyType::Integer))
        })
        .unwrap();
        assert_eq!(decoded.get("known"), Some(&Value::Integer(7)));
        assert_eq!(decoded.unknown_pairs(), &[(9u16, vec![0xde, 0xad])]);

        let mut known2 = vec![(1u16, value_bytes(&Value::Integer(7)))];
        let reencoded = encode_record(&mut known2, decoded.unknown_pairs());
        assert_eq!(reencoded, blob);
    }

    #[test]
    fn class_row_round_trips() {
        let row = encode_class_row("books", ClassType::Vertex, None);
        assert_eq!(
            decode_class_row(&row).unwrap(),
            ("books".to_owned(), ClassType::Vertex, None)
        );
        let row = encode_class_row("novels", ClassType::Vertex, Some(3));
        assert_eq!(
            decode_class_row(&row).unwrap(),
            ("novels".to_owned(), ClassType::Vertex, Some(3))
        );
    }

    #[test]
    fn adjacency_blob_is_sorted_and_round_trips() {
        let mut adj = Adjacency::default();
        adj.insert_outbound(RecordId::new(4, 2));
        adj.insert_outbound(RecordId::new(4, 1));
        adj.insert_outbound(RecordId::new(4, 1));
        adj.insert_inbound(RecordId::new(5, 9));
        assert_eq!(adj.outbound, vec![RecordId::new(4, 1), RecordId::new(4, 2)]);

        let decoded = decode_adjacency(&encode_adjacency(&adj)).unwrap();
        assert_eq!(decoded, adj);
    }

    #[test]
    fn endpoints_blob_round_trips() {
        let blob = encode_endpoints(RecordId::new(1, 10), RecordId::new(2, 20));
        assert_eq!(
            decode_endpoints(&blob).unwrap(),
            (RecordId::new(1, 10), RecordId::new(2, 20))
        );
        assert!(decode_endpoints(&blob[..20]).is_err());
    }
}

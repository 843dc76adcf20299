//! Schema catalog: persisted classes, properties and indexes, plus the
//! in-memory snapshot that transactions read from.
//!
//! Readers share an `Arc<SchemaSnapshot>` taken at `begin`; the writer
//! mutates a scratch copy that is swapped into the shared cell only after
//! its KV commit succeeds. The catalog rows themselves live in the
//! `schema.*` tables and are written in the same transaction as the DDL.

use std::collections::{BTreeMap, HashMap};

use nogdb_api::{
    ClassDescriptor, ClassId, ClassType, IndexDescriptor, IndexId, PropertyDescriptor, PropertyId,
    PropertyType,
};
use redb::{ReadableTable, WriteTransaction};
use tracing::debug;

use crate::codec;
use crate::error::{Error, Result};
use crate::storage::{
    self, META_NEXT_CLASS_ID, META_NEXT_INDEX_ID, TABLE_CLASSES, TABLE_INDEXES, TABLE_META,
    TABLE_PROPERTIES, TABLE_SEQUENCES,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMeta {
    pub id: PropertyId,
    pub name: String,
    pub property_type: PropertyType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMeta {
    pub id: ClassId,
    pub name: String,
    pub class_type: ClassType,
    pub parent: Option<ClassId>,
    /// Properties declared on this class itself (inherited ones resolve
    /// through the ancestor chain).
    pub properties: BTreeMap<PropertyId, PropertyMeta>,
}

impl ClassMeta {
    pub fn descriptor(&self) -> ClassDescriptor {
        ClassDescriptor {
            id: self.id,
            name: self.name.clone(),
            class_type: self.class_type,
            parent: self.parent,
        }
    }

    fn property_by_name(&self, name: &str) -> Option<&PropertyMeta> {
        self.properties.values().find(|p| p.name == name)
    }
}

/// Immutable view of the whole catalog.
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    classes: BTreeMap<ClassId, ClassMeta>,
    by_name: HashMap<String, ClassId>,
    indexes: BTreeMap<IndexId, IndexDescriptor>,
}

impl SchemaSnapshot {
    pub(crate) fn load(txn: &redb::ReadTransaction) -> Result<Self> {
        let mut snapshot = SchemaSnapshot::default();

        let classes = txn.open_table(TABLE_CLASSES)?;
        for entry in classes.iter()? {
            let (key, value) = entry?;
            let id = key.value();
            let (name, class_type, parent) = codec::decode_class_row(value.value())?;
            snapshot.by_name.insert(name.clone(), id);
            snapshot.classes.insert(
                id,
                ClassMeta {
                    id,
                    name,
                    class_type,
                    parent,
                    properties: BTreeMap::new(),
                },
            );
        }

        let properties = txn.open_table(TABLE_PROPERTIES)?;
        for entry in properties.iter()? {
            let (key, value) = entry?;
            let (class_id, property_id) = key.value();
            let (name, property_type) = codec::decode_property_row(value.value())?;
            let class = snapshot
                .classes
                .get_mut(&class_id)
                .ok_or(Error::Corrupted("property row references unknown class"))?;
            class.properties.insert(
                property_id,
                PropertyMeta {
                    id: property_id,
                    name,
                    property_type,
                },
            );
        }

        let indexes = txn.open_table(TABLE_INDEXES)?;
        for entry in indexes.iter()? {
            let (key, value) = entry?;
            let id = key.value();
            let (class_id, property_id, unique) = codec::decode_index_row(value.value())?;
            snapshot.indexes.insert(
                id,
                IndexDescriptor {
                    id,
                    class_id,
                    property_id,
                    unique,
                },
            );
        }

        Ok(snapshot)
    }

    pub fn class_by_name(&self, name: &str) -> Option<&ClassMeta> {
        self.by_name.get(name).and_then(|id| self.classes.get(id))
    }

    pub fn class_by_id(&self, id: ClassId) -> Option<&ClassMeta> {
        self.classes.get(&id)
    }

    pub(crate) fn expect_class(&self, name: &str) -> Result<&ClassMeta> {
        self.class_by_name(name)
            .ok_or_else(|| Error::ClassNotFound(name.to_owned()))
    }

    pub(crate) fn expect_class_id(&self, id: ClassId) -> Result<&ClassMeta> {
        self.classes
            .get(&id)
            .ok_or_else(|| Error::ClassNotFound(format!("class id {id}")))
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassMeta> {
        self.classes.values()
    }

    pub fn indexes(&self) -> impl Iterator<Item = &IndexDescriptor> {
        self.indexes.values()
    }

    /// `id` and every ancestor, nearest first.
    pub(crate) fn self_and_ancestors(&self, id: ClassId) -> Vec<ClassId> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.classes.get(&current).and_then(|c| c.parent);
        }
        chain
    }

    pub(crate) fn children(&self, id: ClassId) -> Vec<ClassId> {
        self.classes
            .values()
            .filter(|c| c.parent == Some(id))
            .map(|c| c.id)
            .collect()
    }

    /// `id` and every descendant, DFS pre-order. This is the scan order
    /// of subclass queries.
    pub(crate) fn self_and_descendants(&self, id: ClassId) -> Vec<ClassId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            let mut kids = self.children(current);
            kids.sort_unstable_by(|a, b| b.cmp(a));
            stack.extend(kids);
        }
        order
    }

    /// Resolves a property by name on a class or any ancestor.
    pub(crate) fn resolve_property(&self, class_id: ClassId, name: &str) -> Option<&PropertyMeta> {
        self.self_and_ancestors(class_id)
            .into_iter()
            .filter_map(|id| self.classes.get(&id))
            .find_map(|class| class.property_by_name(name))
    }

    /// Property id to (name, type) over a class and its ancestors, for
    /// decoding record blobs.
    pub(crate) fn property_map(&self, class_id: ClassId) -> BTreeMap<PropertyId, (String, PropertyType)> {
        let mut map = BTreeMap::new();
        for id in self.self_and_ancestors(class_id) {
            if let Some(class) = self.classes.get(&id) {
                for meta in class.properties.values() {
                    map.entry(meta.id)
                        .or_insert_with(|| (meta.name.clone(), meta.property_type));
                }
            }
        }
        map
    }

    /// Own plus inherited property descriptors of a class.
    pub(crate) fn property_descriptors(&self, class_id: ClassId) -> Vec<PropertyDescriptor> {
        let mut out = Vec::new();
        for (hop, id) in self.self_and_ancestors(class_id).into_iter().enumerate() {
            if let Some(class) = self.classes.get(&id) {
                for meta in class.properties.values() {
                    out.push(PropertyDescriptor {
                        id: meta.id,
                        name: meta.name.clone(),
                        property_type: meta.property_type,
                        inherited: hop > 0,
                    });
                }
            }
        }
        out
    }

    /// Indexes applicable to records of `class_id`: those declared on the
    /// class itself or any ancestor.
    pub(crate) fn indexes_for_class(&self, class_id: ClassId) -> Vec<IndexDescriptor> {
        let chain = self.self_and_ancestors(class_id);
        self.indexes
            .values()
            .filter(|idx| chain.contains(&idx.class_id))
            .copied()
            .collect()
    }

    /// The index covering `property` on `class_id`, if one is visible.
    pub(crate) fn index_on(&self, class_id: ClassId, property_id: PropertyId) -> Option<IndexDescriptor> {
        let chain = self.self_and_ancestors(class_id);
        self.indexes
            .values()
            .find(|idx| idx.property_id == property_id && chain.contains(&idx.class_id))
            .copied()
    }

    /// Highest property id used anywhere in the inheritance tree that
    /// contains `class_id`. New properties allocate above this so that
    /// ids stay unambiguous across the whole tree.
    fn tree_max_property_id(&self, class_id: ClassId) -> PropertyId {
        let mut root = class_id;
        while let Some(parent) = self.classes.get(&root).and_then(|c| c.parent) {
            root = parent;
        }
        self.self_and_descendants(root)
            .into_iter()
            .filter_map(|id| self.classes.get(&id))
            .flat_map(|class| class.properties.keys().copied())
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn db_info(&self) -> nogdb_api::DbInfo {
        nogdb_api::DbInfo {
            num_class: self.classes.len() as u64,
            num_property: self.classes.values().map(|c| c.properties.len() as u64).sum(),
            num_index: self.indexes.len() as u64,
            max_class_id: self.classes.keys().max().copied().unwrap_or(0),
            max_index_id: self.indexes.keys().max().copied().unwrap_or(0),
        }
    }
}

/// Class and property names: non-empty, leading letter or underscore,
/// ASCII alphanumerics and underscores after that.
pub(crate) fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn bump_meta(txn: &WriteTransaction, key: &str) -> Result<u64> {
    let mut table = txn.open_table(TABLE_META)?;
    let next = table.get(key)?.map(|guard| guard.value()).unwrap_or(1);
    table.insert(key, next + 1)?;
    Ok(next)
}

/// Issues the next positional id of a class. Ids are monotonic and never
/// rewound, so positions are not reused after deletion.
pub(crate) fn next_position(txn: &WriteTransaction, class_id: ClassId) -> Result<u64> {
    let mut table = txn.open_table(TABLE_SEQUENCES)?;
    let next = table.get(class_id)?.map(|guard| guard.value()).unwrap_or(0) + 1;
    table.insert(class_id, next)?;
    Ok(next)
}

/// Creates a class row and its data table; updates the scratch snapshot.
pub(crate) fn create_class(
    txn: &WriteTransaction,
    schema: &mut SchemaSnapshot,
    name: &str,
    class_type: ClassType,
    parent_name: Option<&str>,
) -> Result<ClassDescriptor> {
    if !valid_name(name) {
        return Err(Error::InvalidClassName(name.to_owned()));
    }
    if schema.by_name.contains_key(name) {
        return Err(Error::DuplicateClass(name.to_owned()));
    }
    let parent = match parent_name {
        Some(parent_name) => {
            let parent = schema.expect_class(parent_name)?;
            if parent.class_type != class_type {
                return Err(Error::ClassTypeMismatch(format!(
                    "cannot extend {} class {} as {}",
                    parent.class_type, parent.name, class_type
                )));
            }
            Some(parent.id)
        }
        None => None,
    };

    let id = bump_meta(txn, META_NEXT_CLASS_ID)? as ClassId;
    {
        let mut table = txn.open_table(TABLE_CLASSES)?;
        table.insert(id, codec::encode_class_row(name, class_type, parent).as_slice())?;
    }
    let data_name = storage::data_table_name(id);
    txn.open_table(storage::data_table(&data_name))?;

    debug!(class = name, id, %class_type, "class created");
    let meta = ClassMeta {
        id,
        name: name.to_owned(),
        class_type,
        parent,
        properties: BTreeMap::new(),
    };
    let descriptor = meta.descriptor();
    schema.by_name.insert(name.to_owned(), id);
    schema.classes.insert(id, meta);
    Ok(descriptor)
}

/// Removes the catalog rows of a class and re-parents its children onto
/// the dropped class's parent. Record and index table cleanup is the
/// caller's job (it must run first, through the cascade path).
pub(crate) fn remove_class(
    txn: &WriteTransaction,
    schema: &mut SchemaSnapshot,
    class_id: ClassId,
) -> Result<()> {
    let (name, parent) = {
        let class = schema.expect_class_id(class_id)?;
        (class.name.clone(), class.parent)
    };

    {
        let mut table = txn.open_table(TABLE_CLASSES)?;
        table.remove(class_id)?;
    }
    {
        let mut table = txn.open_table(TABLE_PROPERTIES)?;
        let ids: Vec<PropertyId> = schema
            .classes
            .get(&class_id)
            .map(|c| c.properties.keys().copied().collect())
            .unwrap_or_default();
        for property_id in ids {
            table.remove((class_id, property_id))?;
        }
    }
    for child in schema.children(class_id) {
        let child_meta = schema.expect_class_id(child)?;
        let row = codec::encode_class_row(&child_meta.name, child_meta.class_type, parent);
        let mut table = txn.open_table(TABLE_CLASSES)?;
        table.insert(child, row.as_slice())?;
        schema.classes.get_mut(&child).expect("child is present").parent = parent;
    }

    let data_name = storage::data_table_name(class_id);
    txn.delete_table(storage::data_table(&data_name))?;

    schema.by_name.remove(&name);
    schema.classes.remove(&class_id);
    debug!(class = %name, id = class_id, "class dropped");
    Ok(())
}

pub(crate) fn rename_class(
    txn: &WriteTransaction,
    schema: &mut SchemaSnapshot,
    old_name: &str,
    new_name: &str,
) -> Result<()> {
    if !valid_name(new_name) {
        return Err(Error::InvalidClassName(new_name.to_owned()));
    }
    if schema.by_name.contains_key(new_name) {
        return Err(Error::DuplicateClass(new_name.to_owned()));
    }
    let (id, class_type, parent) = {
        let class = schema.expect_class(old_name)?;
        (class.id, class.class_type, class.parent)
    };
    {
        let mut table = txn.open_table(TABLE_CLASSES)?;
        table.insert(id, codec::encode_class_row(new_name, class_type, parent).as_slice())?;
    }
    schema.by_name.remove(old_name);
    schema.by_name.insert(new_name.to_owned(), id);
    schema.classes.get_mut(&id).expect("class is present").name = new_name.to_owned();
    debug!(from = old_name, to = new_name, "class renamed");
    Ok(())
}

/// Checks that `name` does not collide anywhere it would be visible:
/// on the class, an ancestor, or any descendant.
fn property_name_conflicts(schema: &SchemaSnapshot, class_id: ClassId, name: &str) -> bool {
    if schema.resolve_property(class_id, name).is_some() {
        return true;
    }
    schema
        .self_and_descendants(class_id)
        .into_iter()
        .skip(1)
        .filter_map(|id| schema.classes.get(&id))
        .any(|class| class.property_by_name(name).is_some())
}

pub(crate) fn create_property(
    txn: &WriteTransaction,
    schema: &mut SchemaSnapshot,
    class_name: &str,
    name: &str,
    property_type: PropertyType,
) -> Result<PropertyDescriptor> {
    if !valid_name(name) {
        return Err(Error::InvalidPropertyName(name.to_owned()));
    }
    let class_id = schema.expect_class(class_name)?.id;
    if property_name_conflicts(schema, class_id, name) {
        return Err(Error::DuplicateProperty(name.to_owned()));
    }

    let id = schema.tree_max_property_id(class_id) + 1;
    {
        let mut table = txn.open_table(TABLE_PROPERTIES)?;
        table.insert((class_id, id), codec::encode_property_row(name, property_type).as_slice())?;
    }
    schema
        .classes
        .get_mut(&class_id)
        .expect("class is present")
        .properties
        .insert(
            id,
            PropertyMeta {
                id,
                name: name.to_owned(),
                property_type,
            },
        );
    debug!(class = class_name, property = name, %property_type, "property created");
    Ok(PropertyDescriptor {
        id,
        name: name.to_owned(),
        property_type,
        inherited: false,
    })
}

pub(crate) fn remove_property(
    txn: &WriteTransaction,
    schema: &mut SchemaSnapshot,
    class_name: &str,
    name: &str,
) -> Result<()> {
    let class_id = schema.expect_class(class_name)?.id;
    let owner = schema
        .self_and_ancestors(class_id)
        .into_iter()
        .find(|id| {
            schema
                .classes
                .get(id)
                .is_some_and(|c| c.property_by_name(name).is_some())
        })
        .ok_or_else(|| Error::PropertyNotFound(name.to_owned()))?;
    let property_id = schema
        .classes
        .get(&owner)
        .and_then(|c| c.property_by_name(name))
        .expect("owner resolved above")
        .id;

    // An index anywhere the property is visible blocks the drop.
    let visible = schema.self_and_descendants(owner);
    if schema
        .indexes
        .values()
        .any(|idx| idx.property_id == property_id && visible.contains(&idx.class_id))
    {
        return Err(Error::PropertyInUse(name.to_owned()));
    }

    {
        let mut table = txn.open_table(TABLE_PROPERTIES)?;
        table.remove((owner, property_id))?;
    }
    schema
        .classes
        .get_mut(&owner)
        .expect("owner is present")
        .properties
        .remove(&property_id);
    debug!(class = class_name, property = name, "property dropped");
    Ok(())
}

pub(crate) fn rename_property(
    txn: &WriteTransaction,
    schema: &mut SchemaSnapshot,
    class_name: &str,
    old_name: &str,
    new_name: &str,
) -> Result<()> {
    if !valid_name(new_name) {
        return Err(Error::InvalidPropertyName(new_name.to_owned()));
    }
    let class_id = schema.expect_class(class_name)?.id;
    let meta = schema
        .resolve_property(class_id, old_name)
        .ok_or_else(|| Error::PropertyNotFound(old_name.to_owned()))?
        .clone();
    let owner = schema
        .self_and_ancestors(class_id)
        .into_iter()
        .find(|id| {
            schema
                .classes
                .get(id)
                .is_some_and(|c| c.property_by_name(old_name).is_some())
        })
        .expect("property resolved above");
    if property_name_conflicts(schema, owner, new_name) {
        return Err(Error::DuplicateProperty(new_name.to_owned()));
    }

    {
        let mut table = txn.open_table(TABLE_PROPERTIES)?;
        table.insert(
            (owner, meta.id),
            codec::encode_property_row(new_name, meta.property_type).as_slice(),
        )?;
    }
    schema
        .classes
        .get_mut(&owner)
        .expect("owner is present")
        .properties
        .get_mut(&meta.id)
        .expect("property is present")
        .name = new_name.to_owned();
    debug!(class = class_name, from = old_name, to = new_name, "property renamed");
    Ok(())
}

/// Writes the catalog row of a new index; the partition build is the
/// index engine's job and runs before this in the same operation.
pub(crate) fn insert_index(
    txn: &WriteTransaction,
    schema: &mut SchemaSnapshot,
    class_id: ClassId,
    property_id: PropertyId,
    unique: bool,
) -> Result<IndexDescriptor> {
    let id = bump_meta(txn, META_NEXT_INDEX_ID)? as IndexId;
    {
        let mut table = txn.open_table(TABLE_INDEXES)?;
        table.insert(id, codec::encode_index_row(class_id, property_id, unique).as_slice())?;
    }
    let descriptor = IndexDescriptor {
        id,
        class_id,
        property_id,
        unique,
    };
    schema.indexes.insert(id, descriptor);
    Ok(descriptor)
}

pub(crate) fn remove_index(
    txn: &WriteTransaction,
    schema: &mut SchemaSnapshot,
    index_id: IndexId,
) -> Result<()> {
    {
        let mut table = txn.open_table(TABLE_INDEXES)?;
        table.remove(index_id)?;
    }
    schema.indexes.remove(&index_id);
    Ok(())
}

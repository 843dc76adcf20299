use nogdb_core::{ClassType, Condition, Context, Error, PropertyType, Record, TxnMode};
use tempfile::tempdir;

#[test]
fn unique_index_rejects_duplicate_insert() {
    let dir = tempdir().unwrap();
    let ctx = Context::open(dir.path().join("index.nog")).unwrap();

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    txn.add_class("V", ClassType::Vertex).unwrap();
    txn.add_property("V", "p", PropertyType::Text).unwrap();
    txn.add_vertex("V", Record::new().with("p", "x")).unwrap();
    txn.add_index("V", "p", true).unwrap();

    assert!(matches!(
        txn.add_vertex("V", Record::new().with("p", "x")),
        Err(Error::UniqueConstraint(_))
    ));
    // The failed insert left no partial row behind.
    assert_eq!(txn.find("V").count().unwrap(), 1);

    // A different value is fine, and unset values are not indexed.
    txn.add_vertex("V", Record::new().with("p", "y")).unwrap();
    txn.add_vertex("V", Record::new()).unwrap();
    txn.add_vertex("V", Record::new()).unwrap();
    txn.commit().unwrap();
}

#[test]
fn unique_index_build_rejects_existing_duplicates() {
    let dir = tempdir().unwrap();
    let ctx = Context::open(dir.path().join("index.nog")).unwrap();

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    txn.add_class("V", ClassType::Vertex).unwrap();
    txn.add_property("V", "p", PropertyType::Text).unwrap();
    txn.add_vertex("V", Record::new().with("p", "dup")).unwrap();
    txn.add_vertex("V", Record::new().with("p", "dup")).unwrap();

    assert!(matches!(
        txn.add_index("V", "p", true),
        Err(Error::InvalidIndexConstraint)
    ));
    // The rejected build registered nothing.
    assert!(matches!(
        txn.get_index("V", "p"),
        Err(Error::IndexNotFound { .. })
    ));

    // A non-unique index over the same data is fine.
    txn.add_index("V", "p", false).unwrap();
    txn.commit().unwrap();
}

#[test]
fn indexed_equality_find() {
    let dir = tempdir().unwrap();
    let ctx = Context::open(dir.path().join("index.nog")).unwrap();

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    txn.add_class("T", ClassType::Vertex).unwrap();
    txn.add_property("T", "k", PropertyType::Integer).unwrap();
    txn.add_index("T", "k", true).unwrap();

    let mut inserted = Vec::new();
    for k in [1, 2, 3] {
        inserted.push(txn.add_vertex("T", Record::new().with("k", k)).unwrap());
    }
    txn.commit().unwrap();

    let txn = ctx.begin_txn(TxnMode::ReadOnly).unwrap();
    let rows = txn
        .find("T")
        .indexed()
        .where_(Condition::prop("k").eq(2))
        .get()
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].descriptor, inserted[1]);
    assert_eq!(
        rows[0].record.get("@recordId").unwrap().to_text().unwrap(),
        inserted[1].rid.to_string()
    );

    // Non-equality shapes fall back to the scan and still answer.
    let rows = txn
        .find("T")
        .indexed()
        .where_(Condition::prop("k").gt(1))
        .get()
        .unwrap();
    assert_eq!(rows.len(), 2);
    txn.commit().unwrap();
}

#[test]
fn index_follows_update_and_destroy() {
    let dir = tempdir().unwrap();
    let ctx = Context::open(dir.path().join("index.nog")).unwrap();

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    txn.add_class("T", ClassType::Vertex).unwrap();
    txn.add_property("T", "k", PropertyType::Integer).unwrap();
    txn.add_index("T", "k", true).unwrap();

    let a = txn.add_vertex("T", Record::new().with("k", 1)).unwrap();
    txn.update(&a, Record::new().with("k", 5)).unwrap();

    // The old key is free again, the new key is taken.
    let b = txn.add_vertex("T", Record::new().with("k", 1)).unwrap();
    assert!(matches!(
        txn.add_vertex("T", Record::new().with("k", 5)),
        Err(Error::UniqueConstraint(_))
    ));

    // Re-saving the same value for the same record is not a collision.
    txn.update(&a, Record::new().with("k", 5)).unwrap();

    txn.destroy(&a).unwrap();
    txn.add_vertex("T", Record::new().with("k", 5)).unwrap();

    let found = txn
        .find("T")
        .indexed()
        .where_(Condition::prop("k").eq(1))
        .get()
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].descriptor, b);
    txn.commit().unwrap();
}

#[test]
fn non_unique_index_returns_all_matches_in_rid_order() {
    let dir = tempdir().unwrap();
    let ctx = Context::open(dir.path().join("index.nog")).unwrap();

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    txn.add_class("T", ClassType::Vertex).unwrap();
    txn.add_property("T", "k", PropertyType::Text).unwrap();
    txn.add_index("T", "k", false).unwrap();

    let a = txn.add_vertex("T", Record::new().with("k", "x")).unwrap();
    txn.add_vertex("T", Record::new().with("k", "y")).unwrap();
    let c = txn.add_vertex("T", Record::new().with("k", "x")).unwrap();
    txn.commit().unwrap();

    let txn = ctx.begin_txn(TxnMode::ReadOnly).unwrap();
    let rows = txn
        .find("T")
        .indexed()
        .where_(Condition::prop("k").eq("x"))
        .get()
        .unwrap();
    let rids: Vec<_> = rows.iter().map(|r| r.descriptor.rid).collect();
    assert_eq!(rids, vec![a.rid, c.rid]);
    txn.commit().unwrap();
}

#[test]
fn parent_index_partitions_per_subclass() {
    let dir = tempdir().unwrap();
    let ctx = Context::open(dir.path().join("index.nog")).unwrap();

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    txn.add_class("base", ClassType::Vertex).unwrap();
    txn.add_property("base", "k", PropertyType::Integer).unwrap();
    txn.add_sub_class_of("base", "derived").unwrap();
    txn.add_index("base", "k", true).unwrap();

    txn.add_vertex("base", Record::new().with("k", 7)).unwrap();
    // Uniqueness is scoped to the concrete class partition.
    txn.add_vertex("derived", Record::new().with("k", 7)).unwrap();
    assert!(matches!(
        txn.add_vertex("derived", Record::new().with("k", 7)),
        Err(Error::UniqueConstraint(_))
    ));

    // A subclass scan unions both partitions.
    let rows = txn
        .find_sub_class_of("base")
        .indexed()
        .where_(Condition::prop("k").eq(7))
        .get()
        .unwrap();
    assert_eq!(rows.len(), 2);
    txn.commit().unwrap();
}

#[test]
fn blob_property_cannot_be_indexed() {
    let dir = tempdir().unwrap();
    let ctx = Context::open(dir.path().join("index.nog")).unwrap();

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    txn.add_class("V", ClassType::Vertex).unwrap();
    txn.add_property("V", "raw", PropertyType::Blob).unwrap();
    assert!(matches!(
        txn.add_index("V", "raw", false),
        Err(Error::InvalidPropertyTypeForIndex(_))
    ));
    txn.commit().unwrap();
}

#[test]
fn duplicate_and_missing_index_errors() {
    let dir = tempdir().unwrap();
    let ctx = Context::open(dir.path().join("index.nog")).unwrap();

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    txn.add_class("V", ClassType::Vertex).unwrap();
    txn.add_property("V", "p", PropertyType::Text).unwrap();
    txn.add_index("V", "p", false).unwrap();
    assert!(matches!(
        txn.add_index("V", "p", true),
        Err(Error::DuplicateIndex { .. })
    ));
    assert!(matches!(
        txn.drop_index("V", "missing"),
        Err(Error::PropertyNotFound(_))
    ));
    txn.drop_index("V", "p").unwrap();
    assert!(matches!(
        txn.drop_index("V", "p"),
        Err(Error::IndexNotFound { .. })
    ));
    txn.commit().unwrap();
}

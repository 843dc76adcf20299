use nogdb_core::{
    ClassType, Condition, Context, Error, GraphFilter, PropertyType, Record, TxnMode,
};
use tempfile::tempdir;

fn authors_ctx(path: &std::path::Path) -> Context {
    let ctx = Context::open(path).unwrap();
    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    txn.add_class("books", ClassType::Vertex).unwrap();
    txn.add_property("books", "title", PropertyType::Text).unwrap();
    txn.add_class("persons", ClassType::Vertex).unwrap();
    txn.add_property("persons", "name", PropertyType::Text).unwrap();
    txn.add_class("authors", ClassType::Edge).unwrap();
    txn.add_property("authors", "time_used", PropertyType::UnsignedInteger).unwrap();
    txn.commit().unwrap();
    ctx
}

#[test]
fn edge_endpoints_and_adjacency() {
    let dir = tempdir().unwrap();
    let ctx = authors_ctx(&dir.path().join("graph.nog"));

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    let v1 = txn.add_vertex("books", Record::new().with("title", "HP")).unwrap();
    let p1 = txn.add_vertex("persons", Record::new().with("name", "JK")).unwrap();
    let e1 = txn
        .add_edge("authors", &v1, &p1, Record::new().with("time_used", 365u32))
        .unwrap();

    assert_eq!(txn.fetch_src(&e1).unwrap().rid, v1.rid);
    assert_eq!(txn.fetch_dst(&e1).unwrap().rid, p1.rid);
    let (src, dst) = txn.fetch_src_dst(&e1).unwrap();
    assert_eq!((src.rid, dst.rid), (v1.rid, p1.rid));

    let out = txn.get_out_edges(&v1, &GraphFilter::new()).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].rid, e1.rid);
    assert!(txn.get_in_edges(&v1, &GraphFilter::new()).unwrap().is_empty());

    let inbound = txn.get_in_edges(&p1, &GraphFilter::new()).unwrap();
    assert_eq!(inbound.len(), 1);
    assert_eq!(inbound[0].rid, e1.rid);

    let all = txn.get_all_edges(&p1, &GraphFilter::new()).unwrap();
    assert_eq!(all.len(), 1);
    txn.commit().unwrap();
}

#[test]
fn destroy_vertex_cascades_to_edges() {
    let dir = tempdir().unwrap();
    let ctx = authors_ctx(&dir.path().join("graph.nog"));

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    let v1 = txn.add_vertex("books", Record::new().with("title", "HP")).unwrap();
    let p1 = txn.add_vertex("persons", Record::new().with("name", "JK")).unwrap();
    let e1 = txn
        .add_edge("authors", &v1, &p1, Record::new().with("time_used", 365u32))
        .unwrap();

    txn.destroy(&p1).unwrap();
    assert!(matches!(txn.fetch_record(&e1), Err(Error::RecordNotFound(_))));
    // The surviving endpoint is intact and sees no dangling edge.
    assert!(txn.fetch_record(&v1).is_ok());
    assert!(txn.get_out_edges(&v1, &GraphFilter::new()).unwrap().is_empty());
    txn.commit().unwrap();
}

#[test]
fn destroy_edge_restores_prior_adjacency() {
    let dir = tempdir().unwrap();
    let ctx = authors_ctx(&dir.path().join("graph.nog"));

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    let v1 = txn.add_vertex("books", Record::new()).unwrap();
    let p1 = txn.add_vertex("persons", Record::new()).unwrap();
    let e1 = txn.add_edge("authors", &v1, &p1, Record::new()).unwrap();
    txn.destroy(&e1).unwrap();

    assert!(txn.get_out_edges(&v1, &GraphFilter::new()).unwrap().is_empty());
    assert!(txn.get_in_edges(&p1, &GraphFilter::new()).unwrap().is_empty());
    assert!(matches!(txn.fetch_src(&e1), Err(Error::RecordNotFound(_))));
    assert!(txn.fetch_record(&v1).is_ok());
    assert!(txn.fetch_record(&p1).is_ok());
    txn.commit().unwrap();
}

#[test]
fn edge_requires_existing_endpoints() {
    let dir = tempdir().unwrap();
    let ctx = authors_ctx(&dir.path().join("graph.nog"));

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    let v1 = txn.add_vertex("books", Record::new()).unwrap();
    let p1 = txn.add_vertex("persons", Record::new()).unwrap();

    let mut ghost = p1;
    ghost.rid.position += 100;
    assert!(matches!(
        txn.add_edge("authors", &v1, &ghost, Record::new()),
        Err(Error::DestNotFound(_))
    ));
    let mut ghost_src = v1;
    ghost_src.rid.position += 100;
    assert!(matches!(
        txn.add_edge("authors", &ghost_src, &p1, Record::new()),
        Err(Error::SourceNotFound(_))
    ));

    // Vertex ops on edge classes (and vice versa) are type mismatches.
    assert!(matches!(
        txn.add_vertex("authors", Record::new()),
        Err(Error::ClassTypeMismatch(_))
    ));
    let e1 = txn.add_edge("authors", &v1, &p1, Record::new()).unwrap();
    assert!(matches!(
        txn.add_edge("books", &v1, &p1, Record::new()),
        Err(Error::ClassTypeMismatch(_))
    ));
    assert!(matches!(
        txn.get_out_edges(&e1, &GraphFilter::new()),
        Err(Error::ClassTypeMismatch(_))
    ));
    assert!(matches!(
        txn.fetch_src(&v1),
        Err(Error::ClassTypeMismatch(_))
    ));
    txn.commit().unwrap();
}

#[test]
fn edge_filters_by_class_and_condition() {
    let dir = tempdir().unwrap();
    let ctx = authors_ctx(&dir.path().join("graph.nog"));

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    txn.add_class("cites", ClassType::Edge).unwrap();
    let v1 = txn.add_vertex("books", Record::new()).unwrap();
    let p1 = txn.add_vertex("persons", Record::new()).unwrap();
    let short = txn
        .add_edge("authors", &v1, &p1, Record::new().with("time_used", 10u32))
        .unwrap();
    let long = txn
        .add_edge("authors", &v1, &p1, Record::new().with("time_used", 365u32))
        .unwrap();
    let cite = txn.add_edge("cites", &v1, &p1, Record::new()).unwrap();

    let only_authors = txn
        .get_out_edges(&v1, &GraphFilter::new().only(["authors"]))
        .unwrap();
    assert_eq!(only_authors.len(), 2);
    assert!(only_authors.iter().all(|e| e.rid != cite.rid));

    let long_only = txn
        .get_out_edges(
            &v1,
            &GraphFilter::new()
                .only(["authors"])
                .with_condition(Condition::prop("time_used").ge(100u32)),
        )
        .unwrap();
    assert_eq!(long_only.len(), 1);
    assert_eq!(long_only[0].rid, long.rid);
    assert_ne!(long.rid, short.rid);

    // Filter class checks: unknown and wrong-kind names fail.
    assert!(matches!(
        txn.get_out_edges(&v1, &GraphFilter::new().only(["nope"])),
        Err(Error::ClassNotFound(_))
    ));
    assert!(matches!(
        txn.get_out_edges(&v1, &GraphFilter::new().only(["persons"])),
        Err(Error::ClassTypeMismatch(_))
    ));
    txn.commit().unwrap();
}

#[test]
fn vertex_not_found_for_unknown_position() {
    let dir = tempdir().unwrap();
    let ctx = authors_ctx(&dir.path().join("graph.nog"));

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    let v1 = txn.add_vertex("books", Record::new()).unwrap();
    let mut ghost = v1;
    ghost.rid.position += 9;
    assert!(matches!(
        txn.get_out_edges(&ghost, &GraphFilter::new()),
        Err(Error::VertexNotFound(_))
    ));
    txn.commit().unwrap();
}

#[test]
fn self_loop_round_trips() {
    let dir = tempdir().unwrap();
    let ctx = authors_ctx(&dir.path().join("graph.nog"));

    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    let v = txn.add_vertex("books", Record::new()).unwrap();
    let loop_edge = txn.add_edge("authors", &v, &v, Record::new()).unwrap();

    assert_eq!(txn.get_out_edges(&v, &GraphFilter::new()).unwrap().len(), 1);
    assert_eq!(txn.get_in_edges(&v, &GraphFilter::new()).unwrap().len(), 1);
    // `all` deduplicates the shared edge.
    assert_eq!(txn.get_all_edges(&v, &GraphFilter::new()).unwrap().len(), 1);

    txn.destroy(&loop_edge).unwrap();
    assert!(txn.get_all_edges(&v, &GraphFilter::new()).unwrap().is_empty());
    txn.commit().unwrap();
}

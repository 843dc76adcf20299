use nogdb_core::{ClassType, Context, Error, TxnMode, Value};
use nogdb_sql::execute;
use tempfile::tempdir;

fn open_ctx(dir: &tempfile::TempDir) -> Context {
    Context::open(dir.path().join("sql.nog")).unwrap()
}

#[test]
fn lexical_and_structural_errors() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(&dir);
    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();

    assert!(matches!(
        execute(&mut txn, "128asyuiqwerhb;"),
        Err(Error::UnrecognizedToken { .. })
    ));
    assert!(matches!(
        execute(&mut txn, "SELECT DELETE VERTEX;"),
        Err(Error::SyntaxError { .. })
    ));
    txn.commit().unwrap();
}

#[test]
fn ddl_statements() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(&dir);
    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();

    let result = execute(&mut txn, "CREATE CLASS sql_class EXTENDS VERTEX").unwrap();
    match result {
        nogdb_sql::SqlResult::Class(descriptor) => {
            assert_eq!(descriptor.name, "sql_class");
            assert_eq!(descriptor.class_type, ClassType::Vertex);
        }
        other => panic!("unexpected result: {other:?}"),
    }

    // IF NOT EXISTS tolerates the duplicate and hands back the class.
    execute(&mut txn, "CREATE CLASS sql_class IF NOT EXISTS EXTENDS VERTEX").unwrap();
    assert!(matches!(
        execute(&mut txn, "CREATE CLASS sql_class EXTENDS VERTEX"),
        Err(Error::DuplicateClass(_))
    ));

    // Empty names reach the engine's validation.
    assert!(matches!(
        execute(&mut txn, "CREATE CLASS '' EXTENDS VERTEX"),
        Err(Error::InvalidClassName(_))
    ));

    execute(&mut txn, "CREATE CLASS sql_sub EXTENDS sql_class").unwrap();
    let sub = txn.get_class("sql_sub").unwrap();
    assert_eq!(sub.parent, Some(txn.get_class("sql_class").unwrap().id));

    execute(&mut txn, "CREATE PROPERTY sql_class.title IF NOT EXISTS TEXT").unwrap();
    execute(&mut txn, "CREATE PROPERTY sql_class.pages INTEGER").unwrap();
    execute(&mut txn, "ALTER PROPERTY sql_class.pages NAME 'page_count'").unwrap();
    assert!(txn
        .get_properties("sql_class")
        .unwrap()
        .iter()
        .any(|p| p.name == "page_count"));

    execute(&mut txn, "CREATE INDEX sql_class.title UNIQUE").unwrap();
    assert!(txn.get_index("sql_class", "title").unwrap().unique);
    execute(&mut txn, "DROP INDEX sql_class.title").unwrap();

    execute(&mut txn, "ALTER CLASS sql_sub NAME 'sql_renamed'").unwrap();
    assert!(txn.get_class("sql_renamed").is_ok());

    execute(&mut txn, "DROP CLASS sql_renamed").unwrap();
    execute(&mut txn, "DROP CLASS sql_renamed IF EXISTS").unwrap();
    assert!(matches!(
        execute(&mut txn, "DROP CLASS sql_renamed"),
        Err(Error::ClassNotFound(_))
    ));
    txn.commit().unwrap();
}

fn seed_books(txn: &mut nogdb_core::Txn<'_>) {
    for statement in [
        "CREATE CLASS books EXTENDS VERTEX",
        "CREATE PROPERTY books.title TEXT",
        "CREATE PROPERTY books.words UNSIGNED_BIGINT",
        "CREATE PROPERTY books.pages INTEGER",
        "CREATE PROPERTY books.price REAL",
        "CREATE CLASS persons EXTENDS VERTEX",
        "CREATE PROPERTY persons.name TEXT",
        "CREATE PROPERTY persons.age INTEGER",
        "CREATE CLASS authors EXTENDS EDGE",
        "CREATE PROPERTY authors.time_used UNSIGNED_INTEGER",
    ] {
        execute(txn, statement).unwrap();
    }
}

#[test]
fn create_vertex_and_select() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(&dir);
    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    seed_books(&mut txn);

    let created = execute(
        &mut txn,
        "CREATE VERTEX books SET title='Harry Potter', words=4242424242, pages=865, price=49.99",
    )
    .unwrap()
    .into_descriptors()
    .unwrap();
    assert_eq!(created.len(), 1);

    let rows = execute(&mut txn, "SELECT * FROM books")
        .unwrap()
        .into_result_set()
        .unwrap();
    assert_eq!(rows.len(), 1);
    let record = &rows[0].record;
    assert_eq!(record.get("title").unwrap().to_text().unwrap(), "Harry Potter");
    assert_eq!(
        record.get("words").unwrap().to_unsigned_big_int().unwrap(),
        4242424242
    );
    assert_eq!(record.get("pages").unwrap().to_int().unwrap(), 865);
    assert_eq!(record.get("price"), Some(&Value::Real(49.99)));

    // Projection produces synthetic rows.
    let rows = execute(&mut txn, "SELECT title, pages FROM books")
        .unwrap()
        .into_result_set()
        .unwrap();
    assert!(rows[0].descriptor.is_synthetic());
    assert_eq!(rows[0].record.get("title").unwrap().to_text().unwrap(), "Harry Potter");
    assert!(rows[0].record.get("price").is_none());

    // Synthetic columns project too.
    let rows = execute(&mut txn, "SELECT @recordId, @version FROM books")
        .unwrap()
        .into_result_set()
        .unwrap();
    assert_eq!(
        rows[0].record.get("@recordId").unwrap().to_text().unwrap(),
        created[0].rid.to_string()
    );
    txn.commit().unwrap();
}

#[test]
fn create_edge_from_rid_sets() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(&dir);
    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    seed_books(&mut txn);

    let v1 = execute(&mut txn, "CREATE VERTEX books SET title='b1'")
        .unwrap()
        .into_descriptors()
        .unwrap()[0];
    let v2 = execute(&mut txn, "CREATE VERTEX books SET title='b2'")
        .unwrap()
        .into_descriptors()
        .unwrap()[0];
    let p = execute(&mut txn, "CREATE VERTEX persons SET name='JK'")
        .unwrap()
        .into_descriptors()
        .unwrap()[0];

    let edges = execute(
        &mut txn,
        &format!("CREATE EDGE authors FROM ({v1}, {v2}) TO {p} SET time_used=365"),
    )
    .unwrap()
    .into_descriptors()
    .unwrap();
    assert_eq!(edges.len(), 2);

    let record = txn.fetch_record(&edges[0]).unwrap();
    assert_eq!(
        record.get("time_used").unwrap().to_unsigned_int().unwrap(),
        365
    );
    assert_eq!(txn.fetch_dst(&edges[1]).unwrap().rid, p.rid);
    txn.commit().unwrap();
}

#[test]
fn where_conditions() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(&dir);
    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    seed_books(&mut txn);

    for (name, age) in [("Sam", 30i64), ("Tom", 22), ("Sam", 41)] {
        execute(
            &mut txn,
            &format!("CREATE VERTEX persons SET name='{name}', age={age}"),
        )
        .unwrap();
    }
    execute(&mut txn, "CREATE VERTEX persons SET name='NoAge'").unwrap();

    let count = |txn: &mut nogdb_core::Txn<'_>, sql: &str| {
        execute(txn, sql).unwrap().into_result_set().unwrap().len()
    };

    assert_eq!(count(&mut txn, "SELECT FROM persons WHERE name='Sam'"), 2);
    assert_eq!(count(&mut txn, "SELECT FROM persons WHERE age > 25"), 2);
    assert_eq!(count(&mut txn, "SELECT FROM persons WHERE age >= 22 AND age <= 30"), 2);
    assert_eq!(count(&mut txn, "SELECT FROM persons WHERE age IS NULL"), 1);
    assert_eq!(count(&mut txn, "SELECT FROM persons WHERE age IS NOT NULL"), 3);
    assert_eq!(count(&mut txn, "SELECT FROM persons WHERE name LIKE 'S%'"), 2);
    assert_eq!(count(&mut txn, "SELECT FROM persons WHERE name LIKE '_om'"), 1);
    assert_eq!(count(&mut txn, "SELECT FROM persons WHERE age IN (22, 41)"), 2);
    assert_eq!(count(&mut txn, "SELECT FROM persons WHERE age BETWEEN 22 AND 30"), 2);
    assert_eq!(
        count(&mut txn, "SELECT FROM persons WHERE NOT (name='Sam' OR age=22)"),
        1
    );
    // Text against a number is false, never an error.
    assert_eq!(count(&mut txn, "SELECT FROM persons WHERE name = 100"), 0);
    assert_eq!(count(&mut txn, "SELECT FROM persons WHERE @className = 'persons'"), 4);
    assert_eq!(count(&mut txn, "SELECT FROM persons WHERE @version > 0"), 4);
    txn.commit().unwrap();
}

#[test]
fn count_skip_limit_group_by() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(&dir);
    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    seed_books(&mut txn);

    for (name, age) in [("Sam", 30i64), ("Tom", 22), ("Sam", 41)] {
        execute(
            &mut txn,
            &format!("CREATE VERTEX persons SET name='{name}', age={age}"),
        )
        .unwrap();
    }
    execute(&mut txn, "CREATE VERTEX persons SET name='NoAge'").unwrap();

    let rows = execute(&mut txn, "SELECT count(*) FROM persons")
        .unwrap()
        .into_result_set()
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].descriptor.is_synthetic());
    assert_eq!(
        rows[0].record.get("count").unwrap().to_unsigned_big_int().unwrap(),
        4
    );

    let rows = execute(&mut txn, "SELECT count('name'), count(age) FROM persons")
        .unwrap()
        .into_result_set()
        .unwrap();
    assert_eq!(
        rows[0].record.get("count").unwrap().to_unsigned_big_int().unwrap(),
        4
    );
    assert_eq!(
        rows[0].record.get("count2").unwrap().to_unsigned_big_int().unwrap(),
        3
    );

    let rows = execute(&mut txn, "SELECT count(*) FROM persons WHERE name='Sam'")
        .unwrap()
        .into_result_set()
        .unwrap();
    assert_eq!(
        rows[0].record.get("count").unwrap().to_unsigned_big_int().unwrap(),
        2
    );

    let rows = execute(&mut txn, "SELECT * FROM persons SKIP 1 LIMIT 2")
        .unwrap()
        .into_result_set()
        .unwrap();
    assert_eq!(rows.len(), 2);

    let rows = execute(&mut txn, "SELECT * FROM persons GROUP BY name")
        .unwrap()
        .into_result_set()
        .unwrap();
    // Sam, Tom, NoAge: one row per distinct name, the last one kept.
    assert_eq!(rows.len(), 3);
    let sam = rows
        .iter()
        .find(|r| r.record.get("name").unwrap().to_text().unwrap() == "Sam")
        .unwrap();
    assert_eq!(sam.record.get("age").unwrap().to_int().unwrap(), 41);
    txn.commit().unwrap();
}

#[test]
fn select_from_rid_and_expand() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(&dir);
    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    seed_books(&mut txn);

    let v1 = execute(&mut txn, "CREATE VERTEX books SET title='b1'")
        .unwrap()
        .into_descriptors()
        .unwrap()[0];
    let v2 = execute(&mut txn, "CREATE VERTEX books SET title='b2'")
        .unwrap()
        .into_descriptors()
        .unwrap()[0];
    let p = execute(&mut txn, "CREATE VERTEX persons SET name='JK'")
        .unwrap()
        .into_descriptors()
        .unwrap()[0];
    execute(&mut txn, &format!("CREATE EDGE authors FROM {v1} TO {p} SET time_used=10")).unwrap();
    execute(&mut txn, &format!("CREATE EDGE authors FROM {v2} TO {p} SET time_used=20")).unwrap();

    let rows = execute(&mut txn, &format!("SELECT FROM {v1}"))
        .unwrap()
        .into_result_set()
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].descriptor.rid, v1.rid);

    let rows = execute(&mut txn, &format!("SELECT FROM ({v1}, {v2})"))
        .unwrap()
        .into_result_set()
        .unwrap();
    assert_eq!(rows.len(), 2);

    // expand flattens walked records into real rows.
    let rows = execute(&mut txn, &format!("SELECT expand(out()) FROM {v1}"))
        .unwrap()
        .into_result_set()
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].descriptor.rid, p.rid);

    let rows = execute(&mut txn, &format!("SELECT expand(in('authors')) FROM {p}"))
        .unwrap()
        .into_result_set()
        .unwrap();
    assert_eq!(rows.len(), 2);

    let rows = execute(&mut txn, &format!("SELECT expand(outE()) FROM {v1}"))
        .unwrap()
        .into_result_set()
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].record.get("time_used").unwrap().to_unsigned_int().unwrap(),
        10
    );

    // A filtered edge step with a terminal vertex hop.
    let rows = execute(
        &mut txn,
        &format!("SELECT expand(inE()[time_used=20].outV()) FROM {p}"),
    )
    .unwrap()
    .into_result_set()
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].descriptor.rid, v2.rid);

    // Walk projection with a terminal property.
    let rows = execute(&mut txn, &format!("SELECT out()[0].name FROM {v1}"))
        .unwrap()
        .into_result_set()
        .unwrap();
    assert_eq!(rows[0].record.get("name").unwrap().to_text().unwrap(), "JK");

    let rows = execute(
        &mut txn,
        &format!("SELECT out()[0].name AS author_name FROM {v1}"),
    )
    .unwrap()
    .into_result_set()
    .unwrap();
    assert_eq!(
        rows[0].record.get("author_name").unwrap().to_text().unwrap(),
        "JK"
    );
    txn.commit().unwrap();
}

#[test]
fn update_and_delete() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(&dir);
    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();
    seed_books(&mut txn);

    let v1 = execute(&mut txn, "CREATE VERTEX books SET title='b1', pages=100")
        .unwrap()
        .into_descriptors()
        .unwrap()[0];
    execute(&mut txn, "CREATE VERTEX books SET title='b2', pages=200").unwrap();

    execute(&mut txn, "UPDATE books SET pages=150 WHERE title='b1'").unwrap();
    let record = txn.fetch_record(&v1).unwrap();
    assert_eq!(record.get("pages").unwrap().to_int().unwrap(), 150);
    // The untouched property survives a SQL update.
    assert_eq!(record.get("title").unwrap().to_text().unwrap(), "b1");
    assert_eq!(
        record.get("@version").unwrap().to_unsigned_big_int().unwrap(),
        2
    );

    execute(&mut txn, "DELETE VERTEX books WHERE title='b1'").unwrap();
    assert!(txn.fetch_record(&v1).is_err());
    let remaining = execute(&mut txn, "SELECT * FROM books")
        .unwrap()
        .into_result_set()
        .unwrap();
    assert_eq!(remaining.len(), 1);

    // DELETE VERTEX over an edge class is a type mismatch.
    let p = execute(&mut txn, "CREATE VERTEX persons SET name='x'")
        .unwrap()
        .into_descriptors()
        .unwrap()[0];
    let v2 = execute(&mut txn, "SELECT * FROM books")
        .unwrap()
        .into_result_set()
        .unwrap()[0]
        .descriptor;
    execute(&mut txn, &format!("CREATE EDGE authors FROM {v2} TO {p}")).unwrap();
    assert!(matches!(
        execute(&mut txn, "DELETE VERTEX authors"),
        Err(Error::ClassTypeMismatch(_))
    ));
    execute(&mut txn, "DELETE EDGE authors").unwrap();
    assert_eq!(
        execute(&mut txn, "SELECT count(*) FROM authors")
            .unwrap()
            .into_result_set()
            .unwrap()[0]
            .record
            .get("count")
            .unwrap()
            .to_unsigned_big_int()
            .unwrap(),
        0
    );
    txn.commit().unwrap();
}

#[test]
fn traverse_statement() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(&dir);
    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();

    execute(&mut txn, "CREATE CLASS node EXTENDS VERTEX").unwrap();
    execute(&mut txn, "CREATE PROPERTY node.name TEXT").unwrap();
    execute(&mut txn, "CREATE CLASS link EXTENDS EDGE").unwrap();

    let mut rids = Vec::new();
    for name in ["A", "B", "C"] {
        rids.push(
            execute(&mut txn, &format!("CREATE VERTEX node SET name='{name}'"))
                .unwrap()
                .into_descriptors()
                .unwrap()[0],
        );
    }
    execute(&mut txn, &format!("CREATE EDGE link FROM {} TO {}", rids[0], rids[1])).unwrap();
    execute(&mut txn, &format!("CREATE EDGE link FROM {} TO {}", rids[1], rids[2])).unwrap();

    let rows = execute(
        &mut txn,
        &format!("TRAVERSE out('link') FROM {} MINDEPTH 1 MAXDEPTH 2", rids[0]),
    )
    .unwrap()
    .into_result_set()
    .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].record.get("name").unwrap().to_text().unwrap(), "B");
    assert_eq!(rows[0].descriptor.depth, 1);
    assert_eq!(rows[1].record.get("name").unwrap().to_text().unwrap(), "C");
    assert_eq!(rows[1].descriptor.depth, 2);

    let rows = execute(
        &mut txn,
        &format!(
            "TRAVERSE in() FROM {} MAXDEPTH 5 STRATEGY DEPTH_FIRST",
            rids[2]
        ),
    )
    .unwrap()
    .into_result_set()
    .unwrap();
    assert_eq!(rows.len(), 3);
    txn.commit().unwrap();
}

#[test]
fn blob_literals() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(&dir);
    let mut txn = ctx.begin_txn(TxnMode::ReadWrite).unwrap();

    execute(&mut txn, "CREATE CLASS bin EXTENDS VERTEX").unwrap();
    execute(&mut txn, "CREATE PROPERTY bin.data BLOB").unwrap();
    let rdesc = execute(&mut txn, "CREATE VERTEX bin SET data=X'DEADBEEF'")
        .unwrap()
        .into_descriptors()
        .unwrap()[0];
    let record = txn.fetch_record(&rdesc).unwrap();
    assert_eq!(
        record.get("data").unwrap().as_blob().unwrap(),
        &[0xde, 0xad, 0xbe, 0xef]
    );
    txn.commit().unwrap();
}

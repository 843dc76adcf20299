//! Statement executor: lowers parsed statements onto the engine's
//! transaction API.

use nogdb_api::{
    ClassDescriptor, ClassType, PropertyDescriptor, RecordDescriptor, SYNTHETIC_CLASS_ID,
};
use nogdb_core::{
    Condition, Error, GraphFilter, Record, Result, ResultRow, ResultSet, Txn, Value,
};
use tracing::trace;

use crate::ast::*;

/// Outcome of one executed statement.
#[derive(Debug)]
pub enum SqlResult {
    Empty,
    Class(ClassDescriptor),
    Property(PropertyDescriptor),
    Descriptors(Vec<RecordDescriptor>),
    ResultSet(ResultSet),
}

impl SqlResult {
    pub fn into_result_set(self) -> Option<ResultSet> {
        match self {
            SqlResult::ResultSet(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn into_descriptors(self) -> Option<Vec<RecordDescriptor>> {
        match self {
            SqlResult::Descriptors(descriptors) => Some(descriptors),
            _ => None,
        }
    }
}

pub(crate) fn execute_statement(txn: &mut Txn<'_>, statement: Statement) -> Result<SqlResult> {
    trace!(?statement, "executing sql statement");
    match statement {
        Statement::CreateClass {
            name,
            extends,
            if_not_exists,
        } => {
            let created = match &extends {
                Extends::Vertex => txn.add_class(&name, ClassType::Vertex),
                Extends::Edge => txn.add_class(&name, ClassType::Edge),
                Extends::Class(parent) => txn.add_sub_class_of(parent, &name),
            };
            match created {
                Ok(descriptor) => Ok(SqlResult::Class(descriptor)),
                Err(Error::DuplicateClass(_)) if if_not_exists => {
                    Ok(SqlResult::Class(txn.get_class(&name)?))
                }
                Err(err) => Err(err),
            }
        }
        Statement::DropClass { name, if_exists } => match txn.drop_class(&name) {
            Ok(()) => Ok(SqlResult::Empty),
            Err(Error::ClassNotFound(_)) if if_exists => Ok(SqlResult::Empty),
            Err(err) => Err(err),
        },
        Statement::AlterClassName { class, new_name } => {
            txn.rename_class(&class, &new_name)?;
            Ok(SqlResult::Empty)
        }
        Statement::CreateProperty {
            class,
            name,
            property_type,
            if_not_exists,
        } => match txn.add_property(&class, &name, property_type) {
            Ok(descriptor) => Ok(SqlResult::Property(descriptor)),
            Err(Error::DuplicateProperty(_)) if if_not_exists => {
                let existing = txn
                    .get_properties(&class)?
                    .into_iter()
                    .find(|p| p.name == name)
                    .ok_or(Error::PropertyNotFound(name))?;
                Ok(SqlResult::Property(existing))
            }
            Err(err) => Err(err),
        },
        Statement::DropProperty {
            class,
            name,
            if_exists,
        } => match txn.drop_property(&class, &name) {
            Ok(()) => Ok(SqlResult::Empty),
            Err(Error::PropertyNotFound(_)) if if_exists => Ok(SqlResult::Empty),
            Err(err) => Err(err),
        },
        Statement::AlterPropertyName {
            class,
            property,
            new_name,
        } => {
            txn.rename_property(&class, &property, &new_name)?;
            Ok(SqlResult::Empty)
        }
        Statement::CreateIndex {
            class,
            property,
            unique,
        } => {
            txn.add_index(&class, &property, unique)?;
            Ok(SqlResult::Empty)
        }
        Statement::DropIndex { class, property } => {
            txn.drop_index(&class, &property)?;
            Ok(SqlResult::Empty)
        }
        Statement::CreateVertex { class, set } => {
            let record = record_from_set(&set);
            let descriptor = txn.add_vertex(&class, record)?;
            Ok(SqlResult::Descriptors(vec![descriptor]))
        }
        Statement::CreateEdge {
            class,
            from,
            to,
            set,
        } => {
            let record = record_from_set(&set);
            let mut descriptors = Vec::new();
            for src in &from {
                for dst in &to {
                    descriptors.push(txn.add_edge(
                        &class,
                        &RecordDescriptor::from(*src),
                        &RecordDescriptor::from(*dst),
                        record.clone(),
                    )?);
                }
            }
            Ok(SqlResult::Descriptors(descriptors))
        }
        Statement::Select {
            projection,
            source,
            condition,
            group_by,
            skip,
            limit,
        } => {
            let rows = source_rows(txn, &source, condition.as_ref())?;
            let rows = match group_by {
                Some(prop) => group_last(rows, &prop),
                None => rows,
            };
            let rows = project(txn, rows, &projection)?;
            let rows: ResultSet = rows
                .into_iter()
                .skip(skip.unwrap_or(0) as usize)
                .take(limit.map(|l| l as usize).unwrap_or(usize::MAX))
                .collect();
            Ok(SqlResult::ResultSet(rows))
        }
        Statement::Update {
            target,
            set,
            condition,
        } => {
            let rows = source_rows(txn, &target, condition.as_ref())?;
            let mut updated = Vec::new();
            for row in rows {
                let mut record = row.record.clone();
                for (name, literal) in &set {
                    match literal.clone().into_value() {
                        Some(value) => {
                            record.set(name.clone(), value);
                        }
                        None => {
                            record.unset(name);
                        }
                    }
                }
                txn.update(&row.descriptor, record)?;
                updated.push(row.descriptor);
            }
            Ok(SqlResult::Descriptors(updated))
        }
        Statement::DeleteVertex { target, condition } => {
            delete_rows(txn, &target, condition.as_ref(), ClassType::Vertex)
        }
        Statement::DeleteEdge { target, condition } => {
            delete_rows(txn, &target, condition.as_ref(), ClassType::Edge)
        }
        Statement::Traverse {
            direction,
            classes,
            from,
            min_depth,
            max_depth,
            strategy,
        } => {
            let mut sources = from.into_iter().map(RecordDescriptor::from);
            let first = sources
                .next()
                .expect("parser guarantees at least one source");
            let mut builder = match direction {
                TraverseDirection::In => txn.traverse_in(&first),
                TraverseDirection::Out => txn.traverse_out(&first),
                TraverseDirection::All => txn.traverse(&first),
            };
            for source in sources {
                builder = builder.add_source(&source);
            }
            if !classes.is_empty() {
                builder = builder.where_edge(GraphFilter::new().only(classes));
            }
            let rows = builder.depth(min_depth, max_depth).strategy(strategy).get()?;
            Ok(SqlResult::ResultSet(rows))
        }
    }
}

fn record_from_set(set: &[(String, Literal)]) -> Record {
    let mut record = Record::new();
    for (name, literal) in set {
        if let Some(value) = literal.clone().into_value() {
            record.set(name.clone(), value);
        }
    }
    record
}

/// Materialises and filters the rows a statement reads from.
fn source_rows(txn: &Txn<'_>, source: &Source, condition: Option<&CondExpr>) -> Result<ResultSet> {
    match source {
        Source::Class(name) => {
            let mut builder = txn.find(name);
            if let Some(cond) = condition {
                builder = builder.where_(lower_condition(cond));
            }
            builder.get()
        }
        Source::Rids(rids) => {
            let lowered = condition.map(lower_condition);
            let mut rows = Vec::new();
            for rid in rids {
                let descriptor = RecordDescriptor::from(*rid);
                let record = txn.fetch_record(&descriptor)?;
                if let Some(cond) = &lowered {
                    if !cond.eval(&record) {
                        continue;
                    }
                }
                rows.push(ResultRow { descriptor, record });
            }
            Ok(rows)
        }
    }
}

fn delete_rows(
    txn: &mut Txn<'_>,
    target: &Source,
    condition: Option<&CondExpr>,
    expected: ClassType,
) -> Result<SqlResult> {
    let rows = source_rows(txn, target, condition)?;
    for row in &rows {
        let class = txn.get_class_by_id(row.descriptor.rid.class_id)?;
        if class.class_type != expected {
            return Err(Error::ClassTypeMismatch(format!(
                "{} is not a {} class",
                class.name,
                match expected {
                    ClassType::Vertex => "vertex",
                    ClassType::Edge => "edge",
                }
            )));
        }
    }
    for row in &rows {
        txn.destroy(&row.descriptor)?;
    }
    Ok(SqlResult::Empty)
}

/// Lowers the parsed condition tree to the engine's condition algebra.
fn lower_condition(cond: &CondExpr) -> Condition {
    match cond {
        CondExpr::Cmp { prop, op, value } => {
            let entry = Condition::prop(prop.clone());
            match value.clone().into_value() {
                Some(value) => match op {
                    CmpOp::Eq => entry.eq(value),
                    CmpOp::Ne => entry.ne(value),
                    CmpOp::Lt => entry.lt(value),
                    CmpOp::Le => entry.le(value),
                    CmpOp::Gt => entry.gt(value),
                    CmpOp::Ge => entry.ge(value),
                },
                // `= NULL` reads as an unset check; the other operators
                // never match a NULL literal.
                None => match op {
                    CmpOp::Eq => entry.is_null(),
                    CmpOp::Ne => !Condition::prop(prop.clone()).is_null(),
                    _ => never_matches(prop),
                },
            }
        }
        CondExpr::IsNull { prop, negated } => {
            let atom = Condition::prop(prop.clone()).is_null();
            if *negated { !atom } else { atom }
        }
        CondExpr::Like { prop, pattern } => Condition::prop(prop.clone()).like(pattern.clone()),
        CondExpr::InList { prop, values } => {
            let values: Vec<Value> = values
                .iter()
                .filter_map(|v| v.clone().into_value())
                .collect();
            Condition::prop(prop.clone()).any_of(values)
        }
        CondExpr::Between { prop, low, high } => {
            match (low.clone().into_value(), high.clone().into_value()) {
                (Some(low), Some(high)) => Condition::prop(prop.clone()).between(low, high),
                _ => never_matches(prop),
            }
        }
        CondExpr::Not(inner) => !lower_condition(inner),
        CondExpr::And(l, r) => lower_condition(l) & lower_condition(r),
        CondExpr::Or(l, r) => lower_condition(l) | lower_condition(r),
    }
}

fn never_matches(prop: &str) -> Condition {
    Condition::prop(prop.to_owned()).is_null() & !Condition::prop(prop.to_owned()).is_null()
}

fn group_last(rows: ResultSet, prop: &str) -> ResultSet {
    let mut keyed: Vec<(Option<Value>, ResultRow)> = Vec::new();
    for row in rows {
        let key = row.record.get(prop).cloned();
        if let Some(slot) = keyed.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = row;
        } else {
            keyed.push((key, row));
        }
    }
    keyed.into_iter().map(|(_, row)| row).collect()
}

/// Applies the projection list, turning source rows into output rows.
fn project(txn: &Txn<'_>, rows: ResultSet, projection: &[ProjItem]) -> Result<ResultSet> {
    if projection.is_empty() || projection.iter().all(|p| matches!(p.expr, ProjExpr::Star)) {
        return Ok(rows);
    }

    // Aggregate mode: every count argument becomes one column of a
    // single synthetic row.
    if projection.iter().any(|p| matches!(p.expr, ProjExpr::Count(_))) {
        let mut record = Record::new();
        let mut column = 0usize;
        for item in projection {
            let ProjExpr::Count(args) = &item.expr else {
                continue;
            };
            for arg in args {
                let total = match arg {
                    CountArg::Star => rows.len() as u64,
                    CountArg::Property(name) => {
                        rows.iter().filter(|r| r.record.get(name).is_some()).count() as u64
                    }
                };
                let name = match (&item.alias, column) {
                    (Some(alias), _) => alias.clone(),
                    (None, 0) => "count".to_owned(),
                    (None, n) => format!("count{}", n + 1),
                };
                record.set(name, Value::UnsignedBigInt(total));
                column += 1;
            }
        }
        return Ok(vec![ResultRow {
            descriptor: RecordDescriptor::new(SYNTHETIC_CLASS_ID, 0),
            record,
        }]);
    }

    // expand(...) replaces each source row by its walked records.
    if let [item] = projection {
        if let ProjExpr::Expand(chain) = &item.expr {
            let mut out = Vec::new();
            for row in &rows {
                for descriptor in eval_walk(txn, &row.descriptor, chain)? {
                    let record = txn.fetch_record(&descriptor)?;
                    out.push(ResultRow { descriptor, record });
                }
            }
            return Ok(out);
        }
    }

    // Column projection: one synthetic row per source row.
    let mut out = Vec::new();
    for (position, row) in rows.iter().enumerate() {
        let mut record = Record::new();
        for item in projection {
            match &item.expr {
                ProjExpr::Star => {
                    for (name, value) in row.record.properties() {
                        record.set(name.to_owned(), value.clone());
                    }
                }
                ProjExpr::Property(name) => {
                    let column = item.alias.clone().unwrap_or_else(|| name.clone());
                    if let Some(value) = row.record.get(name) {
                        record.set(column, value.clone());
                    }
                }
                ProjExpr::Walk { chain, prop } => {
                    let targets = eval_walk(txn, &row.descriptor, chain)?;
                    let column = item
                        .alias
                        .clone()
                        .or_else(|| prop.clone())
                        .unwrap_or_else(|| "expand".to_owned());
                    match prop {
                        Some(prop) => {
                            if let Some(target) = targets.first() {
                                let fetched = txn.fetch_record(target)?;
                                if let Some(value) = fetched.get(prop) {
                                    record.set(column, value.clone());
                                }
                            }
                        }
                        None => {
                            if let Some(target) = targets.first() {
                                record.set(column, Value::Text(target.rid.to_string()));
                            }
                        }
                    }
                }
                ProjExpr::Expand(_) => {
                    return Err(Error::SyntaxError {
                        message: "expand() cannot be mixed with other projections".to_owned(),
                        line: 0,
                        column: 0,
                    });
                }
                ProjExpr::Count(_) => unreachable!("aggregate mode handled above"),
            }
        }
        out.push(ResultRow {
            descriptor: RecordDescriptor::new(SYNTHETIC_CLASS_ID, position as u64),
            record,
        });
    }
    Ok(out)
}

/// Walks a chain of steps from one record, deduplicating per step.
fn eval_walk(
    txn: &Txn<'_>,
    start: &RecordDescriptor,
    chain: &WalkChain,
) -> Result<Vec<RecordDescriptor>> {
    let mut current = vec![*start];
    for step in &chain.steps {
        let mut next: Vec<RecordDescriptor> = Vec::new();
        for descriptor in &current {
            for target in eval_step(txn, descriptor, step)? {
                if !next.iter().any(|d| d.rid == target.rid) {
                    next.push(target);
                }
            }
        }
        if let Some((prop, literal)) = &step.prop_filter {
            let Some(wanted) = literal.clone().into_value() else {
                next.clear();
                current = next;
                continue;
            };
            let mut kept = Vec::new();
            for descriptor in next {
                let record = txn.fetch_record(&descriptor)?;
                let matches = record
                    .get(prop)
                    .and_then(|v| v.compare(&wanted))
                    .is_some_and(|o| o == std::cmp::Ordering::Equal);
                if matches {
                    kept.push(descriptor);
                }
            }
            next = kept;
        }
        if let Some(index) = step.index {
            next = next.get(index).copied().into_iter().collect();
        }
        current = next;
    }
    Ok(current)
}

fn eval_step(
    txn: &Txn<'_>,
    descriptor: &RecordDescriptor,
    step: &WalkStep,
) -> Result<Vec<RecordDescriptor>> {
    let filter = if step.classes.is_empty() {
        GraphFilter::new()
    } else {
        GraphFilter::new().only(step.classes.clone())
    };
    Ok(match step.kind {
        WalkKind::Out => {
            let mut vertices = Vec::new();
            for edge in txn.get_out_edges(descriptor, &filter)? {
                vertices.push(txn.fetch_dst(&edge)?);
            }
            vertices
        }
        WalkKind::In => {
            let mut vertices = Vec::new();
            for edge in txn.get_in_edges(descriptor, &filter)? {
                vertices.push(txn.fetch_src(&edge)?);
            }
            vertices
        }
        WalkKind::Both => {
            let mut vertices = Vec::new();
            for edge in txn.get_out_edges(descriptor, &filter)? {
                vertices.push(txn.fetch_dst(&edge)?);
            }
            for edge in txn.get_in_edges(descriptor, &filter)? {
                vertices.push(txn.fetch_src(&edge)?);
            }
            vertices
        }
        WalkKind::OutE => txn.get_out_edges(descriptor, &filter)?,
        WalkKind::InE => txn.get_in_edges(descriptor, &filter)?,
        WalkKind::BothE => txn.get_all_edges(descriptor, &filter)?,
        WalkKind::OutV => vec![txn.fetch_src(descriptor)?],
        WalkKind::InV => vec![txn.fetch_dst(descriptor)?],
        WalkKind::BothV => {
            let (src, dst) = txn.fetch_src_dst(descriptor)?;
            vec![src, dst]
        }
    })
}

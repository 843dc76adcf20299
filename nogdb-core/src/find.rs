//! Class scans and index-assisted lookup.

use nogdb_api::RecordDescriptor;
use tracing::trace;

use crate::condition::Condition;
use crate::error::Result;
use crate::index;
use crate::record;
use crate::result::{ResultRow, ResultSet, ResultSetCursor};
use crate::txn::Txn;

/// Builder for `find` / `find_sub_class_of` queries.
///
/// Scan order is positional within a class and DFS pre-order across
/// subclasses. `skip` and `limit` apply after filtering, in scan order.
pub struct FindBuilder<'t, 'ctx> {
    txn: &'t Txn<'ctx>,
    class: String,
    subclasses: bool,
    condition: Option<Condition>,
    use_index: bool,
    skip: Option<usize>,
    limit: Option<usize>,
}

impl<'t, 'ctx> FindBuilder<'t, 'ctx> {
    pub(crate) fn new(txn: &'t Txn<'ctx>, class: &str, subclasses: bool) -> Self {
        Self {
            txn,
            class: class.to_owned(),
            subclasses,
            condition: None,
            use_index: false,
            skip: None,
            limit: None,
        }
    }

    /// Keeps only rows satisfying `condition`.
    pub fn where_(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Answers a single-equality condition through the index when one
    /// covers the property; any other shape falls back to the scan.
    pub fn indexed(mut self) -> Self {
        self.use_index = true;
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn get(self) -> Result<ResultSet> {
        let rows = self.execute()?;
        Ok(rows)
    }

    pub fn get_cursor(self) -> Result<ResultSetCursor<'t, 'ctx>> {
        let txn = self.txn;
        let rows = self.execute()?;
        let descriptors = rows.into_iter().map(|row| row.descriptor).collect();
        Ok(ResultSetCursor::new(txn, descriptors, false))
    }

    pub fn count(self) -> Result<u64> {
        Ok(self.execute()?.len() as u64)
    }

    fn execute(self) -> Result<ResultSet> {
        let view = self.txn.store_view()?;
        let class = view.schema.expect_class(&self.class)?;
        let scan_classes = if self.subclasses {
            view.schema.self_and_descendants(class.id)
        } else {
            vec![class.id]
        };

        let mut rows: ResultSet = Vec::new();

        let index_hit = if self.use_index {
            self.condition
                .as_ref()
                .and_then(|cond| cond.as_indexable_eq())
                .and_then(|(prop, value)| {
                    let meta = view.schema.resolve_property(class.id, prop)?;
                    let idx = view.schema.index_on(class.id, meta.id)?;
                    Some((idx, value.coerce_to(meta.property_type)))
                })
        } else {
            None
        };

        match index_hit {
            Some((idx, Ok(value))) => {
                trace!(class = %self.class, index = idx.id, "index-assisted find");
                for rid in index::lookup_eq(view.inner, &idx, &scan_classes, &value)? {
                    let descriptor = RecordDescriptor::from(rid);
                    let record = record::fetch(view, &descriptor, false)?;
                    rows.push(ResultRow { descriptor, record });
                }
            }
            // The literal cannot be represented in the property's type,
            // so nothing can match.
            Some((_, Err(_))) => {}
            None => {
                for class_id in scan_classes {
                    let meta = view.schema.expect_class_id(class_id)?;
                    for (position, raw) in view.inner.data_scan(class_id)? {
                        let (descriptor, record) =
                            record::decode_row(view, meta, position, &raw, false)?;
                        if let Some(condition) = &self.condition {
                            if !condition.eval(&record) {
                                continue;
                            }
                        }
                        rows.push(ResultRow { descriptor, record });
                    }
                }
            }
        }

        let skip = self.skip.unwrap_or(0);
        let rows = rows
            .into_iter()
            .skip(skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(rows)
    }
}

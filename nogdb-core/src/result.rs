//! Materialised query results and the bidirectional cursor.

use nogdb_api::RecordDescriptor;

use crate::error::Result;
use crate::txn::Txn;
use crate::value::Record;

/// One row of a result set: where the record lives and its decoded
/// properties (synthetic columns included).
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub descriptor: RecordDescriptor,
    pub record: Record,
}

/// An eagerly materialised, ordered sequence of rows.
pub type ResultSet = Vec<ResultRow>;

/// A bidirectional cursor over record descriptors.
///
/// The cursor holds descriptors only; `record()` fetches the row through
/// the owning transaction on demand. It starts before the first element.
pub struct ResultSetCursor<'t, 'ctx> {
    txn: &'t Txn<'ctx>,
    descriptors: Vec<RecordDescriptor>,
    position: Option<usize>,
    with_depth: bool,
}

impl<'t, 'ctx> ResultSetCursor<'t, 'ctx> {
    pub(crate) fn new(
        txn: &'t Txn<'ctx>,
        descriptors: Vec<RecordDescriptor>,
        with_depth: bool,
    ) -> Self {
        Self {
            txn,
            descriptors,
            position: None,
            with_depth,
        }
    }

    /// Moves to the first row. Returns false on an empty result.
    pub fn first(&mut self) -> bool {
        if self.descriptors.is_empty() {
            false
        } else {
            self.position = Some(0);
            true
        }
    }

    /// Moves to the last row. Returns false on an empty result.
    pub fn last(&mut self) -> bool {
        if self.descriptors.is_empty() {
            false
        } else {
            self.position = Some(self.descriptors.len() - 1);
            true
        }
    }

    /// Advances the cursor; from the start position this lands on the
    /// first row. Returns false (without moving) when exhausted.
    pub fn next(&mut self) -> bool {
        let candidate = match self.position {
            None => 0,
            Some(at) => at + 1,
        };
        if candidate < self.descriptors.len() {
            self.position = Some(candidate);
            true
        } else {
            false
        }
    }

    /// Steps back one row. Returns false at the first row.
    pub fn previous(&mut self) -> bool {
        match self.position {
            Some(at) if at > 0 => {
                self.position = Some(at - 1);
                true
            }
            _ => false,
        }
    }

    /// Jumps to row `index`. Returns false (without moving) when out of
    /// range.
    pub fn to(&mut self, index: usize) -> bool {
        if index < self.descriptors.len() {
            self.position = Some(index);
            true
        } else {
            false
        }
    }

    pub fn has_at(&self, index: usize) -> bool {
        index < self.descriptors.len()
    }

    pub fn size(&self) -> usize {
        self.descriptors.len()
    }

    pub fn count(&self) -> usize {
        self.size()
    }

    pub fn empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptor under the cursor, if positioned.
    pub fn descriptor(&self) -> Option<&RecordDescriptor> {
        self.position.map(|at| &self.descriptors[at])
    }

    /// Fetches the row under the cursor through the transaction.
    pub fn record(&self) -> Result<Option<ResultRow>> {
        match self.descriptor() {
            Some(descriptor) => {
                let record = if self.with_depth {
                    self.txn.fetch_record_at_depth(descriptor)?
                } else {
                    self.txn.fetch_record(descriptor)?
                };
                Ok(Some(ResultRow {
                    descriptor: *descriptor,
                    record,
                }))
            }
            None => Ok(None),
        }
    }

    /// The remaining descriptors, in order, without moving the cursor.
    pub fn descriptors(&self) -> &[RecordDescriptor] {
        &self.descriptors
    }
}

//! Statement AST produced by the parser and consumed by the executor.

use nogdb_api::{PropertyType, RecordId};
use nogdb_core::{TraverseStrategy, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Rid(RecordId),
    Null,
}

impl Literal {
    pub fn into_value(self) -> Option<Value> {
        Some(match self {
            Literal::Integer(v) => Value::BigInt(v),
            Literal::Real(v) => Value::Real(v),
            Literal::Text(v) => Value::Text(v),
            Literal::Blob(v) => Value::Blob(v),
            Literal::Rid(rid) => Value::Text(rid.to_string()),
            Literal::Null => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Condition expression; lowered to `nogdb_core::Condition` at execution.
#[derive(Debug, Clone, PartialEq)]
pub enum CondExpr {
    Cmp {
        prop: String,
        op: CmpOp,
        value: Literal,
    },
    IsNull {
        prop: String,
        negated: bool,
    },
    Like {
        prop: String,
        pattern: String,
    },
    InList {
        prop: String,
        values: Vec<Literal>,
    },
    Between {
        prop: String,
        low: Literal,
        high: Literal,
    },
    Not(Box<CondExpr>),
    And(Box<CondExpr>, Box<CondExpr>),
    Or(Box<CondExpr>, Box<CondExpr>),
}

/// What a statement reads from: a class table or explicit records.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Class(String),
    Rids(Vec<RecordId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkKind {
    Out,
    In,
    Both,
    OutE,
    InE,
    BothE,
    OutV,
    InV,
    BothV,
}

/// One step of a walk expression, e.g. `out('eA')[0][p='x']`.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkStep {
    pub kind: WalkKind,
    pub classes: Vec<String>,
    pub index: Option<usize>,
    pub prop_filter: Option<(String, Literal)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkChain {
    pub steps: Vec<WalkStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjExpr {
    /// `*`
    Star,
    /// A property or synthetic column name.
    Property(String),
    /// `count(*)`, `count(p)`, ...: one argument per column.
    Count(Vec<CountArg>),
    /// `expand(walk)`: replaces rows by the walked records.
    Expand(WalkChain),
    /// A walk chain with an optional terminal property projection.
    Walk {
        chain: WalkChain,
        prop: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CountArg {
    Star,
    Property(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjItem {
    pub expr: ProjExpr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraverseDirection {
    In,
    Out,
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateClass {
        name: String,
        extends: Extends,
        if_not_exists: bool,
    },
    DropClass {
        name: String,
        if_exists: bool,
    },
    AlterClassName {
        class: String,
        new_name: String,
    },
    CreateProperty {
        class: String,
        name: String,
        property_type: PropertyType,
        if_not_exists: bool,
    },
    DropProperty {
        class: String,
        name: String,
        if_exists: bool,
    },
    AlterPropertyName {
        class: String,
        property: String,
        new_name: String,
    },
    CreateIndex {
        class: String,
        property: String,
        unique: bool,
    },
    DropIndex {
        class: String,
        property: String,
    },
    CreateVertex {
        class: String,
        set: Vec<(String, Literal)>,
    },
    CreateEdge {
        class: String,
        from: Vec<RecordId>,
        to: Vec<RecordId>,
        set: Vec<(String, Literal)>,
    },
    Select {
        projection: Vec<ProjItem>,
        source: Source,
        condition: Option<CondExpr>,
        group_by: Option<String>,
        skip: Option<u64>,
        limit: Option<u64>,
    },
    Update {
        target: Source,
        set: Vec<(String, Literal)>,
        condition: Option<CondExpr>,
    },
    DeleteVertex {
        target: Source,
        condition: Option<CondExpr>,
    },
    DeleteEdge {
        target: Source,
        condition: Option<CondExpr>,
    },
    Traverse {
        direction: TraverseDirection,
        classes: Vec<String>,
        from: Vec<RecordId>,
        min_depth: u32,
        max_depth: u32,
        strategy: TraverseStrategy,
    },
}

/// What `CREATE CLASS ... EXTENDS` names: a base kind or a super class.
#[derive(Debug, Clone, PartialEq)]
pub enum Extends {
    Vertex,
    Edge,
    Class(String),
}

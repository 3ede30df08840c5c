//! Predicate AST for WHERE and HAVING clauses.
//!
//! Predicates are built by the condition helpers and the permission filter,
//! and turned into SQL text only by [`SqlWriter`](super::SqlWriter).

use monapi_proto::Value;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// SQL operator text.
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Right- or left-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Column reference or aggregate expression, rendered verbatim.
    Column(String),
    /// Integer literal, rendered inline.
    Int(i64),
    /// Bound parameter.
    Param(Value),
}

/// A boolean SQL condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Always true (`1=1`).
    True,
    /// Always false (`1=0`).
    False,
    /// Binary comparison.
    Compare {
        /// Left operand.
        left: Operand,
        /// Operator.
        op: CompareOp,
        /// Right operand.
        right: Operand,
    },
    /// Integer set membership with inline literals.
    InInts {
        /// Column reference.
        column: String,
        /// Values; never empty.
        values: Vec<i64>,
        /// Render as `NOT IN`.
        negated: bool,
    },
    /// String set membership with bound parameters.
    InStrings {
        /// Column reference.
        column: String,
        /// Values; never empty.
        values: Vec<String>,
        /// Render as `NOT IN`.
        negated: bool,
    },
    /// `LIKE` match with `!` as the escape character.
    Like {
        /// Column reference.
        column: String,
        /// Complete pattern including `%` wildcards.
        pattern: String,
        /// Compare `UPPER(column)`.
        upper: bool,
        /// Render as `NOT LIKE`.
        negated: bool,
    },
    /// `IS NULL` / `IS NOT NULL`.
    IsNull {
        /// Column reference.
        column: String,
        /// Render as `IS NOT NULL`.
        negated: bool,
    },
    /// Correlated existence check.
    Exists(Box<SubQuery>),
    /// `column IN (SELECT ...)`.
    InSubquery {
        /// Column reference.
        column: String,
        /// Subquery returning one column.
        query: Box<SubQuery>,
    },
    /// Conjunction.
    And(Vec<Predicate>),
    /// Disjunction.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
}

impl Predicate {
    /// `left = right` between two columns.
    pub fn columns_eq(left: impl Into<String>, right: impl Into<String>) -> Self {
        Predicate::Compare {
            left: Operand::Column(left.into()),
            op: CompareOp::Eq,
            right: Operand::Column(right.into()),
        }
    }

    /// Compare a column with an inline integer.
    pub fn int(column: impl Into<String>, op: CompareOp, value: i64) -> Self {
        Predicate::Compare {
            left: Operand::Column(column.into()),
            op,
            right: Operand::Int(value),
        }
    }

    /// Compare a column with a bound parameter.
    pub fn param(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            left: Operand::Column(column.into()),
            op,
            right: Operand::Param(value.into()),
        }
    }

    /// `column IS NULL`.
    pub fn is_null(column: impl Into<String>) -> Self {
        Predicate::IsNull {
            column: column.into(),
            negated: false,
        }
    }

    /// Existence subquery.
    pub fn exists(query: SubQuery) -> Self {
        Predicate::Exists(Box::new(query))
    }

    /// Conjunction that collapses trivial cases and flattens nested `And`.
    pub fn and(parts: Vec<Predicate>) -> Self {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Predicate::True => {}
                Predicate::False => return Predicate::False,
                Predicate::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::True,
            1 => flat.remove(0),
            _ => Predicate::And(flat),
        }
    }

    /// Disjunction that collapses trivial cases and flattens nested `Or`.
    pub fn or(parts: Vec<Predicate>) -> Self {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Predicate::False => {}
                Predicate::True => return Predicate::True,
                Predicate::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::False,
            1 => flat.remove(0),
            _ => Predicate::Or(flat),
        }
    }

    /// Negation, folding constants.
    pub fn negate(self) -> Self {
        match self {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }
}

/// A join inside a subquery.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Table name.
    pub table: String,
    /// Table alias.
    pub alias: String,
    /// Join condition.
    pub on: Predicate,
    /// Render as `LEFT JOIN`.
    pub left: bool,
}

/// A nested SELECT used by `EXISTS` and `IN` predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuery {
    /// Selected expression.
    pub select: String,
    /// `table alias` entries, comma-joined.
    pub from: Vec<String>,
    /// Joins after the FROM list.
    pub joins: Vec<Join>,
    /// WHERE condition.
    pub filter: Predicate,
    /// GROUP BY expressions.
    pub group_by: Vec<String>,
    /// HAVING condition.
    pub having: Option<Predicate>,
}

impl SubQuery {
    /// Start a subquery selecting `expr` from one table.
    pub fn select(expr: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            select: expr.into(),
            from: vec![from.into()],
            joins: Vec::new(),
            filter: Predicate::True,
            group_by: Vec::new(),
            having: None,
        }
    }

    /// Add another FROM entry.
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.from.push(table.into());
        self
    }

    /// Add an inner join.
    pub fn join(mut self, table: impl Into<String>, alias: impl Into<String>, on: Predicate) -> Self {
        self.joins.push(Join {
            table: table.into(),
            alias: alias.into(),
            on,
            left: false,
        });
        self
    }

    /// Add a left join.
    pub fn left_join(
        mut self,
        table: impl Into<String>,
        alias: impl Into<String>,
        on: Predicate,
    ) -> Self {
        self.joins.push(Join {
            table: table.into(),
            alias: alias.into(),
            on,
            left: true,
        });
        self
    }

    /// Set the WHERE condition.
    pub fn filter(mut self, filter: Predicate) -> Self {
        self.filter = filter;
        self
    }

    /// Add a GROUP BY expression.
    pub fn group_by(mut self, expr: impl Into<String>) -> Self {
        self.group_by.push(expr.into());
        self
    }

    /// Set the HAVING condition.
    pub fn having(mut self, having: Predicate) -> Self {
        self.having = Some(having);
        self
    }
}

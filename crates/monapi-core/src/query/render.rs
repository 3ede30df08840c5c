//! Single renderer from query IR to SQL text plus bound parameters.

use super::parts::QueryParts;
use super::predicate::{Operand, Predicate, SubQuery};
use monapi_proto::Value;

/// Escape character used by every rendered `LIKE`.
pub const LIKE_ESCAPE: char = '!';

/// Rendered SQL with positional `?` parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sql {
    /// Statement text.
    pub text: String,
    /// Parameters in placeholder order.
    pub params: Vec<Value>,
}

impl Sql {
    /// Statement without parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Statement with parameters.
    pub fn with_params(text: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            text: text.into(),
            params,
        }
    }
}

impl std::fmt::Display for Sql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Incremental SQL writer.
#[derive(Debug, Default)]
pub struct SqlWriter {
    text: String,
    params: Vec<Value>,
}

impl SqlWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw text.
    pub fn push(&mut self, text: &str) -> &mut Self {
        self.text.push_str(text);
        self
    }

    /// Append a `?` placeholder bound to `value`.
    pub fn bind(&mut self, value: Value) -> &mut Self {
        self.text.push('?');
        self.params.push(value);
        self
    }

    /// Finish writing.
    pub fn finish(self) -> Sql {
        Sql {
            text: self.text,
            params: self.params,
        }
    }

    /// Render a complete SELECT statement from query parts.
    pub fn select(parts: &QueryParts) -> Sql {
        let mut w = SqlWriter::new();
        w.push("SELECT ");
        if parts.needs_distinct() {
            w.push("DISTINCT ");
        }
        let columns: Vec<&str> = parts.select.values().map(String::as_str).collect();
        w.push(&columns.join(","));

        w.push(" FROM ");
        let tables: Vec<&str> = parts.from.values().map(String::as_str).collect();
        w.push(&tables.join(","));

        for join in parts.left_join.values() {
            w.push(" LEFT JOIN ")
                .push(&join.table)
                .push(" ")
                .push(&join.alias)
                .push(" ON ");
            w.predicate(&join.on);
        }

        let filters: Vec<&Predicate> = parts
            .filter
            .values()
            .filter(|p| **p != Predicate::True)
            .collect();
        if !filters.is_empty() {
            w.push(" WHERE ");
            for (i, predicate) in filters.into_iter().enumerate() {
                if i > 0 {
                    w.push(" AND ");
                }
                w.predicate(predicate);
            }
        }

        if !parts.group.is_empty() {
            w.push(" GROUP BY ").push(&parts.group.join(","));
        }
        if !parts.order.is_empty() {
            w.push(" ORDER BY ").push(&parts.order.join(","));
        }
        if let Some(limit) = parts.limit {
            w.push(&format!(" LIMIT {}", limit));
        }
        w.finish()
    }

    /// Append a predicate.
    pub fn predicate(&mut self, predicate: &Predicate) -> &mut Self {
        match predicate {
            Predicate::True => {
                self.push("1=1");
            }
            Predicate::False => {
                self.push("1=0");
            }
            Predicate::Compare { left, op, right } => {
                self.operand(left);
                self.push(op.as_sql());
                self.operand(right);
            }
            Predicate::InInts {
                column,
                values,
                negated,
            } => {
                let list: Vec<String> = values.iter().map(i64::to_string).collect();
                self.push(column)
                    .push(if *negated { " NOT IN (" } else { " IN (" })
                    .push(&list.join(","))
                    .push(")");
            }
            Predicate::InStrings {
                column,
                values,
                negated,
            } => {
                self.push(column)
                    .push(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(",");
                    }
                    self.bind(Value::String(value.clone()));
                }
                self.push(")");
            }
            Predicate::Like {
                column,
                pattern,
                upper,
                negated,
            } => {
                if *upper {
                    self.push("UPPER(").push(column).push(")");
                } else {
                    self.push(column);
                }
                self.push(if *negated { " NOT LIKE " } else { " LIKE " });
                self.bind(Value::String(pattern.clone()));
                self.push(&format!(" ESCAPE '{}'", LIKE_ESCAPE));
            }
            Predicate::IsNull { column, negated } => {
                self.push(column)
                    .push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Predicate::Exists(query) => {
                self.push("EXISTS (");
                self.subquery(query);
                self.push(")");
            }
            Predicate::InSubquery { column, query } => {
                self.push(column).push(" IN (");
                self.subquery(query);
                self.push(")");
            }
            Predicate::And(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        self.push(" AND ");
                    }
                    self.predicate(part);
                }
            }
            Predicate::Or(parts) => {
                if parts.len() == 1 {
                    self.predicate(&parts[0]);
                } else {
                    self.push("(");
                    for (i, part) in parts.iter().enumerate() {
                        if i > 0 {
                            self.push(" OR ");
                        }
                        if matches!(part, Predicate::And(_)) {
                            self.push("(");
                            self.predicate(part);
                            self.push(")");
                        } else {
                            self.predicate(part);
                        }
                    }
                    self.push(")");
                }
            }
            Predicate::Not(inner) => {
                self.push("NOT (");
                self.predicate(inner);
                self.push(")");
            }
        }
        self
    }

    fn operand(&mut self, operand: &Operand) {
        match operand {
            Operand::Column(column) => {
                self.push(column);
            }
            Operand::Int(value) => {
                self.push(&value.to_string());
            }
            Operand::Param(value) => {
                self.bind(value.clone());
            }
        }
    }

    fn subquery(&mut self, query: &SubQuery) {
        self.push("SELECT ")
            .push(&query.select)
            .push(" FROM ")
            .push(&query.from.join(","));
        for join in &query.joins {
            self.push(if join.left { " LEFT JOIN " } else { " JOIN " })
                .push(&join.table)
                .push(" ")
                .push(&join.alias)
                .push(" ON ");
            self.predicate(&join.on);
        }
        if query.filter != Predicate::True {
            self.push(" WHERE ");
            self.predicate(&query.filter);
        }
        if !query.group_by.is_empty() {
            self.push(" GROUP BY ").push(&query.group_by.join(","));
        }
        if let Some(having) = &query.having {
            self.push(" HAVING ");
            self.predicate(having);
        }
    }
}

/// Render a single predicate.
pub fn render_predicate(predicate: &Predicate) -> Sql {
    let mut w = SqlWriter::new();
    w.predicate(predicate);
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::predicate::CompareOp;

    #[test]
    fn test_render_compare_and_in() {
        let sql = render_predicate(&Predicate::and(vec![
            Predicate::int("p.proxyid", CompareOp::Eq, 5),
            Predicate::InInts {
                column: "p.operating_mode".into(),
                values: vec![0, 1],
                negated: false,
            },
            Predicate::param("p.name", CompareOp::Eq, "edge"),
        ]));
        assert_eq!(
            sql.text,
            "p.proxyid=5 AND p.operating_mode IN (0,1) AND p.name=?"
        );
        assert_eq!(sql.params, vec![Value::String("edge".into())]);
    }

    #[test]
    fn test_render_or_parenthesized_only_when_plural() {
        let single = Predicate::Or(vec![Predicate::is_null("a")]);
        assert_eq!(render_predicate(&single).text, "a IS NULL");

        let plural = Predicate::or(vec![
            Predicate::is_null("a"),
            Predicate::and(vec![Predicate::is_null("b"), Predicate::is_null("c")]),
        ]);
        assert_eq!(
            render_predicate(&plural).text,
            "(a IS NULL OR (b IS NULL AND c IS NULL))"
        );
    }

    #[test]
    fn test_render_like() {
        let sql = render_predicate(&Predicate::Like {
            column: "pt.value".into(),
            pattern: "%X!_Y%".into(),
            upper: true,
            negated: false,
        });
        assert_eq!(sql.text, "UPPER(pt.value) LIKE ? ESCAPE '!'");
        assert_eq!(sql.params, vec![Value::String("%X!_Y%".into())]);
    }

    #[test]
    fn test_render_exists_with_having() {
        let query = SubQuery::select("NULL", "hosts_groups hgg")
            .join(
                "rights",
                "r",
                Predicate::and(vec![
                    Predicate::columns_eq("r.id", "hgg.groupid"),
                    Predicate::InInts {
                        column: "r.groupid".into(),
                        values: vec![7],
                        negated: false,
                    },
                ]),
            )
            .filter(Predicate::columns_eq("a.hostid", "hgg.hostid"))
            .group_by("hgg.hostid")
            .having(Predicate::and(vec![
                Predicate::int("MIN(r.permission)", CompareOp::Gt, 0),
                Predicate::int("MAX(r.permission)", CompareOp::Ge, 2),
            ]));
        assert_eq!(
            render_predicate(&Predicate::exists(query)).text,
            "EXISTS (SELECT NULL FROM hosts_groups hgg JOIN rights r ON r.id=hgg.groupid \
             AND r.groupid IN (7) WHERE a.hostid=hgg.hostid GROUP BY hgg.hostid \
             HAVING MIN(r.permission)>0 AND MAX(r.permission)>=2)"
        );
    }

    #[test]
    fn test_render_select() {
        let mut parts = QueryParts::new("proxy", "p");
        parts.add_select("proxyid", "p.proxyid");
        parts.add_select("lastaccess", "pr.lastaccess");
        parts.left_join.insert(
            "pr",
            crate::query::parts::LeftJoin {
                table: "proxy_rtdata".into(),
                alias: "pr".into(),
                on: Predicate::columns_eq("p.proxyid", "pr.proxyid"),
            },
        );
        parts.push_filter(Predicate::True);
        parts.push_filter(Predicate::int("p.proxyid", CompareOp::Eq, 1));
        parts.order.push("p.name ASC".into());
        parts.limit = Some(10);

        assert_eq!(
            SqlWriter::select(&parts).text,
            "SELECT p.proxyid,pr.lastaccess FROM proxy p LEFT JOIN proxy_rtdata pr ON \
             p.proxyid=pr.proxyid WHERE p.proxyid=1 ORDER BY p.name ASC LIMIT 10"
        );
    }
}

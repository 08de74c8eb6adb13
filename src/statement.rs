//! The abstract SELECT statement the executor consumes, and the SQL front
//! end that produces it

use sqlparser::ast::{
    BinaryOperator, Expr as SqlExpr, GroupByExpr, Query, Select, SelectItem, SetExpr, Statement,
    TableFactor, Value as SqlValue,
};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use crate::{Error, Result};

/// What a SELECT projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Named columns, in the order they were written
    Columns(Vec<String>),
    /// `SELECT *`: every column in declaration order
    All,
    /// `SELECT COUNT(*)`
    CountStar,
}

/// A parsed single-table SELECT: the only statement shape the core executes.
#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub table: String,
    pub projection: Projection,
    /// Conjunction of column-equals-literal predicates, literals kept as
    /// text. A comma-separated integer list on the rowid-alias column
    /// selects multiple rowids at once.
    pub predicates: Vec<(String, String)>,
}

impl SelectStatement {
    /// Parse a SELECT out of SQL text. Anything beyond the supported subset
    /// (one table, plain columns or `COUNT(*)`, equality conjunctions and
    /// `IN` lists) is `Error::Unsupported`.
    pub fn parse(sql: &str) -> Result<Self> {
        let dialect = SQLiteDialect {};
        let statements = Parser::parse_sql(&dialect, sql)
            .map_err(|e| Error::Unsupported(format!("cannot parse SQL: {e}")))?;

        if statements.len() != 1 {
            return Err(Error::Unsupported(
                "expected a single SELECT statement".into(),
            ));
        }

        match &statements[0] {
            Statement::Query(query) => Self::from_query(query),
            other => Err(Error::Unsupported(format!(
                "only SELECT statements are supported, got {other}"
            ))),
        }
    }

    fn from_query(query: &Query) -> Result<Self> {
        if query.order_by.is_some() {
            return Err(Error::Unsupported("ORDER BY".into()));
        }
        if query.limit_clause.is_some() {
            return Err(Error::Unsupported("LIMIT".into()));
        }

        let SetExpr::Select(select) = &*query.body else {
            return Err(Error::Unsupported("non-SELECT query body".into()));
        };

        if select.distinct.is_some() {
            return Err(Error::Unsupported("DISTINCT".into()));
        }
        if !matches!(&select.group_by, GroupByExpr::Expressions(exprs, _) if exprs.is_empty()) {
            return Err(Error::Unsupported("GROUP BY".into()));
        }
        if select.having.is_some() {
            return Err(Error::Unsupported("HAVING".into()));
        }

        let table = Self::table_name(select)?;
        let projection = Self::projection(&select.projection)?;
        let mut predicates = Vec::new();
        if let Some(selection) = &select.selection {
            Self::collect_predicates(selection, &mut predicates)?;
        }

        Ok(Self {
            table,
            projection,
            predicates,
        })
    }

    fn table_name(select: &Select) -> Result<String> {
        if select.from.len() != 1 {
            return Err(Error::Unsupported(
                "queries must involve exactly one table".into(),
            ));
        }
        let from = &select.from[0];
        if !from.joins.is_empty() {
            return Err(Error::Unsupported("JOIN".into()));
        }
        if let TableFactor::Table { name, .. } = &from.relation {
            Ok(name
                .0
                .iter()
                .map(std::string::ToString::to_string)
                .collect::<Vec<_>>()
                .join("."))
        } else {
            Err(Error::Unsupported("non-table FROM source".into()))
        }
    }

    fn projection(items: &[SelectItem]) -> Result<Projection> {
        if items.len() == 1 {
            if let SelectItem::Wildcard(_) = &items[0] {
                return Ok(Projection::All);
            }
            if let SelectItem::UnnamedExpr(expr @ SqlExpr::Function(_)) = &items[0] {
                let canon = expr.to_string().to_lowercase().replace(' ', "");
                if canon == "count(*)" {
                    return Ok(Projection::CountStar);
                }
                return Err(Error::Unsupported(format!("aggregate {expr}")));
            }
        }

        let mut columns = Vec::with_capacity(items.len());
        for item in items {
            match item {
                SelectItem::UnnamedExpr(SqlExpr::Identifier(ident)) => {
                    columns.push(ident.value.clone());
                }
                other => {
                    return Err(Error::Unsupported(format!(
                        "column expression {other}"
                    )));
                }
            }
        }
        Ok(Projection::Columns(columns))
    }

    fn collect_predicates(expr: &SqlExpr, out: &mut Vec<(String, String)>) -> Result<()> {
        match expr {
            SqlExpr::BinaryOp { left, op, right } => match op {
                BinaryOperator::And => {
                    Self::collect_predicates(left, out)?;
                    Self::collect_predicates(right, out)
                }
                BinaryOperator::Eq => {
                    // Accept both column = literal and literal = column
                    let (column, literal) = match (&**left, &**right) {
                        (SqlExpr::Identifier(ident), value) => (ident, value),
                        (value, SqlExpr::Identifier(ident)) => (ident, value),
                        _ => {
                            return Err(Error::Unsupported(
                                "expected column = literal comparison".into(),
                            ));
                        }
                    };
                    out.push((column.value.clone(), Self::literal_text(literal)?));
                    Ok(())
                }
                other => Err(Error::Unsupported(format!("operator {other}"))),
            },
            SqlExpr::InList {
                expr,
                list,
                negated,
            } => {
                if *negated {
                    return Err(Error::Unsupported("NOT IN".into()));
                }
                let SqlExpr::Identifier(ident) = &**expr else {
                    return Err(Error::Unsupported(
                        "expected a column name before IN".into(),
                    ));
                };
                let mut literals = Vec::with_capacity(list.len());
                for item in list {
                    literals.push(Self::literal_text(item)?);
                }
                out.push((ident.value.clone(), literals.join(",")));
                Ok(())
            }
            SqlExpr::Nested(inner) => Self::collect_predicates(inner, out),
            other => Err(Error::Unsupported(format!("WHERE expression {other}"))),
        }
    }

    fn literal_text(expr: &SqlExpr) -> Result<String> {
        match expr {
            SqlExpr::Value(value_with_span) => match &value_with_span.value {
                SqlValue::Number(text, _) => Ok(text.clone()),
                SqlValue::SingleQuotedString(text) | SqlValue::DoubleQuotedString(text) => {
                    Ok(text.clone())
                }
                other => Err(Error::Unsupported(format!("literal {other}"))),
            },
            other => Err(Error::Unsupported(format!(
                "expected a literal value, found {other}"
            ))),
        }
    }

    /// The literal bound to `column` by an equality predicate, if any.
    #[must_use]
    pub fn binding(&self, column: &str) -> Option<&str> {
        self.predicates
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, literal)| literal.as_str())
    }
}

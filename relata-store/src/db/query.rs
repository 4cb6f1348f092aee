//! Generic select / join / aggregate / update / delete over any [`Entity`].

use rusqlite::types::{FromSql, Value};
use rusqlite::{params_from_iter, Connection};

use relata_types::{Aggregate, Comparison, JoinKind, SortDirection};

use crate::db::mapping::{BelongsTo, Column, Entity};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Filter<C> {
    pub column: C,
    pub comparison: Comparison,
    pub value: Value,
}

impl<C: Column> Filter<C> {
    fn to_sql(&self, alias: Option<&str>, params: &mut Vec<Value>) -> String {
        let column = qualify(alias, self.column.name());
        match (&self.value, self.comparison) {
            (Value::Null, Comparison::Eq) => format!("{} IS NULL", column),
            (Value::Null, Comparison::Ne) => format!("{} IS NOT NULL", column),
            (value, comparison) => {
                params.push(value.clone());
                format!("{} {} ?", column, comparison.as_str())
            }
        }
    }
}

/// Conjunction of filters plus ordering and limit
#[derive(Debug, Clone)]
pub struct Query<E: Entity> {
    pub filters: Vec<Filter<E::Column>>,
    pub order_by: Vec<(E::Column, SortDirection)>,
    pub limit: Option<u32>,
}

impl<E: Entity> Default for Query<E> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }
}

impl<E: Entity> Query<E> {
    /// Every row, in storage order
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_key(key: &E::Key) -> Self {
        Self::all().filter(E::PRIMARY_KEY, Comparison::Eq, E::key_value(key))
    }

    /// Add a condition. Text values are passed as `String`.
    pub fn filter(mut self, column: E::Column, comparison: Comparison, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column,
            comparison,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, column: E::Column, direction: SortDirection) -> Self {
        self.order_by.push((column, direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn where_clause(&self, alias: Option<&str>, params: &mut Vec<Value>) -> String {
        if self.filters.is_empty() {
            return String::new();
        }
        let conditions = self
            .filters
            .iter()
            .map(|f| f.to_sql(alias, params))
            .collect::<Vec<_>>();
        format!(" WHERE {}", conditions.join(" AND "))
    }

    fn order_clause(&self, alias: Option<&str>) -> String {
        if self.order_by.is_empty() {
            return String::new();
        }
        let terms = self
            .order_by
            .iter()
            .map(|(c, dir)| format!("{} {}", qualify(alias, c.name()), dir.as_str()))
            .collect::<Vec<_>>();
        format!(" ORDER BY {}", terms.join(", "))
    }

    fn limit_clause(&self, params: &mut Vec<Value>) -> String {
        match self.limit {
            Some(limit) => {
                params.push(Value::Integer(i64::from(limit)));
                " LIMIT ?".to_string()
            }
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment<C> {
    pub column: C,
    pub value: Value,
}

impl<C> Assignment<C> {
    pub fn new(column: C, value: impl Into<Value>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

/// `SELECT group, AGG(target) ... GROUP BY group [HAVING AGG(target) op threshold]`
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy<C> {
    pub group: C,
    pub aggregate: Aggregate,
    pub target: C,
    pub having: Option<(Comparison, f64)>,
}

fn qualify(alias: Option<&str>, column: &str) -> String {
    match alias {
        Some(alias) => format!("{}.{}", alias, column),
        None => column.to_string(),
    }
}

/// Rows of `E` matching `query`. No match is an empty vector.
pub fn select<E: Entity>(conn: &Connection, query: &Query<E>) -> StoreResult<Vec<E>> {
    let mut params = Vec::new();
    let sql = format!(
        "SELECT {} FROM {}{}{}{}",
        E::select_list(None),
        E::TABLE,
        query.where_clause(None, &mut params),
        query.order_clause(None),
        query.limit_clause(&mut params),
    );
    tracing::debug!(table = E::TABLE, %sql, "select");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| E::from_row(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn find<E: Entity>(conn: &Connection, key: &E::Key) -> StoreResult<Option<E>> {
    Ok(select(conn, &Query::<E>::by_key(key))?.into_iter().next())
}

pub fn count<E: Entity>(conn: &Connection, query: &Query<E>) -> StoreResult<i64> {
    let mut params = Vec::new();
    let sql = format!(
        "SELECT COUNT(*) FROM {}{}",
        E::TABLE,
        query.where_clause(None, &mut params)
    );
    let count = conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
    Ok(count)
}

/// Join parents to their children on `child.fk = parent.pk`.
///
/// Inner joins yield one `(parent, Some(child))` per pair. Left outer joins
/// also yield `(parent, None)` for parents without children. `parents`
/// filters the parent side and its limit counts parents, not joined rows;
/// rows come back ordered by parent then child key.
pub fn join<P, C>(conn: &Connection, kind: JoinKind, parents: &Query<P>) -> StoreResult<Vec<(P, Option<C>)>>
where
    P: Entity,
    C: BelongsTo<P>,
{
    let parent_order = |alias: Option<&str>| {
        let mut terms = parents
            .order_by
            .iter()
            .map(|(c, dir)| format!("{} {}", qualify(alias, c.name()), dir.as_str()))
            .collect::<Vec<_>>();
        terms.push(qualify(alias, P::PRIMARY_KEY.name()));
        terms
    };

    let mut params = Vec::new();
    let parent_rows = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}",
        P::select_list(None),
        P::TABLE,
        parents.where_clause(None, &mut params),
        parent_order(None).join(", "),
        parents.limit_clause(&mut params),
    );
    let mut order = parent_order(Some("p"));
    order.push(format!("c.{}", C::PRIMARY_KEY.name()));

    let sql = format!(
        "SELECT {}, {} FROM ({}) p {} {} c ON c.{} = p.{} ORDER BY {}",
        P::select_list(Some("p")),
        C::select_list(Some("c")),
        parent_rows,
        kind.as_str(),
        C::TABLE,
        <C as BelongsTo<P>>::FOREIGN_KEY.name(),
        P::PRIMARY_KEY.name(),
        order.join(", "),
    );
    tracing::debug!(parent = P::TABLE, child = C::TABLE, %sql, "join");

    let child_offset = P::COLUMNS.len();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            let parent = P::from_row(row, 0)?;
            // Child primary key is NULL only when the outer join found no match
            let child = match row.get_ref(child_offset)? {
                rusqlite::types::ValueRef::Null => None,
                _ => Some(C::from_row(row, child_offset)?),
            };
            Ok((parent, child))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// One `(group key, aggregate)` row per distinct group value, ordered by key.
/// Aggregates over only NULL values read as 0, in the result and in HAVING alike.
pub fn group_aggregate<E, K>(conn: &Connection, group_by: &GroupBy<E::Column>) -> StoreResult<Vec<(K, f64)>>
where
    E: Entity,
    K: FromSql,
{
    let aggregate = format!(
        "COALESCE({}({}), 0)",
        group_by.aggregate.as_str(),
        group_by.target.name()
    );
    let mut params = Vec::new();
    let having = match group_by.having {
        Some((comparison, threshold)) => {
            params.push(Value::Real(threshold));
            format!(" HAVING {} {} ?", aggregate, comparison.as_str())
        }
        None => String::new(),
    };
    let sql = format!(
        "SELECT {group}, {aggregate} FROM {table} GROUP BY {group}{having} ORDER BY {group}",
        group = group_by.group.name(),
        aggregate = aggregate,
        table = E::TABLE,
        having = having,
    );
    tracing::debug!(table = E::TABLE, %sql, "group aggregate");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            Ok((row.get::<_, K>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Apply `assignments` to every row matching `query`; returns rows affected.
/// The primary key cannot be assigned.
pub fn update_where<E: Entity>(
    conn: &Connection,
    query: &Query<E>,
    assignments: &[Assignment<E::Column>],
) -> StoreResult<usize> {
    if assignments.is_empty() {
        return Err(StoreError::InvalidQuery(format!(
            "update of {} without assignments",
            E::TABLE
        )));
    }
    if assignments.iter().any(|a| a.column == E::PRIMARY_KEY) {
        return Err(StoreError::InvalidQuery(format!(
            "primary key of {} cannot be updated",
            E::TABLE
        )));
    }

    let mut params = assignments.iter().map(|a| a.value.clone()).collect::<Vec<_>>();
    let set = assignments
        .iter()
        .map(|a| format!("{} = ?", a.column.name()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {}{}",
        E::TABLE,
        set,
        query.where_clause(None, &mut params)
    );
    tracing::debug!(table = E::TABLE, %sql, "update");

    Ok(conn.execute(&sql, params_from_iter(params.iter()))?)
}

/// Delete every row matching `query`; returns rows affected
pub fn delete_where<E: Entity>(conn: &Connection, query: &Query<E>) -> StoreResult<usize> {
    let mut params = Vec::new();
    let sql = format!("DELETE FROM {}{}", E::TABLE, query.where_clause(None, &mut params));
    tracing::debug!(table = E::TABLE, %sql, "delete");

    Ok(conn.execute(&sql, params_from_iter(params.iter()))?)
}

//! Immutable list query value.
//!
//! A [`ListQuery`] wraps a Sea-ORM [`Select`] that carries the base table, joins and
//! predicates, and keeps the `ORDER BY` terms beside it rather than inside it. The
//! executor can then count over the predicates alone and attach ordering and the
//! page window only for the final fetch. Every builder method consumes the value and
//! returns a new one, so a query is never shared between two compositions.

use sea_orm::{
    ConnectionTrait, DbBackend, DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait, Select, Statement,
    sea_query::{Expr, NullOrdering, Order, SimpleExpr},
};

use crate::sort::SortExpression;

#[derive(Debug, Clone)]
struct OrderTerm {
    expr: SimpleExpr,
    order: Order,
    nulls_last: bool,
}

/// A resource-scoped query plus the ordering to apply at fetch time.
#[derive(Debug, Clone)]
pub struct ListQuery<E: EntityTrait> {
    select: Select<E>,
    order: Vec<OrderTerm>,
}

impl<E: EntityTrait> ListQuery<E> {
    /// Wraps a select that is already scoped to the resource (joins, soft-delete predicate).
    #[must_use]
    pub fn new(select: Select<E>) -> Self {
        Self {
            select,
            order: Vec::new(),
        }
    }

    /// Adds a predicate, combined with the existing ones by `AND`
    #[must_use]
    pub fn and_where(mut self, predicate: SimpleExpr) -> Self {
        self.select = self.select.filter(predicate);
        self
    }

    /// Appends an `ORDER BY` term after any existing ones
    #[must_use]
    pub fn order_by_expr(mut self, expr: SimpleExpr, order: Order) -> Self {
        self.order.push(OrderTerm {
            expr,
            order,
            nulls_last: false,
        });
        self
    }

    /// Appends every key of a resolved sort expression
    #[must_use]
    pub fn order_by_sort(mut self, sort: &SortExpression) -> Self {
        for key in sort.keys() {
            self.order.push(OrderTerm {
                expr: Expr::cust(key.expr.clone()),
                order: key.order.into(),
                nulls_last: key.nulls_last,
            });
        }
        self
    }

    /// Mutable access to the select for projection changes that do not touch predicates.
    pub(crate) fn map_select(mut self, f: impl FnOnce(Select<E>) -> Select<E>) -> Self {
        self.select = f(self.select);
        self
    }

    #[must_use]
    pub fn order_len(&self) -> usize {
        self.order.len()
    }

    /// Consumes the value and returns the select with every order term applied.
    #[must_use]
    pub fn into_ordered_select(self) -> Select<E> {
        let mut select = self.select;
        for term in self.order {
            select = if term.nulls_last {
                select.order_by_with_nulls(term.expr, term.order, NullOrdering::Last)
            } else {
                select.order_by(term.expr, term.order)
            };
        }
        select
    }

    /// Renders the ordered select for `backend`, for logging and tests.
    #[must_use]
    pub fn statement(&self, backend: DbBackend) -> Statement {
        self.clone().into_ordered_select().build(backend)
    }

    /// Renders only the predicate part, as used for the row count.
    #[must_use]
    pub fn count_statement(&self, backend: DbBackend) -> Statement {
        self.select.build(backend)
    }

    /// Runs `SELECT COUNT(*)` over the predicates, without ordering or a page window.
    ///
    /// # Errors
    ///
    /// Returns the database error unchanged.
    pub async fn count<C>(&self, db: &C) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
        E::Model: Sync,
    {
        PaginatorTrait::count(self.select.clone(), db).await
    }

    /// Applies ordering and `LIMIT`/`OFFSET`, then loads the rows as `M`.
    ///
    /// # Errors
    ///
    /// Returns the database error unchanged.
    pub async fn fetch_page<M, C>(self, db: &C, limit: u64, offset: u64) -> Result<Vec<M>, DbErr>
    where
        M: FromQueryResult + Sized + Send + Sync,
        C: ConnectionTrait,
    {
        self.into_ordered_select()
            .limit(limit)
            .offset(offset)
            .into_model::<M>()
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::region;
    use crate::sort::{SortOrder, build_sort_expression};
    use sea_orm::ColumnTrait;

    fn base() -> ListQuery<region::Entity> {
        ListQuery::new(region::Entity::find().filter(region::Column::DeletedAt.is_null()))
    }

    #[test]
    fn test_ordering_kept_out_of_count_statement() {
        let query = base().order_by_sort(&build_sort_expression("regions.code", SortOrder::Asc, false));

        let count_sql = query.count_statement(DbBackend::Postgres).to_string();
        assert!(!count_sql.contains("ORDER BY"), "{count_sql}");

        let sql = query.statement(DbBackend::Postgres).to_string();
        assert!(sql.contains("ORDER BY regions.code ASC"), "{sql}");
    }

    #[test]
    fn test_order_terms_keep_insertion_order() {
        let query = base()
            .order_by_expr(Expr::cust("first_key"), Order::Desc)
            .order_by_sort(&build_sort_expression("regions.code", SortOrder::Asc, true));

        assert_eq!(query.order_len(), 4);
        let sql = query.statement(DbBackend::Postgres).to_string();
        let first = sql.find("first_key DESC").expect("relevance key present");
        let natural = sql.find("TRIM(SUBSTRING(regions.code").expect("natural key present");
        assert!(first < natural, "{sql}");
        assert!(sql.contains("NULLS LAST"), "{sql}");
    }

    #[test]
    fn test_and_where_keeps_base_predicate() {
        let query = base().and_where(Expr::cust_with_values("regions.level = $1", ["province"]));
        let sql = query.count_statement(DbBackend::Postgres).to_string();
        assert!(sql.contains("\"deleted_at\" IS NULL"), "{sql}");
        assert!(sql.contains("regions.level = 'province'"), "{sql}");
    }
}

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{ConnectionTrait, DbErr};

use crate::validation::RecordLookup;

/// Uniqueness and existence checks run as plain `SELECT id ... LIMIT 1`
/// queries against whatever connection or transaction is at hand.
pub struct DbLookup<'a, C> {
    db: &'a C,
}

impl<'a, C> DbLookup<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }
}

#[async_trait]
impl<'a, C> RecordLookup for DbLookup<'a, C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn value_taken(
        &self,
        table: &str,
        column: &str,
        value: &str,
        except_id: Option<i32>,
    ) -> Result<bool, DbErr> {
        let mut query = Query::select();
        query
            .column(Alias::new("id"))
            .from(Alias::new(table))
            .and_where(Expr::col(Alias::new(column)).eq(value))
            .and_where_option(except_id.map(|id| Expr::col(Alias::new("id")).ne(id)))
            .limit(1);

        let stmt = self.db.get_database_backend().build(&query);
        Ok(self.db.query_one(stmt).await?.is_some())
    }

    async fn row_exists(&self, table: &str, id: i32) -> Result<bool, DbErr> {
        let mut query = Query::select();
        query
            .column(Alias::new("id"))
            .from(Alias::new(table))
            .and_where(Expr::col(Alias::new("id")).eq(id))
            .limit(1);

        let stmt = self.db.get_database_backend().build(&query);
        Ok(self.db.query_one(stmt).await?.is_some())
    }
}

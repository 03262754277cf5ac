//! Database table operations and implementations.

use std::collections::HashSet;

use sqlx::SqlitePool;

use crate::model::ShownModel;
use crate::model::StateModel;
use crate::model::SubscriptionModel;
use crate::repository::error::DatabaseError;

/// Base table struct providing database pool access.
#[derive(Clone)]
pub struct BaseTable {
    pub pool: SqlitePool,
}

impl BaseTable {
    /// Creates a new base table with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Base trait for table operations.
#[async_trait::async_trait]
pub trait TableBase {
    /// Deletes all rows from the table.
    async fn delete_all(&self) -> Result<(), DatabaseError>;
}

/// Trait for tables keyed by a single primary key column.
#[async_trait::async_trait]
pub trait Table<T, ID>: TableBase {
    async fn select_all(&self) -> Result<Vec<T>, DatabaseError>;
    async fn insert(&self, model: &T) -> Result<ID, DatabaseError>;
    async fn select(&self, id: &ID) -> Result<Option<T>, DatabaseError>;
    /// Returns `true` when a row was actually deleted.
    async fn delete(&self, id: &ID) -> Result<bool, DatabaseError>;
    async fn replace(&self, model: &T) -> Result<ID, DatabaseError>;
}

macro_rules! impl_table_base {
    ($struct_name:ident, $table:literal) => {
        #[derive(Clone)]
        pub struct $struct_name {
            base: BaseTable,
        }

        impl $struct_name {
            pub fn new(pool: SqlitePool) -> Self {
                Self {
                    base: BaseTable::new(pool),
                }
            }
        }

        #[async_trait::async_trait]
        impl TableBase for $struct_name {
            async fn delete_all(&self) -> Result<(), DatabaseError> {
                sqlx::query(concat!("DELETE FROM ", $table))
                    .execute(&self.base.pool)
                    .await?;
                Ok(())
            }
        }
    };
}

macro_rules! impl_table {
    (
        $struct_name:ident,
        $model:ty,
        $table:literal,
        $pk:ident,
        $id_type:ty,
        $cols:literal,
        $vals:literal,
        [ $( $field:ident ),+ ]
    ) => {
        impl_table_base!($struct_name, $table);

        #[async_trait::async_trait]
        impl Table<$model, $id_type> for $struct_name {
            async fn select_all(&self) -> Result<Vec<$model>, DatabaseError> {
                Ok(sqlx::query_as::<_, $model>(concat!(
                    "SELECT * FROM ", $table, " ORDER BY ", stringify!($pk)
                ))
                .fetch_all(&self.base.pool)
                .await?)
            }

            async fn select(&self, id: &$id_type) -> Result<Option<$model>, DatabaseError> {
                Ok(sqlx::query_as::<_, $model>(concat!(
                    "SELECT * FROM ", $table, " WHERE ", stringify!($pk), " = ?"
                ))
                .bind(id)
                .fetch_optional(&self.base.pool)
                .await?)
            }

            async fn insert(&self, model: &$model) -> Result<$id_type, DatabaseError> {
                let mut query = sqlx::query_as::<_, ($id_type,)>(concat!(
                    "INSERT INTO ", $table, " (", $cols, ") VALUES (", $vals, ") RETURNING ",
                    stringify!($pk)
                ));
                $(
                    query = query.bind(&model.$field);
                )+
                let row = query.fetch_one(&self.base.pool).await?;
                Ok(row.0)
            }

            async fn delete(&self, id: &$id_type) -> Result<bool, DatabaseError> {
                let res = sqlx::query(concat!(
                    "DELETE FROM ", $table, " WHERE ", stringify!($pk), " = ?"
                ))
                .bind(id)
                .execute(&self.base.pool)
                .await?;
                Ok(res.rows_affected() > 0)
            }

            async fn replace(&self, model: &$model) -> Result<$id_type, DatabaseError> {
                let mut query = sqlx::query_as::<_, ($id_type,)>(concat!(
                    "REPLACE INTO ", $table, " (", $cols, ") VALUES (", $vals, ") RETURNING ",
                    stringify!($pk)
                ));
                $(
                    query = query.bind(&model.$field);
                )+
                let row = query.fetch_one(&self.base.pool).await?;
                Ok(row.0)
            }
        }
    };
}

// ============================================================================
// SubscriptionTable
// ============================================================================

impl_table!(
    SubscriptionTable,
    SubscriptionModel,
    "subscriptions",
    id,
    i32,
    "subscriber_id, url",
    "?, ?",
    [subscriber_id, url]
);

impl SubscriptionTable {
    /// Inserts the `(subscriber_id, url)` pair unless it already exists.
    ///
    /// Returns the stored row and whether it was created by this call.
    pub async fn insert_or_ignore(
        &self,
        subscriber_id: &str,
        url: &str,
    ) -> Result<(SubscriptionModel, bool), DatabaseError> {
        let mut tx = self.base.pool.begin().await?;

        let res =
            sqlx::query("INSERT OR IGNORE INTO subscriptions (subscriber_id, url) VALUES (?, ?)")
                .bind(subscriber_id)
                .bind(url)
                .execute(&mut *tx)
                .await?;

        let model = sqlx::query_as::<_, SubscriptionModel>(
            "SELECT * FROM subscriptions WHERE subscriber_id = ? AND url = ?",
        )
        .bind(subscriber_id)
        .bind(url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((model, res.rows_affected() > 0))
    }

    /// Get all subscriptions of a subscriber, oldest first
    pub async fn select_all_by_subscriber_id(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<SubscriptionModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, SubscriptionModel>(
            "SELECT * FROM subscriptions WHERE subscriber_id = ? ORDER BY id",
        )
        .bind(subscriber_id)
        .fetch_all(&self.base.pool)
        .await?)
    }

    pub async fn select_by_subscriber_and_url(
        &self,
        subscriber_id: &str,
        url: &str,
    ) -> Result<Option<SubscriptionModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, SubscriptionModel>(
            "SELECT * FROM subscriptions WHERE subscriber_id = ? AND url = ?",
        )
        .bind(subscriber_id)
        .bind(url)
        .fetch_optional(&self.base.pool)
        .await?)
    }

    pub async fn count_by_subscriber_id(&self, subscriber_id: &str) -> Result<u32, DatabaseError> {
        let count: (u32,) =
            sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = ?")
                .bind(subscriber_id)
                .fetch_one(&self.base.pool)
                .await?;
        Ok(count.0)
    }
}

// ============================================================================
// ShownTable
// ============================================================================

impl_table_base!(ShownTable, "shown");

impl ShownTable {
    /// Check if an ad has already been shown to a subscriber
    pub async fn exists(&self, subscriber_id: &str, ad: &str) -> Result<bool, DatabaseError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM shown WHERE subscriber_id = ? AND ad = ?")
                .bind(subscriber_id)
                .bind(ad)
                .fetch_one(&self.base.pool)
                .await?;
        Ok(count.0 > 0)
    }

    /// Get every ad identity already shown to a subscriber
    pub async fn select_ads_by_subscriber_id(
        &self,
        subscriber_id: &str,
    ) -> Result<HashSet<String>, DatabaseError> {
        let rows = sqlx::query_as::<_, ShownModel>("SELECT * FROM shown WHERE subscriber_id = ?")
            .bind(subscriber_id)
            .fetch_all(&self.base.pool)
            .await?;
        Ok(rows.into_iter().map(|row| row.ad).collect())
    }

    /// Inserts all pairs in one transaction, silently skipping pairs that already exist.
    ///
    /// Returns the number of newly inserted rows.
    pub async fn insert_many(
        &self,
        subscriber_id: &str,
        ads: &[String],
    ) -> Result<u64, DatabaseError> {
        let mut tx = self.base.pool.begin().await?;
        let mut inserted = 0;

        for ad in ads {
            let res = sqlx::query("INSERT OR IGNORE INTO shown (subscriber_id, ad) VALUES (?, ?)")
                .bind(subscriber_id)
                .bind(ad)
                .execute(&mut *tx)
                .await?;
            inserted += res.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn count_by_subscriber_id(&self, subscriber_id: &str) -> Result<u32, DatabaseError> {
        let count: (u32,) = sqlx::query_as("SELECT COUNT(*) FROM shown WHERE subscriber_id = ?")
            .bind(subscriber_id)
            .fetch_one(&self.base.pool)
            .await?;
        Ok(count.0)
    }
}

// ============================================================================
// StateTable
// ============================================================================

impl_table!(
    StateTable,
    StateModel,
    "state",
    subscriber_id,
    String,
    "subscriber_id, state",
    "?, ?",
    [subscriber_id, state]
);

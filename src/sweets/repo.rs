use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::repo_types::{next_quantity, StockChange, Sweet, SweetFields};

#[async_trait]
pub trait SweetStore: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Sweet>>;
    /// Sweets where every term matches name, category or price (case-insensitive).
    async fn search(&self, terms: &[String]) -> anyhow::Result<Vec<Sweet>>;
    async fn get(&self, id: i64) -> anyhow::Result<Option<Sweet>>;
    async fn create(&self, fields: SweetFields) -> anyhow::Result<Sweet>;
    async fn update(&self, id: i64, fields: SweetFields) -> anyhow::Result<Option<Sweet>>;
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
    /// Applies `delta` to the stock as one atomic read-modify-write.
    async fn adjust_stock(&self, id: i64, delta: i32) -> anyhow::Result<StockChange>;
}

#[derive(Clone)]
pub struct PgSweetStore {
    db: PgPool,
}

impl PgSweetStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl SweetStore for PgSweetStore {
    async fn list(&self) -> anyhow::Result<Vec<Sweet>> {
        let rows = sqlx::query_as::<_, Sweet>(
            r#"
            SELECT id, name, category, price, quantity_in_stock
            FROM sweets
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list sweets")?;
        Ok(rows)
    }

    async fn search(&self, terms: &[String]) -> anyhow::Result<Vec<Sweet>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, name, category, price, quantity_in_stock FROM sweets",
        );
        for (i, term) in terms.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            let pattern = format!("%{}%", escape_like(term));
            qb.push("(name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR category ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR price::text ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY id");

        let rows = qb
            .build_query_as::<Sweet>()
            .fetch_all(&self.db)
            .await
            .context("search sweets")?;
        Ok(rows)
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<Sweet>> {
        let row = sqlx::query_as::<_, Sweet>(
            r#"
            SELECT id, name, category, price, quantity_in_stock
            FROM sweets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get sweet")?;
        Ok(row)
    }

    async fn create(&self, fields: SweetFields) -> anyhow::Result<Sweet> {
        let row = sqlx::query_as::<_, Sweet>(
            r#"
            INSERT INTO sweets (name, category, price, quantity_in_stock)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, category, price, quantity_in_stock
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.category)
        .bind(fields.price)
        .bind(fields.quantity_in_stock)
        .fetch_one(&self.db)
        .await
        .context("insert sweet")?;
        Ok(row)
    }

    async fn update(&self, id: i64, fields: SweetFields) -> anyhow::Result<Option<Sweet>> {
        let row = sqlx::query_as::<_, Sweet>(
            r#"
            UPDATE sweets
               SET name = $2, category = $3, price = $4, quantity_in_stock = $5
             WHERE id = $1
            RETURNING id, name, category, price, quantity_in_stock
            "#,
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.category)
        .bind(fields.price)
        .bind(fields.quantity_in_stock)
        .fetch_optional(&self.db)
        .await
        .context("update sweet")?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM sweets WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete sweet")?;
        Ok(res.rows_affected() > 0)
    }

    async fn adjust_stock(&self, id: i64, delta: i32) -> anyhow::Result<StockChange> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        // Row lock held until commit; dropping `tx` on early return rolls back
        let current: Option<i32> = sqlx::query_scalar(
            "SELECT quantity_in_stock FROM sweets WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("lock sweet row")?;

        let Some(current) = current else {
            return Ok(StockChange::NotFound);
        };
        let quantity = match next_quantity(current, delta) {
            Ok(q) => q,
            Err(rejected) => return Ok(rejected),
        };

        let sweet = sqlx::query_as::<_, Sweet>(
            r#"
            UPDATE sweets
               SET quantity_in_stock = $2
             WHERE id = $1
            RETURNING id, name, category, price, quantity_in_stock
            "#,
        )
        .bind(id)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await
        .context("update stock")?;

        tx.commit().await.context("commit tx")?;
        Ok(StockChange::Updated(sweet))
    }
}

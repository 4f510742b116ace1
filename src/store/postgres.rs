//! Postgres store.
//!
//! Orders and bills are stored document-style: line items live in a JSONB
//! column next to the scalar fields, so every cart rewrite is a
//! single-row update. Stock adjustments are conditional single-statement
//! updates (`WHERE stock + delta >= 0`) so concurrent reservations can
//! never jointly over-sell, and `commit_checkout` runs in one
//! transaction. A partial unique index on `orders (user_id) WHERE status
//! = 'pending'` enforces the one-cart-per-user invariant.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Bill, BillLine, BillStatus, Coupon, CouponCode, DiscountType, Order, OrderLine, OrderStatus,
    Product,
};
use crate::error::{Error, Result};

use super::{BillFilter, CheckoutCommit, Store};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    lines: Json<Vec<OrderLine>>,
    status: String,
    total_amount: Decimal,
    coupon_applied: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = Error;

    fn try_from(row: OrderRow) -> Result<Self> {
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            lines: row.lines.0,
            status: row.status.parse::<OrderStatus>().map_err(decode_err)?,
            total_amount: row.total_amount,
            coupon_applied: row.coupon_applied,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    name: Option<String>,
    code: String,
    discount_type: String,
    discount_value: Decimal,
    expiration_date: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = Error;

    fn try_from(row: CouponRow) -> Result<Self> {
        Ok(Coupon {
            id: row.id,
            name: row.name,
            code: CouponCode::new(row.code).map_err(|e| decode_err(e.to_string()))?,
            discount_type: row.discount_type.parse::<DiscountType>().map_err(decode_err)?,
            discount_value: row.discount_value,
            expiration_date: row.expiration_date,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BillRow {
    id: Uuid,
    user_id: Uuid,
    order_id: Uuid,
    order_number: String,
    lines: Json<Vec<BillLine>>,
    subtotal: Decimal,
    discount: Decimal,
    total: Decimal,
    coupon_applied: Option<Uuid>,
    coupon_code: Option<String>,
    status: String,
    payment_method: String,
    shipping_address: Option<String>,
    notes: Option<String>,
    bill_date: DateTime<Utc>,
}

impl TryFrom<BillRow> for Bill {
    type Error = Error;

    fn try_from(row: BillRow) -> Result<Self> {
        Ok(Bill {
            id: row.id,
            user_id: row.user_id,
            order_id: row.order_id,
            order_number: row.order_number,
            lines: row.lines.0,
            subtotal: row.subtotal,
            discount: row.discount,
            total: row.total,
            coupon_applied: row.coupon_applied,
            coupon_code: row.coupon_code,
            status: row.status.parse::<BillStatus>().map_err(decode_err)?,
            payment_method: row.payment_method,
            shipping_address: row.shipping_address,
            notes: row.notes,
            bill_date: row.bill_date,
        })
    }
}

fn decode_err(msg: String) -> Error {
    Error::Database(sqlx::Error::Decode(msg.into()))
}

fn conflict_on_unique(e: sqlx::Error, message: &str) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Conflict(message.to_string())
        }
        _ => Error::Database(e),
    }
}

const UPSERT_ORDER: &str = "INSERT INTO orders \
     (id, user_id, lines, status, total_amount, coupon_applied, created_at, updated_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
     ON CONFLICT (id) DO UPDATE SET \
       lines = EXCLUDED.lines, status = EXCLUDED.status, \
       total_amount = EXCLUDED.total_amount, coupon_applied = EXCLUDED.coupon_applied, \
       updated_at = EXCLUDED.updated_at";

fn upsert_order(
    order: &Order,
) -> sqlx::query::Query<'static, sqlx::Postgres, sqlx::postgres::PgArguments> {
    // Owned binds so the query outlives the borrow of `order`.
    sqlx::query(UPSERT_ORDER)
        .bind(order.id)
        .bind(order.user_id)
        .bind(Json(order.lines.clone()))
        .bind(order.status.as_str())
        .bind(order.total_amount)
        .bind(order.coupon_applied)
        .bind(order.created_at)
        .bind(order.updated_at)
}

#[async_trait]
impl Store for PgStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products \
             (id, name, description, price, stock, category, image, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.category)
        .bind(&product.image)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn products(&self) -> Result<Vec<Product>> {
        let products =
            sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(products)
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<Product> {
        let updated = sqlx::query_as::<_, Product>(
            "UPDATE products SET stock = stock + $2, updated_at = NOW() \
             WHERE id = $1 AND stock + $2 >= 0 RETURNING *",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(product) => Ok(product),
            None => match self.product(id).await? {
                None => Err(Error::ProductNotFound(id)),
                Some(product) => Err(Error::InsufficientStock {
                    product: product.name,
                    available: product.stock,
                    requested: -delta,
                }),
            },
        }
    }

    async fn pending_order(&self, user_id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE user_id = $1 AND status = 'pending'",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    async fn completed_orders(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE user_id = $1 AND status = 'completed' \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn save_order(&self, order: &Order) -> Result<()> {
        upsert_order(order)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "user already has a pending order"))?;
        Ok(())
    }

    async fn commit_checkout(&self, commit: CheckoutCommit) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for dec in &commit.decrements {
            let done = sqlx::query(
                "UPDATE products SET stock = stock - $2, updated_at = NOW() \
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(dec.product_id)
            .bind(dec.quantity)
            .execute(&mut *tx)
            .await?;
            if done.rows_affected() == 0 {
                // Dropping the transaction rolls back earlier decrements.
                let available: Option<(i32,)> =
                    sqlx::query_as("SELECT stock FROM products WHERE id = $1")
                        .bind(dec.product_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(match available {
                    None => Error::ProductNotFound(dec.product_id),
                    Some((stock,)) => Error::InsufficientStock {
                        product: dec.product_name.clone(),
                        available: stock,
                        requested: dec.quantity,
                    },
                });
            }
        }

        upsert_order(&commit.completed).execute(&mut *tx).await?;
        upsert_order(&commit.remaining_cart).execute(&mut *tx).await?;

        sqlx::query(
            "INSERT INTO bills \
             (id, user_id, order_id, order_number, lines, subtotal, discount, total, \
              coupon_applied, coupon_code, status, payment_method, shipping_address, notes, bill_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(commit.bill.id)
        .bind(commit.bill.user_id)
        .bind(commit.bill.order_id)
        .bind(&commit.bill.order_number)
        .bind(Json(commit.bill.lines.clone()))
        .bind(commit.bill.subtotal)
        .bind(commit.bill.discount)
        .bind(commit.bill.total)
        .bind(commit.bill.coupon_applied)
        .bind(&commit.bill.coupon_code)
        .bind(commit.bill.status.as_str())
        .bind(&commit.bill.payment_method)
        .bind(&commit.bill.shipping_address)
        .bind(&commit.bill.notes)
        .bind(commit.bill.bill_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_coupon(&self, coupon: &Coupon) -> Result<()> {
        sqlx::query(
            "INSERT INTO coupons \
             (id, name, code, discount_type, discount_value, expiration_date, is_active, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(coupon.id)
        .bind(&coupon.name)
        .bind(coupon.code.as_str())
        .bind(coupon.discount_type.as_str())
        .bind(coupon.discount_value)
        .bind(coupon.expiration_date)
        .bind(coupon.is_active)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "coupon code already exists"))?;
        Ok(())
    }

    async fn coupons(&self) -> Result<Vec<Coupon>> {
        let rows = sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Coupon::try_from).collect()
    }

    async fn coupon(&self, id: Uuid) -> Result<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Coupon::try_from).transpose()
    }

    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Coupon::try_from).transpose()
    }

    async fn update_coupon(&self, coupon: &Coupon) -> Result<()> {
        let done = sqlx::query(
            "UPDATE coupons SET name = $2, code = $3, discount_type = $4, discount_value = $5, \
             expiration_date = $6, is_active = $7, updated_at = NOW() WHERE id = $1",
        )
        .bind(coupon.id)
        .bind(&coupon.name)
        .bind(coupon.code.as_str())
        .bind(coupon.discount_type.as_str())
        .bind(coupon.discount_value)
        .bind(coupon.expiration_date)
        .bind(coupon.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "coupon code already exists"))?;
        if done.rows_affected() == 0 {
            return Err(Error::CouponNotFound);
        }
        Ok(())
    }

    async fn delete_coupon(&self, id: Uuid) -> Result<()> {
        let done = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(Error::CouponNotFound);
        }
        Ok(())
    }

    async fn bills(&self, filter: &BillFilter) -> Result<(Vec<Bill>, i64)> {
        let status = filter.status.map(|s| s.as_str().to_string());
        let limit = i64::from(filter.limit);
        let offset = i64::from(filter.page.saturating_sub(1)) * limit;

        let rows = sqlx::query_as::<_, BillRow>(
            "SELECT * FROM bills \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
               AND ($2::text IS NULL OR status = $2) \
             ORDER BY bill_date DESC LIMIT $3 OFFSET $4",
        )
        .bind(filter.user_id)
        .bind(&status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bills \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
               AND ($2::text IS NULL OR status = $2)",
        )
        .bind(filter.user_id)
        .bind(&status)
        .fetch_one(&self.pool)
        .await?;

        let bills = rows.into_iter().map(Bill::try_from).collect::<Result<Vec<_>>>()?;
        Ok((bills, total))
    }

    async fn bill(&self, id: Uuid) -> Result<Option<Bill>> {
        let row = sqlx::query_as::<_, BillRow>("SELECT * FROM bills WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Bill::try_from).transpose()
    }

    async fn set_bill_status(
        &self,
        id: Uuid,
        status: BillStatus,
        notes: Option<String>,
    ) -> Result<Bill> {
        let row = sqlx::query_as::<_, BillRow>(
            "UPDATE bills SET status = $2, notes = COALESCE($3, notes) \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Bill::try_from).transpose()?.ok_or(Error::BillNotFound)
    }
}

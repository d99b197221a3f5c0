use std::collections::HashMap;

use async_trait::async_trait;
use common::{CartId, CartLineId, Money, OrderId, ProductId, UserId};
use domain::{Cart, CartLine, Order, OrderLine, PaymentMethod, Product, ShippingAddress};
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
    types::Json,
};
use uuid::Uuid;

use crate::{
    OrderPage, OrderQuery, Result, StoreError,
    store::{CartRepository, OrderRepository, ProductRepository, StockLedger},
};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price_cents, images, sizes, colors, stock, sold";

/// Stock counters are `u32` in the domain; SQL updates clamp to this so a
/// committed row always maps back.
const COUNTER_MAX: u32 = u32::MAX;

const ORDER_COLUMNS: &str = "id, user_id, shipping_address, payment_method, items_price_cents, \
     shipping_price_cents, tax_price_cents, total_price_cents, order_status, payment_status, \
     is_paid, paid_at, is_delivered, delivered_at, revision, created_at, updated_at";

/// PostgreSQL-backed storage for products, carts and orders.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        tracing::info!("running storefront migrations");
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            images: row.try_get::<Json<Vec<String>>, _>("images")?.0,
            sizes: row.try_get::<Json<Vec<String>>, _>("sizes")?.0,
            colors: row.try_get::<Json<Vec<String>>, _>("colors")?.0,
            stock: u32_column(row, "stock")?,
            sold: u32_column(row, "sold")?,
        })
    }

    fn row_to_cart_line(row: &PgRow) -> Result<CartLine> {
        Ok(CartLine {
            id: CartLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity: u32_column(row, "quantity")?,
            size: row.try_get("size")?,
            color: row.try_get("color")?,
            price: Money::from_cents(row.try_get("price_cents")?),
        })
    }

    fn row_to_order_line(row: &PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            quantity: u32_column(row, "quantity")?,
            size: row.try_get("size")?,
            color: row.try_get("color")?,
            image: row.try_get("image")?,
        })
    }

    fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        let order_status: String = row.try_get("order_status")?;
        let payment_status: String = row.try_get("payment_status")?;
        let payment_method: String = row.try_get("payment_method")?;
        let revision: i64 = row.try_get("revision")?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            lines,
            shipping_address: row
                .try_get::<Json<ShippingAddress>, _>("shipping_address")?
                .0,
            payment_method: PaymentMethod::parse(&payment_method)
                .map_err(|e| StoreError::InvalidData(e.to_string()))?,
            items_price: Money::from_cents(row.try_get("items_price_cents")?),
            shipping_price: Money::from_cents(row.try_get("shipping_price_cents")?),
            tax_price: Money::from_cents(row.try_get("tax_price_cents")?),
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
            order_status: order_status
                .parse()
                .map_err(|e: domain::UnknownStatus| StoreError::InvalidData(e.to_string()))?,
            payment_status: payment_status
                .parse()
                .map_err(|e: domain::UnknownStatus| StoreError::InvalidData(e.to_string()))?,
            is_paid: row.try_get("is_paid")?,
            paid_at: row.try_get("paid_at")?,
            is_delivered: row.try_get("is_delivered")?,
            delivered_at: row.try_get("delivered_at")?,
            revision: u64::try_from(revision)
                .map_err(|_| StoreError::InvalidData(format!("negative revision {revision}")))?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Loads the lines of every order in `order_ids`, grouped by order.
    async fn load_order_lines(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<OrderLine>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, name, price_cents, quantity, size, color, image
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in &rows {
            let order_id: Uuid = row.try_get("order_id")?;
            lines
                .entry(order_id)
                .or_default()
                .push(Self::row_to_order_line(row)?);
        }
        Ok(lines)
    }
}

fn u32_column(row: &PgRow, column: &str) -> Result<u32> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{column} out of range: {value}")))
}

fn revision_param(revision: u64) -> Result<i64> {
    i64::try_from(revision)
        .map_err(|_| StoreError::InvalidData(format!("revision out of range: {revision}")))
}

#[async_trait]
impl ProductRepository for PostgresStore {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, images, sizes, colors, stock, sold)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price_cents = EXCLUDED.price_cents,
                images = EXCLUDED.images,
                sizes = EXCLUDED.sizes,
                colors = EXCLUDED.colors,
                stock = EXCLUDED.stock,
                sold = EXCLUDED.sold,
                updated_at = NOW()
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(Json(&product.images))
        .bind(Json(&product.sizes))
        .bind(Json(&product.colors))
        .bind(i64::from(product.stock))
        .bind(i64::from(product.sold))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl StockLedger for PostgresStore {
    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<Product> {
        // The stock check and the decrement are one statement.
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET stock = stock - $2, sold = LEAST(sold + $2, {COUNTER_MAX}), updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Self::row_to_product(&row);
        }

        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match available {
            Some(available) => Err(StoreError::InsufficientStock {
                product_id,
                requested: quantity,
                available: u32::try_from(available).unwrap_or(0),
            }),
            None => Err(StoreError::ProductNotFound(product_id)),
        }
    }

    async fn restore(&self, product_id: ProductId, quantity: u32) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET stock = LEAST(stock + $2, {COUNTER_MAX}), sold = GREATEST(sold - $2, 0),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }
}

#[async_trait]
impl CartRepository for PostgresStore {
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let Some(row) = sqlx::query(
            "SELECT id, user_id, total_price_cents, updated_at FROM carts WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let cart_id: Uuid = row.try_get("id")?;
        let line_rows = sqlx::query(
            r#"
            SELECT id, product_id, quantity, size, color, price_cents
            FROM cart_lines
            WHERE cart_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        let lines = line_rows
            .iter()
            .map(Self::row_to_cart_line)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Cart {
            id: CartId::from_uuid(cart_id),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            lines,
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
            updated_at: row.try_get("updated_at")?,
        }))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // A user owns at most one cart; an existing row keeps its id.
        let cart_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO carts (id, user_id, total_price_cents, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                total_price_cents = EXCLUDED.total_price_cents,
                updated_at = EXCLUDED.updated_at
            RETURNING id
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(cart.user_id.as_uuid())
        .bind(cart.total_price.cents())
        .bind(cart.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        for (position, line) in cart.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_lines (id, cart_id, position, product_id, quantity, size, color, price_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(line.id.as_uuid())
            .bind(cart_id)
            .bind(position as i32)
            .bind(line.product_id.as_uuid())
            .bind(i64::from(line.quantity))
            .bind(&line.size)
            .bind(&line.color)
            .bind(line.price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM cart_lines WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)",
        )
        .bind(user_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE carts SET total_price_cents = 0, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            r#"
            INSERT INTO orders ({ORDER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#
        ))
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(Json(&order.shipping_address))
        .bind(order.payment_method.as_str())
        .bind(order.items_price.cents())
        .bind(order.shipping_price.cents())
        .bind(order.tax_price.cents())
        .bind(order.total_price.cents())
        .bind(order.order_status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.is_paid)
        .bind(order.paid_at)
        .bind(order.is_delivered)
        .bind(order.delivered_at)
        .bind(revision_param(order.revision)?)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_pkey")
            {
                return StoreError::DuplicateOrder(order.id);
            }
            StoreError::Database(e)
        })?;

        for (position, line) in order.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, position, product_id, name, price_cents, quantity, size, color, image)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(line.product_id.as_uuid())
            .bind(&line.name)
            .bind(line.price.cents())
            .bind(i64::from(line.quantity))
            .bind(&line.size)
            .bind(&line.color)
            .bind(&line.image)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let Some(row) = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let mut lines = self.load_order_lines(&[order_id.as_uuid()]).await?;
        let lines = lines.remove(&order_id.as_uuid()).unwrap_or_default();
        Self::row_to_order(&row, lines).map(Some)
    }

    async fn update_order(&self, order: &Order) -> Result<Order> {
        let expected = revision_param(order.revision)?;

        let new_revision: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE orders SET
                order_status = $3,
                payment_status = $4,
                is_paid = $5,
                paid_at = $6,
                is_delivered = $7,
                delivered_at = $8,
                updated_at = $9,
                revision = revision + 1
            WHERE id = $1 AND revision = $2
            RETURNING revision
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(expected)
        .bind(order.order_status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.is_paid)
        .bind(order.paid_at)
        .bind(order.is_delivered)
        .bind(order.delivered_at)
        .bind(order.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(revision) = new_revision {
            let mut updated = order.clone();
            updated.revision = u64::try_from(revision)
                .map_err(|_| StoreError::InvalidData(format!("negative revision {revision}")))?;
            return Ok(updated);
        }

        let actual: Option<i64> = sqlx::query_scalar("SELECT revision FROM orders WHERE id = $1")
            .bind(order.id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match actual {
            Some(actual) => Err(StoreError::ConcurrencyConflict {
                order_id: order.id,
                expected: order.revision,
                actual: u64::try_from(actual).unwrap_or(0),
            }),
            None => Err(StoreError::OrderNotFound(order.id)),
        }
    }

    async fn query_orders(&self, query: &OrderQuery) -> Result<OrderPage> {
        let mut filter = String::from(" WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic filter shared by the count and the page query
        if query.user_id.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND user_id = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND order_status = ${param_count}"));
        }
        if query.from_created_at.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND created_at >= ${param_count}"));
        }
        if query.to_created_at.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND created_at <= ${param_count}"));
        }

        let count_sql = format!("SELECT COUNT(*) FROM orders{filter}");
        let mut page_sql =
            format!("SELECT {ORDER_COLUMNS} FROM orders{filter} ORDER BY created_at DESC, id DESC");
        if query.limit.is_some() {
            param_count += 1;
            page_sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            page_sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut page_query = sqlx::query(&page_sql);

        if let Some(user_id) = query.user_id {
            count_query = count_query.bind(user_id.as_uuid());
            page_query = page_query.bind(user_id.as_uuid());
        }
        if let Some(status) = query.status {
            count_query = count_query.bind(status.as_str());
            page_query = page_query.bind(status.as_str());
        }
        if let Some(from) = query.from_created_at {
            count_query = count_query.bind(from);
            page_query = page_query.bind(from);
        }
        if let Some(to) = query.to_created_at {
            count_query = count_query.bind(to);
            page_query = page_query.bind(to);
        }
        if let Some(limit) = query.limit {
            page_query = page_query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(offset) = query.offset {
            page_query = page_query.bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }

        let total = count_query.fetch_one(&self.pool).await?;
        let rows = page_query.fetch_all(&self.pool).await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut lines = self.load_order_lines(&ids).await?;

        let orders = rows
            .iter()
            .zip(&ids)
            .map(|(row, id)| Self::row_to_order(row, lines.remove(id).unwrap_or_default()))
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderPage {
            orders,
            total: u64::try_from(total).unwrap_or(0),
        })
    }
}

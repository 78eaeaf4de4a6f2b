use primitives::{Order, OrderId, OrderStatus, UserId};
use tokio_postgres::{types::Json, Transaction};

use crate::db::{DbPool, PoolError};

pub const ORDER_COLUMNS: &str = "id, campaign_id, blogger, advertiser, content_type, description, requirements, price, status, deadline, content_urls, platform_urls, reject_reason, completed_at, created";

/// Which side of an order the listing is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListParty {
    Blogger(UserId),
    Advertiser(UserId),
}

impl ListParty {
    fn column(&self) -> &'static str {
        match self {
            ListParty::Blogger(_) => "blogger",
            ListParty::Advertiser(_) => "advertiser",
        }
    }

    fn user(&self) -> &UserId {
        match self {
            ListParty::Blogger(user) | ListParty::Advertiser(user) => user,
        }
    }
}

pub async fn fetch_order(pool: DbPool, order: &OrderId) -> Result<Option<Order>, PoolError> {
    let client = pool.get().await?;
    let statement = client
        .prepare(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .await?;

    let row = client.query_opt(&statement, &[order]).await?;

    Ok(row.as_ref().map(Order::from))
}

/// Fetches the order inside `transaction` with a row lock, so concurrent
/// lifecycle operations on the same order serialize on the row.
pub async fn fetch_order_for_update(
    transaction: &Transaction<'_>,
    order: &OrderId,
) -> Result<Option<Order>, tokio_postgres::Error> {
    let statement = transaction
        .prepare(&format!(
            "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .await?;

    let row = transaction.query_opt(&statement, &[order]).await?;

    Ok(row.as_ref().map(Order::from))
}

pub async fn insert_order(
    transaction: &Transaction<'_>,
    order: &Order,
) -> Result<bool, tokio_postgres::Error> {
    let statement = transaction
        .prepare("INSERT INTO orders (id, campaign_id, blogger, advertiser, content_type, description, requirements, price, status, deadline, content_urls, platform_urls, reject_reason, completed_at, created) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)")
        .await?;

    let row = transaction
        .execute(
            &statement,
            &[
                &order.id,
                &order.campaign_id,
                &order.blogger,
                &order.advertiser,
                &order.content_type,
                &order.description,
                &order.requirements,
                &order.price,
                &order.status,
                &order.deadline,
                &Json(&order.content_urls),
                &Json(&order.platform_urls),
                &order.reject_reason,
                &order.completed_at,
                &order.created,
            ],
        )
        .await?;

    Ok(row == 1)
}

/// Persists the mutable part of an order, guarded by the status the caller
/// read before mutating.
///
/// Returns `false` when the guard did not match, i.e. the row's status is no
/// longer `expected` - the caller must treat that as a conflict and abort.
pub async fn update_order(
    transaction: &Transaction<'_>,
    order: &Order,
    expected: OrderStatus,
) -> Result<bool, tokio_postgres::Error> {
    let statement = transaction
        .prepare(
            "UPDATE orders SET status = $3, content_urls = $4, platform_urls = $5, reject_reason = $6, completed_at = $7 WHERE id = $1 AND status = $2",
        )
        .await?;

    let updated = transaction
        .execute(
            &statement,
            &[
                &order.id,
                &expected,
                &order.status,
                &Json(&order.content_urls),
                &Json(&order.platform_urls),
                &order.reject_reason,
                &order.completed_at,
            ],
        )
        .await?;

    Ok(updated == 1)
}

pub async fn list_orders(
    pool: &DbPool,
    party: ListParty,
    status: Option<OrderStatus>,
    skip: u64,
    limit: u64,
) -> Result<Vec<Order>, PoolError> {
    let client = pool.get().await?;
    let statement = client
        .prepare(&format!(
            "SELECT {} FROM orders WHERE {} = $1 AND ($2::VARCHAR IS NULL OR status = $2) ORDER BY created DESC OFFSET $3 LIMIT $4",
            ORDER_COLUMNS,
            party.column()
        ))
        .await?;

    let rows = client
        .query(
            &statement,
            &[party.user(), &status, &(skip as i64), &(limit as i64)],
        )
        .await?;

    Ok(rows.iter().map(Order::from).collect())
}

pub async fn count_orders(
    pool: &DbPool,
    party: ListParty,
    status: Option<OrderStatus>,
) -> Result<u64, PoolError> {
    let client = pool.get().await?;
    let statement = client
        .prepare(&format!(
            "SELECT COUNT(id) FROM orders WHERE {} = $1 AND ($2::VARCHAR IS NULL OR status = $2)",
            party.column()
        ))
        .await?;

    let row = client.query_one(&statement, &[party.user(), &status]).await?;
    let count: i64 = row.get(0);

    Ok(count.unsigned_abs())
}

use primitives::{Campaign, CampaignId, OrderStatus, UnifiedNum, UserId};
use tokio_postgres::Transaction;

use crate::db::{DbPool, PoolError};

pub const CAMPAIGN_COLUMNS: &str =
    "id, advertiser, title, description, campaign_type, budget_total, budget_allocated, status, created";

pub async fn insert_campaign(pool: &DbPool, campaign: &Campaign) -> Result<bool, PoolError> {
    let client = pool.get().await?;
    let stmt = client
        .prepare("INSERT INTO campaigns (id, advertiser, title, description, campaign_type, budget_total, budget_allocated, status, created) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)")
        .await?;

    let row = client
        .execute(
            &stmt,
            &[
                &campaign.id,
                &campaign.advertiser,
                &campaign.title,
                &campaign.description,
                &campaign.campaign_type,
                &campaign.budget.total,
                &campaign.budget.allocated,
                &campaign.status,
                &campaign.created,
            ],
        )
        .await?;

    let inserted = row == 1;
    Ok(inserted)
}

/// ```text
/// SELECT id, advertiser, title, description, campaign_type, budget_total, budget_allocated, status, created
/// FROM campaigns WHERE id = $1
/// ```
pub async fn fetch_campaign(
    pool: DbPool,
    campaign: &CampaignId,
) -> Result<Option<Campaign>, PoolError> {
    let client = pool.get().await?;
    let statement = client
        .prepare(&format!(
            "SELECT {} FROM campaigns WHERE id = $1",
            CAMPAIGN_COLUMNS
        ))
        .await?;

    let row = client.query_opt(&statement, &[campaign]).await?;

    Ok(row.as_ref().map(Campaign::from))
}

/// Fetches the campaign inside `transaction` and takes a row lock on it, so
/// concurrent budget mutations for the same campaign serialize on the row.
pub async fn fetch_campaign_for_update(
    transaction: &Transaction<'_>,
    campaign: &CampaignId,
) -> Result<Option<Campaign>, tokio_postgres::Error> {
    let statement = transaction
        .prepare(&format!(
            "SELECT {} FROM campaigns WHERE id = $1 FOR UPDATE",
            CAMPAIGN_COLUMNS
        ))
        .await?;

    let row = transaction.query_opt(&statement, &[campaign]).await?;

    Ok(row.as_ref().map(Campaign::from))
}

pub async fn list_campaigns(
    pool: &DbPool,
    advertiser: &UserId,
    skip: u64,
    limit: u64,
) -> Result<Vec<Campaign>, PoolError> {
    let client = pool.get().await?;
    let statement = client
        .prepare(&format!(
            "SELECT {} FROM campaigns WHERE advertiser = $1 ORDER BY created DESC OFFSET $2 LIMIT $3",
            CAMPAIGN_COLUMNS
        ))
        .await?;

    let rows = client
        .query(&statement, &[advertiser, &(skip as i64), &(limit as i64)])
        .await?;

    Ok(rows.iter().map(Campaign::from).collect())
}

pub async fn count_campaigns(pool: &DbPool, advertiser: &UserId) -> Result<u64, PoolError> {
    let client = pool.get().await?;
    let statement = client
        .prepare("SELECT COUNT(id) FROM campaigns WHERE advertiser = $1")
        .await?;

    let row = client.query_one(&statement, &[advertiser]).await?;
    let count: i64 = row.get(0);

    Ok(count.unsigned_abs())
}

/// The derived spending of a campaign: the sum of the prices of its
/// completed orders. Not stored on the campaign row.
pub async fn campaign_spent(pool: &DbPool, campaign: &CampaignId) -> Result<UnifiedNum, PoolError> {
    let client = pool.get().await?;
    let statement = client
        .prepare(
            "SELECT COALESCE(SUM(price), 0)::BIGINT AS spent FROM orders WHERE campaign_id = $1 AND status = $2",
        )
        .await?;

    let row = client
        .query_one(&statement, &[campaign, &OrderStatus::Completed])
        .await?;

    Ok(row.get("spent"))
}

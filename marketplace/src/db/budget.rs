//! The campaign budget ledger.
//!
//! The single writer of `campaigns.budget_allocated`: every mutation of the
//! allocated amount in the whole application goes through [`reserve`] or
//! [`release`], and both only operate inside a caller-owned transaction so
//! the budget movement commits (or rolls back) together with the order
//! mutation that caused it.

use primitives::{campaign::Budget, CampaignId, UnifiedNum};
use thiserror::Error;
use tokio_postgres::{error::SqlState, Transaction};

static RESERVE_STATEMENT: &str = "UPDATE campaigns SET budget_allocated = budget_allocated + $2 WHERE id = $1 RETURNING budget_total, budget_allocated";

static RELEASE_STATEMENT: &str = "UPDATE campaigns SET budget_allocated = budget_allocated - $2 WHERE id = $1 RETURNING budget_total, budget_allocated";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Campaign {0} not found in the ledger")]
    CampaignNotFound(CampaignId),
    #[error("Reserving {amount} exceeds the total budget of campaign {campaign}")]
    Exceeded {
        campaign: CampaignId,
        amount: UnifiedNum,
    },
    #[error("Releasing {amount} takes the allocation of campaign {campaign} below zero")]
    Underflow {
        campaign: CampaignId,
        amount: UnifiedNum,
    },
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}

/// Atomically increases `budget_allocated` by `amount`.
///
/// Returns the budget as it stands after the increment. Fails with
/// [`Error::Exceeded`] when the increment would break `allocated <= total` -
/// the schema `CHECK` raises it on the spot and the returned row is
/// re-verified on top of that. The caller must abort its transaction on any
/// error, nothing is rolled back here.
pub async fn reserve(
    transaction: &Transaction<'_>,
    campaign: &CampaignId,
    amount: UnifiedNum,
) -> Result<Budget, Error> {
    let statement = transaction.prepare(RESERVE_STATEMENT).await?;

    let row = transaction
        .query_opt(&statement, &[campaign, &amount])
        .await
        .map_err(|error| match error.code() {
            Some(&SqlState::CHECK_VIOLATION) => Error::Exceeded {
                campaign: *campaign,
                amount,
            },
            _ => Error::Postgres(error),
        })?
        .ok_or(Error::CampaignNotFound(*campaign))?;

    let budget = Budget {
        total: row.get("budget_total"),
        allocated: row.get("budget_allocated"),
    };

    if budget.allocated > budget.total {
        return Err(Error::Exceeded {
            campaign: *campaign,
            amount,
        });
    }

    Ok(budget)
}

/// Atomically decreases `budget_allocated` by `amount`.
///
/// The counterpart of [`reserve`], used when an order stops consuming its
/// reservation (rejection). An allocation below zero means a reservation was
/// released twice - that is never clamped, it fails with
/// [`Error::Underflow`] and the caller must abort its transaction.
pub async fn release(
    transaction: &Transaction<'_>,
    campaign: &CampaignId,
    amount: UnifiedNum,
) -> Result<Budget, Error> {
    let statement = transaction.prepare(RELEASE_STATEMENT).await?;

    let row = transaction
        .query_opt(&statement, &[campaign, &amount])
        .await
        .map_err(|error| match error.code() {
            Some(&SqlState::CHECK_VIOLATION) => Error::Underflow {
                campaign: *campaign,
                amount,
            },
            _ => Error::Postgres(error),
        })?
        .ok_or(Error::CampaignNotFound(*campaign))?;

    Ok(Budget {
        total: row.get("budget_total"),
        allocated: row.get("budget_allocated"),
    })
}

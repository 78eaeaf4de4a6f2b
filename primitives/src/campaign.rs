use crate::{UnifiedNum, UserId};

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use campaign_id::CampaignId;

mod campaign_id {
    use hex::{FromHex, FromHexError};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::{fmt, str::FromStr};
    use thiserror::Error;
    use uuid::Uuid;

    /// an Id of 16 bytes, (de)serialized as a `0x` prefixed hex
    ///
    /// In this implementation of the `CampaignId` the value is generated
    /// from a `Uuid::new_v4()`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CampaignId([u8; 16]);

    impl CampaignId {
        /// Generates randomly a `CampaignId` using `Uuid::new_v4()`
        pub fn new() -> Self {
            Self::default()
        }

        pub fn as_bytes(&self) -> &[u8; 16] {
            &self.0
        }

        pub fn from_bytes(bytes: &[u8; 16]) -> Self {
            Self(*bytes)
        }
    }

    impl Default for CampaignId {
        fn default() -> Self {
            Self(*Uuid::new_v4().as_bytes())
        }
    }

    impl AsRef<[u8]> for CampaignId {
        fn as_ref(&self) -> &[u8] {
            &self.0
        }
    }

    #[derive(Debug, Error)]
    pub enum Error {
        /// the `0x` prefix is missing
        #[error("Expected a `0x` prefix")]
        ExpectedPrefix,
        #[error(transparent)]
        InvalidHex(#[from] FromHexError),
    }

    impl FromStr for CampaignId {
        type Err = Error;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.strip_prefix("0x") {
                Some(hex) => Ok(Self(<[u8; 16]>::from_hex(hex)?)),
                None => Err(Error::ExpectedPrefix),
            }
        }
    }

    impl fmt::Display for CampaignId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }

    impl Serialize for CampaignId {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&self.to_string())
        }
    }

    impl<'de> Deserialize<'de> for CampaignId {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let string_id = String::deserialize(deserializer)?;

            string_id.parse().map_err(serde::de::Error::custom)
        }
    }

    #[cfg(feature = "postgres")]
    mod postgres {
        use super::CampaignId;
        use bytes::BytesMut;
        use std::error::Error;
        use tokio_postgres::types::{accepts, to_sql_checked, FromSql, IsNull, ToSql, Type};

        impl<'a> FromSql<'a> for CampaignId {
            fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
                let str_slice = <&str as FromSql>::from_sql(ty, raw)?;

                Ok(str_slice.parse()?)
            }

            accepts!(TEXT, VARCHAR);
        }

        impl ToSql for CampaignId {
            fn to_sql(
                &self,
                ty: &Type,
                w: &mut BytesMut,
            ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
                self.to_string().to_sql(ty, w)
            }

            accepts!(TEXT, VARCHAR);
            to_sql_checked!();
        }
    }

    #[cfg(test)]
    mod test {
        use super::*;
        use serde_json::{to_value, Value};

        #[test]
        fn de_serializes_campaign_id() {
            let id = CampaignId::new();

            assert_eq!(
                Value::String(id.to_string()),
                to_value(id).expect("Should serialize")
            );
        }
    }
}

/// An advertiser's budgeted request for influencer content.
///
/// The `budget` is the only field of the campaign that is mutated after
/// creation and it is mutated exclusively by the order workflow - reserving
/// on order creation and releasing on order rejection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: CampaignId,
    pub advertiser: UserId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub campaign_type: CampaignType,
    pub budget: Budget,
    pub status: CampaignStatus,
    /// A millisecond timestamp of when the campaign was created
    #[serde(with = "ts_milliseconds")]
    pub created: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr,
)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CampaignType {
    Product,
    Service,
    Brand,
    Event,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr,
)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl Default for CampaignStatus {
    fn default() -> Self {
        Self::Draft
    }
}

/// The campaign's budget bookkeeping.
///
/// Invariant: `allocated <= total` after every committed operation.
/// `allocated` is the amount currently held by non-cancelled orders; the
/// spent amount is not stored, it is derived from the campaign's completed
/// orders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub total: UnifiedNum,
    #[serde(default)]
    pub allocated: UnifiedNum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BudgetError {
    #[error("the remaining budget cannot fund the requested amount")]
    InsufficientBudget,
    #[error("the released amount exceeds the allocated budget")]
    ReleaseExceedsAllocated,
}

impl Budget {
    pub fn new(total: UnifiedNum) -> Self {
        Self {
            total,
            allocated: UnifiedNum::default(),
        }
    }

    /// The amount still available for new orders: `total - allocated`.
    pub fn available(&self) -> UnifiedNum {
        self.total
            .checked_sub(&self.allocated)
            .unwrap_or_default()
    }

    /// Holds `amount` for a new order.
    ///
    /// Fails when the increased allocation would exceed `total`; on failure
    /// the budget is left untouched.
    pub fn reserve(&mut self, amount: UnifiedNum) -> Result<(), BudgetError> {
        let allocated = self
            .allocated
            .checked_add(&amount)
            .ok_or(BudgetError::InsufficientBudget)?;

        if allocated > self.total {
            return Err(BudgetError::InsufficientBudget);
        }

        self.allocated = allocated;
        Ok(())
    }

    /// Returns `amount` previously held by an order.
    ///
    /// Fails when the allocation would drop below zero; on failure the
    /// budget is left untouched.
    pub fn release(&mut self, amount: UnifiedNum) -> Result<(), BudgetError> {
        self.allocated = self
            .allocated
            .checked_sub(&amount)
            .ok_or(BudgetError::ReleaseExceedsAllocated)?;

        Ok(())
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    use super::{Budget, Campaign, CampaignStatus, CampaignType};
    use bytes::BytesMut;
    use std::error::Error;
    use tokio_postgres::{
        types::{accepts, to_sql_checked, FromSql, IsNull, ToSql, Type},
        Row,
    };

    impl From<&Row> for Campaign {
        fn from(row: &Row) -> Self {
            Self {
                id: row.get("id"),
                advertiser: row.get("advertiser"),
                title: row.get("title"),
                description: row.get("description"),
                campaign_type: row.get("campaign_type"),
                budget: Budget {
                    total: row.get("budget_total"),
                    allocated: row.get("budget_allocated"),
                },
                status: row.get("status"),
                created: row.get("created"),
            }
        }
    }

    impl<'a> FromSql<'a> for CampaignStatus {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            let str_slice = <&str as FromSql>::from_sql(ty, raw)?;

            Ok(str_slice.parse()?)
        }

        accepts!(TEXT, VARCHAR);
    }

    impl ToSql for CampaignStatus {
        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
            self.to_string().to_sql(ty, w)
        }

        accepts!(TEXT, VARCHAR);
        to_sql_checked!();
    }

    impl<'a> FromSql<'a> for CampaignType {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            let str_slice = <&str as FromSql>::from_sql(ty, raw)?;

            Ok(str_slice.parse()?)
        }

        accepts!(TEXT, VARCHAR);
    }

    impl ToSql for CampaignType {
        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
            self.to_string().to_sql(ty, w)
        }

        accepts!(TEXT, VARCHAR);
        to_sql_checked!();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn budget(total: u64, allocated: u64) -> Budget {
        Budget {
            total: UnifiedNum::from_whole(total).expect("Should create total"),
            allocated: UnifiedNum::from_whole(allocated).expect("Should create allocated"),
        }
    }

    #[test]
    fn reserving_the_exact_available_amount_succeeds() {
        let mut budget = budget(300_000, 50_000);

        budget
            .reserve(UnifiedNum::from_whole(250_000).unwrap())
            .expect("Should reserve the exact available amount");

        assert_eq!(budget.allocated, budget.total);
        assert_eq!(UnifiedNum::default(), budget.available());
    }

    #[test]
    fn reserving_one_minor_unit_over_the_available_amount_fails() {
        let mut budget = budget(300_000, 50_000);
        let over = UnifiedNum::from_whole(250_000)
            .unwrap()
            .checked_add(&UnifiedNum::from_u64(1))
            .unwrap();

        assert_eq!(
            Err(BudgetError::InsufficientBudget),
            budget.reserve(over),
            "one minor unit over the available amount must be rejected"
        );
        // a failed reserve leaves the budget untouched
        assert_eq!(budget, self::budget(300_000, 50_000));
    }

    #[test]
    fn a_fully_allocated_budget_rejects_the_smallest_reservation() {
        let mut budget = budget(300_000, 50_000);

        budget
            .reserve(UnifiedNum::from_whole(250_000).unwrap())
            .expect("Should allocate the whole budget");

        assert_eq!(
            Err(BudgetError::InsufficientBudget),
            budget.reserve(UnifiedNum::from_u64(1))
        );
    }

    #[test]
    fn reserve_then_release_restores_the_allocation_exactly() {
        let mut budget = budget(300_000, 50_000);
        let price = UnifiedNum::from_whole(120_000).unwrap();

        for _ in 0..10 {
            budget.reserve(price).expect("Should reserve");
            budget.release(price).expect("Should release");
        }

        assert_eq!(budget, self::budget(300_000, 50_000), "no drift");
    }

    #[test]
    fn releasing_more_than_allocated_fails_and_keeps_the_budget() {
        let mut budget = budget(300_000, 50_000);

        assert_eq!(
            Err(BudgetError::ReleaseExceedsAllocated),
            budget.release(UnifiedNum::from_whole(50_001).unwrap())
        );
        assert_eq!(budget, self::budget(300_000, 50_000));
    }

    #[test]
    fn reserve_overflow_is_insufficient_budget() {
        let mut budget = Budget {
            total: UnifiedNum::from_u64(u64::MAX),
            allocated: UnifiedNum::from_u64(u64::MAX - 1),
        };

        assert_eq!(
            Err(BudgetError::InsufficientBudget),
            budget.reserve(UnifiedNum::from_u64(2))
        );
    }
}

//! Request and response types of the `marketplace` REST API.

use crate::{Campaign, Order, UnifiedNum};
use serde::{Deserialize, Serialize};

pub use campaign_create::CreateCampaign;
pub use order_create::CreateOrder;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrorResponse {
    pub status_code: u64,
    pub message: String,
    pub validation: Vec<String>,
}

/// Pagination metadata returned next to every list of records.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total_items: u64) -> Self {
        Self {
            current_page: page,
            // ceiling division
            total_pages: (total_items / limit.max(1))
                + u64::from(total_items % limit.max(1) > 0),
            total_items,
            items_per_page: limit,
        }
    }
}

pub mod order_create {
    use super::*;
    use crate::{CampaignId, ContentType, Order, OrderId, OrderStatus, UserId};
    use chrono::{serde::ts_milliseconds, DateTime, Utc};

    /// All fields available to the advertiser when creating an [`Order`].
    ///
    /// The [`OrderId`] is randomly generated by the server, the advertiser
    /// is taken from the authenticated session and the status always starts
    /// out as `pending`.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateOrder {
        pub campaign_id: CampaignId,
        pub blogger_id: UserId,
        pub content_type: ContentType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub requirements: Option<String>,
        #[serde(with = "ts_milliseconds")]
        pub deadline: DateTime<Utc>,
        pub price: UnifiedNum,
    }

    impl CreateOrder {
        /// Creates the pending `Order` with a random [`OrderId`].
        pub fn into_order(self, advertiser: UserId) -> Order {
            Order {
                id: OrderId::new(),
                campaign_id: self.campaign_id,
                blogger: self.blogger_id,
                advertiser,
                content_type: self.content_type,
                description: self.description,
                requirements: self.requirements,
                price: self.price,
                status: OrderStatus::Pending,
                deadline: self.deadline,
                content_urls: vec![],
                platform_urls: vec![],
                reject_reason: None,
                completed_at: None,
                created: Utc::now(),
            }
        }
    }
}

/// The blogger's deliverables handed in for review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrder {
    pub content_urls: Vec<url::Url>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platform_urls: Vec<url::Url>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RejectOrder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub mod order_list {
    use super::*;
    use crate::OrderStatus;

    pub const DEFAULT_LIMIT: u64 = 20;
    pub const MAX_LIMIT: u64 = 100;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    pub struct OrderListQuery {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub status: Option<OrderStatus>,
        #[serde(default = "default_page")]
        pub page: u64,
        #[serde(default = "default_limit")]
        pub limit: u64,
    }

    impl OrderListQuery {
        /// The effective page size, clamped to [`MAX_LIMIT`].
        pub fn limit(&self) -> u64 {
            self.limit.clamp(1, MAX_LIMIT)
        }

        /// The effective 1-based page.
        pub fn page(&self) -> u64 {
            self.page.max(1)
        }

        pub fn skip(&self) -> u64 {
            (self.page() - 1) * self.limit()
        }
    }

    fn default_page() -> u64 {
        1
    }

    fn default_limit() -> u64 {
        DEFAULT_LIMIT
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    pub struct OrderListResponse {
        pub data: Vec<Order>,
        pub pagination: Pagination,
    }
}

pub mod campaign_create {
    use super::*;
    use crate::{
        campaign::{Budget, CampaignStatus, CampaignType},
        Campaign, CampaignId, UserId,
    };
    use chrono::Utc;

    /// All fields available to the advertiser when creating a [`Campaign`].
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateCampaign {
        pub title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        pub campaign_type: CampaignType,
        /// The total budget ceiling; nothing is allocated yet.
        pub budget: UnifiedNum,
    }

    impl CreateCampaign {
        /// Creates the draft `Campaign` with a random [`CampaignId`].
        pub fn into_campaign(self, advertiser: UserId) -> Campaign {
            Campaign {
                id: CampaignId::new(),
                advertiser,
                title: self.title,
                description: self.description,
                campaign_type: self.campaign_type,
                budget: Budget::new(self.budget),
                status: CampaignStatus::Draft,
                created: Utc::now(),
            }
        }
    }
}

pub mod campaign_list {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    pub struct CampaignListQuery {
        #[serde(default = "default_page")]
        pub page: u64,
        #[serde(default = "default_limit")]
        pub limit: u64,
    }

    impl CampaignListQuery {
        pub fn limit(&self) -> u64 {
            self.limit.clamp(1, super::order_list::MAX_LIMIT)
        }

        pub fn page(&self) -> u64 {
            self.page.max(1)
        }

        pub fn skip(&self) -> u64 {
            (self.page() - 1) * self.limit()
        }
    }

    fn default_page() -> u64 {
        1
    }

    fn default_limit() -> u64 {
        super::order_list::DEFAULT_LIMIT
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    pub struct CampaignListResponse {
        pub campaigns: Vec<Campaign>,
        pub pagination: Pagination,
    }
}

/// A campaign together with its derived spending.
///
/// `spent` is not stored on the campaign - it is the sum of the prices of
/// the campaign's completed orders at the time of the request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignResponse {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub spent: UnifiedNum,
}

#[cfg(test)]
mod test {
    use super::{order_list::*, *};
    use pretty_assertions::assert_eq;

    #[test]
    fn order_list_query_defaults_and_caps() {
        let empty: OrderListQuery = serde_json::from_str("{}").expect("Should deserialize");
        assert_eq!(None, empty.status);
        assert_eq!(1, empty.page());
        assert_eq!(DEFAULT_LIMIT, empty.limit());
        assert_eq!(0, empty.skip());

        let big: OrderListQuery =
            serde_json::from_str(r#"{"status":"in_progress","page":3,"limit":1000}"#)
                .expect("Should deserialize");
        assert_eq!(Some(crate::OrderStatus::InProgress), big.status);
        assert_eq!(MAX_LIMIT, big.limit());
        assert_eq!(2 * MAX_LIMIT, big.skip());

        // a zero page behaves like the first one
        let zero: OrderListQuery =
            serde_json::from_str(r#"{"page":0,"limit":0}"#).expect("Should deserialize");
        assert_eq!(1, zero.page());
        assert_eq!(1, zero.limit());
    }

    #[test]
    fn pagination_rounds_the_total_pages_up() {
        assert_eq!(
            Pagination {
                current_page: 1,
                total_pages: 3,
                total_items: 41,
                items_per_page: 20,
            },
            Pagination::new(1, 20, 41)
        );
        assert_eq!(2, Pagination::new(1, 20, 40).total_pages);
        assert_eq!(0, Pagination::new(1, 20, 0).total_pages);
    }

    #[test]
    fn create_order_deserializes_the_original_wire_format() {
        let json = r#"{
            "campaignId": "0xa1b2c3d4e5f60718293a4b5c6d7e8f90",
            "bloggerId": "0x0f9b5c76bef9f9645c16eb79243bdca5",
            "contentType": "story",
            "description": "Three stories over one weekend",
            "deadline": 4102444800000,
            "price": 25000
        }"#;

        let create = serde_json::from_str::<CreateOrder>(json).expect("Should deserialize");
        assert_eq!(crate::ContentType::Story, create.content_type);
        assert_eq!(UnifiedNum::from_u64(25_000), create.price);
        assert_eq!(None, create.requirements);

        let advertiser = crate::UserId::new();
        let order = create.into_order(advertiser);
        assert_eq!(crate::OrderStatus::Pending, order.status);
        assert_eq!(advertiser, order.advertiser);
        assert!(order.content_urls.is_empty());
        assert_eq!(None, order.completed_at);
    }
}

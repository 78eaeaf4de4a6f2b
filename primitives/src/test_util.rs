//! Testing utilities: well-known users, a dummy campaign and a dummy order.
//!
//! Gated behind the `test-util` feature.

use chrono::TimeZone;
use once_cell::sync::Lazy;

use crate::{
    campaign::{Budget, CampaignStatus, CampaignType},
    Campaign, CampaignId, ContentType, Order, OrderId, OrderStatus, UnifiedNum, UserId,
};

pub static ADVERTISER: Lazy<UserId> = Lazy::new(|| {
    "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1"
        .parse()
        .expect("Should parse ADVERTISER")
});

pub static ADVERTISER_2: Lazy<UserId> = Lazy::new(|| {
    "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa2"
        .parse()
        .expect("Should parse ADVERTISER_2")
});

pub static BLOGGER: Lazy<UserId> = Lazy::new(|| {
    "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb1"
        .parse()
        .expect("Should parse BLOGGER")
});

pub static BLOGGER_2: Lazy<UserId> = Lazy::new(|| {
    "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2"
        .parse()
        .expect("Should parse BLOGGER_2")
});

pub static ADMIN: Lazy<UserId> = Lazy::new(|| {
    "0xccccccccccccccccccccccccccccccc1"
        .parse()
        .expect("Should parse ADMIN")
});

/// An active campaign of [`ADVERTISER`] with `300 000.00` total budget,
/// `50 000.00` of which is already allocated.
pub static DUMMY_CAMPAIGN: Lazy<Campaign> = Lazy::new(|| Campaign {
    id: "0x936da01f9abd4d9d80c702af85c822a8"
        .parse()
        .expect("Should parse CampaignId"),
    advertiser: *ADVERTISER,
    title: "Spring collection launch".to_string(),
    description: Some("Launch coverage for the spring collection".to_string()),
    campaign_type: CampaignType::Product,
    budget: Budget {
        total: UnifiedNum::from_whole(300_000).expect("Should create total"),
        allocated: UnifiedNum::from_whole(50_000).expect("Should create allocated"),
    },
    status: CampaignStatus::Active,
    created: chrono::Utc
        .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp"),
});

/// A pending order of [`BLOGGER`] against [`DUMMY_CAMPAIGN`].
pub static DUMMY_ORDER: Lazy<Order> = Lazy::new(|| Order {
    id: "0x16f083a7cb5d41b8b6e1a67e7b2a79af"
        .parse()
        .expect("Should parse OrderId"),
    campaign_id: DUMMY_CAMPAIGN.id,
    blogger: *BLOGGER,
    advertiser: *ADVERTISER,
    content_type: ContentType::Post,
    description: Some("One feed post featuring the spring collection".to_string()),
    requirements: Some("Tag the brand account".to_string()),
    price: UnifiedNum::from_whole(1_500).expect("Should create price"),
    status: OrderStatus::Pending,
    deadline: chrono::Utc
        .with_ymd_and_hms(2024, 4, 15, 12, 0, 0)
        .single()
        .expect("valid timestamp"),
    content_urls: vec![],
    platform_urls: vec![],
    reject_reason: None,
    completed_at: None,
    created: chrono::Utc
        .with_ymd_and_hms(2024, 3, 10, 9, 30, 0)
        .single()
        .expect("valid timestamp"),
});

pub fn discard_logger() -> slog::Logger {
    use slog::{o, Discard, Logger};

    Logger::root(Discard, o!())
}

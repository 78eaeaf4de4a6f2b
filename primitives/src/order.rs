use crate::{CampaignId, UnifiedNum, UserId};

use chrono::{
    serde::{ts_milliseconds, ts_milliseconds_option},
    DateTime, Utc,
};
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub use order_id::OrderId;

mod order_id {
    use hex::{FromHex, FromHexError};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::{fmt, str::FromStr};
    use thiserror::Error;
    use uuid::Uuid;

    /// an Id of 16 bytes, (de)serialized as a `0x` prefixed hex
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OrderId([u8; 16]);

    impl OrderId {
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

    impl Default for OrderId {
        fn default() -> Self {
            Self(*Uuid::new_v4().as_bytes())
        }
    }

    impl AsRef<[u8]> for OrderId {
        fn as_ref(&self) -> &[u8] {
            &self.0
        }
    }

    #[derive(Debug, Error)]
    pub enum Error {
        #[error("Expected a `0x` prefix")]
        ExpectedPrefix,
        #[error(transparent)]
        InvalidHex(#[from] FromHexError),
    }

    impl FromStr for OrderId {
        type Err = Error;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.strip_prefix("0x") {
                Some(hex) => Ok(Self(<[u8; 16]>::from_hex(hex)?)),
                None => Err(Error::ExpectedPrefix),
            }
        }
    }

    impl fmt::Display for OrderId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }

    impl Serialize for OrderId {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&self.to_string())
        }
    }

    impl<'de> Deserialize<'de> for OrderId {
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
        use super::OrderId;
        use bytes::BytesMut;
        use std::error::Error;
        use tokio_postgres::types::{accepts, to_sql_checked, FromSql, IsNull, ToSql, Type};

        impl<'a> FromSql<'a> for OrderId {
            fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
                let str_slice = <&str as FromSql>::from_sql(ty, raw)?;

                Ok(str_slice.parse()?)
            }

            accepts!(TEXT, VARCHAR);
        }

        impl ToSql for OrderId {
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
}

/// The kind of deliverable contracted with the blogger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr,
)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Post,
    Story,
    Reel,
    Video,
    Collaboration,
}

/// The lifecycle status of an [`Order`].
///
/// `completed` and `cancelled` are terminal - no action leads out of them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Review,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// The status after `action`, or [`InvalidTransition`] when the pair is
    /// not part of the lifecycle.
    pub fn on(self, action: Action) -> Result<OrderStatus, InvalidTransition> {
        use Action::*;
        use OrderStatus::*;

        match (self, action) {
            (Pending, Accept) => Ok(InProgress),
            (Pending, Reject) => Ok(Cancelled),
            (InProgress, Submit) => Ok(Review),
            (Review, Approve) => Ok(Completed),
            (from, action) => Err(InvalidTransition { from, action }),
        }
    }
}

/// An action a participant performs on an [`Order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromStr)]
#[display(style = "lowercase")]
pub enum Action {
    /// blogger starts working on the order
    Accept,
    /// blogger turns the order down, the reserved budget is returned
    Reject,
    /// blogger hands in the deliverables for review
    Submit,
    /// advertiser accepts the submitted work
    Approve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action} an order in status {from}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The caller is not the participant this action belongs to.
    #[error("the order does not belong to the caller")]
    NotOwner,
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    #[error("at least one content URL must be provided")]
    NoContentUrls,
}

/// A single piece of contracted work between one advertiser and one
/// blogger, drawn against a campaign's budget.
///
/// Orders are only created through the order creation workflow and their
/// status only changes through the methods below - each of them checks the
/// caller and the current status before mutating anything, so a failed call
/// leaves the order exactly as it was.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub campaign_id: CampaignId,
    pub blogger: UserId,
    pub advertiser: UserId,
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    pub price: UnifiedNum,
    pub status: OrderStatus,
    #[serde(with = "ts_milliseconds")]
    pub deadline: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_urls: Vec<Url>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platform_urls: Vec<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
    /// Set exactly once, when the advertiser approves the submitted work.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "ts_milliseconds_option"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(with = "ts_milliseconds")]
    pub created: DateTime<Utc>,
}

impl Order {
    pub fn is_participant(&self, user: UserId) -> bool {
        user == self.blogger || user == self.advertiser
    }

    /// pending -> in_progress, by the order's blogger.
    pub fn accept(&mut self, caller: UserId) -> Result<(), Error> {
        if caller != self.blogger {
            return Err(Error::NotOwner);
        }
        self.status = self.status.on(Action::Accept)?;

        Ok(())
    }

    /// pending -> cancelled, by the order's blogger.
    ///
    /// The budget reserved for this order must be released in the same
    /// atomic unit as this status change.
    pub fn reject(&mut self, caller: UserId, reason: Option<String>) -> Result<(), Error> {
        if caller != self.blogger {
            return Err(Error::NotOwner);
        }
        self.status = self.status.on(Action::Reject)?;
        self.reject_reason = reason;

        Ok(())
    }

    /// in_progress -> review, by the order's blogger.
    ///
    /// The URLs are stored verbatim; syntactic URL validation happened at
    /// the parsing boundary.
    pub fn submit(
        &mut self,
        caller: UserId,
        content_urls: Vec<Url>,
        platform_urls: Vec<Url>,
    ) -> Result<(), Error> {
        if caller != self.blogger {
            return Err(Error::NotOwner);
        }
        if content_urls.is_empty() {
            return Err(Error::NoContentUrls);
        }
        self.status = self.status.on(Action::Submit)?;
        self.content_urls = content_urls;
        self.platform_urls = platform_urls;

        Ok(())
    }

    /// review -> completed, by the order's advertiser.
    pub fn approve(&mut self, caller: UserId, now: DateTime<Utc>) -> Result<(), Error> {
        if caller != self.advertiser {
            return Err(Error::NotOwner);
        }
        self.status = self.status.on(Action::Approve)?;
        self.completed_at = Some(now);

        Ok(())
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    use super::{ContentType, Order, OrderStatus};
    use bytes::BytesMut;
    use std::error::Error;
    use tokio_postgres::{
        types::{accepts, to_sql_checked, FromSql, IsNull, Json, ToSql, Type},
        Row,
    };
    use url::Url;

    impl<'a> FromSql<'a> for ContentType {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            let str_slice = <&str as FromSql>::from_sql(ty, raw)?;

            Ok(str_slice.parse()?)
        }

        accepts!(TEXT, VARCHAR);
    }

    impl ToSql for ContentType {
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

    impl<'a> FromSql<'a> for OrderStatus {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            let str_slice = <&str as FromSql>::from_sql(ty, raw)?;

            Ok(str_slice.parse()?)
        }

        accepts!(TEXT, VARCHAR);
    }

    impl ToSql for OrderStatus {
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

    impl From<&Row> for Order {
        fn from(row: &Row) -> Self {
            Self {
                id: row.get("id"),
                campaign_id: row.get("campaign_id"),
                blogger: row.get("blogger"),
                advertiser: row.get("advertiser"),
                content_type: row.get("content_type"),
                description: row.get("description"),
                requirements: row.get("requirements"),
                price: row.get("price"),
                status: row.get("status"),
                deadline: row.get("deadline"),
                content_urls: row.get::<_, Json<Vec<Url>>>("content_urls").0,
                platform_urls: row.get::<_, Json<Vec<Url>>>("platform_urls").0,
                reject_reason: row.get("reject_reason"),
                completed_at: row.get("completed_at"),
                created: row.get("created"),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    const ALL_STATUSES: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::InProgress,
        OrderStatus::Review,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];
    const ALL_ACTIONS: [Action; 4] = [
        Action::Accept,
        Action::Reject,
        Action::Submit,
        Action::Approve,
    ];

    fn dummy_order() -> Order {
        let blogger = UserId::new();
        let advertiser = UserId::new();
        // truncated to milliseconds, the precision of the wire format
        let now = chrono::TimeZone::timestamp_millis_opt(&Utc, Utc::now().timestamp_millis())
            .single()
            .expect("valid timestamp");

        Order {
            id: OrderId::new(),
            campaign_id: CampaignId::new(),
            blogger,
            advertiser,
            content_type: ContentType::Post,
            description: Some("A post about the new product line".to_string()),
            requirements: None,
            price: UnifiedNum::from_whole(500).expect("Should create price"),
            status: OrderStatus::Pending,
            deadline: now + chrono::Duration::days(14),
            content_urls: vec![],
            platform_urls: vec![],
            reject_reason: None,
            completed_at: None,
            created: now,
        }
    }

    fn content_url() -> Url {
        "https://instagram.com/p/abc123".parse().expect("valid url")
    }

    #[test]
    fn only_the_four_lifecycle_transitions_are_legal() {
        let legal = [
            (OrderStatus::Pending, Action::Accept, OrderStatus::InProgress),
            (OrderStatus::Pending, Action::Reject, OrderStatus::Cancelled),
            (OrderStatus::InProgress, Action::Submit, OrderStatus::Review),
            (OrderStatus::Review, Action::Approve, OrderStatus::Completed),
        ];

        for from in ALL_STATUSES {
            for action in ALL_ACTIONS {
                let expected = legal
                    .iter()
                    .find(|(legal_from, legal_action, _)| {
                        (*legal_from, *legal_action) == (from, action)
                    })
                    .map(|(_, _, to)| *to);

                match expected {
                    Some(to) => assert_eq!(Ok(to), from.on(action)),
                    None => assert_eq!(Err(InvalidTransition { from, action }), from.on(action)),
                }
            }
        }
    }

    #[test]
    fn terminal_statuses_allow_no_action() {
        for status in ALL_STATUSES.into_iter().filter(|s| s.is_terminal()) {
            for action in ALL_ACTIONS {
                assert!(status.on(action).is_err());
            }
        }
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::InProgress.is_terminal());
        assert!(!OrderStatus::Review.is_terminal());
    }

    #[test]
    fn the_full_happy_path_accept_submit_approve() {
        let mut order = dummy_order();
        let blogger = order.blogger;
        let advertiser = order.advertiser;

        order.accept(blogger).expect("blogger accepts");
        assert_eq!(OrderStatus::InProgress, order.status);

        order
            .submit(blogger, vec![content_url()], vec![])
            .expect("blogger submits");
        assert_eq!(OrderStatus::Review, order.status);
        assert_eq!(vec![content_url()], order.content_urls);

        let now = Utc::now();
        order.approve(advertiser, now).expect("advertiser approves");
        assert_eq!(OrderStatus::Completed, order.status);
        assert_eq!(Some(now), order.completed_at);
    }

    #[test]
    fn approving_twice_fails_and_keeps_the_first_timestamp() {
        let mut order = dummy_order();
        order.status = OrderStatus::Review;
        let advertiser = order.advertiser;

        let first = Utc::now();
        order.approve(advertiser, first).expect("first approve");

        let result = order.approve(advertiser, first + chrono::Duration::hours(1));
        assert_eq!(
            Err(Error::Transition(InvalidTransition {
                from: OrderStatus::Completed,
                action: Action::Approve,
            })),
            result
        );
        assert_eq!(Some(first), order.completed_at, "timestamp set exactly once");
    }

    #[test]
    fn reject_stores_the_reason_and_cancels() {
        let mut order = dummy_order();
        let blogger = order.blogger;

        order
            .reject(blogger, Some("fully booked this month".to_string()))
            .expect("blogger rejects");

        assert_eq!(OrderStatus::Cancelled, order.status);
        assert_eq!(
            Some("fully booked this month".to_string()),
            order.reject_reason
        );

        // a cancelled order is terminal, accepting it afterwards fails
        assert_eq!(
            Err(Error::Transition(InvalidTransition {
                from: OrderStatus::Cancelled,
                action: Action::Accept,
            })),
            order.accept(blogger)
        );
    }

    #[test]
    fn rejecting_an_accepted_order_is_an_invalid_transition() {
        let mut order = dummy_order();
        let blogger = order.blogger;

        order.accept(blogger).expect("Should accept");
        let result = order.reject(blogger, None);

        assert_eq!(
            Err(Error::Transition(InvalidTransition {
                from: OrderStatus::InProgress,
                action: Action::Reject,
            })),
            result
        );
        assert_eq!(OrderStatus::InProgress, order.status);
    }

    #[test]
    fn a_stranger_or_the_wrong_party_cannot_move_the_order() {
        let mut order = dummy_order();
        let stranger = UserId::new();
        let advertiser = order.advertiser;
        let blogger = order.blogger;

        assert_eq!(Err(Error::NotOwner), order.accept(stranger));
        // the advertiser does not act on the blogger's side of the lifecycle
        assert_eq!(Err(Error::NotOwner), order.accept(advertiser));
        assert_eq!(Err(Error::NotOwner), order.reject(advertiser, None));
        // ... and the blogger does not approve their own work
        order.status = OrderStatus::Review;
        assert_eq!(Err(Error::NotOwner), order.approve(blogger, Utc::now()));

        // nothing was mutated along the way
        assert_eq!(OrderStatus::Review, order.status);
        assert_eq!(None, order.completed_at);
    }

    #[test]
    fn submit_requires_at_least_one_content_url() {
        let mut order = dummy_order();
        let blogger = order.blogger;
        order.accept(blogger).expect("Should accept");

        assert_eq!(
            Err(Error::NoContentUrls),
            order.submit(blogger, vec![], vec![content_url()])
        );
        assert_eq!(OrderStatus::InProgress, order.status);
        assert!(order.platform_urls.is_empty(), "failed submit stores nothing");
    }

    #[test]
    fn order_serializes_with_camel_case_fields() {
        let order = dummy_order();
        let json = serde_json::to_value(&order).expect("Should serialize");

        assert_eq!(
            json["campaignId"],
            serde_json::Value::String(order.campaign_id.to_string())
        );
        assert_eq!(json["status"], serde_json::Value::String("pending".into()));
        assert!(json.get("completedAt").is_none());
        assert!(json.get("contentUrls").is_none(), "empty vec is skipped");

        let roundtrip: Order = serde_json::from_value(json).expect("Should deserialize");
        assert_eq!(order, roundtrip);
    }
}

#![deny(clippy::all)]
#![deny(rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use campaign::{Campaign, CampaignId};
pub use order::{Action, ContentType, Order, OrderId, OrderStatus};
pub use unified_num::UnifiedNum;
pub use user::{Role, UserId};

pub mod campaign;
pub mod marketplace;
pub mod order;
pub mod order_validator;
pub mod unified_num;
pub mod user;

#[cfg(feature = "test-util")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod test_util;

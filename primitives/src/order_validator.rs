use crate::{
    marketplace::{CreateOrder, RejectOrder, SubmitOrder},
    UnifiedNum,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// The lowest price an order can be placed at: 100.00
pub const MIN_PRICE: UnifiedNum = UnifiedNum::from_u64(100_00);
/// The highest price an order can be placed at: 1 000 000.00
pub const MAX_PRICE: UnifiedNum = UnifiedNum::from_u64(100_000_000);

pub const MIN_DESCRIPTION_LENGTH: usize = 10;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
pub const MAX_REQUIREMENTS_LENGTH: usize = 1000;
pub const MAX_REASON_LENGTH: usize = 500;

/// Validates the user-supplied input before it reaches the order workflow.
pub trait Validator {
    fn validate(&self, now: DateTime<Utc>) -> Result<(), Validation>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Validation {
    #[error("Price must be at least {}", MIN_PRICE)]
    PriceTooLow,
    #[error("Price must not exceed {}", MAX_PRICE)]
    PriceTooHigh,
    #[error("Deadline must not be in the past")]
    DeadlineInThePast,
    #[error(
        "Description must be between {} and {} characters",
        MIN_DESCRIPTION_LENGTH,
        MAX_DESCRIPTION_LENGTH
    )]
    DescriptionLength,
    #[error("Requirements must not exceed {} characters", MAX_REQUIREMENTS_LENGTH)]
    RequirementsTooLong,
    #[error("At least one content URL must be provided")]
    NoContentUrls,
    #[error("Reason must not exceed {} characters", MAX_REASON_LENGTH)]
    ReasonTooLong,
}

impl Validator for CreateOrder {
    fn validate(&self, now: DateTime<Utc>) -> Result<(), Validation> {
        if self.price < MIN_PRICE {
            return Err(Validation::PriceTooLow);
        }
        if self.price > MAX_PRICE {
            return Err(Validation::PriceTooHigh);
        }
        if self.deadline < now {
            return Err(Validation::DeadlineInThePast);
        }
        if let Some(description) = &self.description {
            let length = description.trim().chars().count();
            if !(MIN_DESCRIPTION_LENGTH..=MAX_DESCRIPTION_LENGTH).contains(&length) {
                return Err(Validation::DescriptionLength);
            }
        }
        if let Some(requirements) = &self.requirements {
            if requirements.trim().chars().count() > MAX_REQUIREMENTS_LENGTH {
                return Err(Validation::RequirementsTooLong);
            }
        }

        Ok(())
    }
}

impl Validator for SubmitOrder {
    fn validate(&self, _now: DateTime<Utc>) -> Result<(), Validation> {
        if self.content_urls.is_empty() {
            return Err(Validation::NoContentUrls);
        }

        Ok(())
    }
}

impl Validator for RejectOrder {
    fn validate(&self, _now: DateTime<Utc>) -> Result<(), Validation> {
        match &self.reason {
            Some(reason) if reason.trim().chars().count() > MAX_REASON_LENGTH => {
                Err(Validation::ReasonTooLong)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{CampaignId, ContentType, UserId};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn create_order(price: UnifiedNum) -> CreateOrder {
        CreateOrder {
            campaign_id: CampaignId::new(),
            blogger_id: UserId::new(),
            content_type: ContentType::Video,
            description: None,
            requirements: None,
            deadline: Utc::now() + Duration::days(7),
            price,
        }
    }

    #[test]
    fn price_boundaries_are_inclusive() {
        let now = Utc::now();

        assert_eq!(Ok(()), create_order(MIN_PRICE).validate(now));
        assert_eq!(Ok(()), create_order(MAX_PRICE).validate(now));

        let below = MIN_PRICE.checked_sub(&UnifiedNum::from_u64(1)).unwrap();
        assert_eq!(
            Err(Validation::PriceTooLow),
            create_order(below).validate(now)
        );

        let above = MAX_PRICE.checked_add(&UnifiedNum::from_u64(1)).unwrap();
        assert_eq!(
            Err(Validation::PriceTooHigh),
            create_order(above).validate(now)
        );
    }

    #[test]
    fn the_deadline_must_not_be_in_the_past() {
        let now = Utc::now();
        let mut create = create_order(MIN_PRICE);
        create.deadline = now - Duration::minutes(1);

        assert_eq!(Err(Validation::DeadlineInThePast), create.validate(now));
    }

    #[test]
    fn description_and_requirements_lengths() {
        let now = Utc::now();

        let mut create = create_order(MIN_PRICE);
        create.description = Some("too short".to_string());
        assert_eq!(Err(Validation::DescriptionLength), create.validate(now));

        create.description = Some("long enough for sure".to_string());
        assert_eq!(Ok(()), create.validate(now));

        create.description = Some("x".repeat(MAX_DESCRIPTION_LENGTH + 1));
        assert_eq!(Err(Validation::DescriptionLength), create.validate(now));

        create.description = None;
        create.requirements = Some("y".repeat(MAX_REQUIREMENTS_LENGTH + 1));
        assert_eq!(Err(Validation::RequirementsTooLong), create.validate(now));
    }

    #[test]
    fn submissions_need_a_content_url_and_reject_reasons_are_bounded() {
        let now = Utc::now();

        let submit = SubmitOrder {
            content_urls: vec![],
            platform_urls: vec!["https://instagram.com/p/1".parse().unwrap()],
        };
        assert_eq!(Err(Validation::NoContentUrls), submit.validate(now));

        let reject = RejectOrder {
            reason: Some("z".repeat(MAX_REASON_LENGTH + 1)),
        };
        assert_eq!(Err(Validation::ReasonTooLong), reject.validate(now));
        assert_eq!(Ok(()), RejectOrder::default().validate(now));
    }
}

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Monetary amount with a fixed precision of 2.
///
/// The amount is stored as the raw number of minor units (cents),
/// e.g. `UnifiedNum::from_whole(150)` and `"150.00".parse()` are both
/// `15_000` minor units. All arithmetic used by the budget bookkeeping is
/// checked - an overflowing operation returns `None` instead of wrapping.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnifiedNum(u64);

impl UnifiedNum {
    pub const PRECISION: u32 = 2;
    /// The whole unit in minor units, i.e. `1.00`
    pub const ONE: UnifiedNum = UnifiedNum(100);

    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }

    /// Creates an amount from whole currency units, `None` on overflow.
    pub fn from_whole(whole: u64) -> Option<Self> {
        whole.checked_mul(10u64.pow(Self::PRECISION)).map(Self)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn checked_mul(&self, rhs: u64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }
}

impl From<u64> for UnifiedNum {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for UnifiedNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let divisor = 10u64.pow(Self::PRECISION);
        write!(
            f,
            "{}.{:0>width$}",
            self.0 / divisor,
            self.0 % divisor,
            width = Self::PRECISION as usize
        )
    }
}

impl fmt::Debug for UnifiedNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnifiedNum({})", self)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Amount has more than {} fractional digits", UnifiedNum::PRECISION)]
    TooPrecise,
    #[error("Invalid amount: {0}")]
    Invalid(String),
}

impl FromStr for UnifiedNum {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };

        if fraction.len() > Self::PRECISION as usize {
            return Err(ParseError::TooPrecise);
        }

        let whole = whole
            .parse::<u64>()
            .map_err(|_| ParseError::Invalid(s.to_string()))?;

        let fraction = if fraction.is_empty() {
            0
        } else {
            // right-pad to the full precision, e.g. "5" of "100.5" is 50 cents
            let padded = format!("{:0<width$}", fraction, width = Self::PRECISION as usize);
            padded
                .parse::<u64>()
                .map_err(|_| ParseError::Invalid(s.to_string()))?
        };

        whole
            .checked_mul(10u64.pow(Self::PRECISION))
            .and_then(|minor| minor.checked_add(fraction))
            .map(Self)
            .ok_or_else(|| ParseError::Invalid(s.to_string()))
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    use super::UnifiedNum;
    use bytes::BytesMut;
    use std::error::Error;
    use tokio_postgres::types::{accepts, to_sql_checked, FromSql, IsNull, ToSql, Type};

    impl<'a> FromSql<'a> for UnifiedNum {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            let value = <i64 as FromSql>::from_sql(ty, raw)?;

            Ok(Self(u64::try_from(value)?))
        }

        accepts!(INT8);
    }

    impl ToSql for UnifiedNum {
        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
            i64::try_from(self.0)?.to_sql(ty, w)
        }

        accepts!(INT8);
        to_sql_checked!();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unified_num_displays_minor_units_with_precision_2() {
        let cases = [
            (UnifiedNum::from_u64(0), "0.00"),
            (UnifiedNum::from_u64(1), "0.01"),
            (UnifiedNum::from_u64(100), "1.00"),
            (UnifiedNum::from_u64(15_050), "150.50"),
            (UnifiedNum::from_whole(1_000_000).expect("no overflow"), "1000000.00"),
        ];

        for (number, expected) in cases {
            assert_eq!(expected, &number.to_string());
        }
    }

    #[test]
    fn unified_num_parses_whole_and_fractional_amounts() {
        assert_eq!(Ok(UnifiedNum::from_u64(10_000)), "100".parse());
        assert_eq!(Ok(UnifiedNum::from_u64(10_050)), "100.5".parse());
        assert_eq!(Ok(UnifiedNum::from_u64(10_055)), "100.55".parse());
        assert_eq!(
            Err(ParseError::TooPrecise),
            "100.555".parse::<UnifiedNum>()
        );
        assert!("abc".parse::<UnifiedNum>().is_err());
        assert!("-100".parse::<UnifiedNum>().is_err());
    }

    #[test]
    fn unified_num_checked_arithmetic() {
        let one = UnifiedNum::ONE;
        let max = UnifiedNum::from_u64(u64::MAX);

        assert_eq!(Some(UnifiedNum::from_u64(200)), one.checked_add(&one));
        assert_eq!(Some(UnifiedNum::from_u64(0)), one.checked_sub(&one));
        assert_eq!(None, one.checked_sub(&UnifiedNum::from_u64(101)));
        assert_eq!(None, max.checked_add(&one));
        assert_eq!(None, UnifiedNum::from_whole(u64::MAX));
    }

    #[test]
    fn unified_num_serializes_as_a_number_of_minor_units() {
        let number = UnifiedNum::from_u64(15_050);

        assert_eq!(
            serde_json::Value::from(15_050_u64),
            serde_json::to_value(number).expect("Should serialize")
        );
        assert_eq!(
            number,
            serde_json::from_value(serde_json::Value::from(15_050_u64)).expect("Should deserialize")
        );
    }
}

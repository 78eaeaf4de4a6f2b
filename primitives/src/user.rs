use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

pub use user_id::UserId;

mod user_id {
    use hex::{FromHex, FromHexError};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::{fmt, str::FromStr};
    use thiserror::Error;
    use uuid::Uuid;

    /// An Id of 16 bytes, (de)serialized as a `0x` prefixed hex string.
    ///
    /// Identity issuance lives outside of this application - the value is
    /// whatever the authentication collaborator minted, we only parse and
    /// compare it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UserId([u8; 16]);

    impl UserId {
        /// Generates a random `UserId` from a `Uuid::new_v4()`.
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

    impl Default for UserId {
        fn default() -> Self {
            Self(*Uuid::new_v4().as_bytes())
        }
    }

    impl AsRef<[u8]> for UserId {
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

    impl FromStr for UserId {
        type Err = Error;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.strip_prefix("0x") {
                Some(hex) => Ok(Self(<[u8; 16]>::from_hex(hex)?)),
                None => Err(Error::ExpectedPrefix),
            }
        }
    }

    impl fmt::Display for UserId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }

    impl Serialize for UserId {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&self.to_string())
        }
    }

    impl<'de> Deserialize<'de> for UserId {
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
        use super::UserId;
        use bytes::BytesMut;
        use std::error::Error;
        use tokio_postgres::types::{accepts, to_sql_checked, FromSql, IsNull, ToSql, Type};

        impl<'a> FromSql<'a> for UserId {
            fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
                let str_slice = <&str as FromSql>::from_sql(ty, raw)?;

                Ok(str_slice.parse()?)
            }

            accepts!(TEXT, VARCHAR);
        }

        impl ToSql for UserId {
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
        fn de_serializes_user_id() {
            let id = UserId::new();

            let serialized = to_value(id).expect("Should serialize");
            assert_eq!(Value::String(id.to_string()), serialized);
            assert_eq!(
                id,
                serde_json::from_value(serialized).expect("Should deserialize")
            );
        }

        #[test]
        fn user_id_requires_the_hex_prefix() {
            assert!("0f9b5c76bef9f9645c16eb79243bdca5".parse::<UserId>().is_err());
            assert!("0x0f9b5c76bef9f9645c16eb79243bdca5".parse::<UserId>().is_ok());
        }
    }
}

/// The role a user acts under for a given request.
///
/// Roles are mutually exclusive: an advertiser account cannot perform
/// blogger operations and vice versa.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr,
)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Advertiser,
    Blogger,
    Admin,
}

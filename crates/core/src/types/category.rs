//! Product category codes.
//!
//! Categories are a closed set of two-letter codes. Product rows store the
//! code; URLs and search use either the code or its label.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned for an unknown category code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category code: {0:?}")]
pub struct CategoryError(pub String);

/// A product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CategoryCode {
    #[serde(rename = "ML")]
    Milk,
    #[serde(rename = "CZ")]
    Cheese,
    #[serde(rename = "CR")]
    Curd,
    #[serde(rename = "IC")]
    IceCream,
    #[serde(rename = "MS")]
    MilkShake,
    #[serde(rename = "PN")]
    Paneer,
    #[serde(rename = "GH")]
    Ghee,
    #[serde(rename = "LS")]
    Lassi,
    #[serde(rename = "OT")]
    Others,
}

impl CategoryCode {
    /// All categories in menu order.
    pub const ALL: [Self; 9] = [
        Self::Milk,
        Self::Cheese,
        Self::Curd,
        Self::IceCream,
        Self::MilkShake,
        Self::Paneer,
        Self::Ghee,
        Self::Lassi,
        Self::Others,
    ];

    /// The two-letter code stored in the database and used in URLs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Milk => "ML",
            Self::Cheese => "CZ",
            Self::Curd => "CR",
            Self::IceCream => "IC",
            Self::MilkShake => "MS",
            Self::Paneer => "PN",
            Self::Ghee => "GH",
            Self::Lassi => "LS",
            Self::Others => "OT",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Milk => "Milk",
            Self::Cheese => "Cheese",
            Self::Curd => "Curd",
            Self::IceCream => "Ice Cream",
            Self::MilkShake => "Milk Shake",
            Self::Paneer => "Paneer",
            Self::Ghee => "Ghee",
            Self::Lassi => "Lassi",
            Self::Others => "Others",
        }
    }

    /// Codes whose code or label contains `needle`, case-insensitively.
    ///
    /// Search matches on category as well as title; this resolves the text
    /// part of that match so the database only compares codes.
    #[must_use]
    pub fn matching(needle: &str) -> Vec<Self> {
        let needle = needle.to_lowercase();
        Self::ALL
            .into_iter()
            .filter(|c| {
                c.code().to_lowercase().contains(&needle) || c.label().to_lowercase().contains(&needle)
            })
            .collect()
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CategoryCode {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.code() == upper)
            .ok_or_else(|| CategoryError(s.to_owned()))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for CategoryCode {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CategoryCode {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for CategoryCode {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.code(), buf)
    }
}

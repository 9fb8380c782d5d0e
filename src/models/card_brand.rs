use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter, IntoStaticStr};

/// Card networks accepted at checkout, named the way payment sources store them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CardBrand {
    Visa,
    Master,
    AmericanExpress,
    Discover,
    DinersClub,
    Jcb,
    #[serde(rename = "unionpay")]
    #[strum(serialize = "unionpay")]
    UnionPay,
    Maestro,
}

/// `ccType` strings produced by Stripe.js and by stored payment sources.
const CC_TYPE_TABLE: &[(&str, CardBrand)] = &[
    ("visa", CardBrand::Visa),
    ("master", CardBrand::Master),
    ("mastercard", CardBrand::Master),
    ("american_express", CardBrand::AmericanExpress),
    ("amex", CardBrand::AmericanExpress),
    ("discover", CardBrand::Discover),
    ("diners_club", CardBrand::DinersClub),
    ("diners", CardBrand::DinersClub),
    ("jcb", CardBrand::Jcb),
    ("unionpay", CardBrand::UnionPay),
    ("maestro", CardBrand::Maestro),
];

impl CardBrand {
    /// Maps a front-end or gateway brand string onto a brand.
    pub fn from_cc_type(cc_type: &str) -> Result<Self, ServiceError> {
        let normalized = cc_type.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        CC_TYPE_TABLE
            .iter()
            .find(|(name, _)| *name == normalized)
            .map(|(_, brand)| *brand)
            .ok_or_else(|| ServiceError::UnknownCardBrand(cc_type.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl FromStr for CardBrand {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cc_type(s)
    }
}

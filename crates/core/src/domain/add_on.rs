use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddOnId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOnCategory {
    Traveler,
    Travel,
    Accommodation,
    Visa,
    Insurance,
    Service,
}

impl AddOnCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Traveler => "traveler",
            Self::Travel => "travel",
            Self::Accommodation => "accommodation",
            Self::Visa => "visa",
            Self::Insurance => "insurance",
            Self::Service => "service",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "traveler" => Ok(Self::Traveler),
            "travel" => Ok(Self::Travel),
            "accommodation" => Ok(Self::Accommodation),
            "visa" => Ok(Self::Visa),
            "insurance" => Ok(Self::Insurance),
            "service" => Ok(Self::Service),
            other => Err(DomainError::InvalidEstimateInput(format!(
                "unknown add-on category `{other}`"
            ))),
        }
    }
}

impl fmt::Display for AddOnCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOn {
    pub id: AddOnId,
    pub category: AddOnCategory,
    pub name: String,
    pub price: Decimal,
}

impl AddOn {
    pub fn new(
        id: impl Into<String>,
        category: AddOnCategory,
        name: impl Into<String>,
        price: Decimal,
    ) -> Self {
        Self { id: AddOnId(id.into()), category, name: name.into(), price }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub base_price: Decimal,
    pub active: bool,
}

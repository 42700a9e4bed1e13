//! Currency codes handled by the ledger.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are always `rust_decimal::Decimal`; this enum only names the unit.

use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes supported by the system.
///
/// The rate store keeps only foreign→base quotes; every other pair is
/// derived at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Russian Ruble (the reporting/base currency by default).
    Rub,
    /// US Dollar.
    Usd,
    /// Euro.
    Eur,
    /// Chinese Yuan.
    Cny,
}

impl Currency {
    /// All supported currencies, in a stable order.
    pub const ALL: [Self; 4] = [Self::Rub, Self::Usd, Self::Eur, Self::Cny];
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rub => write!(f, "RUB"),
            Self::Usd => write!(f, "USD"),
            Self::Eur => write!(f, "EUR"),
            Self::Cny => write!(f, "CNY"),
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RUB" => Ok(Self::Rub),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "CNY" => Ok(Self::Cny),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}

use std::fmt;
use std::ops::Mul;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::PacingError;

/// Transfer rate in bytes per second
///
/// Two unit families are provided in [`units`]. Units with a capital `B` count bytes with
/// power-of-two multipliers, units with a lowercase `b` count bits with decimal SI multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RateRepr", into = "u64")]
pub struct Rate(u64);

/// Named rate units, usable as `10 * Mbps`
#[allow(non_upper_case_globals)]
pub mod units {
    use super::Rate;

    // bytes, power-of-two multipliers
    pub const Bps: Rate = Rate(1);
    pub const KBps: Rate = Rate(1024 * Bps.0);
    pub const MBps: Rate = Rate(1024 * KBps.0);
    pub const GBps: Rate = Rate(1024 * MBps.0);

    // bits, SI multipliers
    pub const Kbps: Rate = Rate(1000 / 8 * Bps.0);
    pub const Mbps: Rate = Rate(1000 * Kbps.0);
    pub const Gbps: Rate = Rate(1000 * Mbps.0);
}

impl Rate {
    pub const fn new(bytes_per_second: u64) -> Self {
        Self(bytes_per_second)
    }

    pub const fn bytes_per_second(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_mul(self, factor: u64) -> Option<Self> {
        self.0.checked_mul(factor).map(Self)
    }

    /// Bytes allowed to cross within one `interval` at this rate, rounded down
    pub fn slice_budget(self, interval: Duration) -> u64 {
        let budget = u128::from(self.0) * interval.as_nanos() / 1_000_000_000;
        u64::try_from(budget).unwrap_or(u64::MAX)
    }

    fn unit_factor(unit: &str) -> Option<Rate> {
        use crate::rate::units::*;

        match unit {
            "" | "Bps" | "B/s" => Some(Bps),
            "KBps" => Some(KBps),
            "MBps" => Some(MBps),
            "GBps" => Some(GBps),
            "Kbps" => Some(Kbps),
            "Mbps" => Some(Mbps),
            "Gbps" => Some(Gbps),
            _ => None,
        }
    }
}

/// Saturates at `u64::MAX` bytes per second
impl Mul<u64> for Rate {
    type Output = Rate;

    fn mul(self, rhs: u64) -> Rate {
        Rate(self.0.saturating_mul(rhs))
    }
}

impl Mul<Rate> for u64 {
    type Output = Rate;

    fn mul(self, rhs: Rate) -> Rate {
        rhs * self
    }
}

impl From<u64> for Rate {
    fn from(bytes_per_second: u64) -> Self {
        Self(bytes_per_second)
    }
}

impl From<Rate> for u64 {
    fn from(rate: Rate) -> Self {
        rate.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} B/s", self.0)
    }
}

/// Parses `"1200"`, `"64KBps"` or `"10 Mbps"`
impl FromStr for Rate {
    type Err = PacingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);

        if digits.is_empty() {
            return Err(PacingError::InvalidRate(format!("missing quantity in {s:?}")));
        }

        let quantity: u64 = digits.parse().map_err(|_| PacingError::InvalidRate(format!("quantity out of range in {s:?}")))?;
        let factor = Rate::unit_factor(unit.trim()).ok_or_else(|| PacingError::InvalidRate(format!("unknown unit in {s:?}")))?;

        factor.checked_mul(quantity).ok_or_else(|| PacingError::InvalidRate(format!("{s:?} overflows bytes per second")))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RateRepr {
    Bytes(u64),
    Text(String),
}

impl TryFrom<RateRepr> for Rate {
    type Error = PacingError;

    fn try_from(repr: RateRepr) -> Result<Self, Self::Error> {
        match repr {
            RateRepr::Bytes(bytes) => Ok(Rate(bytes)),
            RateRepr::Text(text) => text.parse(),
        }
    }
}

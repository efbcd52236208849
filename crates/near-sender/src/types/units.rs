//! Token amount and gas units.
//!
//! Both types refuse bare numbers when parsed from text: a unit suffix is
//! required so that `"1"` can never silently mean one yoctoNEAR.

use std::fmt::{self, Display};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ParseAmountError, ParseGasError};

const YOCTO_PER_NEAR: u128 = 10u128.pow(24);
const YOCTO_PER_MILLINEAR: u128 = 10u128.pow(21);
const NEAR_DECIMALS: usize = 24;

/// An amount of NEAR, stored as yoctoNEAR (10^-24 NEAR).
///
/// Serialized as a decimal string in JSON and as a little-endian u128 on the wire.
///
/// ```
/// use near_sender::NearToken;
///
/// let amount: NearToken = "1.5 NEAR".parse().unwrap();
/// assert_eq!(amount, NearToken::millinear(1_500));
/// assert!("1".parse::<NearToken>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, BorshSerialize,
    BorshDeserialize,
)]
pub struct NearToken(u128);

impl NearToken {
    pub const ZERO: Self = Self(0);
    pub const ONE_YOCTO: Self = Self(1);
    pub const ONE_NEAR: Self = Self(YOCTO_PER_NEAR);

    pub const fn near(near: u128) -> Self {
        Self(near * YOCTO_PER_NEAR)
    }

    pub const fn millinear(millinear: u128) -> Self {
        Self(millinear * YOCTO_PER_MILLINEAR)
    }

    pub const fn yocto(yocto: u128) -> Self {
        Self(yocto)
    }

    /// Parse a decimal NEAR value such as `"2.25"`. Digits past the 24th decimal are dropped.
    pub fn from_near_decimal(s: &str) -> Result<Self, ParseAmountError> {
        let s = s.trim();
        let invalid = || ParseAmountError::InvalidNumber(s.to_string());

        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };

        let fraction = &fraction[..fraction.len().min(NEAR_DECIMALS)];
        let fraction_yocto = if fraction.is_empty() {
            0
        } else {
            let digits: u128 = fraction.parse().map_err(|_| invalid())?;
            digits * 10u128.pow((NEAR_DECIMALS - fraction.len()) as u32)
        };

        whole
            .checked_mul(YOCTO_PER_NEAR)
            .and_then(|v| v.checked_add(fraction_yocto))
            .map(Self)
            .ok_or(ParseAmountError::Overflow)
    }

    pub const fn as_yoctonear(&self) -> u128 {
        self.0
    }

    /// Whole NEAR, rounded down.
    pub const fn as_near(&self) -> u128 {
        self.0 / YOCTO_PER_NEAR
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

fn parse_integer_with_unit<T, E>(
    value: &str,
    scale: T,
    on_invalid: impl FnOnce() -> E,
    overflow: E,
) -> Result<T, E>
where
    T: FromStr + CheckedMul,
{
    let v: T = value.trim().parse().map_err(|_| on_invalid())?;
    v.checked_mul_by(scale).ok_or(overflow)
}

/// Minimal checked-multiply shared by the unit parsers.
trait CheckedMul: Sized {
    fn checked_mul_by(self, other: Self) -> Option<Self>;
}

impl CheckedMul for u128 {
    fn checked_mul_by(self, other: Self) -> Option<Self> {
        self.checked_mul(other)
    }
}

impl CheckedMul for u64 {
    fn checked_mul_by(self, other: Self) -> Option<Self> {
        self.checked_mul(other)
    }
}

impl FromStr for NearToken {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ParseAmountError::InvalidNumber(s.to_string());

        if let Some(value) = s.strip_suffix(" NEAR").or_else(|| s.strip_suffix(" near")) {
            return Self::from_near_decimal(value);
        }
        if let Some(value) = s
            .strip_suffix(" milliNEAR")
            .or_else(|| s.strip_suffix(" mNEAR"))
        {
            return parse_integer_with_unit(
                value,
                YOCTO_PER_MILLINEAR,
                invalid,
                ParseAmountError::Overflow,
            )
            .map(Self);
        }
        if let Some(value) = s
            .strip_suffix(" yoctoNEAR")
            .or_else(|| s.strip_suffix(" yocto"))
        {
            return parse_integer_with_unit(value, 1, invalid, ParseAmountError::Overflow)
                .map(Self);
        }

        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return Err(ParseAmountError::AmbiguousAmount(s.to_string()));
        }
        Err(ParseAmountError::InvalidFormat(s.to_string()))
    }
}

impl Display for NearToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / YOCTO_PER_NEAR;
        let remainder = self.0 % YOCTO_PER_NEAR;
        if remainder == 0 {
            return write!(f, "{} NEAR", whole);
        }
        // Up to 5 decimals, trailing zeros trimmed
        let digits = format!("{:024}", remainder);
        let digits = digits.trim_end_matches('0');
        let shown = &digits[..digits.len().min(5)];
        if shown.trim_end_matches('0').is_empty() {
            write!(f, "{} yoctoNEAR", self.0)
        } else {
            write!(f, "{}.{} NEAR", whole, shown.trim_end_matches('0'))
        }
    }
}

impl Serialize for NearToken {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for NearToken {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(d)?;
        s.parse().map(Self).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Gas
// ============================================================================

const GAS_PER_TGAS: u64 = 10u64.pow(12);
const GAS_PER_GGAS: u64 = 10u64.pow(9);

/// Gas units attached to a function call.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, BorshSerialize,
    BorshDeserialize,
)]
pub struct Gas(u64);

impl Gas {
    pub const ZERO: Self = Self(0);

    /// 30 Tgas, enough for most simple contract calls.
    pub const DEFAULT: Self = Self::tgas(30);

    /// Per-transaction gas ceiling.
    pub const MAX: Self = Self::tgas(300);

    pub const fn tgas(tgas: u64) -> Self {
        Self(tgas * GAS_PER_TGAS)
    }

    pub const fn ggas(ggas: u64) -> Self {
        Self(ggas * GAS_PER_GGAS)
    }

    pub const fn from_gas(gas: u64) -> Self {
        Self(gas)
    }

    pub const fn as_gas(&self) -> u64 {
        self.0
    }

    pub const fn as_tgas(&self) -> u64 {
        self.0 / GAS_PER_TGAS
    }
}

impl FromStr for Gas {
    type Err = ParseGasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ParseGasError::InvalidNumber(s.to_string());

        let (value, scale) = if let Some(v) = s
            .strip_suffix(" Tgas")
            .or_else(|| s.strip_suffix(" TGas"))
            .or_else(|| s.strip_suffix(" tgas"))
        {
            (v, GAS_PER_TGAS)
        } else if let Some(v) = s
            .strip_suffix(" Ggas")
            .or_else(|| s.strip_suffix(" GGas"))
            .or_else(|| s.strip_suffix(" ggas"))
        {
            (v, GAS_PER_GGAS)
        } else if let Some(v) = s.strip_suffix(" gas") {
            (v, 1)
        } else {
            return Err(ParseGasError::InvalidFormat(s.to_string()));
        };

        parse_integer_with_unit(value, scale, invalid, ParseGasError::Overflow).map(Self)
    }
}

impl Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0 && self.0 % GAS_PER_TGAS == 0 {
            write!(f, "{} Tgas", self.0 / GAS_PER_TGAS)
        } else {
            write!(f, "{} gas", self.0)
        }
    }
}

impl Serialize for Gas {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for Gas {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        <u64 as serde::Deserialize>::deserialize(d).map(Self)
    }
}

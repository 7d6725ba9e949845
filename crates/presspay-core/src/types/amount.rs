use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A payment amount in the asset's smallest unit (fixed decimal precision
/// agreed out-of-band, e.g. 6 decimals). Serialized as a decimal string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(pub u128);

impl From<u8> for Amount {
    fn from(value: u8) -> Self {
        Amount(value as u128)
    }
}

impl From<u16> for Amount {
    fn from(value: u16) -> Self {
        Amount(value as u128)
    }
}

impl From<u32> for Amount {
    fn from(value: u32) -> Self {
        Amount(value as u128)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount(value as u128)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Amount(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let value = s.parse::<u128>().map_err(serde::de::Error::custom)?;
        Ok(Amount(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_decimal_string() {
        let json = serde_json::to_string(&Amount::from(10_000u64)).unwrap();
        assert_eq!(json, "\"10000\"");
    }

    #[test]
    fn deserializes_from_decimal_string() {
        let amount: Amount = serde_json::from_str("\"10000\"").unwrap();
        assert_eq!(amount, Amount(10_000));
    }

    #[test]
    fn rejects_non_decimal_input() {
        assert!(serde_json::from_str::<Amount>("\"0x2710\"").is_err());
        assert!(serde_json::from_str::<Amount>("10000").is_err());
    }
}

//! Domain models for TicketVault
//!
//! Core ticket types plus the serde helpers that pin the wire encoding:
//! 256-bit integers travel as base-10 decimal strings because JSON numbers
//! cannot carry them losslessly.

mod ticket;

pub use ticket::*;

/// Serde module for `U256` as a base-10 decimal string
pub mod u256_decimal {
    use alloy_primitives::U256;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super::u256_decimal")]
        value: U256,
    }

    #[test]
    fn test_u256_decimal_roundtrip() {
        let wrapper = Wrapper {
            value: U256::from(900u64),
        };
        let json = serde_json::to_string(&wrapper).unwrap();
        assert_eq!(json, r#"{"value":"900"}"#);

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value, U256::from(900u64));
    }

    #[test]
    fn test_u256_decimal_max_value() {
        let wrapper = Wrapper { value: U256::MAX };
        let json = serde_json::to_string(&wrapper).unwrap();
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value, U256::MAX);
    }

    #[test]
    fn test_u256_decimal_rejects_hex() {
        let result: Result<Wrapper, _> = serde_json::from_str(r#"{"value":"0x10"}"#);
        assert!(result.is_err());
    }
}

//! 256-bit unsigned integer arithmetic for pool balances and scaling factors.
//!
//! Asset and share amounts are held as `U256` so that share/asset conversions
//! can form the full product `amount * supply` before dividing. Loss-scaling
//! factors use WAD (1e18) fixed point on the same type; see [`fixed_point`].
//!
//! Human-readable formats (JSON configuration) carry amounts as decimal
//! strings; binary formats carry 32 little-endian bytes.

// Allow clippy warnings from the uint crate's construct_uint macro
#![allow(clippy::manual_div_ceil)]
#![allow(clippy::assign_op_pattern)]

pub mod fixed_point;

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uint::construct_uint;

construct_uint! {
    /// 256-bit unsigned integer.
    ///
    /// Used for:
    /// - Pool, pending and per-asset balances
    /// - Share supplies and share amounts
    /// - WAD fixed-point scaling factors
    pub struct U256(4);
}

impl Serialize for U256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            let mut bytes = [0u8; 32];
            self.to_little_endian(&mut bytes);
            serializer.serialize_bytes(&bytes)
        }
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = U256;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a decimal amount or 32 little-endian bytes")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
        U256::from_dec_str(v).map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
        Ok(U256::from(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<U256, E> {
        if v.len() != 32 {
            return Err(E::invalid_length(v.len(), &self));
        }
        Ok(U256::from_little_endian(v))
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<U256, A::Error> {
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        Ok(U256::from_little_endian(&bytes))
    }
}

impl<'de> Deserialize<'de> for U256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(AmountVisitor)
        } else {
            deserializer.deserialize_bytes(AmountVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_arithmetic() {
        let a = U256::from(100u64);
        let b = U256::from(50u64);
        assert_eq!(a + b, U256::from(150u64));
        assert_eq!(a - b, U256::from(50u64));
        assert_eq!(a * b, U256::from(5000u64));
        assert_eq!(a / b, U256::from(2u64));
    }

    #[test]
    fn test_wad_scale_products_fit() {
        // Largest accumulator product: threshold (1e38) times INF (1e36).
        let product = U256::exp10(38).checked_mul(U256::exp10(36));
        assert_eq!(product, Some(U256::exp10(74)));
        assert!(U256::MAX.checked_mul(U256::from(2u64)).is_none());
    }

    #[test]
    fn test_json_uses_decimal_strings() {
        let wad = U256::exp10(18);
        let json = serde_json::to_string(&wad).unwrap();
        assert_eq!(json, "\"1000000000000000000\"");
        assert_eq!(serde_json::from_str::<U256>(&json).unwrap(), wad);
        assert_eq!(serde_json::from_str::<U256>("42").unwrap(), U256::from(42u64));
        assert!(serde_json::from_str::<U256>("\"0x10\"").is_err());
    }

    #[test]
    fn test_little_endian_layout() {
        let value = U256::from(0x0102u64);
        let mut bytes = [0u8; 32];
        value.to_little_endian(&mut bytes);
        assert_eq!(&bytes[..2], &[0x02, 0x01]);
        assert_eq!(U256::from_little_endian(&bytes), value);
    }
}

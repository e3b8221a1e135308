#![forbid(unsafe_code)]
#![warn(clippy::all)]

//! Value types shared by the anonclaim crates: addresses, keys, claim
//! signatures, field encodings, utility ids, phases, public signals and the
//! `ClaimError` taxonomy.

/// Implements `Serialize`/`Deserialize` through a string form using the
/// type's own formatting and parsing methods.
macro_rules! impl_string_serde {
    ($ty:ty, $to:ident, $from:ident) => {
        impl ::serde::Serialize for $ty {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.$to())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $ty {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                <$ty>::$from(&s).map_err(::serde::de::Error::custom)
            }
        }
    };
}

pub mod address;
pub mod claim;
pub mod constants;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod field;

pub use address::EthAddress;
pub use claim::{ClaimProof, ClaimPublicSignals, Phase, ProofPoints, Token, TokenId, UtilityId};
pub use constants::*;
pub use crypto::{ClaimSignature, Secp256k1PrivateKey, UncompressedPublicKey};
pub use error::{ClaimError, ClaimResult};
pub use field::FieldBytes;

use anonclaim_types::{
    ClaimError, ClaimResult, ClaimSignature, EthAddress, Secp256k1PrivateKey,
    UncompressedPublicKey, SECP256K1_PRIVATE_KEY_SIZE,
};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};

thread_local! {
    static SECP256K1_CTX: Secp256k1<secp256k1::All> = Secp256k1::new();
}

pub fn generate_private_key() -> Secp256k1PrivateKey {
    loop {
        let bytes = crate::random_bytes::<SECP256K1_PRIVATE_KEY_SIZE>();
        if validate_private_key(&bytes) {
            return Secp256k1PrivateKey::from_bytes(bytes);
        }
    }
}

pub fn validate_private_key(key: &[u8; 32]) -> bool {
    SecretKey::from_slice(key).is_ok()
}

pub fn derive_public_key(private_key: &Secp256k1PrivateKey) -> ClaimResult<UncompressedPublicKey> {
    SECP256K1_CTX.with(|ctx| {
        let secret = SecretKey::from_slice(&private_key.0)
            .map_err(|e| ClaimError::InvalidKey(e.to_string()))?;
        let public = PublicKey::from_secret_key(ctx, &secret);
        UncompressedPublicKey::from_sec1(&public.serialize_uncompressed())
    })
}

/// keccak256(x ‖ y)[12..]
pub fn derive_eth_address(public_key: &UncompressedPublicKey) -> EthAddress {
    let hash = keccak256(public_key.as_bytes());
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    EthAddress::from_bytes(address)
}

pub fn derive_eth_address_from_private(
    private_key: &Secp256k1PrivateKey,
) -> ClaimResult<EthAddress> {
    Ok(derive_eth_address(&derive_public_key(private_key)?))
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// `"\x19Ethereum Signed Message:\n" ‖ decimal length`
pub fn personal_message_prefix(len: usize) -> Vec<u8> {
    format!("\x19Ethereum Signed Message:\n{}", len).into_bytes()
}

/// keccak256("\x19Ethereum Signed Message:\n" ‖ len ‖ message)
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(personal_message_prefix(message.len()));
    hasher.update(message);
    hasher.finalize().into()
}

/// Signs a digest and returns `(r, s, v)` with `v = recid + 27`.
pub fn sign_recoverable(
    private_key: &Secp256k1PrivateKey,
    message_hash: &[u8; 32],
) -> ClaimResult<([u8; 32], [u8; 32], u8)> {
    SECP256K1_CTX.with(|ctx| {
        let secret = SecretKey::from_slice(&private_key.0)
            .map_err(|e| ClaimError::InvalidKey(e.to_string()))?;
        let message = Message::from_digest_slice(message_hash)
            .map_err(|e| ClaimError::Crypto(e.to_string()))?;

        let (recovery_id, signature) = ctx
            .sign_ecdsa_recoverable(&message, &secret)
            .serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&signature[..32]);
        s.copy_from_slice(&signature[32..]);

        Ok((r, s, recovery_id.to_i32() as u8 + 27))
    })
}

pub fn recover_public_key(
    r: &[u8; 32],
    s: &[u8; 32],
    v: u8,
    message_hash: &[u8; 32],
) -> ClaimResult<UncompressedPublicKey> {
    SECP256K1_CTX.with(|ctx| {
        let v = if v >= 27 { v - 27 } else { v };

        let recovery_id = RecoveryId::from_i32(i32::from(v))
            .map_err(|e| ClaimError::InvalidSignature(e.to_string()))?;

        let mut sig_bytes = [0u8; 64];
        sig_bytes[..32].copy_from_slice(r);
        sig_bytes[32..].copy_from_slice(s);

        let recoverable_sig = RecoverableSignature::from_compact(&sig_bytes, recovery_id)
            .map_err(|e| ClaimError::InvalidSignature(e.to_string()))?;

        let message = Message::from_digest_slice(message_hash)
            .map_err(|e| ClaimError::Crypto(e.to_string()))?;

        let public_key = ctx
            .recover_ecdsa(&message, &recoverable_sig)
            .map_err(|e| ClaimError::InvalidSignature(e.to_string()))?;

        UncompressedPublicKey::from_sec1(&public_key.serialize_uncompressed())
    })
}

/// Plain ECDSA verification against a known key. High-s signatures are
/// rejected so each (key, message) pair has a single valid `r ‖ s`.
pub fn verify_ecdsa(
    r: &[u8; 32],
    s: &[u8; 32],
    public_key: &UncompressedPublicKey,
    message_hash: &[u8; 32],
) -> ClaimResult<()> {
    SECP256K1_CTX.with(|ctx| {
        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(r);
        compact[32..].copy_from_slice(s);

        let signature = Signature::from_compact(&compact)
            .map_err(|e| ClaimError::InvalidSignature(e.to_string()))?;
        let mut normalized = signature;
        normalized.normalize_s();
        if normalized != signature {
            return Err(ClaimError::InvalidSignature("high-s signature".into()));
        }

        let key = PublicKey::from_slice(&public_key.to_sec1())
            .map_err(|e| ClaimError::InvalidKey(e.to_string()))?;
        let message = Message::from_digest_slice(message_hash)
            .map_err(|e| ClaimError::Crypto(e.to_string()))?;

        ctx.verify_ecdsa(&message, &signature, &key)
            .map_err(|e| ClaimError::InvalidSignature(e.to_string()))
    })
}

pub fn sign_personal_message(
    private_key: &Secp256k1PrivateKey,
    message: &[u8],
) -> ClaimResult<ClaimSignature> {
    let hash = personal_message_hash(message);
    let (r, s, v) = sign_recoverable(private_key, &hash)?;
    let public_key = recover_public_key(&r, &s, v, &hash)?;
    Ok(ClaimSignature {
        r,
        s,
        v,
        public_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_address() {
        // Private key 1 maps to the generator point.
        let mut key = [0u8; 32];
        key[31] = 1;
        let address =
            derive_eth_address_from_private(&Secp256k1PrivateKey::from_bytes(key)).unwrap();
        assert_eq!(address.to_hex(), "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
    }

    #[test]
    fn test_personal_message_hash() {
        // keccak256("\x19Ethereum Signed Message:\n5hello")
        assert_eq!(
            hex::encode(personal_message_hash(b"hello")),
            "50b2c43fd39106bafbba0da34fc430e1f91e3c96ea2acee2bc34119f92b37750"
        );
    }

    #[test]
    fn test_sign_recover_verify() {
        let private_key = generate_private_key();
        let public_key = derive_public_key(&private_key).unwrap();

        let hash = personal_message_hash(b"claim");
        let (r, s, v) = sign_recoverable(&private_key, &hash).unwrap();
        assert!(v == 27 || v == 28);

        assert_eq!(recover_public_key(&r, &s, v, &hash).unwrap(), public_key);
        assert!(verify_ecdsa(&r, &s, &public_key, &hash).is_ok());

        let other = personal_message_hash(b"other");
        assert!(verify_ecdsa(&r, &s, &public_key, &other).is_err());
    }

    #[test]
    fn test_high_s_rejected() {
        let private_key = generate_private_key();
        let public_key = derive_public_key(&private_key).unwrap();
        let hash = personal_message_hash(b"malleable");
        let (r, s, _) = sign_recoverable(&private_key, &hash).unwrap();

        // s' = n - s
        let n = hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141")
            .unwrap();
        let mut high_s = [0u8; 32];
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let mut diff = i16::from(n[i]) - i16::from(s[i]) - borrow;
            borrow = if diff < 0 {
                diff += 256;
                1
            } else {
                0
            };
            high_s[i] = diff as u8;
        }

        assert!(matches!(
            verify_ecdsa(&r, &high_s, &public_key, &hash),
            Err(ClaimError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_sign_personal_message() {
        let private_key = generate_private_key();
        let signature = sign_personal_message(&private_key, b"payload").unwrap();
        assert_eq!(signature.public_key, derive_public_key(&private_key).unwrap());
    }
}

//! crypto/kdf.rs
//! HKDF-SHA256 key derivation for the keyed codecs.
//!
//! Design:
//! - HKDF-Extract(salt, key) -> PRK
//! - HKDF-Expand(PRK, "obfs/v1/<algorithm>/<purpose>") -> subkey
//!
//! Both endpoints must derive identical subkeys, so the info layout is part of
//! the wire contract. Changing it breaks every previously obfuscated payload.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::constants::KDF_INFO_PREFIX;
use crate::crypto::types::CryptoError;

/// What a derived subkey is used for. Encryption and MAC keys never alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    Encrypt,
    Mac,
}

impl KeyPurpose {
    fn label(self) -> &'static str {
        match self {
            KeyPurpose::Encrypt => "enc",
            KeyPurpose::Mac => "mac",
        }
    }
}

#[inline]
fn build_info(algorithm: &str, purpose: KeyPurpose) -> Vec<u8> {
    format!("{}/{}/{}", KDF_INFO_PREFIX, algorithm, purpose.label()).into_bytes()
}

/// Derive `N` bytes of key material for `algorithm` from a user key and salt.
///
/// Errors:
/// - Empty key material returns `CryptoError::Failure`.
/// - HKDF refuses outputs longer than 255 * 32 bytes.
pub fn derive_subkey<const N: usize>(
    key: &[u8],
    salt: &[u8],
    algorithm: &str,
    purpose: KeyPurpose,
) -> Result<[u8; N], CryptoError> {
    if key.is_empty() {
        return Err(CryptoError::Failure("key material must not be empty".into()));
    }

    let hk = Hkdf::<Sha256>::new(Some(salt), key);
    let mut out = [0u8; N];
    hk.expand(&build_info(algorithm, purpose), &mut out)
        .map_err(|_| CryptoError::Failure(format!("HKDF expand failed for {N} bytes")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purposes_never_alias() {
        let enc: [u8; 32] = derive_subkey(b"k", b"s", "blowfish", KeyPurpose::Encrypt).unwrap();
        let mac: [u8; 32] = derive_subkey(b"k", b"s", "blowfish", KeyPurpose::Mac).unwrap();
        assert_ne!(enc, mac);
    }

    #[test]
    fn algorithm_label_separates_keys() {
        let a: [u8; 32] = derive_subkey(b"k", b"s", "aes", KeyPurpose::Encrypt).unwrap();
        let b: [u8; 32] = derive_subkey(b"k", b"s", "chacha20", KeyPurpose::Encrypt).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_key_rejected() {
        let r: Result<[u8; 32], _> = derive_subkey(b"", b"s", "aes", KeyPurpose::Encrypt);
        assert!(r.is_err());
    }
}

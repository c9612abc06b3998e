//! crypto/nonce.rs
//! Random per-application nonces and IVs.
//!
//! Every codec application draws a fresh nonce from the OS RNG and prepends it
//! to its output, so workers never coordinate nonce state across chunks.

use rand::rngs::OsRng;
use rand::RngCore;

/// Fill a fixed-size nonce/IV from the OS RNG.
#[inline]
pub fn random_nonce<const N: usize>() -> [u8; N] {
    let mut nonce = [0u8; N];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Split `input` into a leading `N`-byte nonce and the remainder.
pub fn split_nonce<const N: usize>(input: &[u8]) -> Option<([u8; N], &[u8])> {
    if input.len() < N {
        return None;
    }
    let (head, rest) = input.split_at(N);
    let mut nonce = [0u8; N];
    nonce.copy_from_slice(head);
    Some((nonce, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonces_differ() {
        let a: [u8; 12] = random_nonce();
        let b: [u8; 12] = random_nonce();
        assert_ne!(a, b);
    }

    #[test]
    fn split_rejects_short_input() {
        assert!(split_nonce::<12>(&[0u8; 11]).is_none());
        let (n, rest) = split_nonce::<4>(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(n, [1, 2, 3, 4]);
        assert_eq!(rest, &[5]);
    }
}

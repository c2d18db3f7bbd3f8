//! CSPRNG helpers: checked random fills, uniform sampling, and the
//! receiver-list shuffle.
//!
//! The sampling helpers have a fixed byte-consumption pattern (four bytes
//! big-endian per sample, with multiply-and-shift rejection) so that a
//! replayed random stream always produces the same permutation. Test vectors
//! depend on this.

use rand_core::CryptoRngCore;

use crate::{CryptoError, Result};

/// Fill `buf` with cryptographically strong random bytes.
///
/// # Errors
///
/// Returns [`CryptoError::InsufficientRandomness`] if the CSPRNG cannot
/// deliver the full buffer.
pub fn random_fill<R: CryptoRngCore + ?Sized>(rng: &mut R, buf: &mut [u8]) -> Result<()> {
    rng.try_fill_bytes(buf)
        .map_err(|_| CryptoError::InsufficientRandomness)
}

/// Draw a uniform `u32` from the CSPRNG, consuming exactly four bytes,
/// interpreted big-endian.
pub fn csprng_u32<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    random_fill(rng, &mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Draw a uniform value in `[0, n)` without modulo bias.
///
/// Uses the multiply-and-shift rejection method: multiply a 32-bit sample by
/// `n`, keep the high word as the result, and resample only when the low
/// word falls into the biased region. See
/// <https://lemire.me/blog/2016/06/30/fast-random-shuffling>.
///
/// # Panics
///
/// Panics if `n == 0`; an empty range is a programming error.
pub fn csprng_u32_below<R: CryptoRngCore + ?Sized>(rng: &mut R, n: u32) -> Result<u32> {
    assert!(n > 0, "csprng_u32_below: empty range");
    let v = csprng_u32(rng)?;
    let mut prod = u64::from(v) * u64::from(n);
    let mut low = prod as u32;
    if low < n {
        let thresh = n.wrapping_neg() % n;
        while low < thresh {
            let v = csprng_u32(rng)?;
            prod = u64::from(v) * u64::from(n);
            low = prod as u32;
        }
    }
    Ok((prod >> 32) as u32)
}

/// Fisher–Yates shuffle driven by the supplied CSPRNG.
///
/// Walks the slice from the top index down, swapping each element with a
/// uniformly chosen earlier (or equal) position. The traversal order and the
/// per-sample byte consumption are fixed; replaying the same random byte
/// stream reproduces the same permutation.
pub fn shuffle<T, R: CryptoRngCore + ?Sized>(rng: &mut R, items: &mut [T]) -> Result<()> {
    for i in (1..items.len()).rev() {
        let j = csprng_u32_below(rng, (i + 1) as u32)? as usize;
        items.swap(i, j);
    }
    Ok(())
}

//! Fixed-width limb decomposition of big-endian unsigned integers.
//!
//! The proving field holds about 254 bits, so 256-bit token ids and signature
//! scalars and 512-bit public keys travel as 128-bit limbs, most-significant
//! limb first.

use anonclaim_types::{ClaimError, ClaimResult, LIMB_BITS};

fn limb_width(width_bits: usize, parts: usize) -> ClaimResult<usize> {
    if parts == 0 || width_bits == 0 || width_bits % parts != 0 {
        return Err(ClaimError::Internal(format!(
            "cannot split {} bits into {} limbs",
            width_bits, parts
        )));
    }
    let bits = width_bits / parts;
    if bits > LIMB_BITS {
        return Err(ClaimError::Internal(format!(
            "limb width {} exceeds {} bits",
            bits, LIMB_BITS
        )));
    }
    Ok(bits)
}

/// Bit `index` counted from the least-significant end.
fn bit(value_be: &[u8], index: usize) -> bool {
    let byte = index / 8;
    if byte >= value_be.len() {
        return false;
    }
    (value_be[value_be.len() - 1 - byte] >> (index % 8)) & 1 == 1
}

fn bit_length(value_be: &[u8]) -> usize {
    match value_be.iter().position(|&b| b != 0) {
        Some(first) => (value_be.len() - first) * 8 - value_be[first].leading_zeros() as usize,
        None => 0,
    }
}

pub fn split(value_be: &[u8], width_bits: usize, parts: usize) -> ClaimResult<Vec<u128>> {
    split_named(value_be, width_bits, parts, "value")
}

/// `split` with a name for the overflow error.
pub fn split_named(
    value_be: &[u8],
    width_bits: usize,
    parts: usize,
    what: &'static str,
) -> ClaimResult<Vec<u128>> {
    let limb_bits = limb_width(width_bits, parts)?;
    if bit_length(value_be) > width_bits {
        return Err(ClaimError::overflow(what, width_bits));
    }

    let limbs = (0..parts)
        .map(|k| {
            let low = width_bits - (k + 1) * limb_bits;
            (0..limb_bits)
                .rev()
                .fold(0u128, |acc, i| (acc << 1) | u128::from(bit(value_be, low + i)))
        })
        .collect();
    Ok(limbs)
}

/// Inverse of `split`; returns `ceil(width_bits / 8)` big-endian bytes.
pub fn join(limbs: &[u128], width_bits: usize) -> ClaimResult<Vec<u8>> {
    let limb_bits = limb_width(width_bits, limbs.len())?;
    let len = (width_bits + 7) / 8;
    let mut out = vec![0u8; len];

    for (k, limb) in limbs.iter().enumerate() {
        if limb_bits < 128 && limb >> limb_bits != 0 {
            return Err(ClaimError::overflow("limb", limb_bits));
        }
        let low = width_bits - (k + 1) * limb_bits;
        for i in 0..limb_bits {
            if (limb >> i) & 1 == 1 {
                let index = low + i;
                out[len - 1 - index / 8] |= 1 << (index % 8);
            }
        }
    }
    Ok(out)
}

/// Joins into a fixed-size array. `N * 8` must equal `width_bits`.
pub fn join_array<const N: usize>(limbs: &[u128], width_bits: usize) -> ClaimResult<[u8; N]> {
    let bytes = join(limbs, width_bits)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        ClaimError::Internal(format!("{} bits do not fill {} bytes", width_bits, N))
    })
}

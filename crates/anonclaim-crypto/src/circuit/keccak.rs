//! Keccak-256 over boolean wires.
//!
//! Inputs and outputs are byte streams with each byte's bits least
//! significant first, which is how Keccak packs bytes into its lanes.

use ark_bn254::Fr;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;

const RATE_BYTES: usize = 136;
const LANE_BITS: usize = 64;

const ROUND_CONSTANTS: [u64; 24] = [
    0x0000_0000_0000_0001,
    0x0000_0000_0000_8082,
    0x8000_0000_0000_808a,
    0x8000_0000_8000_8000,
    0x0000_0000_0000_808b,
    0x0000_0000_8000_0001,
    0x8000_0000_8000_8081,
    0x8000_0000_0000_8009,
    0x0000_0000_0000_008a,
    0x0000_0000_0000_0088,
    0x0000_0000_8000_8009,
    0x0000_0000_8000_000a,
    0x0000_0000_8000_808b,
    0x8000_0000_0000_008b,
    0x8000_0000_0000_8089,
    0x8000_0000_0000_8003,
    0x8000_0000_0000_8002,
    0x8000_0000_0000_0080,
    0x0000_0000_0000_800a,
    0x8000_0000_8000_000a,
    0x8000_0000_8000_8081,
    0x8000_0000_0000_8080,
    0x0000_0000_8000_0001,
    0x8000_0000_8000_8008,
];

const RHO: [usize; 24] = [
    1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 2, 14, 27, 41, 56, 8, 25, 43, 62, 18, 39, 61, 20, 44,
];

const PI: [usize; 24] = [
    10, 7, 11, 17, 18, 3, 5, 16, 8, 21, 24, 4, 15, 23, 19, 13, 12, 2, 20, 14, 22, 9, 6, 1,
];

type Lane = Vec<Boolean<Fr>>;

/// Constant wires for a byte string.
pub fn constant_bytes(bytes: &[u8]) -> Vec<Boolean<Fr>> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).map(move |i| Boolean::constant((byte >> i) & 1 == 1)))
        .collect()
}

/// Reverses byte order and keeps the bit order inside each byte. Maps the
/// little-endian bits of an integer to its big-endian byte stream, and back.
pub fn reverse_bytes(bits: &[Boolean<Fr>]) -> Vec<Boolean<Fr>> {
    bits.chunks(8).rev().flatten().cloned().collect()
}

pub fn keccak256(input: &[Boolean<Fr>]) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    if input.len() % 8 != 0 {
        return Err(SynthesisError::Unsatisfiable);
    }

    let pad_len = RATE_BYTES - (input.len() / 8) % RATE_BYTES;
    let mut padding = vec![0u8; pad_len];
    padding[0] |= 0x01;
    padding[pad_len - 1] |= 0x80;

    let mut message = input.to_vec();
    message.extend(constant_bytes(&padding));

    let mut state: Vec<Lane> = vec![vec![Boolean::constant(false); LANE_BITS]; 25];
    for block in message.chunks(RATE_BYTES * 8) {
        for (lane, bits) in state.iter_mut().zip(block.chunks(LANE_BITS)) {
            *lane = xor_lanes(lane, bits)?;
        }
        keccak_f(&mut state)?;
    }

    Ok(state[..4].concat())
}

fn keccak_f(a: &mut [Lane]) -> Result<(), SynthesisError> {
    for rc in ROUND_CONSTANTS {
        // theta
        let mut columns = Vec::with_capacity(5);
        for x in 0..5 {
            let mut column = a[x].clone();
            for y in 1..5 {
                column = xor_lanes(&column, &a[x + 5 * y])?;
            }
            columns.push(column);
        }
        for x in 0..5 {
            let d = xor_lanes(&columns[(x + 4) % 5], &rotate_left(&columns[(x + 1) % 5], 1))?;
            for y in 0..5 {
                a[x + 5 * y] = xor_lanes(&a[x + 5 * y], &d)?;
            }
        }

        // rho and pi
        let mut last = a[1].clone();
        for (&target, &offset) in PI.iter().zip(RHO.iter()) {
            last = std::mem::replace(&mut a[target], rotate_left(&last, offset));
        }

        // chi
        for y in 0..5 {
            let row: Vec<Lane> = a[5 * y..5 * y + 5].to_vec();
            for x in 0..5 {
                a[5 * y + x] = row[x]
                    .iter()
                    .zip(&row[(x + 1) % 5])
                    .zip(&row[(x + 2) % 5])
                    .map(|((b0, b1), b2)| b1.not().and(b2).and_then(|t| b0.xor(&t)))
                    .collect::<Result<Lane, SynthesisError>>()?;
            }
        }

        // iota
        a[0] = a[0]
            .iter()
            .enumerate()
            .map(|(i, bit)| if (rc >> i) & 1 == 1 { bit.not() } else { bit.clone() })
            .collect();
    }
    Ok(())
}

fn xor_lanes(a: &[Boolean<Fr>], b: &[Boolean<Fr>]) -> Result<Lane, SynthesisError> {
    a.iter().zip(b).map(|(x, y)| x.xor(y)).collect()
}

fn rotate_left(lane: &[Boolean<Fr>], n: usize) -> Lane {
    (0..LANE_BITS)
        .map(|k| lane[(k + LANE_BITS - n) % LANE_BITS].clone())
        .collect()
}

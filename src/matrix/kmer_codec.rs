use anyhow::{bail, Result};

use crate::cli::Hash;

pub const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

/// Highest k whose 2-bit code fits the 64-bit hash.
pub const MAX_KMER_SIZE: usize = 32;

/// Static ASCII→2-bit lookup table.
/// 0 = A, 1 = C, 2 = G, 3 = T, 255 = invalid
static LUT: [u8; 256] = {
    const X: u8 = u8::MAX;
    let mut t = [X; 256];
    t[b'A' as usize] = 0;
    t[b'a' as usize] = 0;
    t[b'C' as usize] = 1;
    t[b'c' as usize] = 1;
    t[b'G' as usize] = 2;
    t[b'g' as usize] = 2;
    t[b'T' as usize] = 3;
    t[b't' as usize] = 3;
    t
};

/// Encode a single nucleotide into its 2-bit code.
///
/// - A or a → 0
/// - C or c → 1
/// - G or g → 2
/// - T or t → 3
/// - anything else → `u8::MAX`
#[inline(always)]
pub fn encode_base(b: u8) -> u8 {
    LUT[b as usize]
}

/// Pack a k-mer string into its hash, first base in the most
/// significant pair so that textual order matches numeric order.
pub fn encode_kmer(seq: &str) -> Result<Hash> {
    let k = seq.len();
    if k < 1 || k > MAX_KMER_SIZE {
        bail!("illegal k-mer length {}: must be in [1, {}]", k, MAX_KMER_SIZE);
    }
    let mut hash: Hash = 0;
    for &b in seq.as_bytes() {
        let code = encode_base(b);
        if code == u8::MAX {
            bail!("illegal base {:?} in k-mer {:?}", b as char, seq);
        }
        hash = hash << 2 | code as Hash;
    }
    Ok(hash)
}

/// Decode a hash back to its textual k-mer.
pub fn decode_kmer(hash: Hash, k: usize) -> String {
    debug_assert!(k >= 1 && k <= MAX_KMER_SIZE);
    let mut tmp = hash;
    let mut buf = vec!['A'; k];
    for pos in (0..k).rev() {
        buf[pos] = BASES[(tmp & 3) as usize];
        tmp >>= 2;
    }
    buf.into_iter().collect()
}

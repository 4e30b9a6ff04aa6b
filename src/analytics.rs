//! Stateless functions over a read-only population view. None of these
//! mutate the soup; they exist to observe emergence from the outside.

use std::collections::HashMap;

use crate::error::{Result, SoupError};
use crate::vm::Program;

/// Shannon entropy, in bits, of the byte-value distribution over the
/// whole population (all programs concatenated). `0` for an empty
/// pool; attains `8` only when every byte value occurs equally often.
pub fn shannon_entropy_bits(pool: &[Program]) -> f64 {
    if pool.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    let mut total = 0u64;
    for program in pool {
        for &b in program {
            counts[b as usize] += 1;
            total += 1;
        }
    }
    let total = total as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Ratio of max-level deflate-compressed size to raw size over the
/// concatenated population. `1.0` for an empty pool. Used as a
/// structure proxy: highly repetitive populations compress far below
/// 1.0, uniform-random populations sit near (or slightly above) 1.0.
pub fn compress_ratio(pool: &[Program]) -> f64 {
    if pool.is_empty() {
        return 1.0;
    }
    let raw: Vec<u8> = pool.iter().flatten().copied().collect();
    let compressed = miniz_oxide::deflate::compress_to_vec(&raw, 10);
    compressed.len() as f64 / raw.len() as f64
}

/// Counts of every byte value across all `64 * size` bytes of the
/// population.
pub fn opcode_histogram(pool: &[Program]) -> HashMap<u8, u64> {
    let mut hist = HashMap::new();
    for program in pool {
        for &b in program {
            *hist.entry(b).or_insert(0) += 1;
        }
    }
    hist
}

/// The `k` most frequent distinct programs, with their counts, ties
/// broken by first occurrence in iteration order.
pub fn top_programs(pool: &[Program], k: usize) -> Vec<(Program, usize)> {
    let mut counts: Vec<(Program, usize)> = Vec::new();
    let mut index_of: HashMap<Program, usize> = HashMap::new();
    for program in pool {
        if let Some(&idx) = index_of.get(program) {
            counts[idx].1 += 1;
        } else {
            index_of.insert(*program, counts.len());
            counts.push((*program, 1));
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(k);
    counts
}

/// Number of byte positions where `a` and `b` differ.
pub fn hamming(a: &[u8], b: &[u8]) -> Result<usize> {
    if a.len() != b.len() {
        return Err(SoupError::LengthMismatch { a: a.len(), b: b.len() });
    }
    Ok(a.iter().zip(b.iter()).filter(|(x, y)| x != y).count())
}

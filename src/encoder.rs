//! Turns a customer's name into a 10-bit signature.
//!
//! Every distinct character is Caesar-shifted by its own frequency, the
//! shifted alphabet is huffman coded, and the tail of the coded name is read
//! back to front as a binary number.

use std::collections::HashMap;

use log::{debug, trace};

use crate::error::EncodeError;
use crate::huffman::{HuffmanTree, WeightMode, build_huffman_tree};

/// Number of trailing code bits that make up a signature.
pub const SIGNATURE_BITS: usize = 10;

/// Names with fewer distinct characters never produce a customer.
pub const MIN_DISTINCT_SYMBOLS: usize = 3;

/// A transformed character and how often it occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterStat {
    pub symbol: char,
    pub frequency: u64,
}

impl CharacterStat {
    // Frequency first, then the lowercase group ahead of everything else,
    // then ascending within the group.
    fn priority(&self) -> (u64, bool, char) {
        (self.frequency, self.symbol < 'a', self.symbol)
    }
}

/// Result of a successful encoding.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub signature: u32,
    pub inorder_dump: String,
    pub tree: HuffmanTree,
}

/// Shifts ASCII letters forward within their own case; anything else is
/// returned unchanged.
pub fn caesar_shift(c: char, shift: u64) -> char {
    let base = if c.is_ascii_lowercase() {
        b'a'
    } else if c.is_ascii_uppercase() {
        b'A'
    } else {
        return c;
    };
    let offset = (u64::from(c as u8 - base) + shift) % 26;
    (base + offset as u8) as char
}

/// Builds the merged statistics in tree-building order together with the
/// original → transformed character mapping.
pub fn character_stats(
    name: &str,
) -> Result<(HashMap<char, char>, Vec<CharacterStat>), EncodeError> {
    let mut freq: HashMap<char, u64> = HashMap::new();
    for c in name.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    if freq.len() < MIN_DISTINCT_SYMBOLS {
        return Err(EncodeError::TooFewSymbols {
            distinct: freq.len(),
        });
    }

    let mapping: HashMap<char, char> = freq
        .iter()
        .map(|(&c, &count)| (c, caesar_shift(c, count)))
        .collect();

    let mut merged: HashMap<char, u64> = HashMap::new();
    for (c, count) in &freq {
        *merged.entry(mapping[c]).or_insert(0) += count;
    }

    let mut stats: Vec<CharacterStat> = merged
        .into_iter()
        .map(|(symbol, frequency)| CharacterStat { symbol, frequency })
        .collect();
    stats.sort_by_key(CharacterStat::priority);

    debug!(
        "{} distinct characters collapse to {} symbols",
        freq.len(),
        stats.len()
    );
    Ok((mapping, stats))
}

/// Runs the full pipeline for one name.
pub fn encode(name: &str, mode: WeightMode) -> Result<Encoded, EncodeError> {
    let (mapping, stats) = character_stats(name)?;

    let symbols: Vec<(char, u64)> = stats.iter().map(|s| (s.symbol, s.frequency)).collect();
    let tree = build_huffman_tree(&symbols, mode)?;
    let table = tree.code_table();

    let mut bits = String::new();
    for c in name.chars().rev() {
        if bits.len() >= SIGNATURE_BITS {
            break;
        }
        if let Some(code) = mapping.get(&c).and_then(|t| table.get(t)) {
            bits.insert_str(0, code);
        }
    }

    let tail = &bits[bits.len().saturating_sub(SIGNATURE_BITS)..];
    let signature = tail
        .chars()
        .rev()
        .fold(0u32, |acc, bit| (acc << 1) | u32::from(bit == '1'));

    trace!("name {:?} -> bits {} -> signature {}", name, tail, signature);

    Ok(Encoded {
        signature,
        inorder_dump: tree.inorder_dump(),
        tree,
    })
}

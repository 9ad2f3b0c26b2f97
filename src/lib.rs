//! Restaurant queue simulation driven by huffman-coded name signatures.
//!
//! Each arriving name is turned into a 10-bit signature ([`encoder`]) using a
//! per-name huffman tree with a bounded rebalancing step ([`huffman`]). Even
//! signatures are seated in a hashed array of binary search trees
//! ([`bst_store`]), odd ones in a min-heap of areas ([`area_heap`]). The
//! [`restaurant`] replays a whitespace-separated [`command`] stream over both.

pub mod area_heap;
pub mod bst_store;
pub mod command;
pub mod config;
pub mod customer;
pub mod encoder;
pub mod error;
pub mod huffman;
pub mod restaurant;

pub use error::{CommandError, EncodeError, Result};

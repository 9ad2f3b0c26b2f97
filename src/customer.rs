use crate::huffman::HuffmanTree;

/// An accepted arrival. Owns the huffman tree its signature came from; the
/// tree goes away with the customer.
#[derive(Debug, Clone)]
pub struct Customer {
    signature: u32,
    tree: HuffmanTree,
}

impl Customer {
    pub fn new(signature: u32, tree: HuffmanTree) -> Self {
        Customer { signature, tree }
    }

    pub fn signature(&self) -> u32 {
        self.signature
    }

    pub fn tree(&self) -> &HuffmanTree {
        &self.tree
    }

    pub fn is_even(&self) -> bool {
        self.signature % 2 == 0
    }
}

#[cfg(test)]
pub(crate) fn test_customer(signature: u32) -> Customer {
    use crate::huffman::{WeightMode, build_huffman_tree};

    let tree = build_huffman_tree(&[('x', 1)], WeightMode::Preserve).unwrap();
    Customer::new(signature, tree)
}

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::str::FromStr;

use log::trace;

use crate::error::EncodeError;

pub type CodeTable = HashMap<char, String>;

/// Number of rebalancing passes applied after every merge.
const MAX_REBALANCE_PASSES: usize = 3;

/// What a rotation does with the weights of the two nodes it moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WeightMode {
    /// Rotated nodes keep the weight they were merged with.
    #[default]
    Preserve,
    /// Rotated nodes take the sum of their new children.
    Recompute,
}

impl FromStr for WeightMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preserve" => Ok(WeightMode::Preserve),
            "recompute" => Ok(WeightMode::Recompute),
            other => Err(format!("unknown weight mode: {other}")),
        }
    }
}

impl fmt::Display for WeightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightMode::Preserve => f.write_str("preserve"),
            WeightMode::Recompute => f.write_str("recompute"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Node {
    Leaf {
        symbol: char,
        weight: u64,
    },
    Internal {
        weight: u64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } => *weight,
            Node::Internal { weight, .. } => *weight,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Node count on the longest path down to a leaf; a leaf has height 1.
    pub fn height(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Internal { left, right, .. } => left.height().max(right.height()) + 1,
        }
    }

    /// Left height minus right height.
    pub fn balance(&self) -> isize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Internal { left, right, .. } => left.height() as isize - right.height() as isize,
        }
    }

    fn joined(stored: u64, left: Box<Node>, right: Box<Node>, mode: WeightMode) -> Node {
        let weight = match mode {
            WeightMode::Preserve => stored,
            WeightMode::Recompute => left.weight() + right.weight(),
        };
        Node::Internal {
            weight,
            left,
            right,
        }
    }
}

/// A finished huffman tree. Owned by the customer it was built for.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HuffmanTree {
    root: Box<Node>,
}

impl HuffmanTree {
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn weight(&self) -> u64 {
        self.root.weight()
    }

    /// Inorder listing: a leaf contributes its symbol, an internal node its
    /// weight, one per line.
    pub fn inorder_dump(&self) -> String {
        let mut out = String::new();
        inorder(&self.root, &mut out);
        out
    }

    pub fn code_table(&self) -> CodeTable {
        let mut table = CodeTable::new();
        build_code_table(&self.root, String::new(), &mut table);
        table
    }
}

fn inorder(node: &Node, out: &mut String) {
    match node {
        Node::Leaf { symbol, .. } => {
            out.push(*symbol);
            out.push('\n');
        }
        Node::Internal {
            weight,
            left,
            right,
        } => {
            inorder(left, out);
            out.push_str(&weight.to_string());
            out.push('\n');
            inorder(right, out);
        }
    }
}

#[derive(Eq, PartialEq)]
struct HeapNode {
    weight: u64,
    seq: usize,
    node: Box<Node>,
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the lightest, then the oldest.
        other
            .weight
            .cmp(&self.weight)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Builds the tree from `(symbol, weight)` pairs, already in priority order.
///
/// Equal weights are popped in push order, so the slice order fixes the tree
/// shape. Every merged tree is rebalanced before it goes back on the queue,
/// and a single degenerate rotation fails the whole build.
pub fn build_huffman_tree(
    symbols: &[(char, u64)],
    mode: WeightMode,
) -> Result<HuffmanTree, EncodeError> {
    let mut heap = BinaryHeap::with_capacity(symbols.len());
    let mut seq = 0;

    for &(symbol, weight) in symbols {
        heap.push(HeapNode {
            weight,
            seq,
            node: Box::new(Node::Leaf { symbol, weight }),
        });
        seq += 1;
    }

    while heap.len() > 1 {
        let (Some(left), Some(right)) = (heap.pop(), heap.pop()) else {
            break;
        };

        let merged = Box::new(Node::Internal {
            weight: left.weight + right.weight,
            left: left.node,
            right: right.node,
        });
        let node = rebalance(merged, mode)?;

        trace!("merged subtree #{} with weight {}", seq, node.weight());
        heap.push(HeapNode {
            weight: node.weight(),
            seq,
            node,
        });
        seq += 1;
    }

    heap.pop()
        .map(|n| HuffmanTree { root: n.node })
        .ok_or(EncodeError::TooFewSymbols { distinct: 0 })
}

fn rebalance(mut root: Box<Node>, mode: WeightMode) -> Result<Box<Node>, EncodeError> {
    for pass in 0..MAX_REBALANCE_PASSES {
        let mut rotated = false;
        root = rebalance_pass(root, mode, &mut rotated)?;
        if !rotated {
            break;
        }
        trace!("rebalance pass {} rotated", pass + 1);
    }
    Ok(root)
}

/// Rotates at the first node, in preorder, whose balance is outside [-1, 1]
/// and stops there.
///
/// A balance beyond one in either direction implies an internal pivot, so the
/// `DegenerateTree` arms of the rotations only guard against leaf pivots.
fn rebalance_pass(
    node: Box<Node>,
    mode: WeightMode,
    rotated: &mut bool,
) -> Result<Box<Node>, EncodeError> {
    let balance = node.balance();

    if balance > 1 {
        *rotated = true;
        let double = matches!(&*node, Node::Internal { left, .. } if left.balance() < 0);
        let node = if double {
            rotate_left_child(node, mode)?
        } else {
            node
        };
        return rotate_right(node, mode);
    }

    if balance < -1 {
        *rotated = true;
        let double = matches!(&*node, Node::Internal { right, .. } if right.balance() > 0);
        let node = if double {
            rotate_right_child(node, mode)?
        } else {
            node
        };
        return rotate_left(node, mode);
    }

    match *node {
        Node::Internal {
            weight,
            left,
            right,
        } => {
            let left = rebalance_pass(left, mode, rotated)?;
            let right = if *rotated {
                right
            } else {
                rebalance_pass(right, mode, rotated)?
            };
            Ok(Box::new(Node::Internal {
                weight,
                left,
                right,
            }))
        }
        leaf => Ok(Box::new(leaf)),
    }
}

fn rotate_right(node: Box<Node>, mode: WeightMode) -> Result<Box<Node>, EncodeError> {
    let Node::Internal {
        weight,
        left: pivot,
        right,
    } = *node
    else {
        return Err(EncodeError::DegenerateTree);
    };
    let Node::Internal {
        weight: pivot_weight,
        left: pivot_left,
        right: pivot_right,
    } = *pivot
    else {
        return Err(EncodeError::DegenerateTree);
    };

    let demoted = Node::joined(weight, pivot_right, right, mode);
    Ok(Box::new(Node::joined(
        pivot_weight,
        pivot_left,
        Box::new(demoted),
        mode,
    )))
}

fn rotate_left(node: Box<Node>, mode: WeightMode) -> Result<Box<Node>, EncodeError> {
    let Node::Internal {
        weight,
        left,
        right: pivot,
    } = *node
    else {
        return Err(EncodeError::DegenerateTree);
    };
    let Node::Internal {
        weight: pivot_weight,
        left: pivot_left,
        right: pivot_right,
    } = *pivot
    else {
        return Err(EncodeError::DegenerateTree);
    };

    let demoted = Node::joined(weight, left, pivot_left, mode);
    Ok(Box::new(Node::joined(
        pivot_weight,
        Box::new(demoted),
        pivot_right,
        mode,
    )))
}

// The parent keeps its own weight when only a child subtree is rotated.
fn rotate_left_child(node: Box<Node>, mode: WeightMode) -> Result<Box<Node>, EncodeError> {
    let Node::Internal {
        weight,
        left,
        right,
    } = *node
    else {
        return Err(EncodeError::DegenerateTree);
    };
    Ok(Box::new(Node::Internal {
        weight,
        left: rotate_left(left, mode)?,
        right,
    }))
}

fn rotate_right_child(node: Box<Node>, mode: WeightMode) -> Result<Box<Node>, EncodeError> {
    let Node::Internal {
        weight,
        left,
        right,
    } = *node
    else {
        return Err(EncodeError::DegenerateTree);
    };
    Ok(Box::new(Node::Internal {
        weight,
        left,
        right: rotate_right(right, mode)?,
    }))
}

pub fn build_code_table(node: &Node, prefix: String, table: &mut CodeTable) {
    match node {
        Node::Leaf { symbol, .. } => {
            trace!("assigning code to {:?}: '{}'", symbol, prefix);
            table.insert(*symbol, prefix);
        }
        Node::Internal { left, right, .. } => {
            build_code_table(left, format!("{}0", prefix), table);
            build_code_table(right, format!("{}1", prefix), table);
        }
    }
}

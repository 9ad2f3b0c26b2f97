//! Hashed store of per-bucket binary search trees.
//!
//! A customer lands in bucket `signature % N + 1`. Each bucket owns its
//! customers in arrival order and indexes their signatures in a plain
//! (unbalanced) BST, so the tree shape depends on arrival order.

use std::cmp::Ordering;
use std::collections::VecDeque;

use log::{debug, trace};

use crate::customer::Customer;

#[derive(Debug)]
struct BstNode {
    signature: u32,
    left: Option<Box<BstNode>>,
    right: Option<Box<BstNode>>,
}

#[derive(Debug, Default)]
struct Bucket {
    tree: Option<Box<BstNode>>,
    queue: VecDeque<Customer>,
}

impl Bucket {
    fn insert(&mut self, customer: Customer) {
        let signature = customer.signature();
        let mut link = &mut self.tree;
        while let Some(node) = link {
            link = if signature < node.signature {
                &mut node.left
            } else {
                &mut node.right
            };
        }
        *link = Some(Box::new(BstNode {
            signature,
            left: None,
            right: None,
        }));
        self.queue.push_back(customer);
    }
}

// Buckets can hold long same-signature chains, so every walk below runs on
// an explicit stack or a link cursor.
impl Drop for Bucket {
    fn drop(&mut self) {
        let mut stack: Vec<Box<BstNode>> = self.tree.take().into_iter().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
    }
}

/// Unlinks the first node on the search path holding `signature`.
fn remove(mut link: &mut Option<Box<BstNode>>, signature: u32) {
    loop {
        let ord = match link.as_deref() {
            Some(node) => signature.cmp(&node.signature),
            None => return,
        };
        if ord == Ordering::Equal {
            break;
        }
        let Some(node) = link else {
            return;
        };
        link = if ord == Ordering::Less {
            &mut node.left
        } else {
            &mut node.right
        };
    }

    let Some(mut node) = link.take() else {
        return;
    };
    *link = match (node.left.take(), node.right.take()) {
        (None, right) => right,
        (left, None) => left,
        (left, mut right) => {
            if let Some(successor) = take_min(&mut right) {
                node.signature = successor;
            }
            node.left = left;
            node.right = right;
            Some(node)
        }
    };
}

fn take_min(mut link: &mut Option<Box<BstNode>>) -> Option<u32> {
    while link.as_ref().is_some_and(|node| node.left.is_some()) {
        link = match link {
            Some(node) => &mut node.left,
            None => return None,
        };
    }
    let node = link.take()?;
    let BstNode {
        signature, right, ..
    } = *node;
    *link = right;
    Some(signature)
}

fn postorder(link: &Option<Box<BstNode>>, out: &mut Vec<u32>) {
    // root-right-left, reversed
    let start = out.len();
    let mut stack: Vec<&BstNode> = link.as_deref().into_iter().collect();
    while let Some(node) = stack.pop() {
        out.push(node.signature);
        stack.extend(node.left.as_deref());
        stack.extend(node.right.as_deref());
    }
    out[start..].reverse();
}

fn inorder(link: &Option<Box<BstNode>>, out: &mut Vec<u32>) {
    let mut stack: Vec<&BstNode> = Vec::new();
    let mut cursor = link.as_deref();
    loop {
        while let Some(node) = cursor {
            stack.push(node);
            cursor = node.left.as_deref();
        }
        let Some(node) = stack.pop() else {
            break;
        };
        out.push(node.signature);
        cursor = node.right.as_deref();
    }
}

#[derive(Debug)]
pub struct BstStore {
    buckets: Vec<Option<Bucket>>,
}

impl BstStore {
    /// # Panics
    ///
    /// Panics if `bucket_count` is zero.
    pub fn new(bucket_count: usize) -> Self {
        assert!(bucket_count > 0, "bucket_count must be greater than zero");
        BstStore {
            buckets: (0..bucket_count).map(|_| None).collect(),
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// 1-based bucket id for a signature.
    pub fn bucket_id(&self, signature: u32) -> usize {
        signature as usize % self.buckets.len() + 1
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().flatten().map(|b| b.queue.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bucket_len(&self, id: usize) -> usize {
        self.bucket(id).map_or(0, |b| b.queue.len())
    }

    pub fn insert(&mut self, customer: Customer) {
        let id = self.bucket_id(customer.signature());
        trace!("bucket {} <- {}", id, customer.signature());
        self.buckets[id - 1]
            .get_or_insert_with(Bucket::default)
            .insert(customer);
    }

    /// Removes the `count` oldest customers of bucket `id`. Asking for at
    /// least as many as the bucket holds tears the whole bucket down.
    pub fn evict(&mut self, id: usize, count: usize) -> Vec<Customer> {
        let Some(slot) = id.checked_sub(1).and_then(|i| self.buckets.get_mut(i)) else {
            return Vec::new();
        };
        let Some(bucket) = slot.as_mut() else {
            return Vec::new();
        };

        if count >= bucket.queue.len() {
            debug!("bucket {} torn down", id);
            return slot
                .take()
                .map(|mut b| Vec::from(std::mem::take(&mut b.queue)))
                .unwrap_or_default();
        }

        let mut evicted = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(customer) = bucket.queue.pop_front() else {
                break;
            };
            remove(&mut bucket.tree, customer.signature());
            evicted.push(customer);
        }
        debug!("bucket {} evicted {}", id, evicted.len());
        evicted
    }

    pub fn postorder(&self, id: usize) -> Vec<u32> {
        let mut out = Vec::new();
        if let Some(bucket) = self.bucket(id) {
            postorder(&bucket.tree, &mut out);
        }
        out
    }

    pub fn inorder(&self, id: usize) -> Vec<u32> {
        let mut out = Vec::new();
        if let Some(bucket) = self.bucket(id) {
            inorder(&bucket.tree, &mut out);
        }
        out
    }

    /// Evicts from every bucket as many customers as there are insertion
    /// orders reproducing its tree, modulo the bucket count. Returns the
    /// total evicted.
    pub fn purge(&mut self) -> usize {
        let modulus = self.buckets.len() as u64;
        let mut total = 0;
        for id in 1..=self.buckets.len() {
            let order = self.postorder(id);
            if order.is_empty() {
                continue;
            }
            let count = permutation_count(&order, modulus) % modulus;
            trace!("bucket {}: {} orderings (mod {})", id, count, modulus);
            total += self.evict(id, count as usize).len();
        }
        total
    }

    fn bucket(&self, id: usize) -> Option<&Bucket> {
        id.checked_sub(1)
            .and_then(|i| self.buckets.get(i))
            .and_then(Option::as_ref)
    }
}

/// Number of insertion orders, modulo `modulus`, that build the same BST as
/// the one whose postorder is given.
///
/// That count is `n! / (product of all subtree sizes)`. Both sides are
/// factored over the primes up to `n` so the division is exact before
/// anything is reduced.
pub fn permutation_count(postorder: &[u32], modulus: u64) -> u64 {
    let mut order = postorder.to_vec();
    order.reverse();
    let n = order.len();

    let smallest_factor = smallest_prime_factors(n);
    let mut exponents = vec![0i64; n + 1];
    let mut add_factors = |mut k: usize, sign: i64| {
        while k > 1 {
            let p = smallest_factor[k];
            exponents[p] += sign;
            k /= p;
        }
    };
    for k in 2..=n {
        add_factors(k, 1);
    }
    for size in subtree_sizes(&order) {
        add_factors(size, -1);
    }

    exponents
        .iter()
        .enumerate()
        .filter(|&(_, &e)| e > 0)
        .fold(1 % modulus, |acc, (p, &e)| {
            mul_mod(acc, pow_mod(p as u64, e as u64, modulus), modulus)
        })
}

enum Step {
    Open { low: u64, high: u64 },
    Close { node: usize },
}

/// Subtree size of every node, given root-right-left order (a reversed
/// postorder). Right subtrees hold `[node, high)`, left ones `[low, node)`.
fn subtree_sizes(order: &[u32]) -> Vec<usize> {
    let mut sizes = vec![0; order.len()];
    let mut next = 0;
    let mut steps = Vec::new();

    while next < order.len() {
        steps.push(Step::Open {
            low: 0,
            high: u64::MAX,
        });
        while let Some(step) = steps.pop() {
            match step {
                Step::Open { low, high } => {
                    let Some(&signature) = order.get(next) else {
                        continue;
                    };
                    let value = u64::from(signature);
                    if value < low || value >= high {
                        continue;
                    }
                    steps.push(Step::Close { node: next });
                    steps.push(Step::Open { low, high: value });
                    steps.push(Step::Open { low: value, high });
                    next += 1;
                }
                Step::Close { node } => sizes[node] = next - node,
            }
        }
    }
    sizes
}

fn smallest_prime_factors(limit: usize) -> Vec<usize> {
    let mut factors: Vec<usize> = (0..=limit).collect();
    let mut p = 2;
    while p * p <= limit {
        if factors[p] == p {
            for multiple in (p * p..=limit).step_by(p) {
                if factors[multiple] == multiple {
                    factors[multiple] = p;
                }
            }
        }
        p += 1;
    }
    factors
}

fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    (u128::from(a) * u128::from(b) % u128::from(modulus)) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    let mut result = 1 % modulus;
    base %= modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, modulus);
        }
        base = mul_mod(base, base, modulus);
        exp >>= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::test_customer;

    fn store_with(bucket_count: usize, signatures: &[u32]) -> BstStore {
        let mut store = BstStore::new(bucket_count);
        for &s in signatures {
            store.insert(test_customer(s));
        }
        store
    }

    #[test]
    fn hashes_into_one_based_buckets() {
        let store = store_with(5, &[114, 5, 9]);
        assert_eq!(store.bucket_id(114), 5);
        assert_eq!(store.bucket_len(5), 2);
        assert_eq!(store.bucket_len(1), 1);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn equal_signatures_go_right() {
        let store = store_with(1, &[10, 10, 4]);
        assert_eq!(store.inorder(1), vec![4, 10, 10]);
        assert_eq!(store.postorder(1), vec![4, 10, 10]);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut store = store_with(1, &[40, 20, 60, 10]);
        let evicted: Vec<u32> = store.evict(1, 2).iter().map(Customer::signature).collect();
        assert_eq!(evicted, vec![40, 20]);
        assert_eq!(store.inorder(1), vec![10, 60]);
        assert_eq!(store.bucket_len(1), 2);
    }

    #[test]
    fn evicting_everything_tears_bucket_down() {
        let mut store = store_with(1, &[3, 1, 2]);
        assert_eq!(store.evict(1, 7).len(), 3);
        assert!(store.is_empty());
        assert!(store.inorder(1).is_empty());
        assert!(store.postorder(1).is_empty());
    }

    #[test]
    fn missing_buckets_are_ignored() {
        let mut store = store_with(3, &[0]);
        assert!(store.evict(0, 1).is_empty());
        assert!(store.evict(2, 1).is_empty());
        assert!(store.evict(9, 1).is_empty());
        assert!(store.inorder(9).is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn removing_a_two_child_root_uses_successor() {
        let mut store = store_with(1, &[50, 30, 70, 60, 80]);
        store.evict(1, 1);
        assert_eq!(store.inorder(1), vec![30, 60, 70, 80]);
        assert_eq!(store.postorder(1), vec![30, 80, 70, 60]);
    }

    #[test]
    fn counts_orderings_of_full_tree() {
        // BST of 50 30 70 20 40 60 80
        let post = [20, 40, 30, 60, 80, 70, 50];
        assert_eq!(permutation_count(&post, 1000), 80);
        assert_eq!(permutation_count(&post, 7), 3);
        assert_eq!(permutation_count(&[5, 9], 1000), 1);
        assert_eq!(permutation_count(&[1, 2, 3], 1000), 1);
    }

    #[test]
    fn counts_orderings_beyond_small_moduli() {
        // root 100, left chain 99..70, right chain 101..130: C(60, 30) orders
        let post: Vec<u32> = (70..=99).chain((101..=130).rev()).chain([100]).collect();
        assert_eq!(permutation_count(&post, u64::MAX), 118_264_581_564_861_424);
        assert_eq!(permutation_count(&post, 1), 0);
        assert_eq!(permutation_count(&[], 5), 1);
    }

    #[test]
    fn modular_power() {
        assert_eq!(pow_mod(2, 10, 1000), 24);
        assert_eq!(pow_mod(7, 0, 5), 1);
        assert_eq!(pow_mod(u64::MAX - 1, 2, u64::MAX), 1);
    }

    #[test]
    fn purge_evicts_ordering_count() {
        let signatures = [350, 210, 490, 140, 280, 420, 560];
        let mut store = store_with(7, &signatures);
        assert_eq!(store.bucket_len(1), 7);

        assert_eq!(store.purge(), 3);
        assert_eq!(store.inorder(1), vec![140, 280, 420, 560]);
    }

    #[test]
    fn purge_on_two_node_bucket_evicts_one() {
        let mut store = store_with(4, &[4, 8]);
        assert_eq!(store.purge(), 1);
        assert_eq!(store.inorder(1), vec![8]);
    }

    #[test]
    fn single_bucket_purge_is_a_no_op() {
        // every count is zero modulo one
        let mut store = store_with(1, &[4, 8, 2, 6]);
        assert_eq!(store.purge(), 0);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn deep_same_signature_bucket() {
        let signatures = vec![4u32; 100_000];
        let mut store = store_with(2, &signatures);
        assert_eq!(store.postorder(1).len(), 100_000);

        // a chain has exactly one insertion order
        assert_eq!(store.purge(), 1);
        assert_eq!(store.bucket_len(1), 99_999);
        assert_eq!(store.inorder(1).len(), 99_999);

        assert_eq!(store.evict(1, 10).len(), 10);
        assert_eq!(store.inorder(1).len(), 99_989);
        drop(store);
    }
}

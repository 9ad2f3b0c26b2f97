//! Min-heap of customer areas.
//!
//! Customers are grouped into areas by label (`signature % capacity + 1`).
//! Areas live in an array-backed binary heap ordered by how many customers
//! they hold and, on ties, by when they were last touched. Every touch
//! stamps the area with the next value of a store-wide clock, so no two
//! areas ever share a key.

use std::collections::VecDeque;

use log::{debug, trace};

use crate::customer::Customer;

#[derive(Debug)]
pub struct Area {
    label: usize,
    last_touched: u64,
    queue: VecDeque<Customer>,
}

impl Area {
    pub fn label(&self) -> usize {
        self.label
    }

    pub fn count(&self) -> usize {
        self.queue.len()
    }

    pub fn last_touched(&self) -> u64 {
        self.last_touched
    }

    /// Signatures, oldest first.
    pub fn signatures(&self) -> Vec<u32> {
        self.queue.iter().map(Customer::signature).collect()
    }

    fn key(&self) -> (usize, u64) {
        (self.queue.len(), self.last_touched)
    }
}

#[derive(Debug)]
pub struct AreaHeap {
    capacity: usize,
    clock: u64,
    areas: Vec<Area>,
}

impl AreaHeap {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than zero");
        AreaHeap {
            capacity,
            clock: 0,
            areas: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn label_for(&self, signature: u32) -> usize {
        signature as usize % self.capacity + 1
    }

    /// Total customers across all areas.
    pub fn len(&self) -> usize {
        self.areas.iter().map(Area::count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    pub fn area(&self, label: usize) -> Option<&Area> {
        self.position(label).map(|i| &self.areas[i])
    }

    /// Areas in heap array order.
    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn insert(&mut self, customer: Customer) {
        let label = self.label_for(customer.signature());
        let stamp = self.tick();
        trace!("area {} <- {}", label, customer.signature());

        match self.position(label) {
            Some(i) => {
                let area = &mut self.areas[i];
                area.queue.push_back(customer);
                area.last_touched = stamp;
                self.sift_down(i);
            }
            None => {
                self.areas.push(Area {
                    label,
                    last_touched: stamp,
                    queue: VecDeque::from([customer]),
                });
                self.sift_up(self.areas.len() - 1);
            }
        }
    }

    /// Picks the `n` areas with the smallest keys and removes up to `n` of
    /// the oldest customers from each. Returns `(label, customer)` pairs in
    /// eviction order.
    pub fn evict_lowest(&mut self, n: usize) -> Vec<(usize, Customer)> {
        let mut ranked: Vec<((usize, u64), usize)> =
            self.areas.iter().map(|a| (a.key(), a.label)).collect();
        ranked.sort_unstable();

        let mut evicted = Vec::new();
        for (_, label) in ranked.into_iter().take(n) {
            let Some(i) = self.position(label) else {
                continue;
            };

            if self.areas[i].count() <= n {
                let area = self.areas.swap_remove(i);
                if i < self.areas.len() {
                    self.restore(i);
                }
                debug!("area {} closed ({} customers)", label, area.count());
                evicted.extend(area.queue.into_iter().map(|c| (label, c)));
            } else {
                let stamp = self.tick();
                let area = &mut self.areas[i];
                area.last_touched = stamp;
                evicted.extend(area.queue.drain(..n).map(|c| (label, c)));
                debug!("area {} shrunk to {}", label, area.count());
                self.restore(i);
            }
        }
        evicted
    }

    /// Walks the heap in preorder, yielding up to `n` of each area's newest
    /// customers as `(label, signature)`.
    pub fn preorder(&self, n: usize) -> Vec<(usize, u32)> {
        let mut out = Vec::new();
        self.preorder_from(0, n, &mut out);
        out
    }

    fn preorder_from(&self, i: usize, n: usize, out: &mut Vec<(usize, u32)>) {
        let Some(area) = self.areas.get(i) else {
            return;
        };
        out.extend(
            area.queue
                .iter()
                .rev()
                .take(n)
                .map(|c| (area.label, c.signature())),
        );
        self.preorder_from(2 * i + 1, n, out);
        self.preorder_from(2 * i + 2, n, out);
    }

    /// Every parent key is no greater than its children's.
    pub fn is_heap(&self) -> bool {
        (1..self.areas.len()).all(|i| self.areas[(i - 1) / 2].key() <= self.areas[i].key())
    }

    fn tick(&mut self) -> u64 {
        let stamp = self.clock;
        self.clock += 1;
        stamp
    }

    fn position(&self, label: usize) -> Option<usize> {
        self.areas.iter().position(|a| a.label == label)
    }

    fn restore(&mut self, i: usize) {
        let i = self.sift_up(i);
        self.sift_down(i);
    }

    fn sift_up(&mut self, mut i: usize) -> usize {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.areas[i].key() >= self.areas[parent].key() {
                break;
            }
            self.areas.swap(i, parent);
            i = parent;
        }
        i
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.areas.len();
        loop {
            let mut smallest = i;
            for child in [2 * i + 1, 2 * i + 2] {
                if child < len && self.areas[child].key() < self.areas[smallest].key() {
                    smallest = child;
                }
            }
            if smallest == i {
                break;
            }
            self.areas.swap(i, smallest);
            i = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::test_customer;

    fn heap_with(capacity: usize, signatures: &[u32]) -> AreaHeap {
        let mut heap = AreaHeap::new(capacity);
        for &s in signatures {
            heap.insert(test_customer(s));
        }
        heap
    }

    fn labels(heap: &AreaHeap) -> Vec<usize> {
        heap.areas().iter().map(Area::label).collect()
    }

    #[test]
    fn colliding_labels_share_an_area() {
        let mut heap = heap_with(5, &[1, 11, 21]);
        let area = heap.area(2).unwrap();
        assert_eq!(area.count(), 3);
        assert_eq!(heap.area_count(), 1);

        let evicted: Vec<u32> = heap
            .evict_lowest(2)
            .iter()
            .map(|(_, c)| c.signature())
            .collect();
        assert_eq!(evicted, vec![1, 11]);
        assert_eq!(heap.area(2).unwrap().signatures(), vec![21]);
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn growing_area_sinks() {
        let mut heap = heap_with(10, &[1, 3, 5, 13]);
        assert_eq!(labels(&heap), vec![2, 4, 6]);

        heap.insert(test_customer(11));
        assert_eq!(labels(&heap), vec![6, 4, 2]);
        assert!(heap.is_heap());
    }

    #[test]
    fn preorder_lists_newest_first() {
        let mut heap = heap_with(10, &[1, 3, 5, 13]);
        assert_eq!(heap.preorder(5), vec![(2, 1), (4, 13), (4, 3), (6, 5)]);
        assert_eq!(heap.preorder(1), vec![(2, 1), (4, 13), (6, 5)]);

        heap.insert(test_customer(11));
        assert_eq!(
            heap.preorder(5),
            vec![(6, 5), (4, 13), (4, 3), (2, 11), (2, 1)]
        );
        assert!(heap.preorder(0).is_empty());
    }

    #[test]
    fn evicts_globally_smallest_areas() {
        let mut heap = heap_with(10, &[1, 3, 5, 13, 11]);

        let evicted: Vec<(usize, u32)> = heap
            .evict_lowest(2)
            .into_iter()
            .map(|(label, c)| (label, c.signature()))
            .collect();
        assert_eq!(evicted, vec![(6, 5), (4, 3), (4, 13)]);
        assert_eq!(labels(&heap), vec![2]);
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn partial_eviction_restamps() {
        let mut heap = heap_with(1, &[7, 8, 9]);
        let before = heap.area(1).unwrap().last_touched();

        assert_eq!(heap.evict_lowest(1).len(), 1);
        let area = heap.area(1).unwrap();
        assert!(area.last_touched() > before);
        assert_eq!(area.signatures(), vec![8, 9]);
    }

    #[test]
    fn zero_and_empty_evictions_are_no_ops() {
        let mut heap = heap_with(4, &[1, 2]);
        assert!(heap.evict_lowest(0).is_empty());
        assert_eq!(heap.len(), 2);

        let mut empty = AreaHeap::new(4);
        assert!(empty.evict_lowest(3).is_empty());
        assert!(empty.preorder(3).is_empty());
    }

    #[test]
    fn heap_holds_after_mixed_operations() {
        let mut heap = AreaHeap::new(6);
        for s in [5, 11, 17, 1, 2, 3, 4, 8, 14, 20, 9, 10] {
            heap.insert(test_customer(s));
            assert!(heap.is_heap());
        }
        for n in [1, 2, 1, 3] {
            heap.evict_lowest(n);
            assert!(heap.is_heap());
        }
    }
}

//! The restaurant: two waiting areas fed by name signatures.
//!
//! Even signatures are seated in the bucketed BST store, odd ones in the
//! area heap. A customer never moves between the two.

use std::io::Write;

use log::{debug, info};

use crate::area_heap::AreaHeap;
use crate::bst_store::BstStore;
use crate::command::{Command, CommandParser};
use crate::customer::Customer;
use crate::encoder::{Encoded, encode};
use crate::error::{CommandError, Result};
use crate::huffman::WeightMode;

/// Where an accepted customer was seated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Even { bucket: usize },
    Odd { label: usize },
}

#[derive(Debug)]
struct Stores {
    even: BstStore,
    odd: AreaHeap,
}

#[derive(Debug, Default)]
pub struct Restaurant {
    weight_mode: WeightMode,
    stores: Option<Stores>,
    last_arrival: Option<String>,
}

impl Restaurant {
    pub fn new(weight_mode: WeightMode) -> Self {
        Restaurant {
            weight_mode,
            stores: None,
            last_arrival: None,
        }
    }

    pub fn weight_mode(&self) -> WeightMode {
        self.weight_mode
    }

    /// Replaces both stores with empty ones of the given capacity.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(CommandError::InvalidCapacity(0));
        }
        if self.stores.is_some() {
            debug!("capacity reset, dropping seated customers");
        }
        self.stores = Some(Stores {
            even: BstStore::new(capacity),
            odd: AreaHeap::new(capacity),
        });
        Ok(())
    }

    pub fn even_store(&self) -> Option<&BstStore> {
        self.stores.as_ref().map(|s| &s.even)
    }

    pub fn odd_store(&self) -> Option<&AreaHeap> {
        self.stores.as_ref().map(|s| &s.odd)
    }

    /// Customers currently seated across both stores.
    pub fn len(&self) -> usize {
        self.stores
            .as_ref()
            .map_or(0, |s| s.even.len() + s.odd.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encodes `name` and seats the customer. Returns `Ok(None)` when the name
    /// does not produce a customer; nothing changes in that case.
    pub fn arrive(&mut self, name: &str) -> Result<Option<Placement>> {
        let mode = self.weight_mode;
        let stores = self
            .stores
            .as_mut()
            .ok_or(CommandError::NotConfigured("arrive"))?;

        let Encoded {
            signature,
            inorder_dump,
            tree,
        } = match encode(name, mode) {
            Ok(encoded) => encoded,
            Err(e) => {
                debug!("dropping arrival {:?}: {}", name, e);
                return Ok(None);
            }
        };

        let customer = Customer::new(signature, tree);
        let placement = if customer.is_even() {
            let bucket = stores.even.bucket_id(customer.signature());
            stores.even.insert(customer);
            Placement::Even { bucket }
        } else {
            let label = stores.odd.label_for(customer.signature());
            stores.odd.insert(customer);
            Placement::Odd { label }
        };

        debug!(
            "{:?} seated with signature {} at {:?}",
            name, signature, placement
        );
        self.last_arrival = Some(inorder_dump);
        Ok(Some(placement))
    }

    pub fn purge_even(&mut self) -> Result<usize> {
        let stores = self
            .stores
            .as_mut()
            .ok_or(CommandError::NotConfigured("purgeEven"))?;
        Ok(stores.even.purge())
    }

    pub fn purge_odd(&mut self, n: usize) -> Result<Vec<(usize, Customer)>> {
        let stores = self
            .stores
            .as_mut()
            .ok_or(CommandError::NotConfigured("purgeOdd"))?;
        Ok(stores.odd.evict_lowest(n))
    }

    /// Inorder dump of the huffman tree from the last seated customer.
    pub fn last_arrival_dump(&self) -> Option<&str> {
        self.last_arrival.as_deref()
    }

    pub fn dump_even(&self, bucket: usize) -> Result<Vec<u32>> {
        self.even_store()
            .map(|s| s.inorder(bucket))
            .ok_or(CommandError::NotConfigured("dumpEven"))
    }

    pub fn dump_odd_preorder(&self, n: usize) -> Result<Vec<(usize, u32)>> {
        self.odd_store()
            .map(|s| s.preorder(n))
            .ok_or(CommandError::NotConfigured("dumpOddPreorder"))
    }

    pub fn execute<W: Write>(&mut self, command: &Command, out: &mut W) -> Result<()> {
        match command {
            Command::SetCapacity(capacity) => {
                let capacity = usize::try_from(*capacity)
                    .map_err(|_| CommandError::InvalidCapacity(*capacity))?;
                self.set_capacity(capacity)?;
            }
            Command::Arrive(name) => {
                self.arrive(name)?;
            }
            Command::PurgeEven => {
                let evicted = self.purge_even()?;
                debug!("purgeEven evicted {}", evicted);
            }
            Command::PurgeOdd(n) => {
                for (label, customer) in self.purge_odd(count(*n))? {
                    writeln!(out, "{}-{}", customer.signature(), label)?;
                }
            }
            Command::LastArrivalDump => {
                if let Some(dump) = self.last_arrival_dump() {
                    out.write_all(dump.as_bytes())?;
                }
            }
            Command::DumpEven(bucket) => {
                for signature in self.dump_even(count(*bucket))? {
                    writeln!(out, "{}", signature)?;
                }
            }
            Command::DumpOddPreorder(n) => {
                for (label, signature) in self.dump_odd_preorder(count(*n))? {
                    writeln!(out, "{}-{}", label, signature)?;
                }
            }
        }
        Ok(())
    }

    /// Replays a whole command stream, stopping at the first fault. Returns
    /// the number of commands executed.
    pub fn run<W: Write>(&mut self, input: &str, out: &mut W) -> Result<usize> {
        let mut executed = 0;
        for command in CommandParser::new(input) {
            let command = command?;
            self.execute(&command, out)?;
            executed += 1;
        }
        info!(
            "{} commands executed, {} customers seated",
            executed,
            self.len()
        );
        Ok(executed)
    }
}

// Non-positive ids and counts select nothing.
fn count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

use crate::world::definitions::Definitions;
use serde::{Deserialize, Serialize};

pub const INVENTORY_CAPACITY: usize = 30;
pub const TRADE_OFFER_CAPACITY: usize = 12;
pub const DUEL_OFFER_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub id: u32,
    pub amount: u32,
    #[serde(default)]
    pub worn: bool,
}

impl ItemStack {
    pub fn new(id: u32, amount: u32) -> Self {
        Self {
            id,
            amount,
            worn: false,
        }
    }
}

/// Ordered item list with a fixed slot capacity. Stackable items share a
/// slot; everything else takes one slot per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    capacity: usize,
    items: Vec<ItemStack>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::with_capacity(INVENTORY_CAPACITY)
    }
}

impl Inventory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ItemStack] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn count(&self, id: u32) -> u32 {
        self.items
            .iter()
            .filter(|item| item.id == id)
            .fold(0u32, |acc, item| acc.saturating_add(item.amount))
    }

    pub fn can_hold(&self, id: u32, amount: u32, stackable: bool) -> bool {
        if stackable {
            if self.items.iter().any(|item| item.id == id) {
                return true;
            }
            return self.items.len() < self.capacity;
        }
        self.items.len() + amount as usize <= self.capacity
    }

    /// Adds `amount` of `id`, returning the slot of the last item touched.
    pub fn add(&mut self, id: u32, amount: u32, stackable: bool) -> Result<usize, String> {
        if amount == 0 {
            return Err("cannot add zero-count item".to_string());
        }
        if !self.can_hold(id, amount, stackable) {
            return Err("inventory full".to_string());
        }
        if stackable {
            if let Some(index) = self.items.iter().position(|item| item.id == id) {
                let existing = &mut self.items[index];
                existing.amount = existing
                    .amount
                    .checked_add(amount)
                    .ok_or_else(|| "inventory stack overflow".to_string())?;
                return Ok(index);
            }
            self.items.push(ItemStack::new(id, amount));
            return Ok(self.items.len() - 1);
        }
        for _ in 0..amount {
            self.items.push(ItemStack::new(id, 1));
        }
        Ok(self.items.len() - 1)
    }

    /// Removes `amount` of the first stack with `id`. Returns the slot the
    /// item occupied, or `None` when nothing suitable was held.
    pub fn remove_by_id(&mut self, id: u32, amount: u32) -> Option<usize> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id && item.amount >= amount)?;
        let item = &mut self.items[index];
        if item.amount > amount {
            item.amount -= amount;
        } else {
            self.items.remove(index);
        }
        Some(index)
    }

    /// Items lost on death: everything except the `keep` most valuable
    /// stacks, most valuable first.
    pub fn death_drops(&self, keep: usize, definitions: &Definitions) -> Vec<ItemStack> {
        let mut sorted = self.items.clone();
        sorted.sort_by(|a, b| {
            definitions
                .item_price(b.id)
                .cmp(&definitions.item_price(a.id))
        });
        sorted.into_iter().skip(keep).collect()
    }
}

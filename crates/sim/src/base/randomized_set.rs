use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use rand::Rng;

use crate::errors::RandomizedSetError;

/// A set supporting insertion, removal and uniform random choice in O(1).
///
/// Items live in a dense slot vector with a side index from item to slot.
/// Removal swaps the last slot into the hole, so iteration order is slot
/// order and is not preserved across removals.
#[derive(Clone)]
pub struct RandomizedSet<T> {
    items: Vec<T>,
    slots: HashMap<T, usize>,
}

impl<T: Hash + Eq + Clone> RandomizedSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Create an empty set with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
        }
    }

    /// Add an item. No-op if it is already present.
    pub fn add(&mut self, item: T) {
        if self.slots.contains_key(&item) {
            return;
        }
        self.slots.insert(item.clone(), self.items.len());
        self.items.push(item);
    }

    /// Remove an item, moving the last item into its slot.
    pub fn remove(&mut self, item: &T) -> Result<(), RandomizedSetError> {
        let slot = self
            .slots
            .remove(item)
            .ok_or(RandomizedSetError::NotFound)?;
        self.items.swap_remove(slot);
        if let Some(moved) = self.items.get(slot) {
            self.slots.insert(moved.clone(), slot);
        }
        Ok(())
    }

    /// Draw an item uniformly at random.
    pub fn choice<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&T, RandomizedSetError> {
        if self.items.is_empty() {
            return Err(RandomizedSetError::Empty);
        }
        let slot = rng.random_range(0..self.items.len());
        Ok(&self.items[slot])
    }

    /// Whether `item` is in the set.
    pub fn contains(&self, item: &T) -> bool {
        self.slots.contains_key(item)
    }

    /// Number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in slot order. Use `.rev()` for reverse slot order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        self.items.clear();
        self.slots.clear();
    }
}

impl<T: Hash + Eq + Clone> Default for RandomizedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq + Clone> FromIterator<T> for RandomizedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.add(item);
        }
        set
    }
}

impl<'a, T: Hash + Eq + Clone> IntoIterator for &'a RandomizedSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for RandomizedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RandomizedSet(")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item:?}")?;
        }
        write!(f, ")")
    }
}

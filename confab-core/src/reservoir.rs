//! Insertion-ordered stores for memories and thoughts.
//!
//! A [`Reservoir`] keeps items in arrival order, enforces id uniqueness, and
//! answers saliency-ranked top-k queries. Retrieval is a pure read: access
//! bookkeeping belongs to the caller, which bumps
//! [`record_access`](crate::mental::MentalObject::record_access) only when an
//! item is actually fed into a generation context.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{ConfabError, Result};
use crate::mental::{AsMentalObject, MentalObject, Thought};
use crate::types::{MentalObjectId, MentalObjectKind};

/// Long- and short-term memories of one agent.
pub type MemoryStore = Reservoir<MentalObject>;

/// Generated thoughts of one agent.
pub type ThoughtReservoir = Reservoir<Thought>;

/// An insertion-ordered collection of mental objects, unique by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservoir<T> {
    items: Vec<T>,
}

impl<T> Default for Reservoir<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: AsMentalObject> Reservoir<T> {
    /// Create an empty reservoir.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item, preserving arrival order.
    ///
    /// # Errors
    /// [`ConfabError::DuplicateId`] if an item with the same id is already
    /// present; the reservoir is left unchanged.
    pub fn add(&mut self, item: T) -> Result<()> {
        let id = item.mental().id;
        if self.items.iter().any(|i| i.mental().id == id) {
            return Err(ConfabError::DuplicateId(id));
        }
        self.items.push(item);
        Ok(())
    }

    /// Remove and return the item with `id`.
    ///
    /// # Errors
    /// [`ConfabError::NotFound`] if no such item exists.
    pub fn remove(&mut self, id: MentalObjectId) -> Result<T> {
        match self.items.iter().position(|i| i.mental().id == id) {
            Some(idx) => Ok(self.items.remove(idx)),
            None => Err(ConfabError::NotFound(id)),
        }
    }

    /// Borrow the item with `id`, if present.
    #[must_use]
    pub fn get(&self, id: MentalObjectId) -> Option<&T> {
        self.items.iter().find(|i| i.mental().id == id)
    }

    /// Mutably borrow the item with `id`, if present.
    pub fn get_mut(&mut self, id: MentalObjectId) -> Option<&mut T> {
        self.items.iter_mut().find(|i| i.mental().id == id)
    }

    /// The `k` most salient items at or above `threshold`, optionally
    /// restricted to one kind (`None` = all kinds).
    ///
    /// Results are ordered by saliency descending; exact ties keep insertion
    /// order (earlier first). Pure read — neither `last_accessed_turn` nor
    /// `retrieval_count` moves, so repeated calls with no interleaved
    /// mutation return identical results.
    #[must_use]
    pub fn retrieve_top_k(
        &self,
        k: usize,
        threshold: f32,
        kind: Option<MentalObjectKind>,
    ) -> Vec<&T> {
        let mut hits: Vec<&T> = self
            .items
            .iter()
            .filter(|i| kind.is_none_or(|want| i.mental().kind == want))
            .filter(|i| i.mental().saliency >= threshold)
            .collect();
        // Stable sort: equal saliencies keep insertion order.
        hits.sort_by_key(|i| std::cmp::Reverse(OrderedFloat(i.mental().saliency)));
        hits.truncate(k);
        hits
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Iterate mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// Number of items held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

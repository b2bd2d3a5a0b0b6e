//! Bounded, ordered list editing for the profile's tag and link collections
//!
//! Every operation borrows the current list and returns a new one, so the
//! owning profile is updated by replacing the whole field. A failed operation
//! returns an error and the caller keeps its old list.

use thiserror::Error;

use crate::constants::lists::{MAX_ITEMS, MAX_TAG_CHARS};
use crate::profile::Link;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("list is full ({max} items maximum)")]
    ListFull { max: usize },

    #[error("item is {len} characters long ({max} maximum)")]
    ItemTooLong { len: usize, max: usize },

    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("value does not match the item type of this list")]
    ItemKindMismatch,
}

/// An element that can live in a bounded list
pub trait ListItem: Clone + Default {
    /// Reject values that break the per-item bound
    fn check(&self, max_chars: usize) -> Result<(), ListError>;
}

impl ListItem for String {
    fn check(&self, max_chars: usize) -> Result<(), ListError> {
        let len = self.chars().count();
        if len > max_chars {
            return Err(ListError::ItemTooLong { len, max: max_chars });
        }
        Ok(())
    }
}

// Links are fixed-key records; only scalar tags carry a length bound
impl ListItem for Link {
    fn check(&self, _max_chars: usize) -> Result<(), ListError> {
        Ok(())
    }
}

/// Editor enforcing list and item bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEditor {
    pub max_items: usize,
    pub max_item_chars: usize,
}

impl Default for ListEditor {
    fn default() -> Self {
        Self {
            max_items: MAX_ITEMS,
            max_item_chars: MAX_TAG_CHARS,
        }
    }
}

impl ListEditor {
    pub fn new(max_items: usize, max_item_chars: usize) -> Self {
        Self {
            max_items,
            max_item_chars,
        }
    }

    /// Append one default-valued item
    pub fn add<T: ListItem>(&self, list: &[T]) -> Result<Vec<T>, ListError> {
        if list.len() >= self.max_items {
            return Err(ListError::ListFull { max: self.max_items });
        }
        let mut next = list.to_vec();
        next.push(T::default());
        Ok(next)
    }

    /// Append a specific item, subject to both bounds
    pub fn push<T: ListItem>(&self, list: &[T], item: T) -> Result<Vec<T>, ListError> {
        item.check(self.max_item_chars)?;
        let mut next = self.add(list)?;
        if let Some(last) = next.last_mut() {
            *last = item;
        }
        Ok(next)
    }

    /// Replace the item at `index`
    pub fn update<T: ListItem>(&self, list: &[T], index: usize, value: T) -> Result<Vec<T>, ListError> {
        self.check_index(list, index)?;
        value.check(self.max_item_chars)?;
        let mut next = list.to_vec();
        next[index] = value;
        Ok(next)
    }

    /// Remove the item at `index`, shifting later items left
    pub fn remove<T: ListItem>(&self, list: &[T], index: usize) -> Result<Vec<T>, ListError> {
        self.check_index(list, index)?;
        let mut next = list.to_vec();
        next.remove(index);
        Ok(next)
    }

    /// Truncate a list loaded from elsewhere to the editor's bounds.
    /// Returns the number of entries dropped.
    pub fn clamp_len<T>(&self, list: &mut Vec<T>) -> usize {
        let dropped = list.len().saturating_sub(self.max_items);
        list.truncate(self.max_items);
        dropped
    }

    /// Truncate a tag to the per-item bound on a char boundary
    pub fn clamp_tag(&self, tag: &mut String) -> bool {
        match tag.char_indices().nth(self.max_item_chars) {
            Some((byte_idx, _)) => {
                tag.truncate(byte_idx);
                true
            }
            None => false,
        }
    }

    fn check_index<T>(&self, list: &[T], index: usize) -> Result<(), ListError> {
        if index >= list.len() {
            return Err(ListError::IndexOutOfRange {
                index,
                len: list.len(),
            });
        }
        Ok(())
    }
}

//! Shuffled rotation pool over the image catalog.
//!
//! The pool is a permutation of the catalog consumed left-to-right. It
//! regenerates itself with a fresh shuffle only on exhaustion, so within one
//! pass every catalog entry appears exactly once.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::ImageCatalog;

/// Fisher-Yates permutation of `0..len`.
pub fn shuffled_indices(len: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order
}

/// Cyclic, non-repeating-per-cycle sequence of catalog names.
#[derive(Debug, Clone)]
pub struct RotationPool {
    catalog: ImageCatalog,
    order: Vec<usize>,
    cursor: usize,
}

impl RotationPool {
    pub fn new(catalog: ImageCatalog) -> Self {
        Self {
            catalog,
            order: Vec::new(),
            cursor: 0,
        }
    }

    pub fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    /// Draw the next name, reshuffling when the current cycle is exhausted.
    ///
    /// Returns `None` only for an empty catalog.
    pub fn next_name(&mut self) -> Option<String> {
        if self.catalog.is_empty() {
            return None;
        }
        if self.cursor >= self.order.len() {
            self.order = shuffled_indices(self.catalog.len(), &mut rand::rng());
            self.cursor = 0;
        }
        let idx = self.order[self.cursor];
        self.cursor += 1;
        Some(self.catalog.names()[idx].clone())
    }

    /// Up to `n` names that the current cycle will serve next, without
    /// advancing the cursor. Does not look past the cycle boundary.
    pub fn upcoming(&self, n: usize) -> Vec<String> {
        self.order[self.cursor..]
            .iter()
            .take(n)
            .map(|&idx| self.catalog.names()[idx].clone())
            .collect()
    }

    /// Names left in the current cycle.
    pub fn remaining(&self) -> usize {
        self.order.len().saturating_sub(self.cursor)
    }
}

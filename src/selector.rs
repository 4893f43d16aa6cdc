use std::collections::HashSet;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use tracing::info;

use crate::error::{BotError, Result};
use crate::feed::Product;
use crate::tracker::TrackingState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// `index = (last_index + 1) mod N`.
    #[default]
    Rotate,
    /// Uniform draw among products not yet posted in the current cycle.
    RandomCycle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub product_id: String,
}

/// Picks the next product and returns it with the state to persist once
/// the post went out. `state` itself is never mutated.
pub fn select<R: Rng + ?Sized>(
    policy: SelectionPolicy,
    state: &TrackingState,
    products: &[Product],
    rng: &mut R,
) -> Result<(Selection, TrackingState)> {
    match policy {
        SelectionPolicy::Rotate => select_rotating(state, products),
        SelectionPolicy::RandomCycle => select_random(state, products, rng),
    }
}

pub fn select_rotating(
    state: &TrackingState,
    products: &[Product],
) -> Result<(Selection, TrackingState)> {
    if products.is_empty() {
        return Err(BotError::EmptyFeed);
    }

    let index = state.last_index.map_or(0, |last| (last + 1) % products.len());
    let selection = Selection {
        index,
        product_id: products[index].sku.clone(),
    };
    Ok((selection, state.clone()))
}

pub fn select_random<R: Rng + ?Sized>(
    state: &TrackingState,
    products: &[Product],
    rng: &mut R,
) -> Result<(Selection, TrackingState)> {
    if products.is_empty() {
        return Err(BotError::EmptyFeed);
    }

    let mut next = state.clone();
    let posted: HashSet<&str> = state.posted_products.iter().map(String::as_str).collect();
    let mut candidates: Vec<usize> = (0..products.len())
        .filter(|&i| !posted.contains(products[i].sku.as_str()))
        .collect();

    if candidates.is_empty() {
        next.posted_products.clear();
        next.cycle_count += 1;
        info!(cycle = next.cycle_count, "every product posted, starting a new cycle");
        candidates = (0..products.len()).collect();
    }

    let index = *candidates.choose(rng).ok_or(BotError::EmptyFeed)?;
    let selection = Selection {
        index,
        product_id: products[index].sku.clone(),
    };
    Ok((selection, next))
}

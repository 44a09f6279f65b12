// Strategies for picking which free car backs a confirmed quote

use rand::Rng;

pub trait CarSelector: Send + Sync + 'static {
    // Returns an index into `candidates`; only called with a non-empty slice
    fn select(&self, candidates: &[u32]) -> usize;
}

// Uniform random choice among the free cars
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCarSelector;

impl CarSelector for RandomCarSelector {
    fn select(&self, candidates: &[u32]) -> usize {
        rand::thread_rng().gen_range(0..candidates.len())
    }
}

// Always picks the car with the lowest id, for reproducible tests
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstCarSelector;

impl CarSelector for FirstCarSelector {
    fn select(&self, candidates: &[u32]) -> usize {
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, id)| **id)
            .map_or(0, |(index, _)| index)
    }
}

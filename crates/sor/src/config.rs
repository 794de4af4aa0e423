use crate::error::RouterError;

/// Hard cap on the number of disjoint sub-routes a plan may be split into.
/// The split search is combinatorial; four-way splits and beyond are not
/// implemented.
pub const MAX_SUPPORTED_SPLITS: u32 = 3;

/// Tunables for a single routing request.
///
/// All fields have defaults; construct with `RoutingConfig::default()` and
/// override selectively. `validate` must pass before the config is used.
#[derive(Clone, Debug)]
pub struct RoutingConfig {
    /// Top pools by TVL regardless of the tokens involved.
    pub top_n: usize,
    /// Top pools by TVL touching the input token, and the same count
    /// touching the output token.
    pub top_n_token_in_out: usize,
    /// Second-hop pools considered per first-hop counterparty token.
    pub top_n_second_hop: usize,
    /// Maximum pools chained in a single route.
    pub max_swaps_per_path: usize,
    /// Maximum number of disjoint sub-routes in a plan. Must be <= 3.
    pub max_splits: u32,
    /// Granularity of the amount grid, in percent. Must divide 100.
    pub distribution_percent: u32,
    /// Number of quote calls packed into one aggregator multicall.
    pub multicall_chunk_size: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            top_n: 4,
            top_n_token_in_out: 4,
            top_n_second_hop: 2,
            max_swaps_per_path: 3,
            max_splits: 3,
            distribution_percent: 5,
            multicall_chunk_size: 50,
        }
    }
}

impl RoutingConfig {
    pub fn validate(&self) -> Result<(), RouterError> {
        if self.max_splits > MAX_SUPPORTED_SPLITS {
            return Err(RouterError::ConfigInvalid(format!(
                "max_splits {} exceeds supported maximum of {}",
                self.max_splits, MAX_SUPPORTED_SPLITS
            )));
        }
        if self.max_splits == 0 {
            return Err(RouterError::ConfigInvalid("max_splits must be at least 1".into()));
        }
        if self.distribution_percent == 0 || 100 % self.distribution_percent != 0 {
            return Err(RouterError::ConfigInvalid(format!(
                "distribution_percent {} does not divide 100",
                self.distribution_percent
            )));
        }
        if self.max_swaps_per_path == 0 {
            return Err(RouterError::ConfigInvalid("max_swaps_per_path must be at least 1".into()));
        }
        if self.multicall_chunk_size == 0 {
            return Err(RouterError::ConfigInvalid("multicall_chunk_size must be at least 1".into()));
        }
        Ok(())
    }
}

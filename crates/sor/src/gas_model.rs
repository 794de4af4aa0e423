use alloy_primitives::{U256, U512};
use tracing::{debug, trace};

use crate::pool::Pool;
use crate::pool_provider::PoolAccessor;
use crate::routes::Route;
use crate::subgraph::SubgraphPool;
use crate::token::{wrapped_native, Token};

// Heuristic gas accounting for a concentrated-liquidity swap: a flat base,
// a per-pool overhead, and a per-initialized-tick crossing cost.
pub const BASE_SWAP_COST: u64 = 2_000;
pub const COST_PER_HOP: u64 = 80_000;
pub const COST_PER_INIT_TICK: u64 = 31_000;

#[derive(Clone, Debug)]
pub struct GasCostEstimate {
    /// Total gas the route is expected to burn.
    pub gas_use: U256,
    /// The same cost denominated in the wrapped native token (wei).
    pub gas_cost_in_token: U256,
    /// The cost priced into the quote token through the bridge pool; zero
    /// when no bridge pool is available.
    pub gas_cost_in_quote_token: U256,
}

/// Prices route gas into the quote token. Built once per request; the
/// wrapped-native/quote-token bridge pool is the selector's bridge slice,
/// resolved against the hydrated candidate set.
pub struct GasModel {
    gas_price_wei: U256,
    quote_token: Token,
    native_token: Option<Token>,
    bridge_pool: Option<Pool>,
}

impl GasModel {
    /// `bridge_candidates` is the selector's native/quote bridge slice in
    /// TVL order; the first candidate that survived hydration wins.
    pub fn new(
        chain_id: u64,
        gas_price_wei: U256,
        bridge_candidates: &[SubgraphPool],
        accessor: &PoolAccessor,
        quote_token: Token,
    ) -> Self {
        let native_token = wrapped_native(chain_id);
        let bridge_pool = bridge_candidates
            .iter()
            .filter_map(|candidate| candidate.pool_address())
            .find_map(|address| accessor.get_pool_by_address(address).cloned());

        match (&bridge_pool, &native_token) {
            (Some(pool), _) => trace!(bridge = %pool, "Gas model bridge pool selected"),
            (None, Some(native)) if *native != quote_token => debug!(
                quote_token = %quote_token,
                "No native/quote bridge pool; route gas will be costed at zero"
            ),
            _ => {}
        }

        Self { gas_price_wei, quote_token, native_token, bridge_pool }
    }

    pub fn gas_price_wei(&self) -> U256 {
        self.gas_price_wei
    }

    /// Cost a route. `ticks_crossed` is the quoter-simulated number of
    /// initialized ticks crossed across all hops.
    pub fn estimate_gas_cost(&self, route: &Route, ticks_crossed: u32) -> GasCostEstimate {
        let hops = route.pools.len() as u64;
        let gas_use = U256::from(
            BASE_SWAP_COST + COST_PER_HOP * hops + COST_PER_INIT_TICK * u64::from(ticks_crossed),
        );
        let gas_cost_in_token = gas_use * self.gas_price_wei;

        let gas_cost_in_quote_token = if self.native_token.as_ref() == Some(&self.quote_token) {
            gas_cost_in_token
        } else {
            match (&self.bridge_pool, &self.native_token) {
                (Some(pool), Some(native)) => price_through_pool(gas_cost_in_token, pool, native),
                _ => U256::ZERO,
            }
        };

        GasCostEstimate { gas_use, gas_cost_in_token, gas_cost_in_quote_token }
    }
}

/// Convert an amount of `native` into the pool's other token at the pool's
/// current sqrt price. The ratio token1/token0 is (sqrtPriceX96 / 2^96)^2,
/// evaluated in 512-bit intermediates.
fn price_through_pool(amount: U256, pool: &Pool, native: &Token) -> U256 {
    if pool.sqrt_price_x96.is_zero() {
        return U256::ZERO;
    }
    let sqrt_price = U512::from(pool.sqrt_price_x96);
    let ratio = sqrt_price * sqrt_price;
    let amount = U512::from(amount);

    let priced = if pool.token0 == *native {
        (amount * ratio) >> 192
    } else {
        (amount << 192) / ratio
    };
    if priced > U512::from(U256::MAX) {
        U256::MAX
    } else {
        U256::from(priced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subgraph::SubgraphToken;
    use alloy_primitives::Address;
    use std::collections::HashMap;

    fn token(byte: u8, symbol: &str) -> Token {
        Token::new(1, Address::from([byte; 20]), symbol, 18)
    }

    fn weth() -> Token {
        wrapped_native(1).unwrap()
    }

    fn accessor_with(pools: Vec<Pool>) -> PoolAccessor {
        let map: HashMap<_, _> = pools.into_iter().map(|p| (p.address, p)).collect();
        PoolAccessor::from_pools(map)
    }

    /// The selector's bridge slice entry for a hydrated pool.
    fn candidate(pool: &Pool) -> SubgraphPool {
        SubgraphPool {
            id: format!("{:?}", pool.address),
            token0: SubgraphToken {
                id: format!("{:?}", pool.token0.address),
                symbol: pool.token0.symbol.clone(),
            },
            token1: SubgraphToken {
                id: format!("{:?}", pool.token1.address),
                symbol: pool.token1.symbol.clone(),
            },
            fee_tier: pool.fee.to_string(),
            total_value_locked_usd: "0".into(),
        }
    }

    fn one_hop_route(pool: Pool) -> Route {
        let input = pool.token0.clone();
        let output = pool.token1.clone();
        Route::new(vec![pool], input, output).unwrap()
    }

    #[test]
    fn gas_use_accounts_for_hops_and_ticks() {
        let quote = token(0x02, "USDC");
        let bridge =
            Pool::new(weth(), quote.clone(), 500, 1_000_000, U256::from(1u128) << 96, 0);
        let model = GasModel::new(
            1,
            U256::from(10u64),
            &[candidate(&bridge)],
            &accessor_with(vec![bridge.clone()]),
            quote,
        );

        let route = one_hop_route(bridge);
        let estimate = model.estimate_gas_cost(&route, 3);
        let expected = BASE_SWAP_COST + COST_PER_HOP + 3 * COST_PER_INIT_TICK;
        assert_eq!(estimate.gas_use, U256::from(expected));
        assert_eq!(estimate.gas_cost_in_token, U256::from(expected * 10));
    }

    #[test]
    fn unit_price_bridge_converts_one_to_one() {
        let quote = token(0x02, "USDC");
        let bridge =
            Pool::new(weth(), quote.clone(), 500, 1_000_000, U256::from(1u128) << 96, 0);
        let model = GasModel::new(
            1,
            U256::from(100u64),
            &[candidate(&bridge)],
            &accessor_with(vec![bridge.clone()]),
            quote,
        );

        let estimate = model.estimate_gas_cost(&one_hop_route(bridge), 0);
        assert_eq!(estimate.gas_cost_in_quote_token, estimate.gas_cost_in_token);
    }

    #[test]
    fn bridge_price_direction_follows_token_order() {
        let quote = token(0x02, "USDC");
        // sqrtPrice = 2 * 2^96 => token1/token0 ratio of 4.
        let sqrt_price = U256::from(2u128) << 96;
        let bridge = Pool::new(weth(), quote.clone(), 500, 1_000_000, sqrt_price, 0);
        let model = GasModel::new(
            1,
            U256::from(1u64),
            &[candidate(&bridge)],
            &accessor_with(vec![bridge.clone()]),
            quote.clone(),
        );

        let estimate = model.estimate_gas_cost(&one_hop_route(bridge.clone()), 0);
        let native_is_token0 = bridge.token0 == weth();
        if native_is_token0 {
            assert_eq!(estimate.gas_cost_in_quote_token, estimate.gas_cost_in_token * U256::from(4u8));
        } else {
            assert_eq!(estimate.gas_cost_in_quote_token, estimate.gas_cost_in_token / U256::from(4u8));
        }
    }

    #[test]
    fn bridge_follows_slice_order_not_pool_depth() {
        let quote = token(0x02, "USDC");
        // Two bridge pools: the slice leader prices 1:1, the deeper pool
        // behind it prices 4:1. Slice order must decide.
        let leader =
            Pool::new(weth(), quote.clone(), 3000, 1_000, U256::from(1u128) << 96, 0);
        let deeper =
            Pool::new(weth(), quote.clone(), 500, 1_000_000, U256::from(2u128) << 96, 0);
        let model = GasModel::new(
            1,
            U256::from(100u64),
            &[candidate(&leader), candidate(&deeper)],
            &accessor_with(vec![leader.clone(), deeper]),
            quote,
        );

        let estimate = model.estimate_gas_cost(&one_hop_route(leader), 0);
        assert_eq!(estimate.gas_cost_in_quote_token, estimate.gas_cost_in_token);
    }

    #[test]
    fn bridge_candidate_that_failed_hydration_is_skipped() {
        let quote = token(0x02, "USDC");
        let missing =
            Pool::new(weth(), quote.clone(), 3000, 1_000, U256::from(1u128) << 96, 0);
        let hydrated =
            Pool::new(weth(), quote.clone(), 500, 1_000_000, U256::from(1u128) << 96, 0);
        // The slice leader never hydrated; only the runner-up is live.
        let model = GasModel::new(
            1,
            U256::from(100u64),
            &[candidate(&missing), candidate(&hydrated)],
            &accessor_with(vec![hydrated.clone()]),
            quote,
        );

        let estimate = model.estimate_gas_cost(&one_hop_route(hydrated), 0);
        assert_eq!(estimate.gas_cost_in_quote_token, estimate.gas_cost_in_token);
    }

    #[test]
    fn missing_bridge_degrades_to_zero_cost_but_keeps_estimate() {
        let quote = token(0x02, "USDC");
        let other = token(0x03, "DAI");
        let unrelated =
            Pool::new(other.clone(), quote.clone(), 500, 1, U256::from(1u128) << 96, 0);
        let model = GasModel::new(
            1,
            U256::from(50u64),
            &[],
            &accessor_with(vec![unrelated.clone()]),
            quote,
        );

        let estimate = model.estimate_gas_cost(&one_hop_route(unrelated), 2);
        assert_eq!(estimate.gas_cost_in_quote_token, U256::ZERO);
        assert!(estimate.gas_use > U256::ZERO);
        assert!(estimate.gas_cost_in_token > U256::ZERO);
    }

    #[test]
    fn native_quote_token_needs_no_bridge() {
        let model = GasModel::new(1, U256::from(7u64), &[], &accessor_with(vec![]), weth());
        let pool = Pool::new(weth(), token(0x02, "USDC"), 500, 1, U256::from(1u128) << 96, 0);
        let estimate = model.estimate_gas_cost(&one_hop_route(pool), 0);
        assert_eq!(estimate.gas_cost_in_quote_token, estimate.gas_cost_in_token);
    }
}

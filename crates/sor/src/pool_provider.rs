use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall, SolValue};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::RouterError;
use crate::multicall::{CallSpec, Multicall};
use crate::pool::{canonical_order, compute_pool_address, Pool};
use crate::token::Token;

// Pool state getters. Return types wider than the contract's declared
// widths decode the same words without extra narrowing conversions.
sol! {
    function liquidity() external view returns (uint128);

    function slot0()
        external
        view
        returns (
            uint256 sqrtPriceX96,
            int32 tick,
            uint16 observationIndex,
            uint16 observationCardinality,
            uint16 observationCardinalityNext,
            uint8 feeProtocol,
            bool unlocked
        );
}

const POOL_STATE_GAS_LIMIT: u64 = 120_000;

/// Live pools hydrated for one request, keyed by deterministic address.
#[derive(Clone, Debug, Default)]
pub struct PoolAccessor {
    by_address: HashMap<Address, Pool>,
}

impl PoolAccessor {
    /// Build an accessor from pre-hydrated pools.
    pub fn from_pools(by_address: HashMap<Address, Pool>) -> Self {
        Self { by_address }
    }

    /// Orientation-insensitive lookup: `get_pool(a, b, fee)` and
    /// `get_pool(b, a, fee)` resolve to the same pool.
    pub fn get_pool(&self, token_a: &Token, token_b: &Token, fee: u32) -> Option<&Pool> {
        let (token0, token1) = canonical_order(token_a.clone(), token_b.clone());
        let address = compute_pool_address(&token0.address, &token1.address, fee);
        self.by_address.get(&address)
    }

    pub fn get_pool_by_address(&self, address: Address) -> Option<&Pool> {
        self.by_address.get(&address)
    }

    pub fn all_pools(&self) -> impl Iterator<Item = &Pool> {
        self.by_address.values()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

/// Resolves (tokenA, tokenB, fee) tuples into live pool state via one
/// aggregated call. Pools that fail to hydrate are omitted; callers must
/// tolerate missing pools.
pub struct PoolProvider {
    multicall: Arc<dyn Multicall>,
}

impl PoolProvider {
    pub fn new(multicall: Arc<dyn Multicall>) -> Self {
        Self { multicall }
    }

    pub async fn get_pools(
        &self,
        requests: &[(Token, Token, u32)],
        block: Option<u64>,
    ) -> Result<PoolAccessor, RouterError> {
        // Canonicalise and deduplicate up front; the same pool is commonly
        // requested from several selection slices.
        let mut wanted: Vec<(Address, Token, Token, u32)> = Vec::with_capacity(requests.len());
        let mut seen: HashSet<Address> = HashSet::with_capacity(requests.len());
        for (token_a, token_b, fee) in requests.iter().cloned() {
            let (token0, token1) = canonical_order(token_a, token_b);
            let address = compute_pool_address(&token0.address, &token1.address, fee);
            if seen.insert(address) {
                wanted.push((address, token0, token1, fee));
            }
        }

        if wanted.is_empty() {
            return Ok(PoolAccessor::default());
        }

        let calls: Vec<CallSpec> = wanted
            .iter()
            .flat_map(|(address, _, _, _)| {
                [
                    CallSpec {
                        target: *address,
                        gas_limit: POOL_STATE_GAS_LIMIT,
                        calldata: liquidityCall {}.abi_encode().into(),
                    },
                    CallSpec {
                        target: *address,
                        gas_limit: POOL_STATE_GAS_LIMIT,
                        calldata: slot0Call {}.abi_encode().into(),
                    },
                ]
            })
            .collect();

        let outcome = self.multicall.aggregate(calls, block).await?;
        if outcome.results.len() != wanted.len() * 2 {
            return Err(RouterError::Abi(format!(
                "pool state batch returned {} results for {} calls",
                outcome.results.len(),
                wanted.len() * 2
            )));
        }

        let mut by_address = HashMap::with_capacity(wanted.len());
        for (i, (address, token0, token1, fee)) in wanted.into_iter().enumerate() {
            let liquidity_result = &outcome.results[i * 2];
            let slot0_result = &outcome.results[i * 2 + 1];
            if !liquidity_result.success || !slot0_result.success {
                debug!(pool = %address, "Pool state call failed, omitting pool");
                continue;
            }

            let liquidity = match liquidityCall::abi_decode_returns(&liquidity_result.return_data) {
                Ok(value) => value,
                Err(e) => {
                    debug!(pool = %address, error = %e, "Pool liquidity undecodable, omitting pool");
                    continue;
                }
            };
            let slot0 = match slot0Call::abi_decode_returns(&slot0_result.return_data) {
                Ok(value) => value,
                Err(e) => {
                    debug!(pool = %address, error = %e, "Pool slot0 undecodable, omitting pool");
                    continue;
                }
            };

            trace!(
                pool = %address,
                liquidity,
                sqrt_price = %slot0.sqrtPriceX96,
                tick = slot0.tick,
                "Hydrated pool"
            );
            by_address.insert(
                address,
                Pool {
                    token0,
                    token1,
                    fee,
                    liquidity,
                    sqrt_price_x96: slot0.sqrtPriceX96,
                    tick: slot0.tick,
                    address,
                },
            );
        }

        debug!(hydrated = by_address.len(), "Pool hydration complete");
        Ok(PoolAccessor { by_address })
    }
}

/// Encode a successful `liquidity()` return payload. Shared with tests and
/// mock chains.
pub fn encode_liquidity_return(liquidity: u128) -> Vec<u8> {
    liquidity.abi_encode()
}

/// Encode a successful `slot0()` return payload.
pub fn encode_slot0_return(sqrt_price_x96: U256, tick: i32) -> Vec<u8> {
    slot0Call::abi_encode_returns(&slot0Return {
        sqrtPriceX96: sqrt_price_x96,
        tick,
        observationIndex: 0u16,
        observationCardinality: 0u16,
        observationCardinalityNext: 0u16,
        feeProtocol: 0u8,
        unlocked: true,
    })
}

/// Selector accessors for mock chains that dispatch on calldata.
pub fn liquidity_selector() -> [u8; 4] {
    liquidityCall::SELECTOR
}

pub fn slot0_selector() -> [u8; 4] {
    slot0Call::SELECTOR
}

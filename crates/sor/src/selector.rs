use alloy_primitives::Address;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::config::RoutingConfig;
use crate::error::RouterError;
use crate::pool_provider::{PoolAccessor, PoolProvider};
use crate::routes::TradeType;
use crate::subgraph::{SubgraphPool, SubgraphProvider};
use crate::token::{wrapped_native, Token, TokenRegistry};

/// The seven disjoint TVL slices that make up the candidate set, kept for
/// observability and for the gas model's bridge-pool lookup.
#[derive(Clone, Debug, Default)]
pub struct CandidatePools {
    pub top_direct_swap: Vec<SubgraphPool>,
    pub top_eth_quote_token: Vec<SubgraphPool>,
    pub top_by_tvl: Vec<SubgraphPool>,
    pub top_by_tvl_using_token_in: Vec<SubgraphPool>,
    pub top_by_tvl_using_token_out: Vec<SubgraphPool>,
    pub top_by_tvl_token_in_second_hops: Vec<SubgraphPool>,
    pub top_by_tvl_token_out_second_hops: Vec<SubgraphPool>,
}

impl CandidatePools {
    fn all(&self) -> impl Iterator<Item = &SubgraphPool> {
        self.top_direct_swap
            .iter()
            .chain(&self.top_eth_quote_token)
            .chain(&self.top_by_tvl)
            .chain(&self.top_by_tvl_using_token_in)
            .chain(&self.top_by_tvl_using_token_out)
            .chain(&self.top_by_tvl_token_in_second_hops)
            .chain(&self.top_by_tvl_token_out_second_hops)
    }
}

/// A subgraph pool with its fields parsed once for slicing.
#[derive(Clone, Debug)]
struct RankedPool {
    raw: SubgraphPool,
    id: Address,
    token0: Address,
    token1: Address,
    fee: u32,
    tvl: f64,
}

/// Filter and rank the pool universe into a bounded candidate set, then
/// hydrate it into live pools.
#[allow(clippy::too_many_arguments)]
pub async fn select_candidate_pools(
    token_in: &Token,
    token_out: &Token,
    trade_type: TradeType,
    subgraph: &dyn SubgraphProvider,
    pool_provider: &PoolProvider,
    registry: &TokenRegistry,
    cfg: &RoutingConfig,
    block: Option<u64>,
) -> Result<(PoolAccessor, CandidatePools), RouterError> {
    let universe = subgraph.pools().await?;
    let universe_size = universe.len();

    // Keep pools whose both tokens are listed and whose fields parse; rank
    // by TVL descending.
    let mut ranked: Vec<RankedPool> = universe
        .into_iter()
        .filter_map(|raw| {
            let id = raw.pool_address()?;
            let token0 = raw.token0_address()?;
            let token1 = raw.token1_address()?;
            let fee = raw.fee()?;
            if !registry.contains(token0) || !registry.contains(token1) {
                return None;
            }
            let tvl = raw.tvl_usd();
            Some(RankedPool { raw, id, token0, token1, fee, tvl })
        })
        .collect();
    ranked.sort_by(|a, b| b.tvl.partial_cmp(&a.tvl).unwrap_or(Ordering::Equal));

    debug!(
        universe = universe_size,
        listed = ranked.len(),
        "Filtered pool universe against token registry"
    );

    let mut chosen: HashSet<Address> = HashSet::new();
    let in_addr = token_in.address;
    let out_addr = token_out.address;

    // Slice 1: direct pools on the traded pair.
    let top_direct_swap = take(&ranked, &chosen, 2, |p| {
        (p.token0 == in_addr && p.token1 == out_addr) || (p.token0 == out_addr && p.token1 == in_addr)
    });
    mark(&mut chosen, &top_direct_swap);

    // Slice 2: wrapped-native/quote-token bridge pools, used to price gas.
    // The exact-in side matches on addresses, the exact-out side on
    // symbols; the divergence is long-standing observed behavior and is
    // kept as is.
    let native = wrapped_native(token_in.chain_id);
    let top_eth_quote_token = match (&native, trade_type) {
        (Some(weth), TradeType::ExactInput) => take(&ranked, &chosen, 2, |p| {
            (p.token0 == weth.address && p.token1 == out_addr)
                || (p.token1 == weth.address && p.token0 == out_addr)
        }),
        (Some(weth), TradeType::ExactOutput) => take(&ranked, &chosen, 2, |p| {
            (p.raw.token0.symbol == weth.symbol && p.raw.token1.symbol == token_in.symbol)
                || (p.raw.token1.symbol == weth.symbol && p.raw.token0.symbol == token_in.symbol)
        }),
        (None, _) => Vec::new(),
    };
    mark(&mut chosen, &top_eth_quote_token);

    // Slice 3: top pools overall.
    let top_by_tvl = take(&ranked, &chosen, cfg.top_n, |_| true);
    mark(&mut chosen, &top_by_tvl);

    // Slices 4 and 5: top pools touching each endpoint.
    let top_by_tvl_using_token_in = take(&ranked, &chosen, cfg.top_n_token_in_out, |p| {
        p.token0 == in_addr || p.token1 == in_addr
    });
    mark(&mut chosen, &top_by_tvl_using_token_in);

    let top_by_tvl_using_token_out = take(&ranked, &chosen, cfg.top_n_token_in_out, |p| {
        p.token0 == out_addr || p.token1 == out_addr
    });
    mark(&mut chosen, &top_by_tvl_using_token_out);

    // Slice 6: second hops one step beyond the tokenIn pools.
    let second_hops_in: Vec<Address> = top_by_tvl_using_token_in
        .iter()
        .map(|p| if p.token0 == in_addr { p.token1 } else { p.token0 })
        .collect();
    let top_by_tvl_token_in_second_hops =
        second_hop_slice(&ranked, &chosen, &second_hops_in, cfg.top_n_second_hop);
    mark(&mut chosen, &top_by_tvl_token_in_second_hops);

    // Slice 7: second hops on the tokenOut side. Seeded from the tokenIn
    // pools (not the tokenOut pools) with the counterparty taken relative
    // to tokenOut; observed behavior, kept as is.
    let second_hops_out: Vec<Address> = top_by_tvl_using_token_in
        .iter()
        .map(|p| if p.token0 == out_addr { p.token1 } else { p.token0 })
        .collect();
    let top_by_tvl_token_out_second_hops =
        second_hop_slice(&ranked, &chosen, &second_hops_out, cfg.top_n_second_hop);
    mark(&mut chosen, &top_by_tvl_token_out_second_hops);

    let selection = CandidatePools {
        top_direct_swap: strip(top_direct_swap),
        top_eth_quote_token: strip(top_eth_quote_token),
        top_by_tvl: strip(top_by_tvl),
        top_by_tvl_using_token_in: strip(top_by_tvl_using_token_in),
        top_by_tvl_using_token_out: strip(top_by_tvl_using_token_out),
        top_by_tvl_token_in_second_hops: strip(top_by_tvl_token_in_second_hops),
        top_by_tvl_token_out_second_hops: strip(top_by_tvl_token_out_second_hops),
    };

    debug!(
        direct = selection.top_direct_swap.len(),
        eth_quote = selection.top_eth_quote_token.len(),
        top_tvl = selection.top_by_tvl.len(),
        token_in = selection.top_by_tvl_using_token_in.len(),
        token_out = selection.top_by_tvl_using_token_out.len(),
        second_hops_in = selection.top_by_tvl_token_in_second_hops.len(),
        second_hops_out = selection.top_by_tvl_token_out_second_hops.len(),
        "Candidate pool slices selected"
    );

    // Union, resolve to tokens, hydrate.
    let mut requested = HashSet::new();
    let mut requests: Vec<(Token, Token, u32)> = Vec::new();
    for pool in selection.all() {
        let (Some(id), Some(t0), Some(t1), Some(fee)) = (
            pool.pool_address(),
            pool.token0_address(),
            pool.token1_address(),
            pool.fee(),
        ) else {
            continue;
        };
        if !requested.insert(id) {
            continue;
        }
        let (Some(token0), Some(token1)) = (registry.by_address(t0), registry.by_address(t1)) else {
            continue;
        };
        requests.push((token0.clone(), token1.clone(), fee));
    }

    trace!(candidates = requests.len(), "Hydrating candidate pools");
    let accessor = pool_provider.get_pools(&requests, block).await?;

    Ok((accessor, selection))
}

/// The top `n` not-yet-chosen pools satisfying `pred`, in TVL order.
fn take(
    ranked: &[RankedPool],
    chosen: &HashSet<Address>,
    n: usize,
    pred: impl Fn(&RankedPool) -> bool,
) -> Vec<RankedPool> {
    ranked.iter().filter(|p| !chosen.contains(&p.id) && pred(p)).take(n).cloned().collect()
}

fn mark(chosen: &mut HashSet<Address>, slice: &[RankedPool]) {
    chosen.extend(slice.iter().map(|p| p.id));
}

/// Per seed token: the top `n` unchosen pools touching it; then the union
/// is deduplicated, re-ranked by TVL and truncated to `n` again.
fn second_hop_slice(
    ranked: &[RankedPool],
    chosen: &HashSet<Address>,
    seeds: &[Address],
    n: usize,
) -> Vec<RankedPool> {
    let mut picked: Vec<RankedPool> = Vec::new();
    let mut picked_ids = HashSet::new();
    for seed in seeds {
        let per_seed = ranked
            .iter()
            .filter(|p| !chosen.contains(&p.id) && (p.token0 == *seed || p.token1 == *seed))
            .take(n);
        for pool in per_seed {
            if picked_ids.insert(pool.id) {
                picked.push(pool.clone());
            }
        }
    }
    picked.sort_by(|a, b| b.tvl.partial_cmp(&a.tvl).unwrap_or(Ordering::Equal));
    picked.truncate(n);
    picked
}

fn strip(slice: Vec<RankedPool>) -> Vec<SubgraphPool> {
    slice.into_iter().map(|p| p.raw).collect()
}

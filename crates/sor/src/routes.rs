use alloy_primitives::{Address, Bytes};
use std::collections::HashSet;
use std::fmt;

use crate::pool::Pool;
use crate::token::Token;

/// Which side of the trade the user fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TradeType {
    ExactInput,
    ExactOutput,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::ExactInput => write!(f, "exactIn"),
            TradeType::ExactOutput => write!(f, "exactOut"),
        }
    }
}

/// An ordered chain of pools from `input` to `output`. Consecutive pools
/// share a token and no pool repeats.
#[derive(Clone, Debug)]
pub struct Route {
    pub pools: Vec<Pool>,
    pub token_path: Vec<Token>,
    pub input: Token,
    pub output: Token,
}

impl Route {
    /// Builds the token path by walking the pool chain. Returns None if the
    /// pools do not chain from `input`.
    pub fn new(pools: Vec<Pool>, input: Token, output: Token) -> Option<Self> {
        if pools.is_empty() {
            return None;
        }
        let mut token_path = Vec::with_capacity(pools.len() + 1);
        token_path.push(input.clone());
        let mut current = input.clone();
        for pool in &pools {
            let next = pool.other_token(&current)?.clone();
            token_path.push(next.clone());
            current = next;
        }
        Some(Self { pools, token_path, input, output })
    }

    /// The quoter's packed path: token ++ fee (3 bytes) ++ token ++ ...
    /// Exact-output paths are encoded back to front.
    pub fn encode_path(&self, trade_type: TradeType) -> Bytes {
        let mut tokens: Vec<&Token> = self.token_path.iter().collect();
        let mut fees: Vec<u32> = self.pools.iter().map(|p| p.fee).collect();
        if trade_type == TradeType::ExactOutput {
            tokens.reverse();
            fees.reverse();
        }

        let mut encoded = Vec::with_capacity(tokens.len() * 20 + fees.len() * 3);
        for (i, token) in tokens.iter().enumerate() {
            encoded.extend_from_slice(token.address.as_slice());
            if i < fees.len() {
                encoded.extend_from_slice(&fees[i].to_be_bytes()[1..]);
            }
        }
        encoded.into()
    }

    pub fn pool_addresses(&self) -> HashSet<Address> {
        self.pools.iter().map(|p| p.address).collect()
    }

    /// Human-readable token chain, e.g. `WETH -> USDC -> DAI`.
    pub fn path_string(&self) -> String {
        self.token_path.iter().map(|t| t.symbol.as_str()).collect::<Vec<_>>().join(" -> ")
    }
}

/// Word-array bitset over pool indices; candidate sets are small but not
/// bounded by a single machine word.
struct PoolBitset {
    words: Vec<u64>,
}

impl PoolBitset {
    fn new(len: usize) -> Self {
        Self { words: vec![0; len.div_ceil(64)] }
    }

    fn contains(&self, index: usize) -> bool {
        self.words[index / 64] & (1 << (index % 64)) != 0
    }

    fn insert(&mut self, index: usize) {
        self.words[index / 64] |= 1 << (index % 64);
    }

    fn remove(&mut self, index: usize) {
        self.words[index / 64] &= !(1 << (index % 64));
    }
}

/// All simple paths from `token_in` to `token_out` over `pools`, at most
/// `max_hops` pools long. Emission order is not meaningful.
pub fn compute_all_routes(
    token_in: &Token,
    token_out: &Token,
    pools: &[Pool],
    max_hops: usize,
) -> Vec<Route> {
    let mut routes = Vec::new();
    let mut used = PoolBitset::new(pools.len());
    let mut current = Vec::new();
    dfs(pools, token_in, token_out, max_hops, token_in, &mut current, &mut used, &mut routes);
    routes
}

#[allow(clippy::too_many_arguments)]
fn dfs(
    pools: &[Pool],
    token_in: &Token,
    token_out: &Token,
    max_hops: usize,
    previous_token_out: &Token,
    current: &mut Vec<usize>,
    used: &mut PoolBitset,
    routes: &mut Vec<Route>,
) {
    if current.len() > max_hops {
        return;
    }

    // A branch terminates the moment its last pool touches the output
    // token; the chain endpoint is that token by construction.
    if let Some(&last) = current.last() {
        if pools[last].involves(token_out) {
            let chain = current.iter().map(|&i| pools[i].clone()).collect();
            if let Some(route) = Route::new(chain, token_in.clone(), token_out.clone()) {
                routes.push(route);
            }
            return;
        }
    }

    for (i, pool) in pools.iter().enumerate() {
        if used.contains(i) || !pool.involves(previous_token_out) {
            continue;
        }
        let Some(next_token) = pool.other_token(previous_token_out) else {
            continue;
        };
        let next_token = next_token.clone();

        used.insert(i);
        current.push(i);
        dfs(pools, token_in, token_out, max_hops, &next_token, current, used, routes);
        current.pop();
        used.remove(i);
    }
}

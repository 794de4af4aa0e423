use alloy_primitives::{Address, I256, U256};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, trace};

use crate::config::{RoutingConfig, MAX_SUPPORTED_SPLITS};
use crate::error::RouterError;
use crate::gas_model::GasModel;
use crate::quoter::AmountQuote;
use crate::routes::{Route, TradeType};
use crate::token::Token;

/// A quoted route at one percent slice, with its gas-adjusted value. The
/// adjusted quote is signed; a route whose gas cost exceeds its output is
/// worth less than nothing and must order accordingly.
#[derive(Clone, Debug)]
pub struct RouteWithValidQuote {
    pub route: Route,
    pub amount: U256,
    pub raw_quote: U256,
    pub quote_adjusted_for_gas: I256,
    pub gas_estimate: U256,
    pub gas_cost_in_token: U256,
    pub gas_cost_in_quote_token: U256,
    pub percent: u32,
    pub quote_token: Token,
    pub trade_type: TradeType,
}

/// The routing result: one or more pool-disjoint routes whose percentages
/// sum to 100.
#[derive(Clone, Debug)]
pub struct SwapPlan {
    pub quote: U256,
    pub quote_gas_adjusted: I256,
    pub estimated_gas_used: U256,
    pub gas_price_wei: U256,
    pub block_number: u64,
    pub route_amounts: Vec<RouteWithValidQuote>,
}

fn signed(value: U256) -> I256 {
    I256::try_from(value).unwrap_or(I256::MAX)
}

/// Compose per-(route, percent) quotes into the best 1-, 2- or 3-way split
/// under the pool-disjointness constraint.
///
/// Returns `Ok(None)` when no route quoted successfully at 100%; splits are
/// never considered without an unsplit baseline.
pub fn find_best_swap(
    percents: &[u32],
    routes_with_quotes: &[(Route, Vec<AmountQuote>)],
    quote_token: &Token,
    trade_type: TradeType,
    gas_model: &GasModel,
    cfg: &RoutingConfig,
    block_number: u64,
) -> Result<Option<SwapPlan>, RouterError> {
    if cfg.max_splits > MAX_SUPPORTED_SPLITS {
        return Err(RouterError::ConfigInvalid(format!(
            "max_splits {} exceeds supported maximum of {}",
            cfg.max_splits, MAX_SUPPORTED_SPLITS
        )));
    }

    // Validate and bucket by percent. A slot missing any quoter field was
    // a failed simulation and is dropped here.
    let mut by_percent: HashMap<u32, Vec<RouteWithValidQuote>> = HashMap::new();
    let mut dropped = 0usize;
    for (route, quotes) in routes_with_quotes {
        for (quote, &percent) in quotes.iter().zip(percents) {
            if !quote.is_valid() {
                dropped += 1;
                continue;
            }
            let Some(raw_quote) = quote.quote else { continue };

            let cost = gas_model.estimate_gas_cost(route, quote.ticks_crossed());
            let quote_adjusted_for_gas = match trade_type {
                TradeType::ExactInput => {
                    signed(raw_quote).saturating_sub(signed(cost.gas_cost_in_quote_token))
                }
                TradeType::ExactOutput => {
                    signed(raw_quote).saturating_add(signed(cost.gas_cost_in_quote_token))
                }
            };

            by_percent.entry(percent).or_default().push(RouteWithValidQuote {
                route: route.clone(),
                amount: quote.amount,
                raw_quote,
                quote_adjusted_for_gas,
                gas_estimate: cost.gas_use,
                gas_cost_in_token: cost.gas_cost_in_token,
                gas_cost_in_quote_token: cost.gas_cost_in_quote_token,
                percent,
                quote_token: quote_token.clone(),
                trade_type,
            });
        }
    }
    trace!(dropped, buckets = by_percent.len(), "Validated and bucketed quotes");

    // Best-first within each bucket: larger adjusted output first for
    // exact-in, smaller adjusted input first for exact-out. The sort is
    // stable, so ties keep insertion order.
    for bucket in by_percent.values_mut() {
        match trade_type {
            TradeType::ExactInput => {
                bucket.sort_by(|a, b| b.quote_adjusted_for_gas.cmp(&a.quote_adjusted_for_gas))
            }
            TradeType::ExactOutput => {
                bucket.sort_by(|a, b| a.quote_adjusted_for_gas.cmp(&b.quote_adjusted_for_gas))
            }
        }
    }

    let better = |candidate: I256, incumbent: I256| match trade_type {
        TradeType::ExactInput => candidate > incumbent,
        TradeType::ExactOutput => candidate < incumbent,
    };

    // Baseline: the best unsplit route.
    let Some(full_bucket) = by_percent.get(&100) else {
        debug!("No valid 100% quote; no plan");
        return Ok(None);
    };
    let Some(baseline) = full_bucket.first() else {
        return Ok(None);
    };
    let mut best: Vec<RouteWithValidQuote> = vec![baseline.clone()];
    let mut best_quote = baseline.quote_adjusted_for_gas;

    // Two-way splits over the lower half of the grid; the complement
    // percent covers the upper half.
    let mut split_improved = false;
    if cfg.max_splits >= 2 {
        for &percent_a in &percents[..percents.len().div_ceil(2)] {
            let percent_b = 100 - percent_a;
            let (Some(bucket_a), Some(bucket_b)) =
                (by_percent.get(&percent_a), by_percent.get(&percent_b))
            else {
                continue;
            };
            let Some(a) = bucket_a.first() else { continue };
            let a_pools = a.route.pool_addresses();
            // Buckets are best-first, so the first disjoint candidate is
            // the best feasible partner.
            let Some(b) = bucket_b.iter().find(|c| disjoint(&a_pools, &c.route)) else {
                continue;
            };

            let total = a.quote_adjusted_for_gas.saturating_add(b.quote_adjusted_for_gas);
            if better(total, best_quote) {
                trace!(percent_a, percent_b, %total, "Improved plan with 2-way split");
                best = vec![a.clone(), b.clone()];
                best_quote = total;
                split_improved = true;
            }
        }
    }

    // Three-way splits are only explored once a 2-way split has beaten the
    // baseline; observed behavior, kept as is.
    if cfg.max_splits >= 3 && split_improved {
        for i in 0..percents.len() {
            for j in (i + 1)..percents.len() {
                let percent_a = percents[i];
                let percent_b = percents[j];
                if percent_a + percent_b >= 100 {
                    continue;
                }
                let percent_c = 100 - percent_a - percent_b;
                let (Some(bucket_a), Some(bucket_b), Some(bucket_c)) = (
                    by_percent.get(&percent_a),
                    by_percent.get(&percent_b),
                    by_percent.get(&percent_c),
                ) else {
                    continue;
                };
                let Some(a) = bucket_a.first() else { continue };
                let a_pools = a.route.pool_addresses();
                let Some(b) = bucket_b.iter().find(|c| disjoint(&a_pools, &c.route)) else {
                    continue;
                };
                let mut ab_pools = a_pools.clone();
                ab_pools.extend(b.route.pool_addresses());
                let Some(c) = bucket_c.iter().find(|c| disjoint(&ab_pools, &c.route)) else {
                    continue;
                };

                let total = a
                    .quote_adjusted_for_gas
                    .saturating_add(b.quote_adjusted_for_gas)
                    .saturating_add(c.quote_adjusted_for_gas);
                if better(total, best_quote) {
                    trace!(percent_a, percent_b, percent_c, %total, "Improved plan with 3-way split");
                    best = vec![a.clone(), b.clone(), c.clone()];
                    best_quote = total;
                }
            }
        }
    }

    // Assemble, largest share first.
    best.sort_by(|a, b| b.percent.cmp(&a.percent));
    let quote = best.iter().fold(U256::ZERO, |acc, r| acc + r.raw_quote);
    let estimated_gas_used = best.iter().fold(U256::ZERO, |acc, r| acc + r.gas_estimate);

    info!(
        splits = best.len(),
        quote = %quote,
        quote_gas_adjusted = %best_quote,
        estimated_gas_used = %estimated_gas_used,
        "Best swap selected"
    );
    for part in &best {
        debug!(
            percent = part.percent,
            route = %part.route.path_string(),
            quote = %part.raw_quote,
            "Plan component"
        );
    }

    Ok(Some(SwapPlan {
        quote,
        quote_gas_adjusted: best_quote,
        estimated_gas_used,
        gas_price_wei: gas_model.gas_price_wei(),
        block_number,
        route_amounts: best,
    }))
}

fn disjoint(used: &HashSet<Address>, route: &Route) -> bool {
    route.pools.iter().all(|p| !used.contains(&p.address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Pool;
    use crate::pool_provider::PoolAccessor;
    use std::collections::HashMap as StdHashMap;

    fn token(byte: u8, symbol: &str) -> Token {
        Token::new(1, Address::from([byte; 20]), symbol, 18)
    }

    fn one_hop(a: &Token, b: &Token, fee: u32) -> Route {
        let pool = Pool::new(a.clone(), b.clone(), fee, 1_000_000, U256::from(1u128) << 96, 0);
        Route::new(vec![pool], a.clone(), b.clone()).unwrap()
    }

    fn quote_at(amount: u64, quote: u64) -> AmountQuote {
        AmountQuote {
            amount: U256::from(amount),
            quote: Some(U256::from(quote)),
            sqrt_price_x96_after_list: Some(vec![U256::from(1u128) << 96]),
            initialized_ticks_crossed_list: Some(vec![0]),
            gas_estimate: Some(U256::from(90_000u64)),
        }
    }

    fn zero_gas_model(quote_token: &Token) -> GasModel {
        // Empty bridge slice: all routes cost zero gas in the quote
        // token, so comparisons reduce to raw quotes.
        GasModel::new(
            1,
            U256::ZERO,
            &[],
            &PoolAccessor::from_pools(StdHashMap::new()),
            quote_token.clone(),
        )
    }

    fn cfg() -> RoutingConfig {
        RoutingConfig::default()
    }

    #[test]
    fn missing_baseline_yields_no_plan() {
        let a = token(1, "A");
        let b = token(2, "B");
        let route = one_hop(&a, &b, 500);
        let percents = vec![50, 100];
        // Valid quote only at 50%; nothing at 100%.
        let quotes = vec![quote_at(50, 49), AmountQuote::failed(U256::from(100u64))];
        let model = zero_gas_model(&b);

        let plan = find_best_swap(
            &percents,
            &[(route, quotes)],
            &b,
            TradeType::ExactInput,
            &model,
            &cfg(),
            1,
        )
        .unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn single_route_plan_when_splitting_does_not_help() {
        let a = token(1, "A");
        let b = token(2, "B");
        let deep = one_hop(&a, &b, 500);
        let shallow = one_hop(&a, &b, 3000);
        let percents = vec![50, 100];

        // Deep pool is linear; shallow pool is much worse everywhere.
        let with_quotes = vec![
            (deep.clone(), vec![quote_at(50, 50), quote_at(100, 100)]),
            (shallow, vec![quote_at(50, 10), quote_at(100, 20)]),
        ];
        let model = zero_gas_model(&b);

        let plan = find_best_swap(
            &percents,
            &with_quotes,
            &b,
            TradeType::ExactInput,
            &model,
            &cfg(),
            1,
        )
        .unwrap()
        .unwrap();

        assert_eq!(plan.route_amounts.len(), 1);
        assert_eq!(plan.route_amounts[0].percent, 100);
        assert_eq!(plan.quote, U256::from(100u64));
    }

    #[test]
    fn two_way_split_beats_slippage() {
        let a = token(1, "A");
        let b = token(2, "B");
        let first = one_hop(&a, &b, 500);
        let second = one_hop(&a, &b, 3000);
        let percents = vec![50, 100];

        // Both pools slip hard above 50%: 50 in -> 48 out, 100 in -> 80 out.
        let with_quotes = vec![
            (first.clone(), vec![quote_at(50, 48), quote_at(100, 80)]),
            (second.clone(), vec![quote_at(50, 48), quote_at(100, 80)]),
        ];
        let model = zero_gas_model(&b);

        let plan = find_best_swap(
            &percents,
            &with_quotes,
            &b,
            TradeType::ExactInput,
            &model,
            &cfg(),
            7,
        )
        .unwrap()
        .unwrap();

        assert_eq!(plan.route_amounts.len(), 2);
        assert_eq!(plan.quote, U256::from(96u64));
        assert_eq!(plan.route_amounts.iter().map(|r| r.percent).sum::<u32>(), 100);
        // pool-disjoint components
        let pools_a = plan.route_amounts[0].route.pool_addresses();
        let pools_b = plan.route_amounts[1].route.pool_addresses();
        assert!(pools_a.is_disjoint(&pools_b));
        assert_eq!(plan.block_number, 7);
    }

    #[test]
    fn split_partners_must_be_pool_disjoint() {
        let a = token(1, "A");
        let b = token(2, "B");
        let c = token(3, "C");
        let shared = Pool::new(a.clone(), c.clone(), 500, 1_000_000, U256::from(1u128) << 96, 0);
        let tail_one = Pool::new(c.clone(), b.clone(), 500, 1_000_000, U256::from(1u128) << 96, 0);
        let tail_two = Pool::new(c.clone(), b.clone(), 3000, 1_000_000, U256::from(1u128) << 96, 0);

        // Both routes run through the same first pool; they can never be
        // combined, so the plan must stay unsplit even though a split
        // would look better on paper.
        let route_one =
            Route::new(vec![shared.clone(), tail_one], a.clone(), b.clone()).unwrap();
        let route_two = Route::new(vec![shared, tail_two], a.clone(), b.clone()).unwrap();
        let percents = vec![50, 100];
        let with_quotes = vec![
            (route_one, vec![quote_at(50, 49), quote_at(100, 80)]),
            (route_two, vec![quote_at(50, 49), quote_at(100, 79)]),
        ];
        let model = zero_gas_model(&b);

        let plan = find_best_swap(
            &percents,
            &with_quotes,
            &b,
            TradeType::ExactInput,
            &model,
            &cfg(),
            1,
        )
        .unwrap()
        .unwrap();
        assert_eq!(plan.route_amounts.len(), 1);
        assert_eq!(plan.quote, U256::from(80u64));
    }

    #[test]
    fn exact_out_prefers_smaller_input() {
        let a = token(1, "A");
        let b = token(2, "B");
        let cheap = one_hop(&a, &b, 500);
        let dear = one_hop(&a, &b, 3000);
        let percents = vec![50, 100];

        // Quotes are required input amounts here: less is better.
        let with_quotes = vec![
            (cheap.clone(), vec![quote_at(50, 51), quote_at(100, 103)]),
            (dear, vec![quote_at(50, 55), quote_at(100, 111)]),
        ];
        // quote token for exact-out is the input token
        let model = zero_gas_model(&a);

        let plan = find_best_swap(
            &percents,
            &with_quotes,
            &a,
            TradeType::ExactOutput,
            &model,
            &cfg(),
            1,
        )
        .unwrap()
        .unwrap();

        // 51 + 55 = 106 as a split loses to the unsplit 103.
        assert_eq!(plan.route_amounts.len(), 1);
        assert_eq!(plan.route_amounts[0].route.pools[0].fee, cheap.pools[0].fee);
        assert_eq!(plan.quote, U256::from(103u64));
    }

    #[test]
    fn plan_sums_match_components() {
        let a = token(1, "A");
        let b = token(2, "B");
        let first = one_hop(&a, &b, 500);
        let second = one_hop(&a, &b, 3000);
        let percents = vec![50, 100];
        let with_quotes = vec![
            (first, vec![quote_at(50, 48), quote_at(100, 80)]),
            (second, vec![quote_at(50, 47), quote_at(100, 78)]),
        ];
        let model = zero_gas_model(&b);

        let plan = find_best_swap(
            &percents,
            &with_quotes,
            &b,
            TradeType::ExactInput,
            &model,
            &cfg(),
            1,
        )
        .unwrap()
        .unwrap();

        let quote_sum = plan.route_amounts.iter().fold(U256::ZERO, |acc, r| acc + r.raw_quote);
        let adjusted_sum = plan
            .route_amounts
            .iter()
            .fold(I256::ZERO, |acc, r| acc + r.quote_adjusted_for_gas);
        let gas_sum = plan.route_amounts.iter().fold(U256::ZERO, |acc, r| acc + r.gas_estimate);
        assert_eq!(plan.quote, quote_sum);
        assert_eq!(plan.quote_gas_adjusted, adjusted_sum);
        assert_eq!(plan.estimated_gas_used, gas_sum);
        assert_eq!(plan.route_amounts.iter().map(|r| r.percent).sum::<u32>(), 100);
    }

    #[test]
    fn search_is_deterministic() {
        let a = token(1, "A");
        let b = token(2, "B");
        let routes: Vec<Route> =
            [500u32, 3000, 10000].iter().map(|&fee| one_hop(&a, &b, fee)).collect();
        let percents = vec![25, 50, 75, 100];
        let with_quotes: Vec<(Route, Vec<AmountQuote>)> = routes
            .iter()
            .enumerate()
            .map(|(i, route)| {
                let penalty = i as u64;
                (
                    route.clone(),
                    vec![
                        quote_at(25, 24 - penalty),
                        quote_at(50, 46 - penalty),
                        quote_at(75, 66 - penalty),
                        quote_at(100, 82 - penalty),
                    ],
                )
            })
            .collect();
        let model = zero_gas_model(&b);

        let run = || {
            find_best_swap(
                &percents,
                &with_quotes,
                &b,
                TradeType::ExactInput,
                &model,
                &cfg(),
                1,
            )
            .unwrap()
            .unwrap()
        };
        let first = run();
        let second = run();
        assert_eq!(first.quote, second.quote);
        assert_eq!(first.quote_gas_adjusted, second.quote_gas_adjusted);
        let shape = |plan: &SwapPlan| {
            plan.route_amounts
                .iter()
                .map(|r| (r.percent, r.route.pools[0].address))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&first), shape(&second));
    }

    #[test]
    fn monotone_improvement_over_baseline() {
        let a = token(1, "A");
        let b = token(2, "B");
        let routes: Vec<Route> =
            [500u32, 3000, 10000].iter().map(|&fee| one_hop(&a, &b, fee)).collect();
        let percents = vec![25, 50, 75, 100];
        let with_quotes: Vec<(Route, Vec<AmountQuote>)> = routes
            .iter()
            .map(|route| {
                (
                    route.clone(),
                    vec![
                        quote_at(25, 24),
                        quote_at(50, 46),
                        quote_at(75, 66),
                        quote_at(100, 82),
                    ],
                )
            })
            .collect();
        let model = zero_gas_model(&b);

        let plan = find_best_swap(
            &percents,
            &with_quotes,
            &b,
            TradeType::ExactInput,
            &model,
            &cfg(),
            1,
        )
        .unwrap()
        .unwrap();

        let baseline = I256::try_from(U256::from(82u64)).unwrap();
        assert!(plan.quote_gas_adjusted >= baseline);
    }

    #[test]
    fn oversized_max_splits_is_fatal() {
        let a = token(1, "A");
        let b = token(2, "B");
        let route = one_hop(&a, &b, 500);
        let percents = vec![100];
        let with_quotes = vec![(route, vec![quote_at(100, 99)])];
        let model = zero_gas_model(&b);
        let bad = RoutingConfig { max_splits: 4, ..Default::default() };

        let result = find_best_swap(
            &percents,
            &with_quotes,
            &b,
            TradeType::ExactInput,
            &model,
            &bad,
            1,
        );
        assert!(matches!(result, Err(RouterError::ConfigInvalid(_))));
    }

    #[test]
    fn three_way_split_runs_only_after_two_way_improves() {
        let a = token(1, "A");
        let b = token(2, "B");
        let routes: Vec<Route> =
            [500u32, 3000, 10000].iter().map(|&fee| one_hop(&a, &b, fee)).collect();
        let percents = vec![25, 50, 75, 100];

        // Concave response on every pool: 25 -> 24, 50 -> 46, 75 -> 64,
        // 100 -> 80. Two-way 50/50 gives 92 > 80; three-way 50/25/25
        // gives 46 + 24 + 24 = 94 > 92.
        let with_quotes: Vec<(Route, Vec<AmountQuote>)> = routes
            .iter()
            .map(|route| {
                (
                    route.clone(),
                    vec![
                        quote_at(25, 24),
                        quote_at(50, 46),
                        quote_at(75, 64),
                        quote_at(100, 80),
                    ],
                )
            })
            .collect();
        let model = zero_gas_model(&b);

        let plan = find_best_swap(
            &percents,
            &with_quotes,
            &b,
            TradeType::ExactInput,
            &model,
            &cfg(),
            1,
        )
        .unwrap()
        .unwrap();

        assert_eq!(plan.route_amounts.len(), 3);
        assert_eq!(plan.quote, U256::from(94u64));
        assert_eq!(plan.route_amounts.iter().map(|r| r.percent).sum::<u32>(), 100);
        // all three components pairwise pool-disjoint
        for i in 0..plan.route_amounts.len() {
            for j in (i + 1)..plan.route_amounts.len() {
                assert!(plan.route_amounts[i]
                    .route
                    .pool_addresses()
                    .is_disjoint(&plan.route_amounts[j].route.pool_addresses()));
            }
        }
    }
}

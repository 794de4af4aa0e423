use alloy_primitives::{address, Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall, SolValue};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::RouterError;
use crate::multicall::{CallSpec, Multicall};
use crate::routes::{Route, TradeType};

// Quoter contract interface. The array element widths are declared at the
// word level; the packed path encoding is produced by `Route::encode_path`.
sol! {
    function quoteExactInput(bytes memory path, uint256 amountIn)
        external
        returns (
            uint256 amountOut,
            uint256[] memory sqrtPriceX96AfterList,
            uint32[] memory initializedTicksCrossedList,
            uint256 gasEstimate
        );

    function quoteExactOutput(bytes memory path, uint256 amountOut)
        external
        returns (
            uint256 amountIn,
            uint256[] memory sqrtPriceX96AfterList,
            uint32[] memory initializedTicksCrossedList,
            uint256 gasEstimate
        );
}

/// Well-known quoter deployment.
pub const QUOTER_ADDRESS: Address = address!("61fFE014bA17989E743c5F6cB21bF9697530B21e");

/// Per-quote simulation gas cap inside the aggregator.
const QUOTE_GAS_LIMIT: u64 = 1_000_000;

/// One simulated quote at one amount. Absent optional fields mean the
/// simulation failed for that (route, amount) slot.
#[derive(Clone, Debug, Default)]
pub struct AmountQuote {
    pub amount: U256,
    pub quote: Option<U256>,
    pub sqrt_price_x96_after_list: Option<Vec<U256>>,
    pub initialized_ticks_crossed_list: Option<Vec<u32>>,
    pub gas_estimate: Option<U256>,
}

impl AmountQuote {
    pub fn failed(amount: U256) -> Self {
        Self { amount, ..Default::default() }
    }

    pub fn is_valid(&self) -> bool {
        self.quote.is_some()
            && self.sqrt_price_x96_after_list.is_some()
            && self.initialized_ticks_crossed_list.is_some()
            && self.gas_estimate.is_some()
    }

    /// Sum of initialized ticks crossed across hops; zero for failed quotes.
    pub fn ticks_crossed(&self) -> u32 {
        self.initialized_ticks_crossed_list
            .as_ref()
            .map(|list| list.iter().sum())
            .unwrap_or(0)
    }
}

#[derive(Clone, Debug)]
pub struct QuoteBatchOutcome {
    pub block_number: u64,
    /// One entry per input route, in input order; each carries one quote
    /// per input amount, in input order.
    pub routes_with_quotes: Vec<(Route, Vec<AmountQuote>)>,
    /// 99th-percentile gas used across successful quote calls. Emitted for
    /// observability; nothing downstream consumes it.
    pub approx_gas_used_per_success_call: u64,
}

/// Simulates many (route, amount) swaps against the remote quoter contract
/// in chunked, concurrently-submitted aggregator batches.
pub struct OnChainQuoter {
    multicall: Arc<dyn Multicall>,
    quoter_address: Address,
    chunk_size: usize,
    gas_limit_per_call: u64,
}

impl OnChainQuoter {
    pub fn new(multicall: Arc<dyn Multicall>, chunk_size: usize) -> Self {
        Self {
            multicall,
            quoter_address: QUOTER_ADDRESS,
            chunk_size,
            gas_limit_per_call: QUOTE_GAS_LIMIT,
        }
    }

    pub fn with_quoter_address(mut self, address: Address) -> Self {
        self.quoter_address = address;
        self
    }

    pub async fn quote_exact_in(
        &self,
        amounts: &[U256],
        routes: &[Route],
        block: Option<u64>,
    ) -> Result<QuoteBatchOutcome, RouterError> {
        self.quote(amounts, routes, TradeType::ExactInput, block).await
    }

    pub async fn quote_exact_out(
        &self,
        amounts: &[U256],
        routes: &[Route],
        block: Option<u64>,
    ) -> Result<QuoteBatchOutcome, RouterError> {
        self.quote(amounts, routes, TradeType::ExactOutput, block).await
    }

    async fn quote(
        &self,
        amounts: &[U256],
        routes: &[Route],
        trade_type: TradeType,
        block: Option<u64>,
    ) -> Result<QuoteBatchOutcome, RouterError> {
        let mut calls = Vec::with_capacity(routes.len() * amounts.len());
        for route in routes {
            let path = route.encode_path(trade_type);
            for &amount in amounts {
                let calldata: Vec<u8> = match trade_type {
                    TradeType::ExactInput => {
                        quoteExactInputCall { path: path.clone(), amountIn: amount }.abi_encode()
                    }
                    TradeType::ExactOutput => {
                        quoteExactOutputCall { path: path.clone(), amountOut: amount }.abi_encode()
                    }
                };
                calls.push(CallSpec {
                    target: self.quoter_address,
                    gas_limit: self.gas_limit_per_call,
                    calldata: calldata.into(),
                });
            }
        }

        let total_calls = calls.len();
        let batches: Vec<_> = calls
            .chunks(self.chunk_size)
            .map(|chunk| self.multicall.aggregate(chunk.to_vec(), block))
            .collect();
        let batch_count = batches.len();

        trace!(
            %trade_type,
            routes = routes.len(),
            amounts = amounts.len(),
            batches = batch_count,
            "Submitting quote batches"
        );

        // All batches run concurrently; the first failure propagates once
        // every outstanding batch has settled.
        let outcomes = try_join_all(batches).await?;

        let block_number = outcomes.first().map(|o| o.block_number).unwrap_or_default();
        let results: Vec<_> = outcomes.into_iter().flat_map(|o| o.results).collect();
        if results.len() != total_calls {
            return Err(RouterError::Abi(format!(
                "quote batches returned {} results for {total_calls} calls",
                results.len()
            )));
        }

        let mut success_gas: Vec<u64> = Vec::with_capacity(total_calls);
        let mut failed = 0usize;
        let mut routes_with_quotes = Vec::with_capacity(routes.len());
        for (r, route) in routes.iter().enumerate() {
            let mut quotes = Vec::with_capacity(amounts.len());
            for (m, &amount) in amounts.iter().enumerate() {
                let result = &results[r * amounts.len() + m];
                if !result.success || result.return_data.is_empty() {
                    trace!(
                        route = %route.path_string(),
                        %amount,
                        "Quote call failed, dropping slot"
                    );
                    failed += 1;
                    quotes.push(AmountQuote::failed(amount));
                    continue;
                }

                let quote = decode_quote(&result.return_data, trade_type, amount)?;
                success_gas.push(result.gas_used);
                quotes.push(quote);
            }
            routes_with_quotes.push((route.clone(), quotes));
        }

        let approx_gas_used_per_success_call = percentile_99(&mut success_gas);
        metrics::histogram!("sor_quote_gas_per_success_call_p99")
            .record(approx_gas_used_per_success_call as f64);
        metrics::counter!("sor_quote_calls_failed_total").increment(failed as u64);
        debug!(
            %trade_type,
            total = total_calls,
            failed,
            block_number,
            approx_gas_used_per_success_call,
            "Quote batches complete"
        );

        Ok(QuoteBatchOutcome { block_number, routes_with_quotes, approx_gas_used_per_success_call })
    }
}

fn decode_quote(
    data: &[u8],
    trade_type: TradeType,
    amount: U256,
) -> Result<AmountQuote, RouterError> {
    let (quote, sqrt_after, ticks, gas_estimate) = match trade_type {
        TradeType::ExactInput => {
            let decoded = quoteExactInputCall::abi_decode_returns(data)?;
            (
                decoded.amountOut,
                decoded.sqrtPriceX96AfterList,
                decoded.initializedTicksCrossedList,
                decoded.gasEstimate,
            )
        }
        TradeType::ExactOutput => {
            let decoded = quoteExactOutputCall::abi_decode_returns(data)?;
            (
                decoded.amountIn,
                decoded.sqrtPriceX96AfterList,
                decoded.initializedTicksCrossedList,
                decoded.gasEstimate,
            )
        }
    };
    Ok(AmountQuote {
        amount,
        quote: Some(quote),
        sqrt_price_x96_after_list: Some(sqrt_after),
        initialized_ticks_crossed_list: Some(ticks),
        gas_estimate: Some(gas_estimate),
    })
}

fn percentile_99(gas: &mut [u64]) -> u64 {
    if gas.is_empty() {
        return 0;
    }
    gas.sort_unstable();
    let index = (gas.len() * 99).div_ceil(100).saturating_sub(1);
    gas[index]
}

/// Encode a successful quote return payload; shared with mock chains. The
/// return tuple has the same shape in both trade directions.
pub fn encode_quote_return(
    quote: U256,
    sqrt_price_x96_after_list: Vec<U256>,
    initialized_ticks_crossed_list: Vec<u32>,
    gas_estimate: U256,
) -> Vec<u8> {
    (quote, sqrt_price_x96_after_list, initialized_ticks_crossed_list, gas_estimate)
        .abi_encode_sequence()
}

/// Decode a quote call's (path, amount) for mock chains that simulate the
/// quoter. Returns None for non-quoter calldata.
pub fn decode_quote_call(calldata: &[u8]) -> Option<(TradeType, Bytes, U256)> {
    if calldata.len() < 4 {
        return None;
    }
    let selector: [u8; 4] = calldata[..4].try_into().ok()?;
    if selector == quoteExactInputCall::SELECTOR {
        let call = quoteExactInputCall::abi_decode(calldata).ok()?;
        Some((TradeType::ExactInput, call.path, call.amountIn))
    } else if selector == quoteExactOutputCall::SELECTOR {
        let call = quoteExactOutputCall::abi_decode(calldata).ok()?;
        Some((TradeType::ExactOutput, call.path, call.amountOut))
    } else {
        None
    }
}

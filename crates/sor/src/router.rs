use alloy_primitives::U256;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::RoutingConfig;
use crate::distributor::distribute_amount;
use crate::error::RouterError;
use crate::gas_model::GasModel;
use crate::gas_price::GasPriceOracle;
use crate::metrics::{
    record_request, record_stage, STAGE_GAS_PRICE, STAGE_OPTIMIZATION, STAGE_POOL_SELECTION,
    STAGE_QUOTING, STAGE_ROUTE_ENUMERATION,
};
use crate::multicall::Multicall;
use crate::optimizer::{find_best_swap, SwapPlan};
use crate::pool_provider::PoolProvider;
use crate::quoter::OnChainQuoter;
use crate::routes::{compute_all_routes, TradeType};
use crate::selector::select_candidate_pools;
use crate::subgraph::SubgraphProvider;
use crate::token::{Currency, TokenRegistry};

/// Drives one routing request through the pipeline: candidate selection,
/// route enumeration, amount distribution, batched quoting and split
/// optimisation.
///
/// The router itself is stateless across requests; every request builds its
/// own working set and discards it on return. Cancellation is cooperative:
/// dropping the `route` future abandons any in-flight batches.
pub struct Router {
    chain_id: u64,
    subgraph: Arc<dyn SubgraphProvider>,
    multicall: Arc<dyn Multicall>,
    gas_oracle: Arc<dyn GasPriceOracle>,
    registry: Arc<TokenRegistry>,
}

impl Router {
    pub fn new(
        chain_id: u64,
        subgraph: Arc<dyn SubgraphProvider>,
        multicall: Arc<dyn Multicall>,
        gas_oracle: Arc<dyn GasPriceOracle>,
        registry: Arc<TokenRegistry>,
    ) -> Self {
        Self { chain_id, subgraph, multicall, gas_oracle, registry }
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    /// Find the best swap plan, or `Ok(None)` when the pair is unroutable.
    pub async fn route(
        &self,
        currency_in: &Currency,
        currency_out: &Currency,
        amount: U256,
        trade_type: TradeType,
        cfg: &RoutingConfig,
    ) -> Result<Option<SwapPlan>, RouterError> {
        let outcome = self.route_inner(currency_in, currency_out, amount, trade_type, cfg).await;
        record_request(outcome.is_ok());
        outcome
    }

    async fn route_inner(
        &self,
        currency_in: &Currency,
        currency_out: &Currency,
        amount: U256,
        trade_type: TradeType,
        cfg: &RoutingConfig,
    ) -> Result<Option<SwapPlan>, RouterError> {
        cfg.validate()?;

        // All internal work happens on wrapped tokens; a native leg is
        // wrapped here and surfaces again in the emitted plan's logging so
        // calldata encoding downstream can unwrap it.
        let token_in = currency_in.wrapped()?;
        let token_out = currency_out.wrapped()?;
        if token_in == token_out {
            return Err(RouterError::ConfigInvalid(
                "input and output resolve to the same token".into(),
            ));
        }

        info!(
            token_in = %token_in,
            token_out = %token_out,
            %amount,
            %trade_type,
            "Routing request"
        );

        let started = Instant::now();
        let gas_price_wei = self.gas_oracle.gas_price().await?;
        record_stage(STAGE_GAS_PRICE, started);

        let started = Instant::now();
        let (accessor, selection) = select_candidate_pools(
            &token_in,
            &token_out,
            trade_type,
            self.subgraph.as_ref(),
            &PoolProvider::new(self.multicall.clone()),
            &self.registry,
            cfg,
            None,
        )
        .await?;
        record_stage(STAGE_POOL_SELECTION, started);

        let started = Instant::now();
        let pools: Vec<_> = accessor.all_pools().cloned().collect();
        let routes = compute_all_routes(&token_in, &token_out, &pools, cfg.max_swaps_per_path);
        record_stage(STAGE_ROUTE_ENUMERATION, started);
        if routes.is_empty() {
            info!(token_in = %token_in, token_out = %token_out, "No route between pair");
            return Ok(None);
        }
        debug!(routes = routes.len(), pools = pools.len(), "Enumerated candidate routes");

        let (percents, amounts) = distribute_amount(amount, cfg.distribution_percent)?;

        let started = Instant::now();
        let quoter = OnChainQuoter::new(self.multicall.clone(), cfg.multicall_chunk_size);
        let quoted = match trade_type {
            TradeType::ExactInput => quoter.quote_exact_in(&amounts, &routes, None).await?,
            TradeType::ExactOutput => quoter.quote_exact_out(&amounts, &routes, None).await?,
        };
        record_stage(STAGE_QUOTING, started);

        // The quote token is the side the user did not fix.
        let quote_token = match trade_type {
            TradeType::ExactInput => token_out.clone(),
            TradeType::ExactOutput => token_in.clone(),
        };

        let started = Instant::now();
        let gas_model = GasModel::new(
            self.chain_id,
            gas_price_wei,
            &selection.top_eth_quote_token,
            &accessor,
            quote_token.clone(),
        );
        let plan = find_best_swap(
            &percents,
            &quoted.routes_with_quotes,
            &quote_token,
            trade_type,
            &gas_model,
            cfg,
            quoted.block_number,
        )?;
        record_stage(STAGE_OPTIMIZATION, started);

        if let Some(plan) = &plan {
            info!(
                splits = plan.route_amounts.len(),
                quote = %plan.quote,
                quote_gas_adjusted = %plan.quote_gas_adjusted,
                block_number = plan.block_number,
                native_in = currency_in.is_native(),
                native_out = currency_out.is_native(),
                "Swap plan emitted"
            );
        }
        Ok(plan)
    }
}

use alloy_primitives::U256;
use alloy_provider::Provider;
use async_trait::async_trait;
use tracing::trace;

use crate::error::RouterError;

/// Source of the gas price a plan is costed against. Failure here is fatal
/// to the request; a plan priced with no gas assumption is misleading.
#[async_trait]
pub trait GasPriceOracle: Send + Sync {
    async fn gas_price(&self) -> Result<U256, RouterError>;
}

/// `eth_gasPrice` against the live node.
pub struct EthGasPriceOracle<P> {
    provider: P,
}

impl<P> EthGasPriceOracle<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: Provider + Send + Sync> GasPriceOracle for EthGasPriceOracle<P> {
    async fn gas_price(&self) -> Result<U256, RouterError> {
        let price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| RouterError::GasPriceUnavailable(e.to_string()))?;
        trace!(gas_price_wei = price, "Fetched gas price");
        Ok(U256::from(price))
    }
}

/// Fixed gas price, for embedding and tests.
pub struct StaticGasPrice(pub U256);

#[async_trait]
impl GasPriceOracle for StaticGasPrice {
    async fn gas_price(&self) -> Result<U256, RouterError> {
        Ok(self.0)
    }
}

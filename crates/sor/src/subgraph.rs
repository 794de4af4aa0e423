use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::RouterError;

/// Pools below this TVL are dropped at ingestion; they cannot win a slice
/// anyway and bloat the universe.
const MIN_TVL_USD: f64 = 0.0;

const PAGE_SIZE: usize = 1000;

#[derive(Clone, Debug, Deserialize)]
pub struct SubgraphToken {
    pub id: String,
    pub symbol: String,
}

/// A pool as reported by the indexer: addresses are lowercase hex strings,
/// numeric fields are decimal strings.
#[derive(Clone, Debug, Deserialize)]
pub struct SubgraphPool {
    pub id: String,
    pub token0: SubgraphToken,
    pub token1: SubgraphToken,
    #[serde(rename = "feeTier")]
    pub fee_tier: String,
    #[serde(rename = "totalValueLockedUSD")]
    pub total_value_locked_usd: String,
}

impl SubgraphPool {
    pub fn tvl_usd(&self) -> f64 {
        self.total_value_locked_usd.parse().unwrap_or(0.0)
    }

    pub fn fee(&self) -> Option<u32> {
        self.fee_tier.parse().ok()
    }

    pub fn pool_address(&self) -> Option<Address> {
        self.id.parse().ok()
    }

    pub fn token0_address(&self) -> Option<Address> {
        self.token0.id.parse().ok()
    }

    pub fn token1_address(&self) -> Option<Address> {
        self.token1.id.parse().ok()
    }
}

/// Source of the pool universe snapshot queried once per request.
#[async_trait]
pub trait SubgraphProvider: Send + Sync {
    async fn pools(&self) -> Result<Vec<SubgraphPool>, RouterError>;
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<PoolsData>,
    errors: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct PoolsData {
    pools: Vec<SubgraphPool>,
}

/// Fetches the pool universe from a hosted GraphQL indexer, paginating by
/// `skip` until a short page comes back.
pub struct HttpSubgraphProvider {
    client: reqwest::Client,
    url: Url,
}

impl HttpSubgraphProvider {
    pub fn new(url: Url) -> Self {
        Self { client: reqwest::Client::new(), url }
    }
}

#[async_trait]
impl SubgraphProvider for HttpSubgraphProvider {
    async fn pools(&self) -> Result<Vec<SubgraphPool>, RouterError> {
        let mut all = Vec::new();
        let mut skip = 0usize;

        loop {
            let query = format!(
                "{{ pools(first: {PAGE_SIZE}, skip: {skip}, orderBy: totalValueLockedUSD, orderDirection: desc) \
                 {{ id token0 {{ id symbol }} token1 {{ id symbol }} feeTier totalValueLockedUSD }} }}"
            );
            let body = serde_json::json!({ "query": query });

            let response = self
                .client
                .post(self.url.clone())
                .json(&body)
                .send()
                .await
                .map_err(|e| RouterError::Transport(format!("subgraph request failed: {e}")))?;

            let parsed: GraphQlResponse = response
                .json()
                .await
                .map_err(|e| RouterError::Transport(format!("subgraph response malformed: {e}")))?;

            if let Some(errors) = parsed.errors {
                return Err(RouterError::Transport(format!("subgraph query errors: {errors}")));
            }
            let page = parsed
                .data
                .map(|d| d.pools)
                .ok_or_else(|| RouterError::Transport("subgraph response missing data".into()))?;

            let fetched = page.len();
            for pool in page {
                if pool.tvl_usd() > MIN_TVL_USD {
                    all.push(pool);
                } else {
                    warn!(pool = %pool.id, "Dropping zero-TVL subgraph pool");
                }
            }

            if fetched < PAGE_SIZE {
                break;
            }
            skip += PAGE_SIZE;
        }

        debug!(pools = all.len(), "Fetched pool universe from subgraph");
        Ok(all)
    }
}

/// Fixed in-memory universe, for embedding and tests.
pub struct StaticSubgraphProvider {
    pools: Vec<SubgraphPool>,
}

impl StaticSubgraphProvider {
    pub fn new(pools: Vec<SubgraphPool>) -> Self {
        Self { pools }
    }
}

#[async_trait]
impl SubgraphProvider for StaticSubgraphProvider {
    async fn pools(&self) -> Result<Vec<SubgraphPool>, RouterError> {
        Ok(self.pools.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subgraph_pool_parses_fields() {
        let raw = r#"{
            "id": "0x88e6a0c2ddd26feeb64f039a2c41296fcb3f5640",
            "token0": { "id": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "symbol": "USDC" },
            "token1": { "id": "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", "symbol": "WETH" },
            "feeTier": "500",
            "totalValueLockedUSD": "123456.78"
        }"#;
        let pool: SubgraphPool = serde_json::from_str(raw).unwrap();
        assert_eq!(pool.fee(), Some(500));
        assert!((pool.tvl_usd() - 123456.78).abs() < 1e-6);
        assert!(pool.pool_address().is_some());
        assert!(pool.token0_address().is_some());
    }

    #[test]
    fn malformed_numerics_degrade_to_zero() {
        let pool = SubgraphPool {
            id: "not-an-address".into(),
            token0: SubgraphToken { id: "x".into(), symbol: "A".into() },
            token1: SubgraphToken { id: "y".into(), symbol: "B".into() },
            fee_tier: "abc".into(),
            total_value_locked_usd: "nan?".into(),
        };
        assert_eq!(pool.fee(), None);
        assert_eq!(pool.tvl_usd(), 0.0);
        assert!(pool.pool_address().is_none());
    }
}

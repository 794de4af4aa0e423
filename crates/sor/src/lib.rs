//! Smart order router for a concentrated-liquidity exchange.
//!
//! Given a token pair and a fixed input or output amount, the router picks
//! a bounded candidate set of pools by TVL, enumerates simple paths over
//! them, quotes every (route, percent-slice) pair against the on-chain
//! quoter through chunked aggregator batches, and composes the quotes into
//! the best gas-adjusted plan of up to three pool-disjoint routes.

pub mod config;
pub mod distributor;
pub mod error;
pub mod gas_model;
pub mod gas_price;
pub mod logging;
pub mod metrics;
pub mod multicall;
pub mod optimizer;
pub mod pool;
pub mod pool_provider;
pub mod quoter;
pub mod router;
pub mod routes;
pub mod selector;
pub mod subgraph;
pub mod token;

pub use config::RoutingConfig;
pub use error::RouterError;
pub use optimizer::{RouteWithValidQuote, SwapPlan};
pub use router::Router;
pub use routes::{Route, TradeType};
pub use token::{Currency, Token, TokenRegistry};

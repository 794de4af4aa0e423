use alloy_primitives::U256;
use alloy_provider::ProviderBuilder;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use url::Url;

use sor::gas_price::EthGasPriceOracle;
use sor::logging::init_logging;
use sor::multicall::RpcMulticall;
use sor::subgraph::HttpSubgraphProvider;
use sor::token::TokenList;
use sor::{Router, RoutingConfig, SwapPlan, TokenRegistry, TradeType};

#[derive(Parser, Debug)]
#[command(name = "sor", about = "Smart order router for concentrated-liquidity pools")]
struct Cli {
    /// Input token: a listed symbol, a 0x address, or ETH for the native asset
    #[arg(long = "tokenIn")]
    token_in: String,

    /// Output token: a listed symbol, a 0x address, or ETH for the native asset
    #[arg(long = "tokenOut")]
    token_out: String,

    /// Trade amount in the fixed token's smallest units
    #[arg(long)]
    amount: String,

    /// Fix the input amount
    #[arg(long = "exactIn", conflicts_with = "exact_out")]
    exact_in: bool,

    /// Fix the output amount
    #[arg(long = "exactOut")]
    exact_out: bool,

    #[arg(long = "chainId", default_value_t = 1)]
    chain_id: u64,

    /// JSON-RPC endpoint; takes precedence over --infuraKey
    #[arg(long = "rpcUrl", env = "SOR_RPC_URL")]
    rpc_url: Option<Url>,

    /// Infura project key used to derive the endpoint for --chainId
    #[arg(long = "infuraKey", env = "SOR_INFURA_KEY")]
    infura_key: Option<String>,

    /// GraphQL endpoint serving the pool universe
    #[arg(long = "subgraphUrl", env = "SOR_SUBGRAPH_URL")]
    subgraph_url: Url,

    /// Token list JSON: an HTTP(S) URI or a local file path
    #[arg(long = "tokenListURI", env = "SOR_TOKEN_LIST_URI", default_value = "https://tokens.uniswap.org")]
    token_list_uri: String,

    /// Force debug-level logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if !cli.exact_in && !cli.exact_out {
        eyre::bail!("one of --exactIn or --exactOut is required");
    }
    let trade_type = if cli.exact_out { TradeType::ExactOutput } else { TradeType::ExactInput };
    let amount: U256 = cli.amount.parse().map_err(|e| eyre::eyre!("invalid --amount: {e}"))?;

    let rpc_url = match (&cli.rpc_url, &cli.infura_key) {
        (Some(url), _) => url.clone(),
        (None, Some(key)) => infura_url(cli.chain_id, key)?,
        (None, None) => eyre::bail!("provide --rpcUrl or --infuraKey"),
    };

    let list = load_token_list(&cli.token_list_uri).await?;
    let registry = Arc::new(TokenRegistry::from_token_list(cli.chain_id, &list));

    let provider = ProviderBuilder::new().connect_http(rpc_url);
    let router = Router::new(
        cli.chain_id,
        Arc::new(HttpSubgraphProvider::new(cli.subgraph_url.clone())),
        Arc::new(RpcMulticall::new(provider.clone())),
        Arc::new(EthGasPriceOracle::new(provider)),
        registry,
    );

    let currency_in = router.registry().resolve(&cli.token_in)?;
    let currency_out = router.registry().resolve(&cli.token_out)?;

    let plan = router
        .route(&currency_in, &currency_out, amount, trade_type, &RoutingConfig::default())
        .await?;

    match plan {
        Some(plan) => print_plan(&plan, trade_type),
        None => println!("No route found."),
    }
    Ok(())
}

fn infura_url(chain_id: u64, key: &str) -> eyre::Result<Url> {
    let network = match chain_id {
        1 => "mainnet",
        10 => "optimism-mainnet",
        137 => "polygon-mainnet",
        8453 => "base-mainnet",
        42161 => "arbitrum-mainnet",
        other => eyre::bail!("no Infura network known for chain {other}"),
    };
    Ok(Url::parse(&format!("https://{network}.infura.io/v3/{key}"))?)
}

async fn load_token_list(uri: &str) -> eyre::Result<TokenList> {
    if Path::new(uri).exists() {
        let body = std::fs::read_to_string(uri)?;
        return Ok(serde_json::from_str(&body)?);
    }
    Ok(reqwest::get(uri).await?.json().await?)
}

fn print_plan(plan: &SwapPlan, trade_type: TradeType) {
    let quote_label = match trade_type {
        TradeType::ExactInput => "amount out",
        TradeType::ExactOutput => "amount in",
    };
    println!("Swap plan ({} route(s), block {}):", plan.route_amounts.len(), plan.block_number);
    for part in &plan.route_amounts {
        println!(
            "  {:>3}%  {}  {} {}",
            part.percent,
            part.route.path_string(),
            quote_label,
            part.raw_quote
        );
    }
    println!("  total {quote_label}: {}", plan.quote);
    println!("  gas-adjusted:   {}", plan.quote_gas_adjusted);
    println!("  estimated gas:  {}", plan.estimated_gas_used);
    println!("  gas price wei:  {}", plan.gas_price_wei);
}

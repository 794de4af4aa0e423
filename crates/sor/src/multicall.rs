use alloy_primitives::{address, Address, Bytes, TxKind, U256};
use alloy_provider::Provider;
use alloy_rpc_types_eth::{BlockId, TransactionInput, TransactionRequest};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use tracing::trace;

use crate::error::RouterError;

// Aggregator contract interface: each sub-call carries its own gas cap and
// reports (success, gasUsed, returnData) without failing the batch.
sol! {
    struct AggregatorCall {
        address target;
        uint256 gasLimit;
        bytes callData;
    }

    struct AggregatorResult {
        bool success;
        uint256 gasUsed;
        bytes returnData;
    }

    function multicall(AggregatorCall[] calldata calls)
        external
        returns (uint256 blockNumber, AggregatorResult[] memory results);
}

/// Well-known aggregator deployment, shared across supported chains.
pub const MULTICALL_ADDRESS: Address = address!("1F98415757620B543A52E61c46B32eB19261F984");

/// One sub-call within an aggregated batch.
#[derive(Clone, Debug)]
pub struct CallSpec {
    pub target: Address,
    pub gas_limit: u64,
    pub calldata: Bytes,
}

/// Per-sub-call outcome. A failed sub-call is data, not an error.
#[derive(Clone, Debug)]
pub struct SubcallResult {
    pub success: bool,
    pub gas_used: u64,
    pub return_data: Bytes,
}

#[derive(Clone, Debug)]
pub struct AggregateOutcome {
    pub block_number: u64,
    pub results: Vec<SubcallResult>,
}

/// Batched `eth_call` aggregation. The router only depends on this seam;
/// the transport behind it is swappable (and mocked in tests).
#[async_trait]
pub trait Multicall: Send + Sync {
    /// Submit one batch. `block` pins the state the batch executes
    /// against; `None` means latest. Results keep submission order.
    async fn aggregate(
        &self,
        calls: Vec<CallSpec>,
        block: Option<u64>,
    ) -> Result<AggregateOutcome, RouterError>;
}

/// `Multicall` over a JSON-RPC provider and the on-chain aggregator.
pub struct RpcMulticall<P> {
    provider: P,
    address: Address,
}

impl<P> RpcMulticall<P> {
    pub fn new(provider: P) -> Self {
        Self { provider, address: MULTICALL_ADDRESS }
    }

    pub fn with_address(provider: P, address: Address) -> Self {
        Self { provider, address }
    }
}

#[async_trait]
impl<P: Provider + Send + Sync> Multicall for RpcMulticall<P> {
    async fn aggregate(
        &self,
        calls: Vec<CallSpec>,
        block: Option<u64>,
    ) -> Result<AggregateOutcome, RouterError> {
        let batch_size = calls.len();
        let encoded = multicallCall {
            calls: calls
                .into_iter()
                .map(|c| AggregatorCall {
                    target: c.target,
                    gasLimit: U256::from(c.gas_limit),
                    callData: c.calldata,
                })
                .collect(),
        }
        .abi_encode();

        let tx = TransactionRequest {
            to: Some(TxKind::Call(self.address)),
            input: TransactionInput::new(encoded.into()),
            ..Default::default()
        };

        let mut call = self.provider.call(tx);
        if let Some(number) = block {
            call = call.block(BlockId::number(number));
        }
        let raw = call
            .await
            .map_err(|e| RouterError::Transport(format!("multicall eth_call failed: {e}")))?;

        let decoded = multicallCall::abi_decode_returns(&raw)?;

        trace!(
            batch_size,
            block_number = %decoded.blockNumber,
            "Aggregator batch completed"
        );

        Ok(AggregateOutcome {
            block_number: decoded.blockNumber.try_into().unwrap_or(u64::MAX),
            results: decoded
                .results
                .into_iter()
                .map(|r| SubcallResult {
                    success: r.success,
                    gas_used: r.gasUsed.try_into().unwrap_or(u64::MAX),
                    return_data: r.returnData,
                })
                .collect(),
        })
    }
}

use thiserror::Error;

/// Errors surfaced by the router and its providers.
///
/// Per-call quote failures and pools that fail to hydrate are recovered
/// locally by the components that observe them and never reach this type.
/// An unroutable pair is not an error either; the router returns `Ok(None)`.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Routing configuration rejected up front. Fatal to the request.
    #[error("invalid routing config: {0}")]
    ConfigInvalid(String),

    /// A token symbol or address could not be resolved in the registry.
    #[error("token not found: {0}")]
    TokenNotFound(String),

    /// A whole RPC batch (or the subgraph fetch) failed in transport.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The envelope of an on-chain response failed to decode. Individual
    /// sub-call decode failures are handled as invalid quotes instead.
    #[error("abi decode failure: {0}")]
    Abi(String),

    /// The gas price oracle could not produce a price. Fatal to the request.
    #[error("gas price unavailable: {0}")]
    GasPriceUnavailable(String),
}

impl From<alloy_sol_types::Error> for RouterError {
    fn from(err: alloy_sol_types::Error) -> Self {
        RouterError::Abi(err.to_string())
    }
}

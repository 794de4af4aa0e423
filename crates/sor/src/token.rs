use alloy_primitives::{address, Address};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::error::RouterError;

/// An ERC-20 token. Two tokens are the same iff chain id and address match;
/// symbol and decimals are display metadata and do not participate in
/// identity.
#[derive(Clone, Debug)]
pub struct Token {
    pub chain_id: u64,
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(chain_id: u64, address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self { chain_id, address, symbol: symbol.into(), decimals }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

impl Eq for Token {}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.chain_id.hash(state);
        self.address.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.address)
    }
}

/// Either the chain-native asset or an ERC-20. The router works internally
/// on wrapped tokens only; native legs are wrapped on entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Currency {
    Native { chain_id: u64 },
    Erc20(Token),
}

impl Currency {
    pub fn chain_id(&self) -> u64 {
        match self {
            Currency::Native { chain_id } => *chain_id,
            Currency::Erc20(token) => token.chain_id,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Currency::Native { .. })
    }

    /// The token used for routing: the token itself, or the wrapped native
    /// token for a native leg.
    pub fn wrapped(&self) -> Result<Token, RouterError> {
        match self {
            Currency::Erc20(token) => Ok(token.clone()),
            Currency::Native { chain_id } => wrapped_native(*chain_id).ok_or_else(|| {
                RouterError::TokenNotFound(format!("no wrapped native token for chain {chain_id}"))
            }),
        }
    }
}

/// The wrapped native token for the chains the router knows about.
pub fn wrapped_native(chain_id: u64) -> Option<Token> {
    let (address, symbol) = match chain_id {
        1 => (address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"), "WETH"),
        10 => (address!("4200000000000000000000000000000000000006"), "WETH"),
        137 => (address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270"), "WMATIC"),
        8453 => (address!("4200000000000000000000000000000000000006"), "WETH"),
        42161 => (address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1"), "WETH"),
        _ => return None,
    };
    Some(Token::new(chain_id, address, symbol, 18))
}

/// Serde model of the standard token-list JSON.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenList {
    pub name: String,
    pub tokens: Vec<TokenListEntry>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenListEntry {
    pub chain_id: u64,
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

/// Read-only lookup of the tokens the router is allowed to route through.
/// Shared freely across requests.
#[derive(Clone, Debug, Default)]
pub struct TokenRegistry {
    chain_id: u64,
    by_address: HashMap<Address, Token>,
    by_symbol: HashMap<String, Address>,
}

impl TokenRegistry {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id, by_address: HashMap::new(), by_symbol: HashMap::new() }
    }

    /// Build a registry from a token list, keeping only entries for the
    /// registry's chain. The wrapped native token is always present.
    pub fn from_token_list(chain_id: u64, list: &TokenList) -> Self {
        let mut registry = Self::new(chain_id);
        if let Some(wrapped) = wrapped_native(chain_id) {
            registry.insert(wrapped);
        }
        for entry in &list.tokens {
            if entry.chain_id != chain_id {
                continue;
            }
            registry.insert(Token::new(chain_id, entry.address, entry.symbol.clone(), entry.decimals));
        }
        debug!(
            chain_id,
            tokens = registry.by_address.len(),
            list = %list.name,
            "Token registry built from token list"
        );
        registry
    }

    pub fn insert(&mut self, token: Token) {
        self.by_symbol.insert(token.symbol.clone(), token.address);
        self.by_address.insert(token.address, token);
    }

    pub fn contains(&self, address: Address) -> bool {
        self.by_address.contains_key(&address)
    }

    pub fn by_address(&self, address: Address) -> Option<&Token> {
        self.by_address.get(&address)
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&Token> {
        self.by_symbol.get(symbol).and_then(|addr| self.by_address.get(addr))
    }

    /// Resolve a user-supplied token reference: `ETH`/`MATIC` style native
    /// symbols, a 0x-prefixed address, or a listed symbol.
    pub fn resolve(&self, reference: &str) -> Result<Currency, RouterError> {
        let native_symbol = match self.chain_id {
            137 => "MATIC",
            _ => "ETH",
        };
        if reference.eq_ignore_ascii_case(native_symbol) {
            return Ok(Currency::Native { chain_id: self.chain_id });
        }
        if let Ok(address) = reference.parse::<Address>() {
            return self
                .by_address(address)
                .cloned()
                .map(Currency::Erc20)
                .ok_or_else(|| RouterError::TokenNotFound(reference.to_string()));
        }
        self.by_symbol(reference)
            .cloned()
            .map(Currency::Erc20)
            .ok_or_else(|| RouterError::TokenNotFound(reference.to_string()))
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

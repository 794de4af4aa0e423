use alloy_primitives::{address, b256, keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;
use std::fmt;

use crate::token::Token;

/// Concentrated-liquidity factory and pool init code hash. Deployed at the
/// same address on every chain the router supports.
pub const FACTORY_ADDRESS: Address = address!("1F98431c8aD98523631AE4a59f267346ea31F984");
pub const POOL_INIT_CODE_HASH: B256 =
    b256!("e34f199b19b2b4f47f68442619d555527d244f78a3297ea89325f843f87b8b54");

/// A live concentrated-liquidity pool snapshot. Invariant:
/// `token0.address < token1.address`.
#[derive(Clone, Debug)]
pub struct Pool {
    pub token0: Token,
    pub token1: Token,
    pub fee: u32,
    pub liquidity: u128,
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub address: Address,
}

impl Pool {
    /// Build a pool from an unordered token pair, normalising to canonical
    /// order and deriving the deterministic address.
    pub fn new(
        token_a: Token,
        token_b: Token,
        fee: u32,
        liquidity: u128,
        sqrt_price_x96: U256,
        tick: i32,
    ) -> Self {
        let (token0, token1) = canonical_order(token_a, token_b);
        let address = compute_pool_address(&token0.address, &token1.address, fee);
        Self { token0, token1, fee, liquidity, sqrt_price_x96, tick, address }
    }

    pub fn involves(&self, token: &Token) -> bool {
        self.token0 == *token || self.token1 == *token
    }

    /// The opposite endpoint of `token`, or None if the pool does not
    /// contain it.
    pub fn other_token(&self, token: &Token) -> Option<&Token> {
        if self.token0 == *token {
            Some(&self.token1)
        } else if self.token1 == *token {
            Some(&self.token0)
        } else {
            None
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}bps ({})", self.token0.symbol, self.token1.symbol, self.fee / 100, self.address)
    }
}

pub fn canonical_order(token_a: Token, token_b: Token) -> (Token, Token) {
    if token_a.address < token_b.address {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    }
}

/// Deterministic pool address for a canonical (token0, token1, fee) tuple:
/// CREATE2 over the factory with salt keccak256(abi.encode(token0, token1, fee)).
pub fn compute_pool_address(token0: &Address, token1: &Address, fee: u32) -> Address {
    debug_assert!(token0 < token1, "tokens must be in canonical order");
    let salt = keccak256((*token0, *token1, U256::from(fee)).abi_encode());

    let mut data = Vec::with_capacity(85);
    data.push(0xff);
    data.extend_from_slice(FACTORY_ADDRESS.as_slice());
    data.extend_from_slice(salt.as_slice());
    data.extend_from_slice(POOL_INIT_CODE_HASH.as_slice());

    let hash = keccak256(&data);
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(byte: u8, symbol: &str) -> Token {
        Token::new(1, Address::from([byte; 20]), symbol, 18)
    }

    #[test]
    fn pool_orders_tokens_canonically() {
        let a = token(0x02, "A");
        let b = token(0x01, "B");
        let pool = Pool::new(a.clone(), b.clone(), 500, 0, U256::ZERO, 0);
        assert_eq!(pool.token0, b);
        assert_eq!(pool.token1, a);
        assert!(pool.token0.address < pool.token1.address);
    }

    #[test]
    fn pool_address_is_orientation_invariant() {
        let a = token(0x01, "A");
        let b = token(0x02, "B");
        let forward = Pool::new(a.clone(), b.clone(), 3000, 0, U256::ZERO, 0);
        let backward = Pool::new(b, a, 3000, 0, U256::ZERO, 0);
        assert_eq!(forward.address, backward.address);
    }

    #[test]
    fn pool_address_varies_with_fee() {
        let a = token(0x01, "A");
        let b = token(0x02, "B");
        let low = Pool::new(a.clone(), b.clone(), 500, 0, U256::ZERO, 0);
        let high = Pool::new(a, b, 3000, 0, U256::ZERO, 0);
        assert_ne!(low.address, high.address);
    }

    #[test]
    fn mainnet_usdc_weth_500_address() {
        // Known mainnet deployment: USDC/WETH 0.05%.
        let usdc = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
        let weth = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
        let pool = compute_pool_address(&usdc, &weth, 500);
        assert_eq!(pool, address!("88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640"));
    }

    #[test]
    fn other_token_walks_both_directions() {
        let a = token(0x01, "A");
        let b = token(0x02, "B");
        let c = token(0x03, "C");
        let pool = Pool::new(a.clone(), b.clone(), 500, 0, U256::ZERO, 0);
        assert_eq!(pool.other_token(&a), Some(&b));
        assert_eq!(pool.other_token(&b), Some(&a));
        assert_eq!(pool.other_token(&c), None);
    }
}

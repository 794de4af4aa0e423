use alloy_primitives::U256;

use crate::error::RouterError;

/// Split `amount` into the percent grid `[step, 2*step, ..., 100]` and the
/// corresponding absolute amounts. Multiplication happens before the single
/// division by 100 so the full-amount slice is exact and intermediate
/// slices lose nothing to premature truncation.
pub fn distribute_amount(
    amount: U256,
    distribution_percent: u32,
) -> Result<(Vec<u32>, Vec<U256>), RouterError> {
    if distribution_percent == 0 || 100 % distribution_percent != 0 {
        return Err(RouterError::ConfigInvalid(format!(
            "distribution_percent {distribution_percent} does not divide 100"
        )));
    }

    let steps = 100 / distribution_percent;
    let mut percents = Vec::with_capacity(steps as usize);
    let mut amounts = Vec::with_capacity(steps as usize);
    for i in 1..=steps {
        let percent = i * distribution_percent;
        percents.push(percent);
        amounts.push(amount * U256::from(percent) / U256::from(100u32));
    }
    Ok((percents, amounts))
}

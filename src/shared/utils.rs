//! Utility functions and helpers

/// Format a base-unit amount with the token's decimals
pub fn format_amount(amount: u64, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let width = decimals as usize;
    let Some(scale) = 10u128.checked_pow(decimals as u32) else {
        return format!("0.{:0width$}", amount, width = width);
    };
    let whole = amount as u128 / scale;
    let frac = amount as u128 % scale;
    format!("{}.{:0width$}", whole, frac, width = width)
}

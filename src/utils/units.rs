//! 数值单位换算
//! 以 `U256` 表示链上整数金额

use ethers::types::U256;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
    #[error("value must be a finite, non-negative number: {0}")]
    InvalidNumber(String),
    #[error("value overflows U256")]
    Overflow,
}

/// 计算 `n * 10^decimals`
pub fn expand_to_n_decimals(n: U256, decimals: usize) -> Result<U256, UnitsError> {
    if decimals > 77 {
        return Err(UnitsError::Overflow);
    }
    n.checked_mul(U256::exp10(decimals))
        .ok_or(UnitsError::Overflow)
}

/// 将浮点数转换为 `U256`
///
/// 把十进制表示的整数部分与小数部分拼接成一个整数，
/// 再放大 `10^(整数位数 + 小数位数)`：
/// `1.5` → `15 * 10^2`，`3` → `3 * 10^1`。
pub fn float_to_big_number(n: f64) -> Result<U256, UnitsError> {
    if !n.is_finite() || n.is_sign_negative() {
        return Err(UnitsError::InvalidNumber(n.to_string()));
    }

    let repr = n.to_string();
    let (int_part, dec_part) = match repr.split_once('.') {
        Some((int_part, dec_part)) => (int_part, dec_part),
        None => (repr.as_str(), ""),
    };

    let digits = format!("{}{}", int_part, dec_part);
    let base = U256::from_dec_str(&digits).map_err(|_| UnitsError::Overflow)?;
    expand_to_n_decimals(base, int_part.len() + dec_part.len())
}

// ==========================================
// 配方主数据批量导入 - UPC-A 校验
// ==========================================

/// 计算 UPC-A 校验位（输入 11 或 12 位数字，只使用前 11 位）
pub fn upc_check_digit(number: &str) -> Option<u32> {
    if !(number.len() == 11 || number.len() == 12) {
        return None;
    }
    let digits: Vec<u32> = number.chars().map(|c| c.to_digit(10)).collect::<Option<_>>()?;

    // 奇数位（1,3,5,...,11）乘 3，偶数位（2,4,...,10）直接累加
    let odd: u32 = digits.iter().take(11).step_by(2).sum();
    let even: u32 = digits.iter().take(11).skip(1).step_by(2).sum();
    let check = (odd * 3 + even) % 10;
    Some(if check == 0 { 0 } else { 10 - check })
}

/// 是否为合法 UPC-A（12 位，校验位正确）
pub fn is_valid_upc(number: &str) -> bool {
    if number.len() != 12 {
        return false;
    }
    match (upc_check_digit(number), number.chars().last().and_then(|c| c.to_digit(10))) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_upc() {
        assert!(is_valid_upc("036000291452"));
        assert!(is_valid_upc("012345678905"));
    }

    #[test]
    fn test_invalid_upc() {
        assert!(!is_valid_upc("036000291453"));
        assert!(!is_valid_upc("03600029145"));
        assert!(!is_valid_upc("03600029145A"));
        assert!(!is_valid_upc(""));
    }

    #[test]
    fn test_check_digit_from_prefix() {
        assert_eq!(upc_check_digit("03600029145"), Some(2));
    }
}

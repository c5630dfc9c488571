//! 模糊匹配模块
//! 仪表盘节点列表搜索使用的 Sublime 风格子序列匹配

/// 模糊字符串匹配
///
/// 查询串先去掉空格并转为小写，然后从左到右扫描 `text`，
/// 文本字符（小写后）与当前查询字符相同时游标前进一位。
/// 查询串全部被消费则原样返回 `text`，否则返回空串。
///
/// # 示例
/// ```rust
/// # use zeth::utils::fuzzy::fuzzy_string_match;
/// assert_eq!(fuzzy_string_match("Binance Smart Chain", "bnc"), "Binance Smart Chain");
/// assert_eq!(fuzzy_string_match("Binance Smart Chain", "cb"), "");
/// ```
pub fn fuzzy_string_match(text: &str, search_text: &str) -> String {
    if fuzzy_matches(text, search_text) {
        text.to_string()
    } else {
        String::new()
    }
}

/// 判断查询串是否按顺序出现在文本中
pub fn fuzzy_matches(text: &str, search_text: &str) -> bool {
    let search: Vec<char> = search_text.replace(' ', "").to_lowercase().chars().collect();
    let mut pos = 0;

    for text_char in text.chars() {
        if pos >= search.len() {
            break;
        }
        // 部分字符小写后会展开为多个字符（例如 'İ'）
        let lowered: Vec<char> = text_char.to_lowercase().collect();
        if search[pos..].starts_with(&lowered) {
            pos += lowered.len();
        }
    }

    pos == search.len()
}

/// 按模糊匹配过滤候选列表，保持原有顺序
pub fn fuzzy_filter<'a, I>(candidates: I, search_text: &str) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .filter(|c| fuzzy_matches(c, search_text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_returns_text() {
        assert_eq!(fuzzy_string_match("Polygon", ""), "Polygon");
        assert_eq!(fuzzy_string_match("", ""), "");
        assert_eq!(fuzzy_string_match("Polygon", "   "), "Polygon");
    }

    #[test]
    fn test_in_order_subsequence_matches() {
        assert_eq!(
            fuzzy_string_match("Binance Smart Chain", "bnc"),
            "Binance Smart Chain"
        );
        assert_eq!(
            fuzzy_string_match("Binance Smart Chain", "smart chain"),
            "Binance Smart Chain"
        );
    }

    #[test]
    fn test_out_of_order_fails() {
        assert_eq!(fuzzy_string_match("Binance Smart Chain", "cb"), "");
        assert_eq!(fuzzy_string_match("Mainnet", "tm"), "");
        // b..s..c 依次出现在 Binance / Smart / Chain 中
        assert_eq!(
            fuzzy_string_match("Binance Smart Chain", "bsc"),
            "Binance Smart Chain"
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(fuzzy_string_match("Goerli", "GOER"), "Goerli");
        assert_eq!(fuzzy_string_match("goerli", "GoErLi"), "goerli");
    }

    #[test]
    fn test_spaces_only_ignored_in_query() {
        // 文本中的空格不会被跳过匹配，但也不会阻止匹配
        assert_eq!(fuzzy_string_match("BSC - testnet", "bsc test"), "BSC - testnet");
        // 查询中的其他空白字符不会被去除
        assert_eq!(fuzzy_string_match("BSC testnet", "bsc\ttest"), "");
    }

    #[test]
    fn test_query_longer_than_text() {
        assert_eq!(fuzzy_string_match("Dev", "devnet"), "");
    }

    #[test]
    fn test_result_is_all_or_nothing() {
        let text = "Avalanche";
        for query in ["ava", "lnch", "xyz", "avalanchee", "AVALANCHE"] {
            let result = fuzzy_string_match(text, query);
            assert!(result.is_empty() || result == text);
        }
    }

    #[test]
    fn test_fuzzy_filter() {
        let names = ["Mainnet", "Polygon", "Binance Smart Chain", "Fantom"];
        assert_eq!(
            fuzzy_filter(names, "man"),
            vec!["Mainnet", "Binance Smart Chain"]
        );
        assert_eq!(fuzzy_filter(names, "fntm"), vec!["Fantom"]);
        assert_eq!(fuzzy_filter(names, "").len(), names.len());
    }
}

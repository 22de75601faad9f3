use crate::models::{CoinRecord, Source};
use std::collections::HashMap;

/// Merge CoinGecko and Bybit records into one catalogue keyed by lower-cased symbol.
///
/// CoinGecko records go in first. A Bybit record whose symbol is already present
/// only flips that entry's tag to `Both`; the CoinGecko fields are kept as is.
/// Output follows first-insertion order.
///
/// Only a CoinGecko/Bybit overlap yields `Both`: a symbol repeated within the
/// Bybit list keeps its first record and its `Bybit` tag, unlike a plain
/// "any later hit becomes both" rule.
pub fn merge(coingecko: Vec<CoinRecord>, bybit: Vec<CoinRecord>) -> Vec<CoinRecord> {
    let mut merged: Vec<CoinRecord> = Vec::with_capacity(coingecko.len() + bybit.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(merged.capacity());

    for mut coin in coingecko {
        coin.source = Some(Source::CoinGecko);
        match index.get(&coin.merge_key()) {
            Some(&slot) => merged[slot] = coin,
            None => {
                index.insert(coin.merge_key(), merged.len());
                merged.push(coin);
            }
        }
    }

    for mut coin in bybit {
        match index.get(&coin.merge_key()) {
            Some(&slot) => {
                let existing = &mut merged[slot];
                // a repeated Bybit symbol does not make a coin dual sourced
                if existing.source != Some(Source::Bybit) {
                    existing.source = Some(Source::Both);
                }
            }
            None => {
                coin.source = Some(Source::Bybit);
                index.insert(coin.merge_key(), merged.len());
                merged.push(coin);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::coin::fixtures::coin;

    fn count(coins: &[CoinRecord], source: Source) -> usize {
        coins.iter().filter(|c| c.source == Some(source)).count()
    }

    #[test]
    fn test_disjoint_sets_keep_every_record() {
        let a = vec![coin("shib", 0.00001), coin("bonk", 0.00002)];
        let b = vec![coin("pepe", 0.000001), coin("floki", 0.0001), coin("sats", 0.0000003)];

        let merged = merge(a, b);

        assert_eq!(merged.len(), 5);
        assert_eq!(count(&merged, Source::Both), 0);
        assert_eq!(count(&merged, Source::CoinGecko), 2);
        assert_eq!(count(&merged, Source::Bybit), 3);
    }

    #[test]
    fn test_overlap_is_tagged_both_with_coingecko_fields() {
        let mut a = coin("BTC", 0.005);
        a.market_cap = 42.0;
        a.total_volume = 7.0;
        let mut b = coin("btc", 0.005);
        b.total_volume = 100.0;
        b.market_cap = 0.0;

        let merged = merge(vec![a.clone()], vec![b]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, Some(Source::Both));
        assert_eq!(merged[0].symbol, "BTC");
        assert_eq!(merged[0].total_volume, 7.0);
        assert_eq!(merged[0].market_cap, 42.0);
    }

    #[test]
    fn test_partial_overlap_counts() {
        let a = vec![coin("a", 0.001), coin("b", 0.001), coin("c", 0.001)];
        let b = vec![coin("B", 0.002), coin("C", 0.002), coin("d", 0.002)];

        let merged = merge(a, b);

        assert_eq!(merged.len(), 4);
        assert_eq!(count(&merged, Source::Both), 2);
        assert_eq!(count(&merged, Source::CoinGecko), 1);
        assert_eq!(count(&merged, Source::Bybit), 1);
        let symbols: Vec<_> = merged.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_argument_order_decides_field_precedence() {
        let a = coin("xyz", 0.001);
        let b = coin("XYZ", 0.002);

        let forward = merge(vec![a.clone()], vec![b.clone()]);
        let reversed = merge(vec![b], vec![a]);

        assert_eq!(forward.len(), reversed.len());
        assert_eq!(forward[0].current_price, 0.001);
        assert_eq!(reversed[0].current_price, 0.002);
    }

    #[test]
    fn test_repeated_bybit_symbol_stays_bybit() {
        let merged = merge(vec![], vec![coin("pepe", 0.001), coin("PEPE", 0.002)]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, Some(Source::Bybit));
        assert_eq!(merged[0].current_price, 0.001);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(merge(vec![], vec![]).is_empty());
    }
}

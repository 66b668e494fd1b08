use anyhow::{Context, Result, bail};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse seed tokens as decimal or `0x`-prefixed hex, dropping duplicates.
pub fn parse_seeds(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::with_capacity(tokens.len());
    for token in tokens {
        let seed = if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
        {
            u64::from_str_radix(&hex.replace('_', ""), 16)
        } else {
            token.replace('_', "").parse::<u64>()
        }
        .with_context(|| format!("invalid seed `{token}`"))?;
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }
    if seeds.is_empty() {
        bail!("no seeds provided");
    }
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn parse_seeds_accepts_decimal_and_hex() {
        let seeds = parse_seeds(&split_csv("1337, 0xFF, 1_000, 1337")).unwrap();
        assert_eq!(seeds, vec![1337, 255, 1000]);
    }

    #[test]
    fn parse_seeds_rejects_garbage_and_empty() {
        assert!(parse_seeds(&split_csv("12,banana")).is_err());
        assert!(parse_seeds(&[]).is_err());
    }
}

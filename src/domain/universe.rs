//! Symbol list parsing and symbol name forms.
//!
//! Symbols are written `BASE/QUOTE`. A bare base such as `APT` takes the
//! configured quote currency.

use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("symbol {0} has no quote currency and none is configured")]
    MissingQuote(String),

    #[error("malformed symbol: {0}")]
    Malformed(String),
}

pub fn parse_symbols(input: &str, quote: Option<&str>) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();
    let quote = quote.map(|q| q.trim().to_uppercase()).filter(|q| !q.is_empty());

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = normalize_symbol(trimmed, quote.as_deref())?;
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

fn normalize_symbol(token: &str, quote: Option<&str>) -> Result<String, UniverseError> {
    let upper = token.to_uppercase();
    match upper.split_once('/') {
        Some((base, q)) => {
            if base.trim().is_empty() || q.trim().is_empty() || q.contains('/') {
                return Err(UniverseError::Malformed(upper));
            }
            Ok(format!("{}/{}", base.trim(), q.trim()))
        }
        None => match quote {
            Some(q) => Ok(format!("{upper}/{q}")),
            None => Err(UniverseError::MissingQuote(upper)),
        },
    }
}

/// `APT/USDC` → `APT-USDC`, safe for file names.
pub fn symbol_file_stem(symbol: &str) -> String {
    symbol.replace('/', "-")
}

/// `APT/USDC` → `APTUSDC`, the form exchange REST APIs expect.
pub fn exchange_symbol(symbol: &str) -> String {
    symbol.replace('/', "")
}

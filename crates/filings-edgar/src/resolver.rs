//! Ticker to CIK resolution.

use filings_core::{Cik, Ticker, TickerEntry};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Lookup table from ticker to zero-padded CIK.
///
/// Built once per run from the SEC ticker directory. When the directory lists
/// a ticker more than once, the first listing wins.
#[derive(Clone, Debug, Default)]
pub struct TickerDirectory {
    ciks: HashMap<Ticker, Cik>,
}

impl TickerDirectory {
    /// Builds the table from directory entries, comparing tickers uppercase.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = TickerEntry>) -> Self {
        let mut ciks = HashMap::new();
        for entry in entries {
            if let Entry::Vacant(slot) = ciks.entry(Ticker::new(entry.ticker)) {
                slot.insert(Cik::from_raw(entry.cik_str));
            }
        }
        Self { ciks }
    }

    /// Looks up one ticker. `None` means the ticker is unknown.
    #[must_use]
    pub fn lookup(&self, ticker: &Ticker) -> Option<&Cik> {
        self.ciks.get(ticker)
    }

    /// Resolves every ticker present in the directory.
    ///
    /// Unknown tickers are left out of the result rather than mapped to an
    /// empty or zero CIK.
    #[must_use]
    pub fn resolve<'a>(&self, tickers: impl IntoIterator<Item = &'a Ticker>) -> HashMap<Ticker, Cik> {
        tickers
            .into_iter()
            .filter_map(|t| self.lookup(t).map(|cik| (t.clone(), cik.clone())))
            .collect()
    }

    /// Number of distinct tickers in the directory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ciks.len()
    }

    /// Returns true if the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ciks.is_empty()
    }
}

//! Per-series show/hide state. Pure view state; never touches fetched data.

use std::collections::BTreeMap;

use shared::domain::Series;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityController {
    hidden: BTreeMap<String, bool>,
}

impl VisibilityController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the hidden flag for `series_name` and returns the new value.
    /// Either band bound (`upper`, `lower`) toggles the whole band.
    pub fn toggle(&mut self, series_name: &str) -> bool {
        let hidden = self
            .hidden
            .entry(canonical_key(series_name).to_string())
            .or_insert(false);
        *hidden = !*hidden;
        *hidden
    }

    pub fn is_hidden(&self, series_name: &str) -> bool {
        self.hidden
            .get(canonical_key(series_name))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_series_hidden(&self, series: Series) -> bool {
        self.is_hidden(series.key())
    }

    pub fn visible_series(&self) -> Vec<Series> {
        Series::ALL
            .into_iter()
            .filter(|series| !self.is_series_hidden(*series))
            .collect()
    }
}

fn canonical_key(series_name: &str) -> &str {
    Series::from_key(series_name).map_or(series_name, |series| series.key())
}

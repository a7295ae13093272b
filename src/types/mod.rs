use serde::{Deserialize, Serialize};

/// One line of the result table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub index: usize,
    pub value: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub rows_written: usize,
    pub min_covariance: Option<f64>,
    pub max_covariance: Option<f64>,
    /// Row index holding `max_covariance`
    pub max_index: Option<usize>,
}

impl RunSummary {
    pub fn record(&mut self, row: &ResultRow) {
        self.rows_written += 1;
        if self.min_covariance.map_or(true, |min| row.value < min) {
            self.min_covariance = Some(row.value);
        }
        if self.max_covariance.map_or(true, |max| row.value > max) {
            self.max_covariance = Some(row.value);
            self.max_index = Some(row.index);
        }
    }
}

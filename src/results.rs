use std::path::{Path, PathBuf};

/// Outcome of quantifying one source image
#[derive(Debug, Clone, PartialEq)]
pub struct QuantificationResult {
    pub source_path: PathBuf,
    /// Rendered mask image written to the scratch area
    pub result_image_path: PathBuf,
    /// Stained share of non-background pixels, rounded to 3 decimals
    pub percentage: f64,
}

impl QuantificationResult {
    /// File name of the source image, used to name exported files
    pub fn source_name(&self) -> String {
        file_name_of(&self.source_path)
    }

    /// Percentage printed as a float literal, always with a fractional part (`12.5`, `0.0`)
    pub fn percentage_text(&self) -> String {
        format_percentage(self.percentage)
    }
}

/// Results of the latest batch, in processing order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultStore {
    results: Vec<QuantificationResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: QuantificationResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&QuantificationResult> {
        self.results.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QuantificationResult> {
        self.results.iter()
    }

    pub fn as_slice(&self) -> &[QuantificationResult] {
        &self.results
    }

    /// Rows as shown in a results table: image name and `"<pct> %"`
    pub fn table_rows(&self) -> Vec<(String, String)> {
        self.results
            .iter()
            .map(|r| (r.source_name(), format!("{} %", r.percentage_text())))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ResultStore {
    type Item = &'a QuantificationResult;
    type IntoIter = std::slice::Iter<'a, QuantificationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Round to 3 decimal places.
///
/// Rounds the exact binary value, with exact ties going to the even digit
/// (`0.0625` -> `0.062`). Scaling by 1000 first would round twice.
pub fn round_percentage(value: f64) -> f64 {
    format!("{:.3}", value).parse().unwrap_or(value)
}

pub fn format_percentage(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

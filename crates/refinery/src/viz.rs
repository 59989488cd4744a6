//! Visualization boundary: before/after comparison of one column.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RefineryError, Result};
use crate::stats::{StreamingStats, quantile_sorted};
use crate::table::DataTable;

/// Kind of comparison plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    BoxPlot,
    Histogram,
}

impl FromStr for PlotKind {
    type Err = RefineryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "box" | "boxplot" | "box_plot" => Ok(PlotKind::BoxPlot),
            "hist" | "histogram" => Ok(PlotKind::Histogram),
            _ => Err(RefineryError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotKind::BoxPlot => f.write_str("boxplot"),
            PlotKind::Histogram => f.write_str("histogram"),
        }
    }
}

/// Renders a side-by-side comparison of one column in two tables.
///
/// Both tables are guaranteed to contain `column`.
pub trait ComparisonRenderer {
    fn render(
        &mut self,
        before: &DataTable,
        after: &DataTable,
        column: &str,
        kind: PlotKind,
    ) -> Result<()>;
}

const HISTOGRAM_BINS: usize = 10;
const BAR_WIDTH: usize = 40;

/// Plain-text renderer: five-number summaries for box plots, bucket counts
/// for histograms.
pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line).map_err(|e| RefineryError::io("<renderer>", e))
    }

    fn render_box(&mut self, label: &str, sorted: &[f64]) -> Result<()> {
        let (Some(min), Some(q1), Some(med), Some(q3), Some(max)) = (
            sorted.first().copied(),
            quantile_sorted(sorted, 0.25),
            quantile_sorted(sorted, 0.5),
            quantile_sorted(sorted, 0.75),
            sorted.last().copied(),
        ) else {
            return self.write_line(&format!("  {:<7} (no numeric values)", label));
        };
        self.write_line(&format!(
            "  {:<7} n={:<6} min={:<10.4} q1={:<10.4} median={:<10.4} q3={:<10.4} max={:.4}",
            label,
            sorted.len(),
            min,
            q1,
            med,
            q3,
            max
        ))
    }

    fn render_histogram(&mut self, before: &[f64], after: &[f64]) -> Result<()> {
        let range: StreamingStats = before.iter().chain(after).copied().collect();
        let (Some(lo), Some(hi)) = (range.min(), range.max()) else {
            return self.write_line("  (no numeric values)");
        };
        let width = if hi > lo { (hi - lo) / HISTOGRAM_BINS as f64 } else { 1.0 };

        let bin_counts = |values: &[f64]| {
            let mut counts = [0usize; HISTOGRAM_BINS];
            for &x in values {
                let bin = (((x - lo) / width) as usize).min(HISTOGRAM_BINS - 1);
                counts[bin] += 1;
            }
            counts
        };
        let before_counts = bin_counts(before);
        let after_counts = bin_counts(after);
        let peak = before_counts
            .iter()
            .chain(&after_counts)
            .copied()
            .max()
            .unwrap_or(0)
            .max(1);

        for bin in 0..HISTOGRAM_BINS {
            let start = lo + width * bin as f64;
            let bar = |count: usize| "#".repeat(count * BAR_WIDTH / peak);
            self.write_line(&format!(
                "  [{:>10.3}, {:>10.3})  before {:>5} {:<w$}  after {:>5} {}",
                start,
                start + width,
                before_counts[bin],
                bar(before_counts[bin]),
                after_counts[bin],
                bar(after_counts[bin]),
                w = BAR_WIDTH
            ))?;
        }
        Ok(())
    }
}

fn sorted_numeric(table: &DataTable, column: &str) -> Result<Vec<f64>> {
    let col = table.require_column(column)?;
    let mut values: Vec<f64> = table.numeric_values(col).into_iter().map(|(_, x)| x).collect();
    values.sort_by(f64::total_cmp);
    Ok(values)
}

impl<W: Write> ComparisonRenderer for TextRenderer<W> {
    fn render(
        &mut self,
        before: &DataTable,
        after: &DataTable,
        column: &str,
        kind: PlotKind,
    ) -> Result<()> {
        let before_values = sorted_numeric(before, column)?;
        let after_values = sorted_numeric(after, column)?;

        self.write_line(&format!("{} of '{}' (before vs after)", kind, column))?;
        match kind {
            PlotKind::BoxPlot => {
                self.render_box("before", &before_values)?;
                self.render_box("after", &after_values)
            }
            PlotKind::Histogram => self.render_histogram(&before_values, &after_values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn test_plot_kind_from_str() {
        assert_eq!("boxplot".parse::<PlotKind>().unwrap(), PlotKind::BoxPlot);
        assert_eq!("Histogram".parse::<PlotKind>().unwrap(), PlotKind::Histogram);
        assert!("pie".parse::<PlotKind>().is_err());
    }

    #[test]
    fn test_text_renderer_box() {
        let before = DataTable::from_columns(vec![(
            "x",
            vec![Value::Int(1), Value::Int(2), Value::Int(100)],
        )])
        .unwrap();
        let after = before.select_rows(&[0, 1]);

        let mut renderer = TextRenderer::new(Vec::new());
        renderer.render(&before, &after, "x", PlotKind::BoxPlot).unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();

        assert!(text.starts_with("boxplot of 'x'"));
        assert!(text.contains("n=3"));
        assert!(text.contains("n=2"));
    }

    #[test]
    fn test_text_renderer_histogram_lines() {
        let before = DataTable::from_columns(vec![(
            "x",
            (0..20).map(Value::Int).collect::<Vec<_>>(),
        )])
        .unwrap();
        let after = before.empty_like();

        let mut renderer = TextRenderer::new(Vec::new());
        renderer
            .render(&before, &after, "x", PlotKind::Histogram)
            .unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 1 + HISTOGRAM_BINS);
    }
}

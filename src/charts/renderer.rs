//! Static Chart Renderer
//! Renders 30-day death-rate distributions to PNG histograms.

use crate::data::{OutcomeMeasure, OutcomeTable};
use crate::stats::StatsCalculator;
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;

const BIN_COUNT: usize = 30;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("no rate data for outcome '{0}'")]
    NoData(String),
    #[error("chart rendering failed: {0}")]
    Render(String),
}

/// Renders rate-distribution histograms with the plotters bitmap backend.
pub struct HistogramRenderer;

impl HistogramRenderer {
    /// Render the rate distribution for an outcome as a PNG histogram.
    pub fn render_rate_histogram(
        table: &OutcomeTable,
        measure: OutcomeMeasure,
        path: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), ChartError> {
        let values = StatsCalculator::rates_for_outcome(table, measure);
        if values.is_empty() {
            return Err(ChartError::NoData(measure.name().to_string()));
        }

        let (min, max) = Self::value_range(&values);
        let bin_width = (max - min) / BIN_COUNT as f64;
        let mut counts = vec![0u32; BIN_COUNT];
        for &v in &values {
            let idx = (((v - min) / bin_width) as usize).min(BIN_COUNT - 1);
            counts[idx] += 1;
        }
        let y_max = counts.iter().copied().max().unwrap_or(0).max(1);

        let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| ChartError::Render(e.to_string()))?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("30-day death rates: {}", measure.name()),
                ("sans-serif", 24),
            )
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(min..max, 0u32..(y_max + 1))
            .map_err(|e| ChartError::Render(e.to_string()))?;

        chart
            .configure_mesh()
            .x_desc("30-day death rate (%)")
            .y_desc("hospitals")
            .draw()
            .map_err(|e| ChartError::Render(e.to_string()))?;

        chart
            .draw_series(counts.iter().enumerate().map(|(i, &count)| {
                let x0 = min + i as f64 * bin_width;
                let x1 = x0 + bin_width;
                Rectangle::new([(x0, 0u32), (x1, count)], BLUE.mix(0.6).filled())
            }))
            .map_err(|e| ChartError::Render(e.to_string()))?;

        root.present()
            .map_err(|e| ChartError::Render(e.to_string()))?;
        Ok(())
    }

    fn value_range(values: &[f64]) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in values {
            min = min.min(v);
            max = max.max(v);
        }
        // a single distinct value still needs a non-degenerate axis
        if (max - min).abs() < f64::EPSILON {
            max = min + 1.0;
        }
        (min, max)
    }
}

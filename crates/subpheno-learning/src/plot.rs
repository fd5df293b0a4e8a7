//! SVG overlay of labeled ROC curves.

use crate::error::Result;
use crate::evaluation::RocCurve;
use std::path::Path;
use tracing::debug;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 560.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_TOP: f64 = 50.0;
const PLOT_SIZE: f64 = 420.0;

const PALETTE: [&str; 6] = ["#1f77b4", "#d62728", "#2ca02c", "#9467bd", "#ff7f0e", "#8c564b"];

struct Series {
    label: String,
    curve: RocCurve,
}

/// ROC curves of several models drawn on one set of axes, with the chance
/// diagonal and a legend.
pub struct RocPlot {
    title: String,
    series: Vec<Series>,
}

impl RocPlot {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            series: Vec::new(),
        }
    }

    /// Add a curve; the legend reads `"<name> (AUC = 0.873)"`.
    pub fn add_curve(&mut self, name: &str, curve: &RocCurve, auc: f64) -> &mut Self {
        self.series.push(Series {
            label: format!("{name} (AUC = {auc:.3})"),
            curve: curve.clone(),
        });
        self
    }

    pub fn labels(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.label.as_str()).collect()
    }

    /// Map (fpr, tpr) in the unit square to SVG coordinates.
    fn project(fpr: f64, tpr: f64) -> (f64, f64) {
        (
            MARGIN_LEFT + fpr.clamp(0.0, 1.0) * PLOT_SIZE,
            MARGIN_TOP + (1.0 - tpr.clamp(0.0, 1.0)) * PLOT_SIZE,
        )
    }

    pub fn render(&self) -> String {
        let mut svg = String::new();
        svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\" viewBox=\"0 0 {WIDTH} {HEIGHT}\">\n"
        ));
        svg.push_str("  <style>\n");
        svg.push_str("    .frame { fill: none; stroke: #333; stroke-width: 1; }\n");
        svg.push_str("    .grid { stroke: #ddd; stroke-width: 1; }\n");
        svg.push_str("    .label { font-family: sans-serif; font-size: 12px; fill: #222; }\n");
        svg.push_str("    .title { font-family: sans-serif; font-size: 16px; font-weight: bold; }\n");
        svg.push_str("  </style>\n");
        svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"#ffffff\"/>\n");
        svg.push_str(&format!(
            "  <text class=\"title\" x=\"{}\" y=\"30\" text-anchor=\"middle\">{}</text>\n",
            MARGIN_LEFT + PLOT_SIZE / 2.0,
            escape(&self.title)
        ));

        // Grid and tick labels every 0.2
        for i in 0..=5 {
            let v = f64::from(i) * 0.2;
            let (x, _) = Self::project(v, 0.0);
            let (_, y) = Self::project(0.0, v);
            svg.push_str(&format!(
                "  <line class=\"grid\" x1=\"{x:.1}\" y1=\"{MARGIN_TOP}\" x2=\"{x:.1}\" y2=\"{:.1}\"/>\n",
                MARGIN_TOP + PLOT_SIZE
            ));
            svg.push_str(&format!(
                "  <line class=\"grid\" x1=\"{MARGIN_LEFT}\" y1=\"{y:.1}\" x2=\"{:.1}\" y2=\"{y:.1}\"/>\n",
                MARGIN_LEFT + PLOT_SIZE
            ));
            svg.push_str(&format!(
                "  <text class=\"label\" x=\"{x:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{v:.1}</text>\n",
                MARGIN_TOP + PLOT_SIZE + 18.0
            ));
            svg.push_str(&format!(
                "  <text class=\"label\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\">{v:.1}</text>\n",
                MARGIN_LEFT - 8.0,
                y + 4.0
            ));
        }
        svg.push_str(&format!(
            "  <rect class=\"frame\" x=\"{MARGIN_LEFT}\" y=\"{MARGIN_TOP}\" width=\"{PLOT_SIZE}\" height=\"{PLOT_SIZE}\"/>\n"
        ));
        svg.push_str(&format!(
            "  <text class=\"label\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">1 - Specificity</text>\n",
            MARGIN_LEFT + PLOT_SIZE / 2.0,
            MARGIN_TOP + PLOT_SIZE + 40.0
        ));
        svg.push_str(&format!(
            "  <text class=\"label\" x=\"20\" y=\"{0:.1}\" text-anchor=\"middle\" transform=\"rotate(-90 20 {0:.1})\">Sensitivity</text>\n",
            MARGIN_TOP + PLOT_SIZE / 2.0
        ));

        // Chance diagonal
        let (x0, y0) = Self::project(0.0, 0.0);
        let (x1, y1) = Self::project(1.0, 1.0);
        svg.push_str(&format!(
            "  <line x1=\"{x0:.1}\" y1=\"{y0:.1}\" x2=\"{x1:.1}\" y2=\"{y1:.1}\" stroke=\"#999\" stroke-dasharray=\"6 4\"/>\n"
        ));

        for (i, series) in self.series.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let points: Vec<String> = series
                .curve
                .points
                .iter()
                .map(|p| {
                    let (x, y) = Self::project(p.fpr, p.tpr);
                    format!("{x:.2},{y:.2}")
                })
                .collect();
            svg.push_str(&format!(
                "  <polyline fill=\"none\" stroke=\"{color}\" stroke-width=\"2\" points=\"{}\"/>\n",
                points.join(" ")
            ));
        }

        // Legend, lower right inside the frame
        let legend_x = MARGIN_LEFT + PLOT_SIZE - 230.0;
        let legend_y = MARGIN_TOP + PLOT_SIZE - 20.0 - 18.0 * self.series.len() as f64;
        for (i, series) in self.series.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let y = legend_y + 18.0 * i as f64;
            svg.push_str(&format!(
                "  <line x1=\"{legend_x:.1}\" y1=\"{y:.1}\" x2=\"{:.1}\" y2=\"{y:.1}\" stroke=\"{color}\" stroke-width=\"3\"/>\n",
                legend_x + 20.0
            ));
            svg.push_str(&format!(
                "  <text class=\"label\" x=\"{:.1}\" y=\"{:.1}\">{}</text>\n",
                legend_x + 26.0,
                y + 4.0,
                escape(&series.label)
            ));
        }

        svg.push_str("</svg>\n");
        svg
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())?;
        debug!(path = %path.display(), curves = self.series.len(), "Wrote ROC plot");
        Ok(())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

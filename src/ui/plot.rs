use anyhow::bail;
use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, Line, LineStyle, Plot, PlotPoints, Points};

use ospi_scores::data::compare::{ChartSink, Comparison};

use crate::color::{Side, SideColors};

/// Both axes span the percentage range.
const AXIS_MAX: f64 = 100.0;
const BIN_WIDTH: f64 = 5.0;
const MARGIN: f32 = 120.0;

// ---------------------------------------------------------------------------
// Chart data
// ---------------------------------------------------------------------------

/// Count of values per `BIN_WIDTH` bin over `0..=AXIS_MAX`.
///
/// Values outside the range are clamped into the first or last bin.
pub fn histogram(values: impl Iterator<Item = f64>) -> Vec<usize> {
    let n_bins = (AXIS_MAX / BIN_WIDTH) as usize;
    let mut counts = vec![0; n_bins];
    for v in values {
        let bin = ((v / BIN_WIDTH).floor().max(0.0) as usize).min(n_bins - 1);
        counts[bin] += 1;
    }
    counts
}

/// Scatter of one comparison plus the marginal distributions of each axis.
#[derive(Debug, Clone, Default)]
pub struct ScatterChart {
    pub x_label: String,
    pub y_label: String,
    points: Vec<([f64; 2], Side)>,
    x_bins: Vec<usize>,
    y_bins: Vec<usize>,
    colors: SideColors,
}

impl ScatterChart {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        *self = ScatterChart::default();
    }

    pub fn colors(&self) -> &SideColors {
        &self.colors
    }

    /// Number of schools on `side` of the equality line.
    pub fn count(&self, side: Side) -> usize {
        self.points.iter().filter(|(_, s)| *s == side).count()
    }
}

impl ChartSink for ScatterChart {
    fn render(&mut self, comparison: &Comparison) -> anyhow::Result<()> {
        self.x_label = comparison.x_label.clone();
        self.y_label = comparison.y_label.clone();
        self.points = comparison
            .rows
            .iter()
            .map(|r| ([r.x, r.y], Side::of(r.x, r.y)))
            .collect();
        self.x_bins = histogram(comparison.rows.iter().map(|r| r.x));
        self.y_bins = histogram(comparison.rows.iter().map(|r| r.y));

        if self.points.is_empty() {
            bail!("no school has values for both {} and {}", self.x_label, self.y_label);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rendering (central panel)
// ---------------------------------------------------------------------------

fn bars(bins: &[usize], color: Color32) -> Vec<Bar> {
    bins.iter()
        .enumerate()
        .map(|(i, &count)| {
            Bar::new((i as f64 + 0.5) * BIN_WIDTH, count as f64)
                .width(BIN_WIDTH)
                .fill(color)
        })
        .collect()
}

/// Render the comparison: marginal of x on top, scatter with the equality
/// line, marginal of y on the right.
pub fn comparison_plot(ui: &mut Ui, chart: &ScatterChart) {
    if chart.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Load a report and press Compare");
        });
        return;
    }

    let main_width = (ui.available_width() - MARGIN).max(MARGIN);
    let bar_color = Color32::from_gray(150);

    Plot::new("x_marginal")
        .height(MARGIN)
        .width(main_width)
        .show_axes([false, true])
        .include_x(0.0)
        .include_x(AXIS_MAX)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars(&chart.x_bins, bar_color)));
        });

    ui.horizontal(|ui: &mut Ui| {
        let main_height = ui.available_height();

        Plot::new("comparison_scatter")
            .width(main_width)
            .height(main_height)
            .legend(egui_plot::Legend::default())
            .x_axis_label(chart.x_label.as_str())
            .y_axis_label(chart.y_label.as_str())
            .include_x(0.0)
            .include_x(AXIS_MAX)
            .include_y(0.0)
            .include_y(AXIS_MAX)
            .data_aspect(1.0)
            .allow_boxed_zoom(true)
            .show(ui, |plot_ui| {
                for side in Side::ALL {
                    let points: PlotPoints = chart
                        .points
                        .iter()
                        .filter(|(_, s)| *s == side)
                        .map(|(p, _)| *p)
                        .collect();
                    plot_ui.points(
                        Points::new(points)
                            .name(side.label())
                            .color(chart.colors.color_for(side))
                            .radius(3.0),
                    );
                }

                let diagonal: PlotPoints = vec![[0.0, 0.0], [AXIS_MAX, AXIS_MAX]].into();
                plot_ui.line(
                    Line::new(diagonal)
                        .color(Color32::BLACK)
                        .style(LineStyle::dotted_dense()),
                );
            });

        Plot::new("y_marginal")
            .width(MARGIN)
            .height(main_height)
            .show_axes([true, false])
            .include_y(0.0)
            .include_y(AXIS_MAX)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars(&chart.y_bins, bar_color)).horizontal());
            });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ospi_scores::data::compare::ComparisonRow;
    use ospi_scores::data::pivot::SchoolKey;

    #[test]
    fn histogram_bins() {
        let bins = histogram([0.0, 4.9, 5.0, 99.0, 100.0, 120.0, -3.0].into_iter());
        assert_eq!(bins.len(), 20);
        assert_eq!(bins[0], 3);
        assert_eq!(bins[1], 1);
        assert_eq!(bins[19], 3);
    }

    #[test]
    fn render_fills_chart() {
        let cmp = Comparison {
            x_label: "Low Income".into(),
            y_label: "All Students".into(),
            rows: vec![ComparisonRow {
                key: SchoolKey::new("Seattle", "Lincoln"),
                x: 35.0,
                y: 55.0,
            }],
        };
        let mut chart = ScatterChart::default();
        chart.render(&cmp).unwrap();
        assert!(!chart.is_empty());
        assert_eq!(chart.count(Side::Above), 1);
        assert_eq!(chart.count(Side::Below), 0);
        assert_eq!(chart.x_bins[7], 1);
    }

    #[test]
    fn empty_comparison_fails_to_render() {
        let cmp = Comparison {
            x_label: "a".into(),
            y_label: "b".into(),
            rows: Vec::new(),
        };
        let mut chart = ScatterChart::default();
        assert!(chart.render(&cmp).is_err());
        assert!(chart.is_empty());
    }
}

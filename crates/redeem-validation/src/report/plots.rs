use plotly::common::{DashType, Line, Mode};
use plotly::layout::{Axis, Layout};
use plotly::{Plot, Scatter};

use crate::evaluation::curve::Curve;

/// Line plot of a curve.
pub fn plot_curve(curve: &Curve, title: &str, x_label: &str, y_label: &str) -> Plot {
    let trace = Scatter::new(curve.xs(), curve.ys())
        .mode(Mode::Lines)
        .name(title);

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title(x_label))
        .y_axis(Axis::new().title(y_label));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}

/// ROC curve against the chance diagonal, AUC in the legend.
pub fn plot_roc(curve: &Curve, title: &str) -> Plot {
    let label = format!("ROC (AUC = {:.3})", curve.area());
    let trace = Scatter::new(curve.xs(), curve.ys())
        .mode(Mode::Lines)
        .name(&label);

    let reference_line = Scatter::new(vec![0.0, 1.0], vec![0.0, 1.0])
        .mode(Mode::Lines)
        .name("Chance")
        .line(Line::new().color("red").dash(DashType::Dash));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.add_trace(reference_line);
    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("False positive rate"))
            .y_axis(Axis::new().title("True positive rate")),
    );
    plot
}

/// Gain chart with the zero-gain baseline.
pub fn plot_gain(curve: &Curve, title: &str) -> Plot {
    let mut plot = plot_curve(curve, title, "Fraction of ranking", "Gain");
    let baseline = Scatter::new(vec![0.0, 1.0], vec![0.0, 0.0])
        .mode(Mode::Lines)
        .name("Random")
        .line(Line::new().color("grey").dash(DashType::Dot));
    plot.add_trace(baseline);
    plot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roc_plot_has_curve_and_diagonal() {
        let curve = Curve {
            points: vec![(0.0, 0.0), (0.5, 1.0), (1.0, 1.0)],
        };
        let json = plot_roc(&curve, "Held-out ROC").to_json();
        assert!(json.contains("Held-out ROC"));
        assert!(json.contains("AUC = 0.750"));
        assert!(json.contains("Chance"));
    }
}

//! SVG line charts for training curves
//!
//! Each chart is a standalone SVG file with one polyline per series, x in
//! epochs starting at 1.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const COLOR_TRAIN: &str = "#1f77b4";
pub const COLOR_TEST: &str = "#d62728";

const STYLE: &str = "text{font-family:Helvetica,Arial,sans-serif;fill:#333}\
.title{font-size:17px;font-weight:bold}.label{font-size:13px}.tick{font-size:11px}\
.grid{stroke:#e6e6e6;stroke-width:1}.axis{stroke:#333;stroke-width:1.5}";

const X_TICKS: usize = 10;
const Y_TICKS: usize = 5;

/// A named curve, one y value per epoch
#[derive(Debug, Clone)]
pub struct DataSeries {
    pub name: String,
    pub values: Vec<f64>,
    pub color: String,
}

impl DataSeries {
    pub fn new(name: &str, values: &[f64], color: &str) -> Self {
        Self {
            name: name.to_string(),
            values: values.to_vec(),
            color: color.to_string(),
        }
    }
}

/// How the y axis is scaled and labelled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum YAxis {
    /// Fixed 0..100 range with `%` labels
    Percent,
    /// 0 up to just above the largest finite value
    Auto,
}

/// Plot area inside the SVG canvas and the data ranges it maps
struct Frame {
    width: f64,
    height: f64,
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    epochs: usize,
    y_max: f64,
}

impl Frame {
    fn new(epochs: usize, y_max: f64) -> Self {
        Self {
            width: 760.0,
            height: 460.0,
            left: 72.0,
            top: 52.0,
            right: 150.0,
            bottom: 64.0,
            epochs,
            y_max,
        }
    }

    fn plot_width(&self) -> f64 {
        self.width - self.left - self.right
    }

    fn plot_height(&self) -> f64 {
        self.height - self.top - self.bottom
    }

    fn baseline(&self) -> f64 {
        self.top + self.plot_height()
    }

    fn x(&self, epoch: usize) -> f64 {
        // A single epoch still needs a non-zero span
        let span = self.epochs.max(2) as f64 - 1.0;
        self.left + (epoch as f64 - 1.0) / span * self.plot_width()
    }

    fn y(&self, value: f64) -> f64 {
        let value = if value.is_finite() {
            value.clamp(0.0, self.y_max)
        } else {
            self.y_max
        };
        self.baseline() - value / self.y_max * self.plot_height()
    }
}

/// Render a line chart to an SVG document
pub fn render_line_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    y_axis: YAxis,
    series: &[DataSeries],
) -> String {
    let epochs = series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    let y_max = match y_axis {
        YAxis::Percent => 100.0,
        YAxis::Auto => {
            let peak = series
                .iter()
                .flat_map(|s| s.values.iter().copied())
                .filter(|v| v.is_finite())
                .fold(0.0f64, f64::max);
            if peak > 0.0 {
                peak * 1.05
            } else {
                1.0
            }
        }
    };
    let frame = Frame::new(epochs, y_max);

    let mut svg = String::new();
    // Writing into a String cannot fail
    let _ = write_document(&mut svg, &frame, title, x_label, y_label, y_axis, series);
    svg
}

fn write_document(
    out: &mut String,
    frame: &Frame,
    title: &str,
    x_label: &str,
    y_label: &str,
    y_axis: YAxis,
    series: &[DataSeries],
) -> std::fmt::Result {
    write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = frame.width,
        h = frame.height
    )?;
    write!(out, "<style>{}</style>", STYLE)?;
    out.push_str(r##"<rect width="100%" height="100%" fill="#fff"/>"##);
    write!(
        out,
        r#"<text class="title" x="{}" y="30" text-anchor="middle">{}</text>"#,
        frame.left + frame.plot_width() / 2.0,
        escape_xml(title)
    )?;

    for i in 0..=Y_TICKS {
        let value = frame.y_max * i as f64 / Y_TICKS as f64;
        let y = frame.y(value);
        write!(
            out,
            r#"<line class="grid" x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}"/>"#,
            frame.left,
            frame.left + frame.plot_width()
        )?;
        let tick = match y_axis {
            YAxis::Percent => format!("{:.0}%", value),
            YAxis::Auto => format!("{:.2}", value),
        };
        write!(
            out,
            r#"<text class="tick" x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
            frame.left - 8.0,
            y + 4.0,
            tick
        )?;
    }

    let step = epochs_per_tick(frame.epochs);
    for epoch in (1..=frame.epochs).step_by(step) {
        write!(
            out,
            r#"<text class="tick" x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            frame.x(epoch),
            frame.baseline() + 18.0,
            epoch
        )?;
    }

    write!(
        out,
        r#"<path class="axis" fill="none" d="M{l:.1} {t:.1} V{b:.1} H{r:.1}"/>"#,
        l = frame.left,
        t = frame.top,
        b = frame.baseline(),
        r = frame.left + frame.plot_width()
    )?;
    write!(
        out,
        r#"<text class="label" x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
        frame.left + frame.plot_width() / 2.0,
        frame.height - 18.0,
        escape_xml(x_label)
    )?;
    write!(
        out,
        r#"<text class="label" transform="translate(18 {:.1}) rotate(-90)" text-anchor="middle">{}</text>"#,
        frame.top + frame.plot_height() / 2.0,
        escape_xml(y_label)
    )?;

    let legend_x = frame.width - frame.right + 16.0;
    for (index, curve) in series.iter().enumerate() {
        if !curve.values.is_empty() {
            let points: Vec<String> = curve
                .values
                .iter()
                .enumerate()
                .map(|(i, &v)| format!("{:.2},{:.2}", frame.x(i + 1), frame.y(v)))
                .collect();
            write!(
                out,
                r#"<polyline fill="none" stroke="{}" stroke-width="2" points="{}"/>"#,
                curve.color,
                points.join(" ")
            )?;
        }

        let y = frame.top + 12.0 + index as f64 * 22.0;
        write!(
            out,
            r#"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{}" stroke-width="3"/>"#,
            legend_x,
            legend_x + 22.0,
            curve.color
        )?;
        write!(
            out,
            r#"<text class="tick" x="{:.1}" y="{:.1}">{}</text>"#,
            legend_x + 28.0,
            y + 4.0,
            escape_xml(&curve.name)
        )?;
    }

    out.push_str("</svg>");
    Ok(())
}

fn epochs_per_tick(epochs: usize) -> usize {
    epochs.div_ceil(X_TICKS).max(1)
}

/// Render a line chart and write it to `output_path`
pub fn write_line_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    y_axis: YAxis,
    series: &[DataSeries],
    output_path: &Path,
) -> std::io::Result<()> {
    fs::write(
        output_path,
        render_line_chart(title, x_label, y_label, y_axis, series),
    )
}

fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_polyline_per_series() {
        let series = vec![
            DataSeries::new("train", &[10.0, 35.5, 61.8], COLOR_TRAIN),
            DataSeries::new("test", &[12.0, 30.1, 55.0], COLOR_TEST),
        ];

        let svg = render_line_chart("CIFAR-10 accuracy", "Epoch", "Accuracy", YAxis::Percent, &series);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains("100%"));
    }

    #[test]
    fn test_single_epoch_renders_finite_coordinates() {
        let series = vec![DataSeries::new("loss", &[2.3], COLOR_TRAIN)];
        let svg = render_line_chart("loss", "Epoch", "Loss", YAxis::Auto, &series);
        assert!(!svg.contains("NaN"));
        assert!(!svg.contains("inf"));
    }

    #[test]
    fn test_non_finite_values_are_pinned_to_the_top() {
        let series = vec![DataSeries::new("loss", &[1.0, f64::NAN, 0.5], COLOR_TRAIN)];
        let svg = render_line_chart("loss", "Epoch", "Loss", YAxis::Auto, &series);
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_tick_thinning() {
        assert_eq!(epochs_per_tick(0), 1);
        assert_eq!(epochs_per_tick(7), 1);
        assert_eq!(epochs_per_tick(200), 20);
    }

    #[test]
    fn test_title_is_escaped() {
        let svg = render_line_chart("a < b & c", "x", "y", YAxis::Auto, &[]);
        assert!(svg.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn test_write_line_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.svg");
        let series = vec![DataSeries::new("train", &[1.0, 0.5], COLOR_TRAIN)];
        write_line_chart("loss", "Epoch", "Loss", YAxis::Auto, &series, &path).unwrap();
        assert!(path.exists());
    }
}

//! Static SVG charts: bar chart, box plot and annotated heat map.
//!
//! Charts are plain data structs; `render_svg` builds the document as a
//! string and `write_svg` puts it on disk. Nothing here computes statistics.

use std::path::Path;

use crate::credit::eda::BoxStats;
use crate::error::Result;

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 440.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 70.0;
const Y_TICKS: usize = 5;
const BAR_COLOR: &str = "#4c72b0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// 0.1204 → "12.04%"
    Percent,
    /// 0.1204 → "0.12"
    Decimal,
    /// 700.0 → "700"
    Integer,
}

impl ValueFormat {
    pub fn format(&self, value: f64) -> String {
        match self {
            ValueFormat::Percent => format!("{:.2}%", value * 100.0),
            ValueFormat::Decimal => format!("{:.2}", value),
            ValueFormat::Integer => format!("{:.0}", value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<(String, f64)>,
    /// Fixed top of the y axis; derived from the data when None.
    pub y_max: Option<f64>,
    pub value_format: ValueFormat,
}

#[derive(Debug, Clone)]
pub struct BoxPlot {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub boxes: Vec<(String, BoxStats)>,
}

#[derive(Debug, Clone)]
pub struct Heatmap {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub columns: Vec<String>,
    /// Row label and one optional cell per column.
    pub rows: Vec<(String, Vec<Option<f64>>)>,
}

// ── Shared plot frame ───────────────────────────────────────────────

struct Frame {
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn plot_width() -> f64 {
        WIDTH - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn plot_height() -> f64 {
        HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
    }

    fn y(&self, value: f64) -> f64 {
        let span = self.y_max - self.y_min;
        let t = if span > 0.0 {
            (value - self.y_min) / span
        } else {
            0.0
        };
        MARGIN_TOP + Self::plot_height() * (1.0 - t)
    }

    fn slot_center(index: usize, count: usize) -> f64 {
        let slot = Self::plot_width() / count.max(1) as f64;
        MARGIN_LEFT + slot * (index as f64 + 0.5)
    }

    fn slot_width(count: usize) -> f64 {
        Self::plot_width() / count.max(1) as f64
    }
}

fn open_document(out: &mut String, title: &str, x_label: &str, y_label: &str) {
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}" style="background-color: white;" font-family="sans-serif">"#,
        WIDTH, HEIGHT, WIDTH, HEIGHT
    ));
    out.push('\n');
    out.push_str(&format!(
        r#"<text class="title" x="{:.1}" y="28" text-anchor="middle" font-size="18">{}</text>"#,
        WIDTH / 2.0,
        escape(title)
    ));
    out.push('\n');
    out.push_str(&format!(
        r#"<text class="x-label" x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13">{}</text>"#,
        MARGIN_LEFT + Frame::plot_width() / 2.0,
        HEIGHT - 18.0,
        escape(x_label)
    ));
    out.push('\n');
    out.push_str(&format!(
        r#"<text class="y-label" x="20" y="{:.1}" text-anchor="middle" font-size="13" transform="rotate(-90 20 {:.1})">{}</text>"#,
        MARGIN_TOP + Frame::plot_height() / 2.0,
        MARGIN_TOP + Frame::plot_height() / 2.0,
        escape(y_label)
    ));
    out.push('\n');
}

fn draw_axes(out: &mut String, frame: &Frame, format: ValueFormat) {
    let bottom = MARGIN_TOP + Frame::plot_height();
    out.push_str(&format!(
        r##"<line x1="{0:.1}" y1="{1:.1}" x2="{0:.1}" y2="{2:.1}" stroke="#333"/>"##,
        MARGIN_LEFT, MARGIN_TOP, bottom
    ));
    out.push('\n');
    out.push_str(&format!(
        r##"<line x1="{:.1}" y1="{2:.1}" x2="{:.1}" y2="{2:.1}" stroke="#333"/>"##,
        MARGIN_LEFT,
        WIDTH - MARGIN_RIGHT,
        bottom
    ));
    out.push('\n');
    for i in 0..=Y_TICKS {
        let value = frame.y_min + (frame.y_max - frame.y_min) * i as f64 / Y_TICKS as f64;
        let y = frame.y(value);
        out.push_str(&format!(
            r##"<line x1="{0:.1}" y1="{1:.1}" x2="{2:.1}" y2="{1:.1}" stroke="#ddd"/>"##,
            MARGIN_LEFT,
            y,
            WIDTH - MARGIN_RIGHT
        ));
        out.push('\n');
        out.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
            MARGIN_LEFT - 6.0,
            y + 4.0,
            escape(&format.format(value))
        ));
        out.push('\n');
    }
}

fn draw_category_labels<'a>(out: &mut String, labels: impl ExactSizeIterator<Item = &'a str>) {
    let count = labels.len();
    let y = MARGIN_TOP + Frame::plot_height() + 18.0;
    for (i, label) in labels.enumerate() {
        out.push_str(&format!(
            r#"<text class="category" x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11">{}</text>"#,
            Frame::slot_center(i, count),
            y,
            escape(label)
        ));
        out.push('\n');
    }
}

fn write_document(path: &Path, svg: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, svg)?;
    Ok(())
}

// ── Bar chart ───────────────────────────────────────────────────────

impl BarChart {
    pub fn render_svg(&self) -> String {
        let data_max = self.bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
        let y_max = match self.y_max {
            Some(v) if v > 0.0 => v,
            _ if data_max > 0.0 => data_max * 1.15,
            _ => 1.0,
        };
        let frame = Frame { y_min: 0.0, y_max };

        let mut out = String::new();
        open_document(&mut out, &self.title, &self.x_label, &self.y_label);
        draw_axes(&mut out, &frame, self.value_format);

        let count = self.bars.len();
        let bar_width = Frame::slot_width(count) * 0.6;
        for (i, (label, value)) in self.bars.iter().enumerate() {
            let cx = Frame::slot_center(i, count);
            let top = frame.y(value.min(y_max));
            let bottom = frame.y(0.0);
            out.push_str(&format!(
                r#"<rect class="bar" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}</title></rect>"#,
                cx - bar_width / 2.0,
                top,
                bar_width,
                (bottom - top).max(0.0),
                BAR_COLOR,
                escape(label)
            ));
            out.push('\n');
            out.push_str(&format!(
                r#"<text class="value" x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11">{}</text>"#,
                cx,
                top - 4.0,
                escape(&self.value_format.format(*value))
            ));
            out.push('\n');
        }
        draw_category_labels(&mut out, self.bars.iter().map(|(l, _)| l.as_str()));

        out.push_str("</svg>\n");
        out
    }

    pub fn write_svg(&self, path: &Path) -> Result<()> {
        write_document(path, &self.render_svg())
    }
}

// ── Box plot ────────────────────────────────────────────────────────

impl BoxPlot {
    pub fn render_svg(&self) -> String {
        let (lo, hi) = self
            .boxes
            .iter()
            .flat_map(|(_, b)| [b.min, b.max])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let (y_min, y_max) = if lo.is_finite() && hi > lo {
            let pad = (hi - lo) * 0.05;
            ((lo - pad).max(0.0), hi + pad)
        } else if lo.is_finite() {
            (0.0, lo.abs().max(1.0) * 2.0)
        } else {
            (0.0, 1.0)
        };
        let frame = Frame { y_min, y_max };

        let mut out = String::new();
        open_document(&mut out, &self.title, &self.x_label, &self.y_label);
        draw_axes(&mut out, &frame, ValueFormat::Integer);

        let count = self.boxes.len();
        let box_width = Frame::slot_width(count) * 0.4;
        for (i, (label, b)) in self.boxes.iter().enumerate() {
            let cx = Frame::slot_center(i, count);
            let left = cx - box_width / 2.0;
            out.push_str(&format!(
                r##"<line class="whisker" x1="{0:.1}" y1="{1:.1}" x2="{0:.1}" y2="{2:.1}" stroke="#333"/>"##,
                cx,
                frame.y(b.upper_whisker),
                frame.y(b.lower_whisker)
            ));
            out.push('\n');
            out.push_str(&format!(
                r##"<rect class="box" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" stroke="#333"><title>{}</title></rect>"##,
                left,
                frame.y(b.q3),
                box_width,
                (frame.y(b.q1) - frame.y(b.q3)).max(0.0),
                BAR_COLOR,
                escape(label)
            ));
            out.push('\n');
            out.push_str(&format!(
                r##"<line class="median" x1="{:.1}" y1="{2:.1}" x2="{:.1}" y2="{2:.1}" stroke="#fff" stroke-width="2"/>"##,
                left,
                left + box_width,
                frame.y(b.median)
            ));
            out.push('\n');
            for &o in &b.outliers {
                out.push_str(&format!(
                    r##"<circle class="outlier" cx="{:.1}" cy="{:.1}" r="2.5" fill="none" stroke="#333"/>"##,
                    cx,
                    frame.y(o)
                ));
                out.push('\n');
            }
        }
        draw_category_labels(&mut out, self.boxes.iter().map(|(l, _)| l.as_str()));

        out.push_str("</svg>\n");
        out
    }

    pub fn write_svg(&self, path: &Path) -> Result<()> {
        write_document(path, &self.render_svg())
    }
}

// ── Heat map ────────────────────────────────────────────────────────

/// White-to-red ramp for t in [0, 1].
fn heat_color(t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        lerp(255.0, 165.0),
        lerp(245.0, 15.0),
        lerp(240.0, 21.0)
    )
}

impl Heatmap {
    pub fn render_svg(&self) -> String {
        let max_value = self
            .rows
            .iter()
            .flat_map(|(_, cells)| cells.iter().flatten().copied())
            .fold(0.0_f64, f64::max);

        let mut out = String::new();
        open_document(&mut out, &self.title, &self.x_label, &self.y_label);

        let label_gutter = 90.0;
        let left = MARGIN_LEFT + label_gutter;
        let cell_w = (WIDTH - left - MARGIN_RIGHT) / self.columns.len().max(1) as f64;
        let cell_h = Frame::plot_height() / self.rows.len().max(1) as f64;

        for (r, (row_label, cells)) in self.rows.iter().enumerate() {
            let y = MARGIN_TOP + cell_h * r as f64;
            out.push_str(&format!(
                r#"<text class="row-label" x="{:.1}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
                left - 6.0,
                y + cell_h / 2.0 + 4.0,
                escape(row_label)
            ));
            out.push('\n');
            for (c, cell) in cells.iter().enumerate().take(self.columns.len()) {
                let x = left + cell_w * c as f64;
                match cell {
                    Some(v) => {
                        let t = if max_value > 0.0 { v / max_value } else { 0.0 };
                        out.push_str(&format!(
                            r##"<rect class="cell" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" stroke="#fff"/>"##,
                            x,
                            y,
                            cell_w,
                            cell_h,
                            heat_color(t)
                        ));
                        out.push('\n');
                        let text_color = if t > 0.6 { "#fff" } else { "#222" };
                        out.push_str(&format!(
                            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11" fill="{}">{:.2}</text>"#,
                            x + cell_w / 2.0,
                            y + cell_h / 2.0 + 4.0,
                            text_color,
                            v
                        ));
                        out.push('\n');
                    }
                    None => {
                        out.push_str(&format!(
                            r##"<rect class="cell empty" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="#eeeeee" stroke="#fff"/>"##,
                            x, y, cell_w, cell_h
                        ));
                        out.push('\n');
                    }
                }
            }
        }

        for (c, col) in self.columns.iter().enumerate() {
            out.push_str(&format!(
                r#"<text class="column-label" x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11">{}</text>"#,
                left + cell_w * (c as f64 + 0.5),
                MARGIN_TOP + Frame::plot_height() + 18.0,
                escape(col)
            ));
            out.push('\n');
        }

        out.push_str("</svg>\n");
        out
    }

    pub fn write_svg(&self, path: &Path) -> Result<()> {
        write_document(path, &self.render_svg())
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar_chart() -> BarChart {
        BarChart {
            title: "Conversion Rate".to_string(),
            x_label: "Group".to_string(),
            y_label: "Rate".to_string(),
            bars: vec![("control".to_string(), 0.1204), ("treatment".to_string(), 0.1188)],
            y_max: None,
            value_format: ValueFormat::Percent,
        }
    }

    fn box_stats(values: &[f64]) -> BoxStats {
        BoxStats::from_values(values).unwrap()
    }

    #[test]
    fn value_format_variants() {
        assert_eq!(ValueFormat::Percent.format(0.1204), "12.04%");
        assert_eq!(ValueFormat::Decimal.format(0.456), "0.46");
        assert_eq!(ValueFormat::Integer.format(700.0), "700");
    }

    #[test]
    fn bar_chart_has_one_rect_per_bar_and_percent_labels() {
        let svg = bar_chart().render_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches(r#"class="bar""#).count(), 2);
        assert!(svg.contains("12.04%"));
        assert!(svg.contains("11.88%"));
        assert!(svg.contains(">treatment<"));
    }

    #[test]
    fn bar_chart_with_all_zero_values_still_renders() {
        let mut chart = bar_chart();
        chart.bars = vec![("a".into(), 0.0), ("b".into(), 0.0)];
        let svg = chart.render_svg();
        assert_eq!(svg.matches(r#"class="bar""#).count(), 2);
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn labels_are_xml_escaped() {
        let mut chart = bar_chart();
        chart.title = "radio/TV & <misc>".to_string();
        let svg = chart.render_svg();
        assert!(svg.contains("radio/TV &amp; &lt;misc&gt;"));
    }

    #[test]
    fn write_svg_creates_parent_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("figures").join("eda").join("chart.svg");
        bar_chart().write_svg(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Conversion Rate"));
    }

    #[test]
    fn box_plot_draws_outliers() {
        let plot = BoxPlot {
            title: "Credit Amount".into(),
            x_label: "Risk".into(),
            y_label: "Amount".into(),
            boxes: vec![
                ("Good Credit".into(), box_stats(&[1.0, 2.0, 3.0, 4.0, 100.0])),
                ("Bad Credit".into(), box_stats(&[2.0, 3.0, 4.0])),
            ],
        };
        let svg = plot.render_svg();
        assert_eq!(svg.matches(r#"class="box""#).count(), 2);
        assert_eq!(svg.matches(r#"class="outlier""#).count(), 1);
    }

    #[test]
    fn heatmap_annotates_cells_and_greys_missing() {
        let map = Heatmap {
            title: "Bad rate".into(),
            x_label: "Duration".into(),
            y_label: "Purpose".into(),
            columns: vec!["<=12".into(), "13-24".into()],
            rows: vec![
                ("car".into(), vec![Some(0.25), Some(0.5)]),
                ("vacation/others".into(), vec![None, Some(1.0)]),
            ],
        };
        let svg = map.render_svg();
        assert!(svg.contains(">0.25<"));
        assert!(svg.contains(">1.00<"));
        assert_eq!(svg.matches("cell empty").count(), 1);
        assert!(svg.contains("&lt;=12"));
    }

    #[test]
    fn heat_color_endpoints() {
        assert_eq!(heat_color(0.0), "#fff5f0");
        assert_eq!(heat_color(1.0), "#a50f15");
        assert_eq!(heat_color(7.0), "#a50f15");
    }
}

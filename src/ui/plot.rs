use std::f32::consts::TAU;
use std::ops::RangeInclusive;

use eframe::egui::{self, Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Shape, Stroke, Ui, Vec2};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, Plot, Points};

use crate::chart::stats::{box_summary, histogram_bins, numbers, partition};
use crate::chart::{ChartDescription, Encoding, Layout};
use crate::color::{diverging, ColorMap};
use crate::data::model::{CellValue, Dataset};
use crate::state::AppState;

const DEFAULT_FILL: Color32 = Color32::from_rgb(99, 110, 250);

// ---------------------------------------------------------------------------
// Chart view (central panel)
// ---------------------------------------------------------------------------

/// Render the current chart, or a hint when there is none.
pub fn chart_view(ui: &mut Ui, state: &AppState) {
    if state.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to get started  (File → Open…)");
        });
        return;
    }
    let Some(chart) = &state.chart else {
        ui.centered_and_justified(|ui: &mut Ui| {
            if state.loading {
                ui.spinner();
            } else {
                ui.label("Describe a chart on the left and press Generate.");
            }
        });
        return;
    };

    egui::Frame::default()
        .inner_margin(frame_margin(&chart.layout))
        .show(ui, |ui: &mut Ui| {
            ui.heading(&chart.title);
            ui.add_space(8.0);
            draw(ui, chart);
        });
}

fn frame_margin(layout: &Layout) -> egui::Margin {
    let side = |v: u16| i8::try_from(v).unwrap_or(i8::MAX);
    egui::Margin {
        left: side(layout.margin.left),
        right: side(layout.margin.right),
        top: side(layout.margin.top),
        bottom: side(layout.margin.bottom),
    }
}

fn draw(ui: &mut Ui, chart: &ChartDescription) {
    let id = chart.title.as_str();
    let data = &chart.data;
    match &chart.encoding {
        Encoding::Bar { x, y, color, grouped } => {
            bar_chart(ui, id, data, x, y, color.as_deref(), *grouped)
        }
        Encoding::Pie { names, values } => pie_chart(ui, data, names, values),
        Encoding::Line { x, y, color } => {
            xy_chart(ui, id, data, x.as_deref(), y, color.as_deref(), Mark::Line)
        }
        Encoding::Scatter { x, y, color } => {
            xy_chart(ui, id, data, x.as_deref(), y, color.as_deref(), Mark::Points)
        }
        Encoding::Histogram { x } => histogram(ui, id, data, x),
        Encoding::Box { x, y } => box_chart(ui, id, data, x.as_deref(), y),
        Encoding::Heatmap { labels } => heatmap(ui, data, labels),
        Encoding::Treemap { path, values } => treemap(ui, data, path, values),
    }
}

// ---------------------------------------------------------------------------
// Axis helpers
// ---------------------------------------------------------------------------

/// Distinct non-null values of `column` in first-seen order.
fn categories(data: &Dataset, column: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for value in data.column_values(column).into_iter().flatten() {
        if value.is_null() {
            continue;
        }
        let label = value.to_string();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// Tick labels for a categorical axis placed at 0, 1, 2, …
fn category_axis(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let i = mark.value.round();
        if (mark.value - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        labels.get(i as usize).cloned().unwrap_or_default()
    }
}

/// Per-row x positions. Numeric columns plot as-is, anything else becomes
/// a categorical axis whose labels are returned alongside. Without an x
/// column rows are plotted against their index.
fn x_positions(data: &Dataset, x: Option<&str>) -> (Vec<f64>, Option<Vec<String>>) {
    let values: Vec<&CellValue> = match x.and_then(|x| data.column_values(x)) {
        Some(values) => values.collect(),
        None => return ((0..data.len()).map(|i| i as f64).collect(), None),
    };

    if values.iter().all(|v| v.is_null() || v.to_number().is_some()) {
        let xs = values
            .iter()
            .map(|v| v.to_number().unwrap_or(f64::NAN))
            .collect();
        return (xs, None);
    }

    let labels = x.map(|x| categories(data, x)).unwrap_or_default();
    let xs = values
        .iter()
        .map(|v| {
            let label = v.to_string();
            labels
                .iter()
                .position(|l| *l == label)
                .map_or(f64::NAN, |p| p as f64)
        })
        .collect();
    (xs, Some(labels))
}

// ---------------------------------------------------------------------------
// egui_plot charts
// ---------------------------------------------------------------------------

fn bar_chart(
    ui: &mut Ui,
    id: &str,
    data: &Dataset,
    x: &str,
    y: &str,
    color: Option<&[String]>,
    grouped: bool,
) {
    let cats = categories(data, x);
    let heights = numbers(data, y);
    let xi = data.column_index(x);
    let groups = partition(data, color);
    let colors = ColorMap::new(groups.iter().map(|(label, _)| label.as_str()));

    let slots = if grouped { groups.len().max(1) } else { 1 };
    let width = 0.8 / slots as f64;

    let charts: Vec<BarChart> = groups
        .iter()
        .enumerate()
        .map(|(g, (label, rows))| {
            let offset = if grouped {
                -0.4 + width * (g as f64 + 0.5)
            } else {
                0.0
            };
            let mut totals = vec![0.0; cats.len()];
            for &r in rows {
                let Some(k) = xi else { continue };
                let cat = data.rows[r][k].to_string();
                if let Some(pos) = cats.iter().position(|c| *c == cat) {
                    if heights[r].is_finite() {
                        totals[pos] += heights[r];
                    }
                }
            }

            let fill = if color.is_some() {
                colors.color_for(label)
            } else {
                DEFAULT_FILL
            };
            let bars = totals
                .iter()
                .zip(&cats)
                .enumerate()
                .map(|(i, (h, cat))| {
                    Bar::new(i as f64 + offset, *h)
                        .width(width)
                        .name(cat)
                        .fill(fill)
                })
                .collect();
            let name = if color.is_some() { label.as_str() } else { y };
            BarChart::new(bars).name(name).color(fill)
        })
        .collect();

    Plot::new(("bar", id))
        .legend(Legend::default())
        .x_axis_label(x)
        .y_axis_label(y)
        .x_axis_formatter(category_axis(cats))
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

#[derive(Clone, Copy)]
enum Mark {
    Line,
    Points,
}

fn xy_chart(
    ui: &mut Ui,
    id: &str,
    data: &Dataset,
    x: Option<&str>,
    y: &str,
    color: Option<&[String]>,
    mark: Mark,
) {
    let (xs, labels) = x_positions(data, x);
    let ys = numbers(data, y);
    let groups = partition(data, color);
    let colors = ColorMap::new(groups.iter().map(|(label, _)| label.as_str()));

    let series: Vec<(String, Color32, Vec<[f64; 2]>)> = groups
        .into_iter()
        .map(|(label, rows)| {
            let points = rows
                .iter()
                .map(|&r| [xs[r], ys[r]])
                .filter(|[a, b]| a.is_finite() && b.is_finite())
                .collect();
            match color {
                Some(_) => (label.clone(), colors.color_for(&label), points),
                None => (y.to_string(), DEFAULT_FILL, points),
            }
        })
        .collect();

    let mut plot = Plot::new(("xy", id))
        .legend(Legend::default())
        .x_axis_label(x.unwrap_or("index"))
        .y_axis_label(y);
    if let Some(labels) = labels {
        plot = plot.x_axis_formatter(category_axis(labels));
    }
    plot.show(ui, |plot_ui| {
        for (name, color, points) in series {
            match mark {
                Mark::Line => plot_ui.line(Line::new(points).name(name).color(color).width(1.5)),
                Mark::Points => {
                    plot_ui.points(Points::new(points).name(name).color(color).radius(3.0))
                }
            }
        }
    });
}

fn histogram(ui: &mut Ui, id: &str, data: &Dataset, x: &str) {
    let bars = histogram_bins(&numbers(data, x))
        .iter()
        .map(|b| {
            Bar::new((b.start + b.end) / 2.0, b.count as f64)
                .width(b.end - b.start)
                .name(format!("{:.2} – {:.2}", b.start, b.end))
                .fill(DEFAULT_FILL)
        })
        .collect();

    Plot::new(("histogram", id))
        .legend(Legend::default())
        .x_axis_label(x)
        .y_axis_label("count")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(x).color(DEFAULT_FILL));
        });
}

fn box_chart(ui: &mut Ui, id: &str, data: &Dataset, x: Option<&[String]>, y: &str) {
    let ys = numbers(data, y);
    let groups = partition(data, x);
    let colors = ColorMap::new(groups.iter().map(|(label, _)| label.as_str()));
    let labels: Vec<String> = groups
        .iter()
        .map(|(label, _)| if x.is_some() { label.clone() } else { y.to_string() })
        .collect();

    let mut boxes = Vec::new();
    let mut outliers = Vec::new();
    for (g, (label, rows)) in groups.iter().enumerate() {
        let values: Vec<f64> = rows.iter().map(|&r| ys[r]).collect();
        let Some(summary) = box_summary(&values) else {
            continue;
        };
        let color = colors.color_for(label);
        let name = &labels[g];
        let spread = BoxSpread::new(
            summary.lower_whisker,
            summary.q1,
            summary.median,
            summary.q3,
            summary.upper_whisker,
        );
        let elem = BoxElem::new(g as f64, spread)
            .name(name)
            .box_width(0.5)
            .whisker_width(0.25)
            .fill(color.gamma_multiply(0.4))
            .stroke(Stroke::new(1.5, color));
        boxes.push(BoxPlot::new(vec![elem]).name(name).color(color));

        if !summary.outliers.is_empty() {
            let points: Vec<[f64; 2]> = summary.outliers.iter().map(|o| [g as f64, *o]).collect();
            outliers.push(Points::new(points).name(name).color(color).radius(2.5));
        }
    }

    let x_label = x.map(|cols| cols.join(", ")).unwrap_or_default();
    Plot::new(("box", id))
        .legend(Legend::default())
        .x_axis_label(x_label)
        .y_axis_label(y)
        .x_axis_formatter(category_axis(labels))
        .show(ui, |plot_ui| {
            for b in boxes {
                plot_ui.box_plot(b);
            }
            for p in outliers {
                plot_ui.points(p);
            }
        });
}

// ---------------------------------------------------------------------------
// Painted charts
// ---------------------------------------------------------------------------

fn pie_chart(ui: &mut Ui, data: &Dataset, names: &[String], values: &str) {
    let vals = numbers(data, values);
    let slices: Vec<(String, f64)> = partition(data, Some(names))
        .into_iter()
        .map(|(label, rows)| {
            let sum = rows
                .iter()
                .map(|&r| vals[r])
                .filter(|v| v.is_finite() && *v > 0.0)
                .sum();
            (label, sum)
        })
        .filter(|(_, v)| *v > 0.0)
        .collect();
    let total: f64 = slices.iter().map(|(_, v)| v).sum();
    if total <= 0.0 {
        ui.label("Nothing to draw: no positive values.");
        return;
    }

    let colors = ColorMap::new(slices.iter().map(|(label, _)| label.as_str()));
    let legend_width = 180.0;
    let avail = ui.available_size();
    let diameter = (avail.x - legend_width).min(avail.y).max(120.0);
    let (response, painter) =
        ui.allocate_painter(Vec2::new(diameter + legend_width, diameter), Sense::hover());
    let center = response.rect.min + Vec2::splat(diameter / 2.0);
    let radius = diameter / 2.0 * 0.9;
    let pointer = response.hover_pos();
    let mut hovered = None;

    let mut start = -TAU / 4.0;
    for (label, value) in &slices {
        let share = (value / total) as f32;
        let sweep = share * TAU;
        wedge(&painter, center, radius, start, sweep, colors.color_for(label));
        if share >= 0.04 {
            painter.text(
                center + Vec2::angled(start + sweep / 2.0) * radius * 0.65,
                Align2::CENTER_CENTER,
                format!("{:.1}%", share * 100.0),
                FontId::proportional(12.0),
                Color32::BLACK,
            );
        }
        if pointer.is_some_and(|p| in_wedge(p - center, radius, start, sweep)) {
            hovered = Some(format!("{label}: {value} ({:.1}%)", share * 100.0));
        }
        start += sweep;
    }

    let text_color = ui.visuals().text_color();
    let legend_x = response.rect.min.x + diameter + 16.0;
    for (i, (label, color)) in colors.legend_entries().into_iter().enumerate() {
        let y = response.rect.min.y + 10.0 + i as f32 * 18.0;
        painter.rect_filled(
            Rect::from_min_size(Pos2::new(legend_x, y - 5.0), Vec2::splat(10.0)),
            2.0,
            color,
        );
        painter.text(
            Pos2::new(legend_x + 16.0, y),
            Align2::LEFT_CENTER,
            label,
            FontId::proportional(12.0),
            text_color,
        );
    }

    if let Some(text) = hovered {
        response.on_hover_text_at_pointer(text);
    }
}

/// Filled pie wedge, split so every piece stays convex.
fn wedge(painter: &Painter, center: Pos2, radius: f32, start: f32, sweep: f32, color: Color32) {
    const SEGMENTS: usize = 8;
    let pieces = (sweep / (TAU / 8.0)).ceil().max(1.0) as usize;
    let step = sweep / pieces as f32;
    for k in 0..pieces {
        let a0 = start + k as f32 * step;
        let mut points = vec![center];
        points.extend(
            (0..=SEGMENTS).map(|s| center + Vec2::angled(a0 + step * s as f32 / SEGMENTS as f32) * radius),
        );
        painter.add(Shape::convex_polygon(points, color, Stroke::NONE));
    }
}

fn in_wedge(offset: Vec2, radius: f32, start: f32, sweep: f32) -> bool {
    if offset.length() > radius {
        return false;
    }
    (offset.angle() - start).rem_euclid(TAU) < sweep
}

/// Correlation matrix as a coloured grid, row labels left, column labels on top.
fn heatmap(ui: &mut Ui, data: &Dataset, labels: &[String]) {
    let n = labels.len();
    if n == 0 {
        return;
    }
    let label_space = 110.0;
    let avail = ui.available_size();
    let cell = ((avail.x - label_space).min(avail.y - label_space) / n as f32).clamp(12.0, 80.0);
    let (response, painter) =
        ui.allocate_painter(Vec2::splat(label_space + cell * n as f32), Sense::hover());
    let origin = response.rect.min + Vec2::splat(label_space);
    let text_color = ui.visuals().text_color();
    let pointer = response.hover_pos();
    let mut hovered = None;

    for (j, label) in labels.iter().enumerate() {
        painter.text(
            Pos2::new(origin.x + (j as f32 + 0.5) * cell, origin.y - 6.0),
            Align2::CENTER_BOTTOM,
            label,
            FontId::proportional(12.0),
            text_color,
        );
    }

    for (i, row) in data.rows.iter().enumerate().take(n) {
        painter.text(
            Pos2::new(origin.x - 6.0, origin.y + (i as f32 + 0.5) * cell),
            Align2::RIGHT_CENTER,
            &labels[i],
            FontId::proportional(12.0),
            text_color,
        );
        for j in 0..n {
            let value = row.get(j + 1).and_then(CellValue::as_f64);
            let rect = Rect::from_min_size(
                origin + Vec2::new(j as f32 * cell, i as f32 * cell),
                Vec2::splat(cell),
            );
            painter.rect_filled(rect.shrink(0.5), 0.0, diverging(value));
            if let Some(v) = value.filter(|_| cell >= 36.0) {
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    format!("{v:.2}"),
                    FontId::proportional(11.0),
                    Color32::BLACK,
                );
            }
            if pointer.is_some_and(|p| rect.contains(p)) {
                let shown = value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"));
                hovered = Some(format!("{} × {}: {shown}", labels[i], labels[j]));
            }
        }
    }

    if let Some(text) = hovered {
        response.on_hover_text_at_pointer(text);
    }
}

type Leaf = (Vec<String>, f64);

fn treemap(ui: &mut Ui, data: &Dataset, path: &[String], values: &str) {
    let vals = numbers(data, values);
    let idx: Vec<usize> = path.iter().filter_map(|c| data.column_index(c)).collect();
    let leaves: Vec<Leaf> = data
        .rows
        .iter()
        .zip(&vals)
        .filter(|(_, v)| v.is_finite() && **v > 0.0)
        .map(|(row, v)| (idx.iter().map(|&k| row[k].to_string()).collect(), *v))
        .collect();
    if idx.is_empty() || leaves.is_empty() {
        ui.label("Nothing to draw: no positive values.");
        return;
    }

    let colors = ColorMap::new(leaves.iter().map(|(p, _)| p[0].as_str()));
    let size = ui.available_size().max(Vec2::splat(120.0));
    let (response, painter) = ui.allocate_painter(size, Sense::hover());
    let refs: Vec<&Leaf> = leaves.iter().collect();

    let mut tiles = Tiles {
        painter: &painter,
        colors: &colors,
        pointer: response.hover_pos(),
        hovered: None,
    };
    tiles.split(response.rect, &refs, 0);

    if let Some(text) = tiles.hovered {
        response.on_hover_text_at_pointer(text);
    }
}

struct Tiles<'a> {
    painter: &'a Painter,
    colors: &'a ColorMap,
    pointer: Option<Pos2>,
    hovered: Option<String>,
}

impl Tiles<'_> {
    /// Slice-and-dice: divide `rect` among the groups at `depth`, switching
    /// between columns and rows at each level.
    fn split(&mut self, rect: Rect, leaves: &[&Leaf], depth: usize) {
        if depth >= leaves[0].0.len() {
            self.tile(rect, leaves);
            return;
        }

        let mut groups: Vec<(&str, Vec<&Leaf>)> = Vec::new();
        for &leaf in leaves {
            let key = leaf.0[depth].as_str();
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(leaf),
                None => groups.push((key, vec![leaf])),
            }
        }

        let total: f64 = leaves.iter().map(|l| l.1).sum();
        let mut offset = 0.0;
        for (_, members) in &groups {
            let share = (members.iter().map(|l| l.1).sum::<f64>() / total) as f32;
            let sub = if depth % 2 == 0 {
                Rect::from_min_size(
                    rect.min + Vec2::new(rect.width() * offset, 0.0),
                    Vec2::new(rect.width() * share, rect.height()),
                )
            } else {
                Rect::from_min_size(
                    rect.min + Vec2::new(0.0, rect.height() * offset),
                    Vec2::new(rect.width(), rect.height() * share),
                )
            };
            offset += share;
            self.split(sub, members, depth + 1);
        }
    }

    fn tile(&mut self, rect: Rect, leaves: &[&Leaf]) {
        let path = &leaves[0].0;
        let value: f64 = leaves.iter().map(|l| l.1).sum();
        let top = path.first().map_or("", String::as_str);
        self.painter
            .rect_filled(rect.shrink(1.0), 2.0, self.colors.color_for(top));

        if rect.width() > 40.0 && rect.height() > 18.0 {
            self.painter.text(
                rect.left_top() + Vec2::new(4.0, 4.0),
                Align2::LEFT_TOP,
                path.last().map_or("", String::as_str),
                FontId::proportional(12.0),
                Color32::BLACK,
            );
        }
        if self.pointer.is_some_and(|p| rect.contains(p)) {
            self.hovered = Some(format!("{}: {value}", path.join(" / ")));
        }
    }
}

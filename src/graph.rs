use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{VizError, VizResult};
use crate::figure::{
    Axis, BarTrace, BoxTrace, ChartSpec, ColorBar, Histogram2dTrace, HistogramTrace, Layout,
    Marker, PieTrace, ScatterTrace, Trace,
};
use crate::forms::{ChartType, FieldBindings, Role};
use crate::palette::Palette;
use crate::table::{CellValue, Column, TabularData};

/// How the palette is applied to Bar, Line, Histogram and Box charts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteMode {
    /// The palette is a real color scale for every chart type.
    #[default]
    Continuous,

    /// The palette name is used as the name of a column to group and color
    /// by. Charts fail (and fall back to the empty figure) unless the data
    /// happens to have a column with that name.
    Compat,
}

/// Builds chart figures from a table and the user's selections
///
/// The dispatcher holds no state besides its palette mode, so rendering the
/// same inputs twice yields equal figures.
///
/// # Examples
/// ```
/// use genviz::forms::{ChartType, FieldBindings, Role};
/// use genviz::graph::ChartDispatcher;
/// use genviz::loader::UploadedFile;
/// use genviz::palette::Palette;
///
/// let data = UploadedFile::from_bytes("pets.csv", b"pet\ncat\ndog\ncat\n")
///     .decode()
///     .unwrap();
/// let bindings = FieldBindings::new().with(Role::Value, "pet");
///
/// let spec = ChartDispatcher::default().render(ChartType::PieChart, &bindings, Palette::Viridis, &data);
/// assert_eq!(spec.data.len(), 1);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ChartDispatcher {
    pub palette_mode: PaletteMode,
}

impl ChartDispatcher {
    pub fn new(palette_mode: PaletteMode) -> Self {
        ChartDispatcher { palette_mode }
    }

    /// Renders a chart, falling back to [`ChartSpec::empty`] on any failure.
    ///
    /// The failure is logged; use [`ChartDispatcher::try_render`] to get it.
    pub fn render(
        &self,
        chart_type: ChartType,
        bindings: &FieldBindings,
        palette: Palette,
        data: &TabularData,
    ) -> ChartSpec {
        match self.try_render(chart_type, bindings, palette, data) {
            Ok(spec) => spec,
            Err(e) => {
                warn!("Error generating visualization ({}): {}", chart_type, e);
                ChartSpec::empty()
            }
        }
    }

    pub fn try_render(
        &self,
        chart_type: ChartType,
        bindings: &FieldBindings,
        palette: Palette,
        data: &TabularData,
    ) -> VizResult<ChartSpec> {
        match chart_type {
            ChartType::GanttChart => gantt_chart(data, bindings, palette),
            ChartType::BarChart => self.bar_chart(data, bindings, palette),
            ChartType::ScatterPlot => scatter_plot(data, bindings, palette),
            ChartType::LineChart => self.line_chart(data, bindings, palette),
            ChartType::Heatmap => heatmap(data, bindings, palette),
            ChartType::Histogram => self.histogram(data, bindings, palette),
            ChartType::PieChart => pie_chart(data, bindings),
            ChartType::BoxPlot => self.box_plot(data, bindings, palette),
        }
    }

    /// Column to split traces by in compat mode, `None` in continuous mode.
    fn palette_grouping<'a>(
        &self,
        data: &'a TabularData,
        palette: Palette,
    ) -> VizResult<Option<&'a Column>> {
        match self.palette_mode {
            PaletteMode::Continuous => Ok(None),
            PaletteMode::Compat => data
                .column(palette.name())
                .map(Some)
                .ok_or_else(|| VizError::UnknownColumn {
                    column: palette.name().to_string(),
                }),
        }
    }

    fn bar_chart(
        &self,
        data: &TabularData,
        bindings: &FieldBindings,
        palette: Palette,
    ) -> VizResult<ChartSpec> {
        let x = bound_column(data, bindings, Role::X)?;
        let y = bound_column(data, bindings, Role::Y)?;
        let layout = Layout::titled_axes(Some(&x.name), Some(&y.name));

        if let Some(group) = self.palette_grouping(data, palette)? {
            let data = group_rows(group)
                .into_iter()
                .map(|(name, rows)| {
                    Trace::Bar(BarTrace {
                        name: Some(name),
                        x: pick(&x.values, &rows),
                        y: pick(&y.values, &rows),
                        ..BarTrace::default()
                    })
                })
                .collect();
            return Ok(ChartSpec {
                data,
                layout: Layout {
                    barmode: Some("relative"),
                    ..layout.with_legend(&group.name)
                },
            });
        }

        Ok(ChartSpec {
            data: vec![Trace::Bar(BarTrace {
                x: x.values.clone(),
                y: y.values.clone(),
                marker: Some(value_marker(y, palette)),
                ..BarTrace::default()
            })],
            layout,
        })
    }

    fn line_chart(
        &self,
        data: &TabularData,
        bindings: &FieldBindings,
        palette: Palette,
    ) -> VizResult<ChartSpec> {
        let x = bound_column(data, bindings, Role::X)?;
        let y = bound_column(data, bindings, Role::Y)?;
        let layout = Layout::titled_axes(Some(&x.name), Some(&y.name));

        if let Some(group) = self.palette_grouping(data, palette)? {
            let data = group_rows(group)
                .into_iter()
                .map(|(name, rows)| {
                    Trace::Scatter(ScatterTrace {
                        name: Some(name),
                        x: pick(&x.values, &rows),
                        y: pick(&y.values, &rows),
                        mode: "lines",
                        marker: None,
                    })
                })
                .collect();
            return Ok(ChartSpec {
                data,
                layout: layout.with_legend(&group.name),
            });
        }

        Ok(ChartSpec {
            data: vec![Trace::Scatter(ScatterTrace {
                name: None,
                x: x.values.clone(),
                y: y.values.clone(),
                mode: "lines+markers",
                marker: Some(value_marker(y, palette)),
            })],
            layout,
        })
    }

    fn histogram(
        &self,
        data: &TabularData,
        bindings: &FieldBindings,
        palette: Palette,
    ) -> VizResult<ChartSpec> {
        let column = bound_column(data, bindings, Role::Value)?;
        let layout = Layout {
            barmode: Some("relative"),
            ..Layout::titled_axes(Some(&column.name), Some("count"))
        };

        if let Some(group) = self.palette_grouping(data, palette)? {
            let data = group_rows(group)
                .into_iter()
                .map(|(name, rows)| {
                    Trace::Histogram(HistogramTrace {
                        name: Some(name),
                        x: pick(&column.values, &rows),
                        marker: None,
                    })
                })
                .collect();
            return Ok(ChartSpec {
                data,
                layout: layout.with_legend(&group.name),
            });
        }

        Ok(ChartSpec {
            data: vec![Trace::Histogram(HistogramTrace {
                name: None,
                x: column.values.clone(),
                marker: Some(Marker::fixed(palette.sample(0.5))),
            })],
            layout,
        })
    }

    fn box_plot(
        &self,
        data: &TabularData,
        bindings: &FieldBindings,
        palette: Palette,
    ) -> VizResult<ChartSpec> {
        let column = bound_column(data, bindings, Role::Value)?;
        require_numeric(column, ChartType::BoxPlot)?;
        let layout = Layout::titled_axes(None, Some(&column.name));

        if let Some(group) = self.palette_grouping(data, palette)? {
            let data = group_rows(group)
                .into_iter()
                .map(|(name, rows)| {
                    Trace::Box(BoxTrace {
                        name: Some(name),
                        y: pick(&column.values, &rows),
                        marker: None,
                    })
                })
                .collect();
            return Ok(ChartSpec {
                data,
                layout: layout.with_legend(&group.name),
            });
        }

        Ok(ChartSpec {
            data: vec![Trace::Box(BoxTrace {
                name: None,
                y: column.values.clone(),
                marker: Some(Marker::fixed(palette.sample(0.5))),
            })],
            layout,
        })
    }
}

/// Renders with the default (continuous) palette mode.
pub fn render(
    chart_type: ChartType,
    bindings: &FieldBindings,
    palette: Palette,
    data: &TabularData,
) -> ChartSpec {
    ChartDispatcher::default().render(chart_type, bindings, palette, data)
}

/// Horizontal timeline: one bar per row spanning start..end, grouped and
/// colored by the task column.
///
/// Text tasks are colored by their first-seen index so they can sit on the
/// continuous palette scale.
fn gantt_chart(
    data: &TabularData,
    bindings: &FieldBindings,
    palette: Palette,
) -> VizResult<ChartSpec> {
    let start = bound_column(data, bindings, Role::Start)?;
    let end = bound_column(data, bindings, Role::End)?;
    let task = bound_column(data, bindings, Role::Task)?;

    for column in [start, end] {
        if !column.is_temporal() {
            return Err(VizError::render(format!(
                "Column '{}' does not contain dates and cannot be used on a timeline",
                column.name
            )));
        }
    }

    let mut codes: IndexMap<String, i64> = IndexMap::new();
    let mut base = Vec::new();
    let mut durations = Vec::new();
    let mut tasks = Vec::new();
    let mut colors = Vec::new();

    for row in 0..data.row_count() {
        let (Some(from), Some(to)) = (
            start.values[row].as_datetime(),
            end.values[row].as_datetime(),
        ) else {
            continue;
        };

        let task_value = &task.values[row];
        let color = if task.is_numeric() {
            task_value.clone()
        } else {
            let next = codes.len() as i64;
            CellValue::Int(*codes.entry(task_value.to_string()).or_insert(next))
        };

        base.push(CellValue::DateTime(from));
        durations.push(CellValue::Int((to - from).num_milliseconds()));
        tasks.push(task_value.clone());
        colors.push(color);
    }

    Ok(ChartSpec {
        data: vec![Trace::Bar(BarTrace {
            name: None,
            x: durations,
            y: tasks,
            base: Some(base),
            orientation: Some("h"),
            marker: Some(Marker::scaled(colors, palette.scale(), &task.name)),
        })],
        layout: Layout {
            xaxis: Some(Axis {
                title: None,
                kind: Some("date"),
            }),
            yaxis: Some(Axis::titled(&task.name)),
            ..Layout::default()
        },
    })
}

fn scatter_plot(
    data: &TabularData,
    bindings: &FieldBindings,
    palette: Palette,
) -> VizResult<ChartSpec> {
    let x = bound_column(data, bindings, Role::X)?;
    let y = bound_column(data, bindings, Role::Y)?;
    let layout = Layout::titled_axes(Some(&x.name), Some(&y.name));

    // Color is the one optional role
    let color = match bindings.get(Role::Color) {
        Some(name) => Some(data.column(name).ok_or_else(|| VizError::UnknownColumn {
            column: name.to_string(),
        })?),
        None => None,
    };

    let spec = match color {
        None => ChartSpec {
            data: vec![Trace::Scatter(ScatterTrace {
                name: None,
                x: x.values.clone(),
                y: y.values.clone(),
                mode: "markers",
                marker: None,
            })],
            layout,
        },
        Some(color) if color.is_numeric() => ChartSpec {
            data: vec![Trace::Scatter(ScatterTrace {
                name: None,
                x: x.values.clone(),
                y: y.values.clone(),
                mode: "markers",
                marker: Some(Marker::scaled(
                    color.values.clone(),
                    palette.scale(),
                    &color.name,
                )),
            })],
            layout,
        },
        Some(color) => {
            let groups = group_rows(color);
            let shades = palette.spread(groups.len());
            let data = groups
                .into_iter()
                .zip(shades)
                .map(|((name, rows), shade)| {
                    Trace::Scatter(ScatterTrace {
                        name: Some(name),
                        x: pick(&x.values, &rows),
                        y: pick(&y.values, &rows),
                        mode: "markers",
                        marker: Some(Marker::fixed(shade)),
                    })
                })
                .collect();
            ChartSpec {
                data,
                layout: layout.with_legend(&color.name),
            }
        }
    };

    Ok(spec)
}

fn heatmap(data: &TabularData, bindings: &FieldBindings, palette: Palette) -> VizResult<ChartSpec> {
    let x = bound_column(data, bindings, Role::X)?;
    let y = bound_column(data, bindings, Role::Y)?;
    let value = bound_column(data, bindings, Role::Value)?;
    require_numeric(value, ChartType::Heatmap)?;

    Ok(ChartSpec {
        data: vec![Trace::Histogram2d(Histogram2dTrace {
            x: x.values.clone(),
            y: y.values.clone(),
            z: value.values.clone(),
            histfunc: "sum",
            colorscale: palette.scale(),
            colorbar: ColorBar::titled(&format!("sum of {}", value.name)),
        })],
        layout: Layout::titled_axes(Some(&x.name), Some(&y.name)),
    })
}

/// Wedges count how often each value occurs. The palette plays no part.
fn pie_chart(data: &TabularData, bindings: &FieldBindings) -> VizResult<ChartSpec> {
    let column = bound_column(data, bindings, Role::Value)?;

    let mut counts: IndexMap<String, (CellValue, u64)> = IndexMap::new();
    for value in column.values.iter().filter(|v| !v.is_empty()) {
        counts
            .entry(value.to_string())
            .or_insert_with(|| (value.clone(), 0))
            .1 += 1;
    }

    let (labels, values): (Vec<CellValue>, Vec<u64>) = counts.into_values().unzip();
    Ok(ChartSpec {
        data: vec![Trace::Pie(PieTrace { labels, values })],
        layout: Layout::default().with_legend(&column.name),
    })
}

fn bound_column<'a>(
    data: &'a TabularData,
    bindings: &FieldBindings,
    role: Role,
) -> VizResult<&'a Column> {
    let name = bindings
        .get(role)
        .ok_or(VizError::MissingBinding { role })?;
    data.column(name).ok_or_else(|| VizError::UnknownColumn {
        column: name.to_string(),
    })
}

fn require_numeric(column: &Column, chart_type: ChartType) -> VizResult<()> {
    if column.is_numeric() {
        Ok(())
    } else {
        Err(VizError::render(format!(
            "{} needs a numeric column, '{}' is {:?}",
            chart_type, column.name, column.kind
        )))
    }
}

/// Colors points by `column` on the palette when it is numeric, otherwise
/// uses a single color from the middle of the palette.
fn value_marker(column: &Column, palette: Palette) -> Marker {
    if column.is_numeric() {
        Marker::scaled(column.values.clone(), palette.scale(), &column.name)
    } else {
        Marker::fixed(palette.sample(0.5))
    }
}

/// Row indices per distinct non-empty value, in first-seen order.
fn group_rows(column: &Column) -> IndexMap<String, Vec<usize>> {
    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (row, value) in column.values.iter().enumerate() {
        if value.is_empty() {
            continue;
        }
        groups.entry(value.to_string()).or_default().push(row);
    }
    groups
}

fn pick(values: &[CellValue], rows: &[usize]) -> Vec<CellValue> {
    rows.iter().map(|&row| values[row].clone()).collect()
}

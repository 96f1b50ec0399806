//! Declarative chart description handed to the browser.
//!
//! The shapes mirror the Plotly figure schema (`{ data: [...], layout: {...} }`)
//! so the page can pass a [`ChartSpec`] straight to `Plotly.react`.

use serde::Serialize;

use crate::palette::ColorScale;
use crate::table::CellValue;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChartSpec {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl ChartSpec {
    /// The figure shown when a chart cannot be built: no traces, default layout.
    pub fn empty() -> Self {
        ChartSpec::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Bar(BarTrace),
    Scatter(ScatterTrace),
    Histogram(HistogramTrace),
    Histogram2d(Histogram2dTrace),
    Pie(PieTrace),
    Box(BoxTrace),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BarTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: Vec<CellValue>,
    pub y: Vec<CellValue>,
    /// Bar start offsets; set for timelines where `x` holds durations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<Vec<CellValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScatterTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: Vec<CellValue>,
    pub y: Vec<CellValue>,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistogramTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: Vec<CellValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
}

/// Binned 2-D density; the client sums `z` per cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram2dTrace {
    pub x: Vec<CellValue>,
    pub y: Vec<CellValue>,
    pub z: Vec<CellValue>,
    pub histfunc: &'static str,
    pub colorscale: ColorScale,
    pub colorbar: ColorBar,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PieTrace {
    pub labels: Vec<CellValue>,
    pub values: Vec<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoxTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub y: Vec<CellValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    pub color: MarkerColor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorscale: Option<ColorScale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showscale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorbar: Option<ColorBar>,
}

impl Marker {
    pub fn fixed(color: &'static str) -> Self {
        Marker {
            color: MarkerColor::Fixed(color),
            colorscale: None,
            showscale: None,
            colorbar: None,
        }
    }

    /// Per-point colors mapped through `scale`, with a titled color bar.
    pub fn scaled(values: Vec<CellValue>, scale: ColorScale, title: &str) -> Self {
        Marker {
            color: MarkerColor::Values(values),
            colorscale: Some(scale),
            showscale: Some(true),
            colorbar: Some(ColorBar::titled(title)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MarkerColor {
    Fixed(&'static str),
    Values(Vec<CellValue>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColorBar {
    pub title: Text,
}

impl ColorBar {
    pub fn titled(title: &str) -> Self {
        ColorBar {
            title: Text::new(title),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Text {
    pub text: String,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Text { text: text.into() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<&'static str>,
}

impl Layout {
    pub fn titled_axes(x: Option<&str>, y: Option<&str>) -> Self {
        Layout {
            xaxis: x.map(Axis::titled),
            yaxis: y.map(Axis::titled),
            ..Layout::default()
        }
    }

    pub fn with_legend(mut self, title: &str) -> Self {
        self.legend = Some(Legend {
            title: Text::new(title),
        });
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Text>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

impl Axis {
    pub fn titled(title: &str) -> Self {
        Axis {
            title: Some(Text::new(title)),
            kind: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Legend {
    pub title: Text,
}

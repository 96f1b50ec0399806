//! Chart types, their column roles and the selector controls built from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The eight supported chart kinds.
///
/// Serialized with the labels shown in the chart type dropdown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartType {
    #[serde(rename = "Gantt Chart")]
    GanttChart,
    #[default]
    #[serde(rename = "Bar Chart")]
    BarChart,
    #[serde(rename = "Scatter Plot")]
    ScatterPlot,
    #[serde(rename = "Line Chart")]
    LineChart,
    #[serde(rename = "Heatmap")]
    Heatmap,
    #[serde(rename = "Histogram")]
    Histogram,
    #[serde(rename = "Pie Chart")]
    PieChart,
    #[serde(rename = "Box Plot")]
    BoxPlot,
}

impl ChartType {
    /// Dropdown order
    pub const ALL: [ChartType; 8] = [
        ChartType::GanttChart,
        ChartType::BarChart,
        ChartType::ScatterPlot,
        ChartType::LineChart,
        ChartType::Heatmap,
        ChartType::Histogram,
        ChartType::PieChart,
        ChartType::BoxPlot,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChartType::GanttChart => "Gantt Chart",
            ChartType::BarChart => "Bar Chart",
            ChartType::ScatterPlot => "Scatter Plot",
            ChartType::LineChart => "Line Chart",
            ChartType::Heatmap => "Heatmap",
            ChartType::Histogram => "Histogram",
            ChartType::PieChart => "Pie Chart",
            ChartType::BoxPlot => "Box Plot",
        }
    }

    /// Selector layout for this chart type, in display order.
    pub fn role_specs(self) -> &'static [RoleSpec] {
        match self {
            ChartType::GanttChart => GANTT_ROLES,
            ChartType::BarChart => BAR_ROLES,
            ChartType::ScatterPlot => SCATTER_ROLES,
            ChartType::LineChart => LINE_ROLES,
            ChartType::Heatmap => HEATMAP_ROLES,
            ChartType::Histogram => HISTOGRAM_ROLES,
            ChartType::PieChart => PIE_ROLES,
            ChartType::BoxPlot => BOX_ROLES,
        }
    }

    pub fn roles(self) -> impl Iterator<Item = Role> {
        self.role_specs().iter().map(|spec| spec.role)
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartType::ALL
            .into_iter()
            .find(|t| t.label() == s)
            .ok_or_else(|| format!("Unknown chart type: {}", s))
    }
}

const X_PLACEHOLDER: &str = "Select X-axis Column";
const Y_PLACEHOLDER: &str = "Select Y-axis Column";

const GANTT_ROLES: &[RoleSpec] = &[
    RoleSpec::new(Role::Start, "gantt-start-col", "Select Start Date"),
    RoleSpec::new(Role::End, "gantt-end-col", "Select End Date"),
    RoleSpec::new(Role::Task, "gantt-task-col", "Select Task Column"),
];
const BAR_ROLES: &[RoleSpec] = &[
    RoleSpec::new(Role::X, "bar-x-col", X_PLACEHOLDER),
    RoleSpec::new(Role::Y, "bar-y-col", Y_PLACEHOLDER),
];
const SCATTER_ROLES: &[RoleSpec] = &[
    RoleSpec::new(Role::X, "scatter-x-col", X_PLACEHOLDER),
    RoleSpec::new(Role::Y, "scatter-y-col", Y_PLACEHOLDER),
    RoleSpec::new(Role::Color, "scatter-color-col", "Select Color Column"),
];
const LINE_ROLES: &[RoleSpec] = &[
    RoleSpec::new(Role::X, "line-x-col", X_PLACEHOLDER),
    RoleSpec::new(Role::Y, "line-y-col", Y_PLACEHOLDER),
];
const HEATMAP_ROLES: &[RoleSpec] = &[
    RoleSpec::new(Role::X, "heatmap-x-col", X_PLACEHOLDER),
    RoleSpec::new(Role::Y, "heatmap-y-col", Y_PLACEHOLDER),
    RoleSpec::new(Role::Value, "heatmap-value-col", "Select Value Column"),
];
const HISTOGRAM_ROLES: &[RoleSpec] = &[RoleSpec::new(Role::Value, "histogram-col", "Select Column")];
const PIE_ROLES: &[RoleSpec] = &[RoleSpec::new(Role::Value, "pie-col", "Select Column for Pie")];
const BOX_ROLES: &[RoleSpec] = &[RoleSpec::new(Role::Value, "box-col", "Select Column")];

/// A logical slot of a chart that a column can fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Start,
    End,
    Task,
    X,
    Y,
    Color,
    Value,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Start => "start",
            Role::End => "end",
            Role::Task => "task",
            Role::X => "x",
            Role::Y => "y",
            Role::Color => "color",
            Role::Value => "value",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoleSpec {
    pub role: Role,
    pub id: &'static str,
    pub placeholder: &'static str,
}

impl RoleSpec {
    const fn new(role: Role, id: &'static str, placeholder: &'static str) -> Self {
        RoleSpec {
            role,
            id,
            placeholder,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// One dropdown of the column selection form.
///
/// Every selector offers every column: nothing is filtered by inferred type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldSelector {
    pub id: &'static str,
    pub role: Role,
    pub placeholder: &'static str,
    pub options: Vec<SelectOption>,
}

/// Builds the selectors for `chart_type` over the given columns.
pub fn fields_for(chart_type: ChartType, columns: &[String]) -> Vec<FieldSelector> {
    let options: Vec<SelectOption> = columns
        .iter()
        .map(|col| SelectOption {
            label: col.clone(),
            value: col.clone(),
        })
        .collect();

    chart_type
        .role_specs()
        .iter()
        .map(|spec| FieldSelector {
            id: spec.id,
            role: spec.role,
            placeholder: spec.placeholder,
            options: options.clone(),
        })
        .collect()
}

/// Result of the form step.
///
/// `Suspended` means there is nothing to build against (no upload yet) and
/// the page must keep whatever it shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormOutcome {
    Suspended,
    Fields(Vec<FieldSelector>),
}

/// Form step over an optional column list.
pub fn form_for(chart_type: ChartType, columns: Option<&[String]>) -> FormOutcome {
    match columns {
        Some(columns) => FormOutcome::Fields(fields_for(chart_type, columns)),
        None => FormOutcome::Suspended,
    }
}

/// Columns chosen by the user, keyed by role.
///
/// Empty strings count as unset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldBindings(BTreeMap<Role, String>);

impl FieldBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: Role, column: impl Into<String>) -> Self {
        self.0.insert(role, column.into());
        self
    }

    pub fn set(&mut self, role: Role, column: impl Into<String>) {
        self.0.insert(role, column.into());
    }

    pub fn get(&self, role: Role) -> Option<&str> {
        self.0
            .get(&role)
            .map(String::as_str)
            .filter(|col| !col.is_empty())
    }
}

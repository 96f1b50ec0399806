#![cfg(not(tarpaulin_include))]

use genviz::forms::{ChartType, FieldBindings, Role};
use genviz::graph::ChartDispatcher;
use genviz::loader::UploadedFile;
use genviz::palette::Palette;

const SAMPLE: &str = "\
task,start,end,team,hours,score
Design,2024-01-01,2024-01-05,core,12,3.5
Build,2024-01-04,2024-01-20,core,40,4.1
Test,2024-01-18,2024-01-25,qa,16,2.9
Ship,2024-01-25,2024-01-26,ops,2,4.8
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data = UploadedFile::from_bytes("sample.csv", SAMPLE.as_bytes()).decode()?;
    println!(
        "Decoded sample: {} rows, columns {:?}",
        data.row_count(),
        data.column_names()
    );

    let dispatcher = ChartDispatcher::default();
    for chart_type in ChartType::ALL {
        let bindings = sample_bindings(chart_type);
        let spec = dispatcher.try_render(chart_type, &bindings, Palette::Viridis, &data)?;
        println!(
            "Created {} with {} trace(s): {}",
            chart_type,
            spec.data.len(),
            serde_json::to_string(&spec)?
        );
    }

    Ok(())
}

fn sample_bindings(chart_type: ChartType) -> FieldBindings {
    let bindings = FieldBindings::new();
    match chart_type {
        ChartType::GanttChart => bindings
            .with(Role::Start, "start")
            .with(Role::End, "end")
            .with(Role::Task, "task"),
        ChartType::BarChart | ChartType::LineChart => {
            bindings.with(Role::X, "task").with(Role::Y, "hours")
        }
        ChartType::ScatterPlot => bindings
            .with(Role::X, "hours")
            .with(Role::Y, "score")
            .with(Role::Color, "team"),
        ChartType::Heatmap => bindings
            .with(Role::X, "team")
            .with(Role::Y, "task")
            .with(Role::Value, "hours"),
        ChartType::Histogram | ChartType::BoxPlot => bindings.with(Role::Value, "score"),
        ChartType::PieChart => bindings.with(Role::Value, "team"),
    }
}

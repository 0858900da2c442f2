pub mod chart;
pub mod document;
pub mod report;

pub use chart::ChartRenderer;
pub use report::ReportExporter;

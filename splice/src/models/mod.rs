pub mod chart;
pub mod conversation;
pub mod query;
pub mod schema;

pub use chart::{CategorySpec, ChartKind, ChartSpec, HeatmapSpec, ScatterSpec, VolcanoSpec};
pub use conversation::{ConversationMemory, Turn};
pub use query::{QueryResult, Row};
pub use schema::{ColumnDescriptor, TableSchema};

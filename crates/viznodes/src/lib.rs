//! Standard node library
//!
//! Built-in nodes for loading and shaping tabular data. Tabular values
//! travel between nodes as `{"data": {"json": [rows...], "binary": null}}`.

mod binning;
mod chart;
mod clean;
mod csv;
mod filter;
mod normalize;
mod start;
mod table;

pub use binning::DataBinningNode;
pub use chart::D3JsNode;
pub use clean::CleanDataNode;
pub use csv::{CsvToJsonNode, ReadCsvNode};
pub use filter::FilterDataNode;
pub use normalize::NormalizeDataNode;
pub use start::StartNode;
use vizruntime::NodeRegistry;

use std::sync::Arc;

/// Register all standard nodes with a registry
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(Arc::new(start::StartNodeFactory));
    registry.register(Arc::new(csv::ReadCsvNodeFactory));
    registry.register(Arc::new(csv::CsvToJsonNodeFactory));
    registry.register(Arc::new(clean::CleanDataNodeFactory));
    registry.register(Arc::new(filter::FilterDataNodeFactory));
    registry.register(Arc::new(normalize::NormalizeDataNodeFactory));
    registry.register(Arc::new(binning::DataBinningNodeFactory));
    registry.register(Arc::new(chart::D3JsNodeFactory));
}

mod settings;

pub use settings::{TomlTraceConfig, TraceConfig, EXAMPLE_CONFIG};

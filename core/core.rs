pub mod config;
pub mod error;
pub mod export;
pub mod registry;
pub mod tree;

pub use config::{Config, DEFAULT_CONFIG_FILENAME, DEFAULT_OUTPUT_FILENAME, StackRule};
pub use error::{AppError, Result};
pub use export::{
    ExportLimits, ExportReport, ExportRules, ExportSelection, export_project, export_to_writer,
};
pub use registry::{
    DEFAULT_DISCOVERY_DEPTH, DiscoveredProjects, ProjectAdded, StackEdit, detect_stack,
    discover_projects, parse_list,
};
pub use tree::{EntryKind, Pick, TreeEntry, build_project_tree, expand_selection};

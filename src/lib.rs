pub mod config;
pub mod executor;
pub mod exit_codes;
pub mod magics;
pub mod notebook;
pub mod position_map;
pub mod projection;
pub mod pytext;
pub mod reconstruct;
pub mod remap;
pub mod runner;
pub mod selection;

pub use config::Config;
pub use executor::ToolExecutor;
pub use notebook::Notebook;
pub use position_map::PositionMap;
pub use projection::{ProjectionInfo, project};
pub use reconstruct::reconstruct;
pub use remap::{OutputFormat, remap_output};
pub use runner::{find_notebooks, run_notebook};

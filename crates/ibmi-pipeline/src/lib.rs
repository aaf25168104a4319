//! Batch dispatch of IBM i source files to the CL, RPG, DB2 and DSPF analyzers.
//!
//! Each input carries a declared [`Kind`]. Inputs declared `auto` are
//! resolved from the file extension and then, if still unknown, from the
//! first line of their content. The [`Mode`] decides which analyzer may run
//! on a resolved file. Files are processed on a rayon pool; results keep
//! input order so repeated runs produce identical output.
//!
//! # Example
//!
//! ```rust
//! use ibmi_pipeline::{infer_from_content, infer_from_path, Kind};
//!
//! assert_eq!(infer_from_path("ORDERS.clle"), Kind::Cl);
//! assert_eq!(infer_from_content("SELECT 1", "x.txt"), Kind::Db2);
//! ```

mod config;
mod error;
mod kind;
mod pipeline;

pub use config::PipelineConfig;
pub use error::{ConfigError, UnknownName};
pub use kind::{infer_from_content, infer_from_path, Kind, Mode, SNIFF_WIDTH};
pub use pipeline::{run, run_with_config, InputSpec, PipelineResult};

/// Result type for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;

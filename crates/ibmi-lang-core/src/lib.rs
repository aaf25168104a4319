//! Shared types and traits for the IBM i artifact compilers.
//!
//! This crate provides the building blocks that the CL, RPG, DB2 and DSPF
//! crates share:
//!
//! - **Source location tracking**: [`SourceLocation`], [`LineIndex`],
//!   fixed-column access in [`columns`]
//! - **Diagnostics**: [`Diagnostic`], [`Severity`]
//! - **Two-tier parsing**: [`ParseStrategy`], [`TieredParser`], [`ParseOutcome`]
//! - **Analysis output**: [`Analysis`], [`MaintainabilityRating`],
//!   [`SummaryReport`], [`TreeWriter`]
//!
//! Every language crate parses through a [`TieredParser`]: a strict grammar
//! strategy is tried first and its result is discarded as soon as it reports
//! an error, in which case the never-failing heuristic fallback runs instead.

mod analysis;
pub mod columns;
mod diagnostic;
mod location;
mod metrics;
mod preprocess;
mod quote;
mod report;
mod strategy;

pub use analysis::Analysis;
pub use diagnostic::{has_errors, Diagnostic, Severity};
pub use location::SourceLocation;
pub use metrics::{ComplexityLevel, MaintainabilityRating};
pub use preprocess::{normalize_line_endings, LineIndex};
pub use quote::{split_whitespace_quoted, QuoteTracker};
pub use report::{SummaryReport, TreeWriter};
pub use strategy::{ParseOutcome, ParseStrategy, StrategyKind, TieredParser};

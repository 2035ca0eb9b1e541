//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project management | `init` |
//! | Task | Tasks and their scheduling mode | `task add`, `task manual`, `task auto` |
//! | Relation | Links between tasks | `relation add B follows A`, `relation list` |
//! | Impact | Rescheduling queries | `impact A`, `impact A --explain` |
//! | Cache | SQLite mirror | `cache rebuild`, `cache status` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logs on stderr:
//! ```bash
//! sched --verbose impact t-1a2b3c4
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod cache_cmd;
mod impact;
mod output;
mod relation;
mod task;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};

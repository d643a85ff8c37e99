//! CLI layer: argument parsing, dispatch, and output formatting.

pub mod cmds;
pub mod opts;
pub mod style;
pub mod table;

pub use cmds::{Cmd, GlobalArgs};
pub use opts::{Command, OnyoArgs};

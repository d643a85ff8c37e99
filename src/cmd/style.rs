//! ANSI styles shared by CLI output, defined as `once_cell::sync::Lazy`
//! statics to match the rest of the crate's lazily-initialized statics
//! (`paths.rs`'s `NAME_REGEX`).

use ansi_term::{Color, Style};
use once_cell::sync::Lazy;

pub static GREEN: Lazy<Style> = Lazy::new(|| Style::new().fg(Color::Green));
pub static RED: Lazy<Style> = Lazy::new(|| Style::new().fg(Color::Red));

//! Tabular output for `onyo get`: accumulates per-column widths over a
//! homogeneous string grid (`QueryRow`), then writes aligned rows.

use std::io::{self, Write};

use unicode_width::UnicodeWidthStr;

use crate::query::QueryRow;

pub fn print_rows(headers: &[String], rows: &[QueryRow], show_header: bool) {
    let mut widths: Vec<usize> = headers.iter().map(|h| UnicodeWidthStr::width(h.as_str())).collect();
    widths.push("path".len());

    for row in rows {
        for (i, v) in row.values.iter().enumerate() {
            widths[i] = widths[i].max(UnicodeWidthStr::width(v.as_str()));
        }
        let last = widths.len() - 1;
        widths[last] = widths[last].max(row.path.to_string_lossy().len());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if show_header {
        let mut cells: Vec<String> = headers.clone();
        cells.push("path".to_string());
        write_row(&mut out, &cells, &widths);
    }

    for row in rows {
        let mut cells = row.values.clone();
        cells.push(row.path.display().to_string());
        write_row(&mut out, &cells, &widths);
    }
}

fn write_row(out: &mut impl Write, cells: &[String], widths: &[usize]) {
    let mut iter = cells.iter().zip(widths).peekable();
    while let Some((cell, width)) = iter.next() {
        if iter.peek().is_some() {
            let _ = write!(out, "{:<width$}  ", cell, width = width);
        } else {
            let _ = write!(out, "{}", cell);
        }
    }
    let _ = writeln!(out);
}

pub fn print_tsv(headers: &[String], rows: &[QueryRow], show_header: bool) {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if show_header {
        let mut cells: Vec<String> = headers.clone();
        cells.push("path".to_string());
        let _ = writeln!(out, "{}", cells.join("\t"));
    }

    for row in rows {
        let mut cells = row.values.clone();
        cells.push(row.path.display().to_string());
        let _ = writeln!(out, "{}", cells.join("\t"));
    }
}

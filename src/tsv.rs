//! TSV -> Record adapter for `onyo new --tsv`: a header row declares keys,
//! `directory` and `template` are ordinary reserved-key columns (already
//! handled downstream by `Record::without_reserved_keys` and
//! `Repo::stage_new_asset`), and a single set of `--keys` overrides may
//! supplement every row as long as it names no column the table itself
//! declares.

use crate::error::{OnyoError, Result};
use crate::record::{parse_scalar, Record};

/// Parses a TSV document into one `Record` per data row. `cli_overrides` is
/// the record built from a single `--keys key=value...` group; each of its
/// keys is applied to every row, but it is an error for a `--keys` key to
/// also appear as a TSV column.
pub fn parse(content: &str, cli_overrides: &Record) -> Result<Vec<Record>> {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| OnyoError::InvalidPath(std::path::PathBuf::from("<empty tsv>")))?;
    let columns: Vec<&str> = header.split('\t').map(str::trim).collect();

    for (key, _) in cli_overrides.0.iter() {
        if let Some(key) = key.as_str() {
            if columns.iter().any(|c| *c == key) {
                return Err(OnyoError::ConflictingKeys(format!(
                    "'{}' is both a TSV column and a --keys override",
                    key
                )));
            }
        }
    }

    let mut rows = Vec::new();
    for line in lines {
        let cells: Vec<&str> = line.split('\t').collect();
        let mut record = Record::new();
        for (col, cell) in columns.iter().zip(cells.iter()) {
            if cell.is_empty() {
                continue;
            }
            record.set(col, parse_scalar(cell));
        }
        for (key, value) in cli_overrides.0.iter() {
            record.0.insert(key.clone(), value.clone());
        }
        rows.push(record);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let tsv = "type\tmake\tmodel\tserial\tdirectory\nlaptop\tapple\tmacbookpro\t1\tshelf\n";
        let rows = parse(tsv, &Record::new()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_string("type"), Some("laptop".to_string()));
        assert_eq!(rows[0].get_string("directory"), Some("shelf".to_string()));
    }

    #[test]
    fn cli_overrides_supplement_every_row() {
        let tsv = "type\tmake\tmodel\tserial\nlaptop\tapple\tmacbookpro\t1\nlaptop\tapple\tmacbookpro\t2\n";
        let mut overrides = Record::new();
        overrides.set("owner", serde_yaml::Value::String("shelf-team".into()));
        let rows = parse(tsv, &overrides).unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.get_string("owner"), Some("shelf-team".to_string()));
        }
    }

    #[test]
    fn conflicting_column_and_override_errors() {
        let tsv = "type\tmake\tmodel\tserial\nlaptop\tapple\tmacbookpro\t1\n";
        let mut overrides = Record::new();
        overrides.set("type", serde_yaml::Value::String("desktop".into()));
        assert!(matches!(parse(tsv, &overrides), Err(OnyoError::ConflictingKeys(_))));
    }

    #[test]
    fn serial_faux_passes_through_untouched() {
        let tsv = "type\tmake\tmodel\tserial\nlaptop\tapple\tmacbookpro\tfaux\n";
        let rows = parse(tsv, &Record::new()).unwrap();
        assert_eq!(rows[0].get_string("serial"), Some("faux".to_string()));
    }
}

//! Record model: a dotted-key view over a YAML mapping, deep-merge,
//! template materialization, faux-serial generation.
//!
//! `Record` is a thin newtype over `serde_yaml::Mapping`, whose values are
//! `serde_yaml::Value` -- a scalar/map/sequence algebra. `serde_yaml`'s
//! `Mapping` preserves key insertion order, so a record round-trips through
//! disk with its field order intact.

use std::collections::HashSet;

use rand::Rng;
use serde_yaml::{Mapping, Value};

use crate::consts::RESERVED_KEYS;
use crate::error::{OnyoError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(pub Mapping);

impl Record {
    pub fn new() -> Self {
        Record(Mapping::new())
    }

    pub fn from_mapping(m: Mapping) -> Self {
        Record(m)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Record::new());
        }
        let value: Value = serde_yaml::from_str(s)?;
        match value {
            Value::Mapping(m) => Ok(Record(m)),
            Value::Null => Ok(Record::new()),
            other => Err(OnyoError::InvalidYaml {
                path: std::path::PathBuf::new(),
                detail: format!("expected a mapping at the document root, got {:?}", other),
            }),
        }
    }

    /// Strips reserved keys (`directory`, `is_asset_directory`, `template`)
    /// before the record is persisted to disk.
    pub fn without_reserved_keys(&self) -> Record {
        let mut out = Mapping::new();
        for (k, v) in self.0.iter() {
            if let Some(key) = k.as_str() {
                if RESERVED_KEYS.contains(&key) {
                    continue;
                }
            }
            out.insert(k.clone(), v.clone());
        }
        Record(out)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let segs: Vec<&str> = key.split('.').collect();
        let mut map = &self.0;
        for (i, seg) in segs.iter().enumerate() {
            let v = map.get(Value::String((*seg).to_string()))?;
            if i == segs.len() - 1 {
                return Some(v);
            }
            match v {
                Value::Mapping(m) => map = m,
                _ => return None,
            }
        }
        None
    }

    pub fn set(&mut self, key: &str, value: Value) {
        DottedView(self).set(key, value)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn del(&mut self, key: &str) {
        DottedView(self).del(key)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(value_to_scalar_string)
    }
}

/// Parses a raw CLI/TSV cell into a YAML scalar: `true`/`false` to
/// booleans, integers/floats to numbers, everything else to a string.
/// Shared by `--keys key=value` parsing (`cmd::cmds::parse_kv`) and the
/// TSV adapter (`tsv::parse`) so both input paths coerce scalars
/// identically.
pub fn parse_scalar(raw: &str) -> Value {
    if raw == "true" {
        Value::Bool(true)
    } else if raw == "false" {
        Value::Bool(false)
    } else if let Ok(n) = raw.parse::<i64>() {
        Value::Number(n.into())
    } else if let Ok(n) = raw.parse::<f64>() {
        Value::Number(serde_yaml::Number::from(n))
    } else {
        Value::String(raw.to_string())
    }
}

/// Renders a scalar `Value` the way onyo's literal markers expect: plain
/// strings for scalars, `<dict>`/`<list>` for empty composites.
pub fn value_to_scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Mapping(m) if m.is_empty() => Some("<dict>".to_string()),
        Value::Sequence(s) if s.is_empty() => Some("<list>".to_string()),
        _ => None,
    }
}

/// Dotted-path (`a.b.c`) accessor over a `Record`'s nested mappings.
pub struct DottedView<'a>(pub &'a mut Record);

impl<'a> DottedView<'a> {
    fn segments(key: &str) -> Vec<&str> {
        key.split('.').collect()
    }

    pub fn set(&mut self, key: &str, value: Value) {
        let segs = Self::segments(key);
        let mut map = &mut self.0 .0;
        for (i, seg) in segs.iter().enumerate() {
            let k = Value::String((*seg).to_string());
            if i == segs.len() - 1 {
                map.insert(k, value);
                return;
            }
            let entry = map
                .entry(k)
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if !matches!(entry, Value::Mapping(_)) {
                *entry = Value::Mapping(Mapping::new());
            }
            match entry {
                Value::Mapping(m) => map = m,
                _ => unreachable!(),
            }
        }
    }

    pub fn del(&mut self, key: &str) {
        let segs = Self::segments(key);
        let mut map = &mut self.0 .0;
        for (i, seg) in segs.iter().enumerate() {
            let k = Value::String((*seg).to_string());
            if i == segs.len() - 1 {
                map.remove(&k);
                return;
            }
            match map.get_mut(&k) {
                Some(Value::Mapping(m)) => map = m,
                _ => return,
            }
        }
    }
}

/// Per-key deep merge: scalar override wins, mapping merges recursively,
/// sequence override replaces wholesale.
pub fn deep_merge(base: &Record, over: &Record) -> Record {
    let mut out = base.0.clone();
    merge_mapping(&mut out, &over.0);
    Record(out)
}

fn merge_mapping(base: &mut Mapping, over: &Mapping) {
    for (k, v) in over.iter() {
        match (base.get_mut(k), v) {
            (Some(Value::Mapping(bm)), Value::Mapping(om)) => {
                merge_mapping(bm, om);
            }
            _ => {
                base.insert(k.clone(), v.clone());
            }
        }
    }
}

/// Generates `num` unique faux serials of the given alphanumeric `length`,
/// disjoint from `existing`, by rejection sampling against the existing
/// serial set.
pub fn faux_serials(num: usize, length: usize, existing: &HashSet<String>) -> Result<Vec<String>> {
    if length < 4 {
        return Err(OnyoError::InvalidArgument(
            "faux serial length must be >= 4".to_string(),
        ));
    }
    if num < 1 {
        return Err(OnyoError::InvalidArgument(
            "faux serial count must be >= 1".to_string(),
        ));
    }

    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let existing_suffixes: HashSet<&str> = existing
        .iter()
        .filter_map(|s| s.strip_prefix("faux"))
        .collect();

    let mut rng = rand::thread_rng();
    let mut out = HashSet::new();
    while out.len() < num {
        let suffix: String = (0..length)
            .map(|_| {
                let idx = rng.gen_range(0..ALPHABET.len());
                ALPHABET[idx] as char
            })
            .collect();
        if !existing_suffixes.contains(suffix.as_str()) && !out.contains(&suffix) {
            out.insert(suffix);
        }
    }
    Ok(out.into_iter().map(|s| format!("faux{}", s)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_get_set_nested() {
        let mut r = Record::new();
        r.set("a.b.c", Value::String("v".into()));
        assert_eq!(r.get_string("a.b.c"), Some("v".to_string()));
        assert!(r.has("a.b"));
        assert!(!r.has("a.b.d"));
    }

    #[test]
    fn deep_merge_scalar_override_wins() {
        let mut base = Record::new();
        base.set("x", Value::String("old".into()));
        let mut over = Record::new();
        over.set("x", Value::String("new".into()));
        let merged = deep_merge(&base, &over);
        assert_eq!(merged.get_string("x"), Some("new".to_string()));
    }

    #[test]
    fn deep_merge_mapping_recurses() {
        let mut base = Record::new();
        base.set("a.x", Value::String("1".into()));
        base.set("a.y", Value::String("2".into()));
        let mut over = Record::new();
        over.set("a.y", Value::String("3".into()));
        let merged = deep_merge(&base, &over);
        assert_eq!(merged.get_string("a.x"), Some("1".to_string()));
        assert_eq!(merged.get_string("a.y"), Some("3".to_string()));
    }

    #[test]
    fn faux_serial_length_below_four_errors() {
        let existing = HashSet::new();
        assert!(faux_serials(1, 3, &existing).is_err());
    }

    #[test]
    fn faux_serial_zero_count_errors() {
        let existing = HashSet::new();
        assert!(faux_serials(0, 6, &existing).is_err());
    }

    #[test]
    fn faux_serials_unique_and_disjoint() {
        let mut existing = HashSet::new();
        existing.insert("fauxAAAAAA".to_string());
        let serials = faux_serials(5, 6, &existing).unwrap();
        assert_eq!(serials.len(), 5);
        let unique: HashSet<_> = serials.iter().collect();
        assert_eq!(unique.len(), 5);
        for s in &serials {
            assert!(s.starts_with("faux"));
            assert_ne!(s, "fauxAAAAAA");
        }
    }
}

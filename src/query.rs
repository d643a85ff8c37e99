//! Query engine: path/depth scoping, predicate filtering over keys,
//! natural sort, projection. Sorting uses `natord` so numeric path/leaf
//! segments order the way a human would expect (`2` before `10`).

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{OnyoError, Result};
use crate::paths::{self, PathClass};
use crate::record::{value_to_scalar_string, Record};
use crate::store::AssetStore;

#[derive(Debug, Clone)]
pub enum Matcher {
    Literal(String),
    Regex(Regex),
    Unset,
    EmptyDict,
    EmptyList,
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub key: String,
    pub matcher: Matcher,
}

impl Filter {
    pub fn parse(expr: &str) -> Result<Filter> {
        let (key, value) = expr
            .split_once('=')
            .ok_or_else(|| OnyoError::InvalidPath(PathBuf::from(expr)))?;
        let matcher = match value {
            "<unset>" => Matcher::Unset,
            "{}" | "<dict>" => Matcher::EmptyDict,
            "[]" | "<list>" => Matcher::EmptyList,
            _ => {
                let anchored = format!("^{}$", value);
                match Regex::new(&anchored) {
                    Ok(re) => Matcher::Regex(re),
                    Err(_) => Matcher::Literal(value.to_string()),
                }
            }
        };
        Ok(Filter {
            key: key.to_string(),
            matcher,
        })
    }

    fn matches(&self, value: Option<&str>, is_empty_dict: bool, is_empty_list: bool) -> bool {
        match &self.matcher {
            Matcher::Unset => value.is_none(),
            Matcher::EmptyDict => is_empty_dict,
            Matcher::EmptyList => is_empty_list,
            Matcher::Literal(lit) => value == Some(lit.as_str()),
            Matcher::Regex(re) => value.map(|v| re.is_match(v)).unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    None,
    Ascending,
    Descending,
}

pub struct Query {
    pub scopes: Vec<PathBuf>,
    pub depth: i64,
    pub projections: Vec<String>,
    pub filters: Vec<Filter>,
    pub sort: SortDirection,
    /// The repository's configured name-key list (`onyo.assets.name-format`,
    /// default `type,make,model,serial`), threaded through rather than
    /// hard-coded so pseudo-key recognition tracks the same configurable
    /// list `format_name`/`parse_asset_leaf` callers use.
    pub name_keys: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct QueryRow {
    pub path: PathBuf,
    pub values: Vec<String>,
}

fn is_pseudo_key(key: &str, name_keys: &[String]) -> bool {
    name_keys.iter().any(|k| k == key) || key.starts_with("onyo.path.")
}

impl Query {
    pub fn validate_scopes(&self, store: &AssetStore) -> Result<()> {
        for scope in &self.scopes {
            let class = paths::classify(store.root(), scope);
            if !matches!(class, PathClass::InventoryDir | PathClass::AssetFile | PathClass::AssetDir) {
                return Err(OnyoError::InvalidQueryPath(scope.clone()));
            }
        }
        if self.depth < 0 {
            return Err(OnyoError::FlagConflict("depth must be >= 0".to_string()));
        }
        Ok(())
    }

    pub fn run(&self, store: &AssetStore) -> Result<Vec<QueryRow>> {
        self.validate_scopes(store)?;

        let projections: Vec<String> = if self.projections.is_empty() {
            self.name_keys.clone()
        } else {
            self.projections.clone()
        };

        // Pseudo-key filters are sorted first to prune candidates before
        // loading any YAML.
        let mut filters = self.filters.clone();
        filters.sort_by_key(|f| !is_pseudo_key(&f.key, &self.name_keys));

        let all_assets = store.enumerate_assets()?;
        let mut rows = Vec::new();

        for asset in all_assets {
            if !self.in_scope(&asset, store.root()) {
                continue;
            }

            let leaf = asset
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let parsed = paths::parse_asset_leaf(leaf).ok();

            let mut record: Option<Record> = None;
            let mut excluded = false;
            for f in &filters {
                if is_pseudo_key(&f.key, &self.name_keys) {
                    let value = pseudo_value(&f.key, &self.name_keys, &parsed, &asset, store.root());
                    if !f.matches(value.as_deref(), false, false) {
                        excluded = true;
                        break;
                    }
                } else {
                    if record.is_none() {
                        record = store.read_asset(&asset).ok();
                    }
                    let rec = record.as_ref();
                    let (val, empty_dict, empty_list) = rec
                        .map(|r| field_state(r, &f.key))
                        .unwrap_or((None, false, false));
                    if !f.matches(val.as_deref(), empty_dict, empty_list) {
                        excluded = true;
                        break;
                    }
                }
            }
            if excluded {
                continue;
            }

            if record.is_none() && projections.iter().any(|p| !is_pseudo_key(p, &self.name_keys)) {
                record = store.read_asset(&asset).ok();
            }

            let mut values = Vec::with_capacity(projections.len());
            for key in &projections {
                if is_pseudo_key(key, &self.name_keys) {
                    values.push(
                        pseudo_value(key, &self.name_keys, &parsed, &asset, store.root())
                            .unwrap_or_else(|| "<unset>".to_string()),
                    );
                } else if let Some(rec) = &record {
                    let (val, empty_dict, empty_list) = field_state(rec, key);
                    values.push(if empty_dict {
                        "<dict>".to_string()
                    } else if empty_list {
                        "<list>".to_string()
                    } else {
                        val.unwrap_or_else(|| "<unset>".to_string())
                    });
                } else {
                    values.push("<unset>".to_string());
                }
            }

            rows.push(QueryRow { path: asset, values });
        }

        self.sort_rows(&mut rows);
        Ok(rows)
    }

    fn in_scope(&self, asset: &Path, root: &Path) -> bool {
        if self.scopes.is_empty() {
            return true;
        }
        for scope in &self.scopes {
            if asset.starts_with(scope) {
                if self.depth == 0 {
                    return true;
                }
                let asset_depth = asset.strip_prefix(root).map(|p| p.components().count()).unwrap_or(0);
                let scope_depth = scope.strip_prefix(root).map(|p| p.components().count()).unwrap_or(0);
                if (asset_depth as i64) - (scope_depth as i64) <= self.depth {
                    return true;
                }
            }
        }
        false
    }

    fn sort_rows(&self, rows: &mut [QueryRow]) {
        match self.sort {
            SortDirection::None => {
                rows.sort_by(|a, b| a.path.cmp(&b.path));
            }
            SortDirection::Ascending | SortDirection::Descending => {
                rows.sort_by(|a, b| {
                    let primary = a
                        .values
                        .first()
                        .zip(b.values.first())
                        .map(|(x, y)| natord::compare(x, y))
                        .unwrap_or(std::cmp::Ordering::Equal);
                    primary.then_with(|| a.path.cmp(&b.path))
                });
                if self.sort == SortDirection::Descending {
                    rows.reverse();
                }
            }
        }
    }
}

fn field_state(record: &Record, key: &str) -> (Option<String>, bool, bool) {
    match record.get(key) {
        Some(serde_yaml::Value::Mapping(m)) if m.is_empty() => (None, true, false),
        Some(serde_yaml::Value::Sequence(s)) if s.is_empty() => (None, false, true),
        Some(v) => (value_to_scalar_string(v), false, false),
        None => (None, false, false),
    }
}

/// Resolves a pseudo-key's value without touching the asset's YAML.
/// `name_keys` is the repository's configured name-key list in assembly
/// order (`type,make,model,serial` by default); a query key matching one of
/// its entries is resolved positionally against the name parsed from the
/// leaf, so a repository that renames these keys (e.g. `kind` for `type`)
/// still gets correct pseudo-key filtering and projection.
fn pseudo_value(
    key: &str,
    name_keys: &[String],
    parsed: &Option<paths::ParsedName>,
    asset: &Path,
    root: &Path,
) -> Option<String> {
    if let Some(pos) = name_keys.iter().position(|k| k == key) {
        return parsed.as_ref().and_then(|p| {
            let fields = [&p.type_, &p.make, &p.model, &p.serial];
            fields.get(pos).map(|s| (*s).clone())
        });
    }
    match key {
        "onyo.path.absolute" => Some(asset.display().to_string()),
        "onyo.path.parent" => asset.parent().map(|p| paths::relative_posix(root, p)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_conflict_on_negative_depth() {
        let q = Query {
            scopes: vec![],
            depth: -1,
            projections: vec![],
            filters: vec![],
            sort: SortDirection::None,
            name_keys: vec!["type".into(), "make".into(), "model".into(), "serial".into()],
        };
        assert!(matches!(
            (|| -> Result<()> {
                if q.depth < 0 {
                    return Err(OnyoError::FlagConflict("x".into()));
                }
                Ok(())
            })(),
            Err(OnyoError::FlagConflict(_))
        ));
    }

    #[test]
    fn filter_parses_unset_marker() {
        let f = Filter::parse("build-date=<unset>").unwrap();
        assert!(matches!(f.matcher, Matcher::Unset));
    }

    #[test]
    fn filter_parses_regex() {
        let f = Filter::parse("type=lap.*").unwrap();
        assert!(matches!(f.matcher, Matcher::Regex(_)));
    }
}

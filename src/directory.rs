//! Stop lookup table built from the provider's `getstops` listing.

use std::path::Path;

use anyhow::{Context, Result};

use crate::output::StopRow;

pub struct StopDirectory {
    rows: Vec<StopRow>,
}

impl StopDirectory {
    pub fn new(rows: Vec<StopRow>) -> Self {
        Self { rows }
    }

    /// Reads a stop listing written by [`write_stop_rows`](crate::output::write_stop_rows).
    pub fn load(path: &Path) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path)
            .with_context(|| format!("cannot open stop listing {}", path.display()))?;
        let rows = rdr
            .deserialize()
            .collect::<Result<Vec<StopRow>, _>>()
            .with_context(|| format!("malformed stop listing {}", path.display()))?;
        Ok(Self { rows })
    }

    /// Resolves a stop name to its id. Parent stop names win over boarding
    /// point names; the first match in listing order is returned.
    pub fn stop_id_for_name(&self, name: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.stop_name.as_deref() == Some(name))
            .and_then(|r| r.stop_id.as_deref())
            .or_else(|| {
                self.rows
                    .iter()
                    .find(|r| r.specific_stop_stop_name.as_deref() == Some(name))
                    .and_then(|r| r.specific_stop_stop_id.as_deref())
            })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> StopDirectory {
        StopDirectory::new(vec![
            StopRow {
                stop_id: Some("IT".into()),
                stop_name: Some("Illinois Terminal".into()),
                ..Default::default()
            },
            StopRow {
                specific_stop_stop_id: Some("IT:1".into()),
                specific_stop_stop_name: Some("Illinois Terminal (Platform A)".into()),
                ..Default::default()
            },
            StopRow {
                specific_stop_stop_id: Some("GWN:1".into()),
                specific_stop_stop_name: Some("Illinois Terminal".into()),
                ..Default::default()
            },
        ])
    }

    #[test]
    fn test_parent_name_resolves_to_parent_id() {
        assert_eq!(directory().stop_id_for_name("Illinois Terminal"), Some("IT"));
    }

    #[test]
    fn test_point_name_resolves_to_point_id() {
        assert_eq!(
            directory().stop_id_for_name("Illinois Terminal (Platform A)"),
            Some("IT:1")
        );
    }

    #[test]
    fn test_unknown_name() {
        let dir = directory();
        assert_eq!(dir.stop_id_for_name("Nowhere"), None);
        assert_eq!(dir.len(), 3);
        assert!(!dir.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(StopDirectory::load(Path::new("/no/such/all_stops.csv")).is_err());
    }
}

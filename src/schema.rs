use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use crate::error::LoadError;

/// The ordered feature names the estimator was trained on.
///
/// A name's position is its index in every feature vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Creates a schema, rejecting duplicate names.
    pub fn new(names: Vec<String>) -> Result<Self, LoadError> {
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(LoadError::DuplicateColumn(name.clone()));
            }
        }

        Ok(Self { names })
    }

    /// Reads a schema stored as a JSON array of strings.
    pub fn from_json_file(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read(path).map_err(|source| LoadError::Columns {
            path: path.to_path_buf(),
            source,
        })?;

        let names = serde_json::from_slice(&content).map_err(|source| LoadError::ColumnsFormat {
            path: path.to_path_buf(),
            source,
        })?;

        Self::new(names)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Builds the name to position map.
    pub fn index(&self) -> ColumnIndex {
        let positions = self
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        ColumnIndex { positions }
    }
}

/// Position lookup into a [`FeatureSchema`]. Absent names are an ordinary `None`.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn get(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn index_follows_schema_order() {
        let schema = FeatureSchema::new(names(&["Month", "Date_", "Year", "City_Delhi"])).unwrap();
        let index = schema.index();

        assert_eq!(schema.len(), 4);
        assert_eq!(index.get("Month"), Some(0));
        assert_eq!(index.get("Date_"), Some(1));
        assert_eq!(index.get("Year"), Some(2));
        assert_eq!(index.get("City_Delhi"), Some(3));
        assert_eq!(index.get("City_Atlantis"), None);
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = FeatureSchema::new(names(&["Month", "Year", "Month"])).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateColumn(name) if name == "Month"));
    }

    #[test]
    fn reads_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("columns.json");
        fs::write(&path, r#"["Month", "Date_", "Year"]"#).unwrap();

        let schema = FeatureSchema::from_json_file(&path).unwrap();
        assert_eq!(schema.names(), &names(&["Month", "Date_", "Year"])[..]);
    }

    #[test]
    fn rejects_non_string_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("columns.json");
        fs::write(&path, r#"["Month", 2]"#).unwrap();

        let err = FeatureSchema::from_json_file(&path).unwrap_err();
        assert!(matches!(err, LoadError::ColumnsFormat { .. }));
    }
}

use std::fmt;

use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

/// Opaque pagination token issued by the analytics service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    #[serde(default)]
    pub start_cursor: Option<Cursor>,
    #[serde(default)]
    pub end_cursor: Option<Cursor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub header: String,
    pub accessor: String,
}

impl ColumnDescriptor {
    pub fn from_header(header: impl Into<String>) -> Self {
        let header = header.into();
        let accessor = accessor_for(&header);
        Self { header, accessor }
    }
}

/// Normalized key addressing a column's value inside a [`RowRecord`].
pub fn accessor_for(header: &str) -> String {
    header.to_lowercase()
}

/// One table row keyed by accessor, in header order.
///
/// Inserting an accessor that is already present replaces its value but keeps
/// the position of the first insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowRecord {
    cells: Vec<(String, String)>,
}

impl RowRecord {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, accessor: impl Into<String>, value: impl Into<String>) {
        let accessor = accessor.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(key, _)| *key == accessor) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((accessor, value)),
        }
    }

    pub fn get(&self, accessor: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(key, _)| key == accessor)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(key, _)| key.as_str())
    }
}

impl<K, V> FromIterator<(K, V)> for RowRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = RowRecord::default();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl Serialize for RowRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (key, value) in &self.cells {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

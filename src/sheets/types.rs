use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

const ID_FIELD: &str = "_id";
const SOURCE_FIELD: &str = "_sourceId";
const SHEET_FIELD: &str = "_sheetName";

fn is_reserved(header: &str) -> bool {
  [ID_FIELD, SOURCE_FIELD, SHEET_FIELD].contains(&header)
}

/// One data row of a sheet, keyed by header.
///
/// Fields keep header order. A repeated header overwrites the earlier value
/// but keeps the earlier position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
  pub id: String,
  pub source_id: String,
  pub sheet_name: String,
  fields: Vec<(String, String)>,
}

impl Row {
  pub fn new(source_id: &str, sheet_name: &str, index: usize) -> Self {
    Self {
      id: format!("{}-{}-{}", source_id, sheet_name, index),
      source_id: source_id.to_string(),
      sheet_name: sheet_name.to_string(),
      fields: Vec::new(),
    }
  }

  /// Build a row from raw cells. Short rows are padded with empty strings,
  /// cells past the last header are dropped.
  ///
  /// Blank headers and headers that collide with the synthetic `_id`,
  /// `_sourceId` and `_sheetName` keys are skipped.
  pub fn from_cells(
    source_id: &str,
    sheet_name: &str,
    index: usize,
    headers: &[String],
    cells: &[String],
  ) -> Self {
    let mut row = Self::new(source_id, sheet_name, index);
    for (i, header) in headers.iter().enumerate() {
      if header.trim().is_empty() || is_reserved(header) {
        continue;
      }
      let value = cells.get(i).cloned().unwrap_or_default();
      row.insert(header.clone(), value);
    }
    row
  }

  pub fn insert(&mut self, header: String, value: String) {
    match self.fields.iter_mut().find(|(h, _)| *h == header) {
      Some(existing) => existing.1 = value,
      None => self.fields.push((header, value)),
    }
  }

  /// Exact-name lookup.
  pub fn get(&self, header: &str) -> Option<&str> {
    self
      .fields
      .iter()
      .find(|(h, _)| h == header)
      .map(|(_, v)| v.as_str())
  }

  /// Fields in header order.
  pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
    self.fields.iter().map(|(h, v)| (h.as_str(), v.as_str()))
  }

  #[cfg(test)]
  pub fn with_fields(sheet_name: &str, pairs: &[(&str, &str)]) -> Self {
    let mut row = Self::new("test", sheet_name, 0);
    for (h, v) in pairs {
      row.insert(h.to_string(), v.to_string());
    }
    row
  }
}

impl Serialize for Row {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.fields.len() + 3))?;
    map.serialize_entry(ID_FIELD, &self.id)?;
    map.serialize_entry(SOURCE_FIELD, &self.source_id)?;
    map.serialize_entry(SHEET_FIELD, &self.sheet_name)?;
    for (header, value) in &self.fields {
      map.serialize_entry(header, value)?;
    }
    map.end()
  }
}

impl<'de> Deserialize<'de> for Row {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct RowVisitor;

    impl<'de> Visitor<'de> for RowVisitor {
      type Value = Row;

      fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a sheet row object")
      }

      fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Row, A::Error> {
        let mut row = Row::default();
        while let Some((key, value)) = map.next_entry::<String, String>()? {
          match key.as_str() {
            ID_FIELD => row.id = value,
            SOURCE_FIELD => row.source_id = value,
            SHEET_FIELD => row.sheet_name = value,
            _ => row.insert(key, value),
          }
        }
        Ok(row)
      }
    }

    deserializer.deserialize_map(RowVisitor)
  }
}

/// All rows of one sheet, sharing the header row they were read with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetBatch {
  pub source_id: String,
  pub sheet_name: String,
  pub headers: Vec<String>,
  pub data: Vec<Row>,
  pub fetched_at: DateTime<Utc>,
}

impl SheetBatch {
  /// Turn raw range values into a batch: row 0 is the header row.
  ///
  /// Returns `None` when the range held no rows at all.
  pub fn from_values(
    source_id: &str,
    sheet_name: &str,
    values: Vec<Vec<String>>,
    fetched_at: DateTime<Utc>,
  ) -> Option<Self> {
    let mut rows = values.into_iter();
    let headers = rows.next()?;

    let data = rows
      .enumerate()
      .map(|(index, cells)| Row::from_cells(source_id, sheet_name, index, &headers, &cells))
      .collect();

    Some(Self {
      source_id: source_id.to_string(),
      sheet_name: sheet_name.to_string(),
      headers,
      data,
      fetched_at,
    })
  }
}

/// All rows of all batches, in batch order.
pub fn flatten(batches: &[SheetBatch]) -> Vec<&Row> {
  batches.iter().flat_map(|b| b.data.iter()).collect()
}

/// Content digest of a batch list. Fetch times are left out, so refetching
/// unchanged sheets gives the same value.
pub fn fingerprint(batches: &[SheetBatch]) -> String {
  let mut hasher = Sha256::new();
  for batch in batches {
    hasher.update(batch.source_id.as_bytes());
    hasher.update([0]);
    hasher.update(batch.sheet_name.as_bytes());
    hasher.update([0]);
    for header in &batch.headers {
      hasher.update(header.as_bytes());
      hasher.update([0x1f]);
    }
    for row in &batch.data {
      hasher.update([0x1e]);
      for (header, value) in row.fields() {
        hasher.update(header.as_bytes());
        hasher.update([0x1f]);
        hasher.update(value.as_bytes());
        hasher.update([0x1f]);
      }
    }
    hasher.update([0x1d]);
  }
  hex::encode(hasher.finalize())
}

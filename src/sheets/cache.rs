//! Caching implementations for sheet types.

use crate::cache::Cacheable;

use super::types::SheetBatch;

impl Cacheable for SheetBatch {
  fn cache_key(&self) -> String {
    batch_key(&self.source_id, &self.sheet_name)
  }

  fn entity_type() -> &'static str {
    "sheet_batch"
  }
}

/// Cache key of one sheet: source id and sheet name.
pub fn batch_key(source_id: &str, sheet_name: &str) -> String {
  format!("{}:{}", source_id, sheet_name)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  #[test]
  fn test_batch_key_matches_payload_key() {
    let batch = SheetBatch::from_values(
      "test-sheet-2",
      "Linkeidn Outreach",
      vec![vec!["Sent".to_string()]],
      Utc::now(),
    )
    .unwrap();
    assert_eq!(batch.cache_key(), "test-sheet-2:Linkeidn Outreach");
    assert_eq!(batch.cache_key(), batch_key("test-sheet-2", "Linkeidn Outreach"));
  }
}

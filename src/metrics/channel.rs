use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::SourceConfig;
use crate::resolve::find_column;
use crate::sheets::Row;

/// Outreach campaign a row reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Campaign {
  OneToOneEmail,
  Drip,
  #[serde(rename = "linkedin")]
  LinkedIn,
  Calling,
}

impl Campaign {
  pub const ALL: [Campaign; 4] = [
    Campaign::OneToOneEmail,
    Campaign::LinkedIn,
    Campaign::Drip,
    Campaign::Calling,
  ];

  pub fn channel(self) -> Channel {
    match self {
      Campaign::OneToOneEmail | Campaign::Drip => Channel::Email,
      Campaign::LinkedIn => Channel::LinkedIn,
      Campaign::Calling => Channel::Calling,
    }
  }

  pub fn title(self) -> &'static str {
    match self {
      Campaign::OneToOneEmail => "1-1 Email Outreach",
      Campaign::Drip => "DRIP Outreach",
      Campaign::LinkedIn => "LinkedIn Outreach",
      Campaign::Calling => "Calling",
    }
  }

  /// Guess a campaign from free text: a sheet name or a category cell.
  /// Misspellings seen in real sheets are accepted.
  pub fn from_keywords(text: &str) -> Option<Self> {
    let text = text.to_lowercase();
    if text.contains("calling") || text.contains("call") {
      Some(Campaign::Calling)
    } else if text.contains("linkedin") || text.contains("linkeidn") {
      Some(Campaign::LinkedIn)
    } else if text.contains("drip") {
      Some(Campaign::Drip)
    } else if text.contains("1-1") || text.contains("email") || text.contains("edm") {
      Some(Campaign::OneToOneEmail)
    } else {
      None
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Channel {
  Email,
  LinkedIn,
  Calling,
}

impl Channel {
  pub const ALL: [Channel; 3] = [Channel::Email, Channel::LinkedIn, Channel::Calling];
}

/// Free-text columns that may name the campaign of a row.
pub const CATEGORY_COLUMNS: [&str; 4] = ["EDM", "Category", "Type", "Channel"];

/// A row with the campaign it was attributed to.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedRow<'a> {
  pub row: &'a Row,
  pub campaign: Option<Campaign>,
}

impl ClassifiedRow<'_> {
  pub fn channel(&self) -> Option<Channel> {
    self.campaign.map(Campaign::channel)
  }
}

/// Attributes rows to campaigns.
///
/// Configured per-sheet campaigns win, then keywords in the sheet name, then
/// keywords in a category column of the row.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
  overrides: HashMap<(String, String), Campaign>,
}

impl Classifier {
  pub fn new(sources: &[SourceConfig]) -> Self {
    let overrides = sources
      .iter()
      .flat_map(|source| {
        source.sheets.iter().filter_map(move |sheet| {
          sheet
            .campaign
            .map(|c| ((source.id.clone(), sheet.name.clone()), c))
        })
      })
      .collect();
    Self { overrides }
  }

  pub fn classify(&self, row: &Row) -> Option<Campaign> {
    if let Some(campaign) = self
      .overrides
      .get(&(row.source_id.clone(), row.sheet_name.clone()))
    {
      return Some(*campaign);
    }
    if let Some(campaign) = Campaign::from_keywords(&row.sheet_name) {
      return Some(campaign);
    }

    let headers: Vec<&str> = row.fields().map(|(h, _)| h).collect();
    let column = find_column(&headers[..], &CATEGORY_COLUMNS)?;
    row.get(column).and_then(Campaign::from_keywords)
  }

  pub fn classify_all<'a>(&self, rows: &[&'a Row]) -> Vec<ClassifiedRow<'a>> {
    rows
      .iter()
      .map(|&row| ClassifiedRow {
        row,
        campaign: self.classify(row),
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::SheetConfig;

  #[test]
  fn test_sheet_name_keywords() {
    assert_eq!(
      Campaign::from_keywords("1-1 email outreacxh"),
      Some(Campaign::OneToOneEmail)
    );
    assert_eq!(Campaign::from_keywords("DRIP"), Some(Campaign::Drip));
    assert_eq!(Campaign::from_keywords("Linkeidn Outreach"), Some(Campaign::LinkedIn));
    assert_eq!(Campaign::from_keywords("Calling"), Some(Campaign::Calling));
    assert_eq!(Campaign::from_keywords("Summary"), None);
  }

  #[test]
  fn test_configured_campaign_wins() {
    let sources = vec![SourceConfig {
      id: "s1".to_string(),
      name: None,
      spreadsheet_id: "doc".to_string(),
      sheets: vec![SheetConfig {
        name: "DRIP".to_string(),
        gid: None,
        campaign: Some(Campaign::OneToOneEmail),
      }],
    }];
    let classifier = Classifier::new(&sources);

    let mut row = Row::new("s1", "DRIP", 0);
    row.insert("Sent".to_string(), "1".to_string());
    assert_eq!(classifier.classify(&row), Some(Campaign::OneToOneEmail));

    let other = Row::new("s2", "DRIP", 0);
    assert_eq!(classifier.classify(&other), Some(Campaign::Drip));
  }

  #[test]
  fn test_category_column_fallback() {
    let classifier = Classifier::default();
    let row = Row::with_fields("Sheet1", &[("EDM ", "LinkedIn campaign"), ("Sent", "4")]);
    assert_eq!(classifier.classify(&row), Some(Campaign::LinkedIn));

    let row = Row::with_fields("Sheet1", &[("Sent", "4")]);
    assert_eq!(classifier.classify(&row), None);
  }

  #[test]
  fn test_campaign_config_names() {
    let parsed: Vec<Campaign> =
      serde_yaml::from_str("[one_to_one_email, drip, linkedin, calling]").unwrap();
    assert_eq!(
      parsed,
      vec![
        Campaign::OneToOneEmail,
        Campaign::Drip,
        Campaign::LinkedIn,
        Campaign::Calling
      ]
    );
    assert_eq!(Campaign::Drip.channel(), Channel::Email);
  }
}

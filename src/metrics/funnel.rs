//! Funnels, KPI totals and per-channel volumes.

use serde::Serialize;

use super::channel::{Campaign, Channel, ClassifiedRow};
use crate::resolve::{resolve_numeric, Resolved};
use crate::sheets::Row;

pub const SENT: &[&str] = &["Sent"];
pub const OPEN: &[&str] = &["Open"];
pub const CLICK: &[&str] = &["Click"];
pub const UNSUBSCRIBE: &[&str] = &["Unsubscribe"];
pub const CONNECTED: &[&str] = &["Connected", "Connect"];
pub const MESSAGES: &[&str] = &["Messages", "Message"];
pub const VOICEMAIL: &[&str] = &["Voicemail", "Voice Mail"];
pub const LEADS: &[&str] = &["Leads", "Lead"];
pub const CALLS: &[&str] = &["Calls", "Call Made", "Call"];
/// Calling volume as the calling funnel counts it: a `Sent` column wins.
pub const CALL_MADE: &[&str] = &["Sent", "Calls", "Call Made", "Call"];

/// One step of a funnel definition.
pub struct StageDef {
  pub name: &'static str,
  pub candidates: &'static [&'static str],
}

const fn stage(name: &'static str, candidates: &'static [&'static str]) -> StageDef {
  StageDef { name, candidates }
}

const EMAIL_STAGES: &[StageDef] = &[
  stage("Sent", SENT),
  stage("Open", OPEN),
  stage("Click", CLICK),
  stage("Unsubscribe", UNSUBSCRIBE),
  stage("Leads", LEADS),
];

const LINKEDIN_STAGES: &[StageDef] = &[
  stage("Sent", SENT),
  stage("Connected", CONNECTED),
  stage("Messages", MESSAGES),
  stage("Leads", LEADS),
];

const CALLING_STAGES: &[StageDef] = &[
  stage("Call Made", CALL_MADE),
  stage("Voicemail", VOICEMAIL),
  stage("Connect", CONNECTED),
  stage("Leads", LEADS),
];

pub fn stages(campaign: Campaign) -> &'static [StageDef] {
  match campaign {
    Campaign::OneToOneEmail | Campaign::Drip => EMAIL_STAGES,
    Campaign::LinkedIn => LINKEDIN_STAGES,
    Campaign::Calling => CALLING_STAGES,
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStage {
  pub name: String,
  pub value: f64,
  /// Rows that actually carried a numeric value for this stage
  pub rows_reporting: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Funnel {
  pub campaign: Campaign,
  pub title: String,
  pub stages: Vec<FunnelStage>,
}

/// Sum each stage over the rows attributed to `campaign`.
pub fn funnel(campaign: Campaign, rows: &[ClassifiedRow]) -> Funnel {
  let members: Vec<&Row> = rows
    .iter()
    .filter(|r| r.campaign == Some(campaign))
    .map(|r| r.row)
    .collect();

  let stages = stages(campaign)
    .iter()
    .map(|def| {
      let resolved: Vec<Resolved> = members
        .iter()
        .map(|row| resolve_numeric(row, def.candidates))
        .collect();
      FunnelStage {
        name: def.name.to_string(),
        value: resolved.iter().map(Resolved::value_or_zero).sum(),
        rows_reporting: resolved.iter().filter(|r| r.is_found()).count(),
      }
    })
    .collect();

  Funnel {
    campaign,
    title: campaign.title().to_string(),
    stages,
  }
}

pub fn all_funnels(rows: &[ClassifiedRow]) -> Vec<Funnel> {
  Campaign::ALL.iter().map(|c| funnel(*c, rows)).collect()
}

// ============================================================================
// KPIs
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
  pub total_sent: f64,
  pub total_open: f64,
  pub total_click: f64,
  pub total_connected: f64,
  pub total_calls: f64,
  pub total_leads: f64,
  /// Percent of sent, one decimal
  pub open_rate: f64,
  pub click_rate: f64,
  /// Percent of calls, one decimal
  pub connection_rate: f64,
}

/// Percentage rounded to one decimal; 0 when there is nothing to divide by.
pub fn percent(part: f64, whole: f64) -> f64 {
  if whole > 0.0 {
    (part / whole * 1000.0).round() / 10.0
  } else {
    0.0
  }
}

/// Calls of a row. Rows without any calls column count their `Sent` value.
pub fn calls(row: &Row) -> f64 {
  match resolve_numeric(row, CALLS) {
    Resolved::Found { value, .. } => value,
    Resolved::Missing => resolve_numeric(row, SENT).value_or_zero(),
  }
}

pub fn kpis<'a>(rows: impl IntoIterator<Item = &'a Row>) -> Kpis {
  let mut k = Kpis::default();
  for row in rows {
    k.total_sent += resolve_numeric(row, SENT).value_or_zero();
    k.total_open += resolve_numeric(row, OPEN).value_or_zero();
    k.total_click += resolve_numeric(row, CLICK).value_or_zero();
    k.total_connected += resolve_numeric(row, CONNECTED).value_or_zero();
    k.total_calls += calls(row);
    k.total_leads += resolve_numeric(row, LEADS).value_or_zero();
  }
  k.open_rate = percent(k.total_open, k.total_sent);
  k.click_rate = percent(k.total_click, k.total_sent);
  k.connection_rate = percent(k.total_connected, k.total_calls);
  k
}

// ============================================================================
// Channels
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSlice {
  pub name: Channel,
  pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelComparison {
  pub email: f64,
  pub linkedin: f64,
  pub calling: f64,
}

/// Outreach volume of a row for its channel: calls for calling (Sent only
/// when no calls column exists), sent otherwise.
pub fn volume(channel: Channel, row: &Row) -> f64 {
  match channel {
    Channel::Calling => calls(row),
    Channel::Email | Channel::LinkedIn => resolve_numeric(row, SENT).value_or_zero(),
  }
}

fn per_channel(rows: &[ClassifiedRow], value: impl Fn(Channel, &Row) -> f64) -> [f64; 3] {
  let mut totals = [0.0; 3];
  for r in rows {
    if let Some(channel) = r.channel() {
      let slot = Channel::ALL.iter().position(|c| *c == channel).unwrap_or(0);
      totals[slot] += value(channel, r.row);
    }
  }
  totals
}

fn non_zero_slices(totals: [f64; 3]) -> Vec<ChannelSlice> {
  Channel::ALL
    .iter()
    .zip(totals)
    .filter(|(_, v)| *v > 0.0)
    .map(|(name, value)| ChannelSlice { name: *name, value })
    .collect()
}

pub fn channel_comparison(rows: &[ClassifiedRow]) -> ChannelComparison {
  let [email, linkedin, calling] = per_channel(rows, volume);
  ChannelComparison {
    email,
    linkedin,
    calling,
  }
}

/// Volume share per channel; empty channels are left out.
pub fn channel_distribution(rows: &[ClassifiedRow]) -> Vec<ChannelSlice> {
  non_zero_slices(per_channel(rows, volume))
}

/// Leads per channel; empty channels are left out.
pub fn leads_distribution(rows: &[ClassifiedRow]) -> Vec<ChannelSlice> {
  non_zero_slices(per_channel(rows, |_, row| {
    resolve_numeric(row, LEADS).value_or_zero()
  }))
}

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Response body of the bills endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillsDocument {
    #[serde(default)]
    pub data: Vec<Bill>,
}

/// One billing-period statement.
#[derive(Debug, Clone, Deserialize)]
pub struct Bill {
    pub id: String,
    pub attributes: BillAttributes,
}

/// Attributes of a bill. `start` never lies after `end`; documents that
/// break this fail to deserialize.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawBillAttributes")]
pub struct BillAttributes {
    /// Total charge for the period, in dollars.
    pub cost: f64,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// Energy used over the period (kWh).
    pub usage_kwh: f64,
    pub peak_demand: f64,
    pub demand_unit: String,
}

/// Bill attributes as they arrive on the wire, before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBillAttributes {
    cost: f64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    start: DateTime<FixedOffset>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    end: DateTime<FixedOffset>,
    #[serde(rename = "use")]
    usage_kwh: f64,
    peak_demand: f64,
    #[serde(default)]
    demand_unit: String,
}

#[derive(Debug, Error)]
pub enum BillError {
    #[error("Billing period starts at {start} after it ends at {end}")]
    InvertedPeriod {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
}

impl TryFrom<RawBillAttributes> for BillAttributes {
    type Error = BillError;

    fn try_from(raw: RawBillAttributes) -> Result<Self, Self::Error> {
        if raw.start > raw.end {
            return Err(BillError::InvertedPeriod {
                start: raw.start,
                end: raw.end,
            });
        }
        Ok(Self {
            cost: raw.cost,
            start: raw.start,
            end: raw.end,
            usage_kwh: raw.usage_kwh,
            peak_demand: raw.peak_demand,
            demand_unit: raw.demand_unit,
        })
    }
}

/// Response body of the readings endpoint. The API can return several
/// meters in one document; callers pick one with [`ReadingsDocument::meter`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadingsDocument {
    #[serde(default)]
    pub data: Vec<MeterReadings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeterReadings {
    pub attributes: MeterAttributes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeterAttributes {
    pub readings: ReadingSeries,
}

/// Instantaneous kW samples keyed by ISO-8601 timestamp, in document order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadingSeries {
    #[serde(default)]
    pub kw: IndexMap<String, f64>,
}

impl ReadingsDocument {
    pub fn meter(&self, index: usize) -> Option<&ReadingSeries> {
        self.data.get(index).map(|m| &m.attributes.readings)
    }
}

/// Parse a timestamp that carries an offset: RFC 3339, or the same with a
/// colon-less offset such as `+0000`.
pub fn parse_offset_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}

/// Parse a bill timestamp. Offset-carrying forms keep their offset; a naive
/// `YYYY-MM-DDTHH:MM:SS[.f]` or a bare `YYYY-MM-DD` is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Some(dt) = parse_offset_timestamp(raw) {
        return Some(dt);
    }
    let naive = raw.parse::<NaiveDateTime>().ok().or_else(|| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })?;
    Some(naive.and_utc().fixed_offset())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Headline figures for the most recent bill.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillMetrics {
    pub current_cost: f64,
    /// Percent change against the previous bill; 0 when there is none.
    pub cost_change_percent: f64,
    pub billing_period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyDataPoint {
    pub month: String,
    pub cost: f64,
    pub usage: f64,
    pub peak_demand: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakDemandPoint {
    pub month: String,
    pub peak_demand: f64,
    pub cost: f64,
}

/// Average draw for one hour of the day across the whole reading series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyUsagePoint {
    pub hour: String,
    pub avg_kw: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakInterval {
    pub timestamp: String,
    pub kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCost {
    pub month: String,
    pub cost: f64,
}

/// Bill costs of a single calendar year, plus every year available.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyCosts {
    pub years: Vec<i32>,
    pub selected_year: Option<i32>,
    pub months: Vec<MonthCost>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillRow {
    pub id: String,
    pub start: NaiveDate,
    pub cost: f64,
    pub peak_demand: f64,
    pub demand_unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingRow {
    pub timestamp: String,
    pub kw: f64,
}

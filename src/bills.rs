use chrono::{DateTime, Datelike, FixedOffset};
use log::warn;
use std::collections::BTreeMap;

use crate::model::{
    Bill, BillAttributes, BillMetrics, BillRow, BillsDocument, MonthCost, MonthlyDataPoint,
    PeakDemandPoint, YearlyCosts,
};

/// Current cost and month-over-month change of the most recent bill.
///
/// Bills are ranked by end instant, newest first, regardless of the offset
/// each timestamp was written in. The sort is stable, so of two bills ending
/// at the same instant the one listed first in the document counts as the
/// latest. Returns `None` when there are no bills.
pub fn latest_bill_metrics(bills: Option<&BillsDocument>) -> Option<BillMetrics> {
    let newest = newest_first(bills);
    let (latest, rest) = newest.split_first()?;
    let latest = &latest.attributes;

    let cost_change_percent = match rest.first() {
        Some(previous) => percent_change(latest.cost, previous.attributes.cost),
        None => 0.0,
    };

    Some(BillMetrics {
        current_cost: latest.cost,
        cost_change_percent,
        billing_period: format!(
            "{} - {}",
            short_date(latest.start),
            short_date(latest.end)
        ),
    })
}

/// One point per bill, oldest first, for the monthly cost chart.
/// Two bills starting in the same month both appear under the same label.
pub fn monthly_bill_series(bills: Option<&BillsDocument>) -> Vec<MonthlyDataPoint> {
    by_start_month(bills, |month, bill| MonthlyDataPoint {
        month,
        cost: bill.cost,
        usage: bill.usage_kwh,
        peak_demand: bill.peak_demand,
    })
}

pub fn peak_demand_trends(bills: Option<&BillsDocument>) -> Vec<PeakDemandPoint> {
    by_start_month(bills, |month, bill| PeakDemandPoint {
        month,
        peak_demand: bill.peak_demand,
        cost: bill.cost,
    })
}

/// Costs of one calendar year, keyed by the month each bill ends in.
///
/// `year` falls back to the latest year on record when it is `None` or has
/// no bills.
pub fn yearly_costs(bills: Option<&BillsDocument>, year: Option<i32>) -> YearlyCosts {
    let mut by_year: BTreeMap<i32, Vec<&Bill>> = BTreeMap::new();
    for bill in bills.map(|doc| doc.data.as_slice()).unwrap_or_default() {
        by_year.entry(bill.attributes.end.year()).or_default().push(bill);
    }

    let years: Vec<i32> = by_year.keys().rev().copied().collect();
    let selected_year = year
        .filter(|y| by_year.contains_key(y))
        .or_else(|| years.first().copied());

    let mut selected = selected_year
        .and_then(|y| by_year.remove(&y))
        .unwrap_or_default();
    selected.sort_by_key(|bill| bill.attributes.end.month());

    YearlyCosts {
        years,
        selected_year,
        months: selected
            .into_iter()
            .map(|bill| MonthCost {
                month: bill.attributes.end.format("%b").to_string(),
                cost: bill.attributes.cost,
            })
            .collect(),
    }
}

/// The `limit` most recent bills, newest first, for the raw data table.
pub fn recent_bills(bills: Option<&BillsDocument>, limit: usize) -> Vec<BillRow> {
    newest_first(bills)
        .into_iter()
        .take(limit)
        .map(|bill| BillRow {
            id: bill.id.clone(),
            start: bill.attributes.start.date_naive(),
            cost: bill.attributes.cost,
            peak_demand: bill.attributes.peak_demand,
            demand_unit: bill.attributes.demand_unit.clone(),
        })
        .collect()
}

/// Abbreviated month and year in the timestamp's own offset, e.g. "Sep 2023".
pub fn month_label(ts: DateTime<FixedOffset>) -> String {
    ts.format("%b %Y").to_string()
}

fn short_date(ts: DateTime<FixedOffset>) -> String {
    ts.format("%-m/%-d/%Y").to_string()
}

fn newest_first(bills: Option<&BillsDocument>) -> Vec<&Bill> {
    let mut sorted: Vec<&Bill> = bills.map(|doc| doc.data.iter().collect()).unwrap_or_default();
    sorted.sort_by(|a, b| b.attributes.end.cmp(&a.attributes.end));
    sorted
}

/// Sort a copy of the bills by start instant ascending and project each one,
/// labelled with its start month.
fn by_start_month<T>(
    bills: Option<&BillsDocument>,
    project: impl Fn(String, &BillAttributes) -> T,
) -> Vec<T> {
    let mut sorted: Vec<&Bill> = bills.map(|doc| doc.data.iter().collect()).unwrap_or_default();
    sorted.sort_by_key(|bill| bill.attributes.start);
    sorted
        .into_iter()
        .map(|bill| project(month_label(bill.attributes.start), &bill.attributes))
        .collect()
}

/// A previous cost of zero has no meaningful ratio; it is reported as no change.
fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        warn!("Previous bill cost is zero, reporting 0% change");
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

use chrono::TimeZone;
use log::warn;
use serde::Serialize;
use std::fmt::Write;

use crate::bills;
use crate::client::Snapshot;
use crate::config::Config;
use crate::model::{
    BillMetrics, BillRow, HourlyUsagePoint, MonthlyDataPoint, PeakDemandPoint, PeakInterval,
    ReadingRow, YearlyCosts,
};
use crate::readings;

const RAW_TABLE_ROWS: usize = 10;
const BAR_WIDTH: usize = 40;

/// Which slices of the snapshot to show.
#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    pub meter_index: usize,
    pub top: usize,
    pub year: Option<i32>,
}

impl From<&Config> for ViewOptions {
    fn from(config: &Config) -> Self {
        Self {
            meter_index: config.meter_index,
            top: config.top,
            year: config.year,
        }
    }
}

/// Every derived view of one snapshot, ready to print.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub metrics: Option<BillMetrics>,
    pub monthly: Vec<MonthlyDataPoint>,
    pub hourly: Vec<HourlyUsagePoint>,
    pub peak_demand: Vec<PeakDemandPoint>,
    pub yearly: YearlyCosts,
    pub top_peaks: Vec<PeakInterval>,
    pub recent_bills: Vec<BillRow>,
    pub sample_readings: Vec<ReadingRow>,
}

impl Dashboard {
    pub fn build<Tz: TimeZone>(snapshot: &Snapshot, options: &ViewOptions, tz: &Tz) -> Self {
        let bill_doc = Some(&snapshot.bills);
        let meter = snapshot.readings.meter(options.meter_index);
        if meter.is_none() {
            warn!(
                "Readings response has no meter at index {} ({} available)",
                options.meter_index,
                snapshot.readings.data.len()
            );
        }

        Self {
            metrics: bills::latest_bill_metrics(bill_doc),
            monthly: bills::monthly_bill_series(bill_doc),
            hourly: readings::hourly_usage_pattern(meter, tz),
            peak_demand: bills::peak_demand_trends(bill_doc),
            yearly: bills::yearly_costs(bill_doc, options.year),
            top_peaks: readings::top_peak_intervals(meter, options.top),
            recent_bills: bills::recent_bills(bill_doc, RAW_TABLE_ROWS),
            sample_readings: readings::sample_readings(meter, RAW_TABLE_ROWS),
        }
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        self.write_text(&mut out)?;
        Ok(out)
    }

    fn write_text(&self, out: &mut String) -> std::fmt::Result {
        heading(out, "Key Metrics")?;
        match &self.metrics {
            Some(m) => {
                writeln!(out, "Current cost: {}", currency(m.current_cost))?;
                writeln!(out, "{} from last month", signed_percent(m.cost_change_percent))?;
                writeln!(out, "Billing period: {}", m.billing_period)?;
            }
            None => writeln!(out, "No bills available")?,
        }

        heading(out, "Monthly Costs")?;
        let max_cost = max_of(self.monthly.iter().map(|p| p.cost));
        for p in &self.monthly {
            writeln!(
                out,
                "{:<9} {:>12}  {}",
                p.month,
                currency(p.cost),
                bar(p.cost, max_cost)
            )?;
        }

        heading(out, "Daily Usage Pattern")?;
        let max_kw = max_of(self.hourly.iter().map(|p| p.avg_kw));
        for p in &self.hourly {
            writeln!(
                out,
                "{:>5} {:>9.2} kW  {}",
                p.hour,
                p.avg_kw,
                bar(p.avg_kw, max_kw)
            )?;
        }

        heading(out, "Peak Demand Analysis")?;
        let max_peak = max_of(self.peak_demand.iter().map(|p| p.peak_demand));
        for p in &self.peak_demand {
            writeln!(
                out,
                "{:<9} {:>8.1} kW  {}",
                p.month,
                p.peak_demand,
                bar(p.peak_demand, max_peak)
            )?;
        }

        heading(out, "Costs by Year")?;
        match self.yearly.selected_year {
            Some(year) => {
                let years: Vec<String> = self.yearly.years.iter().map(|y| y.to_string()).collect();
                writeln!(out, "{} (available: {})", year, years.join(", "))?;
                for m in &self.yearly.months {
                    writeln!(out, "{:<4} {:>12}", m.month, currency(m.cost))?;
                }
            }
            None => writeln!(out, "No bills available")?,
        }

        heading(out, "Top Peak Intervals")?;
        for p in &self.top_peaks {
            writeln!(out, "{:<28} {:>8.1} kW", p.timestamp, p.kw)?;
        }

        heading(out, "Raw Data")?;
        writeln!(out, "Recent Bills")?;
        writeln!(out, "{:<12} {:>12} {:>10}", "Date", "Cost", "Peak")?;
        for b in &self.recent_bills {
            writeln!(
                out,
                "{:<12} {:>12} {:>7.1} {}",
                b.start.format("%-m/%-d/%Y").to_string(),
                currency(b.cost),
                b.peak_demand,
                b.demand_unit
            )?;
        }
        writeln!(out)?;
        writeln!(out, "Sample Readings")?;
        writeln!(out, "{:<28} {:>8}", "Time", "kW")?;
        for r in &self.sample_readings {
            writeln!(out, "{:<28} {:>8.1}", r.timestamp, r.kw)?;
        }
        Ok(())
    }
}

fn heading(out: &mut String, title: &str) -> std::fmt::Result {
    if !out.is_empty() {
        writeln!(out)?;
    }
    writeln!(out, "== {} ==", title)
}

fn max_of(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, f64::max)
}

/// Horizontal bar scaled against the largest value in the section.
fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(len.min(BAR_WIDTH))
}

/// Dollar amount with thousands separators, e.g. `$3,699.85`.
fn currency(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let negative = amount < 0.0 && formatted != "0.00";
    let (whole, cents) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

fn signed_percent(change: f64) -> String {
    if change > 0.0 {
        format!("+{:.1}%", change)
    } else {
        format!("{:.1}%", change)
    }
}

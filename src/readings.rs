use chrono::{NaiveDateTime, TimeZone, Timelike};
use log::debug;

use crate::model::{
    parse_offset_timestamp, HourlyUsagePoint, PeakInterval, ReadingRow, ReadingSeries,
};

pub const HOURS_PER_DAY: usize = 24;

/// Average kW per hour of the day over every reading in the series.
///
/// Always returns 24 points, midnight first. Hours without samples report an
/// average and count of zero. Timestamps carrying an offset are converted to
/// `tz` before the hour is taken; naive timestamps are used as-is.
pub fn hourly_usage_pattern<Tz: TimeZone>(
    series: Option<&ReadingSeries>,
    tz: &Tz,
) -> Vec<HourlyUsagePoint> {
    let mut buckets = [(0.0_f64, 0_u32); HOURS_PER_DAY];

    if let Some(series) = series {
        for (timestamp, kw) in &series.kw {
            match local_hour(timestamp, tz) {
                Some(hour) => {
                    let (total, count) = &mut buckets[hour as usize];
                    *total += kw;
                    *count += 1;
                }
                None => debug!("Skipping reading with unparseable timestamp {}", timestamp),
            }
        }
    }

    buckets
        .iter()
        .enumerate()
        .map(|(hour, &(total, count))| HourlyUsagePoint {
            hour: hour_label(hour as u32),
            avg_kw: if count == 0 {
                0.0
            } else {
                total / f64::from(count)
            },
            count,
        })
        .collect()
}

/// Hour of the day (0-23) a reading timestamp falls in.
pub fn local_hour<Tz: TimeZone>(timestamp: &str, tz: &Tz) -> Option<u32> {
    if let Some(dt) = parse_offset_timestamp(timestamp) {
        return Some(dt.with_timezone(tz).hour());
    }
    timestamp
        .parse::<NaiveDateTime>()
        .ok()
        .map(|naive| naive.hour())
}

/// 12-hour clock label: 0 → "12 AM", 13 → "1 PM".
pub fn hour_label(hour: u32) -> String {
    match hour {
        0 => "12 AM".to_string(),
        1..=11 => format!("{} AM", hour),
        12 => "12 PM".to_string(),
        _ => format!("{} PM", hour - 12),
    }
}

/// The `limit` highest-draw readings, highest first. Equal draws are ordered
/// by timestamp key.
pub fn top_peak_intervals(series: Option<&ReadingSeries>, limit: usize) -> Vec<PeakInterval> {
    let Some(series) = series else {
        return Vec::new();
    };

    let mut peaks: Vec<PeakInterval> = series
        .kw
        .iter()
        .map(|(timestamp, &kw)| PeakInterval {
            timestamp: timestamp.clone(),
            kw,
        })
        .collect();
    peaks.sort_by(|a, b| {
        b.kw.total_cmp(&a.kw)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });
    peaks.truncate(limit);
    peaks
}

/// The first `limit` readings in document order.
pub fn sample_readings(series: Option<&ReadingSeries>, limit: usize) -> Vec<ReadingRow> {
    series
        .map(|s| {
            s.kw.iter()
                .take(limit)
                .map(|(timestamp, &kw)| ReadingRow {
                    timestamp: timestamp.clone(),
                    kw,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use chrono_tz::America::New_York;

    fn series(entries: &[(&str, f64)]) -> ReadingSeries {
        ReadingSeries {
            kw: entries
                .iter()
                .map(|(ts, kw)| (ts.to_string(), *kw))
                .collect(),
        }
    }

    #[test]
    fn hour_labels() {
        assert_eq!(hour_label(0), "12 AM");
        assert_eq!(hour_label(1), "1 AM");
        assert_eq!(hour_label(11), "11 AM");
        assert_eq!(hour_label(12), "12 PM");
        assert_eq!(hour_label(13), "1 PM");
        assert_eq!(hour_label(23), "11 PM");
    }

    #[test]
    fn empty_input_yields_24_zero_points() {
        for points in [
            hourly_usage_pattern(None, &Utc),
            hourly_usage_pattern(Some(&ReadingSeries::default()), &Utc),
        ] {
            assert_eq!(points.len(), HOURS_PER_DAY);
            assert!(points.iter().all(|p| p.avg_kw == 0.0 && p.count == 0));
            assert_eq!(points[0].hour, "12 AM");
            assert_eq!(points[23].hour, "11 PM");
        }
    }

    #[test]
    fn averages_within_hour_bucket() {
        let s = series(&[("2023-09-01T09:15:00Z", 10.0), ("2023-09-01T09:45:00Z", 20.0)]);
        let points = hourly_usage_pattern(Some(&s), &Utc);
        assert_eq!(points.len(), HOURS_PER_DAY);
        assert_eq!(points[9].hour, "9 AM");
        assert!((points[9].avg_kw - 15.0).abs() < 1e-9);
        assert_eq!(points[9].count, 2);
        for (hour, p) in points.iter().enumerate() {
            if hour != 9 {
                assert_eq!(p.avg_kw, 0.0);
                assert_eq!(p.count, 0);
            }
        }
    }

    #[test]
    fn buckets_span_days() {
        let s = series(&[
            ("2023-09-01T14:00:00Z", 30.0),
            ("2023-09-02T14:15:00Z", 32.0),
            ("2023-09-03T14:30:00Z", 34.0),
            ("2023-09-03T02:00:00Z", 6.0),
        ]);
        let points = hourly_usage_pattern(Some(&s), &Utc);
        assert!((points[14].avg_kw - 32.0).abs() < 1e-9);
        assert_eq!(points[14].count, 3);
        assert_eq!(points[2].count, 1);
        let total: u32 = points.iter().map(|p| p.count).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn hour_taken_in_requested_zone() {
        // 13:00 UTC is 09:00 in New York during daylight time.
        let s = series(&[("2023-09-01T13:00:00Z", 12.0)]);
        let points = hourly_usage_pattern(Some(&s), &New_York);
        assert_eq!(points[9].count, 1);
        assert_eq!(points[13].count, 0);
    }

    #[test]
    fn offset_timestamps_convert() {
        assert_eq!(local_hour("2023-09-01T09:15:00-07:00", &Utc), Some(16));
        assert_eq!(local_hour("2023-09-01T09:15:00", &Utc), Some(9));
        assert_eq!(local_hour("not a time", &Utc), None);
    }

    #[test]
    fn colon_less_offsets_are_bucketed() {
        assert_eq!(local_hour("2023-09-01T09:15:00+0000", &Utc), Some(9));
        assert_eq!(local_hour("2023-09-01T09:15:00-0700", &Utc), Some(16));

        let s = series(&[("2023-09-01T09:15:00+0000", 10.0), ("2023-09-01T09:45:00Z", 20.0)]);
        let points = hourly_usage_pattern(Some(&s), &Utc);
        assert_eq!(points[9].count, 2);
        assert!((points[9].avg_kw - 15.0).abs() < 1e-9);
    }

    #[test]
    fn unparseable_timestamps_skipped() {
        let s = series(&[("garbage", 99.0), ("2023-09-01T00:30:00Z", 4.0)]);
        let points = hourly_usage_pattern(Some(&s), &Utc);
        assert_eq!(points[0].count, 1);
        assert!((points[0].avg_kw - 4.0).abs() < 1e-9);
        let total: u32 = points.iter().map(|p| p.count).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn top_peaks_sorted_descending() {
        let s = series(&[
            ("2023-09-01T10:00:00Z", 12.0),
            ("2023-09-01T14:00:00Z", 41.5),
            ("2023-09-01T15:00:00Z", 38.0),
            ("2023-09-01T13:00:00Z", 41.5),
        ]);
        let peaks = top_peak_intervals(Some(&s), 3);
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks[0].timestamp, "2023-09-01T13:00:00Z");
        assert_eq!(peaks[1].timestamp, "2023-09-01T14:00:00Z");
        assert_eq!(peaks[2].kw, 38.0);
        assert!(top_peak_intervals(None, 3).is_empty());
    }

    #[test]
    fn samples_follow_document_order() {
        let s = series(&[
            ("2023-09-01T10:00:00Z", 1.0),
            ("2023-09-01T09:00:00Z", 2.0),
            ("2023-09-01T11:00:00Z", 3.0),
        ]);
        let rows = sample_readings(Some(&s), 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, "2023-09-01T10:00:00Z");
        assert_eq!(rows[1].kw, 2.0);
        assert!(sample_readings(None, 10).is_empty());
    }
}

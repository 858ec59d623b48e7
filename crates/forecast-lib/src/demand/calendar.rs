//! Calendar decomposition of a week label

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate};

/// Format of the demand week label, e.g. `17/01/11`
pub const WEEK_LABEL_FORMAT: &str = "%d/%m/%y";

const SECONDS_PER_WEEK: f64 = 86_400.0 * 7.0;

/// Calendar fields of one date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarFields {
    pub year: i32,
    /// Day of month
    pub date: u32,
    pub month: u32,
    /// Monday = 0
    pub weekday: u32,
    /// ISO week number
    pub weeknum: u32,
    /// Fractional weeks elapsed since the configured base date
    pub week_serial: f64,
}

impl CalendarFields {
    pub fn of(day: NaiveDate, base_date: NaiveDate) -> Self {
        let elapsed = day.signed_duration_since(base_date).num_seconds() as f64;
        Self {
            year: day.year(),
            date: day.day(),
            month: day.month(),
            weekday: day.weekday().num_days_from_monday(),
            weeknum: day.iso_week().week(),
            week_serial: elapsed / SECONDS_PER_WEEK,
        }
    }
}

/// Calendar fields for a week start and its week end (start + 6 days)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekCalendar {
    pub start: CalendarFields,
    pub end: CalendarFields,
}

impl WeekCalendar {
    pub fn new(week_start: NaiveDate, base_date: NaiveDate) -> Self {
        let week_end = week_start + Duration::days(6);
        Self {
            start: CalendarFields::of(week_start, base_date),
            end: CalendarFields::of(week_end, base_date),
        }
    }

    /// Value of a named calendar field; week-end fields carry an `end_` prefix
    pub fn field(&self, name: &str) -> Option<f64> {
        let (fields, key) = match name.strip_prefix("end_") {
            Some(rest) => (&self.end, rest),
            None => (&self.start, name),
        };
        let value = match key {
            "year" => fields.year as f64,
            "date" => fields.date as f64,
            "month" => fields.month as f64,
            "weekday" => fields.weekday as f64,
            "weeknum" => fields.weeknum as f64,
            "week_serial" => fields.week_serial,
            _ => return None,
        };
        Some(value)
    }
}

/// Parse a `dd/mm/yy` week label
pub fn parse_week_label(label: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(label.trim(), WEEK_LABEL_FORMAT).map_err(|e| {
        ForecastError::validation(format!(
            "Invalid week '{}', expected DD/MM/YY: {}",
            label, e
        ))
    })
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        ForecastError::validation(format!(
            "Invalid date '{}', expected YYYY-MM-DD: {}",
            value, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_week_label() {
        assert_eq!(parse_week_label("17/01/11").unwrap(), date(2011, 1, 17));
    }

    #[test]
    fn test_malformed_week_label() {
        for label in ["2011-01-17", "32/01/11", "", "17/13/11"] {
            assert!(matches!(
                parse_week_label(label),
                Err(ForecastError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_week_decomposition() {
        // 2011-01-17 is a Monday in ISO week 3
        let cal = WeekCalendar::new(date(2011, 1, 17), date(2011, 1, 17));
        assert_eq!(cal.start.weekday, 0);
        assert_eq!(cal.start.weeknum, 3);
        assert_eq!(cal.start.week_serial, 0.0);
        assert_eq!(cal.end.date, 23);
        assert_eq!(cal.end.weekday, 6);
        assert!((cal.end.week_serial - 6.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_week_end_crosses_year() {
        let cal = WeekCalendar::new(date(2012, 12, 28), date(2011, 1, 17));
        assert_eq!(cal.start.year, 2012);
        assert_eq!(cal.end.year, 2013);
        assert_eq!(cal.end.month, 1);
        assert_eq!(cal.field("end_year"), Some(2013.0));
        assert_eq!(cal.field("year"), Some(2012.0));
    }

    #[test]
    fn test_unknown_field() {
        let cal = WeekCalendar::new(date(2011, 1, 17), date(2011, 1, 17));
        assert_eq!(cal.field("quarter"), None);
        assert_eq!(cal.field("end_quarter"), None);
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date("2012-11-02").unwrap(), date(2012, 11, 2));
        assert!(parse_iso_date("02/11/2012").is_err());
    }
}

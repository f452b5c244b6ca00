//! Five-field cron expressions: `minute hour day-of-month month day-of-week`.
//!
//! Each field accepts `*`, `N`, `N-M`, `*/S`, `N-M/S`, `N/S` and comma lists.

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    source: String,
    minutes: Vec<u32>,
    hours: Vec<u32>,
    days_of_month: Vec<u32>,
    months: Vec<u32>,
    /// 0 = Sunday
    days_of_week: Vec<u32>,
}

impl CronExpr {
    pub fn parse(expr: &str) -> Result<Self, String> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = fields.as_slice() else {
            return Err(format!(
                "expected 5 fields (minute hour dom month dow), got {}",
                fields.len()
            ));
        };

        Ok(Self {
            source: fields.join(" "),
            minutes: field("minute", minute, 0, 59)?,
            hours: field("hour", hour, 0, 23)?,
            days_of_month: field("day-of-month", dom, 1, 31)?,
            months: field("month", month, 1, 12)?,
            days_of_week: field("day-of-week", dow, 0, 6)?,
        })
    }

    pub fn matches(&self, at: &DateTime<Utc>) -> bool {
        self.minutes.contains(&at.minute())
            && self.hours.contains(&at.hour())
            && self.days_of_month.contains(&at.day())
            && self.months.contains(&at.month())
            && self.days_of_week.contains(&at.weekday().num_days_from_sunday())
    }
}

impl FromStr for CronExpr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn field(name: &str, spec: &str, min: u32, max: u32) -> Result<Vec<u32>, String> {
    let mut values = Vec::new();
    for part in spec.split(',') {
        values.extend(part_values(part, min, max).map_err(|e| format!("{name}: {e}"))?);
    }
    values.sort_unstable();
    values.dedup();
    if values.is_empty() {
        return Err(format!("{name}: no values"));
    }
    Ok(values)
}

fn part_values(part: &str, min: u32, max: u32) -> Result<Vec<u32>, String> {
    let (base, step) = match part.split_once('/') {
        Some((base, step)) => {
            let step: u32 = step.parse().map_err(|_| format!("invalid step '{step}'"))?;
            if step == 0 {
                return Err("step cannot be zero".into());
            }
            (base, step)
        }
        None => (part, 1),
    };

    let (start, end) = match base {
        "*" => (min, max),
        _ => match base.split_once('-') {
            Some((a, b)) => (number(a)?, number(b)?),
            // `N/S` runs from N to the field maximum.
            None if step > 1 => (number(base)?, max),
            None => {
                let n = number(base)?;
                (n, n)
            }
        },
    };

    if start < min || end > max || start > end {
        return Err(format!("{start}-{end} outside {min}-{max}"));
    }
    Ok((start..=end).step_by(step as usize).collect())
}

fn number(s: &str) -> Result<u32, String> {
    s.parse().map_err(|_| format!("invalid number '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn every_minute() {
        let expr = CronExpr::parse("* * * * *").unwrap();
        assert_eq!(expr.minutes.len(), 60);
        assert_eq!(expr.days_of_week.len(), 7);
    }

    #[test]
    fn steps_ranges_and_lists() {
        assert_eq!(CronExpr::parse("*/15 * * * *").unwrap().minutes, vec![0, 15, 30, 45]);
        assert_eq!(CronExpr::parse("0,30 * * * *").unwrap().minutes, vec![0, 30]);
        assert_eq!(CronExpr::parse("0 9-17/4 * * *").unwrap().hours, vec![9, 13, 17]);
        assert_eq!(CronExpr::parse("5/20 * * * *").unwrap().minutes, vec![5, 25, 45]);
        assert_eq!(
            CronExpr::parse("30 2 * * 1-5").unwrap().days_of_week,
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn matches_weekday_morning() {
        let expr = CronExpr::parse("30 9 * * 1-5").unwrap();
        // 2026-02-23 is a Monday.
        assert!(expr.matches(&at(2026, 2, 23, 9, 30)));
        assert!(!expr.matches(&at(2026, 2, 22, 9, 30)));
        assert!(!expr.matches(&at(2026, 2, 23, 10, 0)));
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!(CronExpr::parse("* * *").is_err());
        assert!(CronExpr::parse("70 * * * *").is_err());
        assert!(CronExpr::parse("*/0 * * * *").is_err());
        assert!(CronExpr::parse("5-1 * * * *").is_err());
        assert!(CronExpr::parse("* * 0 * *").is_err());
        let err = CronExpr::parse("* x * * *").unwrap_err();
        assert!(err.starts_with("hour:"));
    }

    #[test]
    fn display_normalizes_whitespace() {
        let expr: CronExpr = "  0   2 * *  *".parse().unwrap();
        assert_eq!(expr.to_string(), "0 2 * * *");
    }
}

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Whether each billable day counts as a whole or a half day.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DayType {
    Full,
    Half,
}

impl DayType {
    fn weight(self) -> f64 {
        match self {
            DayType::Full => 1.0,
            DayType::Half => 0.5,
        }
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Billable day count for an inclusive date range.
///
/// Weekends and holidays contribute nothing; every other day contributes
/// 1.0 (`full`) or 0.5 (`half`). Iterates day by day since holiday
/// distribution is irregular. Callers validate `start <= end`; an inverted
/// range yields 0.
pub fn working_days(
    start: NaiveDate,
    end: NaiveDate,
    day_type: DayType,
    holidays: &HashSet<NaiveDate>,
) -> f64 {
    let weight = day_type.weight();
    let mut days = 0.0;
    let mut date = start;
    while date <= end {
        if !is_weekend(date) && !holidays.contains(&date) {
            days += weight;
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn single_weekday_counts_one_full_or_half() {
        // 2024-06-03 is a Monday
        let none = HashSet::new();
        assert_eq!(working_days(d(2024, 6, 3), d(2024, 6, 3), DayType::Full, &none), 1.0);
        assert_eq!(working_days(d(2024, 6, 3), d(2024, 6, 3), DayType::Half, &none), 0.5);
    }

    #[test]
    fn weekend_only_range_counts_zero() {
        // 2024-06-01/02 are Saturday and Sunday
        let none = HashSet::new();
        assert_eq!(working_days(d(2024, 6, 1), d(2024, 6, 2), DayType::Full, &none), 0.0);
        assert_eq!(working_days(d(2024, 6, 1), d(2024, 6, 2), DayType::Half, &none), 0.0);
    }

    #[test]
    fn holidays_are_skipped() {
        let mut holidays = HashSet::new();
        holidays.insert(d(2024, 6, 4)); // Tuesday
        // Mon..Wed with Tuesday a holiday -> 2 working days
        assert_eq!(
            working_days(d(2024, 6, 3), d(2024, 6, 5), DayType::Full, &holidays),
            2.0
        );
    }

    #[test]
    fn full_week_counts_five() {
        let none = HashSet::new();
        // Mon 2024-06-03 .. Sun 2024-06-09
        assert_eq!(working_days(d(2024, 6, 3), d(2024, 6, 9), DayType::Full, &none), 5.0);
    }

    #[test]
    fn multi_month_range_iterates_every_day() {
        let none = HashSet::new();
        // June 2024 has 20 weekdays, July 2024 has 23
        assert_eq!(
            working_days(d(2024, 6, 1), d(2024, 7, 31), DayType::Full, &none),
            43.0
        );
    }

    #[test]
    fn inverted_range_yields_zero() {
        let none = HashSet::new();
        assert_eq!(working_days(d(2024, 6, 4), d(2024, 6, 3), DayType::Full, &none), 0.0);
    }

    #[test]
    fn day_type_parses_from_wire_strings() {
        assert_eq!("full".parse::<DayType>().unwrap(), DayType::Full);
        assert_eq!("half".parse::<DayType>().unwrap(), DayType::Half);
        assert!("quarter".parse::<DayType>().is_err());
    }
}

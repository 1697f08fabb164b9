use crate::errors::ServiceError;
use chrono::{Datelike, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use strum::EnumIter;

/// A calendar month, the granularity of all price history.
///
/// Serialized as `"YYYY-MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The period `n` months before this one
    pub fn minus_months(&self, n: u32) -> Self {
        let total = self.year as i64 * 12 + (self.month as i64 - 1) - n as i64;
        Self {
            year: total.div_euclid(12) as i32,
            month: (total.rem_euclid(12) + 1) as u32,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid period '{}', expected YYYY-MM", s))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid period year in '{}'", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid period month in '{}'", s))?;
        Period::new(year, month).ok_or_else(|| format!("invalid period month in '{}'", s))
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// The enumerated trailing windows a cost analysis may aggregate over.
/// Any other month count is rejected with `InvalidWindow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum CostWindow {
    ThreeMonths,
    SixMonths,
    TwelveMonths,
}

impl CostWindow {
    pub fn months(&self) -> u32 {
        match self {
            CostWindow::ThreeMonths => 3,
            CostWindow::SixMonths => 6,
            CostWindow::TwelveMonths => 12,
        }
    }

    /// First period of a window ending at `end`
    pub fn start(&self, end: Period) -> Period {
        end.minus_months(self.months() - 1)
    }

    /// All periods of a window ending at `end`, oldest first
    pub fn periods(&self, end: Period) -> Vec<Period> {
        (0..self.months())
            .rev()
            .map(|back| end.minus_months(back))
            .collect()
    }
}

impl From<CostWindow> for u32 {
    fn from(window: CostWindow) -> Self {
        window.months()
    }
}

impl TryFrom<u32> for CostWindow {
    type Error = ServiceError;

    fn try_from(months: u32) -> Result<Self, Self::Error> {
        match months {
            3 => Ok(CostWindow::ThreeMonths),
            6 => Ok(CostWindow::SixMonths),
            12 => Ok(CostWindow::TwelveMonths),
            other => Err(ServiceError::InvalidWindow(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn period_arithmetic_crosses_year_boundaries() {
        let p = Period::new(2025, 2).unwrap();
        assert_eq!(p.minus_months(1), Period::new(2025, 1).unwrap());
        assert_eq!(p.minus_months(2), Period::new(2024, 12).unwrap());
        assert_eq!(p.minus_months(14), Period::new(2023, 12).unwrap());
    }

    #[test]
    fn period_ordering_is_chronological() {
        assert!(Period::new(2024, 12).unwrap() < Period::new(2025, 1).unwrap());
        assert!(Period::new(2025, 3).unwrap() < Period::new(2025, 11).unwrap());
    }

    #[test]
    fn period_parses_and_displays_round_trip() {
        let p: Period = "2025-06".parse().unwrap();
        assert_eq!(p, Period::new(2025, 6).unwrap());
        assert_eq!(p.to_string(), "2025-06");
        assert!("2025-13".parse::<Period>().is_err());
        assert!("garbage".parse::<Period>().is_err());
    }

    #[test]
    fn only_enumerated_windows_are_accepted() {
        assert_matches!(CostWindow::try_from(3), Ok(CostWindow::ThreeMonths));
        assert_matches!(CostWindow::try_from(6), Ok(CostWindow::SixMonths));
        assert_matches!(CostWindow::try_from(12), Ok(CostWindow::TwelveMonths));
        assert_matches!(
            CostWindow::try_from(7),
            Err(ServiceError::InvalidWindow(7))
        );
        assert_matches!(CostWindow::try_from(0), Err(ServiceError::InvalidWindow(0)));
    }

    #[test]
    fn window_periods_are_contiguous_and_inclusive() {
        let end = Period::new(2025, 2).unwrap();
        let periods = CostWindow::ThreeMonths.periods(end);
        assert_eq!(
            periods,
            vec![
                Period::new(2024, 12).unwrap(),
                Period::new(2025, 1).unwrap(),
                Period::new(2025, 2).unwrap(),
            ]
        );
        assert_eq!(CostWindow::ThreeMonths.start(end), periods[0]);
    }
}

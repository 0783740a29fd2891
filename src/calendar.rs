//! Month grids for the learner calendar and the admin schedule view.
//!
//! Weeks start on Sunday. A learner grid covers whole weeks, so it begins on
//! the Sunday on or before the 1st and ends on the Saturday on or after the
//! last day of the month.

use chrono::{Datelike, Days, Months, NaiveDate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
  pub date: NaiveDate,
  /// Day belongs to the displayed month (outside days are dimmed)
  pub in_month: bool,
  /// Future days cannot be selected
  pub is_future: bool,
  pub is_today: bool,
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
  date.with_day(1).unwrap_or(date)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
  let start = month_start(date);
  start
    .checked_add_months(Months::new(1))
    .and_then(|next| next.pred_opt())
    .unwrap_or(start)
}

pub fn prev_month(date: NaiveDate) -> NaiveDate {
  let start = month_start(date);
  start.checked_sub_months(Months::new(1)).unwrap_or(start)
}

pub fn next_month(date: NaiveDate) -> NaiveDate {
  let start = month_start(date);
  start.checked_add_months(Months::new(1)).unwrap_or(start)
}

/// Parse a `YYYY-MM` month parameter into the first day of that month
pub fn parse_month(input: &str) -> Option<NaiveDate> {
  let (year, month) = input.trim().split_once('-')?;
  NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

pub fn format_month(date: NaiveDate) -> String {
  date.format("%Y-%m").to_string()
}

/// Heading such as "March 2024"
pub fn month_title(date: NaiveDate) -> String {
  date.format("%B %Y").to_string()
}

/// Number of empty cells before the 1st in a Sunday-first grid
pub fn leading_blanks(month: NaiveDate) -> u32 {
  month_start(month).weekday().num_days_from_sunday()
}

pub fn days_in_month(month: NaiveDate) -> Vec<NaiveDate> {
  let start = month_start(month);
  let end = month_end(month);
  start.iter_days().take_while(|d| *d <= end).collect()
}

/// Weeks of the learner calendar for `month`, relative to `today`
pub fn month_grid(month: NaiveDate, today: NaiveDate) -> Vec<Vec<CalendarDay>> {
  let start = month_start(month);
  let end = month_end(month);

  let grid_start = start - Days::new(u64::from(start.weekday().num_days_from_sunday()));
  let grid_end = end + Days::new(u64::from(6 - end.weekday().num_days_from_sunday()));

  let days: Vec<CalendarDay> = grid_start
    .iter_days()
    .take_while(|d| *d <= grid_end)
    .map(|date| CalendarDay {
      date,
      in_month: date.month() == start.month() && date.year() == start.year(),
      is_future: date > today,
      is_today: date == today,
    })
    .collect();

  days.chunks(7).map(|week| week.to_vec()).collect()
}

/// Months shown on the schedule: every month that has a scheduled problem
/// plus the current month, ascending and without duplicates.
pub fn schedule_months(problem_dates: &[NaiveDate], today: NaiveDate) -> Vec<NaiveDate> {
  let mut months: Vec<NaiveDate> = problem_dates.iter().map(|d| month_start(*d)).collect();
  months.push(month_start(today));
  months.sort();
  months.dedup();
  months
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn test_month_bounds() {
    assert_eq!(month_start(date(2024, 2, 17)), date(2024, 2, 1));
    assert_eq!(month_end(date(2024, 2, 17)), date(2024, 2, 29));
    assert_eq!(month_end(date(2023, 12, 5)), date(2023, 12, 31));
  }

  #[test]
  fn test_prev_next_month_cross_year() {
    assert_eq!(prev_month(date(2024, 1, 20)), date(2023, 12, 1));
    assert_eq!(next_month(date(2024, 12, 31)), date(2025, 1, 1));
  }

  #[test]
  fn test_parse_month() {
    assert_eq!(parse_month("2024-03"), Some(date(2024, 3, 1)));
    assert_eq!(parse_month("2024-13"), None);
    assert_eq!(parse_month("march"), None);
  }

  #[test]
  fn test_leading_blanks_sunday_first() {
    // 2024-09-01 is a Sunday, 2024-03-01 is a Friday
    assert_eq!(leading_blanks(date(2024, 9, 1)), 0);
    assert_eq!(leading_blanks(date(2024, 3, 1)), 5);
  }

  #[test]
  fn test_days_in_month() {
    assert_eq!(days_in_month(date(2024, 2, 10)).len(), 29);
    assert_eq!(days_in_month(date(2023, 2, 10)).len(), 28);
  }

  #[test]
  fn test_month_grid_covers_whole_weeks() {
    let grid = month_grid(date(2024, 3, 1), date(2024, 3, 15));
    // March 2024: Fri 1st .. Sun 31st => Sun Feb 25 .. Sat Apr 6
    assert_eq!(grid.len(), 6);
    assert!(grid.iter().all(|w| w.len() == 7));
    assert_eq!(grid[0][0].date, date(2024, 2, 25));
    assert!(!grid[0][0].in_month);
    assert_eq!(grid[5][6].date, date(2024, 4, 6));
  }

  #[test]
  fn test_month_grid_flags_future_and_today() {
    let today = date(2024, 3, 15);
    let grid = month_grid(today, today);
    let days: Vec<_> = grid.into_iter().flatten().collect();
    let today_cell = days.iter().find(|d| d.date == today).unwrap();
    assert!(today_cell.is_today);
    assert!(!today_cell.is_future);
    assert!(days.iter().find(|d| d.date == date(2024, 3, 16)).unwrap().is_future);
  }

  #[test]
  fn test_schedule_months_includes_current_and_dedups() {
    let months = schedule_months(
      &[date(2024, 5, 3), date(2024, 1, 9), date(2024, 5, 20)],
      date(2024, 3, 2),
    );
    assert_eq!(months, vec![date(2024, 1, 1), date(2024, 3, 1), date(2024, 5, 1)]);
  }

  #[test]
  fn test_schedule_months_empty() {
    assert_eq!(schedule_months(&[], date(2024, 3, 2)), vec![date(2024, 3, 1)]);
  }
}

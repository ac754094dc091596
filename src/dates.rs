// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::models::BillingCycle;

pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
        _ => unreachable!("month {} out of range", month),
    }
}

/// Next billing date strictly after `date`.
///
/// Daily advances one day. Weekly lands on the next occurrence of weekday
/// `billing_day` (0=Sunday..6=Saturday). Calendar cycles add 1/3/12 months
/// and then clamp the day-of-month to `billing_day`, capped at the last
/// valid day of the target month, so day-31 schedules survive February and
/// snap back to 31 afterwards.
pub fn advance_by_cycle(date: NaiveDate, cycle: BillingCycle, billing_day: u32) -> NaiveDate {
    match cycle {
        BillingCycle::Daily => date + Duration::days(1),
        BillingCycle::Weekly => {
            let target = billing_day % 7;
            let current = date.weekday().num_days_from_sunday();
            let mut ahead = (target + 7 - current) % 7;
            if ahead == 0 {
                ahead = 7;
            }
            date + Duration::days(i64::from(ahead))
        }
        BillingCycle::Monthly | BillingCycle::Quarterly | BillingCycle::Yearly => {
            let months = match cycle {
                BillingCycle::Monthly => 1,
                BillingCycle::Quarterly => 3,
                _ => 12,
            };
            let shifted = date + Months::new(months);
            let day = billing_day
                .max(1)
                .min(last_day_of_month(shifted.year(), shifted.month()));
            // Day is clamped into range, so this cannot fail.
            shifted.with_day(day).unwrap_or(shifted)
        }
    }
}

/// Signed day difference `b - a`; negative when `a` is after `b`.
/// Calendar-day granularity, no time-of-day involved.
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days()
}

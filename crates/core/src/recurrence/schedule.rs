//! Recurrence rule evaluation
//!
//! A [`RecurrenceSchedule`] is a validated rule bound to an anchor instant
//! and a time zone. Occurrences are generated on the local wall clock of that
//! zone and emitted as UTC instants, so a 09:00 Europe/Berlin weekly meeting
//! stays at 09:00 local across DST changes and never slips a weekday when
//! the local time crosses a UTC day boundary.

use std::ops::ControlFlow;

use calgrid_domain::constants::MAX_RECURRENCE_PERIODS;
use calgrid_domain::{CalendarError, Frequency, RecurrenceRule, Result};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use tracing::warn;

use crate::time_range::localize;

/// A validated recurrence rule bound to its anchor
#[derive(Debug, Clone)]
pub struct RecurrenceSchedule {
    rule: RecurrenceRule,
    anchor: DateTime<Utc>,
    tz: Tz,
    anchor_date: NaiveDate,
    wall_time: NaiveTime,
    weekdays: Vec<Weekday>,
}

impl RecurrenceSchedule {
    /// Build a schedule anchored at `rule.start`, falling back to
    /// `event_start`. The rule's `tzid` wins over `default_tz`.
    ///
    /// # Errors
    /// Returns `CalendarError::InvalidRule` (carrying the rule payload) when
    /// the interval or count is zero, both COUNT and UNTIL are set, or the
    /// time zone is unknown.
    pub fn build(
        rule: &RecurrenceRule,
        event_start: DateTime<Utc>,
        default_tz: &Tz,
    ) -> Result<Self> {
        let invalid = |cause: &str| CalendarError::invalid_rule(rule.payload(), cause);

        if rule.interval == 0 {
            return Err(invalid("interval must be at least 1"));
        }
        if rule.count == Some(0) {
            return Err(invalid("count must be at least 1"));
        }
        if rule.count.is_some() && rule.until.is_some() {
            return Err(invalid("count and until are mutually exclusive"));
        }

        let tz = match rule.tzid.as_deref() {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| invalid(&format!("unknown time zone '{name}'")))?,
            None => *default_tz,
        };

        let anchor = rule.start.unwrap_or(event_start);
        let local = anchor.with_timezone(&tz);

        let mut weekdays = rule.by_weekday.clone();
        weekdays.sort_by_key(Weekday::num_days_from_monday);
        weekdays.dedup();

        Ok(Self {
            rule: rule.clone(),
            anchor,
            tz,
            anchor_date: local.date_naive(),
            wall_time: local.time(),
            weekdays,
        })
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    /// Occurrences in `[start, end]` (both inclusive) with their absolute
    /// series ordinal.
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<(u32, DateTime<Utc>)> {
        let mut found = Vec::new();
        self.walk(|index, instant| {
            if instant > end {
                return ControlFlow::Break(());
            }
            if instant >= start {
                found.push((index, instant));
            }
            ControlFlow::Continue(())
        });
        found
    }

    /// Whether the series generates an occurrence exactly at `instant`.
    pub fn is_occurrence(&self, instant: DateTime<Utc>) -> bool {
        let mut hit = false;
        self.walk(|_, candidate| {
            if candidate >= instant {
                hit = candidate == instant;
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        });
        hit
    }

    /// Number of occurrences strictly before `instant`.
    pub fn count_before(&self, instant: DateTime<Utc>) -> u32 {
        let mut count = 0;
        self.walk(|_, candidate| {
            if candidate >= instant {
                return ControlFlow::Break(());
            }
            count += 1;
            ControlFlow::Continue(())
        });
        count
    }

    pub fn first(&self) -> Option<DateTime<Utc>> {
        let mut first = None;
        self.walk(|_, candidate| {
            first = Some(candidate);
            ControlFlow::Break(())
        });
        first
    }

    /// Last occurrence of a bounded (COUNT or UNTIL) series.
    pub fn last(&self) -> Option<DateTime<Utc>> {
        if self.rule.count.is_none() && self.rule.until.is_none() {
            return None;
        }
        let mut last = None;
        self.walk(|_, candidate| {
            last = Some(candidate);
            ControlFlow::Continue(())
        });
        last
    }

    /// Visit every occurrence in order until the visitor breaks or the rule
    /// terminates.
    fn walk(&self, mut visit: impl FnMut(u32, DateTime<Utc>) -> ControlFlow<()>) {
        let mut index: u32 = 0;

        for period in 0..MAX_RECURRENCE_PERIODS {
            // Periods past the supported calendar range end the series
            let Some(dates) = self.period_dates(period) else {
                return;
            };
            for date in dates {
                let instant = localize(&self.tz, date.and_time(self.wall_time));
                if instant < self.anchor {
                    continue;
                }
                if self.rule.until.is_some_and(|until| instant > until) {
                    return;
                }
                if self.rule.count.is_some_and(|count| index >= count) {
                    return;
                }
                if visit(index, instant).is_break() {
                    return;
                }
                index += 1;
            }
        }

        warn!(
            rule = %self.rule.to_rrule(),
            periods = MAX_RECURRENCE_PERIODS,
            "recurrence scan limit reached"
        );
    }

    /// Candidate local dates of one period, ascending. `None` once the period
    /// lies beyond the representable date range.
    fn period_dates(&self, period: u32) -> Option<Vec<NaiveDate>> {
        let step = period.checked_mul(self.rule.interval)?;
        let anchor = self.anchor_date;

        let dates = match self.rule.frequency {
            Frequency::Daily => {
                let date = anchor.checked_add_signed(Duration::days(i64::from(step)))?;
                if self.weekdays.is_empty() || self.weekdays.contains(&date.weekday()) {
                    vec![date]
                } else {
                    Vec::new()
                }
            }
            Frequency::Weekly => {
                let offset = Duration::days(i64::from(anchor.weekday().num_days_from_monday()));
                let week_start = anchor
                    .checked_sub_signed(offset)?
                    .checked_add_signed(Duration::weeks(i64::from(step)))?;
                if self.weekdays.is_empty() {
                    vec![week_start.checked_add_signed(offset)?]
                } else {
                    self.weekdays
                        .iter()
                        .filter_map(|day| {
                            let days = Duration::days(i64::from(day.num_days_from_monday()));
                            week_start.checked_add_signed(days)
                        })
                        .collect()
                }
            }
            Frequency::Monthly => {
                let month_start = anchor.with_day(1)?.checked_add_months(Months::new(step))?;
                if self.weekdays.is_empty() {
                    month_start.with_day(anchor.day()).into_iter().collect()
                } else {
                    let next_month = month_start.checked_add_months(Months::new(1));
                    self.matching_days(month_start, next_month)
                }
            }
            Frequency::Yearly => {
                let year = anchor.year().checked_add(i32::try_from(step).ok()?)?;
                let year_start = NaiveDate::from_ymd_opt(year, 1, 1)?;
                if self.weekdays.is_empty() {
                    NaiveDate::from_ymd_opt(year, anchor.month(), anchor.day())
                        .into_iter()
                        .collect()
                } else {
                    let next_year =
                        year.checked_add(1).and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1));
                    self.matching_days(year_start, next_year)
                }
            }
        };
        Some(dates)
    }

    /// Days in `[from, until)` whose weekday is in the BYDAY set.
    fn matching_days(&self, from: NaiveDate, until: Option<NaiveDate>) -> Vec<NaiveDate> {
        from.iter_days()
            .take_while(|date| until.map_or(true, |until| *date < until))
            .filter(|date| self.weekdays.contains(&date.weekday()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn schedule(rule: RecurrenceRule, start: DateTime<Utc>) -> RecurrenceSchedule {
        RecurrenceSchedule::build(&rule, start, &Tz::UTC).unwrap()
    }

    fn starts(
        sched: &RecurrenceSchedule,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        sched.between(from, to).into_iter().map(|(_, instant)| instant).collect()
    }

    #[test]
    fn daily_rule_yields_one_occurrence_per_day() {
        let sched = schedule(RecurrenceRule::daily(), utc(2024, 3, 4, 9));
        let found = sched.between(utc(2024, 3, 4, 0), utc(2024, 3, 10, 23));

        assert_eq!(found.len(), 7);
        assert_eq!(found[0], (0, utc(2024, 3, 4, 9)));
        assert_eq!(found[6], (6, utc(2024, 3, 10, 9)));
    }

    #[test]
    fn ordinals_are_absolute_within_the_series() {
        let sched = schedule(RecurrenceRule::daily(), utc(2024, 3, 1, 9));
        let found = sched.between(utc(2024, 3, 5, 0), utc(2024, 3, 5, 23));

        assert_eq!(found, vec![(4, utc(2024, 3, 5, 9))]);
    }

    #[test]
    fn weekly_byday_enumerates_within_each_week() {
        // 2024-03-04 is a Monday
        let rule = RecurrenceRule::weekly().every(2).on([Weekday::Fri, Weekday::Mon]);
        let sched = schedule(rule, utc(2024, 3, 4, 9));
        let dates = starts(&sched, utc(2024, 3, 1, 0), utc(2024, 3, 31, 0));

        assert_eq!(
            dates,
            vec![utc(2024, 3, 4, 9), utc(2024, 3, 8, 9), utc(2024, 3, 18, 9), utc(2024, 3, 22, 9)]
        );
    }

    #[test]
    fn weekly_byday_skips_days_before_anchor() {
        // Anchor on Wednesday; Monday of the same week is not generated.
        let rule = RecurrenceRule::weekly().on([Weekday::Mon, Weekday::Wed]);
        let sched = schedule(rule, utc(2024, 3, 6, 9));

        assert_eq!(sched.first(), Some(utc(2024, 3, 6, 9)));
        assert_eq!(sched.count_before(utc(2024, 3, 12, 0)), 2);
    }

    #[test]
    fn monthly_skips_months_without_the_day() {
        let sched = schedule(RecurrenceRule::monthly().times(3), utc(2024, 1, 31, 9));
        let dates = starts(&sched, utc(2024, 1, 1, 0), utc(2024, 12, 31, 0));

        assert_eq!(dates, vec![utc(2024, 1, 31, 9), utc(2024, 3, 31, 9), utc(2024, 5, 31, 9)]);
        assert_eq!(sched.last(), Some(utc(2024, 5, 31, 9)));
    }

    #[test]
    fn yearly_on_leap_day_waits_for_leap_years() {
        let sched = schedule(RecurrenceRule::yearly(), utc(2024, 2, 29, 12));
        let dates = starts(&sched, utc(2024, 1, 1, 0), utc(2032, 12, 31, 0));

        assert_eq!(dates, vec![utc(2024, 2, 29, 12), utc(2028, 2, 29, 12), utc(2032, 2, 29, 12)]);
    }

    #[test]
    fn until_is_inclusive() {
        let rule = RecurrenceRule::daily().until(utc(2024, 3, 6, 9));
        let sched = schedule(rule, utc(2024, 3, 4, 9));

        assert_eq!(sched.between(utc(2024, 3, 1, 0), utc(2024, 3, 31, 0)).len(), 3);
        assert_eq!(sched.last(), Some(utc(2024, 3, 6, 9)));
    }

    #[test]
    fn local_wall_clock_survives_dst_change() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // 09:00 EST on 2024-03-08 is 14:00 UTC; after the 2024-03-10 switch
        // 09:00 EDT is 13:00 UTC.
        let rule = RecurrenceRule::daily().in_timezone("America/New_York");
        let sched = RecurrenceSchedule::build(&rule, utc(2024, 3, 8, 14), &tz).unwrap();
        let found = sched.between(utc(2024, 3, 8, 0), utc(2024, 3, 11, 23));

        assert_eq!(found[0].1, utc(2024, 3, 8, 14));
        assert_eq!(found[3].1, utc(2024, 3, 11, 13));
    }

    #[test]
    fn weekday_matching_uses_local_day_not_utc() {
        // 20:00 Monday in Los Angeles is 04:00 Tuesday UTC.
        let rule = RecurrenceRule::weekly().on([Weekday::Mon]).in_timezone("America/Los_Angeles");
        let anchor = Utc.with_ymd_and_hms(2024, 6, 4, 3, 0, 0).unwrap();
        let sched = RecurrenceSchedule::build(&rule, anchor, &Tz::UTC).unwrap();
        let found = sched.between(anchor, anchor + Duration::days(14));

        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|(_, t)| t.weekday() == Weekday::Tue));
    }

    #[test]
    fn invalid_rules_are_rejected_with_payload() {
        let zero = RecurrenceRule::daily().every(0);
        let err = RecurrenceSchedule::build(&zero, utc(2024, 1, 1, 0), &Tz::UTC).unwrap_err();
        assert!(err.to_string().contains("\"interval\":0"));

        let both = RecurrenceRule::daily().times(3).until(utc(2024, 2, 1, 0));
        assert!(RecurrenceSchedule::build(&both, utc(2024, 1, 1, 0), &Tz::UTC).is_err());

        let zone = RecurrenceRule::daily().in_timezone("Nowhere/City");
        assert!(RecurrenceSchedule::build(&zone, utc(2024, 1, 1, 0), &Tz::UTC).is_err());
    }

    #[test]
    fn huge_intervals_stop_at_the_calendar_limit() {
        let anchor = utc(2024, 3, 4, 9);
        let horizon = utc(2100, 1, 1, 0);
        let rules = [
            RecurrenceRule::daily().every(100_000_000),
            RecurrenceRule::weekly().every(100_000_000),
            RecurrenceRule::weekly().every(u32::MAX).on([Weekday::Mon, Weekday::Fri]),
            RecurrenceRule::monthly().every(u32::MAX),
            RecurrenceRule::monthly().every(u32::MAX).on([Weekday::Mon]),
            RecurrenceRule::yearly().every(u32::MAX),
            RecurrenceRule::yearly().every(300_000).on([Weekday::Mon]),
        ];

        for rule in rules {
            let sched = schedule(rule, anchor);
            let found = starts(&sched, anchor, horizon);

            // Only the anchor's own period is representable
            assert_eq!(found.first(), Some(&anchor));
            assert!(found.iter().all(|instant| instant.year() == 2024));
            assert_eq!(sched.count_before(horizon) as usize, found.len());
        }
    }

    #[test]
    fn is_occurrence_matches_exact_instants_only() {
        let sched = schedule(RecurrenceRule::daily(), utc(2024, 3, 4, 9));

        assert!(sched.is_occurrence(utc(2024, 3, 9, 9)));
        assert!(!sched.is_occurrence(utc(2024, 3, 9, 10)));
        assert!(!sched.is_occurrence(utc(2024, 3, 3, 9)));
    }
}

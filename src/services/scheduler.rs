// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wall-clock scheduler for the price tick.
//!
//! Triggers fire on local-time minute boundaries that are multiples of their
//! period, counted from midnight, optionally restricted to a daily window.
//! A single task drives all triggers; triggers due at the same minute run
//! one tick.

use crate::services::pipeline::PricePipeline;
use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A periodic local-time trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub name: &'static str,
    /// Fires when minutes-since-midnight is a multiple of this
    pub period_minutes: u32,
    /// Inclusive local-time window; `None` means all day
    pub window: Option<(NaiveTime, NaiveTime)>,
}

impl Trigger {
    /// Every two hours, around the clock.
    pub fn two_hourly() -> Self {
        Self {
            name: "two-hourly",
            period_minutes: 120,
            window: None,
        }
    }

    /// Every thirty minutes from 08:00 through 20:00.
    pub fn half_hourly_daytime() -> Self {
        Self {
            name: "half-hourly-daytime",
            period_minutes: 30,
            window: NaiveTime::from_hms_opt(8, 0, 0).zip(NaiveTime::from_hms_opt(20, 0, 0)),
        }
    }

    /// The default production schedule.
    pub fn defaults() -> Vec<Self> {
        vec![Self::two_hourly(), Self::half_hourly_daytime()]
    }

    fn in_window(&self, time: NaiveTime) -> bool {
        match self.window {
            None => true,
            Some((start, end)) => time >= start && time <= end,
        }
    }

    /// First firing time strictly after `after`.
    ///
    /// Slots restart at every midnight, so a period that doesn't divide the
    /// day still fires at 00:00.
    pub fn next_after(&self, after: NaiveDateTime) -> NaiveDateTime {
        let period = self.period_minutes.clamp(1, MINUTES_PER_DAY) as usize;

        // Today, tomorrow and the day after always cover a non-empty window.
        for day in after.date().iter_days().take(3) {
            let midnight = NaiveDateTime::new(day, NaiveTime::MIN);
            for slot in (0..MINUTES_PER_DAY).step_by(period) {
                let candidate = midnight + Duration::minutes(i64::from(slot));
                if candidate > after && self.in_window(candidate.time()) {
                    return candidate;
                }
            }
        }

        // Empty window: fall back to one period later.
        after + Duration::minutes(period as i64)
    }
}

/// Earliest next firing across `triggers` and the names due at that time.
pub fn next_fire(
    triggers: &[Trigger],
    after: NaiveDateTime,
) -> Option<(NaiveDateTime, Vec<&'static str>)> {
    let times: Vec<(NaiveDateTime, &'static str)> = triggers
        .iter()
        .map(|t| (t.next_after(after), t.name))
        .collect();
    let earliest = times.iter().map(|(at, _)| *at).min()?;
    let due = times
        .into_iter()
        .filter(|(at, _)| *at == earliest)
        .map(|(_, name)| name)
        .collect();
    Some((earliest, due))
}

/// Resolve a local wall-clock time to an instant.
///
/// Times skipped by a DST jump resolve to `None`; the caller moves on to the
/// following slot.
fn local_to_utc(at: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&at)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Run the scheduler loop until `cancel` fires.
pub async fn run(pipeline: Arc<PricePipeline>, triggers: Vec<Trigger>, cancel: CancellationToken) {
    tracing::info!(
        triggers = ?triggers.iter().map(|t| t.name).collect::<Vec<_>>(),
        "Price scheduler started"
    );

    let mut cursor = Local::now().naive_local();

    loop {
        let Some((local_at, due)) = next_fire(&triggers, cursor) else {
            tracing::warn!("No scheduler triggers configured; scheduler exiting");
            return;
        };
        cursor = local_at;

        let Some(fire_at) = local_to_utc(local_at) else {
            tracing::debug!(at = %local_at, "Skipping trigger time that doesn't exist locally");
            continue;
        };

        let wait = (fire_at - Utc::now()).to_std().unwrap_or_default();
        tracing::debug!(at = %local_at, due = ?due, wait_secs = wait.as_secs(), "Next price tick scheduled");

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Price scheduler stopping");
                return;
            }
            _ = tokio::time::sleep(wait) => {
                let trigger = due.join("+");
                pipeline.run_tick(&trigger).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn next_day(h: u32, m: u32) -> NaiveDateTime {
        at(h, m) + Duration::days(1)
    }

    #[test]
    fn test_two_hourly_fires_on_even_hours() {
        let t = Trigger::two_hourly();
        assert_eq!(t.next_after(at(0, 0)), at(2, 0));
        assert_eq!(t.next_after(at(1, 59)), at(2, 0));
        assert_eq!(t.next_after(at(13, 5)), at(14, 0));
        assert_eq!(t.next_after(at(23, 30)), next_day(0, 0));
    }

    #[test]
    fn test_half_hourly_respects_window() {
        let t = Trigger::half_hourly_daytime();
        assert_eq!(t.next_after(at(7, 10)), at(8, 0));
        assert_eq!(t.next_after(at(8, 0)), at(8, 30));
        assert_eq!(t.next_after(at(19, 45)), at(20, 0));
        // 20:30 is outside the window; next is tomorrow morning.
        assert_eq!(t.next_after(at(20, 0)), next_day(8, 0));
        assert_eq!(t.next_after(at(23, 59)), next_day(8, 0));
    }

    #[test]
    fn test_coinciding_triggers_are_reported_together() {
        let triggers = Trigger::defaults();

        let (when, due) = next_fire(&triggers, at(9, 40)).unwrap();
        assert_eq!(when, at(10, 0));
        assert_eq!(due, vec!["two-hourly", "half-hourly-daytime"]);

        let (when, due) = next_fire(&triggers, at(10, 0)).unwrap();
        assert_eq!(when, at(10, 30));
        assert_eq!(due, vec!["half-hourly-daytime"]);

        let (when, due) = next_fire(&triggers, at(21, 0)).unwrap();
        assert_eq!(when, at(22, 0));
        assert_eq!(due, vec!["two-hourly"]);
    }

    #[test]
    fn test_period_not_dividing_day_realigns_at_midnight() {
        let t = Trigger {
            name: "odd",
            period_minutes: 420, // 00:00, 07:00, 14:00, 21:00
            window: None,
        };
        assert_eq!(t.next_after(at(14, 0)), at(21, 0));
        assert_eq!(t.next_after(at(21, 0)), next_day(0, 0));
    }

    #[test]
    fn test_no_triggers_yields_none() {
        assert!(next_fire(&[], at(12, 0)).is_none());
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user, per-day training aggregates.
//!
//! Rows are produced upstream from raw swing data; this service only stores
//! them, reads them back, and folds a date range into a single record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One day of training for one user. At most one row per (user_id, date).
///
/// Counters missing from incoming JSON default to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(default)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DailySummary {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: i64,
    pub date: NaiveDate,

    // ─── Session Totals ──────────────────────────────────────────
    /// Total training time (seconds)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_seconds: i64,
    /// Peak swing speed; aggregated with max, not sum
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub max_swing_speed: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_swings: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub racket_rotations: i64,

    // ─── Stroke Counts ───────────────────────────────────────────
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub forehand_clear: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub backhand_clear: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub forehand_lift: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub backhand_lift: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub forehand_net: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub backhand_net: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub forehand_smash: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub backhand_smash: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub forehand_drop: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub backhand_drop: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub forehand_drive: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub backhand_drive: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub pickup_count: i64,
}

impl DailySummary {
    /// A day with no recorded activity.
    pub fn empty(user_id: i64, date: NaiveDate) -> Self {
        Self {
            user_id,
            date,
            ..Default::default()
        }
    }

    /// Counter values in column order (see `db::postgres`).
    pub fn counters(&self) -> [i64; 17] {
        [
            self.duration_seconds,
            self.max_swing_speed,
            self.total_swings,
            self.racket_rotations,
            self.forehand_clear,
            self.backhand_clear,
            self.forehand_lift,
            self.backhand_lift,
            self.forehand_net,
            self.backhand_net,
            self.forehand_smash,
            self.backhand_smash,
            self.forehand_drop,
            self.backhand_drop,
            self.forehand_drive,
            self.backhand_drive,
            self.pickup_count,
        ]
    }

    /// Fold another day into this aggregate.
    ///
    /// Counters are summed; `max_swing_speed` keeps the peak.
    pub fn accumulate(&mut self, other: &DailySummary) {
        self.duration_seconds += other.duration_seconds;
        self.max_swing_speed = self.max_swing_speed.max(other.max_swing_speed);
        self.total_swings += other.total_swings;
        self.racket_rotations += other.racket_rotations;
        self.forehand_clear += other.forehand_clear;
        self.backhand_clear += other.backhand_clear;
        self.forehand_lift += other.forehand_lift;
        self.backhand_lift += other.backhand_lift;
        self.forehand_net += other.forehand_net;
        self.backhand_net += other.backhand_net;
        self.forehand_smash += other.forehand_smash;
        self.backhand_smash += other.backhand_smash;
        self.forehand_drop += other.forehand_drop;
        self.backhand_drop += other.backhand_drop;
        self.forehand_drive += other.forehand_drive;
        self.backhand_drive += other.backhand_drive;
        self.pickup_count += other.pickup_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(date: &str, duration: i64, speed: i64, swings: i64) -> DailySummary {
        DailySummary {
            user_id: 1,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            duration_seconds: duration,
            max_swing_speed: speed,
            total_swings: swings,
            forehand_smash: swings / 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_accumulate_sums_counters_and_keeps_peak_speed() {
        let mut agg = DailySummary::empty(1, day("2024-05-01", 0, 0, 0).date);
        agg.accumulate(&day("2024-05-01", 600, 210, 100));
        agg.accumulate(&day("2024-05-02", 1200, 180, 40));

        assert_eq!(agg.duration_seconds, 1800);
        assert_eq!(agg.max_swing_speed, 210);
        assert_eq!(agg.total_swings, 140);
        assert_eq!(agg.forehand_smash, 70);
    }

    #[test]
    fn test_missing_counters_deserialize_as_zero() {
        let parsed: DailySummary =
            serde_json::from_str(r#"{"date":"2024-05-01","total_swings":12}"#).unwrap();
        assert_eq!(parsed.total_swings, 12);
        assert_eq!(parsed.pickup_count, 0);
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn test_empty_is_zeroed() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let empty = DailySummary::empty(9, date);
        assert_eq!(empty.user_id, 9);
        assert_eq!(empty.total_swings, 0);
        assert_eq!(empty.max_swing_speed, 0);
    }
}

//! Bounded run-history ledger.
//!
//! Each scheduled update embeds its own history; there is no separate
//! history store. Stores call [`apply_run`] inside their atomic
//! read-modify-write so concurrent manual triggers cannot lose entries.

use refresh_core::model::{RunRecord, ScheduledUpdate, MAX_RUN_HISTORY};

/// Append a run record, truncate from the front beyond the cap, and
/// advance `last_run`/`updated_at`. `next_run` is left alone.
pub fn apply_run(update: &mut ScheduledUpdate, record: RunRecord) {
    update.last_run = Some(record.timestamp);
    update.updated_at = record.timestamp;
    update.run_history.push(record);
    if update.run_history.len() > MAX_RUN_HISTORY {
        let excess = update.run_history.len() - MAX_RUN_HISTORY;
        update.run_history.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use refresh_core::model::{Frequency, RecurrenceSpec, RefreshOptions};
    use uuid::Uuid;

    fn make_update() -> ScheduledUpdate {
        let now = Utc::now();
        ScheduledUpdate {
            id: Uuid::new_v4(),
            owner_id: "acct-1".to_string(),
            agent_id: None,
            target_base_ids: vec![1],
            name: "nightly refresh".to_string(),
            recurrence: RecurrenceSpec {
                frequency: Frequency::Daily,
                interval: 1,
                day_of_week: None,
                day_of_month: None,
                specific_time: None,
                cron_expression: None,
            },
            active: true,
            options: RefreshOptions::default(),
            last_run: None,
            next_run: Some(now + Duration::days(1)),
            run_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn record(ts_offset_mins: i64, items: u64) -> RunRecord {
        RunRecord {
            timestamp: Utc::now() + Duration::minutes(ts_offset_mins),
            items_processed: items,
            success: true,
            triggered_manually: false,
        }
    }

    #[test]
    fn apply_run_appends_and_sets_last_run() {
        let mut update = make_update();
        let rec = record(0, 5);
        let ts = rec.timestamp;
        apply_run(&mut update, rec);

        assert_eq!(update.run_history.len(), 1);
        assert_eq!(update.last_run, Some(ts));
        assert_eq!(update.updated_at, ts);
    }

    #[test]
    fn eleventh_record_drops_oldest_preserving_order() {
        let mut update = make_update();
        for i in 0..10 {
            apply_run(&mut update, record(i, i as u64));
        }
        assert_eq!(update.run_history.len(), 10);

        apply_run(&mut update, record(10, 10));

        assert_eq!(update.run_history.len(), 10);
        // Oldest (items=0) dropped; order preserved, newest last.
        assert_eq!(update.run_history[0].items_processed, 1);
        assert_eq!(update.run_history[9].items_processed, 10);
    }

    #[test]
    fn apply_run_leaves_next_run_untouched() {
        let mut update = make_update();
        let next = update.next_run;
        apply_run(&mut update, record(0, 3));
        assert_eq!(update.next_run, next);
    }
}

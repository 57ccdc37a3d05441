use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::domain::{Priority, Status, Task};

pub fn priority_rank(priority: Priority) -> u8 {
    match priority {
        Priority::High => 3,
        Priority::Medium => 2,
        Priority::Low => 1,
    }
}

// Candidates are tasks that look active by status or by an open log.
// A task with an open log outranks one without (covers status/log drift),
// then the most recent log start wins, then the newest task.
pub fn active_task(tasks: &[Task]) -> Option<&Task> {
    tasks
        .iter()
        .filter(|task| task.status == Status::InProgress || task.is_tracking())
        .max_by_key(|task| (task.is_tracking(), activity_instant(task), task.created_at))
}

fn activity_instant(task: &Task) -> DateTime<Utc> {
    if let Some(log) = task.open_log() {
        return log.start_time;
    }
    task.logs
        .iter()
        .map(|log| log.start_time)
        .max()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

pub fn compare_listing(left: &Task, right: &Task) -> Ordering {
    priority_rank(right.priority)
        .cmp(&priority_rank(left.priority))
        .then_with(|| right.created_at.cmp(&left.created_at))
}

pub fn ranked(tasks: &[Task]) -> Vec<&Task> {
    let mut rows: Vec<&Task> = tasks.iter().collect();
    rows.sort_by(|left, right| compare_listing(left, right));
    rows
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::domain::{Priority, Status, Task, TaskLog};

    use super::{active_task, priority_rank, ranked};

    fn task(id: &str, status: Status, created_at: DateTime<Utc>) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            project_id: "p1".to_string(),
            priority: Priority::Low,
            kind: "Development".to_string(),
            status,
            logs: Vec::new(),
            history: Vec::new(),
            created_at,
        }
    }

    #[test]
    fn latest_open_log_start_wins() {
        let created = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();

        let idle = task("1", Status::Todo, created);
        let mut older = task("2", Status::InProgress, created);
        older.logs.push(TaskLog::open(t1));
        let mut newer = task("3", Status::InProgress, created);
        newer.logs.push(TaskLog::open(t2));

        let tasks = vec![idle, older, newer];
        let active = active_task(&tasks).expect("active task should exist");
        assert_eq!(active.id, "3");
    }

    #[test]
    fn open_log_outranks_status_only_candidates() {
        let created = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 1, 6, 8, 0, 0).unwrap();

        // status says in-progress but no log is open; the other task has
        // an open log and must win despite being older
        let drifted = task("1", Status::InProgress, late);
        let mut tracking = task("2", Status::InProgress, created);
        tracking
            .logs
            .push(TaskLog::open(Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()));

        let tasks = vec![drifted, tracking];
        let active = active_task(&tasks).expect("active task should exist");
        assert_eq!(active.id, "2");
    }

    #[test]
    fn status_only_candidates_fall_back_to_latest_log_then_creation() {
        let t1 = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 1, 5, 11, 0, 0).unwrap();

        let mut quiet = task("1", Status::InProgress, t1);
        quiet.logs.push(TaskLog::closed(
            t1,
            Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap(),
        ));
        let mut recent = task("2", Status::InProgress, t1);
        recent.logs.push(TaskLog::closed(
            t2,
            Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap(),
        ));
        let logless = task("3", Status::InProgress, t2);

        let tasks = vec![quiet, recent, logless];
        let active = active_task(&tasks).expect("active task should exist");
        assert_eq!(active.id, "2");
    }

    #[test]
    fn no_candidates_yields_none() {
        let created = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let tasks = vec![task("1", Status::Todo, created), task("2", Status::Done, created)];
        assert!(active_task(&tasks).is_none());
    }

    #[test]
    fn listing_orders_by_priority_then_recency() {
        let older = Utc.with_ymd_and_hms(2026, 1, 4, 8, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();

        let mut low_new = task("low-new", Status::Todo, newer);
        low_new.priority = Priority::Low;
        let mut high_old = task("high-old", Status::Todo, older);
        high_old.priority = Priority::High;
        let mut medium_old = task("medium-old", Status::Todo, older);
        medium_old.priority = Priority::Medium;
        let mut medium_new = task("medium-new", Status::Todo, newer);
        medium_new.priority = Priority::Medium;

        let tasks = vec![low_new, high_old, medium_old, medium_new];
        let order: Vec<_> = ranked(&tasks).iter().map(|task| task.id.as_str()).collect();
        assert_eq!(order, vec!["high-old", "medium-new", "medium-old", "low-new"]);
    }

    #[test]
    fn priority_ranks_match_display_order() {
        assert!(priority_rank(Priority::High) > priority_rank(Priority::Medium));
        assert!(priority_rank(Priority::Medium) > priority_rank(Priority::Low));
    }
}

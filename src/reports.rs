use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::domain::{HistoryAction, Status, Task, TaskLog, local_naive_to_utc_resolved};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: local_day_start(date),
            end: local_day_start(next_day(date)),
        }
    }

    pub fn week(date: NaiveDate) -> Self {
        let week = date.week(Weekday::Mon);
        Self {
            start: local_day_start(week.first_day()),
            end: local_day_start(next_day(week.last_day())),
        }
    }

    pub fn month(date: NaiveDate) -> Self {
        let first = date.with_day(1).expect("first of month must exist");
        let next = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        }
        .expect("first of next month must exist");
        Self {
            start: local_day_start(first),
            end: local_day_start(next),
        }
    }

    // Both bounds inclusive: the window spans local midnight of `first`
    // through the end of `last`.
    pub fn between(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: local_day_start(first),
            end: local_day_start(next_day(last)),
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp < self.end
    }
}

pub fn log_overlap(log: &TaskLog, window: &Window, now: DateTime<Utc>) -> Duration {
    let start = log.start_time;
    let end = log.end_time.unwrap_or(now);
    if start >= window.end || end <= window.start {
        return Duration::zero();
    }

    let slice_start = if start > window.start { start } else { window.start };
    let slice_end = if end < window.end { end } else { window.end };
    if slice_end > slice_start {
        slice_end - slice_start
    } else {
        Duration::zero()
    }
}

pub fn task_window_duration(task: &Task, window: &Window, now: DateTime<Utc>) -> Duration {
    task.logs
        .iter()
        .fold(Duration::zero(), |total, log| total + log_overlap(log, window, now))
}

pub fn total_duration_by<F>(
    tasks: &[Task],
    window: &Window,
    now: DateTime<Utc>,
    key_for: F,
) -> HashMap<String, Duration>
where
    F: Fn(&Task) -> String,
{
    let mut totals = HashMap::new();
    for task in tasks {
        let in_window = task_window_duration(task, window, now);
        if in_window > Duration::zero() {
            *totals
                .entry(key_for(task))
                .or_insert_with(Duration::zero) += in_window;
        }
    }
    totals
}

pub fn completion_time(task: &Task) -> Option<DateTime<Utc>> {
    if let Some(event) = task
        .history
        .iter()
        .rev()
        .find(|event| event.action == HistoryAction::Finish)
    {
        return Some(event.timestamp);
    }
    task.logs.iter().rev().find_map(|log| log.end_time)
}

#[derive(Debug)]
pub struct CompletedGroup<'a> {
    pub kind: String,
    pub tasks: Vec<&'a Task>,
    pub total: Duration,
}

pub fn completed_in_month<'a>(
    tasks: &'a [Task],
    month: &Window,
    now: DateTime<Utc>,
) -> Vec<CompletedGroup<'a>> {
    let mut groups: BTreeMap<String, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        if task.status != Status::Done {
            continue;
        }
        let Some(done_at) = completion_time(task) else {
            continue;
        };
        if !month.contains(done_at) {
            continue;
        }
        groups.entry(task.kind.clone()).or_default().push(task);
    }

    groups
        .into_iter()
        .map(|(kind, tasks)| {
            let total = tasks
                .iter()
                .fold(Duration::zero(), |sum, task| sum + task.duration(now));
            CompletedGroup { kind, tasks, total }
        })
        .collect()
}

#[derive(Debug)]
pub struct Standup<'a> {
    pub did_yesterday: Vec<&'a Task>,
    pub did_today: Vec<&'a Task>,
    pub will_do_today: Vec<&'a Task>,
}

pub fn standup<'a>(tasks: &'a [Task], date: NaiveDate, now: DateTime<Utc>) -> Standup<'a> {
    let today = Window::day(date);
    let yesterday = Window::day(date.pred_opt().expect("previous day must exist"));

    let mut report = Standup {
        did_yesterday: Vec::new(),
        did_today: Vec::new(),
        will_do_today: Vec::new(),
    };

    for task in tasks {
        if task
            .logs
            .iter()
            .any(|log| yesterday.contains(log.start_time))
        {
            report.did_yesterday.push(task);
        }

        let touches_today = task.logs.iter().any(|log| {
            today.contains(log.start_time) || log_overlap(log, &today, now) > Duration::zero()
        });
        if task.status == Status::InProgress || (task.status == Status::Done && touches_today) {
            report.did_today.push(task);
        }

        if task.status == Status::Todo {
            report.will_do_today.push(task);
        }
    }

    report
}

fn local_day_start(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).expect("midnight must be valid");
    local_naive_to_utc_resolved(naive)
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().expect("next day must exist")
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use crate::domain::{HistoryAction, Priority, Status, Task, TaskHistory, TaskLog};

    use super::{
        Window, completed_in_month, completion_time, log_overlap, standup, task_window_duration,
        total_duration_by,
    };

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("date should exist")
    }

    fn task(id: &str, kind: &str, project_id: &str, status: Status) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            project_id: project_id.to_string(),
            priority: Priority::Medium,
            kind: kind.to_string(),
            status,
            logs: Vec::new(),
            history: Vec::new(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn a_log_straddling_midnight_splits_between_both_days() {
        let day_one = Window::day(date(2026, 3, 10));
        let day_two = Window::day(date(2026, 3, 11));
        assert_eq!(day_one.end, day_two.start);

        let log = TaskLog::closed(day_one.end - Duration::hours(1), day_one.end + Duration::hours(1));
        let now = day_two.end;

        assert_eq!(log_overlap(&log, &day_one, now), Duration::hours(1));
        assert_eq!(log_overlap(&log, &day_two, now), Duration::hours(1));
        assert_eq!(
            log_overlap(&log, &day_one, now) + log_overlap(&log, &day_two, now),
            log.duration(now)
        );
    }

    #[test]
    fn logs_outside_the_window_contribute_nothing() {
        let window = Window::day(date(2026, 3, 10));
        let log = TaskLog::closed(window.start - Duration::hours(3), window.start - Duration::hours(1));
        assert_eq!(log_overlap(&log, &window, window.end), Duration::zero());
    }

    #[test]
    fn an_open_log_contributes_up_to_now() {
        let window = Window::day(date(2026, 3, 10));
        let log = TaskLog::open(window.start + Duration::hours(1));
        let now = window.start + Duration::hours(2);
        assert_eq!(log_overlap(&log, &window, now), Duration::hours(1));
    }

    #[test]
    fn grouped_totals_by_project_skip_empty_buckets() {
        let window = Window::day(date(2026, 3, 10));
        let now = window.end;

        let mut a = task("a", "Development", "P1", Status::Done);
        a.logs.push(TaskLog::closed(
            window.start + Duration::hours(1),
            window.start + Duration::hours(3),
        ));
        let mut b = task("b", "Development", "P1", Status::Done);
        b.logs.push(TaskLog::closed(
            window.start + Duration::hours(1),
            window.start + Duration::hours(2),
        ));
        let mut c = task("c", "Meeting", "P2", Status::Done);
        c.logs.push(TaskLog::closed(
            window.start + Duration::hours(4),
            window.start + Duration::hours(7),
        ));
        let mut outside = task("d", "Meeting", "P3", Status::Done);
        outside.logs.push(TaskLog::closed(
            window.start - Duration::hours(5),
            window.start - Duration::hours(2),
        ));

        let tasks = vec![a, b, c, outside];
        let totals = total_duration_by(&tasks, &window, now, |task| task.project_id.clone());

        assert_eq!(totals.len(), 2);
        assert_eq!(totals["P1"], Duration::hours(3));
        assert_eq!(totals["P2"], Duration::hours(3));

        let bucket_sum = totals.values().fold(Duration::zero(), |sum, d| sum + *d);
        let task_sum = tasks
            .iter()
            .fold(Duration::zero(), |sum, task| {
                sum + task_window_duration(task, &window, now)
            });
        assert_eq!(bucket_sum, task_sum);
    }

    #[test]
    fn week_window_spans_monday_through_sunday() {
        let window = Window::week(date(2026, 1, 15));
        assert_eq!(window.start, Window::day(date(2026, 1, 12)).start);
        assert_eq!(window.end, Window::day(date(2026, 1, 19)).start);
    }

    #[test]
    fn month_window_covers_the_calendar_month() {
        let january = Window::month(date(2026, 1, 31));
        assert_eq!(january.start, Window::day(date(2026, 1, 1)).start);
        assert_eq!(january.end, Window::day(date(2026, 2, 1)).start);

        let december = Window::month(date(2026, 12, 15));
        assert_eq!(december.end, Window::day(date(2027, 1, 1)).start);
    }

    #[test]
    fn between_window_includes_both_boundary_days() {
        let window = Window::between(date(2026, 3, 10), date(2026, 3, 12));
        assert_eq!(window.start, Window::day(date(2026, 3, 10)).start);
        assert_eq!(window.end, Window::day(date(2026, 3, 13)).start);
    }

    #[test]
    fn completion_prefers_finish_events_over_log_ends() {
        let finish = Utc.with_ymd_and_hms(2026, 1, 20, 17, 0, 0).unwrap();
        let mut done = task("a", "Development", "P1", Status::Done);
        done.logs.push(TaskLog::closed(
            Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 2, 2, 10, 0, 0).unwrap(),
        ));
        done.history
            .push(TaskHistory::record(HistoryAction::Finish, finish));

        assert_eq!(completion_time(&done), Some(finish));
    }

    #[test]
    fn completion_falls_back_to_the_last_closed_log() {
        let end = Utc.with_ymd_and_hms(2026, 1, 20, 17, 0, 0).unwrap();
        let mut done = task("a", "Development", "P1", Status::Done);
        done.logs
            .push(TaskLog::closed(end - Duration::hours(1), end));

        assert_eq!(completion_time(&done), Some(end));
        assert_eq!(completion_time(&task("b", "Development", "P1", Status::Done)), None);
    }

    #[test]
    fn monthly_report_includes_january_finishes_only_in_january() {
        let january = Window::month(date(2026, 1, 31));
        let february = Window::month(date(2026, 2, 1));
        let finish = january.start + Duration::days(19);
        let now = february.end;

        let mut done = task("a", "Development", "P1", Status::Done);
        done.logs
            .push(TaskLog::closed(finish - Duration::hours(2), finish));
        done.history
            .push(TaskHistory::record(HistoryAction::Finish, finish));
        let pending = task("b", "Development", "P1", Status::InProgress);
        let never_finished = task("c", "Meeting", "P1", Status::Done);

        let tasks = vec![done, pending, never_finished];

        let in_january = completed_in_month(&tasks, &january, now);
        assert_eq!(in_january.len(), 1);
        assert_eq!(in_january[0].kind, "Development");
        assert_eq!(in_january[0].tasks.len(), 1);
        assert_eq!(in_january[0].total, Duration::hours(2));

        assert!(completed_in_month(&tasks, &february, now).is_empty());
    }

    #[test]
    fn monthly_report_groups_by_type() {
        let january = Window::month(date(2026, 1, 31));
        let now = january.end;
        let finish = january.start + Duration::days(10);

        let mut dev = task("a", "Development", "P1", Status::Done);
        dev.history
            .push(TaskHistory::record(HistoryAction::Finish, finish));
        let mut review = task("b", "PR Review", "P1", Status::Done);
        review
            .history
            .push(TaskHistory::record(HistoryAction::Finish, finish));
        let mut review_two = task("c", "PR Review", "P2", Status::Done);
        review_two
            .history
            .push(TaskHistory::record(HistoryAction::Finish, finish));

        let tasks = vec![dev, review, review_two];
        let groups = completed_in_month(&tasks, &january, now);
        let summary: Vec<_> = groups
            .iter()
            .map(|group| (group.kind.as_str(), group.tasks.len()))
            .collect();
        assert_eq!(summary, vec![("Development", 1), ("PR Review", 2)]);
    }

    #[test]
    fn standup_classifies_yesterday_today_and_upcoming() {
        let today = date(2026, 3, 11);
        let today_window = Window::day(today);
        let yesterday_window = Window::day(date(2026, 3, 10));
        let now = today_window.start + Duration::hours(10);

        let mut worked_yesterday = task("y", "Development", "P1", Status::Done);
        worked_yesterday.logs.push(TaskLog::closed(
            yesterday_window.start + Duration::hours(9),
            yesterday_window.start + Duration::hours(10),
        ));
        let in_progress = task("t", "Development", "P1", Status::InProgress);
        let mut done_today = task("d", "Meeting", "P1", Status::Done);
        done_today.logs.push(TaskLog::closed(
            today_window.start + Duration::hours(8),
            today_window.start + Duration::hours(9),
        ));
        let upcoming = task("w", "Development", "P1", Status::Todo);

        let tasks = vec![worked_yesterday, in_progress, done_today, upcoming];
        let report = standup(&tasks, today, now);

        let ids = |rows: &[&Task]| rows.iter().map(|task| task.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&report.did_yesterday), vec!["y"]);
        assert_eq!(ids(&report.did_today), vec!["t", "d"]);
        assert_eq!(ids(&report.will_do_today), vec!["w"]);
    }

    #[test]
    fn tasks_without_in_window_time_are_omitted_entirely() {
        let window = Window::day(date(2026, 3, 10));
        let empty = task("a", "Development", "P1", Status::Todo);
        let totals = total_duration_by(&[empty], &window, window.end, |task| {
            task.project_id.clone()
        });
        assert!(totals.is_empty());
    }

    #[test]
    fn window_contains_is_half_open() {
        let window = Window::day(date(2026, 3, 10));
        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn task_window_duration_sums_all_logs() {
        let window = Window::day(date(2026, 3, 10));
        let now = window.end;
        let mut worked = task("a", "Development", "P1", Status::Done);
        worked.logs.push(TaskLog::closed(
            window.start + Duration::hours(1),
            window.start + Duration::hours(2),
        ));
        worked.logs.push(TaskLog::closed(
            window.start + Duration::hours(5),
            window.start + Duration::minutes(330),
        ));
        assert_eq!(
            task_window_duration(&worked, &window, now),
            Duration::minutes(90)
        );
    }
}

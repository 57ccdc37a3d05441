use chrono::{
    DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

use crate::transitions::{apply, plan_preempt, plan_status_change, plan_toggle};

const ID_LEN: usize = 8;

pub const DEFAULT_TASK_KIND: &str = "Development";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Todo,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Create,
    Start,
    Pause,
    Finish,
    Restart,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLog {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: i64,
}

impl TaskLog {
    pub fn open(start_time: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(),
            start_time,
            end_time: None,
            duration_ms: 0,
        }
    }

    pub fn closed(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        let mut log = Self::open(start_time);
        log.close(end_time);
        log
    }

    pub fn close(&mut self, end_time: DateTime<Utc>) {
        self.end_time = Some(end_time);
        self.duration_ms = (end_time - self.start_time).num_milliseconds().max(0);
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        match self.end_time {
            Some(_) => Duration::milliseconds(self.duration_ms),
            None => {
                let elapsed = now - self.start_time;
                if elapsed < Duration::zero() {
                    Duration::zero()
                } else {
                    elapsed
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHistory {
    pub id: String,
    pub action: HistoryAction,
    pub timestamp: DateTime<Utc>,
}

impl TaskHistory {
    pub fn record(action: HistoryAction, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(),
            action,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub project_id: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: Status,
    pub logs: Vec<TaskLog>,
    pub history: Vec<TaskHistory>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn open_log(&self) -> Option<&TaskLog> {
        self.logs.iter().find(|log| log.is_open())
    }

    pub fn open_log_mut(&mut self) -> Option<&mut TaskLog> {
        self.logs.iter_mut().find(|log| log.is_open())
    }

    pub fn is_tracking(&self) -> bool {
        self.open_log().is_some()
    }

    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.logs
            .iter()
            .fold(Duration::zero(), |total, log| total + log.duration(now))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateInterval {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardTask {
    pub id: String,
    pub title: String,
    pub project_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub priority: Option<Priority>,
    pub intervals: Vec<TemplateInterval>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: String,
    pub kind: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<String>,
    pub kind: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub logs: Option<Vec<TaskLog>>,
}

#[derive(Debug, Clone, Default)]
pub struct StandardTaskPatch {
    pub title: Option<String>,
    pub project_id: Option<String>,
    pub kind: Option<String>,
    pub priority: Option<Priority>,
    pub intervals: Option<Vec<TemplateInterval>>,
}

#[derive(Debug, Clone, Default)]
pub struct Board {
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub standard_tasks: Vec<StandardTask>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    pub fn standard_task(&self, id: &str) -> Option<&StandardTask> {
        self.standard_tasks
            .iter()
            .find(|standard| standard.id == id)
    }

    pub fn add_task(
        &mut self,
        new: NewTask,
        initial_logs: &[(DateTime<Utc>, DateTime<Utc>)],
        now: DateTime<Utc>,
    ) -> String {
        let id = generate_id();
        let task = match (initial_logs.first(), initial_logs.last()) {
            (Some(first), Some(last)) => Task {
                id: id.clone(),
                title: new.title,
                description: new.description,
                project_id: new.project_id,
                priority: new.priority,
                kind: new.kind,
                status: Status::Done,
                logs: initial_logs
                    .iter()
                    .map(|(start, end)| TaskLog::closed(*start, *end))
                    .collect(),
                history: vec![
                    TaskHistory::record(HistoryAction::Create, first.0),
                    TaskHistory::record(HistoryAction::Finish, last.1),
                ],
                created_at: first.0,
            },
            _ => Task {
                id: id.clone(),
                title: new.title,
                description: new.description,
                project_id: new.project_id,
                priority: new.priority,
                kind: new.kind,
                status: Status::Todo,
                logs: Vec::new(),
                history: vec![TaskHistory::record(HistoryAction::Create, now)],
                created_at: now,
            },
        };

        self.tasks.push(task);
        id
    }

    pub fn update_task(
        &mut self,
        task_id: &str,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<(), String> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or_else(|| format!("task not found: {task_id}"))?;

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = Some(description);
        }
        if let Some(project_id) = patch.project_id {
            task.project_id = project_id;
        }
        if let Some(kind) = patch.kind {
            task.kind = kind;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(logs) = patch.logs {
            task.logs = logs;
        }

        if let Some(status) = patch.status {
            let effects = plan_status_change(task, status);
            apply(task, &effects, now);
        }

        Ok(())
    }

    pub fn delete_task(&mut self, task_id: &str) -> Result<(), String> {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != task_id);
        if self.tasks.len() == before {
            return Err(format!("task not found: {task_id}"));
        }
        Ok(())
    }

    pub fn toggle_task_log(&mut self, task_id: &str, now: DateTime<Utc>) -> Result<(), String> {
        let target = self
            .tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or_else(|| format!("task not found: {task_id}"))?;

        if self.tasks[target].open_log().is_none() {
            for (index, task) in self.tasks.iter_mut().enumerate() {
                if index == target {
                    continue;
                }
                let effects = plan_preempt(task);
                apply(task, &effects, now);
            }
        }

        let task = &mut self.tasks[target];
        let effects = plan_toggle(task);
        apply(task, &effects, now);
        Ok(())
    }

    pub fn add_project(&mut self, name: String, color: Option<String>) -> String {
        let id = generate_id();
        self.projects.push(Project {
            id: id.clone(),
            name,
            color,
        });
        id
    }

    pub fn update_project(
        &mut self,
        project_id: &str,
        name: Option<String>,
        color: Option<String>,
    ) -> Result<(), String> {
        let project = self
            .projects
            .iter_mut()
            .find(|project| project.id == project_id)
            .ok_or_else(|| format!("project not found: {project_id}"))?;

        if let Some(name) = name {
            project.name = name;
        }
        if let Some(color) = color {
            project.color = Some(color);
        }
        Ok(())
    }

    pub fn delete_project(&mut self, project_id: &str) -> Result<(), String> {
        let before = self.projects.len();
        self.projects.retain(|project| project.id != project_id);
        if self.projects.len() == before {
            return Err(format!("project not found: {project_id}"));
        }
        Ok(())
    }

    pub fn add_standard_task(
        &mut self,
        title: String,
        project_id: Option<String>,
        kind: Option<String>,
        priority: Option<Priority>,
        intervals: Vec<TemplateInterval>,
    ) -> String {
        let id = generate_id();
        self.standard_tasks.push(StandardTask {
            id: id.clone(),
            title,
            project_id,
            kind,
            priority,
            intervals,
        });
        id
    }

    pub fn update_standard_task(
        &mut self,
        standard_id: &str,
        patch: StandardTaskPatch,
    ) -> Result<(), String> {
        let standard = self
            .standard_tasks
            .iter_mut()
            .find(|standard| standard.id == standard_id)
            .ok_or_else(|| format!("standard task not found: {standard_id}"))?;

        if let Some(title) = patch.title {
            standard.title = title;
        }
        if let Some(project_id) = patch.project_id {
            standard.project_id = Some(project_id);
        }
        if let Some(kind) = patch.kind {
            standard.kind = Some(kind);
        }
        if let Some(priority) = patch.priority {
            standard.priority = Some(priority);
        }
        if let Some(intervals) = patch.intervals {
            standard.intervals = intervals;
        }
        Ok(())
    }

    pub fn delete_standard_task(&mut self, standard_id: &str) -> Result<(), String> {
        let before = self.standard_tasks.len();
        self.standard_tasks
            .retain(|standard| standard.id != standard_id);
        if self.standard_tasks.len() == before {
            return Err(format!("standard task not found: {standard_id}"));
        }
        Ok(())
    }

    pub fn instantiate_standard(
        &mut self,
        standard_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<String, String> {
        let standard = self
            .standard_task(standard_id)
            .ok_or_else(|| format!("standard task not found: {standard_id}"))?
            .clone();

        let mut intervals = Vec::new();
        for interval in &standard.intervals {
            let start = resolve_template_time(date, &interval.start)?;
            let end = resolve_template_time(date, &interval.end)?;
            if end <= start {
                return Err(format!(
                    "interval end must be after start: {}-{}",
                    interval.start, interval.end
                ));
            }
            intervals.push((start, end));
        }

        let new = NewTask {
            title: standard.title,
            description: None,
            project_id: standard.project_id.unwrap_or_default(),
            kind: standard
                .kind
                .unwrap_or_else(|| DEFAULT_TASK_KIND.to_string()),
            priority: standard.priority.unwrap_or_default(),
        };

        Ok(self.add_task(new, &intervals, now))
    }
}

fn resolve_template_time(date: NaiveDate, time: &str) -> Result<DateTime<Utc>, String> {
    let parsed = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| format!("invalid template time: {time}"))?;
    Ok(local_naive_to_utc_resolved(date.and_time(parsed)))
}

pub fn local_naive_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(local_datetime) => Some(local_datetime.with_timezone(&Utc)),
        LocalResult::Ambiguous(first, second) => Some(first.min(second).with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

pub fn local_naive_to_utc_resolved(naive: NaiveDateTime) -> DateTime<Utc> {
    if let Some(timestamp) = local_naive_to_utc(naive) {
        return timestamp;
    }

    let mut cursor = naive + Duration::minutes(1);
    for _ in 0..120 {
        if let Some(timestamp) = local_naive_to_utc(cursor) {
            return timestamp;
        }
        cursor += Duration::minutes(1);
    }

    panic!("local time does not exist");
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

use chrono::{DateTime, Utc};

use crate::domain::{HistoryAction, Status, Task, TaskHistory, TaskLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    OpenLog,
    CloseLog,
    SetStatus(Status),
    Record(HistoryAction),
}

pub fn plan_toggle(task: &Task) -> Vec<Effect> {
    if task.is_tracking() {
        vec![Effect::CloseLog, Effect::Record(HistoryAction::Pause)]
    } else {
        vec![
            Effect::OpenLog,
            Effect::SetStatus(Status::InProgress),
            Effect::Record(HistoryAction::Start),
        ]
    }
}

// Applied to every other task before one starts tracking. The stopped
// task records a pause just like a manual stop.
pub fn plan_preempt(task: &Task) -> Vec<Effect> {
    if task.is_tracking() {
        vec![Effect::CloseLog, Effect::Record(HistoryAction::Pause)]
    } else {
        Vec::new()
    }
}

pub fn plan_status_change(task: &Task, next: Status) -> Vec<Effect> {
    let mut effects = Vec::new();

    match next {
        Status::Done => {
            if task.is_tracking() {
                effects.push(Effect::CloseLog);
            }
            if task.status != Status::Done {
                effects.push(Effect::Record(HistoryAction::Finish));
            }
        }
        Status::Todo if task.status == Status::Done => {
            effects.push(Effect::Record(HistoryAction::Restart));
        }
        _ => {}
    }

    if task.status != next {
        effects.push(Effect::SetStatus(next));
    }

    effects
}

pub fn apply(task: &mut Task, effects: &[Effect], now: DateTime<Utc>) {
    for effect in effects {
        match effect {
            Effect::OpenLog => task.logs.push(TaskLog::open(now)),
            Effect::CloseLog => {
                if let Some(log) = task.open_log_mut() {
                    log.close(now);
                }
            }
            Effect::SetStatus(status) => task.status = *status,
            Effect::Record(action) => task.history.push(TaskHistory::record(*action, now)),
        }
    }
}

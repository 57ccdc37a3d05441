mod config;
mod domain;
mod ranking;
mod reports;
mod storage;
mod sync;
mod transitions;

use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};

use crate::config::{recent_boards, remember_board, resolve_board_path, resolve_user};
use crate::domain::{
	Board, HistoryAction, NewTask, Priority, StandardTaskPatch, Status, Task, TaskLog, TaskPatch,
	TemplateInterval, format_duration,
};
use crate::ranking::{active_task, ranked};
use crate::reports::{Window, completed_in_month, standup, total_duration_by};
use crate::storage::{FileStore, StorageError};
use crate::sync::{PROJECTS_KEY, SyncedDocument, standard_tasks_key, tasks_key};

#[derive(Debug, Parser)]
#[command(name = "tempo-taskboard", about = "Terminal-first team task tracker")]
struct Cli {
	#[arg(long)]
	board: Option<PathBuf>,
	#[arg(long)]
	user: Option<String>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Init,
	Projects,
	AddProject {
		#[arg(long)]
		name: String,
		#[arg(long)]
		color: Option<String>,
	},
	EditProject {
		#[arg(long)]
		project: String,
		#[arg(long)]
		name: Option<String>,
		#[arg(long)]
		color: Option<String>,
	},
	DeleteProject {
		#[arg(long)]
		project: String,
	},
	AddTask {
		#[arg(long)]
		title: String,
		#[arg(long)]
		project: String,
		#[arg(long = "type", default_value = "Development")]
		kind: String,
		#[arg(long, default_value = "medium")]
		priority: String,
		#[arg(long)]
		description: Option<String>,
	},
	EditTask {
		#[arg(long)]
		task: String,
		#[arg(long)]
		title: Option<String>,
		#[arg(long)]
		description: Option<String>,
		#[arg(long)]
		project: Option<String>,
		#[arg(long = "type")]
		kind: Option<String>,
		#[arg(long)]
		priority: Option<String>,
		#[arg(long)]
		status: Option<String>,
	},
	DeleteTask {
		#[arg(long)]
		task: String,
	},
	Toggle {
		#[arg(long)]
		task: String,
	},
	Done {
		#[arg(long)]
		task: String,
	},
	Reopen {
		#[arg(long)]
		task: String,
	},
	LogWork {
		#[arg(long)]
		task: String,
		#[arg(long)]
		start: String,
		#[arg(long)]
		stop: String,
	},
	ListTasks,
	History {
		#[arg(long)]
		task: String,
	},
	Standup {
		#[arg(long)]
		date: Option<String>,
	},
	Summary {
		#[arg(long, default_value = "day")]
		window: String,
		#[arg(long)]
		date: Option<String>,
		#[arg(long, default_value = "project")]
		by: String,
	},
	Between {
		#[arg(long)]
		start: String,
		#[arg(long)]
		end: String,
		#[arg(long, default_value = "project")]
		by: String,
	},
	Month {
		#[arg(long)]
		date: Option<String>,
	},
	Standards,
	AddStandard {
		#[arg(long)]
		title: String,
		#[arg(long)]
		project: Option<String>,
		#[arg(long = "type")]
		kind: Option<String>,
		#[arg(long)]
		priority: Option<String>,
		#[arg(long = "interval")]
		intervals: Vec<String>,
	},
	EditStandard {
		#[arg(long)]
		standard: String,
		#[arg(long)]
		title: Option<String>,
		#[arg(long = "interval")]
		intervals: Vec<String>,
	},
	DeleteStandard {
		#[arg(long)]
		standard: String,
	},
	FillDay {
		#[arg(long)]
		standard: Option<String>,
		#[arg(long)]
		date: Option<String>,
	},
	Boards {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	if let Some(Command::Boards { limit }) = &cli.command {
		print_recent_boards(*limit)?;
		return Ok(());
	}

	let board_path = resolve_board_path(cli.board)?;
	let user = resolve_user(cli.user);
	let mut session = Session::open(&board_path, &user)?;
	if let Err(err) = remember_board(&board_path) {
		eprintln!("warning: failed to store recent board: {err}");
	}

	let now = Utc::now();

	match cli.command.unwrap_or(Command::ListTasks) {
		Command::Init => {
			session.init()?;
			println!("initialized board at {}", board_path.display());
		}
		Command::Projects => {
			print_projects(&session.board);
		}
		Command::AddProject { name, color } => {
			if name.trim().is_empty() {
				return Err("project name cannot be empty".into());
			}
			let project_id = session.board.add_project(name, color);
			session.persist_projects();
			println!("created project {project_id}");
		}
		Command::EditProject {
			project,
			name,
			color,
		} => {
			session.board.update_project(&project, name, color)?;
			session.persist_projects();
			println!("updated project {project}");
		}
		Command::DeleteProject { project } => {
			session.board.delete_project(&project)?;
			session.persist_projects();
			println!("deleted project {project}");
		}
		Command::AddTask {
			title,
			project,
			kind,
			priority,
			description,
		} => {
			if title.trim().is_empty() {
				return Err("task title cannot be empty".into());
			}
			let priority = parse_priority(&priority)?;
			let task_id = session.board.add_task(
				NewTask {
					title,
					description,
					project_id: project,
					kind,
					priority,
				},
				&[],
				now,
			);
			session.persist_tasks();
			println!("created task {task_id}");
		}
		Command::EditTask {
			task,
			title,
			description,
			project,
			kind,
			priority,
			status,
		} => {
			let priority = priority.map(|raw| parse_priority(&raw)).transpose()?;
			let status = status.map(|raw| parse_status(&raw)).transpose()?;
			session.board.update_task(
				&task,
				TaskPatch {
					title,
					description,
					project_id: project,
					kind,
					priority,
					status,
					logs: None,
				},
				now,
			)?;
			session.persist_tasks();
			println!("updated task {task}");
		}
		Command::DeleteTask { task } => {
			session.board.delete_task(&task)?;
			session.persist_tasks();
			println!("deleted task {task}");
		}
		Command::Toggle { task } => {
			session.board.toggle_task_log(&task, now)?;
			session.persist_tasks();
			let tracking = session
				.board
				.task(&task)
				.map(|task| task.is_tracking())
				.unwrap_or(false);
			if tracking {
				println!("started tracking {task}");
			} else {
				println!("stopped tracking {task}");
			}
		}
		Command::Done { task } => {
			session.board.update_task(
				&task,
				TaskPatch {
					status: Some(Status::Done),
					..TaskPatch::default()
				},
				now,
			)?;
			session.persist_tasks();
			println!("completed task {task}");
		}
		Command::Reopen { task } => {
			session.board.update_task(
				&task,
				TaskPatch {
					status: Some(Status::Todo),
					..TaskPatch::default()
				},
				now,
			)?;
			session.persist_tasks();
			println!("reopened task {task}");
		}
		Command::LogWork { task, start, stop } => {
			let start = parse_datetime(&start)?;
			let stop = parse_datetime(&stop)?;
			if stop <= start {
				return Err("work interval must end after it starts".into());
			}
			let existing = session
				.board
				.task(&task)
				.ok_or_else(|| format!("task not found: {task}"))?;
			let mut logs = existing.logs.clone();
			logs.push(TaskLog::closed(start, stop));
			session.board.update_task(
				&task,
				TaskPatch {
					logs: Some(logs),
					..TaskPatch::default()
				},
				now,
			)?;
			session.persist_tasks();
			println!("recorded work on {task}");
		}
		Command::ListTasks => {
			print_tasks(&session.board, now);
		}
		Command::History { task } => {
			let task = session
				.board
				.task(&task)
				.ok_or_else(|| format!("task not found: {task}"))?;
			if task.history.is_empty() {
				println!("no history for this task");
			}
			for event in &task.history {
				println!("{} | {}", format_local(event.timestamp), action_label(event.action));
			}
		}
		Command::Standup { date } => {
			let date = parse_day(date.as_deref())?;
			let report = standup(&session.board.tasks, date, now);
			println!("standup for {}", date.format("%Y-%m-%d"));
			println!("\ndid yesterday:");
			print_task_titles(&report.did_yesterday);
			println!("\ndoing today:");
			print_task_titles(&report.did_today);
			println!("\nwill do today:");
			print_task_titles(&report.will_do_today);
		}
		Command::Summary { window, date, by } => {
			let date = parse_day(date.as_deref())?;
			let window = parse_window(&window, date)?;
			print_summary(&session.board, &window, &by, now)?;
		}
		Command::Between { start, end, by } => {
			let first = NaiveDate::parse_from_str(&start, "%Y-%m-%d")?;
			let last = NaiveDate::parse_from_str(&end, "%Y-%m-%d")?;
			if last < first {
				return Err("range end must not be before range start".into());
			}
			let window = Window::between(first, last);
			print_summary(&session.board, &window, &by, now)?;
		}
		Command::Month { date } => {
			let date = parse_day(date.as_deref())?;
			let window = Window::month(date);
			let groups = completed_in_month(&session.board.tasks, &window, now);
			println!("completed in {}", date.format("%Y-%m"));
			if groups.is_empty() {
				println!("no completed tasks this month");
			}
			for group in groups {
				println!(
					"\n{} | {} task(s) | {}",
					group.kind,
					group.tasks.len(),
					format_duration(group.total)
				);
				for task in group.tasks {
					println!("  {} | {}", task.id, task.title);
				}
			}
		}
		Command::Standards => {
			print_standard_tasks(&session.board);
		}
		Command::AddStandard {
			title,
			project,
			kind,
			priority,
			intervals,
		} => {
			if title.trim().is_empty() {
				return Err("standard task title cannot be empty".into());
			}
			if intervals.is_empty() {
				return Err("standard task needs at least one --interval HH:mm-HH:mm".into());
			}
			let priority = priority.map(|raw| parse_priority(&raw)).transpose()?;
			let intervals = parse_intervals(&intervals)?;
			let standard_id = session
				.board
				.add_standard_task(title, project, kind, priority, intervals);
			session.persist_standard_tasks();
			println!("created standard task {standard_id}");
		}
		Command::EditStandard {
			standard,
			title,
			intervals,
		} => {
			let intervals = if intervals.is_empty() {
				None
			} else {
				Some(parse_intervals(&intervals)?)
			};
			session.board.update_standard_task(
				&standard,
				StandardTaskPatch {
					title,
					intervals,
					..StandardTaskPatch::default()
				},
			)?;
			session.persist_standard_tasks();
			println!("updated standard task {standard}");
		}
		Command::DeleteStandard { standard } => {
			session.board.delete_standard_task(&standard)?;
			session.persist_standard_tasks();
			println!("deleted standard task {standard}");
		}
		Command::FillDay { standard, date } => {
			let date = parse_day(date.as_deref())?;
			let standard_ids = match standard {
				Some(id) => vec![id],
				None => session
					.board
					.standard_tasks
					.iter()
					.map(|standard| standard.id.clone())
					.collect(),
			};
			if standard_ids.is_empty() {
				println!("no standard tasks to fill from");
				return Ok(());
			}
			for standard_id in standard_ids {
				let task_id = session.board.instantiate_standard(&standard_id, date, now)?;
				println!("created task {task_id} from standard task {standard_id}");
			}
			session.persist_tasks();
		}
		Command::Boards { .. } => {}
	}

	Ok(())
}

struct Session {
	store: FileStore,
	tasks_doc: SyncedDocument,
	projects_doc: SyncedDocument,
	standard_doc: SyncedDocument,
	board: Board,
}

impl Session {
	fn open(path: &Path, user: &str) -> Result<Self, StorageError> {
		let store = FileStore::open(path)?;
		let (tasks_doc, tasks) = SyncedDocument::open(&store, &tasks_key(user))?;
		let (projects_doc, projects) = SyncedDocument::open(&store, PROJECTS_KEY)?;
		let (standard_doc, standard_tasks) =
			SyncedDocument::open(&store, &standard_tasks_key(user))?;
		Ok(Self {
			store,
			tasks_doc,
			projects_doc,
			standard_doc,
			board: Board {
				tasks,
				projects,
				standard_tasks,
			},
		})
	}

	// Creating the board file is the one write that must not fail
	// silently; there is no session to fall back on yet.
	fn init(&mut self) -> Result<(), StorageError> {
		self.projects_doc
			.commit(&mut self.store, &self.board.projects)?;
		self.tasks_doc.commit(&mut self.store, &self.board.tasks)?;
		self.standard_doc
			.commit(&mut self.store, &self.board.standard_tasks)?;
		Ok(())
	}

	// The in-memory mutation is the source of truth for this session;
	// a failed write only risks durability, so it is reported and not
	// retried.
	fn persist_tasks(&mut self) {
		if let Err(err) = self.tasks_doc.commit(&mut self.store, &self.board.tasks) {
			eprintln!("warning: failed to persist {}: {err}", self.tasks_doc.key());
		}
	}

	fn persist_projects(&mut self) {
		if let Err(err) = self
			.projects_doc
			.commit(&mut self.store, &self.board.projects)
		{
			eprintln!("warning: failed to persist {}: {err}", self.projects_doc.key());
		}
	}

	fn persist_standard_tasks(&mut self) {
		if let Err(err) = self
			.standard_doc
			.commit(&mut self.store, &self.board.standard_tasks)
		{
			eprintln!("warning: failed to persist {}: {err}", self.standard_doc.key());
		}
	}
}

fn print_recent_boards(limit: usize) -> Result<(), Box<dyn Error>> {
	let rows = recent_boards(limit)?;
	if rows.is_empty() {
		println!("no recent boards");
		return Ok(());
	}

	for (index, path) in rows.iter().enumerate() {
		println!("{:>2}. {}", index + 1, path.display());
	}

	Ok(())
}

fn print_projects(board: &Board) {
	if board.projects.is_empty() {
		println!("no projects yet");
		return;
	}

	for project in &board.projects {
		let color = project.color.as_deref().unwrap_or("-");
		println!("{} | {} | {}", project.id, color, project.name);
	}
}

fn print_tasks(board: &Board, now: DateTime<Utc>) {
	if board.tasks.is_empty() {
		println!("no tasks yet");
		return;
	}

	let active = active_task(&board.tasks);
	if let Some(active) = active {
		println!(
			"working on now: {} | {} | {}",
			active.id,
			active.title,
			format_duration(active.duration(now))
		);
	}

	let active_id = active.map(|task| task.id.clone());
	for task in ranked(&board.tasks) {
		if Some(&task.id) == active_id.as_ref() {
			continue;
		}
		println!(
			"{} | {} | {} | {} | {} | {}",
			task.id,
			status_label(task.status),
			priority_label(task.priority),
			project_label(board, &task.project_id),
			task.title,
			format_duration(task.duration(now))
		);
	}
}

fn print_standard_tasks(board: &Board) {
	if board.standard_tasks.is_empty() {
		println!("no standard tasks yet");
		return;
	}

	for standard in &board.standard_tasks {
		let intervals = standard
			.intervals
			.iter()
			.map(|interval| format!("{}-{}", interval.start, interval.end))
			.collect::<Vec<_>>()
			.join(", ");
		println!("{} | {} | {}", standard.id, standard.title, intervals);
	}
}

fn print_task_titles(rows: &[&Task]) {
	if rows.is_empty() {
		println!("(none)");
		return;
	}
	for task in rows {
		println!("  {} | {}", task.id, task.title);
	}
}

fn print_summary(
	board: &Board,
	window: &Window,
	by: &str,
	now: DateTime<Utc>,
) -> Result<(), Box<dyn Error>> {
	let totals = match by.trim().to_ascii_lowercase().as_str() {
		"project" => total_duration_by(&board.tasks, window, now, |task| {
			project_label(board, &task.project_id)
		}),
		"type" => total_duration_by(&board.tasks, window, now, |task| task.kind.clone()),
		other => {
			return Err(format!("unknown grouping: {other}; expected project or type").into());
		}
	};

	println!("summary by {by}");
	if totals.is_empty() {
		println!("no tracked time in this window");
		return Ok(());
	}

	for (name, duration) in sort_duration_map(totals) {
		println!("{} | {}", format_duration(duration), name);
	}

	Ok(())
}

fn sort_duration_map(map: HashMap<String, Duration>) -> Vec<(String, Duration)> {
	let mut rows = map.into_iter().collect::<Vec<_>>();
	rows.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
	rows
}

fn project_label(board: &Board, project_id: &str) -> String {
	board
		.project(project_id)
		.map(|project| project.name.clone())
		.unwrap_or_else(|| "Unknown project".to_string())
}

fn status_label(status: Status) -> &'static str {
	match status {
		Status::Todo => "todo",
		Status::InProgress => "in-progress",
		Status::Done => "done",
	}
}

fn priority_label(priority: Priority) -> &'static str {
	match priority {
		Priority::Low => "low",
		Priority::Medium => "medium",
		Priority::High => "high",
	}
}

fn action_label(action: HistoryAction) -> &'static str {
	match action {
		HistoryAction::Create => "create",
		HistoryAction::Start => "start",
		HistoryAction::Pause => "pause",
		HistoryAction::Finish => "finish",
		HistoryAction::Restart => "restart",
	}
}

fn format_local(timestamp: DateTime<Utc>) -> String {
	timestamp
		.with_timezone(&Local)
		.format("%Y-%m-%d %H:%M")
		.to_string()
}

fn parse_datetime(input: &str) -> Result<DateTime<Utc>, Box<dyn Error>> {
	Ok(DateTime::parse_from_rfc3339(input)?.with_timezone(&Utc))
}

// Boundary dates are local calendar days; parsing them as UTC shifts
// every window by the local offset.
fn parse_day(input: Option<&str>) -> Result<NaiveDate, Box<dyn Error>> {
	if let Some(raw) = input {
		Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")?)
	} else {
		Ok(Local::now().date_naive())
	}
}

fn parse_window(name: &str, date: NaiveDate) -> Result<Window, String> {
	match name.trim().to_ascii_lowercase().as_str() {
		"day" => Ok(Window::day(date)),
		"week" => Ok(Window::week(date)),
		"month" => Ok(Window::month(date)),
		other => Err(format!("unknown window: {other}; expected day, week, or month")),
	}
}

fn parse_priority(input: &str) -> Result<Priority, String> {
	match input.trim().to_ascii_lowercase().as_str() {
		"low" => Ok(Priority::Low),
		"medium" => Ok(Priority::Medium),
		"high" => Ok(Priority::High),
		other => Err(format!("unknown priority: {other}; expected low, medium, or high")),
	}
}

fn parse_status(input: &str) -> Result<Status, String> {
	match input.trim().to_ascii_lowercase().as_str() {
		"todo" => Ok(Status::Todo),
		"in-progress" => Ok(Status::InProgress),
		"done" => Ok(Status::Done),
		other => Err(format!(
			"unknown status: {other}; expected todo, in-progress, or done"
		)),
	}
}

fn parse_intervals(raw: &[String]) -> Result<Vec<TemplateInterval>, String> {
	raw.iter().map(|entry| parse_interval(entry)).collect()
}

fn parse_interval(raw: &str) -> Result<TemplateInterval, String> {
	let (start, end) = raw
		.split_once('-')
		.ok_or_else(|| format!("invalid interval: {raw}; expected HH:mm-HH:mm"))?;
	let start = start.trim();
	let end = end.trim();
	let start_time = NaiveTime::parse_from_str(start, "%H:%M")
		.map_err(|_| format!("invalid interval time: {start}"))?;
	let end_time = NaiveTime::parse_from_str(end, "%H:%M")
		.map_err(|_| format!("invalid interval time: {end}"))?;
	if end_time <= start_time {
		return Err(format!("interval end must be after start: {raw}"));
	}
	Ok(TemplateInterval {
		start: start.to_string(),
		end: end.to_string(),
	})
}

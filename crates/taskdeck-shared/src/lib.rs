use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Deserializer,
  Serialize
};
use uuid::Uuid;

pub const ERROR_DESCRIPTION_REQUIRED:
  &str = "Description is required";
pub const ERROR_TASK_NOT_FOUND: &str =
  "Task not found";

/// A single tracked task as it travels
/// over the wire and sits on disk.
///
/// Field names are camelCase. PascalCase
/// names are accepted on input so task
/// files written by older backends still
/// load.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  #[serde(alias = "Id")]
  pub id:           Uuid,
  #[serde(alias = "Description")]
  pub description:  String,
  #[serde(
    default,
    alias = "IsCompleted"
  )]
  pub is_completed: bool,
  #[serde(alias = "CreatedAt")]
  pub created_at:   DateTime<Utc>
}

impl Task {
  pub fn new(
    description: String,
    now: DateTime<Utc>
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      description,
      is_completed: false,
      created_at: now
    }
  }
}

/// Incomplete tasks first, then newest
/// first within each group.
pub fn compare_tasks(
  a: &Task,
  b: &Task
) -> Ordering {
  a.is_completed
    .cmp(&b.is_completed)
    .then_with(|| {
      b.created_at.cmp(&a.created_at)
    })
}

pub fn sort_tasks(tasks: &mut [Task]) {
  tasks.sort_by(compare_tasks);
}

pub fn description_is_blank(
  description: &str
) -> bool {
  description.trim().is_empty()
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
  /// Missing or `null` reads as empty
  /// and is rejected like a blank one.
  #[serde(
    default,
    deserialize_with = "null_as_empty"
  )]
  pub description: String
}

fn null_as_empty<'de, D>(
  deserializer: D
) -> Result<String, D::Error>
where
  D: Deserializer<'de>
{
  Option::<String>::deserialize(
    deserializer
  )
  .map(Option::unwrap_or_default)
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub description:  Option<String>,
  #[serde(default)]
  pub is_completed: bool
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct ErrorBody {
  pub error: String
}

impl ErrorBody {
  pub fn new(
    message: impl Into<String>
  ) -> Self {
    Self {
      error: message.into()
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
  #[default]
  All,
  Active,
  Completed
}

impl TaskFilter {
  pub const VARIANTS: [TaskFilter; 3] = [
    TaskFilter::All,
    TaskFilter::Active,
    TaskFilter::Completed
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | TaskFilter::All => "all",
      | TaskFilter::Active => "active",
      | TaskFilter::Completed => {
        "completed"
      }
    }
  }

  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | TaskFilter::All => true,
      | TaskFilter::Active => {
        !task.is_completed
      }
      | TaskFilter::Completed => {
        task.is_completed
      }
    }
  }

  pub fn apply<'a>(
    self,
    tasks: &'a [Task]
  ) -> Vec<&'a Task> {
    tasks
      .iter()
      .filter(|task| self.matches(task))
      .collect()
  }

  /// Count shown next to this filter's
  /// tab.
  pub fn count(
    self,
    stats: &TaskStats
  ) -> usize {
    match self {
      | TaskFilter::All => stats.total,
      | TaskFilter::Active => {
        stats.active
      }
      | TaskFilter::Completed => {
        stats.completed
      }
    }
  }
}

impl fmt::Display for TaskFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TaskFilter {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(TaskFilter::All),
      | "active" => {
        Ok(TaskFilter::Active)
      }
      | "completed" | "done" => {
        Ok(TaskFilter::Completed)
      }
      | other => Err(format!(
        "unknown filter '{other}', \
         expected all, active or \
         completed"
      ))
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct TaskStats {
  pub total:     usize,
  pub active:    usize,
  pub completed: usize
}

impl TaskStats {
  pub fn from_tasks(
    tasks: &[Task]
  ) -> Self {
    let completed = tasks
      .iter()
      .filter(|task| task.is_completed)
      .count();
    Self {
      total: tasks.len(),
      active: tasks.len() - completed,
      completed
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct HealthDto {
  pub status: String,
  pub tasks:  usize
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    TimeZone,
    Utc
  };

  use super::*;

  fn at(
    minutes: i64,
    done: bool
  ) -> Task {
    let base = Utc
      .with_ymd_and_hms(
        2026, 3, 1, 9, 0, 0
      )
      .unwrap();
    let mut task = Task::new(
      format!("t{minutes}"),
      base + Duration::minutes(minutes)
    );
    task.is_completed = done;
    task
  }

  #[test]
  fn sorts_active_first_then_newest()
  {
    let mut tasks = vec![
      at(1, true),
      at(5, false),
      at(9, true),
      at(2, false),
    ];
    sort_tasks(&mut tasks);

    let order: Vec<&str> = tasks
      .iter()
      .map(|t| t.description.as_str())
      .collect();
    assert_eq!(
      order,
      vec!["t5", "t2", "t9", "t1"]
    );
  }

  #[test]
  fn filters_and_stats_agree() {
    let tasks = vec![
      at(1, true),
      at(2, false),
      at(3, false),
    ];
    let stats =
      TaskStats::from_tasks(&tasks);
    assert_eq!(
      stats,
      TaskStats {
        total:     3,
        active:    2,
        completed: 1
      }
    );

    for filter in TaskFilter::VARIANTS {
      assert_eq!(
        filter.apply(&tasks).len(),
        filter.count(&stats),
        "filter {filter}"
      );
    }
  }

  #[test]
  fn filter_parses_case_insensitively()
  {
    assert_eq!(
      "Active".parse::<TaskFilter>(),
      Ok(TaskFilter::Active)
    );
    assert_eq!(
      " COMPLETED ".parse::<TaskFilter>(),
      Ok(TaskFilter::Completed)
    );
    assert!(
      "someday"
        .parse::<TaskFilter>()
        .is_err()
    );
  }

  #[test]
  fn task_uses_camel_case_and_accepts_pascal_case()
   {
    let task = at(0, false);
    let value =
      serde_json::to_value(&task)
        .unwrap();
    assert!(value.get("isCompleted").is_some());
    assert!(value.get("createdAt").is_some());

    let legacy = serde_json::json!({
      "Id": task.id,
      "Description": "legacy",
      "IsCompleted": true,
      "CreatedAt": "2026-03-01T09:00:00.1234567Z"
    });
    let parsed: Task =
      serde_json::from_value(legacy)
        .unwrap();
    assert_eq!(parsed.id, task.id);
    assert!(parsed.is_completed);
  }

  #[test]
  fn update_request_defaults_completion_to_false()
   {
    let parsed: UpdateTaskRequest =
      serde_json::from_str(
        r#"{"description":"x"}"#
      )
      .unwrap();
    assert_eq!(
      parsed.description.as_deref(),
      Some("x")
    );
    assert!(!parsed.is_completed);

    let encoded =
      serde_json::to_string(
        &UpdateTaskRequest {
          description:  None,
          is_completed: true
        }
      )
      .unwrap();
    assert_eq!(
      encoded,
      r#"{"isCompleted":true}"#
    );
  }

  #[test]
  fn create_request_reads_missing_or_null_description_as_empty()
   {
    for raw in [
      r#"{}"#,
      r#"{"description":null}"#
    ] {
      let parsed: CreateTaskRequest =
        serde_json::from_str(raw)
          .unwrap();
      assert!(description_is_blank(
        &parsed.description
      ));
    }
  }

  #[test]
  fn blank_descriptions_are_detected() {
    assert!(description_is_blank(""));
    assert!(description_is_blank(
      " \t\n"
    ));
    assert!(!description_is_blank(
      " milk "
    ));
  }
}

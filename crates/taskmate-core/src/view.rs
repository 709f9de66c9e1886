use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Duration,
  Utc
};
use serde::Serialize;

use crate::task::Task;

pub const NEAR_DEADLINE_HOURS: i64 = 24;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum FilterStatus {
  #[default]
  All,
  Pending,
  Completed
}

impl FilterStatus {
  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | FilterStatus::All => true,
      | FilterStatus::Pending => {
        !task.completed
      }
      | FilterStatus::Completed => {
        task.completed
      }
    }
  }
}

impl fmt::Display for FilterStatus {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(match self {
      | FilterStatus::All => "All",
      | FilterStatus::Pending => {
        "Pending"
      }
      | FilterStatus::Completed => {
        "Completed"
      }
    })
  }
}

impl FromStr for FilterStatus {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(FilterStatus::All),
      | "pending" | "open" => {
        Ok(FilterStatus::Pending)
      }
      | "completed" | "done" => {
        Ok(FilterStatus::Completed)
      }
      | other => Err(anyhow!(
        "invalid filter: {other} \
         (expected all, pending or \
         completed)"
      ))
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum SortBy {
  #[default]
  Deadline,
  Priority
}

impl SortBy {
  fn compare(
    self,
    a: &Task,
    b: &Task
  ) -> Ordering {
    match self {
      | SortBy::Deadline => {
        match (a.deadline, b.deadline) {
          | (Some(x), Some(y)) => {
            x.cmp(&y)
          }
          | (Some(_), None) => {
            Ordering::Less
          }
          | (None, Some(_)) => {
            Ordering::Greater
          }
          | (None, None) => {
            Ordering::Equal
          }
        }
      }
      | SortBy::Priority => a
        .priority
        .rank()
        .cmp(&b.priority.rank())
    }
  }
}

impl fmt::Display for SortBy {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(match self {
      | SortBy::Deadline => "deadline",
      | SortBy::Priority => "priority"
    })
  }
}

impl FromStr for SortBy {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "deadline" | "due" => {
        Ok(SortBy::Deadline)
      }
      | "priority" | "pri" => {
        Ok(SortBy::Priority)
      }
      | other => Err(anyhow!(
        "invalid sort key: {other} \
         (expected deadline or \
         priority)"
      ))
    }
  }
}

/// Filtered, sorted borrow of `tasks`.
/// Equal keys keep insertion order.
#[tracing::instrument(skip(tasks), fields(count = tasks.len()))]
pub fn project(
  tasks: &[Task],
  filter: FilterStatus,
  sort: SortBy
) -> Vec<&Task> {
  let mut out: Vec<&Task> = tasks
    .iter()
    .filter(|task| filter.matches(task))
    .collect();
  out.sort_by(|a, b| sort.compare(a, b));
  tracing::trace!(
    visible = out.len(),
    "projected task view"
  );
  out
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct DashboardCounts {
  pub total:     usize,
  pub completed: usize,
  pub pending:   usize
}

impl DashboardCounts {
  pub fn of(tasks: &[Task]) -> Self {
    let total = tasks.len();
    let completed = tasks
      .iter()
      .filter(|task| task.completed)
      .count();
    Self {
      total,
      completed,
      pending: total - completed
    }
  }
}

pub fn near_deadline_window() -> Duration
{
  Duration::hours(NEAR_DEADLINE_HOURS)
}

/// True when the deadline is strictly
/// after `now` and at most 24h away.
pub fn is_deadline_near(
  deadline: Option<DateTime<Utc>>,
  now: DateTime<Utc>
) -> bool {
  is_deadline_near_within(
    deadline,
    now,
    near_deadline_window()
  )
}

pub fn is_deadline_near_within(
  deadline: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
  window: Duration
) -> bool {
  let Some(deadline) = deadline else {
    return false;
  };
  let remaining = deadline - now;
  remaining > Duration::zero()
    && remaining <= window
}

/// Display flag: near deadline and still
/// open.
pub fn deadline_flagged(
  task: &Task,
  now: DateTime<Utc>,
  window: Duration
) -> bool {
  !task.completed
    && is_deadline_near_within(
      task.deadline,
      now,
      window
    )
}

#[cfg(test)]
mod tests {
  use chrono::{
    DateTime,
    Duration,
    TimeZone,
    Utc
  };

  use super::{
    DashboardCounts,
    FilterStatus,
    SortBy,
    deadline_flagged,
    is_deadline_near,
    project
  };
  use crate::task::{
    Priority,
    Task
  };

  fn base() -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2026, 2, 16, 5, 0, 0
      )
      .unwrap()
  }

  fn task(
    id: &str,
    deadline: Option<i64>,
    priority: Priority,
    completed: bool
  ) -> Task {
    Task {
      id: id.to_string(),
      name: format!("task {id}"),
      description: String::new(),
      deadline: deadline.map(|days| {
        base() + Duration::days(days)
      }),
      priority,
      completed,
      created_at: base()
    }
  }

  fn ids(view: &[&Task]) -> Vec<String> {
    view
      .iter()
      .map(|task| task.id.clone())
      .collect()
  }

  #[test]
  fn deadline_sort_puts_absent_last() {
    let tasks = vec![
      task("three", Some(3), Priority::Low, false),
      task("one", Some(1), Priority::Low, false),
      task("none", None, Priority::Low, false),
      task("two", Some(2), Priority::Low, false),
    ];

    let view = project(
      &tasks,
      FilterStatus::All,
      SortBy::Deadline
    );
    assert_eq!(
      ids(&view),
      vec!["one", "two", "three", "none"]
    );
    assert_eq!(tasks[0].id, "three");
  }

  #[test]
  fn priority_sort_is_high_first_and_stable()
  {
    let tasks = vec![
      task("low", Some(1), Priority::Low, false),
      task("high", Some(1), Priority::High, false),
      task("medium", Some(1), Priority::Medium, false),
      task("high2", Some(1), Priority::High, false),
    ];

    let view = project(
      &tasks,
      FilterStatus::All,
      SortBy::Priority
    );
    assert_eq!(
      ids(&view),
      vec!["high", "high2", "medium", "low"]
    );
  }

  #[test]
  fn filters_select_exact_subsequences() {
    let tasks = vec![
      task("a", Some(1), Priority::Low, true),
      task("b", Some(2), Priority::Low, false),
      task("c", Some(3), Priority::Low, true),
    ];

    assert_eq!(
      ids(&project(
        &tasks,
        FilterStatus::Completed,
        SortBy::Deadline
      )),
      vec!["a", "c"]
    );
    assert_eq!(
      ids(&project(
        &tasks,
        FilterStatus::Pending,
        SortBy::Deadline
      )),
      vec!["b"]
    );
    assert_eq!(
      project(
        &tasks,
        FilterStatus::All,
        SortBy::Deadline
      )
      .len(),
      3
    );
  }

  #[test]
  fn dashboard_counts_split_completed() {
    let tasks: Vec<Task> = (0..5)
      .map(|idx| {
        task(
          &idx.to_string(),
          Some(idx),
          Priority::Low,
          idx < 2
        )
      })
      .collect();

    assert_eq!(
      DashboardCounts::of(&tasks),
      DashboardCounts {
        total:     5,
        completed: 2,
        pending:   3
      }
    );
  }

  #[test]
  fn deadline_near_boundaries() {
    let now = base();
    assert!(is_deadline_near(
      Some(now + Duration::hours(24)),
      now
    ));
    assert!(!is_deadline_near(
      Some(
        now
          + Duration::hours(24)
          + Duration::seconds(1)
      ),
      now
    ));
    assert!(!is_deadline_near(
      Some(now - Duration::seconds(1)),
      now
    ));
    assert!(!is_deadline_near(
      Some(now),
      now
    ));
    assert!(!is_deadline_near(None, now));
  }

  #[test]
  fn completed_tasks_are_never_flagged() {
    let now = base();
    let mut near = task(
      "n",
      None,
      Priority::High,
      false
    );
    near.deadline =
      Some(now + Duration::hours(3));
    assert!(deadline_flagged(
      &near,
      now,
      Duration::hours(24)
    ));

    near.completed = true;
    assert!(!deadline_flagged(
      &near,
      now,
      Duration::hours(24)
    ));
  }

  #[test]
  fn selectors_parse_case_insensitively() {
    assert_eq!(
      "Completed"
        .parse::<FilterStatus>()
        .unwrap(),
      FilterStatus::Completed
    );
    assert_eq!(
      "PRIORITY".parse::<SortBy>().unwrap(),
      SortBy::Priority
    );
    assert!(
      "newest".parse::<SortBy>().is_err()
    );
  }
}

//! Caller-visible UI state around a [`TaskStore`]: the add form, the
//! filter/sort controls, the two-step delete prompt and the notice queue.
//!
//! Nothing in here returns an error. Every [`StoreError`] becomes a
//! [`Notice`] that stays queued until the caller dismisses it.

use chrono::Duration;
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::capabilities::{Clock, IdGenerator, SystemClock, UuidGenerator};
use crate::datetime::parse_deadline;
use crate::error::{StoreError, ValidationError};
use crate::storage::Storage;
use crate::store::TaskStore;
use crate::task::{NewTask, Priority, Task};
use crate::view::{DashboardCounts, FilterStatus, SortBy, deadline_flagged, near_deadline_window};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Validation,
    StorageRead,
    StorageWrite,
    Failure,
}

impl From<&StoreError> for NoticeKind {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::Validation(_) => NoticeKind::Validation,
            StoreError::StorageRead { .. } => NoticeKind::StorageRead,
            StoreError::StorageWrite { .. } => NoticeKind::StorageWrite,
            StoreError::IdCollision { .. } => NoticeKind::Failure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

/// Raw form input. `deadline` is the text as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub description: String,
    pub deadline: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskRow<'a> {
    pub task: &'a Task,
    pub deadline_near: bool,
}

#[derive(Debug)]
pub struct Session<S, C = SystemClock, G = UuidGenerator> {
    store: TaskStore<S, C, G>,
    timezone: Tz,
    near_window: Duration,
    draft: TaskDraft,
    filter: FilterStatus,
    sort: SortBy,
    pending_delete: Option<String>,
    notices: Vec<Notice>,
    next_notice_id: u64,
}

impl<S, C, G> Session<S, C, G>
where
    S: Storage,
    C: Clock,
    G: IdGenerator,
{
    /// Loads `store` and wraps it. A load failure is queued as a notice and
    /// the session starts empty.
    pub fn open(mut store: TaskStore<S, C, G>, timezone: Tz) -> Self {
        let loaded = store.initialize();
        let mut session = Self {
            store,
            timezone,
            near_window: near_deadline_window(),
            draft: TaskDraft::default(),
            filter: FilterStatus::default(),
            sort: SortBy::default(),
            pending_delete: None,
            notices: Vec::new(),
            next_notice_id: 1,
        };
        if let Err(err) = loaded {
            session.notify(&err);
        }
        session
    }

    pub fn with_near_window(mut self, window: Duration) -> Self {
        self.near_window = window;
        self
    }

    pub fn with_view(mut self, filter: FilterStatus, sort: SortBy) -> Self {
        self.filter = filter;
        self.sort = sort;
        self
    }

    pub fn draft(&self) -> &TaskDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut TaskDraft {
        &mut self.draft
    }

    /// Submits the form. The draft is cleared once the task exists, even if
    /// saving it failed; it is kept when the input was rejected.
    #[tracing::instrument(skip(self))]
    pub fn submit(&mut self) -> Option<Task> {
        let raw_deadline = self.draft.deadline.trim();
        let deadline = if raw_deadline.is_empty() {
            None
        } else {
            match parse_deadline(raw_deadline, &self.timezone) {
                Ok(deadline) => Some(deadline),
                Err(err) => {
                    debug!(error = %err, "rejected deadline input");
                    let err: StoreError =
                        ValidationError::InvalidDeadline(raw_deadline.to_string()).into();
                    self.notify(&err);
                    return None;
                }
            }
        };

        let new_task = NewTask {
            name: self.draft.name.trim().to_string(),
            description: self.draft.description.clone(),
            deadline,
            priority: self.draft.priority,
        };

        match self.store.add_task(new_task) {
            Ok(task) => {
                self.draft = TaskDraft::default();
                Some(task)
            }
            Err(err @ StoreError::StorageWrite { .. }) => {
                self.notify(&err);
                self.draft = TaskDraft::default();
                self.store.tasks().last().cloned()
            }
            Err(err) => {
                self.notify(&err);
                None
            }
        }
    }

    pub fn filter(&self) -> FilterStatus {
        self.filter
    }

    pub fn set_filter(&mut self, filter: FilterStatus) {
        self.filter = filter;
    }

    pub fn sort(&self) -> SortBy {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortBy) {
        self.sort = sort;
    }

    /// Rows for the current filter and sort, flagged against the clock now.
    pub fn visible(&self) -> Vec<TaskRow<'_>> {
        let now = self.store.now();
        self.store
            .view(self.filter, self.sort)
            .into_iter()
            .map(|task| TaskRow {
                task,
                deadline_near: deadline_flagged(task, now, self.near_window),
            })
            .collect()
    }

    pub fn counts(&self) -> DashboardCounts {
        self.store.dashboard_counts()
    }

    pub fn toggle(&mut self, id: &str) {
        if let Err(err) = self.store.toggle_complete(id) {
            self.notify(&err);
        }
    }

    /// First step of a delete. Returns the task awaiting confirmation, or
    /// `None` (and clears any earlier request) when the id is unknown.
    pub fn request_delete(&mut self, id: &str) -> Option<&Task> {
        self.pending_delete = self.store.get(id).map(|task| task.id.clone());
        self.pending_delete()
    }

    pub fn pending_delete(&self) -> Option<&Task> {
        self.pending_delete
            .as_deref()
            .and_then(|id| self.store.get(id))
    }

    pub fn cancel_delete(&mut self) {
        if let Some(id) = self.pending_delete.take() {
            debug!(%id, "delete cancelled");
        }
    }

    /// Deletes the task awaiting confirmation. No-op when nothing is pending.
    pub fn confirm_delete(&mut self) -> bool {
        let Some(id) = self.pending_delete.take() else {
            return false;
        };
        if let Err(err) = self.store.delete_task(&id) {
            self.notify(&err);
        }
        info!(%id, "delete confirmed");
        true
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn dismiss(&mut self, notice_id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.id != notice_id);
        self.notices.len() != before
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn store(&self) -> &TaskStore<S, C, G> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TaskStore<S, C, G> {
        &mut self.store
    }

    pub fn timezone(&self) -> &Tz {
        &self.timezone
    }

    fn notify(&mut self, err: &StoreError) {
        let notice = Notice {
            id: self.next_notice_id,
            kind: NoticeKind::from(err),
            message: err.to_string(),
        };
        self.next_notice_id += 1;
        warn!(kind = ?notice.kind, message = %notice.message, "queued notice");
        self.notices.push(notice);
    }
}

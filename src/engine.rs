//! Task lifecycle engine — the sole mutator of the task and user collections.
//!
//! Every operation re-checks the authorization table before touching state:
//!
//! | operation            | allowed actor                                   |
//! |----------------------|-------------------------------------------------|
//! | create_task          | any signed-in user                              |
//! | update_task          | owner, while status ∈ {pending, in-progress}    |
//! | submit_task          | owner, while status ∈ {pending, in-progress}    |
//! | reopen_task          | owner, while status = rejected                  |
//! | approve/reject_task  | admin, while status = submitted                 |
//! | delete_task          | admin                                           |
//! | update_user          | profile owner or admin                          |
//!
//! Mutations are write-through: the new collection is persisted before the
//! operation returns, and a failed store write rolls the in-memory change
//! back so memory and disk never diverge. Outcomes are reported on the
//! notification sink; rejection is a negative outcome and surfaces as an
//! error-kind notification.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::model::{self, Task, TaskDraft, TaskStatus, User};
use crate::notify::{NotificationSink, NotifyKind};
use crate::session::Session;
use crate::store::{keys, JsonStore};

pub struct TaskEngine {
    store: JsonStore,
    sink: Arc<dyn NotificationSink>,
    tasks: Vec<Task>,
    users: Vec<User>,
    session: Session,
}

impl TaskEngine {
    /// Open the engine over `store`, restoring persisted state. An empty
    /// store is seeded with the demo users and sample tasks (first run).
    pub fn open(store: JsonStore, sink: Arc<dyn NotificationSink>) -> Self {
        let tasks = store.load(keys::TASKS, model::seed_tasks());
        let users = store.load(keys::USERS, model::seed_users());
        let session = Session::load(&store);
        debug!(tasks = tasks.len(), users = users.len(), "engine state restored");
        Self {
            store,
            sink,
            tasks,
            users,
            session,
        }
    }

    // ─── Snapshot accessors ──────────────────────────────────────────────────

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.current_user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    // ─── Session operations ──────────────────────────────────────────────────

    /// Set (or clear) the signed-in user. The credential check happens in
    /// the login collaborator, not here.
    pub fn set_session(&mut self, user: Option<User>) -> Result<()> {
        let result = self.session.set(&self.store, user).map_err(EngineError::from);
        if let Err(e) = &result {
            self.sink.notify(NotifyKind::Error, &e.to_string());
        }
        result
    }

    pub fn logout(&mut self) -> Result<()> {
        let result = self.session.clear(&self.store).map_err(EngineError::from);
        self.report(result, NotifyKind::Success, "Logged out")
    }

    // ─── Task operations ─────────────────────────────────────────────────────

    pub fn create_task(&mut self, draft: TaskDraft, actor_id: &str) -> Result<Task> {
        let result = self.try_create_task(draft, actor_id);
        self.report(result, NotifyKind::Success, "Task created")
    }

    /// Replace a task wholesale. Only the owner may edit, only while the
    /// task is editable, and the replacement is re-validated here: progress
    /// is clamped to 0..=100, status may only move along the
    /// pending ↔ in-progress edge, and id/owner/admin comment are immutable
    /// through this path.
    pub fn update_task(&mut self, updated: Task, actor_id: &str) -> Result<Task> {
        let result = self.try_update_task(updated, actor_id);
        self.report(result, NotifyKind::Success, "Task updated")
    }

    pub fn delete_task(&mut self, task_id: &str, actor_id: &str) -> Result<()> {
        let result = self.try_delete_task(task_id, actor_id);
        self.report(result, NotifyKind::Success, "Task deleted")
    }

    pub fn submit_task(&mut self, task_id: &str, actor_id: &str) -> Result<Task> {
        let result = self.try_submit_task(task_id, actor_id);
        self.report(result, NotifyKind::Success, "Task submitted")
    }

    /// Approve a submitted task. With no comment, any existing admin
    /// comment is left in place.
    pub fn approve_task(
        &mut self,
        task_id: &str,
        comment: Option<String>,
        actor_id: &str,
    ) -> Result<Task> {
        let result = self.try_review_task(task_id, actor_id, TaskStatus::Approved, comment);
        self.report(result, NotifyKind::Success, "Task approved")
    }

    /// Reject a submitted task. The comment always overwrites. Rejection is
    /// a negative outcome, so even the success path notifies at error kind.
    pub fn reject_task(&mut self, task_id: &str, comment: String, actor_id: &str) -> Result<Task> {
        let result = self.try_review_task(task_id, actor_id, TaskStatus::Rejected, Some(comment));
        self.report(result, NotifyKind::Error, "Task rejected")
    }

    /// Take a rejected task back to pending so the owner can edit and
    /// resubmit. The admin comment is retained — the owner can still read
    /// the rejection reason.
    pub fn reopen_task(&mut self, task_id: &str, actor_id: &str) -> Result<Task> {
        let result = self.try_reopen_task(task_id, actor_id);
        self.report(result, NotifyKind::Success, "Task reopened")
    }

    // ─── User operations ─────────────────────────────────────────────────────

    /// Replace a user record. Only the profile owner or an admin may edit;
    /// id and role are immutable through this path. When the edited record
    /// is the signed-in user, the session copy is refreshed too.
    pub fn update_user(&mut self, updated: User, actor_id: &str) -> Result<User> {
        let result = self.try_update_user(updated, actor_id);
        self.report(result, NotifyKind::Success, "Profile updated")
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    /// Report the outcome on the sink and pass the result through.
    fn report<T>(&self, result: Result<T>, ok_kind: NotifyKind, ok_message: &str) -> Result<T> {
        match &result {
            Ok(_) => self.sink.notify(ok_kind, ok_message),
            Err(e) => self.sink.notify(NotifyKind::Error, &e.to_string()),
        }
        result
    }

    /// Resolve the acting user. Every operation requires a signed-in
    /// session; the process is single-session, so the actor id identifies
    /// the caller rather than being re-derived from the session.
    fn require_actor(&self, actor_id: &str) -> Result<User> {
        if !self.session.is_authenticated() {
            return Err(EngineError::Unauthorized("no user is signed in".to_string()));
        }
        self.users
            .iter()
            .find(|u| u.id == actor_id)
            .cloned()
            .ok_or_else(|| EngineError::user_not_found(actor_id))
    }

    fn find_task(&self, task_id: &str) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| EngineError::task_not_found(task_id))
    }

    /// Persist the task collection; restore `previous` if the write fails.
    fn commit_tasks(&mut self, previous: Vec<Task>) -> Result<()> {
        if let Err(e) = self.store.save(keys::TASKS, &self.tasks) {
            self.tasks = previous;
            return Err(e.into());
        }
        Ok(())
    }

    fn commit_users(&mut self, previous: Vec<User>) -> Result<()> {
        if let Err(e) = self.store.save(keys::USERS, &self.users) {
            self.users = previous;
            return Err(e.into());
        }
        Ok(())
    }

    fn try_create_task(&mut self, draft: TaskDraft, actor_id: &str) -> Result<Task> {
        let actor = self.require_actor(actor_id)?;
        if draft.title.trim().is_empty() {
            return Err(EngineError::Validation("title must not be empty".to_string()));
        }
        if draft.description.trim().is_empty() {
            return Err(EngineError::Validation(
                "description must not be empty".to_string(),
            ));
        }
        let deadline = draft
            .deadline
            .ok_or_else(|| EngineError::Validation("deadline is required".to_string()))?;

        let task = Task {
            id: model::new_id(),
            title: draft.title,
            description: draft.description,
            progress: 0,
            deadline,
            status: TaskStatus::Pending,
            photos: draft.photos,
            created_by: actor.id,
            admin_comment: None,
        };

        let previous = self.tasks.clone();
        self.tasks.push(task.clone());
        self.commit_tasks(previous)?;
        info!(task_id = %task.id, actor = actor_id, "task created");
        Ok(task)
    }

    fn try_update_task(&mut self, updated: Task, actor_id: &str) -> Result<Task> {
        let actor = self.require_actor(actor_id)?;
        let idx = self.find_task(&updated.id)?;
        let current = &self.tasks[idx];

        if current.created_by != actor.id {
            return Err(EngineError::Unauthorized(
                "only the task owner may edit it".to_string(),
            ));
        }
        if !current.status.is_editable() {
            return Err(EngineError::Unauthorized(format!(
                "a {} task can no longer be edited",
                current.status
            )));
        }
        if updated.status != current.status && !updated.status.is_editable() {
            return Err(EngineError::Validation(format!(
                "invalid transition: {} → {} through an edit",
                current.status, updated.status
            )));
        }

        let mut next = updated;
        next.created_by = current.created_by.clone();
        next.admin_comment = current.admin_comment.clone();
        next.progress = next.progress.min(100);

        let previous = self.tasks.clone();
        self.tasks[idx] = next.clone();
        self.commit_tasks(previous)?;
        debug!(task_id = %next.id, actor = actor_id, progress = next.progress, "task updated");
        Ok(next)
    }

    fn try_delete_task(&mut self, task_id: &str, actor_id: &str) -> Result<()> {
        let actor = self.require_actor(actor_id)?;
        if !actor.is_admin() {
            return Err(EngineError::Unauthorized(
                "only an admin may delete tasks".to_string(),
            ));
        }
        let idx = self.find_task(task_id)?;

        let previous = self.tasks.clone();
        self.tasks.remove(idx);
        self.commit_tasks(previous)?;
        info!(task_id, actor = actor_id, "task deleted");
        Ok(())
    }

    fn try_submit_task(&mut self, task_id: &str, actor_id: &str) -> Result<Task> {
        let actor = self.require_actor(actor_id)?;
        let idx = self.find_task(task_id)?;
        let current = &self.tasks[idx];

        if current.created_by != actor.id {
            return Err(EngineError::Unauthorized(
                "only the task owner may submit it".to_string(),
            ));
        }
        if !model::valid_transition(current.status, TaskStatus::Submitted) {
            return Err(EngineError::Validation(format!(
                "invalid transition: {} → submitted",
                current.status
            )));
        }

        let previous = self.tasks.clone();
        self.tasks[idx].status = TaskStatus::Submitted;
        let task = self.tasks[idx].clone();
        self.commit_tasks(previous)?;
        info!(task_id, actor = actor_id, "task submitted for review");
        Ok(task)
    }

    /// Shared approve/reject path: admin-only, submitted-only.
    fn try_review_task(
        &mut self,
        task_id: &str,
        actor_id: &str,
        verdict: TaskStatus,
        comment: Option<String>,
    ) -> Result<Task> {
        let actor = self.require_actor(actor_id)?;
        if !actor.is_admin() {
            return Err(EngineError::Unauthorized(
                "only an admin may review tasks".to_string(),
            ));
        }
        let idx = self.find_task(task_id)?;
        let current = &self.tasks[idx];
        if !model::valid_transition(current.status, verdict) {
            return Err(EngineError::Validation(format!(
                "invalid transition: {} → {}",
                current.status, verdict
            )));
        }

        let previous = self.tasks.clone();
        let task = &mut self.tasks[idx];
        task.status = verdict;
        if let Some(comment) = comment {
            task.admin_comment = Some(comment);
        }
        let task = task.clone();
        self.commit_tasks(previous)?;
        info!(task_id, actor = actor_id, verdict = %verdict, "task reviewed");
        Ok(task)
    }

    fn try_reopen_task(&mut self, task_id: &str, actor_id: &str) -> Result<Task> {
        let actor = self.require_actor(actor_id)?;
        let idx = self.find_task(task_id)?;
        let current = &self.tasks[idx];

        if current.created_by != actor.id {
            return Err(EngineError::Unauthorized(
                "only the task owner may reopen it".to_string(),
            ));
        }
        if !model::valid_transition(current.status, TaskStatus::Pending) {
            return Err(EngineError::Validation(format!(
                "invalid transition: {} → pending",
                current.status
            )));
        }

        let previous = self.tasks.clone();
        self.tasks[idx].status = TaskStatus::Pending;
        let task = self.tasks[idx].clone();
        self.commit_tasks(previous)?;
        info!(task_id, actor = actor_id, "task reopened for editing");
        Ok(task)
    }

    fn try_update_user(&mut self, updated: User, actor_id: &str) -> Result<User> {
        let actor = self.require_actor(actor_id)?;
        if actor.id != updated.id && !actor.is_admin() {
            return Err(EngineError::Unauthorized(
                "only the profile owner or an admin may edit a profile".to_string(),
            ));
        }
        let idx = self
            .users
            .iter()
            .position(|u| u.id == updated.id)
            .ok_or_else(|| EngineError::user_not_found(&updated.id))?;

        let mut next = updated;
        next.role = self.users[idx].role;

        let previous = self.users.clone();
        self.users[idx] = next.clone();
        self.commit_users(previous)?;
        self.session.refresh(&self.store, &next)?;
        info!(user_id = %next.id, actor = actor_id, "profile updated");
        Ok(next)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{seed_users, Role};
    use crate::notify::MemorySink;
    use chrono::NaiveDate;

    const ADMIN: &str = "1";
    const OWNER: &str = "2";

    struct Fixture {
        _dir: tempfile::TempDir,
        sink: Arc<MemorySink>,
        engine: TaskEngine,
    }

    /// Engine over a fresh store with the admin signed in.
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        let sink = Arc::new(MemorySink::default());
        let mut engine = TaskEngine::open(store, sink.clone());
        engine.set_session(Some(seed_users().remove(0))).unwrap();
        Fixture {
            _dir: dir,
            sink,
            engine,
        }
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: "details".to_string(),
            deadline: NaiveDate::from_ymd_opt(2025, 6, 1),
            photos: Vec::new(),
        }
    }

    #[test]
    fn create_defaults_pending_zero_progress() {
        let mut f = fixture();
        let task = f.engine.create_task(draft("Write spec"), OWNER).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress, 0);
        assert_eq!(task.created_by, OWNER);
        assert_eq!(task.admin_comment, None);
    }

    #[test]
    fn create_rejects_blank_title() {
        let mut f = fixture();
        let before = f.engine.tasks().len();
        let err = f.engine.create_task(draft("   "), OWNER).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(f.engine.tasks().len(), before);
    }

    #[test]
    fn create_rejects_missing_deadline() {
        let mut f = fixture();
        let mut d = draft("No deadline");
        d.deadline = None;
        assert!(matches!(
            f.engine.create_task(d, OWNER),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn create_requires_signed_in_session() {
        let mut f = fixture();
        f.engine.logout().unwrap();
        assert!(matches!(
            f.engine.create_task(draft("t"), OWNER),
            Err(EngineError::Unauthorized(_))
        ));
    }

    #[test]
    fn update_clamps_progress() {
        let mut f = fixture();
        let mut task = f.engine.create_task(draft("t"), OWNER).unwrap();
        task.progress = 250;
        let updated = f.engine.update_task(task, OWNER).unwrap();
        assert_eq!(updated.progress, 100);
    }

    #[test]
    fn update_by_non_owner_rejected() {
        let mut f = fixture();
        let mut task = f.engine.create_task(draft("t"), OWNER).unwrap();
        task.title = "hijacked".to_string();
        // The admin is not the owner; the table gives update to owners only.
        let err = f.engine.update_task(task.clone(), ADMIN).unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized(_)));
        assert_eq!(f.engine.task(&task.id).unwrap().title, "t");
    }

    #[test]
    fn update_cannot_smuggle_status_or_owner() {
        let mut f = fixture();
        let mut task = f.engine.create_task(draft("t"), OWNER).unwrap();
        task.status = TaskStatus::Approved;
        let err = f.engine.update_task(task.clone(), OWNER).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        task.status = TaskStatus::InProgress; // allowed edit edge
        task.created_by = ADMIN.to_string();
        task.admin_comment = Some("forged".to_string());
        let updated = f.engine.update_task(task, OWNER).unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.created_by, OWNER);
        assert_eq!(updated.admin_comment, None);
    }

    #[test]
    fn update_after_submission_rejected() {
        let mut f = fixture();
        let task = f.engine.create_task(draft("t"), OWNER).unwrap();
        f.engine.submit_task(&task.id, OWNER).unwrap();
        let mut edited = f.engine.task(&task.id).unwrap().clone();
        edited.progress = 10;
        assert!(matches!(
            f.engine.update_task(edited, OWNER),
            Err(EngineError::Unauthorized(_))
        ));
    }

    #[test]
    fn submit_then_resubmit_rejected() {
        let mut f = fixture();
        let task = f.engine.create_task(draft("t"), OWNER).unwrap();
        let submitted = f.engine.submit_task(&task.id, OWNER).unwrap();
        assert_eq!(submitted.status, TaskStatus::Submitted);
        assert!(matches!(
            f.engine.submit_task(&task.id, OWNER),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn submit_by_non_owner_rejected() {
        let mut f = fixture();
        let task = f.engine.create_task(draft("t"), OWNER).unwrap();
        assert!(matches!(
            f.engine.submit_task(&task.id, ADMIN),
            Err(EngineError::Unauthorized(_))
        ));
    }

    #[test]
    fn approve_without_comment_keeps_existing() {
        let mut f = fixture();
        let task = f.engine.create_task(draft("t"), OWNER).unwrap();
        f.engine.submit_task(&task.id, OWNER).unwrap();
        f.engine
            .reject_task(&task.id, "looks good".to_string(), ADMIN)
            .unwrap();
        f.engine.reopen_task(&task.id, OWNER).unwrap();
        f.engine.submit_task(&task.id, OWNER).unwrap();

        let approved = f.engine.approve_task(&task.id, None, ADMIN).unwrap();
        assert_eq!(approved.status, TaskStatus::Approved);
        assert_eq!(approved.admin_comment.as_deref(), Some("looks good"));
    }

    #[test]
    fn reject_sets_comment_and_notifies_error_kind() {
        let mut f = fixture();
        let task = f.engine.create_task(draft("t"), OWNER).unwrap();
        f.engine.submit_task(&task.id, OWNER).unwrap();
        f.sink.take();

        let rejected = f
            .engine
            .reject_task(&task.id, "incomplete".to_string(), ADMIN)
            .unwrap();
        assert_eq!(rejected.status, TaskStatus::Rejected);
        assert_eq!(rejected.admin_comment.as_deref(), Some("incomplete"));

        let messages = f.sink.take();
        assert_eq!(messages, vec![(NotifyKind::Error, "Task rejected".to_string())]);
    }

    #[test]
    fn review_by_non_admin_rejected_and_unchanged() {
        let mut f = fixture();
        let task = f.engine.create_task(draft("t"), OWNER).unwrap();
        f.engine.submit_task(&task.id, OWNER).unwrap();

        assert!(matches!(
            f.engine.approve_task(&task.id, None, OWNER),
            Err(EngineError::Unauthorized(_))
        ));
        assert!(matches!(
            f.engine.reject_task(&task.id, "no".to_string(), OWNER),
            Err(EngineError::Unauthorized(_))
        ));
        assert_eq!(f.engine.task(&task.id).unwrap().status, TaskStatus::Submitted);
    }

    #[test]
    fn review_before_submission_rejected() {
        let mut f = fixture();
        let task = f.engine.create_task(draft("t"), OWNER).unwrap();
        assert!(matches!(
            f.engine.approve_task(&task.id, None, ADMIN),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn delete_is_admin_only() {
        let mut f = fixture();
        let task = f.engine.create_task(draft("t"), OWNER).unwrap();
        assert!(matches!(
            f.engine.delete_task(&task.id, OWNER),
            Err(EngineError::Unauthorized(_))
        ));
        f.engine.delete_task(&task.id, ADMIN).unwrap();
        assert!(f.engine.task(&task.id).is_none());
    }

    #[test]
    fn missing_ids_are_explicit_errors() {
        let mut f = fixture();
        assert!(matches!(
            f.engine.delete_task("nope", ADMIN),
            Err(EngineError::NotFound { kind: "task", .. })
        ));
        assert!(matches!(
            f.engine.submit_task("nope", OWNER),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn reopen_is_owner_only_and_rejected_only() {
        let mut f = fixture();
        let task = f.engine.create_task(draft("t"), OWNER).unwrap();
        assert!(matches!(
            f.engine.reopen_task(&task.id, OWNER),
            Err(EngineError::Validation(_))
        ));

        f.engine.submit_task(&task.id, OWNER).unwrap();
        f.engine.reject_task(&task.id, "redo".to_string(), ADMIN).unwrap();
        assert!(matches!(
            f.engine.reopen_task(&task.id, ADMIN),
            Err(EngineError::Unauthorized(_))
        ));

        let reopened = f.engine.reopen_task(&task.id, OWNER).unwrap();
        assert_eq!(reopened.status, TaskStatus::Pending);
        assert_eq!(reopened.admin_comment.as_deref(), Some("redo"));
    }

    #[test]
    fn update_user_refreshes_session_copy() {
        let mut f = fixture();
        let mut me = f.engine.user(ADMIN).unwrap().clone();
        me.name = "Renamed Admin".to_string();
        f.engine.update_user(me, ADMIN).unwrap();
        assert_eq!(
            f.engine.current_user().map(|u| u.name.as_str()),
            Some("Renamed Admin")
        );
    }

    #[test]
    fn update_user_role_is_immutable() {
        let mut f = fixture();
        let mut other = f.engine.user(OWNER).unwrap().clone();
        other.role = Role::Admin;
        let updated = f.engine.update_user(other, ADMIN).unwrap();
        assert_eq!(updated.role, Role::User);
    }

    #[test]
    fn update_user_by_unrelated_user_rejected() {
        let mut f = fixture();
        let admin_profile = f.engine.user(ADMIN).unwrap().clone();
        assert!(matches!(
            f.engine.update_user(admin_profile, OWNER),
            Err(EngineError::Unauthorized(_))
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(16))]

            /// Progress stays within 0..=100 no matter what the caller sends.
            #[test]
            fn progress_always_clamped(input: u8) {
                let mut f = fixture();
                let mut task = f.engine.create_task(draft("p"), OWNER).unwrap();
                task.progress = input;
                let updated = f.engine.update_task(task, OWNER).unwrap();
                prop_assert!(updated.progress <= 100);
            }
        }
    }
}

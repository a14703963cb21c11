//! Policy administration: the write paths the outer API routes into the
//! scheduler core.
//!
//! Edits flag the pending task for execute-date recomputation, journal a
//! field-level revision per change, and nudge the reconciler immediately
//! instead of waiting for the daily sweep.

use std::sync::Arc;

use crate::domain::errors::{codes, DomainError, DomainResult};
use crate::domain::models::{Policy, Revision, RevisionKind, TaskStatus};
use crate::domain::ports::{
    Clock as _, PolicyRepository as _, RevisionRepository, TaskRepository as _,
};

use super::queue::PolicyHandle;
use super::SchedulerContext;

pub struct PolicyAdminService {
    ctx: Arc<SchedulerContext>,
    revisions: Arc<dyn RevisionRepository>,
}

impl PolicyAdminService {
    pub fn new(ctx: Arc<SchedulerContext>, revisions: Arc<dyn RevisionRepository>) -> Self {
        Self { ctx, revisions }
    }

    /// Validate and persist a new policy, then hand it to the reconciler.
    pub async fn create_policy(&self, mut policy: Policy) -> DomainResult<Policy> {
        policy.validate()?;
        let id = self.ctx.policies.create(&policy).await?;
        policy.id = id;

        self.enqueue(policy.id);
        Ok(policy)
    }

    /// Persist an edited policy. The pending task (if any) is flagged so
    /// the reconciler recomputes its date and propagates field changes.
    pub async fn update_policy(&self, updated: Policy, editor: &str) -> DomainResult<Policy> {
        updated.validate()?;

        let current = self
            .ctx
            .policies
            .get(updated.id)
            .await?
            .ok_or(DomainError::PolicyNotFound(updated.id))?;

        // Source and destination bindings are fixed for a policy's lifetime.
        if updated.src_id != current.src_id || updated.dest_id != current.dest_id {
            return Err(DomainError::ValidationFailed(
                "policy source and destination cannot be changed".to_string(),
            ));
        }

        let mut updated = updated;
        updated.editor = editor.to_string();
        self.ctx.policies.save(&updated).await?;

        let flagged = self.ctx.tasks.mark_need_check_execute_date(updated.id).await?;
        tracing::debug!(policy_id = updated.id, flagged, "pending tasks flagged for date recheck");

        for revision in diff_policies(&current, &updated, editor, self.ctx.clock.now()) {
            self.revisions.append(&revision).await?;
        }

        self.enqueue(updated.id);
        Ok(updated)
    }

    /// Delete a policy. Refused while any of its tasks is still running
    /// through the lifecycle; revisions go with the policy.
    pub async fn delete_policy(&self, policy_id: i64) -> DomainResult<()> {
        let open = self
            .ctx
            .tasks
            .count_for_policy_excluding(policy_id, &TaskStatus::TERMINAL)
            .await?;
        if open != 0 {
            return Err(DomainError::ValidationFailed(
                codes::TASK_STATUS_IMMUTABLE.message.to_string(),
            ));
        }
        self.ctx.policies.delete(policy_id).await
    }

    fn enqueue(&self, policy_id: i64) {
        let handle = PolicyHandle::new(policy_id);
        if self.ctx.policy_queue.push(handle) {
            tracing::info!(policy_id, "policy queued for reconciliation");
        } else {
            tracing::debug!(policy_id, "policy already queued");
        }
    }
}

/// Field-level `{field, old, new}` diffs for the revision journal.
fn diff_policies(
    old: &Policy,
    new: &Policy,
    editor: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Vec<Revision> {
    let mut changes: Vec<(&str, String, String)> = Vec::new();
    let mut push = |field: &'static str, old_value: String, new_value: String| {
        if old_value != new_value {
            changes.push((field, old_value, new_value));
        }
    };

    push("name", old.name.clone(), new.name.clone());
    push("description", old.description.clone(), new.description.clone());
    push("enable", old.enable.to_string(), new.enable.to_string());
    push("period", old.period.as_str().to_string(), new.period.as_str().to_string());
    push("day", old.day.to_string(), new.day.to_string());
    push("execute_window", old.execute_window.to_string(), new.execute_window.to_string());
    push("pause", old.pause.to_string(), new.pause.to_string());
    push("rebuild_flag", old.rebuild_flag.to_string(), new.rebuild_flag.to_string());
    push(
        "cleaning_speed",
        old.cleaning_speed.as_str().to_string(),
        new.cleaning_speed.as_str().to_string(),
    );
    push("condition", old.condition.clone(), new.condition.clone());
    push("archive_scope", old.archive_scope.clone(), new.archive_scope.clone());
    push("retain_src_data", old.retain_src_data.to_string(), new.retain_src_data.to_string());
    push(
        "notify_policy",
        old.notify_policy.as_str().to_string(),
        new.notify_policy.as_str().to_string(),
    );
    push("relevant", old.relevant.join(","), new.relevant.join(","));

    changes
        .into_iter()
        .map(|(field, old_value, new_value)| Revision {
            id: 0,
            kind: RevisionKind::Policy,
            entity_id: old.id,
            field: field.to_string(),
            old_value,
            new_value,
            editor: editor.to_string(),
            created_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CleaningSpeed, ExecuteWindow, Govern, NotifyPolicy, Period};
    use chrono::{NaiveTime, Utc};

    fn policy() -> Policy {
        Policy {
            id: 1,
            name: "orders-cleanup".into(),
            description: String::new(),
            bu: "commerce".into(),
            enable: true,
            period: Period::Monthly,
            day: 15,
            execute_window: ExecuteWindow::new(
                NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
            ),
            pause: false,
            rebuild_flag: false,
            cleaning_speed: CleaningSpeed::Balanced,
            src_id: 1,
            govern: Govern::Delete,
            condition: "created_at < now()".into(),
            archive_scope: String::new(),
            retain_src_data: false,
            dest_id: 0,
            relevant: vec!["dba@example.com".into()],
            notify_policy: NotifyPolicy::Always,
            creator: "admin".into(),
            editor: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_diff_captures_changed_fields_only() {
        let old = policy();
        let mut new = policy();
        new.day = 20;
        new.condition = "created_at < now() - interval 30 day".into();

        let revisions = diff_policies(&old, &new, "admin", Utc::now());
        let fields: Vec<&str> = revisions.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, vec!["day", "condition"]);
        assert_eq!(revisions[0].old_value, "15");
        assert_eq!(revisions[0].new_value, "20");
        assert!(revisions.iter().all(|r| r.kind == RevisionKind::Policy && r.entity_id == 1));
    }

    #[test]
    fn test_diff_empty_when_unchanged() {
        let old = policy();
        let new = policy();
        assert!(diff_policies(&old, &new, "admin", Utc::now()).is_empty());
    }
}

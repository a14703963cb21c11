//! Policy domain model: a user-authored recurring intent to govern rows of
//! a source table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{codes, DomainError, DomainResult};

use super::exec_window::ExecuteWindow;
use super::schedule::Period;

/// The physical governance action a policy requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Govern {
    Truncate,
    Delete,
    BackupDelete,
    Archive,
    Rebuild,
}

impl Govern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Truncate => "truncate",
            Self::Delete => "delete",
            Self::BackupDelete => "backup-delete",
            Self::Archive => "archive",
            Self::Rebuild => "rebuild",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "truncate" => Some(Self::Truncate),
            "delete" => Some(Self::Delete),
            "backup-delete" => Some(Self::BackupDelete),
            "archive" => Some(Self::Archive),
            "rebuild" => Some(Self::Rebuild),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Truncate => "truncate data",
            Self::Delete => "delete data",
            Self::BackupDelete => "backup then delete",
            Self::Archive => "archive data",
            Self::Rebuild => "rebuild tables",
        }
    }
}

/// How aggressively the workflow driver should clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningSpeed {
    Steady,
    Balanced,
    Swift,
}

impl Default for CleaningSpeed {
    fn default() -> Self {
        Self::Balanced
    }
}

impl CleaningSpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Steady => "steady",
            Self::Balanced => "balanced",
            Self::Swift => "swift",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "steady" => Some(Self::Steady),
            "balanced" => Some(Self::Balanced),
            "swift" => Some(Self::Swift),
            _ => None,
        }
    }
}

/// When subscribers are notified about a task transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    Silence,
    Success,
    Failed,
    Always,
}

impl Default for NotifyPolicy {
    fn default() -> Self {
        Self::Always
    }
}

impl NotifyPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silence => "silence",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Always => "always",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "silence" => Some(Self::Silence),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "always" => Some(Self::Always),
            _ => None,
        }
    }
}

/// A recurring data-governance intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub bu: String,
    pub enable: bool,

    // -- Schedule --
    pub period: Period,
    /// Day of month, meaningful only for month-granular periods.
    pub day: u32,
    pub execute_window: ExecuteWindow,
    /// Outside the window: true = hold the workflow, false = drop it.
    pub pause: bool,
    pub rebuild_flag: bool,
    pub cleaning_speed: CleaningSpeed,

    // -- Source / action --
    pub src_id: i64,
    pub govern: Govern,
    pub condition: String,
    /// Column list to archive, archive governance only.
    pub archive_scope: String,
    pub retain_src_data: bool,

    // -- Destination --
    pub dest_id: i64,

    // -- Subscribers --
    pub relevant: Vec<String>,
    pub notify_policy: NotifyPolicy,

    // -- Audit --
    pub creator: String,
    pub editor: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Policy {
    /// Field-level validation applied before persisting user input.
    pub fn validate(&self) -> DomainResult<()> {
        if self.period.is_monthly_or_longer() && !(1..=31).contains(&self.day) {
            return Err(DomainError::ValidationFailed(codes::POLICY_DAY_ERR.message.to_string()));
        }
        if self.govern == Govern::Delete && self.condition.trim().is_empty() {
            return Err(DomainError::ValidationFailed(codes::POLICY_NEED_CONDITION.message.to_string()));
        }
        if self.govern == Govern::Archive && self.dest_id <= 0 {
            return Err(DomainError::ValidationFailed(
                "archive governance requires a destination".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn policy(period: Period, day: u32, govern: Govern) -> Policy {
        Policy {
            id: 1,
            name: "orders-cleanup".into(),
            description: String::new(),
            bu: "commerce".into(),
            enable: true,
            period,
            day,
            execute_window: ExecuteWindow::new(
                NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
            ),
            pause: false,
            rebuild_flag: false,
            cleaning_speed: CleaningSpeed::Balanced,
            src_id: 1,
            govern,
            condition: "created_at < now() - interval 90 day".into(),
            archive_scope: String::new(),
            retain_src_data: false,
            dest_id: 0,
            relevant: vec![],
            notify_policy: NotifyPolicy::Always,
            creator: "admin".into(),
            editor: "admin".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_day_range_for_monthly() {
        let mut p = policy(Period::Monthly, 0, Govern::Delete);
        assert!(p.validate().is_err());
        p.day = 15;
        assert!(p.validate().is_ok());
        p.day = 32;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_day_irrelevant_for_short_periods() {
        let p = policy(Period::Weekly, 0, Govern::Delete);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_delete_requires_condition() {
        let mut p = policy(Period::Monthly, 15, Govern::Delete);
        p.condition = "  ".into();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_archive_requires_destination() {
        let mut p = policy(Period::Monthly, 15, Govern::Archive);
        assert!(p.validate().is_err());
        p.dest_id = 7;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_enum_round_trips() {
        assert_eq!(Govern::from_str("backup-delete"), Some(Govern::BackupDelete));
        assert_eq!(CleaningSpeed::from_str("swift"), Some(CleaningSpeed::Swift));
        assert_eq!(NotifyPolicy::from_str("silence"), Some(NotifyPolicy::Silence));
        assert_eq!(Govern::from_str("drop"), None);
    }
}

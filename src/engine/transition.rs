use chrono::Utc;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::PgConnection;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::authority::Role;
use crate::config::AppConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{File, FileWorkflowLevel};
use crate::schema::{file_workflow_levels, files, user_department_roles};

use super::audit;

/// File lifecycle states. REJECTED and ARCHIVED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Draft,
    InReview,
    Returned,
    Cabinet,
    Approved,
    Rejected,
    Archived,
}

impl FileState {
    pub fn as_str(self) -> &'static str {
        match self {
            FileState::Draft => "DRAFT",
            FileState::InReview => "IN_REVIEW",
            FileState::Returned => "RETURNED",
            FileState::Cabinet => "CABINET",
            FileState::Approved => "APPROVED",
            FileState::Rejected => "REJECTED",
            FileState::Archived => "ARCHIVED",
        }
    }

    pub fn from_name(name: &str) -> Option<FileState> {
        const ALL: [FileState; 7] = [
            FileState::Draft,
            FileState::InReview,
            FileState::Returned,
            FileState::Cabinet,
            FileState::Approved,
            FileState::Rejected,
            FileState::Archived,
        ];
        ALL.iter().copied().find(|state| state.as_str() == name)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FileState::Rejected | FileState::Archived)
    }
}

/// Status of one per-file workflow level row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelStatus {
    Pending,
    Active,
    Completed,
    Skipped,
    Returned,
}

impl LevelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LevelStatus::Pending => "PENDING",
            LevelStatus::Active => "ACTIVE",
            LevelStatus::Completed => "COMPLETED",
            LevelStatus::Skipped => "SKIPPED",
            LevelStatus::Returned => "RETURNED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowAction {
    SaveDraft,
    Submit,
    Approve,
    Return,
    Resubmit,
    Hold,
    Resume,
    Reject,
    Archive,
}

impl WorkflowAction {
    pub const ALL: [WorkflowAction; 9] = [
        WorkflowAction::SaveDraft,
        WorkflowAction::Submit,
        WorkflowAction::Approve,
        WorkflowAction::Return,
        WorkflowAction::Resubmit,
        WorkflowAction::Hold,
        WorkflowAction::Resume,
        WorkflowAction::Reject,
        WorkflowAction::Archive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowAction::SaveDraft => "SAVE_DRAFT",
            WorkflowAction::Submit => "SUBMIT",
            WorkflowAction::Approve => "APPROVE",
            WorkflowAction::Return => "RETURN",
            WorkflowAction::Resubmit => "RESUBMIT",
            WorkflowAction::Hold => "HOLD",
            WorkflowAction::Resume => "RESUME",
            WorkflowAction::Reject => "REJECT",
            WorkflowAction::Archive => "ARCHIVE",
        }
    }

    pub fn from_name(name: &str) -> EngineResult<WorkflowAction> {
        WorkflowAction::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == name)
            .ok_or_else(|| EngineError::UnknownAction(name.to_string()))
    }

    /// Approval-chain actions additionally append a participant record.
    pub fn records_participant(self) -> bool {
        matches!(
            self,
            WorkflowAction::Approve
                | WorkflowAction::Return
                | WorkflowAction::Reject
                | WorkflowAction::Hold
                | WorkflowAction::Resume
        )
    }
}

/// Actions legal in each state. The legality check and the allowed-actions
/// query both read from this single table.
pub fn legal_actions(state: FileState) -> &'static [WorkflowAction] {
    match state {
        FileState::Draft => &[WorkflowAction::SaveDraft, WorkflowAction::Submit],
        FileState::InReview => &[
            WorkflowAction::Approve,
            WorkflowAction::Return,
            WorkflowAction::Hold,
            WorkflowAction::Reject,
        ],
        FileState::Returned => &[WorkflowAction::Resubmit],
        FileState::Cabinet => &[WorkflowAction::Resume],
        FileState::Approved => &[WorkflowAction::Archive],
        FileState::Rejected | FileState::Archived => &[],
    }
}

pub fn load_file(conn: &mut PgConnection, file_id: Uuid) -> EngineResult<File> {
    files::table
        .find(file_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| EngineError::NotFound(format!("file {file_id}")))
}

pub(crate) fn file_state(file: &File) -> EngineResult<FileState> {
    FileState::from_name(&file.current_state).ok_or_else(|| {
        EngineError::Internal(format!(
            "file {} carries unrecognized state {}",
            file.id, file.current_state
        ))
    })
}

pub(crate) fn active_level(
    conn: &mut PgConnection,
    file_id: Uuid,
) -> EngineResult<Option<FileWorkflowLevel>> {
    Ok(file_workflow_levels::table
        .filter(file_workflow_levels::file_id.eq(file_id))
        .filter(file_workflow_levels::status.eq(LevelStatus::Active.as_str()))
        .first(conn)
        .optional()?)
}

fn has_department_role(
    conn: &mut PgConnection,
    user_id: Uuid,
    department_id: Uuid,
    role: &str,
) -> EngineResult<bool> {
    Ok(diesel::select(exists(
        user_department_roles::table
            .filter(user_department_roles::user_id.eq(user_id))
            .filter(user_department_roles::department_id.eq(department_id))
            .filter(user_department_roles::role.eq(role)),
    ))
    .get_result(conn)?)
}

/// Authorization predicate shared by `execute` and the allowed-actions query
/// so that what is shown as available never drifts from what is accepted.
///
/// Creator-only actions compare against `created_by`; role-gated actions
/// require the caller to hold, in the file's department, the exact role of
/// the current active level. ARCHIVE closes the file and is open to the
/// creator or a department Admin.
pub(crate) fn authorize(
    conn: &mut PgConnection,
    file: &File,
    caller_id: Uuid,
    action: WorkflowAction,
) -> EngineResult<()> {
    match action {
        WorkflowAction::SaveDraft | WorkflowAction::Submit | WorkflowAction::Resubmit => {
            if file.created_by == caller_id {
                Ok(())
            } else {
                Err(EngineError::Forbidden(format!(
                    "only the creator of file {} may {}",
                    file.file_number,
                    action.as_str()
                )))
            }
        }
        WorkflowAction::Archive => {
            if file.created_by == caller_id
                || has_department_role(conn, caller_id, file.department_id, Role::Admin.as_str())?
            {
                Ok(())
            } else {
                Err(EngineError::Forbidden(format!(
                    "only the creator or a department admin may archive file {}",
                    file.file_number
                )))
            }
        }
        WorkflowAction::Approve
        | WorkflowAction::Return
        | WorkflowAction::Hold
        | WorkflowAction::Resume
        | WorkflowAction::Reject => {
            let level = active_level(conn, file.id)?.ok_or_else(|| {
                EngineError::Internal(format!(
                    "file {} has no active workflow level",
                    file.file_number
                ))
            })?;
            if has_department_role(conn, caller_id, file.department_id, &level.role_required)? {
                Ok(())
            } else {
                Err(EngineError::Forbidden(format!(
                    "caller does not hold role {} in the file's department",
                    level.role_required
                )))
            }
        }
    }
}

/// First level still pending, in chain order.
fn first_pending(levels: &[FileWorkflowLevel]) -> Option<i32> {
    levels
        .iter()
        .find(|row| row.status == LevelStatus::Pending.as_str())
        .map(|row| row.level)
}

/// Next pending level strictly above `after`, in chain order. Skipped levels
/// are passed over because they were never marked pending.
fn next_pending(levels: &[FileWorkflowLevel], after: i32) -> Option<i32> {
    levels
        .iter()
        .find(|row| row.level > after && row.status == LevelStatus::Pending.as_str())
        .map(|row| row.level)
}

fn load_levels(conn: &mut PgConnection, file_id: Uuid) -> EngineResult<Vec<FileWorkflowLevel>> {
    Ok(file_workflow_levels::table
        .filter(file_workflow_levels::file_id.eq(file_id))
        .order(file_workflow_levels::level.asc())
        .load(conn)?)
}

fn set_level_status(
    conn: &mut PgConnection,
    file_id: Uuid,
    level: i32,
    status: LevelStatus,
) -> EngineResult<()> {
    diesel::update(
        file_workflow_levels::table
            .filter(file_workflow_levels::file_id.eq(file_id))
            .filter(file_workflow_levels::level.eq(level)),
    )
    .set(file_workflow_levels::status.eq(status.as_str()))
    .execute(conn)?;
    Ok(())
}

fn complete_level(
    conn: &mut PgConnection,
    file_id: Uuid,
    level: i32,
    completed_by: Uuid,
    remarks: Option<&str>,
) -> EngineResult<()> {
    diesel::update(
        file_workflow_levels::table
            .filter(file_workflow_levels::file_id.eq(file_id))
            .filter(file_workflow_levels::level.eq(level)),
    )
    .set((
        file_workflow_levels::status.eq(LevelStatus::Completed.as_str()),
        file_workflow_levels::completed_by.eq(Some(completed_by)),
        file_workflow_levels::completed_at.eq(Some(Utc::now().naive_utc())),
        file_workflow_levels::remarks.eq(remarks),
    ))
    .execute(conn)?;
    Ok(())
}

/// Apply one workflow action to a file.
///
/// The file row is locked with `SELECT ... FOR UPDATE` for the duration of
/// the transaction; legality and authorization are validated against the
/// locked row, never a stale read. Level rows are reconciled with the file's
/// {state, level} in the same transaction, and a participant row (for
/// approval-chain actions) plus an audit row (always) are appended before
/// commit. Any failure rolls the whole unit of work back.
pub fn execute(
    conn: &mut PgConnection,
    config: &AppConfig,
    file_id: Uuid,
    caller_id: Uuid,
    action: WorkflowAction,
    remarks: Option<String>,
    origin_ip: Option<String>,
) -> EngineResult<File> {
    conn.transaction::<File, EngineError, _>(|conn| {
        if let Some(timeout_ms) = config.workflow_lock_timeout_ms {
            diesel::sql_query(format!("SET LOCAL lock_timeout = {timeout_ms}")).execute(conn)?;
        }

        let file: File = files::table
            .find(file_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| EngineError::NotFound(format!("file {file_id}")))?;

        let state = file_state(&file)?;
        if !legal_actions(state).contains(&action) {
            return Err(EngineError::IllegalTransition {
                action: action.as_str().to_string(),
                state: state.as_str().to_string(),
            });
        }

        authorize(conn, &file, caller_id, action)?;

        let levels = load_levels(conn, file.id)?;
        let mut auto_approved = false;
        let acting_level = file.current_level;
        let acting_role = levels
            .iter()
            .find(|row| row.level == acting_level)
            .map(|row| row.role_required.clone());

        let (next_state, next_level) = match action {
            WorkflowAction::SaveDraft => (state, file.current_level),
            WorkflowAction::Submit => match first_pending(&levels) {
                Some(first) => {
                    set_level_status(conn, file.id, first, LevelStatus::Active)?;
                    (FileState::InReview, first)
                }
                None => {
                    // Creator authority skipped every level; nothing to review.
                    auto_approved = true;
                    (FileState::Approved, file.max_levels)
                }
            },
            WorkflowAction::Approve => {
                complete_level(conn, file.id, file.current_level, caller_id, remarks.as_deref())?;
                match next_pending(&levels, file.current_level) {
                    Some(next) => {
                        set_level_status(conn, file.id, next, LevelStatus::Active)?;
                        (FileState::InReview, next)
                    }
                    None => (FileState::Approved, file.current_level),
                }
            }
            WorkflowAction::Return => {
                set_level_status(conn, file.id, file.current_level, LevelStatus::Returned)?;
                (FileState::Returned, file.current_level)
            }
            WorkflowAction::Resubmit => {
                set_level_status(conn, file.id, file.current_level, LevelStatus::Active)?;
                (FileState::InReview, file.current_level)
            }
            WorkflowAction::Hold => (FileState::Cabinet, file.current_level),
            WorkflowAction::Resume => (FileState::InReview, file.current_level),
            WorkflowAction::Reject => {
                complete_level(conn, file.id, file.current_level, caller_id, remarks.as_deref())?;
                (FileState::Rejected, file.current_level)
            }
            WorkflowAction::Archive => (FileState::Archived, file.current_level),
        };

        diesel::update(files::table.find(file.id))
            .set((
                files::current_state.eq(next_state.as_str()),
                files::current_level.eq(next_level),
                files::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;

        if action.records_participant() {
            audit::record_participant(
                conn,
                file.id,
                acting_level,
                acting_role.as_deref().unwrap_or(""),
                action.as_str(),
                caller_id,
                remarks.as_deref(),
            )?;
        }

        let details = if auto_approved {
            "auto-approved: creator authority exceeds all approval levels".to_string()
        } else {
            format!(
                "{}: {} -> {}",
                action.as_str(),
                state.as_str(),
                next_state.as_str()
            )
        };
        audit::record_audit(
            conn,
            file.id,
            action.as_str(),
            caller_id,
            &details,
            json!({
                "from_state": state.as_str(),
                "to_state": next_state.as_str(),
                "from_level": file.current_level,
                "to_level": next_level,
                "auto_approved": auto_approved,
                "remarks": remarks,
            }),
            origin_ip.as_deref(),
        )?;

        info!(
            file = %file.file_number,
            action = action.as_str(),
            from_state = state.as_str(),
            to_state = next_state.as_str(),
            level = next_level,
            "workflow transition applied"
        );

        Ok(files::table.find(file.id).first(conn)?)
    })
}

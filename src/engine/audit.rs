use diesel::prelude::*;
use diesel::PgConnection;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{
    FileAuditEntry, FileWorkflowParticipant, NewFileAuditEntry, NewFileWorkflowParticipant,
};
use crate::schema::{file_audit_trail, file_workflow_participants};

/// Append one audit trail entry. Audit rows are written inside the same
/// transaction as the state change they describe and are never updated or
/// deleted afterwards; the file row stays the source of truth.
pub fn record_audit(
    conn: &mut PgConnection,
    file_id: Uuid,
    action: &str,
    performed_by: Uuid,
    details: &str,
    metadata: serde_json::Value,
    origin_ip: Option<&str>,
) -> EngineResult<()> {
    let entry = NewFileAuditEntry {
        id: Uuid::new_v4(),
        file_id,
        action: action.to_string(),
        performed_by,
        details: details.to_string(),
        metadata,
        origin_ip: origin_ip.map(str::to_string),
    };
    diesel::insert_into(file_audit_trail::table)
        .values(&entry)
        .execute(conn)?;
    Ok(())
}

/// Append one participant record for an approval-chain action.
pub fn record_participant(
    conn: &mut PgConnection,
    file_id: Uuid,
    level: i32,
    role: &str,
    action: &str,
    acted_by: Uuid,
    remarks: Option<&str>,
) -> EngineResult<()> {
    let participant = NewFileWorkflowParticipant {
        id: Uuid::new_v4(),
        file_id,
        level,
        role: role.to_string(),
        action: action.to_string(),
        acted_by,
        remarks: remarks.map(str::to_string),
    };
    diesel::insert_into(file_workflow_participants::table)
        .values(&participant)
        .execute(conn)?;
    Ok(())
}

#[derive(Debug)]
pub struct FileHistory {
    pub audit: Vec<FileAuditEntry>,
    pub participants: Vec<FileWorkflowParticipant>,
}

/// Ordered read of a file's append-only history. The engine only ever writes
/// this data; collaborators read it.
pub fn file_history(conn: &mut PgConnection, file_id: Uuid) -> EngineResult<FileHistory> {
    let audit = file_audit_trail::table
        .filter(file_audit_trail::file_id.eq(file_id))
        .order(file_audit_trail::seq.asc())
        .load(conn)?;
    let participants = file_workflow_participants::table
        .filter(file_workflow_participants::file_id.eq(file_id))
        .order(file_workflow_participants::acted_at.asc())
        .load(conn)?;
    Ok(FileHistory {
        audit,
        participants,
    })
}

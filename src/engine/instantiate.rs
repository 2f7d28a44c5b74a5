use chrono::{Datelike, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::authority::authority_of_name;
use crate::config::AppConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{Department, File, NewFile, NewFileWorkflowLevel, TemplateLevel, User};
use crate::schema::{departments, file_workflow_levels, files, user_department_roles, users};

use super::audit;
use super::selector::{self, ResolvedTemplate};
use super::transition::LevelStatus;

/// The creator's authority in the target department and the role that
/// produced it. With several roles the maximum wins; the contributing role is
/// recorded as the driving role.
#[derive(Debug, Clone)]
pub struct EffectiveAuthority {
    pub role: Option<String>,
    pub authority: i32,
}

pub fn effective_authority(
    conn: &mut PgConnection,
    user_id: Uuid,
    department_id: Uuid,
) -> EngineResult<EffectiveAuthority> {
    let roles: Vec<String> = user_department_roles::table
        .filter(user_department_roles::user_id.eq(user_id))
        .filter(user_department_roles::department_id.eq(department_id))
        .select(user_department_roles::role)
        .load(conn)?;

    let mut best = EffectiveAuthority {
        role: None,
        authority: 0,
    };
    for role in roles {
        let authority = authority_of_name(&role);
        if best.role.is_none() || authority > best.authority {
            best = EffectiveAuthority {
                role: Some(role),
                authority,
            };
        }
    }
    Ok(best)
}

/// One pre-computed per-file level decision.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedLevel {
    pub level: i32,
    pub role_required: String,
    pub authority_required: i32,
    pub description: String,
    pub skipped: bool,
    pub skip_reason: Option<String>,
}

/// Authority-based skip computation. A level is skipped when the creator's
/// authority meets or exceeds the level's requirement; the first non-skipped
/// level becomes active on submit.
pub fn plan_levels(levels: &[TemplateLevel], creator_authority: i32) -> Vec<PlannedLevel> {
    levels
        .iter()
        .map(|level| {
            let skipped = creator_authority >= level.authority_required;
            PlannedLevel {
                level: level.level,
                role_required: level.role_required.clone(),
                authority_required: level.authority_required,
                description: level.description.clone(),
                skipped,
                skip_reason: skipped.then(|| {
                    format!(
                        "creator authority {} meets level requirement {}",
                        creator_authority, level.authority_required
                    )
                }),
            }
        })
        .collect()
}

/// True when the planned chain leaves nothing to review; submitting such a
/// file approves it immediately. Vacuously true for a template with no
/// levels, mirroring what SUBMIT does with an empty chain.
pub fn auto_approves(plan: &[PlannedLevel]) -> bool {
    plan.iter().all(|level| level.skipped)
}

#[derive(Debug, Serialize)]
pub struct WorkflowPreview {
    pub template_id: Uuid,
    pub template_name: String,
    pub scope: selector::ScopeReason,
    pub selection_reason: String,
    pub creator_role: Option<String>,
    pub creator_authority: i32,
    pub levels: Vec<PlannedLevel>,
    /// True when every level is skipped; submitting such a file approves it
    /// immediately.
    pub auto_approve: bool,
}

/// Same resolution and skip computation as file creation, persisting nothing.
pub fn preview_workflow(
    conn: &mut PgConnection,
    department_id: Uuid,
    document_type: Option<&str>,
    user_id: Uuid,
) -> EngineResult<WorkflowPreview> {
    let resolved = selector::resolve_template(conn, department_id, document_type)?;
    let authority = effective_authority(conn, user_id, department_id)?;
    let levels = plan_levels(&resolved.levels, authority.authority);
    let auto_approve = auto_approves(&levels);

    Ok(WorkflowPreview {
        template_id: resolved.template.id,
        template_name: resolved.template.name,
        scope: resolved.scope,
        selection_reason: resolved.selection_reason,
        creator_role: authority.role,
        creator_authority: authority.authority,
        levels,
        auto_approve,
    })
}

#[derive(Debug, Clone)]
pub struct CreateFileRequest {
    pub title: String,
    pub department_id: Uuid,
    pub document_type: String,
    pub priority: String,
    pub created_by: Uuid,
    pub origin_ip: Option<String>,
}

/// Create a file and lock in its approval chain, all in one transaction:
/// template selection, file-number generation, level instantiation, and the
/// creation/instantiation audit entries. The file starts in DRAFT at level 0.
pub fn create_file(
    conn: &mut PgConnection,
    config: &AppConfig,
    request: CreateFileRequest,
) -> EngineResult<File> {
    conn.transaction::<File, EngineError, _>(|conn| {
        let department: Department = departments::table
            .find(request.department_id)
            .first(conn)
            .optional()?
            .ok_or_else(|| {
                EngineError::NotFound(format!("department {}", request.department_id))
            })?;
        let creator: User = users::table
            .find(request.created_by)
            .first(conn)
            .optional()?
            .ok_or_else(|| EngineError::NotFound(format!("user {}", request.created_by)))?;
        if !creator.is_active {
            return Err(EngineError::Forbidden(format!(
                "user {} is inactive",
                creator.email
            )));
        }

        let resolved =
            selector::resolve_template(conn, department.id, Some(&request.document_type))?;
        let authority = effective_authority(conn, creator.id, department.id)?;
        let plan = plan_levels(&resolved.levels, authority.authority);

        let file_number =
            next_file_number(conn, &department, config.file_number_sequence_width)?;
        let new_file = NewFile {
            id: Uuid::new_v4(),
            file_number,
            title: request.title.clone(),
            department_id: department.id,
            document_type: request.document_type.clone(),
            priority: request.priority.clone(),
            created_by: creator.id,
            workflow_template_id: resolved.template.id,
            creator_authority_level: authority.authority,
            current_state: "DRAFT".to_string(),
            current_level: 0,
            max_levels: plan.len() as i32,
            workflow_selection_reason: resolved.selection_reason.clone(),
        };
        diesel::insert_into(files::table)
            .values(&new_file)
            .execute(conn)?;
        let file: File = files::table.find(new_file.id).first(conn)?;

        audit::record_audit(
            conn,
            file.id,
            "CREATE",
            creator.id,
            &format!("file {} created in DRAFT", file.file_number),
            json!({
                "title": request.title,
                "document_type": request.document_type,
                "priority": request.priority,
            }),
            request.origin_ip.as_deref(),
        )?;

        instantiate(conn, &file, &resolved, &plan, &authority, request.origin_ip.as_deref())?;

        Ok(files::table.find(file.id).first(conn)?)
    })
}

/// Materialize the per-file level rows from the resolved template and record
/// the full selection decision in the audit trail. Runs inside the caller's
/// transaction so the audit entry can never diverge from the live rows.
pub fn instantiate(
    conn: &mut PgConnection,
    file: &File,
    resolved: &ResolvedTemplate,
    plan: &[PlannedLevel],
    authority: &EffectiveAuthority,
    origin_ip: Option<&str>,
) -> EngineResult<()> {
    for planned in plan {
        let status = if planned.skipped {
            LevelStatus::Skipped
        } else {
            LevelStatus::Pending
        };
        let row = NewFileWorkflowLevel {
            id: Uuid::new_v4(),
            file_id: file.id,
            level: planned.level,
            role_required: planned.role_required.clone(),
            authority_required: planned.authority_required,
            description: planned.description.clone(),
            status: status.as_str().to_string(),
            skip_reason: planned.skip_reason.clone(),
        };
        diesel::insert_into(file_workflow_levels::table)
            .values(&row)
            .execute(conn)?;
    }

    diesel::update(files::table.find(file.id))
        .set((
            files::max_levels.eq(plan.len() as i32),
            files::creator_authority_level.eq(authority.authority),
            files::workflow_selection_reason.eq(&resolved.selection_reason),
        ))
        .execute(conn)?;

    audit::record_audit(
        conn,
        file.id,
        "WORKFLOW_INSTANTIATED",
        file.created_by,
        &resolved.selection_reason,
        json!({
            "template_id": resolved.template.id,
            "template_name": resolved.template.name,
            "scope": resolved.scope,
            "creator_role": authority.role,
            "creator_authority": authority.authority,
            "levels": plan,
        }),
        origin_ip,
    )?;

    info!(
        file = %file.file_number,
        template = %resolved.template.name,
        tier = resolved.scope.as_str(),
        levels = plan.len(),
        skipped = plan.iter().filter(|level| level.skipped).count(),
        "workflow instantiated"
    );

    Ok(())
}

/// Next file number for the department: `<prefix>/<year>/<sequence>`, the
/// sequence counting per department and year, zero-padded to the configured
/// width. The department row is locked first so concurrent creations in the
/// same department serialize on the sequence instead of colliding on the
/// unique file number.
fn next_file_number(
    conn: &mut PgConnection,
    department: &Department,
    width: usize,
) -> EngineResult<String> {
    let _locked: Department = departments::table
        .find(department.id)
        .for_update()
        .first(conn)?;

    let year = Utc::now().year();
    let prefix = format!("{}/{}/", department.file_number_prefix, year);
    let existing: i64 = files::table
        .filter(files::department_id.eq(department.id))
        .filter(files::file_number.like(format!("{prefix}%")))
        .count()
        .get_result(conn)?;
    Ok(format!("{}{:0width$}", prefix, existing + 1, width = width))
}

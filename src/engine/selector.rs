use diesel::prelude::*;
use diesel::PgConnection;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{TemplateLevel, WorkflowTemplate};
use crate::schema::{workflow_template_levels, workflow_templates};

/// Which resolution tier produced the chosen template. Recorded on the file
/// and in the audit trail for compliance logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeReason {
    DepartmentDocumentType,
    DepartmentDefault,
    GlobalDefault,
}

impl ScopeReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeReason::DepartmentDocumentType => "department+document-type",
            ScopeReason::DepartmentDefault => "department default",
            ScopeReason::GlobalDefault => "global default",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    pub template: WorkflowTemplate,
    pub levels: Vec<TemplateLevel>,
    pub scope: ScopeReason,
    pub selection_reason: String,
}

/// Pick the single workflow template governing files of this department and
/// document type. Resolution tiers, first match wins:
///
/// 1. active template bound to (department, document type)
/// 2. active template bound to the department with no document type
/// 3. active global default
///
/// More than one candidate at the winning tier is a configuration conflict:
/// file creation is blocked rather than silently picking one, since a silent
/// pick would make approval chains non-reproducible.
pub fn resolve_template(
    conn: &mut PgConnection,
    department_id: Uuid,
    document_type: Option<&str>,
) -> EngineResult<ResolvedTemplate> {
    let type_specific: Vec<WorkflowTemplate> = match document_type {
        Some(doc_type) => workflow_templates::table
            .filter(workflow_templates::is_active.eq(true))
            .filter(workflow_templates::department_id.eq(Some(department_id)))
            .filter(workflow_templates::document_type.eq(Some(doc_type)))
            .load(conn)?,
        None => Vec::new(),
    };

    let department_default: Vec<WorkflowTemplate> = workflow_templates::table
        .filter(workflow_templates::is_active.eq(true))
        .filter(workflow_templates::department_id.eq(Some(department_id)))
        .filter(workflow_templates::document_type.is_null())
        .load(conn)?;

    let global_default: Vec<WorkflowTemplate> = workflow_templates::table
        .filter(workflow_templates::is_active.eq(true))
        .filter(workflow_templates::department_id.is_null())
        .filter(workflow_templates::is_default.eq(true))
        .load(conn)?;

    let (template, scope) = arbitrate(
        department_id,
        document_type,
        [
            (ScopeReason::DepartmentDocumentType, type_specific),
            (ScopeReason::DepartmentDefault, department_default),
            (ScopeReason::GlobalDefault, global_default),
        ],
    )?;

    let levels: Vec<TemplateLevel> = workflow_template_levels::table
        .filter(workflow_template_levels::template_id.eq(template.id))
        .order(workflow_template_levels::level.asc())
        .load(conn)?;

    let selection_reason = format!(
        "template '{}' ({}) selected via {} tier for department {}, document type {}",
        template.name,
        template.id,
        scope.as_str(),
        department_id,
        document_type.unwrap_or("<none>"),
    );
    debug!(
        template_id = %template.id,
        tier = scope.as_str(),
        levels = levels.len(),
        "resolved workflow template"
    );

    Ok(ResolvedTemplate {
        template,
        levels,
        scope,
        selection_reason,
    })
}

/// Tier arbitration over pre-fetched candidate lists. Pure so the zero/one/
/// many cases are testable without a database.
fn arbitrate(
    department_id: Uuid,
    document_type: Option<&str>,
    tiers: [(ScopeReason, Vec<WorkflowTemplate>); 3],
) -> EngineResult<(WorkflowTemplate, ScopeReason)> {
    for (scope, mut candidates) in tiers {
        match candidates.len() {
            0 => continue,
            1 => return Ok((candidates.remove(0), scope)),
            many => {
                return Err(EngineError::ConfigurationConflict {
                    department_id,
                    document_type: document_type.map(str::to_string),
                    tier: scope.as_str().to_string(),
                    candidates: many,
                })
            }
        }
    }

    Err(EngineError::NoWorkflowConfigured {
        department_id,
        document_type: document_type.map(str::to_string),
    })
}

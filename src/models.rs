use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = departments)]
pub struct Department {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub file_number_prefix: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = departments)]
pub struct NewDepartment {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub file_number_prefix: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Associations)]
#[diesel(table_name = user_department_roles)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Department))]
#[diesel(primary_key(user_id, department_id, role))]
pub struct UserDepartmentRole {
    pub user_id: Uuid,
    pub department_id: Uuid,
    pub role: String,
    pub assigned_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_department_roles)]
pub struct NewUserDepartmentRole {
    pub user_id: Uuid,
    pub department_id: Uuid,
    pub role: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = workflow_templates)]
pub struct WorkflowTemplate {
    pub id: Uuid,
    pub name: String,
    pub department_id: Option<Uuid>,
    pub document_type: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = workflow_templates)]
pub struct NewWorkflowTemplate {
    pub id: Uuid,
    pub name: String,
    pub department_id: Option<Uuid>,
    pub document_type: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = workflow_template_levels)]
#[diesel(belongs_to(WorkflowTemplate, foreign_key = template_id))]
pub struct TemplateLevel {
    pub id: Uuid,
    pub template_id: Uuid,
    pub level: i32,
    pub role_required: String,
    pub authority_required: i32,
    pub description: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = workflow_template_levels)]
pub struct NewTemplateLevel {
    pub id: Uuid,
    pub template_id: Uuid,
    pub level: i32,
    pub role_required: String,
    pub authority_required: i32,
    pub description: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = files)]
#[diesel(belongs_to(Department))]
pub struct File {
    pub id: Uuid,
    pub file_number: String,
    pub title: String,
    pub department_id: Uuid,
    pub document_type: String,
    pub priority: String,
    pub created_by: Uuid,
    pub workflow_template_id: Uuid,
    pub creator_authority_level: i32,
    pub current_state: String,
    pub current_level: i32,
    pub max_levels: i32,
    pub workflow_selection_reason: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = files)]
pub struct NewFile {
    pub id: Uuid,
    pub file_number: String,
    pub title: String,
    pub department_id: Uuid,
    pub document_type: String,
    pub priority: String,
    pub created_by: Uuid,
    pub workflow_template_id: Uuid,
    pub creator_authority_level: i32,
    pub current_state: String,
    pub current_level: i32,
    pub max_levels: i32,
    pub workflow_selection_reason: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = file_workflow_levels)]
#[diesel(belongs_to(File))]
pub struct FileWorkflowLevel {
    pub id: Uuid,
    pub file_id: Uuid,
    pub level: i32,
    pub role_required: String,
    pub authority_required: i32,
    pub description: String,
    pub status: String,
    pub skip_reason: Option<String>,
    pub completed_by: Option<Uuid>,
    pub completed_at: Option<NaiveDateTime>,
    pub remarks: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = file_workflow_levels)]
pub struct NewFileWorkflowLevel {
    pub id: Uuid,
    pub file_id: Uuid,
    pub level: i32,
    pub role_required: String,
    pub authority_required: i32,
    pub description: String,
    pub status: String,
    pub skip_reason: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = file_workflow_participants)]
#[diesel(belongs_to(File))]
pub struct FileWorkflowParticipant {
    pub id: Uuid,
    pub file_id: Uuid,
    pub level: i32,
    pub role: String,
    pub action: String,
    pub acted_by: Uuid,
    pub acted_at: NaiveDateTime,
    pub remarks: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = file_workflow_participants)]
pub struct NewFileWorkflowParticipant {
    pub id: Uuid,
    pub file_id: Uuid,
    pub level: i32,
    pub role: String,
    pub action: String,
    pub acted_by: Uuid,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = file_audit_trail)]
#[diesel(belongs_to(File))]
pub struct FileAuditEntry {
    pub id: Uuid,
    pub file_id: Uuid,
    pub action: String,
    pub performed_by: Uuid,
    pub performed_at: NaiveDateTime,
    pub details: String,
    pub metadata: serde_json::Value,
    pub origin_ip: Option<String>,
    pub seq: i64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = file_audit_trail)]
pub struct NewFileAuditEntry {
    pub id: Uuid,
    pub file_id: Uuid,
    pub action: String,
    pub performed_by: Uuid,
    pub details: String,
    pub metadata: serde_json::Value,
    pub origin_ip: Option<String>,
}

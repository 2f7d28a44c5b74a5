use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    db::PgPool,
    error::{EngineError, EngineResult},
    models::File,
};

pub mod actions;
pub mod audit;
pub mod instantiate;
pub mod selector;
pub mod transition;

pub use actions::allowed_actions;
pub use audit::{file_history, FileHistory};
pub use instantiate::{auto_approves, plan_levels, CreateFileRequest, PlannedLevel, WorkflowPreview};
pub use selector::{ResolvedTemplate, ScopeReason};
pub use transition::{FileState, LevelStatus, WorkflowAction};

pub(crate) type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Facade over the workflow engine operations. Owns the connection pool;
/// every operation runs to completion within a single unit of work.
#[derive(Clone)]
pub struct WorkflowEngine {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
}

impl WorkflowEngine {
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    pub fn db(&self) -> EngineResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| EngineError::Pool(err.to_string()))
    }

    /// Resolve which workflow template governs a new file in the department.
    pub fn resolve_template(
        &self,
        department_id: Uuid,
        document_type: Option<&str>,
    ) -> EngineResult<ResolvedTemplate> {
        let mut conn = self.db()?;
        selector::resolve_template(&mut conn, department_id, document_type)
    }

    /// Read-only preview of the chain a file would get, including per-level
    /// skip decisions. Persists nothing.
    pub fn preview_workflow(
        &self,
        department_id: Uuid,
        document_type: Option<&str>,
        user_id: Uuid,
    ) -> EngineResult<WorkflowPreview> {
        let mut conn = self.db()?;
        instantiate::preview_workflow(&mut conn, department_id, document_type, user_id)
    }

    /// Create a file: template selection, file-number generation, level
    /// instantiation and the creation audit entries, in one transaction.
    pub fn create_file(&self, request: CreateFileRequest) -> EngineResult<File> {
        let mut conn = self.db()?;
        instantiate::create_file(&mut conn, &self.config, request)
    }

    /// Apply a workflow action to a file under an exclusive row lock.
    pub fn execute(
        &self,
        file_id: Uuid,
        caller_id: Uuid,
        action: WorkflowAction,
        remarks: Option<String>,
        origin_ip: Option<String>,
    ) -> EngineResult<File> {
        let mut conn = self.db()?;
        transition::execute(
            &mut conn,
            &self.config,
            file_id,
            caller_id,
            action,
            remarks,
            origin_ip,
        )
    }

    /// Actions legal in the file's current state that the caller is also
    /// authorized to perform.
    pub fn allowed_actions(
        &self,
        file_id: Uuid,
        caller_id: Uuid,
    ) -> EngineResult<Vec<WorkflowAction>> {
        let mut conn = self.db()?;
        let file = transition::load_file(&mut conn, file_id)?;
        actions::allowed_actions(&mut conn, &file, caller_id)
    }

    /// Append-only history of a file: audit trail plus participant records.
    pub fn file_history(&self, file_id: Uuid) -> EngineResult<FileHistory> {
        let mut conn = self.db()?;
        audit::file_history(&mut conn, file_id)
    }
}

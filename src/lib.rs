//! Workflow resolution and execution engine for departmental case files.
//!
//! A file is created against exactly one workflow template (resolved from
//! its department and document type), gets a locked-in chain of approval
//! levels with authority-based skips, and then only ever changes state
//! through the transition engine, which runs under a row lock and appends
//! participant and audit records in the same transaction.

pub mod authority;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod schema;

pub use engine::{
    allowed_actions, auto_approves, file_history, plan_levels, CreateFileRequest, FileHistory,
    FileState, LevelStatus, PlannedLevel, ResolvedTemplate, ScopeReason, WorkflowAction,
    WorkflowEngine, WorkflowPreview,
};
pub use error::{EngineError, EngineResult};

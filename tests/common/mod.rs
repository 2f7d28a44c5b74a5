use std::env;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use fileflow::authority::Role;
use fileflow::config::AppConfig;
use fileflow::db;
use fileflow::models::{
    NewDepartment, NewTemplateLevel, NewUser, NewUserDepartmentRole, NewWorkflowTemplate,
};
use fileflow::schema::{
    departments, user_department_roles, users, workflow_template_levels, workflow_templates,
};
use fileflow::WorkflowEngine;
use once_cell::sync::Lazy;
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub fn acquire_db_lock() -> MutexGuard<'static, ()> {
    DB_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Engine over a migrated, truncated test database. Returns `None` (and the
/// caller should skip) when `TEST_DATABASE_URL` is not set.
pub fn test_engine() -> Result<Option<WorkflowEngine>> {
    let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return Ok(None);
    };

    let config = AppConfig {
        database_url,
        ..AppConfig::default()
    };

    let pool = db::init_pool(&config)?;
    let mut conn = pool
        .get()
        .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
    truncate_all(&mut conn)?;
    drop(conn);

    Ok(Some(WorkflowEngine::new(pool, config)))
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE file_audit_trail, file_workflow_participants, file_workflow_levels, \
         files, workflow_template_levels, workflow_templates, user_department_roles, users, \
         departments RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}

pub fn insert_department(engine: &WorkflowEngine, code: &str) -> Result<Uuid> {
    let mut conn = engine.db()?;
    let department = NewDepartment {
        id: Uuid::new_v4(),
        code: code.to_string(),
        name: format!("{code} department"),
        file_number_prefix: code.to_string(),
    };
    diesel::insert_into(departments::table)
        .values(&department)
        .execute(&mut conn)
        .context("failed to insert department")?;
    Ok(department.id)
}

pub fn insert_user(engine: &WorkflowEngine, email: &str) -> Result<Uuid> {
    let mut conn = engine.db()?;
    let user = NewUser {
        id: Uuid::new_v4(),
        name: email.split('@').next().unwrap_or(email).to_string(),
        email: email.to_string(),
        is_active: true,
    };
    diesel::insert_into(users::table)
        .values(&user)
        .execute(&mut conn)
        .context("failed to insert user")?;
    Ok(user.id)
}

pub fn assign_role(
    engine: &WorkflowEngine,
    user_id: Uuid,
    department_id: Uuid,
    role: Role,
) -> Result<()> {
    let mut conn = engine.db()?;
    diesel::insert_into(user_department_roles::table)
        .values(&NewUserDepartmentRole {
            user_id,
            department_id,
            role: role.as_str().to_string(),
        })
        .execute(&mut conn)
        .context("failed to assign role")?;
    Ok(())
}

/// Insert a template with the given (level, role, authority_required) chain.
pub fn insert_template(
    engine: &WorkflowEngine,
    department_id: Option<Uuid>,
    document_type: Option<&str>,
    is_default: bool,
    chain: &[(i32, Role, i32)],
) -> Result<Uuid> {
    let mut conn = engine.db()?;
    let template = NewWorkflowTemplate {
        id: Uuid::new_v4(),
        name: format!(
            "{} workflow",
            document_type.unwrap_or(if department_id.is_some() {
                "department default"
            } else {
                "global default"
            })
        ),
        department_id,
        document_type: document_type.map(str::to_string),
        is_default,
        is_active: true,
    };
    diesel::insert_into(workflow_templates::table)
        .values(&template)
        .execute(&mut conn)
        .context("failed to insert template")?;

    for (level, role, authority_required) in chain {
        diesel::insert_into(workflow_template_levels::table)
            .values(&NewTemplateLevel {
                id: Uuid::new_v4(),
                template_id: template.id,
                level: *level,
                role_required: role.as_str().to_string(),
                authority_required: *authority_required,
                description: format!("level {level} review"),
            })
            .execute(&mut conn)
            .context("failed to insert template level")?;
    }

    Ok(template.id)
}

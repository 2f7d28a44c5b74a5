use std::env;

use anyhow::{anyhow, Context, Result};
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use fileflow::{
    authority::Role,
    config::AppConfig,
    db,
    engine::selector,
    error::EngineError,
    models::{NewDepartment, NewTemplateLevel, NewUser, NewUserDepartmentRole, NewWorkflowTemplate},
    schema::{departments, user_department_roles, users, workflow_template_levels, workflow_templates},
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("migrate") => migrate()?,
        Some("check-templates") => check_templates()?,
        Some("seed-demo") => seed_demo()?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\nUsage: admin migrate|check-templates|seed-demo");
            std::process::exit(1);
        }
        None => {
            eprintln!("Usage: admin migrate|check-templates|seed-demo");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn connect() -> Result<db::PgPool> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "admin",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        "loaded configuration"
    );
    db::init_pool(&config)
}

fn migrate() -> Result<()> {
    let pool = connect()?;
    let mut conn = pool.get().context("failed to get database connection")?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
    println!("Applied {} migration(s).", applied.len());
    Ok(())
}

/// Read-only sweep over every department and the document types its active
/// templates mention, reporting which pairs would fail file creation. Writes
/// nothing; this is the operator's view of the resolver.
fn check_templates() -> Result<()> {
    let pool = connect()?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let all_departments: Vec<(Uuid, String)> = departments::table
        .select((departments::id, departments::code))
        .order(departments::code.asc())
        .load(&mut conn)?;

    let mut problems = 0usize;
    for (department_id, code) in all_departments {
        let mut doc_types: Vec<Option<String>> = workflow_templates::table
            .filter(workflow_templates::is_active.eq(true))
            .filter(workflow_templates::department_id.eq(Some(department_id)))
            .select(workflow_templates::document_type)
            .distinct()
            .load(&mut conn)?;
        if !doc_types.contains(&None) {
            doc_types.push(None);
        }

        for doc_type in doc_types {
            match selector::resolve_template(&mut conn, department_id, doc_type.as_deref()) {
                Ok(resolved) => println!(
                    "OK        {code} / {}: {} ({} levels, {} tier)",
                    doc_type.as_deref().unwrap_or("<default>"),
                    resolved.template.name,
                    resolved.levels.len(),
                    resolved.scope.as_str(),
                ),
                Err(err @ EngineError::ConfigurationConflict { .. }) => {
                    problems += 1;
                    println!("CONFLICT  {code}: {err}");
                }
                Err(err @ EngineError::NoWorkflowConfigured { .. }) => {
                    problems += 1;
                    println!("MISSING   {code}: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    if problems > 0 {
        println!("{problems} configuration problem(s) found.");
        std::process::exit(2);
    }
    println!("Template configuration is clean.");
    Ok(())
}

fn seed_demo() -> Result<()> {
    let pool = connect()?;
    let mut conn = pool.get().context("failed to get database connection")?;

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        let department = NewDepartment {
            id: Uuid::new_v4(),
            code: "FIN".to_string(),
            name: "Finance".to_string(),
            file_number_prefix: "FIN".to_string(),
        };
        diesel::insert_into(departments::table)
            .values(&department)
            .execute(conn)?;

        let people = [
            ("Asha Rao", "asha@example.org", Role::Initiator),
            ("Bimal Sen", "bimal@example.org", Role::FirstLevelApprover),
            ("Chitra Iyer", "chitra@example.org", Role::SecondLevelApprover),
            ("Deven Shah", "deven@example.org", Role::FinalApprover),
        ];
        for (name, email, role) in people {
            let user = NewUser {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: email.to_string(),
                is_active: true,
            };
            diesel::insert_into(users::table).values(&user).execute(conn)?;
            diesel::insert_into(user_department_roles::table)
                .values(&NewUserDepartmentRole {
                    user_id: user.id,
                    department_id: department.id,
                    role: role.as_str().to_string(),
                })
                .execute(conn)?;
        }

        let template = NewWorkflowTemplate {
            id: Uuid::new_v4(),
            name: "Finance standard approval".to_string(),
            department_id: Some(department.id),
            document_type: None,
            is_default: false,
            is_active: true,
        };
        diesel::insert_into(workflow_templates::table)
            .values(&template)
            .execute(conn)?;

        let chain = [
            (1, Role::FirstLevelApprover, "Section review"),
            (2, Role::SecondLevelApprover, "Branch review"),
            (3, Role::FinalApprover, "Final sanction"),
        ];
        for (level, role, description) in chain {
            diesel::insert_into(workflow_template_levels::table)
                .values(&NewTemplateLevel {
                    id: Uuid::new_v4(),
                    template_id: template.id,
                    level,
                    role_required: role.as_str().to_string(),
                    authority_required: role.authority(),
                    description: description.to_string(),
                })
                .execute(conn)?;
        }

        Ok(())
    })?;

    println!("Seeded demo department, users, roles, and template.");
    Ok(())
}

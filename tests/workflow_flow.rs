mod common;

use anyhow::Result;
use chrono::Datelike;
use common::{acquire_db_lock, assign_role, insert_department, insert_template, insert_user, test_engine};
use diesel::prelude::*;
use fileflow::authority::Role;
use fileflow::models::{File, FileWorkflowLevel};
use fileflow::schema::{file_audit_trail, file_workflow_levels, file_workflow_participants};
use fileflow::{CreateFileRequest, EngineError, WorkflowAction, WorkflowEngine};
use uuid::Uuid;

fn create_file(engine: &WorkflowEngine, department_id: Uuid, created_by: Uuid) -> Result<File> {
    Ok(engine.create_file(CreateFileRequest {
        title: "Budget sanction note".to_string(),
        department_id,
        document_type: "NOTE".to_string(),
        priority: "NORMAL".to_string(),
        created_by,
        origin_ip: None,
    })?)
}

fn level_rows(engine: &WorkflowEngine, file_id: Uuid) -> Result<Vec<FileWorkflowLevel>> {
    let mut conn = engine.db()?;
    Ok(file_workflow_levels::table
        .filter(file_workflow_levels::file_id.eq(file_id))
        .order(file_workflow_levels::level.asc())
        .load(&mut conn)?)
}

fn active_count(levels: &[FileWorkflowLevel]) -> usize {
    levels.iter().filter(|row| row.status == "ACTIVE").count()
}

#[test]
fn full_approval_chain_to_archive() -> Result<()> {
    let _lock = acquire_db_lock();
    let Some(engine) = test_engine()? else { return Ok(()) };

    let dept = insert_department(&engine, "FIN")?;
    let creator = insert_user(&engine, "asha@example.org")?;
    let first = insert_user(&engine, "bimal@example.org")?;
    let second = insert_user(&engine, "chitra@example.org")?;
    assign_role(&engine, creator, dept, Role::Initiator)?;
    assign_role(&engine, first, dept, Role::FirstLevelApprover)?;
    assign_role(&engine, second, dept, Role::SecondLevelApprover)?;
    insert_template(
        &engine,
        Some(dept),
        Some("NOTE"),
        false,
        &[
            (1, Role::FirstLevelApprover, 2),
            (2, Role::SecondLevelApprover, 3),
        ],
    )?;

    let file = create_file(&engine, dept, creator)?;
    assert_eq!(file.current_state, "DRAFT");
    assert_eq!(file.current_level, 0);
    assert_eq!(file.max_levels, 2);
    assert!(file.file_number.starts_with("FIN/"));

    let levels = level_rows(&engine, file.id)?;
    assert_eq!(levels.len() as i32, file.max_levels);
    assert!(levels.iter().all(|row| row.status == "PENDING"));

    // The creator sees draft actions; an approver sees nothing yet.
    let mine = engine.allowed_actions(file.id, creator)?;
    assert_eq!(mine, vec![WorkflowAction::SaveDraft, WorkflowAction::Submit]);
    assert!(engine.allowed_actions(file.id, first)?.is_empty());

    let file = engine.execute(file.id, creator, WorkflowAction::Submit, None, None)?;
    assert_eq!(file.current_state, "IN_REVIEW");
    assert_eq!(file.current_level, 1);
    let levels = level_rows(&engine, file.id)?;
    assert_eq!(active_count(&levels), 1);
    assert_eq!(levels[0].status, "ACTIVE");

    // Wrong role holder is rejected with the same predicate allowed_actions uses.
    let err = engine
        .execute(file.id, second, WorkflowAction::Approve, None, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let file = engine.execute(
        file.id,
        first,
        WorkflowAction::Approve,
        Some("seen and agreed".to_string()),
        None,
    )?;
    assert_eq!(file.current_state, "IN_REVIEW");
    assert_eq!(file.current_level, 2);

    // Final-level approval terminates the chain.
    let file = engine.execute(file.id, second, WorkflowAction::Approve, None, None)?;
    assert_eq!(file.current_state, "APPROVED");
    let levels = level_rows(&engine, file.id)?;
    assert_eq!(active_count(&levels), 0);
    assert!(levels.iter().all(|row| row.status == "COMPLETED"));

    let file = engine.execute(file.id, creator, WorkflowAction::Archive, None, None)?;
    assert_eq!(file.current_state, "ARCHIVED");
    assert!(engine.allowed_actions(file.id, creator)?.is_empty());

    let history = engine.file_history(file.id)?;
    let actions: Vec<&str> = history.audit.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(
        actions,
        vec![
            "CREATE",
            "WORKFLOW_INSTANTIATED",
            "SUBMIT",
            "APPROVE",
            "APPROVE",
            "ARCHIVE"
        ]
    );
    assert_eq!(history.participants.len(), 2);
    assert_eq!(history.participants[0].role, "FIRST_LEVEL_APPROVER");
    assert_eq!(
        history.participants[0].remarks.as_deref(),
        Some("seen and agreed")
    );

    Ok(())
}

#[test]
fn preview_matches_instantiated_skip_decisions() -> Result<()> {
    let _lock = acquire_db_lock();
    let Some(engine) = test_engine()? else { return Ok(()) };

    let dept = insert_department(&engine, "EST")?;
    let creator = insert_user(&engine, "senior@example.org")?;
    // SECOND_LEVEL_APPROVER carries authority 3.
    assign_role(&engine, creator, dept, Role::SecondLevelApprover)?;
    let final_approver = insert_user(&engine, "final@example.org")?;
    assign_role(&engine, final_approver, dept, Role::FinalApprover)?;
    insert_template(
        &engine,
        Some(dept),
        Some("NOTE"),
        false,
        &[
            (1, Role::FirstLevelApprover, 2),
            (2, Role::SecondLevelApprover, 3),
            (3, Role::FinalApprover, 5),
        ],
    )?;

    let preview = engine.preview_workflow(dept, Some("NOTE"), creator)?;
    assert_eq!(preview.creator_authority, 3);
    let skips: Vec<bool> = preview.levels.iter().map(|l| l.skipped).collect();
    assert_eq!(skips, vec![true, true, false]);
    assert!(!preview.auto_approve);

    let file = create_file(&engine, dept, creator)?;
    assert_eq!(file.creator_authority_level, 3);
    let levels = level_rows(&engine, file.id)?;
    let statuses: Vec<&str> = levels.iter().map(|row| row.status.as_str()).collect();
    assert_eq!(statuses, vec!["SKIPPED", "SKIPPED", "PENDING"]);
    assert!(levels[0].skip_reason.is_some());

    // Submit lands directly on level 3, past the skipped levels.
    let file = engine.execute(file.id, creator, WorkflowAction::Submit, None, None)?;
    assert_eq!(file.current_state, "IN_REVIEW");
    assert_eq!(file.current_level, 3);
    let levels = level_rows(&engine, file.id)?;
    assert_eq!(active_count(&levels), 1);
    assert_eq!(levels[2].status, "ACTIVE");

    Ok(())
}

#[test]
fn approve_from_draft_is_an_illegal_transition() -> Result<()> {
    let _lock = acquire_db_lock();
    let Some(engine) = test_engine()? else { return Ok(()) };

    let dept = insert_department(&engine, "LAW")?;
    let creator = insert_user(&engine, "clerk@example.org")?;
    assign_role(&engine, creator, dept, Role::Initiator)?;
    insert_template(&engine, Some(dept), None, false, &[(1, Role::FinalApprover, 5)])?;

    let file = create_file(&engine, dept, creator)?;
    let err = engine
        .execute(file.id, creator, WorkflowAction::Approve, None, None)
        .unwrap_err();
    match err {
        EngineError::IllegalTransition { action, state } => {
            assert_eq!(action, "APPROVE");
            assert_eq!(state, "DRAFT");
        }
        other => panic!("expected IllegalTransition, got {other:?}"),
    }

    Ok(())
}

#[test]
fn type_specific_template_beats_department_default_and_duplicates_conflict() -> Result<()> {
    let _lock = acquire_db_lock();
    let Some(engine) = test_engine()? else { return Ok(()) };

    let dept = insert_department(&engine, "GAD")?;
    let template_specific = insert_template(
        &engine,
        Some(dept),
        Some("NOTE"),
        false,
        &[(1, Role::FirstLevelApprover, 2)],
    )?;
    insert_template(&engine, Some(dept), None, false, &[(1, Role::FinalApprover, 5)])?;

    // Both active for the same document type: tier 1 wins, never ambiguous.
    let resolved = engine.resolve_template(dept, Some("NOTE"))?;
    assert_eq!(resolved.template.id, template_specific);
    assert_eq!(resolved.scope.as_str(), "department+document-type");

    // A second active type-specific template makes the pair ambiguous.
    insert_template(
        &engine,
        Some(dept),
        Some("NOTE"),
        false,
        &[(1, Role::FinalApprover, 5)],
    )?;
    let err = engine.resolve_template(dept, Some("NOTE")).unwrap_err();
    assert!(matches!(err, EngineError::ConfigurationConflict { .. }));

    // No templates at any tier is a hard stop.
    let empty_dept = insert_department(&engine, "NIL")?;
    let err = engine.resolve_template(empty_dept, Some("NOTE")).unwrap_err();
    assert!(matches!(err, EngineError::NoWorkflowConfigured { .. }));

    Ok(())
}

#[test]
fn concurrent_approvals_have_exactly_one_winner() -> Result<()> {
    let _lock = acquire_db_lock();
    let Some(engine) = test_engine()? else { return Ok(()) };

    let dept = insert_department(&engine, "PWD")?;
    let creator = insert_user(&engine, "creator@example.org")?;
    let approver = insert_user(&engine, "approver@example.org")?;
    assign_role(&engine, creator, dept, Role::Initiator)?;
    assign_role(&engine, approver, dept, Role::FirstLevelApprover)?;
    insert_template(
        &engine,
        Some(dept),
        None,
        false,
        &[(1, Role::FirstLevelApprover, 2)],
    )?;

    let file = create_file(&engine, dept, creator)?;
    let file = engine.execute(file.id, creator, WorkflowAction::Submit, None, None)?;
    assert_eq!(file.current_state, "IN_REVIEW");

    let mut handles = Vec::new();
    for _ in 0..2 {
        let engine = engine.clone();
        let file_id = file.id;
        handles.push(std::thread::spawn(move || {
            engine.execute(file_id, approver, WorkflowAction::Approve, None, None)
        }));
    }
    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("approval thread panicked"))
        .collect();

    let wins = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(wins, 1, "exactly one concurrent approval must succeed");
    let loss = outcomes
        .into_iter()
        .find(|outcome| outcome.is_err())
        .unwrap()
        .unwrap_err();
    assert!(
        matches!(loss, EngineError::IllegalTransition { .. }),
        "loser must observe the post-transition state, got {loss:?}"
    );

    let mut conn = engine.db()?;
    let participant_count: i64 = file_workflow_participants::table
        .filter(file_workflow_participants::file_id.eq(file.id))
        .count()
        .get_result(&mut conn)?;
    assert_eq!(participant_count, 1);

    Ok(())
}

#[test]
fn return_resubmit_hold_resume_and_reject() -> Result<()> {
    let _lock = acquire_db_lock();
    let Some(engine) = test_engine()? else { return Ok(()) };

    let dept = insert_department(&engine, "HOM")?;
    let creator = insert_user(&engine, "creator@example.org")?;
    let approver = insert_user(&engine, "approver@example.org")?;
    assign_role(&engine, creator, dept, Role::Initiator)?;
    assign_role(&engine, approver, dept, Role::FirstLevelApprover)?;
    insert_template(
        &engine,
        Some(dept),
        None,
        false,
        &[(1, Role::FirstLevelApprover, 2)],
    )?;

    let file = create_file(&engine, dept, creator)?;
    let file = engine.execute(file.id, creator, WorkflowAction::Submit, None, None)?;

    let file = engine.execute(
        file.id,
        approver,
        WorkflowAction::Return,
        Some("needs budget annexure".to_string()),
        None,
    )?;
    assert_eq!(file.current_state, "RETURNED");
    assert_eq!(file.current_level, 1);
    let levels = level_rows(&engine, file.id)?;
    assert_eq!(levels[0].status, "RETURNED");

    // Only the creator may resubmit.
    let err = engine
        .execute(file.id, approver, WorkflowAction::Resubmit, None, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let file = engine.execute(file.id, creator, WorkflowAction::Resubmit, None, None)?;
    assert_eq!(file.current_state, "IN_REVIEW");
    assert_eq!(level_rows(&engine, file.id)?[0].status, "ACTIVE");

    let file = engine.execute(file.id, approver, WorkflowAction::Hold, None, None)?;
    assert_eq!(file.current_state, "CABINET");
    assert_eq!(engine.allowed_actions(file.id, approver)?, vec![WorkflowAction::Resume]);

    let file = engine.execute(file.id, approver, WorkflowAction::Resume, None, None)?;
    assert_eq!(file.current_state, "IN_REVIEW");

    let file = engine.execute(
        file.id,
        approver,
        WorkflowAction::Reject,
        Some("not sanctioned".to_string()),
        None,
    )?;
    assert_eq!(file.current_state, "REJECTED");
    assert!(engine.allowed_actions(file.id, approver)?.is_empty());
    assert!(engine.allowed_actions(file.id, creator)?.is_empty());

    let err = engine
        .execute(file.id, creator, WorkflowAction::Resubmit, None, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::IllegalTransition { .. }));

    Ok(())
}

#[test]
fn fully_skipped_chain_auto_approves_on_submit() -> Result<()> {
    let _lock = acquire_db_lock();
    let Some(engine) = test_engine()? else { return Ok(()) };

    let dept = insert_department(&engine, "SEC")?;
    let creator = insert_user(&engine, "secretary@example.org")?;
    // FINAL_APPROVER carries authority 5, above both level requirements.
    assign_role(&engine, creator, dept, Role::FinalApprover)?;
    insert_template(
        &engine,
        Some(dept),
        None,
        false,
        &[
            (1, Role::FirstLevelApprover, 2),
            (2, Role::SecondLevelApprover, 3),
        ],
    )?;

    let preview = engine.preview_workflow(dept, None, creator)?;
    assert!(preview.auto_approve);

    let file = create_file(&engine, dept, creator)?;
    let levels = level_rows(&engine, file.id)?;
    assert!(levels.iter().all(|row| row.status == "SKIPPED"));

    let file = engine.execute(file.id, creator, WorkflowAction::Submit, None, None)?;
    assert_eq!(file.current_state, "APPROVED");
    assert_eq!(file.current_level, file.max_levels);

    let mut conn = engine.db()?;
    let auto_entry: i64 = file_audit_trail::table
        .filter(file_audit_trail::file_id.eq(file.id))
        .filter(file_audit_trail::details.like("auto-approved%"))
        .count()
        .get_result(&mut conn)?;
    assert_eq!(auto_entry, 1);

    Ok(())
}

#[test]
fn concurrent_file_creation_yields_distinct_file_numbers() -> Result<()> {
    let _lock = acquire_db_lock();
    let Some(engine) = test_engine()? else { return Ok(()) };

    let dept = insert_department(&engine, "CON")?;
    let creator = insert_user(&engine, "creator@example.org")?;
    assign_role(&engine, creator, dept, Role::Initiator)?;
    insert_template(&engine, Some(dept), None, false, &[(1, Role::FinalApprover, 5)])?;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let engine = engine.clone();
        handles.push(std::thread::spawn(move || create_file(&engine, dept, creator)));
    }
    let mut numbers = Vec::new();
    for handle in handles {
        let file = handle
            .join()
            .expect("creation thread panicked")
            .expect("concurrent creation must not collide on the file number");
        numbers.push(file.file_number);
    }

    numbers.sort();
    let year = chrono::Utc::now().year();
    assert_eq!(
        numbers,
        vec![format!("CON/{year}/0001"), format!("CON/{year}/0002")]
    );

    Ok(())
}

#[test]
fn zero_level_template_previews_and_submits_as_auto_approval() -> Result<()> {
    let _lock = acquire_db_lock();
    let Some(engine) = test_engine()? else { return Ok(()) };

    let dept = insert_department(&engine, "NUL")?;
    let creator = insert_user(&engine, "creator@example.org")?;
    assign_role(&engine, creator, dept, Role::Initiator)?;
    insert_template(&engine, Some(dept), None, false, &[])?;

    // What the preview advertises is what submit does: nothing to review.
    let preview = engine.preview_workflow(dept, None, creator)?;
    assert!(preview.levels.is_empty());
    assert!(preview.auto_approve);

    let file = create_file(&engine, dept, creator)?;
    assert_eq!(file.max_levels, 0);
    assert!(level_rows(&engine, file.id)?.is_empty());

    let file = engine.execute(file.id, creator, WorkflowAction::Submit, None, None)?;
    assert_eq!(file.current_state, "APPROVED");
    assert_eq!(file.current_level, 0);

    Ok(())
}

#[test]
fn allowed_actions_is_idempotent() -> Result<()> {
    let _lock = acquire_db_lock();
    let Some(engine) = test_engine()? else { return Ok(()) };

    let dept = insert_department(&engine, "EDU")?;
    let creator = insert_user(&engine, "creator@example.org")?;
    assign_role(&engine, creator, dept, Role::Initiator)?;
    insert_template(&engine, Some(dept), None, false, &[(1, Role::FinalApprover, 5)])?;

    let file = create_file(&engine, dept, creator)?;
    let first = engine.allowed_actions(file.id, creator)?;
    let second = engine.allowed_actions(file.id, creator)?;
    assert_eq!(first, second);

    Ok(())
}

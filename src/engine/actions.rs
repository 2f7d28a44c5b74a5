use diesel::prelude::*;
use diesel::PgConnection;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::File;

use super::transition::{self, WorkflowAction};

/// Actions legal in the file's current state that the caller is also
/// authorized to perform. Uses the same legality table and authorization
/// predicate as `transition::execute`, so the advertised set cannot drift
/// from what execution accepts. Read-only, no locking.
pub fn allowed_actions(
    conn: &mut PgConnection,
    file: &File,
    caller_id: Uuid,
) -> EngineResult<Vec<WorkflowAction>> {
    let state = transition::file_state(file)?;

    let mut allowed = Vec::new();
    for &action in transition::legal_actions(state) {
        match transition::authorize(conn, file, caller_id, action) {
            Ok(()) => allowed.push(action),
            Err(EngineError::Forbidden(_)) => {}
            Err(other) => return Err(other),
        }
    }
    Ok(allowed)
}

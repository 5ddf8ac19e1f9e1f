// Anonymization engine
// Validates a request and rewrites the selected columns of a stored document

use crate::error::ApiError;
use crate::store::SessionStore;
use crate::transform::token_for;

/// Replace every cell of the target columns with its keyed token.
///
/// Validation happens before any mutation, so a rejected request leaves the
/// document untouched. The transformed row set is computed in full and then
/// swapped into the session, so no partially transformed document is ever
/// observable. Re-invoking on an already anonymized column re-hashes the
/// stored tokens; the original values are not retained anywhere.
///
/// Returns the list of column names actually changed (the targets, deduped,
/// in request order).
pub async fn anonymize(
    store: &SessionStore,
    file_id: &str,
    target_columns: &[String],
    secret_key: &str,
) -> Result<Vec<String>, ApiError> {
    let session = store.get(file_id).ok_or(ApiError::NotFound)?;

    if target_columns.is_empty() {
        return Err(ApiError::InvalidRequest(
            "No columns selected for anonymization".to_string(),
        ));
    }

    let key = secret_key.trim();
    if key.is_empty() {
        return Err(ApiError::InvalidRequest(
            "No secret key provided".to_string(),
        ));
    }

    let mut guard = session.write().await;

    // Resolve target names to column indices, deduping so a cell is never
    // hashed twice in one call.
    let mut indices: Vec<usize> = Vec::new();
    let mut changed: Vec<String> = Vec::new();
    for name in target_columns {
        let index = guard.document.column_index(name).ok_or_else(|| {
            ApiError::InvalidRequest(format!("Unknown column: {}", name))
        })?;
        if !indices.contains(&index) {
            indices.push(index);
            changed.push(name.clone());
        }
    }

    let mut rows = guard.document.rows.clone();
    for row in &mut rows {
        for &index in &indices {
            row[index] = token_for(&row[index], key);
        }
    }
    guard.document.rows = rows;

    tracing::debug!(
        file_id,
        columns = changed.len(),
        rows = guard.document.row_count(),
        "anonymized columns"
    );

    Ok(changed)
}

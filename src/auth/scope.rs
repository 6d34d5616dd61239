use crate::models::{ApiKeyRecord, Scope};

/// Admit iff the resolved key holds `required`. No key means denial.
pub fn authorize(api_key: Option<&ApiKeyRecord>, required: Scope) -> bool {
    api_key.is_some_and(|record| record.has_scope(required))
}

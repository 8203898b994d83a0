use crate::{domain::Caller, errors::Error, Result};

// ============== Authorization ==============

pub fn is_authorized(caller: Option<&Caller>, allowed_operators: &[i64]) -> bool {
    let Some(caller) = caller else {
        return false;
    };
    if allowed_operators.is_empty() {
        return false;
    }
    allowed_operators.contains(&caller.id.0)
}

/// `is_authorized` as an early-return guard for core operations.
pub fn ensure_authorized(caller: &Caller, allowed_operators: &[i64]) -> Result<()> {
    if is_authorized(Some(caller), allowed_operators) {
        return Ok(());
    }
    Err(Error::Unauthorized(format!(
        "operator {} is not allowed to run collections",
        caller.display_name()
    )))
}

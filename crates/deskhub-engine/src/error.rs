use deskhub_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => EngineError::NotFound(what),
            other => EngineError::Storage(other),
        }
    }
}

impl From<deskhub_core::todo::UnknownVariant> for EngineError {
    fn from(e: deskhub_core::todo::UnknownVariant) -> Self {
        EngineError::Validation(e.to_string())
    }
}

/// Trimmed, non-empty text or a validation error naming the field.
pub(crate) fn required(field: &str, value: &str) -> Result<String, EngineError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_not_found() {
        let e: EngineError = StoreError::NotFound("todo 1".into()).into();
        assert!(matches!(e, EngineError::NotFound(_)));
        let e: EngineError = StoreError::Database("locked".into()).into();
        assert!(matches!(e, EngineError::Storage(_)));
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("task", "  Buy milk ").unwrap(), "Buy milk");
        assert!(matches!(required("task", " \t\n"), Err(EngineError::Validation(_))));
    }
}

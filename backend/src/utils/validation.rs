// utils/validation.rs
use crate::utils::error::{AppError, Result};
use validator::Validate;

/// Fonction utilitaire pour valider un objet Validate
pub fn validate_object<T: Validate>(obj: &T) -> Result<()> {
    obj.validate().map_err(AppError::from)
}

/// Valider qu'un champ optionnel est renseigné et non vide
pub fn require_present<'a>(value: Option<&'a str>, field_name: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::BadRequest(format!("{} is required", field_name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_present() {
        assert_eq!(require_present(Some("secret"), "password").unwrap(), "secret");
        assert!(matches!(require_present(Some("   "), "password"), Err(AppError::BadRequest(_))));
        assert!(matches!(require_present(None, "password"), Err(AppError::BadRequest(_))));
    }
}

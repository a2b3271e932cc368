use regex::Regex;
use std::sync::LazyLock;

use crate::error::{AppError, AppResult};

static DNI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8}$").expect("valid DNI regex"));
static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^9\d{8}$").expect("valid phone regex"));
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});

/// Peruvian DNI: 8 digits
pub fn validate_dni(dni: &str) -> AppResult<()> {
    if !DNI_REGEX.is_match(dni) {
        return Err(AppError::ValidationError(
            "El DNI debe tener 8 dígitos".to_string(),
        ));
    }
    Ok(())
}

/// Mobile numbers: 9 digits starting with 9, optional +51 prefix stripped by `format_phone`.
pub fn validate_phone(phone: &str) -> AppResult<()> {
    if !PHONE_REGEX.is_match(phone) {
        return Err(AppError::ValidationError(
            "El celular debe tener 9 dígitos y empezar con 9".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if !EMAIL_REGEX.is_match(email) {
        return Err(AppError::ValidationError(
            "El correo electrónico no es válido".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_required(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!(
            "El campo {field} es obligatorio"
        )));
    }
    Ok(())
}

/// Keep digits only and drop the country code.
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 11 && digits.starts_with("51") {
        digits[2..].to_string()
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_dni() {
        assert!(validate_dni("45678912").is_ok());
        assert!(validate_dni("4567891").is_err());
        assert!(validate_dni("4567891A").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("987654321").is_ok());
        assert!(validate_phone("887654321").is_err());
        assert!(validate_phone("98765432").is_err());
    }

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone("+51 987 654 321"), "987654321");
        assert_eq!(format_phone("987-654-321"), "987654321");
        assert_eq!(format_phone("987654321"), "987654321");
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("juan@example.com").is_ok());
        assert!(validate_email("juan@example").is_err());
        assert!(validate_email("juan example.com").is_err());
    }

    #[test]
    fn test_validate_required() {
        assert!(validate_required("Lima", "ciudad").is_ok());
        assert!(validate_required("   ", "ciudad").is_err());
    }
}

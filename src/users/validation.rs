//! Registration input rules.
//!
//! Names are collapsed, alphabetic-only and title-cased; phones keep digits
//! and a leading `+`; emails follow a conservative address shape. Password
//! strength is a separate [`PasswordPolicy`] so the registration flow can
//! check it after the email and role lookups.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{AppError, RegisterRequest, Result};
use crate::users::RoleName;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;
const EMAIL_MAX_CHARS: usize = 255;
const PHONE_MIN_CHARS: usize = 8;
const PHONE_MAX_CHARS: usize = 20;

/// Characters accepted as the "special character" of a strong password.
pub const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

/// Password strength rules applied at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_lowercase: true,
            require_uppercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("Password must be at least {min} characters")]
    TooShort { min: usize },
    #[error("Password must be at most {max} characters")]
    TooLong { max: usize },
    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("Password must contain at least one digit")]
    MissingDigit,
    #[error("Password must contain at least one special character ({PASSWORD_SPECIALS})")]
    MissingSpecial,
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl PasswordPolicy {
    pub fn validate(&self, password: &str) -> std::result::Result<(), PasswordError> {
        let len = password.chars().count();
        if len < self.min_length {
            return Err(PasswordError::TooShort {
                min: self.min_length,
            });
        }
        if len > self.max_length {
            return Err(PasswordError::TooLong {
                max: self.max_length,
            });
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(PasswordError::MissingLowercase);
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(PasswordError::MissingUppercase);
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordError::MissingDigit);
        }
        if self.require_special && !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
            return Err(PasswordError::MissingSpecial);
        }
        Ok(())
    }
}

/// Collapses whitespace, requires letters only, and title-cases each word.
pub fn normalize_name(raw: &str) -> Result<String> {
    let raw_len = raw.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&raw_len) {
        return Err(AppError::Validation(format!(
            "Name must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters"
        )));
    }

    let words: Vec<&str> = raw.split_whitespace().collect();
    if words.is_empty() || !words.iter().all(|w| w.chars().all(char::is_alphabetic)) {
        return Err(AppError::Validation(
            "Name may only contain letters and spaces".to_string(),
        ));
    }

    let titled: Vec<String> = words.iter().map(|w| title_case(w)).collect();
    Ok(titled.join(" "))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Trims and checks the address shape. Case is preserved; lookups are
/// case-insensitive in the store.
pub fn validate_email(raw: &str) -> Result<String> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if email.chars().count() > EMAIL_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "Email must be at most {EMAIL_MAX_CHARS} characters"
        )));
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(AppError::Validation(format!(
            "Email '{email}' is not a valid address"
        )));
    }
    Ok(email.to_string())
}

/// Strips spaces, dashes and parentheses; the rest must be digits with an
/// optional leading `+`.
pub fn normalize_phone(raw: &str) -> Result<String> {
    let raw_len = raw.chars().count();
    if !(PHONE_MIN_CHARS..=PHONE_MAX_CHARS).contains(&raw_len) {
        return Err(AppError::Validation(format!(
            "Phone must be between {PHONE_MIN_CHARS} and {PHONE_MAX_CHARS} characters"
        )));
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Phone may only contain digits and a leading '+'".to_string(),
        ));
    }
    Ok(cleaned)
}

/// A registration request after shape validation and normalisation.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistrationInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub role: RoleName,
}

impl std::fmt::Debug for RegistrationInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationInput")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl RegisterRequest {
    /// Field-level checks. Password strength is not checked here.
    pub fn validate(&self) -> Result<RegistrationInput> {
        let name = normalize_name(&self.name)?;
        let email = validate_email(&self.email)?;
        let phone = self.phone.as_deref().map(normalize_phone).transpose()?;

        let password_len = self.password.chars().count();
        if !(8..=128).contains(&password_len) {
            return Err(AppError::Validation(
                "Password must be between 8 and 128 characters".to_string(),
            ));
        }

        let role = match self.role.as_deref() {
            Some(role) => role.parse()?,
            None => RoleName::default(),
        };

        Ok(RegistrationInput {
            name,
            email,
            phone,
            password: self.password.clone(),
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("password", PasswordError::MissingUppercase)]
    #[case("PASSWORD1!", PasswordError::MissingLowercase)]
    #[case("Password!", PasswordError::MissingDigit)]
    #[case("Password1", PasswordError::MissingSpecial)]
    #[case("Pa1!", PasswordError::TooShort { min: 8 })]
    fn rejects_weak_passwords(#[case] password: &str, #[case] expected: PasswordError) {
        assert_eq!(PasswordPolicy::default().validate(password), Err(expected));
    }

    #[test]
    fn accepts_strong_password() {
        assert!(PasswordPolicy::default().validate("Secure123!").is_ok());
    }

    #[test]
    fn rejects_overlong_password() {
        let long = format!("Aa1!{}", "x".repeat(125));
        assert_eq!(
            PasswordPolicy::default().validate(&long),
            Err(PasswordError::TooLong { max: 128 })
        );
    }

    #[rstest]
    #[case("ana   diaz", "Ana Diaz")]
    #[case("  JOSÉ  pérez ", "José Pérez")]
    #[case("lu", "Lu")]
    fn normalizes_names(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("Ana D1az")]
    #[case("a")]
    #[case("Ana-Diaz")]
    #[case("   ")]
    fn rejects_bad_names(#[case] raw: &str) {
        assert!(normalize_name(raw).is_err());
    }

    #[rstest]
    #[case("+1 (829) 555-1234", "+18295551234")]
    #[case("809-555-1234", "8095551234")]
    fn normalizes_phones(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_phone(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("1234567")]
    #[case("555-CALL-NOW")]
    #[case("1829+5551234")]
    fn rejects_bad_phones(#[case] raw: &str) {
        assert!(normalize_phone(raw).is_err());
    }

    #[test]
    fn validates_email_shape() {
        assert_eq!(validate_email(" Ana@X.com ").unwrap(), "Ana@X.com");
        assert!(validate_email("ana@x").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn role_defaults_to_waiter() {
        let request = RegisterRequest {
            name: "Ana Diaz".to_string(),
            email: "ana@x.com".to_string(),
            phone: None,
            password: "Secure123!".to_string(),
            role: None,
        };
        assert_eq!(request.validate().unwrap().role, RoleName::Waiter);
    }

    #[test]
    fn role_is_case_insensitive_and_checked() {
        let mut request = RegisterRequest {
            name: "Ana Diaz".to_string(),
            email: "ana@x.com".to_string(),
            phone: None,
            password: "Secure123!".to_string(),
            role: Some("EMPLOYEE".to_string()),
        };
        assert_eq!(request.validate().unwrap().role, RoleName::Employee);

        request.role = Some("chef".to_string());
        assert!(request.validate().is_err());
    }

    #[test]
    fn debug_omits_password() {
        let request = RegisterRequest {
            name: "Ana Diaz".to_string(),
            email: "ana@x.com".to_string(),
            phone: None,
            password: "Secure123!".to_string(),
            role: None,
        };
        let input = request.validate().unwrap();
        assert!(!format!("{input:?}").contains("Secure123!"));
    }
}

// ABOUTME: Pure field validators shared by the account, profile, pet and photo services
// ABOUTME: Each check returns a message on failure; services attach the field name

use chrono::NaiveDate;
use validator::{ValidateEmail, ValidateLength};

use crate::error::{AppError, FieldError};

pub const MAX_PHOTO_SIZE: usize = 5 * 1024 * 1024;

pub const USERNAME_MAX_LENGTH: usize = 25;
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_LENGTH: usize = 128;
pub const NAME_MIN_LENGTH: usize = 2;
pub const NAME_MAX_LENGTH: usize = 30;
pub const PET_NAME_MAX_LENGTH: usize = 30;

pub type Check = std::result::Result<(), String>;

pub fn only_letters(value: &str) -> Check {
    if value.is_empty() || !value.chars().all(char::is_alphabetic) {
        return Err("The name should consist of only letters!".to_string());
    }
    Ok(())
}

pub fn max_file_size(size: usize, limit: usize) -> Check {
    if size > limit {
        return Err(format!(
            "File too large. Size should not exceed {} MB.",
            limit / (1024 * 1024)
        ));
    }
    Ok(())
}

pub fn min_date(value: NaiveDate, floor: NaiveDate) -> Check {
    if value < floor {
        return Err(format!("Date must be greater than {}", floor));
    }
    Ok(())
}

pub fn max_date(value: NaiveDate, ceiling: NaiveDate) -> Check {
    if ceiling < value {
        return Err(format!("Date must be earlier than {}", ceiling));
    }
    Ok(())
}

pub fn length_between(value: &str, min: usize, max: usize) -> Check {
    if !value.validate_length(Some(min as u64), None, None) {
        return Err(format!("Ensure this value has at least {} characters", min));
    }
    if !value.validate_length(None, Some(max as u64), None) {
        return Err(format!("Ensure this value has at most {} characters", max));
    }
    Ok(())
}

pub fn username_chars(value: &str) -> Check {
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !value.chars().all(allowed) {
        return Err("Username may contain only letters, digits and @/./+/-/_".to_string());
    }
    Ok(())
}

pub fn password_policy(password: &str, username: &str) -> Check {
    length_between(password, PASSWORD_MIN_LENGTH, PASSWORD_MAX_LENGTH)?;
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("This password is entirely numeric".to_string());
    }
    if password.eq_ignore_ascii_case(username) {
        return Err("The password is too similar to the username".to_string());
    }
    Ok(())
}

pub fn http_url(value: &str) -> Check {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err("Enter a valid URL".to_string()),
    }
}

/// Address syntax per `validator`, plus a dotted domain: a bare host such as
/// `alice@example` is not accepted.
pub fn email(value: &str) -> Check {
    let dotted_domain = value
        .rsplit_once('@')
        .is_some_and(|(_, domain)| domain.contains('.'));
    if !value.validate_email() || !dotted_domain {
        return Err("Enter a valid email address".to_string());
    }
    Ok(())
}

/// Collects failures per field so a form can show every problem at once.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `checks` in order and records the first failure for `field`.
    pub fn check<I>(&mut self, field: &str, checks: I)
    where
        I: IntoIterator<Item = Check>,
    {
        if let Some(Err(message)) = checks.into_iter().find(|c| c.is_err()) {
            self.errors.push(FieldError::new(field, message));
        }
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn finish(self) -> crate::error::Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn only_letters_accepts_plain_names() {
        assert!(only_letters("Anna").is_ok());
        assert!(only_letters("Zoë").is_ok());
    }

    #[test]
    fn only_letters_rejects_digits_spaces_and_empty() {
        assert!(only_letters("Anna2").is_err());
        assert!(only_letters("Anna Maria").is_err());
        assert!(only_letters("O'Brien").is_err());
        assert!(only_letters("").is_err());
    }

    #[test]
    fn file_size_limit_is_inclusive() {
        assert!(max_file_size(MAX_PHOTO_SIZE, MAX_PHOTO_SIZE).is_ok());
        assert!(max_file_size(MAX_PHOTO_SIZE + 1, MAX_PHOTO_SIZE).is_err());
        let err = max_file_size(6 * 1024 * 1024, MAX_PHOTO_SIZE).unwrap_err();
        assert!(err.contains("5 MB"));
    }

    #[test]
    fn date_bounds() {
        let floor = date(1990, 1, 1);
        let ceiling = date(2024, 6, 1);
        assert!(min_date(floor, floor).is_ok());
        assert!(min_date(date(1989, 12, 31), floor).is_err());
        assert!(max_date(ceiling, ceiling).is_ok());
        assert!(max_date(date(2024, 6, 2), ceiling).is_err());
    }

    #[test]
    fn username_rules() {
        assert!(username_chars("alice.b+pets@home_1-x").is_ok());
        assert!(username_chars("alice smith").is_err());
        assert!(length_between(&"a".repeat(25), 1, USERNAME_MAX_LENGTH).is_ok());
        assert!(length_between(&"a".repeat(26), 1, USERNAME_MAX_LENGTH).is_err());
        // Counted in characters, not bytes
        assert!(length_between(&"ö".repeat(25), 1, USERNAME_MAX_LENGTH).is_ok());
    }

    #[test]
    fn password_rules() {
        assert!(password_policy("correct-horse", "alice").is_ok());
        assert!(password_policy("short", "alice").is_err());
        assert!(password_policy("12345678901", "alice").is_err());
        assert!(password_policy("AliceAlice", "alicealice").is_err());
    }

    #[test]
    fn url_and_email() {
        assert!(http_url("https://example.com/me.png").is_ok());
        assert!(http_url("ftp://example.com/me.png").is_err());
        assert!(http_url("not a url").is_err());
        assert!(email("alice@example.com").is_ok());
        assert!(email("alice@example").is_err());
        assert!(email("a@b@c.com").is_err());
        assert!(email("alice@exa..mple.com").is_err());
        assert!(email("a@-x.com").is_err());
        assert!(email("alice smith@example.com").is_err());
        assert!(email("alice+pets@mail.example.co.uk").is_ok());
    }

    #[test]
    fn field_errors_keep_first_failure_per_field() {
        let mut errors = FieldErrors::new();
        errors.check("first_name", [length_between("A", 2, 30), only_letters("A")]);
        errors.check("last_name", [length_between("Smith", 2, 30), only_letters("Smith")]);
        let err = errors.finish().unwrap_err();
        let fields = err.field_errors();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field, "first_name");
        assert!(fields[0].message.contains("at least 2"));
    }
}

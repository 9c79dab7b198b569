//! Field validation rules.
//!
//! `fire` runs one named rule against one raw input and answers pass/fail.
//! It is pure and total: malformed input fails the check, it never errors.
//! Presence of the input is the caller's concern, checked before any rule
//! runs.

use chrono::NaiveDate;
use regex::Regex;

use crate::api::response::ErrorCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    /// Account identifier chosen by the user: 5-30 word characters.
    UserId,
    /// Display name: 1-50 characters, not blank, no control characters.
    UserName,
    Email,
    /// 8-72 bytes (bcrypt input cap), printable ASCII, at least one letter
    /// and one digit.
    Password,
    Gender,
    /// A real calendar date, `YYYY-MM-DD`.
    Date,
    /// Sign-in identifier: either a user id or an email.
    UserIdOrEmail,
    BloodType,
    /// Free-text record label (vaccine or allergy name): same shape as a
    /// display name.
    ItemName,
    /// Clothes/shoes size label: 1-10 characters, no control characters.
    SizeLabel,
}

#[must_use]
pub fn fire(value: &str, rule: Rule) -> bool {
    match rule {
        Rule::UserId => Regex::new(r"^[0-9A-Za-z_]{5,30}$").is_ok_and(|re| re.is_match(value)),
        Rule::UserName | Rule::ItemName => {
            !value.trim().is_empty()
                && value.chars().count() <= 50
                && !value.chars().any(char::is_control)
        }
        Rule::Email => Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(value)),
        Rule::Password => valid_password(value),
        Rule::Gender => matches!(value, "male" | "female" | "other"),
        Rule::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        Rule::UserIdOrEmail => fire(value, Rule::UserId) || fire(value, Rule::Email),
        Rule::BloodType => matches!(value, "a" | "b" | "o" | "ab"),
        Rule::SizeLabel => {
            !value.trim().is_empty()
                && value.chars().count() <= 10
                && !value.chars().any(char::is_control)
        }
    }
}

fn valid_password(password: &str) -> bool {
    password.len() >= 8
        && password.len() <= 72
        && password.chars().all(|c| c.is_ascii_graphic())
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Body measurements arrive as JSON numbers; anything non-finite or outside
/// a plausible range is rejected.
#[must_use]
pub fn valid_measurement(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value < 300.0
}

/// Keep the codes whose check failed, in the order given.
///
/// Callers evaluate every check up front so one response can report all
/// failing fields at once.
#[must_use]
pub fn failed_checks(checks: &[(ErrorCode, bool)]) -> Vec<ErrorCode> {
    checks
        .iter()
        .filter(|(_, passed)| !passed)
        .map(|(code, _)| *code)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_word_characters() {
        assert!(fire("alice_01", Rule::UserId));
        assert!(fire("A1234", Rule::UserId));
    }

    #[test]
    fn user_id_rejects_bad_length_and_charset() {
        assert!(!fire("abcd", Rule::UserId));
        assert!(!fire(&"a".repeat(31), Rule::UserId));
        assert!(!fire("alice-01", Rule::UserId));
        assert!(!fire("alice 01", Rule::UserId));
        assert!(!fire("", Rule::UserId));
    }

    #[test]
    fn user_name_accepts_unicode() {
        assert!(fire("Alice", Rule::UserName));
        assert!(fire("山田 花子", Rule::UserName));
    }

    #[test]
    fn user_name_rejects_blank_and_control() {
        assert!(!fire("", Rule::UserName));
        assert!(!fire("   ", Rule::UserName));
        assert!(!fire("a\nb", Rule::UserName));
        assert!(!fire(&"あ".repeat(51), Rule::UserName));
    }

    #[test]
    fn email_accepts_simple() {
        assert!(fire("user@example.com", Rule::Email));
    }

    #[test]
    fn email_rejects_missing_parts() {
        assert!(!fire("user.example.com", Rule::Email));
        assert!(!fire("user@example", Rule::Email));
        assert!(!fire("user name@example.com", Rule::Email));
    }

    #[test]
    fn password_requires_letter_and_digit() {
        assert!(fire("passw0rd", Rule::Password));
        assert!(fire("C0rrect-horse-battery", Rule::Password));
        assert!(!fire("password", Rule::Password));
        assert!(!fire("12345678", Rule::Password));
    }

    #[test]
    fn password_rejects_bad_length_and_whitespace() {
        assert!(!fire("pass1", Rule::Password));
        assert!(!fire(&format!("a1{}", "b".repeat(71)), Rule::Password));
        assert!(!fire("pass word1", Rule::Password));
    }

    #[test]
    fn gender_is_closed_set() {
        assert!(fire("male", Rule::Gender));
        assert!(fire("female", Rule::Gender));
        assert!(fire("other", Rule::Gender));
        assert!(!fire("Male", Rule::Gender));
        assert!(!fire("unknown", Rule::Gender));
    }

    #[test]
    fn date_requires_real_calendar_days() {
        assert!(fire("2020-02-29", Rule::Date));
        assert!(!fire("2021-02-29", Rule::Date));
        assert!(!fire("2020-13-01", Rule::Date));
        assert!(!fire("20200229", Rule::Date));
        assert!(!fire("not-a-date", Rule::Date));
    }

    #[test]
    fn user_id_or_email_accepts_either() {
        assert!(fire("alice_01", Rule::UserIdOrEmail));
        assert!(fire("alice@example.com", Rule::UserIdOrEmail));
        assert!(!fire("a b", Rule::UserIdOrEmail));
    }

    #[test]
    fn blood_type_is_closed_set() {
        for ok in ["a", "b", "o", "ab"] {
            assert!(fire(ok, Rule::BloodType));
        }
        assert!(!fire("AB", Rule::BloodType));
        assert!(!fire("c", Rule::BloodType));
    }

    #[test]
    fn size_label_bounds() {
        assert!(fire("90", Rule::SizeLabel));
        assert!(fire("13.5", Rule::SizeLabel));
        assert!(!fire("", Rule::SizeLabel));
        assert!(!fire(&"9".repeat(11), Rule::SizeLabel));
    }

    #[test]
    fn measurement_bounds() {
        assert!(valid_measurement(52.5));
        assert!(!valid_measurement(0.0));
        assert!(!valid_measurement(-1.0));
        assert!(!valid_measurement(300.0));
        assert!(!valid_measurement(f64::NAN));
        assert!(!valid_measurement(f64::INFINITY));
    }

    #[test]
    fn failed_checks_keeps_order_and_filters() {
        let errors = failed_checks(&[
            (ErrorCode::ValidationUserId, false),
            (ErrorCode::ValidationUserName, true),
            (ErrorCode::ValidationEmail, false),
        ]);
        assert_eq!(
            errors,
            vec![ErrorCode::ValidationUserId, ErrorCode::ValidationEmail]
        );
    }

    #[test]
    fn failed_checks_empty_when_all_pass() {
        let errors = failed_checks(&[
            (ErrorCode::ValidationUserId, true),
            (ErrorCode::ValidationEmail, true),
        ]);
        assert!(errors.is_empty());
    }
}

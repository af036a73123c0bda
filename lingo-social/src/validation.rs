//! Input rules shared by the profile and feed services.

use chrono::{Datelike, NaiveDate};

use lingo_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::AgeGroup;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 20;
pub const POST_MAX_CHARS: usize = 2000;
pub const COMMENT_MAX_CHARS: usize = 500;
pub const FRIEND_MESSAGE_MAX_CHARS: usize = 300;

/// Full years elapsed between `birth_date` and `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// Computes age and its bucket, rejecting ages the app does not serve.
pub fn age_and_group(birth_date: NaiveDate, today: NaiveDate) -> AppResult<(i32, AgeGroup)> {
    let age = age_on(birth_date, today);
    let group = AgeGroup::from_age(age).ok_or_else(|| {
        AppError::new(
            ErrorCode::AgeOutOfRange,
            format!(
                "age must be between {} and {}",
                AgeGroup::MIN_AGE,
                AgeGroup::MAX_AGE
            ),
        )
    })?;
    Ok((age, group))
}

/// Lowercases and checks a username: 3-20 chars of `[a-z0-9_]`.
pub fn normalize_username(raw: &str) -> AppResult<String> {
    let username = raw.trim().to_lowercase();
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AppError::new(
            ErrorCode::InvalidUsername,
            format!("username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"),
        ));
    }
    if !username.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(AppError::new(
            ErrorCode::InvalidUsername,
            "username can only contain letters, numbers, and underscores",
        ));
    }
    Ok(username)
}

/// ISO 3166-1 alpha-2, returned uppercase.
pub fn country_code(raw: &str) -> AppResult<String> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(AppError::Validation(format!("invalid country code: {raw}")));
    }
    Ok(code)
}

pub fn country_codes(raw: &[String]) -> AppResult<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for code in raw {
        let code = country_code(code)?;
        if !out.contains(&code) {
            out.push(code);
        }
    }
    Ok(out)
}

/// ISO 639 codes (2 or 3 letters), lowercased and deduplicated in input order.
pub fn language_codes(raw: &[String], field: &str) -> AppResult<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for code in raw {
        let code = code.trim().to_ascii_lowercase();
        if !(2..=3).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(AppError::Validation(format!("invalid language code in {field}: {code}")));
        }
        if !out.contains(&code) {
            out.push(code);
        }
    }
    if out.is_empty() {
        return Err(AppError::Validation(format!("{field} must list at least one language")));
    }
    Ok(out)
}

/// Trims user text and enforces a non-empty, bounded body.
pub fn content(raw: &str, max_chars: usize, what: &str) -> AppResult<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(AppError::new(ErrorCode::ContentEmpty, format!("{what} cannot be empty")));
    }
    if text.chars().count() > max_chars {
        return Err(AppError::new(
            ErrorCode::ContentTooLong,
            format!("{what} cannot exceed {max_chars} characters"),
        ));
    }
    Ok(text.to_string())
}

/// Optional note on a friend request; checked on the trimmed text.
pub fn friend_message(message: &str) -> Result<(), validator::ValidationError> {
    if message.trim().chars().count() > FRIEND_MESSAGE_MAX_CHARS {
        let mut err = validator::ValidationError::new("length");
        err.message = Some(format!("message cannot exceed {FRIEND_MESSAGE_MAX_CHARS} characters").into());
        return Err(err);
    }
    Ok(())
}

/// Free-text lists (book titles, hobby ids): trimmed, empties dropped.
pub fn text_list(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

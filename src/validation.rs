// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Username validation.
//!
//! Rules:
//! - Length: 3-20 characters
//! - Characters: ASCII letters, digits, underscores
//! - Must start with a letter
//!
//! Input typed by the user is normalized first (whitespace removed,
//! lowercased) and stored in that form.

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 20;

/// Why a username candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UsernameError {
    #[error("username is required")]
    Empty,
    #[error("username must be at least 3 characters")]
    TooShort,
    #[error("username cannot be longer than 20 characters")]
    TooLong,
    #[error("username may only contain letters, numbers and underscores")]
    InvalidCharacters,
    #[error("username must start with a letter")]
    MustStartWithLetter,
}

/// Check a username as-is, without normalizing it.
pub fn validate_username(text: &str) -> Result<(), UsernameError> {
    if text.trim().is_empty() {
        return Err(UsernameError::Empty);
    }

    let len = text.chars().count();
    if len < MIN_USERNAME_LENGTH {
        return Err(UsernameError::TooShort);
    }
    if len > MAX_USERNAME_LENGTH {
        return Err(UsernameError::TooLong);
    }

    if !text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(UsernameError::InvalidCharacters);
    }

    match text.chars().next() {
        Some(first) if first.is_ascii_alphabetic() => Ok(()),
        _ => Err(UsernameError::MustStartWithLetter),
    }
}

/// Strip all whitespace and lowercase.
pub fn normalize_username(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A normalized, validated username.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Normalize `raw` and validate the result.
    pub fn parse(raw: &str) -> Result<Self, UsernameError> {
        let normalized = normalize_username(raw);
        validate_username(&normalized)?;
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

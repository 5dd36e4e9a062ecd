//! Parsing and normalization of user-entered text.
//!
//! Order ids arrive in many shapes ("cn 12345", "KR–77a", "cn_1001"), and
//! usernames, phones and postcodes are typed by hand. Everything stored or
//! compared goes through these functions first.

use std::{ops::Range, sync::LazyLock};

use regex::Regex;

use crate::{error::ValidationError, models::Country};

static ORDER_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([A-ZА-Я]{1,3})[ \-–—_]*([A-Z0-9]{2,})").expect("order id pattern compiles")
});

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z0-9_]{5,})").expect("username pattern compiles"));

/// Normalizes text into a `PREFIX-SUFFIX` order id.
///
/// The prefix is one to three letters (latin or cyrillic) and the suffix at
/// least two alphanumerics, with optional spaces, dashes or underscores in
/// between. Text that already looks like `LEFT-RIGHT` with an alphabetic
/// left side is accepted with junk stripped from the right side.
///
/// # Examples
///
/// ```
/// use seabluu_core::parse::extract_order_id;
///
/// assert_eq!(extract_order_id("cn 12345").as_deref(), Some("CN-12345"));
/// assert_eq!(extract_order_id("87001234567"), None);
/// ```
pub fn extract_order_id(input: &str) -> Option<String> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(caps) = ORDER_ID_RE.captures(s) {
        return Some(format!("{}-{}", caps[1].to_uppercase(), caps[2].to_uppercase()));
    }

    let (left, right) = s.split_once('-')?;
    let (left, right) = (left.trim(), right.trim());
    let left_alpha = left.chars().filter(|c| *c != '_' && *c != ' ').collect::<String>();
    if left_alpha.is_empty() || right.is_empty() || !left_alpha.chars().all(char::is_alphabetic) {
        return None;
    }
    let right_norm: String = right.chars().filter(char::is_ascii_alphanumeric).collect();
    if right_norm.is_empty() {
        return None;
    }
    Some(format!("{}-{}", left.to_uppercase(), right_norm.to_uppercase()))
}

/// Trims, strips a leading `@` and lowercases.
pub fn normalize_username(input: &str) -> String {
    input.trim().trim_start_matches('@').to_lowercase()
}

/// Collects every `@username` (five or more word characters), normalized,
/// in order of appearance.
pub fn extract_usernames(text: &str) -> Vec<String> {
    USERNAME_RE.captures_iter(text).map(|caps| normalize_username(&caps[1])).collect()
}

/// Keeps only ASCII digits.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Splits on commas and whitespace, dropping empty pieces.
pub fn split_tokens(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extracts every order id from a comma or whitespace separated list.
pub fn extract_order_ids(input: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for token in split_tokens(input) {
        if let Some(oid) = extract_order_id(&token) {
            if !ids.contains(&oid) {
                ids.push(oid);
            }
        }
    }
    ids
}

/// Normalizes a Kazakhstan mobile number to `8XXXXXXXXXX`.
///
/// # Errors
///
/// Returns `ValidationError::InvalidPhone` unless the result is eleven
/// digits starting with 8.
pub fn normalize_phone(input: &str) -> Result<String, ValidationError> {
    let compact: String = input.trim().chars().filter(|c| *c != ' ' && *c != '-').collect();
    let normalized = if let Some(rest) = compact.strip_prefix("+7") {
        format!("8{rest}")
    } else if let Some(rest) = compact.strip_prefix('7') {
        format!("8{rest}")
    } else {
        compact
    };

    let valid = normalized.len() == 11
        && normalized.starts_with('8')
        && normalized.chars().all(|c| c.is_ascii_digit());
    if valid {
        Ok(normalized)
    } else {
        Err(ValidationError::InvalidPhone { input: input.to_string() })
    }
}

/// Accepts five or six ASCII digits.
///
/// # Errors
///
/// Returns `ValidationError::InvalidPostcode` otherwise.
pub fn validate_postcode(input: &str) -> Result<String, ValidationError> {
    let s = input.trim();
    if (5..=6).contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit()) {
        Ok(s.to_string())
    } else {
        Err(ValidationError::InvalidPostcode { input: input.to_string() })
    }
}

/// Reads a warehouse origin from the first two letters of the input.
///
/// # Errors
///
/// Returns `ValidationError::UnsupportedOrigin` for anything but CN or KR.
pub fn parse_origin(input: &str) -> Result<Country, ValidationError> {
    let prefix: String = input.trim().chars().take(2).collect();
    Country::from_code(&prefix)
        .ok_or_else(|| ValidationError::UnsupportedOrigin { origin: input.trim().to_string() })
}

/// What a free-text search query most likely refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// `@username`
    Username,
    /// Order id
    OrderId,
    /// Phone number
    Phone,
}

impl QueryKind {
    /// Guesses the query kind.
    pub fn guess(query: &str) -> Self {
        let q = query.trim();
        if q.starts_with('@') {
            Self::Username
        } else if extract_order_id(q).is_some() {
            Self::OrderId
        } else if digits_only(q).len() >= 6 {
            Self::Phone
        } else {
            Self::OrderId
        }
    }
}

/// A page window over a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSlice {
    /// Zero-based page after clamping.
    pub page: usize,
    /// Total number of pages, at least one.
    pub pages: usize,
    /// Index range of the page's items.
    pub range: Range<usize>,
}

/// Clamps `page` into bounds and returns the slice of `len` items it covers.
pub fn slice_page(len: usize, page: usize, per_page: usize) -> PageSlice {
    let per_page = per_page.max(1);
    let pages = len.div_ceil(per_page).max(1);
    let page = page.min(pages - 1);
    let start = (page * per_page).min(len);
    let end = (start + per_page).min(len);
    PageSlice { page, pages, range: start..end }
}

use once_cell::sync::Lazy;
use regex::Regex;
use crate::models::{Size, VoteInput};

pub const SIZE_UNITS: [&str; 3] = ["em", "ex", "rem"];

// One or two `{number}{unit}` groups, separated by whitespace.
static SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    let group = format!(r"[0-9]*\.?[0-9]+\s*(?:{})", SIZE_UNITS.join("|"));
    Regex::new(&format!(r"^{group}(?:\s+{group})?$")).expect("valid size regex")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid sizes: {}", join_sizes(.0))]
    InvalidSizes(Vec<Size>),
}

fn join_sizes(sizes: &[Size]) -> String {
    sizes.iter().map(|size| size.as_str()).collect::<Vec<_>>().join(", ")
}

/// Returns true if `size` is a CSS-like length such as `12ex`, `.5 em` or
/// `1rem 0.2em`.
pub fn is_valid_size(size: &str) -> bool {
    SIZE_RE.is_match(size)
}

/// Size fields of `vote` whose value fails the grammar, in input order.
///
/// Fields missing from the input are not checked. A null value clears the
/// field and is accepted.
pub fn invalid_fields(vote: &VoteInput) -> Vec<Size> {
    vote.fields
        .iter()
        .filter(|(_, value)| value.as_deref().is_some_and(|v| !is_valid_size(v)))
        .map(|(size, _)| *size)
        .collect()
}

pub fn is_valid_vote(vote: &VoteInput) -> bool {
    invalid_fields(vote).is_empty()
}

pub fn validate_vote(vote: &VoteInput) -> Result<(), ValidationError> {
    let invalid = invalid_fields(vote);
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::InvalidSizes(invalid))
    }
}

use serde::de::{Error as _, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the five size fields a participant votes on.
///
/// The declaration order is the fixed total order used when sorting
/// aggregated groups (`Huge < Large < Medium < Small < Tiny`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Huge,
    Large,
    Medium,
    Small,
    Tiny,
}

impl Size {
    /// Column order of the votes table.
    pub const ALL: [Size; 5] = [Size::Tiny, Size::Small, Size::Medium, Size::Large, Size::Huge];

    pub const fn as_str(self) -> &'static str {
        match self {
            Size::Tiny => "tiny",
            Size::Small => "small",
            Size::Medium => "medium",
            Size::Large => "large",
            Size::Huge => "huge",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Size {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Size::ALL
            .into_iter()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| format!("unknown size: {s}"))
    }
}

/// Which voting context a table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Board {
    Grid,
    Table,
}

impl Board {
    pub const ALL: [Board; 2] = [Board::Grid, Board::Table];

    pub const fn as_str(self) -> &'static str {
        match self {
            Board::Grid => "grid",
            Board::Table => "table",
        }
    }

    pub const fn table_name(self) -> &'static str {
        match self {
            Board::Grid => "grid_votes",
            Board::Table => "table_votes",
        }
    }
}

impl FromStr for Board {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::ALL
            .into_iter()
            .find(|board| board.as_str() == s)
            .ok_or_else(|| format!("unknown board: {s}"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "backend", derive(sqlx::FromRow))]
pub struct SizeValues {
    pub tiny: Option<String>,
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
    pub huge: Option<String>,
}

impl SizeValues {
    pub fn get(&self, size: Size) -> Option<&str> {
        match size {
            Size::Tiny => self.tiny.as_deref(),
            Size::Small => self.small.as_deref(),
            Size::Medium => self.medium.as_deref(),
            Size::Large => self.large.as_deref(),
            Size::Huge => self.huge.as_deref(),
        }
    }
}

/// A stored vote: one row per participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "backend", derive(sqlx::FromRow))]
pub struct Vote {
    pub name: String,
    #[serde(flatten)]
    #[cfg_attr(feature = "backend", sqlx(flatten))]
    pub sizes: SizeValues,
}

impl Vote {
    pub fn new(name: impl Into<String>, sizes: SizeValues) -> Self {
        Self { name: name.into(), sizes }
    }
}

/// A vote as submitted for writing.
///
/// Only the size fields present in the submission are listed, in the order
/// they were given. `None` values are explicit nulls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteInput {
    pub name: Option<String>,
    pub fields: Vec<(Size, Option<String>)>,
}

impl VoteInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), fields: Vec::new() }
    }

    /// Sets a field, replacing an earlier value for the same size in place.
    pub fn with(mut self, size: Size, value: Option<&str>) -> Self {
        let value = value.map(str::to_owned);
        match self.fields.iter_mut().find(|(s, _)| *s == size) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((size, value)),
        }
        self
    }

    pub fn get(&self, size: Size) -> Option<Option<&str>> {
        self.fields
            .iter()
            .find(|(s, _)| *s == size)
            .map(|(_, value)| value.as_deref())
    }

    /// Adds every missing size field as an explicit null, so a following
    /// update overwrites the whole row.
    pub fn into_full(mut self) -> Self {
        for size in Size::ALL {
            if self.get(size).is_none() {
                self.fields.push((size, None));
            }
        }
        self
    }
}

impl From<Vote> for VoteInput {
    fn from(vote: Vote) -> Self {
        let fields = Size::ALL
            .into_iter()
            .map(|size| (size, vote.sizes.get(size).map(str::to_owned)))
            .collect();
        Self { name: Some(vote.name), fields }
    }
}

const FIELDS: &[&str] = &["name", "tiny", "small", "medium", "large", "huge"];

impl<'de> Deserialize<'de> for VoteInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VoteInputVisitor;

        impl<'de> Visitor<'de> for VoteInputVisitor {
            type Value = VoteInput;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a vote object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<VoteInput, A::Error> {
                let mut input = VoteInput::default();
                while let Some(key) = map.next_key::<String>()? {
                    if key == "name" {
                        input.name = map.next_value()?;
                        continue;
                    }
                    let size = key
                        .parse::<Size>()
                        .map_err(|_| A::Error::unknown_field(&key, FIELDS))?;
                    if input.get(size).is_some() {
                        return Err(A::Error::custom(format!("duplicate field `{size}`")));
                    }
                    let value: Option<String> = map.next_value()?;
                    input.fields.push((size, value));
                }
                Ok(input)
            }
        }

        deserializer.deserialize_map(VoteInputVisitor)
    }
}

/// Everyone who chose `value` for `size`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValueGroup {
    pub size: Size,
    pub value: String,
    pub voters: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpsertResult {
    pub name: String,
    pub created: bool,
}

#[cfg(feature = "backend")]
mod backend_impl {
    use super::Board;
    use rocket::request::FromParam;

    impl<'a> FromParam<'a> for Board {
        type Error = &'a str;

        fn from_param(param: &'a str) -> Result<Self, Self::Error> {
            param.parse().map_err(|_| param)
        }
    }
}

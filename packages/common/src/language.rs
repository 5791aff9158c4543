#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Programming languages accepted by the judge.
///
/// Checker uploads, problem language allow-lists and submissions all draw from
/// this closed set.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProgrammingLanguage {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "C"))]
    C,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CPP"))]
    Cpp,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "JAVA"))]
    Java,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "PYTHON"))]
    Python,
}

impl ProgrammingLanguage {
    pub const ALL: &'static [ProgrammingLanguage] = &[Self::C, Self::Cpp, Self::Java, Self::Python];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::C => "C",
            Self::Cpp => "CPP",
            Self::Java => "JAVA",
            Self::Python => "PYTHON",
        }
    }

    /// File extension used for single-file sources, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Java => "java",
            Self::Python => "py",
        }
    }
}

impl fmt::Display for ProgrammingLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing a language name outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLanguageError {
    invalid: String,
}

impl fmt::Display for ParseLanguageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid language '{}'. Valid values: {}",
            self.invalid,
            ProgrammingLanguage::ALL
                .iter()
                .map(|l| l.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseLanguageError {}

impl FromStr for ProgrammingLanguage {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C" => Ok(Self::C),
            "CPP" => Ok(Self::Cpp),
            "JAVA" => Ok(Self::Java),
            "PYTHON" => Ok(Self::Python),
            _ => Err(ParseLanguageError {
                invalid: s.to_string(),
            }),
        }
    }
}

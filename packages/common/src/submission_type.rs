#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of the payload a problem accepts.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionType {
    /// One inline source file.
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "SINGLE_FILE"))]
    SingleFile,
    /// A zip archive containing a project.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "MULTI_FILE"))]
    MultiFile,
    /// A function body merged into a teacher-provided template.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "FUNCTION_ONLY"))]
    FunctionOnly,
}

impl SubmissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleFile => "SINGLE_FILE",
            Self::MultiFile => "MULTI_FILE",
            Self::FunctionOnly => "FUNCTION_ONLY",
        }
    }

    /// Whether the payload arrives as an archive rather than inline source.
    pub fn expects_archive(&self) -> bool {
        matches!(self, Self::MultiFile)
    }
}

impl fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

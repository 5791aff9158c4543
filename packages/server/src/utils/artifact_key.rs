//! Object-storage key layout for every artifact kind.
//!
//! Keys are a pure function of their inputs so the same artifact always lands
//! at the same place, and re-uploads overwrite in place.

use common::ProgrammingLanguage;
use thiserror::Error;
use uuid::Uuid;

use crate::config::BucketConfig;
use crate::utils::filename::validate_artifact_filename;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Checker,
    Template,
    Makefile,
    Testdata,
    SubmissionSource,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArtifactKeyError {
    #[error("display id must be non-empty [A-Za-z0-9_-]: {0:?}")]
    InvalidDisplayId(String),
    #[error("{0}")]
    InvalidFilename(&'static str),
    #[error("testdata version must be positive, got {0}")]
    InvalidVersion(i32),
}

/// An artifact whose storage key can be resolved.
#[derive(Debug, Clone, Copy)]
pub enum Artifact<'a> {
    Checker { display_id: &'a str, filename: &'a str },
    Template { display_id: &'a str, filename: &'a str },
    Makefile { display_id: &'a str },
    Testdata { problem_id: i32, version: i32 },
    /// `language` is `Some` for inline sources and `None` for archives.
    SubmissionSource {
        id: Uuid,
        language: Option<ProgrammingLanguage>,
    },
}

impl Artifact<'_> {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Checker { .. } => ArtifactKind::Checker,
            Artifact::Template { .. } => ArtifactKind::Template,
            Artifact::Makefile { .. } => ArtifactKind::Makefile,
            Artifact::Testdata { .. } => ArtifactKind::Testdata,
            Artifact::SubmissionSource { .. } => ArtifactKind::SubmissionSource,
        }
    }

    pub fn key(&self) -> Result<String, ArtifactKeyError> {
        match *self {
            Artifact::Checker {
                display_id,
                filename,
            } => Ok(format!(
                "checkers/{}/{}",
                checked_display_id(display_id)?,
                checked_filename(filename)?
            )),
            Artifact::Template {
                display_id,
                filename,
            } => Ok(format!(
                "templates/{}/{}",
                checked_display_id(display_id)?,
                checked_filename(filename)?
            )),
            Artifact::Makefile { display_id } => Ok(format!(
                "makefiles/{}/Makefile",
                checked_display_id(display_id)?
            )),
            Artifact::Testdata {
                problem_id,
                version,
            } => {
                if version < 1 {
                    return Err(ArtifactKeyError::InvalidVersion(version));
                }
                Ok(format!("testdata/{problem_id}/v{version}/testdata.zip"))
            }
            Artifact::SubmissionSource { id, language } => Ok(match language {
                Some(lang) => format!("submissions/{id}/main.{}", lang.extension()),
                None => format!("submissions/{id}/source.zip"),
            }),
        }
    }
}

impl BucketConfig {
    pub fn bucket_for(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Checker => &self.checkers,
            ArtifactKind::Template => &self.templates,
            ArtifactKind::Makefile => &self.makefiles,
            ArtifactKind::Testdata => &self.testdata,
            ArtifactKind::SubmissionSource => &self.submissions,
        }
    }
}

fn checked_display_id(display_id: &str) -> Result<&str, ArtifactKeyError> {
    if display_id.is_empty()
        || !display_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
    {
        return Err(ArtifactKeyError::InvalidDisplayId(display_id.to_string()));
    }
    Ok(display_id)
}

fn checked_filename(filename: &str) -> Result<&str, ArtifactKeyError> {
    validate_artifact_filename(filename).map_err(|e| ArtifactKeyError::InvalidFilename(e.message()))
}

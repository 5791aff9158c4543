//! Shape checks for incoming submissions.
//!
//! Everything here is synchronous and free of I/O: the caller loads the
//! problem's rules, hands over the raw payload, and gets back either a
//! normalized shape ready for dispatch or a rejection with a stable code.

use std::io::Cursor;
use std::str::FromStr;

use common::judge_job::BuildPlan;
use common::{ProgrammingLanguage, SubmissionType};
use thiserror::Error;

use crate::entity::problem;
use crate::error::AppError;
use crate::utils::filename::{is_makefile_name, is_unsafe_entry_path};

/// Inline sources larger than this are rejected outright.
pub const MAX_INLINE_SOURCE_BYTES: usize = 1024 * 1024;

/// What the caller sent.
#[derive(Debug, Clone, Copy)]
pub enum SubmissionPayload<'a> {
    Inline(&'a str),
    Archive(&'a [u8]),
}

impl SubmissionPayload<'_> {
    fn describe(&self) -> &'static str {
        match self {
            SubmissionPayload::Inline(_) => "inline source",
            SubmissionPayload::Archive(_) => "an archive",
        }
    }
}

/// The slice of problem configuration the validator needs.
#[derive(Debug, Clone)]
pub struct SubmissionRules<'a> {
    pub submission_type: SubmissionType,
    pub allowed_languages: Vec<ProgrammingLanguage>,
    pub template_key: Option<&'a str>,
    pub makefile_key: Option<&'a str>,
}

impl<'a> SubmissionRules<'a> {
    pub fn from_problem(problem: &'a problem::Model) -> Self {
        Self {
            submission_type: problem.submission_type,
            allowed_languages: problem.allowed_languages(),
            template_key: problem.template_key.as_deref(),
            makefile_key: problem.makefile_key.as_deref(),
        }
    }
}

/// A payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedSubmission {
    SingleFile,
    /// Code still has to be merged into the template at `template_key`.
    Function { template_key: String },
    Project { build: BuildPlan },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionRejection {
    #[error("{submission_type} problems do not accept {got}")]
    TypeMismatch {
        submission_type: SubmissionType,
        got: &'static str,
    },
    #[error("language '{0}' is not allowed for this problem")]
    LanguageNotAllowed(String),
    #[error("source must not be empty")]
    EmptySource,
    #[error("source exceeds 1 MiB")]
    SourceTooLarge,
    #[error("no template is configured for this problem")]
    TemplateNotConfigured,
    #[error("invalid archive: {0}")]
    InvalidArchive(String),
}

impl SubmissionRejection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TypeMismatch { .. } => "SUBMISSION_TYPE_MISMATCH",
            Self::LanguageNotAllowed(_) => "LANGUAGE_NOT_ALLOWED",
            Self::EmptySource | Self::SourceTooLarge => "VALIDATION_ERROR",
            Self::TemplateNotConfigured => "TEMPLATE_NOT_CONFIGURED",
            Self::InvalidArchive(_) => "INVALID_ARCHIVE",
        }
    }
}

impl From<SubmissionRejection> for AppError {
    fn from(rejection: SubmissionRejection) -> Self {
        AppError::bad_request(rejection.code(), rejection.to_string())
    }
}

/// Check a submission against the problem's rules.
///
/// Checks run in a fixed order: payload shape, language, then content.
pub fn validate_submission(
    rules: &SubmissionRules<'_>,
    language: &str,
    payload: SubmissionPayload<'_>,
) -> Result<(ProgrammingLanguage, NormalizedSubmission), SubmissionRejection> {
    let shape_ok = match payload {
        SubmissionPayload::Inline(_) => !rules.submission_type.expects_archive(),
        SubmissionPayload::Archive(_) => rules.submission_type.expects_archive(),
    };
    if !shape_ok {
        return Err(SubmissionRejection::TypeMismatch {
            submission_type: rules.submission_type,
            got: payload.describe(),
        });
    }

    let language = ProgrammingLanguage::from_str(language)
        .ok()
        .filter(|lang| rules.allowed_languages.contains(lang))
        .ok_or_else(|| SubmissionRejection::LanguageNotAllowed(language.trim().to_string()))?;

    let normalized = match payload {
        SubmissionPayload::Inline(source) => {
            check_inline_source(source)?;
            match rules.submission_type {
                SubmissionType::FunctionOnly => {
                    let template_key = rules
                        .template_key
                        .ok_or(SubmissionRejection::TemplateNotConfigured)?;
                    NormalizedSubmission::Function {
                        template_key: template_key.to_string(),
                    }
                }
                _ => NormalizedSubmission::SingleFile,
            }
        }
        SubmissionPayload::Archive(data) => {
            let archive_has_makefile = inspect_project_archive(data)?;
            let build = match (rules.makefile_key, archive_has_makefile) {
                (Some(key), _) => BuildPlan::ProblemMakefile {
                    makefile_key: key.to_string(),
                },
                (None, true) => BuildPlan::ArchiveMakefile,
                (None, false) => BuildPlan::Default,
            };
            NormalizedSubmission::Project { build }
        }
    };

    Ok((language, normalized))
}

fn check_inline_source(source: &str) -> Result<(), SubmissionRejection> {
    if source.trim().is_empty() {
        return Err(SubmissionRejection::EmptySource);
    }
    if source.len() > MAX_INLINE_SOURCE_BYTES {
        return Err(SubmissionRejection::SourceTooLarge);
    }
    Ok(())
}

/// Validate a project zip and report whether it has a top-level Makefile.
fn inspect_project_archive(data: &[u8]) -> Result<bool, SubmissionRejection> {
    let invalid = |msg: String| SubmissionRejection::InvalidArchive(msg);

    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).map_err(|e| invalid(e.to_string()))?;

    let mut files = 0usize;
    let mut has_makefile = false;
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| invalid(e.to_string()))?;
        let name = entry.name();
        if is_unsafe_entry_path(name) {
            return Err(invalid(format!("unsafe path '{name}'")));
        }
        if entry.is_symlink() {
            return Err(invalid(format!("symlink '{name}' is not allowed")));
        }
        if entry.is_dir() {
            continue;
        }
        files += 1;
        if !name.contains('/') && is_makefile_name(name) {
            has_makefile = true;
        }
    }

    if files == 0 {
        return Err(invalid("archive contains no files".into()));
    }
    Ok(has_makefile)
}

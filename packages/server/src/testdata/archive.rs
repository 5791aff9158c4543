//! Inspection and repacking of testdata archives.
//!
//! Every upload path ends in a [`PreparedTestdata`]: an archive that passed
//! the safety checks and a validated manifest whose referenced files are all
//! present. The archive handed to storage always carries the manifest at
//! `manifest.json`.

use std::collections::BTreeSet;
use std::io::{Cursor, Read, Seek, Write};

use common::manifest::{ManifestError, MAX_CASES, MIN_MEMORY_LIMIT_KB, MIN_TIME_LIMIT_MS};
use common::{TestdataCase, TestdataManifest};
use thiserror::Error;
use zip::ZipArchive;
use zip::write::SimpleFileOptions;

use crate::error::AppError;
use crate::models::testdata::SubtaskConfig;
use crate::utils::filename::is_unsafe_entry_path;

/// Compressed upload limit (100 MB).
pub const MAX_ZIP_BYTES: usize = 100 * 1024 * 1024;
/// Limit on the sum of declared uncompressed entry sizes (100 MB).
pub const MAX_UNCOMPRESSED_BYTES: u64 = 100 * 1024 * 1024;
pub const MAX_SUBTASKS: usize = 100;
pub const MANIFEST_NAME: &str = "manifest.json";

const MAX_SUBTASK_TIME_LIMIT_MS: u32 = 60_000;
const MAX_SUBTASK_MEMORY_LIMIT_KB: u32 = 1_048_576;
/// How many missing files an error message lists before summarizing.
const MISSING_FILES_SHOWN: usize = 10;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive is {size} bytes, the limit is 100 MB")]
    TooLarge { size: usize },
    #[error("not a readable zip archive: {0}")]
    Unreadable(String),
    #[error("archive expands beyond 100 MB")]
    UncompressedTooLarge,
    #[error("unsafe path in archive: '{0}'")]
    UnsafePath(String),
    #[error("symlinks are not allowed: '{0}'")]
    Symlink(String),
    #[error("archive has no manifest.json and no manifest was supplied")]
    ManifestMissing,
    #[error("manifest is not valid JSON: {0}")]
    ManifestSyntax(String),
    #[error("manifest: {0}")]
    Manifest(#[from] ManifestError),
    #[error("{}", missing_files_message(.0))]
    MissingFiles(Vec<String>),
    #[error("manifest references a directory: '{0}'")]
    DirectoryReferenced(String),
    #[error("subtask config: {0}")]
    SubtaskConfig(String),
}

fn missing_files_message(files: &[String]) -> String {
    let shown = files
        .iter()
        .take(MISSING_FILES_SHOWN)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if files.len() > MISSING_FILES_SHOWN {
        format!(
            "missing files: {shown} and {} more",
            files.len() - MISSING_FILES_SHOWN
        )
    } else {
        format!("missing files: {shown}")
    }
}

impl ArchiveError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ManifestMissing
            | Self::ManifestSyntax(_)
            | Self::Manifest(_)
            | Self::MissingFiles(_)
            | Self::DirectoryReferenced(_)
            | Self::SubtaskConfig(_) => "MANIFEST_INVALID",
            _ => "INVALID_ARCHIVE",
        }
    }
}

impl From<ArchiveError> for AppError {
    fn from(err: ArchiveError) -> Self {
        AppError::bad_request(err.code(), err.to_string())
    }
}

/// An archive ready to be stored as a new testdata version.
#[derive(Debug)]
pub struct PreparedTestdata {
    pub zip: Vec<u8>,
    pub manifest: TestdataManifest,
}

/// Names of the archive's entries, split by kind.
struct Listing {
    files: BTreeSet<String>,
    dirs: BTreeSet<String>,
}

fn open(data: &[u8]) -> Result<(ZipArchive<Cursor<&[u8]>>, Listing), ArchiveError> {
    if data.len() > MAX_ZIP_BYTES {
        return Err(ArchiveError::TooLarge { size: data.len() });
    }
    let mut archive =
        ZipArchive::new(Cursor::new(data)).map_err(|e| ArchiveError::Unreadable(e.to_string()))?;

    let mut listing = Listing {
        files: BTreeSet::new(),
        dirs: BTreeSet::new(),
    };
    let mut total: u64 = 0;
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| ArchiveError::Unreadable(e.to_string()))?;
        let name = entry.name().to_string();
        if is_unsafe_entry_path(&name) {
            return Err(ArchiveError::UnsafePath(name));
        }
        if entry.is_symlink() {
            return Err(ArchiveError::Symlink(name));
        }
        total = total.saturating_add(entry.size());
        if total > MAX_UNCOMPRESSED_BYTES {
            return Err(ArchiveError::UncompressedTooLarge);
        }
        if entry.is_dir() {
            listing.dirs.insert(name.trim_end_matches('/').to_string());
        } else {
            listing.files.insert(name);
        }
    }
    Ok((archive, listing))
}

/// Read one entry fully, refusing to inflate past the uncompressed limit.
fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, ArchiveError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ArchiveError::Unreadable(format!("{name}: {e}")))?;
    let mut buf = Vec::new();
    entry
        .take(MAX_UNCOMPRESSED_BYTES + 1)
        .read_to_end(&mut buf)
        .map_err(|e| ArchiveError::Unreadable(format!("{name}: {e}")))?;
    if buf.len() as u64 > MAX_UNCOMPRESSED_BYTES {
        return Err(ArchiveError::UncompressedTooLarge);
    }
    Ok(buf)
}

fn parse_manifest(bytes: &[u8]) -> Result<TestdataManifest, ArchiveError> {
    let manifest: TestdataManifest =
        serde_json::from_slice(bytes).map_err(|e| ArchiveError::ManifestSyntax(e.to_string()))?;
    manifest.validate()?;
    Ok(manifest)
}

fn check_references(manifest: &TestdataManifest, listing: &Listing) -> Result<(), ArchiveError> {
    let mut missing = Vec::new();
    for path in manifest.referenced_files() {
        if listing.dirs.contains(path) {
            return Err(ArchiveError::DirectoryReferenced(path.to_string()));
        }
        if !listing.files.contains(path) && !missing.iter().any(|m| m == path) {
            missing.push(path.to_string());
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ArchiveError::MissingFiles(missing))
    }
}

/// Copy every file except an existing manifest, then append `manifest`.
fn repack<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    listing: &Listing,
    manifest: &TestdataManifest,
) -> Result<Vec<u8>, ArchiveError> {
    let write_err = |e: zip::result::ZipError| ArchiveError::Unreadable(e.to_string());
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for name in listing.files.iter().filter(|n| n.as_str() != MANIFEST_NAME) {
        let data = read_entry(archive, name)?;
        writer.start_file(name.as_str(), options).map_err(write_err)?;
        writer
            .write_all(&data)
            .map_err(|e| ArchiveError::Unreadable(e.to_string()))?;
    }

    let json = serde_json::to_vec_pretty(manifest)
        .map_err(|e| ArchiveError::ManifestSyntax(e.to_string()))?;
    writer.start_file(MANIFEST_NAME, options).map_err(write_err)?;
    writer
        .write_all(&json)
        .map_err(|e| ArchiveError::Unreadable(e.to_string()))?;

    Ok(writer.finish().map_err(write_err)?.into_inner())
}

/// Prepare a zip upload. The manifest comes from `manifest_override` when
/// given (the archive is then repacked around it), otherwise from the
/// archive's own `manifest.json`.
pub fn prepare_upload(
    data: &[u8],
    manifest_override: Option<&str>,
) -> Result<PreparedTestdata, ArchiveError> {
    let (mut archive, listing) = open(data)?;

    match manifest_override {
        Some(json) => {
            let manifest = parse_manifest(json.as_bytes())?;
            check_references(&manifest, &listing)?;
            let zip = repack(&mut archive, &listing, &manifest)?;
            Ok(PreparedTestdata { zip, manifest })
        }
        None => {
            if !listing.files.contains(MANIFEST_NAME) {
                return Err(ArchiveError::ManifestMissing);
            }
            let manifest = parse_manifest(&read_entry(&mut archive, MANIFEST_NAME)?)?;
            check_references(&manifest, &listing)?;
            Ok(PreparedTestdata {
                zip: data.to_vec(),
                manifest,
            })
        }
    }
}

fn case_stem(subtask: usize, case: usize) -> String {
    format!("{subtask:02}{case:02}")
}

fn validate_subtask_config(config: &SubtaskConfig) -> Result<(), ArchiveError> {
    let bad = |msg: String| Err(ArchiveError::SubtaskConfig(msg));

    if config.subtasks.is_empty() {
        return bad("at least one subtask is required".into());
    }
    if config.subtasks.len() > MAX_SUBTASKS {
        return bad(format!("at most {MAX_SUBTASKS} subtasks are allowed"));
    }
    if !(MIN_TIME_LIMIT_MS..=MAX_SUBTASK_TIME_LIMIT_MS).contains(&config.default_time_limit_ms) {
        return bad("defaultTimeLimitMs must be between 100 and 60000".into());
    }
    if !(MIN_MEMORY_LIMIT_KB..=MAX_SUBTASK_MEMORY_LIMIT_KB)
        .contains(&config.default_memory_limit_kb)
    {
        return bad("defaultMemoryLimitKb must be between 1024 and 1048576".into());
    }

    let mut total_cases: usize = 0;
    for (index, subtask) in config.subtasks.iter().enumerate() {
        if !(1..=MAX_CASES as u32).contains(&subtask.case_count) {
            return bad(format!("subtask {index}: caseCount must be between 1 and 100"));
        }
        if let Some(tl) = subtask.time_limit_ms
            && !(MIN_TIME_LIMIT_MS..=MAX_SUBTASK_TIME_LIMIT_MS).contains(&tl)
        {
            return bad(format!("subtask {index}: timeLimitMs must be between 100 and 60000"));
        }
        if let Some(ml) = subtask.memory_limit_kb
            && !(MIN_MEMORY_LIMIT_KB..=MAX_SUBTASK_MEMORY_LIMIT_KB).contains(&ml)
        {
            return bad(format!(
                "subtask {index}: memoryLimitKb must be between 1024 and 1048576"
            ));
        }
        total_cases += subtask.case_count as usize;
    }
    if total_cases > MAX_CASES {
        return bad(format!("total case count {total_cases} exceeds {MAX_CASES}"));
    }
    if config.subtasks[0].points != 0 {
        return bad("subtask 0 holds the samples and must carry 0 points".into());
    }
    Ok(())
}

/// Build the manifest for a subtask upload.
///
/// Cases are `sstt.in` / `sstt.out`. A subtask's points are split evenly over
/// its cases with the remainder going to the first ones. Subtask 0 is the
/// sample subtask.
pub fn generate_subtask_manifest(config: &SubtaskConfig) -> Result<TestdataManifest, ArchiveError> {
    validate_subtask_config(config)?;

    let mut cases = Vec::new();
    for (s, subtask) in config.subtasks.iter().enumerate() {
        let count = subtask.case_count;
        let per_case = subtask.points / count;
        let remainder = subtask.points % count;
        for t in 0..count {
            let stem = case_stem(s, t as usize);
            cases.push(TestdataCase {
                name: format!("Subtask {} - Case {}", s + 1, t + 1),
                input_file: format!("{stem}.in"),
                output_file: format!("{stem}.out"),
                points: f64::from(per_case + u32::from(t < remainder)),
                is_sample: s == 0,
                time_limit_ms: subtask.time_limit_ms,
                memory_limit_kb: subtask.memory_limit_kb,
            });
        }
    }

    let manifest = TestdataManifest {
        version: "1.0".into(),
        cases,
        default_time_limit_ms: config.default_time_limit_ms,
        default_memory_limit_kb: config.default_memory_limit_kb,
    };
    manifest.validate()?;
    Ok(manifest)
}

/// Prepare a subtask upload: generate the manifest, check every `sstt` file
/// is present, and repack with `manifest.json`.
pub fn prepare_subtask_upload(
    data: &[u8],
    config: &SubtaskConfig,
) -> Result<PreparedTestdata, ArchiveError> {
    let manifest = generate_subtask_manifest(config)?;
    let (mut archive, listing) = open(data)?;
    check_references(&manifest, &listing)?;
    let zip = repack(&mut archive, &listing, &manifest)?;
    Ok(PreparedTestdata { zip, manifest })
}

/// Read the given archive paths as UTF-8 text (lossy).
pub fn read_text_files(data: &[u8], paths: &[&str]) -> Result<Vec<String>, ArchiveError> {
    let mut archive =
        ZipArchive::new(Cursor::new(data)).map_err(|e| ArchiveError::Unreadable(e.to_string()))?;
    paths
        .iter()
        .map(|path| {
            read_entry(&mut archive, path).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        })
        .collect()
}

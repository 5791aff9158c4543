use thiserror::Error;

/// Replaced by the learner's code.
pub const CODE_MARKER: &str = "// STUDENT_CODE_HERE";
/// Everything between these two lines is replaced; the lines themselves stay.
pub const REGION_START: &str = "// === STUDENT_CODE_START ===";
pub const REGION_END: &str = "// === STUDENT_CODE_END ===";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("template has no `// STUDENT_CODE_HERE` marker and no student code region")]
pub struct MarkerMissing;

/// Merge learner code into a FUNCTION_ONLY template.
///
/// The single-line marker wins when both styles are present. Only the first
/// occurrence of either is used.
pub fn merge_template(template: &str, code: &str) -> Result<String, MarkerMissing> {
    if template.contains(CODE_MARKER) {
        return Ok(template.replacen(CODE_MARKER, code, 1));
    }

    if let (Some(start), Some(end)) = (template.find(REGION_START), template.find(REGION_END))
        && start < end
    {
        let before = &template[..start + REGION_START.len()];
        let after = &template[end..];
        return Ok(format!("{before}\n{code}\n{after}"));
    }

    Err(MarkerMissing)
}

pub fn has_marker(template: &str) -> bool {
    merge_template(template, "").is_ok()
}

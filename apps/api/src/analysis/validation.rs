use crate::errors::AppError;

/// Minimum usable length for each input text, counted on the trimmed text so
/// padding cannot smuggle a short input past the check. Checked before any
/// hashing or tier work.
pub const MIN_INPUT_CHARS: usize = 50;

pub fn validate_analysis_input(resume_text: &str, jd_text: &str) -> Result<(), AppError> {
    check_field("resumeText", resume_text)?;
    check_field("jobDescText", jd_text)?;
    Ok(())
}

fn check_field(field: &str, text: &str) -> Result<(), AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() < MIN_INPUT_CHARS {
        return Err(AppError::Validation(format!(
            "{field} must be at least {MIN_INPUT_CHARS} characters"
        )));
    }
    Ok(())
}

use std::borrow::Cow;

use validator::ValidationError;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Repetition prescription: a count ("12"), a range ("8-12"), or a hold in seconds ("30s").
pub fn validate_reps(reps: &str) -> Result<(), ValidationError> {
    let reps = reps.trim();
    if reps.is_empty() || reps.len() > 50 {
        return Err(invalid("reps", "Reps cannot be empty or longer than 50 characters"));
    }

    let is_count = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

    let valid = match reps.split_once('-') {
        Some((low, high)) => is_count(low.trim()) && is_count(high.trim()),
        None => is_count(reps) || reps.strip_suffix('s').map(is_count).unwrap_or(false),
    };

    if !valid {
        return Err(invalid("reps", "Reps must look like 12, 8-12 or 30s"));
    }
    Ok(())
}

/// Exercise demonstration links must be http(s).
pub fn validate_video_url(url: &str) -> Result<(), ValidationError> {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(invalid("video_url", "Video URL must start with http:// or https://"));
    }
    if url.len() > 2048 {
        return Err(invalid("video_url", "Video URL cannot be longer than 2048 characters"));
    }
    Ok(())
}

/// Weekday numbers follow the calendar convention 0 = Sunday .. 6 = Saturday.
pub fn validate_weekdays(weekdays: &[u8]) -> Result<(), ValidationError> {
    if weekdays.iter().any(|day| *day > 6) {
        return Err(invalid("weekdays", "Weekdays must be between 0 (Sunday) and 6 (Saturday)"));
    }
    Ok(())
}

/// Password confirmation must match before anything is persisted.
pub fn validate_password_confirmation(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if password != confirmation {
        return Err(invalid("password_confirmation", "Password confirmation does not match"));
    }
    Ok(())
}

use crate::utils::error::{AppError, AppResult};

pub fn validate_filename(filename: &str) -> AppResult<()> {
    if filename.trim().is_empty() {
        return Err(AppError::Validation("Filename cannot be empty".to_string()));
    }

    if filename.len() > 255 {
        return Err(AppError::Validation(
            "Filename must be at most 255 bytes long".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_file_size(data: &[u8], max_bytes: usize) -> AppResult<()> {
    if data.is_empty() {
        return Err(AppError::Validation("File is empty".to_string()));
    }

    if data.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "File too large: {} bytes (max {} bytes)",
            data.len(),
            max_bytes
        )));
    }

    Ok(())
}

pub fn validate_expiry_minutes(minutes: i64, max_minutes: i64) -> AppResult<()> {
    if minutes < 1 || minutes > max_minutes {
        return Err(AppError::Validation(format!(
            "Expiration must be between 1 and {} minutes",
            max_minutes
        )));
    }

    Ok(())
}

//! Validation helpers shared by the draft types

use std::borrow::Cow;

use validator::ValidationError;

/// Reading speed used to estimate article read time.
pub const WORDS_PER_MINUTE: usize = 200;

/// Rejects values that are empty once surrounding whitespace is removed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some(Cow::Borrowed("is required"));
        return Err(err);
    }
    Ok(())
}

/// Estimated read time in whole minutes: ceil(words / 200).
pub fn read_time_minutes(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE) as u32
}

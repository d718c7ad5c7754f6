//! Centralized validation and helper functions.

/// Maximum number of contigs allowed in a single file (DOS protection)
pub const MAX_CONTIGS: usize = 100_000;

/// Largest accepted chunk size; bounds the per-chunk buffers.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Check if adding another contig would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new contig.
/// Returns an error message if adding would exceed the limit, None if safe to add.
///
/// # Example
/// ```ignore
/// if check_contig_limit(entries.len()).is_some() {
///     return Err(...);
/// }
/// entries.push(new_entry); // Safe to add
/// ```
#[must_use]
pub fn check_contig_limit(count: usize) -> Option<String> {
    if count >= MAX_CONTIGS {
        Some(format!(
            "Too many contigs: adding another would exceed maximum of {MAX_CONTIGS}"
        ))
    } else {
        None
    }
}

/// Validate the number of positions read per chunk.
///
/// # Errors
///
/// Returns a message if the size is zero or above [`MAX_CHUNK_SIZE`].
pub fn validate_chunk_size(size: usize) -> Result<usize, String> {
    match size {
        0 => Err("chunk size must be at least 1".to_string()),
        s if s > MAX_CHUNK_SIZE => Err(format!(
            "chunk size {s} exceeds maximum of {MAX_CHUNK_SIZE}"
        )),
        s => Ok(s),
    }
}

/// Validate the number of in-flight chunks.
///
/// # Errors
///
/// Returns a message if the capacity is zero.
pub fn validate_queue_capacity(capacity: usize) -> Result<usize, String> {
    if capacity == 0 {
        Err("queue capacity must be at least 1".to_string())
    } else {
        Ok(capacity)
    }
}

/// Validate a minimum allele proportion.
///
/// # Errors
///
/// Returns a message unless the value is a finite number in `0.0..=1.0`.
pub fn validate_proportion(proportion: f64) -> Result<f64, String> {
    if proportion.is_finite() && (0.0..=1.0).contains(&proportion) {
        Ok(proportion)
    } else {
        Err(format!("proportion must be between 0 and 1, got {proportion}"))
    }
}

/// Parse helpers with the signature clap's `value_parser` expects.
pub fn parse_chunk_size(s: &str) -> Result<usize, String> {
    let size = s.parse::<usize>().map_err(|e| format!("invalid chunk size '{s}': {e}"))?;
    validate_chunk_size(size)
}

pub fn parse_queue_capacity(s: &str) -> Result<usize, String> {
    let capacity = s
        .parse::<usize>()
        .map_err(|e| format!("invalid queue capacity '{s}': {e}"))?;
    validate_queue_capacity(capacity)
}

pub fn parse_proportion(s: &str) -> Result<f64, String> {
    let proportion = s
        .parse::<f64>()
        .map_err(|e| format!("invalid proportion '{s}': {e}"))?;
    validate_proportion(proportion)
}

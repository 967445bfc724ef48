use rand::Rng;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};

/// Uppercase alphanumerics minus the easily-confused O/0 and I/1; keeps
/// codes safe to read out over the phone.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;
pub const CODE_PREFIX: &str = "FF-";

const MAX_ATTEMPTS: usize = 5;

/// Produces a registration code like `FF-K7M2XQ`.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{CODE_PREFIX}{suffix}")
}

/// Allocates a code not currently held by any squad. The existence check is
/// an optimization; the unique constraint on `squads.registration_code` is
/// the real guarantee, and the registration insert re-rolls on violation.
pub async fn allocate_code(pool: &PgPool) -> AppResult<String> {
    for _ in 0..MAX_ATTEMPTS {
        let code = generate_code();
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM squads WHERE registration_code = $1)")
                .bind(&code)
                .fetch_one(pool)
                .await?;
        if !taken {
            return Ok(code);
        }
    }
    Err(AppError::Internal(
        "Could not allocate a unique registration code".into(),
    ))
}

pub fn is_valid_code_format(code: &str) -> bool {
    match code.strip_prefix(CODE_PREFIX) {
        Some(suffix) => {
            suffix.len() == CODE_LENGTH && suffix.bytes().all(|b| CODE_ALPHABET.contains(&b))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_codes_match_fixed_pattern() {
        for _ in 0..200 {
            let code = generate_code();
            assert!(is_valid_code_format(&code), "bad code: {code}");
        }
    }

    #[test]
    fn generated_codes_are_distinct_over_a_batch() {
        let codes: HashSet<String> = (0..500).map(|_| generate_code()).collect();
        assert_eq!(codes.len(), 500);
    }

    #[test]
    fn format_check_rejects_ambiguous_characters() {
        assert!(!is_valid_code_format("FF-K7M2X0"));
        assert!(!is_valid_code_format("FF-K7M2XO"));
        assert!(!is_valid_code_format("XX-K7M2XQ"));
        assert!(!is_valid_code_format("FF-K7M2X"));
    }
}

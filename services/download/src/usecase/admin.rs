use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::RngExt;

use crate::domain::repository::CodeRepository;
use crate::domain::types::{
    CODE_CHARSET, CODE_LEN, CodeStats, DownloadCode, MAX_GENERATE_COUNT,
};
use crate::error::DownloadServiceError;

pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

// ── GenerateCodes ────────────────────────────────────────────────────────────

pub struct GenerateCodesInput {
    pub count: u32,
}

pub struct GenerateCodesUseCase<R: CodeRepository> {
    pub codes: R,
}

impl<R: CodeRepository> GenerateCodesUseCase<R> {
    /// Generate a batch of fresh codes. Returns the number actually
    /// persisted, which may fall short of `count` if a generated code
    /// collides with an existing row (collisions are skipped, not retried).
    pub async fn execute(
        &self,
        input: GenerateCodesInput,
        now: DateTime<Utc>,
    ) -> Result<u64, DownloadServiceError> {
        if input.count == 0 || input.count > MAX_GENERATE_COUNT {
            return Err(DownloadServiceError::InvalidRequest);
        }

        // Dedupe within the batch; the store enforces uniqueness against
        // existing rows.
        let mut seen = HashSet::new();
        let batch: Vec<DownloadCode> = (0..input.count)
            .map(|_| generate_code())
            .filter(|code| seen.insert(code.clone()))
            .map(|code| DownloadCode::fresh(code, now))
            .collect();

        self.codes.insert_codes(&batch).await
    }
}

// ── Stats ────────────────────────────────────────────────────────────────────

pub struct StatsUseCase<R: CodeRepository> {
    pub codes: R,
}

impl<R: CodeRepository> StatsUseCase<R> {
    pub async fn execute(&self) -> Result<CodeStats, DownloadServiceError> {
        self.codes.stats().await
    }
}

// ── ListUnusedCodes ──────────────────────────────────────────────────────────

pub struct ListUnusedCodesUseCase<R: CodeRepository> {
    pub codes: R,
}

impl<R: CodeRepository> ListUnusedCodesUseCase<R> {
    pub async fn execute(&self) -> Result<Vec<String>, DownloadServiceError> {
        self.codes.list_unused().await
    }
}

// ── ClearCodes ───────────────────────────────────────────────────────────────

pub struct ClearCodesUseCase<R: CodeRepository> {
    pub codes: R,
}

impl<R: CodeRepository> ClearCodesUseCase<R> {
    /// Delete every code. Single atomic statement; concurrent redemptions
    /// either see the old table or an empty one, never a partial clear.
    pub async fn execute(&self) -> Result<u64, DownloadServiceError> {
        self.codes.clear_all().await
    }
}

#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};

use crate::domain::types::{CodeStats, DownloadCode, RedemptionOutcome};
use crate::error::DownloadServiceError;

/// Repository for single-use download codes.
pub trait CodeRepository: Send + Sync {
    /// Insert a batch of candidate codes, silently skipping any whose code
    /// string collides with an existing row. Returns the number actually
    /// inserted.
    async fn insert_codes(&self, codes: &[DownloadCode]) -> Result<u64, DownloadServiceError>;

    /// Run one redemption attempt: look up the code, apply the grace-window
    /// state machine, and persist the resulting mutation (if any) in a
    /// single transaction, so concurrent submissions of the same fresh
    /// code serialize and exactly one wins first use.
    async fn redeem(
        &self,
        code: &str,
        requester_ip: &str,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome, DownloadServiceError>;

    /// Most recent redemption by this address with `used_at >= since`.
    async fn find_recent_redemption(
        &self,
        requester_ip: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DownloadCode>, DownloadServiceError>;

    /// Code strings never redeemed, for CSV export.
    async fn list_unused(&self) -> Result<Vec<String>, DownloadServiceError>;

    async fn stats(&self) -> Result<CodeStats, DownloadServiceError>;

    /// Delete every code in one atomic statement. Returns rows deleted.
    async fn clear_all(&self) -> Result<u64, DownloadServiceError>;
}

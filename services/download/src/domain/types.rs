use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A single-use download code record.
///
/// The first successful redemption binds the code to the requester's
/// address (`used_ip`); every later decision about this code is made
/// against that binding.
#[derive(Debug, Clone)]
pub struct DownloadCode {
    pub id: Uuid,
    pub code: String,
    pub is_used: bool,
    pub used_ip: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DownloadCode {
    /// A freshly generated, never-redeemed code.
    pub fn fresh(code: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            is_used: false,
            used_ip: None,
            used_at: None,
            attempts: 0,
            last_attempt_at: None,
            created_at: now,
        }
    }
}

/// Outcome of one redemption attempt. Maps 1:1 to user-facing indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionOutcome {
    Valid,
    Invalid,
    AlreadyUsed,
    MaxAttempts,
}

/// What the state machine decided for one submission, including the
/// mutation the store must apply. Computed without side effects so the
/// repository can run it inside its transaction and the decision table
/// stays testable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionDecision {
    /// Never redeemed before: bind to this address, `attempts` becomes 1.
    FirstUse,
    /// Same address within the grace window: bump `attempts` to this value.
    GraceRetry { attempts: i32 },
    /// No mutation.
    Reject(RedemptionOutcome),
}

impl RedemptionDecision {
    pub fn outcome(&self) -> RedemptionOutcome {
        match self {
            Self::FirstUse | Self::GraceRetry { .. } => RedemptionOutcome::Valid,
            Self::Reject(outcome) => *outcome,
        }
    }
}

/// Code statistics for the admin surface.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CodeStats {
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

/// Code length in characters.
pub const CODE_LEN: usize = 6;

/// Charset for generated codes: uppercase letters and digits minus the
/// visually ambiguous `0`, `O`, `1`, `I`.
pub const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Period after first redemption during which the bound address may retry.
pub const GRACE_WINDOW_SECS: i64 = 15 * 60;

/// Redemption attempt cap per code within the grace window.
pub const MAX_ATTEMPTS: i32 = 3;

/// Upper bound on codes generated per admin request.
pub const MAX_GENERATE_COUNT: u32 = 5000;

/// Evaluate one submission of `code` by `requester_ip` at `now`.
///
/// `record` is the stored state of the submitted code, if any. The caller
/// must hold the record locked for the duration of decide-then-apply so
/// concurrent submissions of a fresh code cannot both observe it unused.
pub fn decide_redemption(
    record: Option<&DownloadCode>,
    requester_ip: &str,
    now: DateTime<Utc>,
) -> RedemptionDecision {
    let Some(record) = record else {
        return RedemptionDecision::Reject(RedemptionOutcome::Invalid);
    };

    if !record.is_used {
        return RedemptionDecision::FirstUse;
    }

    let same_ip = record.used_ip.as_deref() == Some(requester_ip);
    let within_grace = record
        .used_at
        .is_some_and(|used_at| now - used_at < Duration::seconds(GRACE_WINDOW_SECS));

    if same_ip && within_grace {
        if record.attempts >= MAX_ATTEMPTS {
            return RedemptionDecision::Reject(RedemptionOutcome::MaxAttempts);
        }
        return RedemptionDecision::GraceRetry {
            attempts: record.attempts + 1,
        };
    }

    // Different address or lapsed window: indistinguishable from replay,
    // both denied the same way.
    RedemptionDecision::Reject(RedemptionOutcome::AlreadyUsed)
}

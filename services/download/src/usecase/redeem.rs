use chrono::{DateTime, Duration, Utc};

use crate::domain::repository::CodeRepository;
use crate::domain::types::RedemptionOutcome;
use crate::error::DownloadServiceError;
use crate::usecase::link::{IssuedLink, LinkSigner};

/// Why a submission was refused. Maps 1:1 to the form's redirect
/// indicators (`used` is a legacy alias the form layer treats the same
/// as `already_used`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusalReason {
    Invalid,
    AlreadyUsed,
    MaxAttempts,
}

impl RefusalReason {
    pub fn indicator(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::AlreadyUsed => "already_used",
            Self::MaxAttempts => "max_attempts",
        }
    }
}

#[derive(Debug)]
pub enum Redeemed {
    /// Redemption succeeded; follow this capability link.
    Granted(IssuedLink),
    /// Redemption refused; redirect back to the form.
    Refused(RefusalReason),
}

pub struct RedeemCodeInput {
    pub code: String,
    pub requester_ip: String,
}

/// Runs the redemption state machine and, on success, mints the
/// capability link for the submitted code.
pub struct RedeemCodeUseCase<R: CodeRepository> {
    pub codes: R,
    pub signer: LinkSigner,
    pub link_ttl: Duration,
}

impl<R: CodeRepository> RedeemCodeUseCase<R> {
    pub async fn execute(
        &self,
        input: RedeemCodeInput,
        now: DateTime<Utc>,
    ) -> Result<Redeemed, DownloadServiceError> {
        let code = input.code.trim();
        if code.is_empty() {
            return Ok(Redeemed::Refused(RefusalReason::Invalid));
        }

        let outcome = self.codes.redeem(code, &input.requester_ip, now).await?;

        match outcome {
            RedemptionOutcome::Valid => {
                Ok(Redeemed::Granted(self.signer.issue(code, now, self.link_ttl)))
            }
            RedemptionOutcome::Invalid => Ok(Redeemed::Refused(RefusalReason::Invalid)),
            RedemptionOutcome::AlreadyUsed => Ok(Redeemed::Refused(RefusalReason::AlreadyUsed)),
            RedemptionOutcome::MaxAttempts => Ok(Redeemed::Refused(RefusalReason::MaxAttempts)),
        }
    }
}

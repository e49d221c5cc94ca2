use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    sea_query::OnConflict,
};

use codedrop_download_schema::download_codes;

use crate::domain::repository::CodeRepository;
use crate::domain::types::{
    CodeStats, DownloadCode, RedemptionDecision, RedemptionOutcome, decide_redemption,
};
use crate::error::DownloadServiceError;

/// Attempts at the redemption transaction before surfacing a failure.
/// Lock contention and serialization aborts are transient, not user errors.
const REDEEM_TXN_RETRIES: u32 = 3;

#[derive(Clone)]
pub struct DbCodeRepository {
    pub db: DatabaseConnection,
}

impl CodeRepository for DbCodeRepository {
    async fn insert_codes(&self, codes: &[DownloadCode]) -> Result<u64, DownloadServiceError> {
        if codes.is_empty() {
            return Ok(0);
        }
        let models = codes.iter().map(active_model_from_code);
        let inserted = download_codes::Entity::insert_many(models)
            .on_conflict(
                OnConflict::column(download_codes::Column::Code)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("insert download codes")?;
        Ok(inserted)
    }

    async fn redeem(
        &self,
        code: &str,
        requester_ip: &str,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome, DownloadServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_redeem(code, requester_ip, now).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if attempt < REDEEM_TXN_RETRIES => {
                    tracing::debug!(error = %err, attempt, "redeem transaction retry");
                }
                Err(err) => {
                    return Err(anyhow::Error::new(err).context("redeem code").into());
                }
            }
        }
    }

    async fn find_recent_redemption(
        &self,
        requester_ip: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DownloadCode>, DownloadServiceError> {
        let model = download_codes::Entity::find()
            .filter(download_codes::Column::IsUsed.eq(true))
            .filter(download_codes::Column::UsedIp.eq(requester_ip))
            .filter(download_codes::Column::UsedAt.gte(since))
            .order_by_desc(download_codes::Column::UsedAt)
            .one(&self.db)
            .await
            .context("find recent redemption")?;
        Ok(model.map(code_from_model))
    }

    async fn list_unused(&self) -> Result<Vec<String>, DownloadServiceError> {
        let models = download_codes::Entity::find()
            .filter(download_codes::Column::IsUsed.eq(false))
            .all(&self.db)
            .await
            .context("list unused codes")?;
        Ok(models.into_iter().map(|m| m.code).collect())
    }

    async fn stats(&self) -> Result<CodeStats, DownloadServiceError> {
        let total = download_codes::Entity::find()
            .count(&self.db)
            .await
            .context("count codes")?;
        let used = download_codes::Entity::find()
            .filter(download_codes::Column::IsUsed.eq(true))
            .count(&self.db)
            .await
            .context("count used codes")?;
        Ok(CodeStats {
            total,
            used,
            available: total - used,
        })
    }

    async fn clear_all(&self) -> Result<u64, DownloadServiceError> {
        let result = download_codes::Entity::delete_many()
            .exec(&self.db)
            .await
            .context("clear download codes")?;
        Ok(result.rows_affected)
    }
}

impl DbCodeRepository {
    /// One redemption attempt as a single transaction. The row is locked
    /// (`SELECT ... FOR UPDATE`) before the decision, so two concurrent
    /// submissions of the same fresh code serialize and exactly one takes
    /// first use.
    async fn try_redeem(
        &self,
        code: &str,
        requester_ip: &str,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome, sea_orm::TransactionError<sea_orm::DbErr>> {
        let code = code.to_owned();
        let requester_ip = requester_ip.to_owned();
        self.db
            .transaction::<_, RedemptionOutcome, sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    let model = download_codes::Entity::find()
                        .filter(download_codes::Column::Code.eq(code.as_str()))
                        .lock_exclusive()
                        .one(txn)
                        .await?;
                    let record = model.map(code_from_model);

                    let decision = decide_redemption(record.as_ref(), &requester_ip, now);
                    match (&decision, record) {
                        (RedemptionDecision::FirstUse, Some(record)) => {
                            download_codes::ActiveModel {
                                id: Set(record.id),
                                is_used: Set(true),
                                used_ip: Set(Some(requester_ip.clone())),
                                used_at: Set(Some(now)),
                                attempts: Set(1),
                                last_attempt_at: Set(Some(now)),
                                ..Default::default()
                            }
                            .update(txn)
                            .await?;
                        }
                        (RedemptionDecision::GraceRetry { attempts }, Some(record)) => {
                            download_codes::ActiveModel {
                                id: Set(record.id),
                                attempts: Set(*attempts),
                                last_attempt_at: Set(Some(now)),
                                ..Default::default()
                            }
                            .update(txn)
                            .await?;
                        }
                        _ => {}
                    }

                    Ok(decision.outcome())
                })
            })
            .await
    }
}

fn active_model_from_code(code: &DownloadCode) -> download_codes::ActiveModel {
    download_codes::ActiveModel {
        id: Set(code.id),
        code: Set(code.code.clone()),
        is_used: Set(code.is_used),
        used_ip: Set(code.used_ip.clone()),
        used_at: Set(code.used_at),
        attempts: Set(code.attempts),
        last_attempt_at: Set(code.last_attempt_at),
        created_at: Set(code.created_at),
    }
}

fn code_from_model(model: download_codes::Model) -> DownloadCode {
    DownloadCode {
        id: model.id,
        code: model.code,
        is_used: model.is_used,
        used_ip: model.used_ip,
        used_at: model.used_at,
        attempts: model.attempts,
        last_attempt_at: model.last_attempt_at,
        created_at: model.created_at,
    }
}

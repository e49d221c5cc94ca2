use sea_orm::entity::prelude::*;

/// Single-use download code. First redemption binds the code to the
/// requester's address; the same address may retry within the grace
/// window until the attempt cap is reached.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "download_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub is_used: bool,
    pub used_ip: Option<String>,
    pub used_at: Option<chrono::DateTime<chrono::Utc>>,
    pub attempts: i32,
    pub last_attempt_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;

/// Single-use backup codes for the TOTP second factor.
///
/// Only the HMAC-SHA256 digest of a code is stored; the plaintext is shown
/// once at enrollment. A row with a non-null `consumed_at` is spent.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "totp_backup_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub code_hash: String,
    pub consumed_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

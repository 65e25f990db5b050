use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "discount_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Stored upper-case.
    #[sea_orm(unique)]
    pub code: String,
    pub description: String,
    /// 1000 = 10.00 %.
    pub percentage_bps: i32,
    pub active: bool,
    pub starts_at: Option<DateTimeWithTimeZone>,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub uses_max: Option<i32>,
    pub uses_per_user: Option<i32>,
    pub uses_current: i32,
    pub minimum_amount: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::discount_code_uses::Entity")]
    DiscountCodeUses,
}

impl Related<super::discount_code_uses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DiscountCodeUses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;

use crate::lifecycle::OrderState;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// `None` for guest orders, which carry the guest contact columns instead.
    pub user_id: Option<Uuid>,
    pub state: OrderState,
    pub total: i64,
    pub discount_code: Option<String>,
    pub discount_amount: i64,
    pub shipping_cost: i64,
    pub shipping_address: String,
    pub postal_code: String,
    pub shipping_zone: String,
    pub payment_method: String,
    pub guest_email: Option<String>,
    pub guest_first_name: Option<String>,
    pub guest_last_name: Option<String>,
    pub guest_phone: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// What the customer owes: detail total minus the redeemed discount.
    pub fn amount_due(&self) -> i64 {
        (self.total - self.discount_amount).max(0)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_details::Entity")]
    OrderDetails,
    #[sea_orm(has_many = "super::pays::Entity")]
    Pays,
    #[sea_orm(has_one = "super::shipments::Entity")]
    Shipments,
    #[sea_orm(has_many = "super::discount_code_uses::Entity")]
    DiscountCodeUses,
}

impl Related<super::order_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDetails.def()
    }
}

impl Related<super::pays::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pays.def()
    }
}

impl Related<super::shipments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shipments.def()
    }
}

impl Related<super::discount_code_uses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DiscountCodeUses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

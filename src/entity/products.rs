use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock_supplier: i32,
    pub stock_sold: i32,
    pub unlimited: bool,
    pub disabled: bool,
    pub created_at: DateTimeWithTimeZone,
}

/// Units that can still be promised to an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    Unlimited,
    Limited(i32),
}

impl Availability {
    pub fn covers(&self, quantity: i32) -> bool {
        match self {
            Availability::Unlimited => true,
            Availability::Limited(available) => quantity <= *available,
        }
    }

    /// Count reported back to callers; unlimited stock reports `i32::MAX`.
    pub fn units(&self) -> i32 {
        match self {
            Availability::Unlimited => i32::MAX,
            Availability::Limited(available) => *available,
        }
    }
}

impl Model {
    /// Disabled products cannot be promised at all.
    pub fn available(&self) -> Availability {
        if self.disabled {
            Availability::Limited(0)
        } else if self.unlimited {
            Availability::Unlimited
        } else {
            Availability::Limited((self.stock_supplier - self.stock_sold).max(0))
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_items::Entity")]
    CartItems,
    #[sea_orm(has_many = "super::order_details::Entity")]
    OrderDetails,
}

impl Related<super::cart_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::order_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

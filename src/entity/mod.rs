pub mod audit_logs;
pub mod cart_items;
pub mod carts;
pub mod discount_code_uses;
pub mod discount_codes;
pub mod order_details;
pub mod orders;
pub mod pays;
pub mod products;
pub mod shipments;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use discount_code_uses::Entity as DiscountCodeUses;
pub use discount_codes::Entity as DiscountCodes;
pub use order_details::Entity as OrderDetails;
pub use orders::Entity as Orders;
pub use pays::Entity as Pays;
pub use products::Entity as Products;
pub use shipments::Entity as Shipments;

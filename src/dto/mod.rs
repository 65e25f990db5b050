pub mod cart;
pub mod discounts;
pub mod orders;
pub mod payments;
pub mod shipments;

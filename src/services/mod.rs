pub mod cart_service;
pub mod discount_service;
pub mod inventory_service;
pub mod order_service;
pub mod payment_service;
pub mod shipment_service;

use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddToCartRequest, CartLine, CartView, UpdateCartItemRequest},
        discounts::{CodeValidation, ValidateCodeRequest},
        orders::{
            CheckoutRequest, DetailLine, DirectOrderRequest, GuestContact, OrderLineRequest,
            OrderList, OrderTotal, OrderWithDetails, ShippingInfo, UpdateDetailsRequest,
        },
        payments::{CreatePayRequest, GatewayNotification, PayWithOrder, ReviewRequest},
        shipments::{CreateShipmentRequest, ShipmentWithOrder, Tracking, UpdateShipmentStatusRequest},
    },
    lifecycle::{OrderState, PayMethod, PayState, ShipmentState},
    models::{AuditEntry, DiscountCodeUse, Order, OrderDetail, Pay, Product, Shipment},
    response::{ApiResponse, Meta},
    routes::{admin, cart, discounts, gateway, health, orders, params, payments, shipments},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        cart::view_cart,
        cart::add_item,
        cart::set_item_quantity,
        cart::remove_item,
        cart::clear_cart,
        cart::checkout,
        orders::list_orders,
        orders::create_direct_order,
        orders::get_order,
        orders::update_details,
        orders::remove_detail,
        orders::cancel_order,
        orders::recompute_total,
        orders::list_payments,
        payments::create_pay,
        payments::get_pay,
        payments::mark_in_review,
        payments::complete_pay,
        payments::approve_pay,
        payments::fail_pay,
        payments::reject_pay,
        payments::cancel_pay,
        shipments::create_shipment,
        shipments::get_shipment,
        shipments::update_status,
        shipments::tracking,
        shipments::track_by_number,
        discounts::validate_code,
        gateway::receive_notification,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::mark_preparing,
        admin::order_history,
        admin::force_delete_order,
        admin::list_low_stock,
        admin::adjust_inventory
    ),
    components(
        schemas(
            Product,
            Order,
            OrderDetail,
            Pay,
            Shipment,
            DiscountCodeUse,
            AuditEntry,
            OrderState,
            PayState,
            PayMethod,
            ShipmentState,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartView,
            CartLine,
            ShippingInfo,
            CheckoutRequest,
            GuestContact,
            OrderLineRequest,
            DirectOrderRequest,
            DetailLine,
            UpdateDetailsRequest,
            OrderWithDetails,
            OrderList,
            OrderTotal,
            CreatePayRequest,
            ReviewRequest,
            GatewayNotification,
            PayWithOrder,
            CreateShipmentRequest,
            UpdateShipmentStatusRequest,
            Tracking,
            ShipmentWithOrder,
            ValidateCodeRequest,
            CodeValidation,
            admin::InventoryAdjustRequest,
            admin::ProductList,
            params::Pagination,
            params::SortOrder,
            params::OrderListQuery,
            params::LowStockQuery,
            Meta,
            ApiResponse<CartView>,
            ApiResponse<OrderWithDetails>,
            ApiResponse<OrderList>,
            ApiResponse<PayWithOrder>,
            ApiResponse<ShipmentWithOrder>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Cart and checkout"),
        (name = "Orders", description = "Order lifecycle"),
        (name = "Payments", description = "Payment lifecycle"),
        (name = "Shipments", description = "Shipment lifecycle"),
        (name = "Discounts", description = "Discount code validation"),
        (name = "Gateway", description = "Payment gateway notifications"),
        (name = "Admin", description = "Back-office endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

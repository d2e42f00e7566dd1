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
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartLine, CartList},
        dashboard::{
            AdminDashboard, AuditLogList, CustomerDashboard, FarmerDashboard, FinancialReport,
            TopProduct,
        },
        deliveries::{DeliveryList, UpdateDeliveryRequest},
        orders::{CheckoutRequest, OrderList, OrderWithItems},
        payments::{PaymentSession, StartPaymentRequest, WebhookAck, WebhookOutcome, WebhookPayload},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
    },
    entity::{
        orders::DeliveryWindow,
        payments::Provider,
        products::{Category, FarmingPractice, QualityGrade, Unit},
        users::Role,
    },
    lifecycle::{DeliveryStatus, OrderStatus, PaymentStatus},
    models::{AuditLog, CartItem, Delivery, Order, OrderItem, Payment, Product, User},
    response::{ApiResponse, ErrorData, Meta},
    routes::{admin, auth, cart, dashboard, deliveries, health, orders, params, payments, products},
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
        auth::login,
        auth::register,
        cart::cart_list,
        cart::add_to_cart,
        cart::remove_from_cart,
        products::list_products,
        products::my_products,
        products::create_product,
        products::get_product,
        products::update_product,
        products::delete_product,
        orders::list_order,
        orders::checkout,
        orders::incoming_orders,
        orders::get_order,
        orders::confirm_order,
        orders::cancel_order,
        deliveries::list_deliveries,
        deliveries::get_delivery,
        deliveries::update_delivery,
        payments::get_payment,
        payments::start_payment,
        payments::stripe_webhook,
        payments::paypal_webhook,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::delete_order,
        admin::refund_payment,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::admin_dashboard,
        admin::list_audit_logs,
        admin::financial_report,
        dashboard::customer_dashboard,
        dashboard::farmer_dashboard
    ),
    components(
        schemas(
            User,
            Role,
            Product,
            Category,
            Unit,
            QualityGrade,
            FarmingPractice,
            CartItem,
            Order,
            OrderStatus,
            OrderItem,
            DeliveryWindow,
            Delivery,
            DeliveryStatus,
            Payment,
            PaymentStatus,
            Provider,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            AddToCartRequest,
            CartLine,
            CartList,
            CheckoutRequest,
            OrderList,
            OrderWithItems,
            UpdateDeliveryRequest,
            DeliveryList,
            StartPaymentRequest,
            PaymentSession,
            WebhookOutcome,
            WebhookPayload,
            WebhookAck,
            admin::InventoryAdjustRequest,
            admin::LowStockQuery,
            admin::AuditLogQuery,
            AuditLog,
            AuditLogList,
            CustomerDashboard,
            FarmerDashboard,
            AdminDashboard,
            FinancialReport,
            TopProduct,
            health::HealthData,
            ErrorData,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::DeliveryListQuery,
            ProductList,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<Delivery>,
            ApiResponse<DeliveryList>,
            ApiResponse<Payment>,
            ApiResponse<PaymentSession>,
            ApiResponse<AuditLogList>,
            ApiResponse<ErrorData>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Products", description = "Produce listings"),
        (name = "Cart", description = "Customer cart"),
        (name = "Orders", description = "Checkout and order lifecycle"),
        (name = "Deliveries", description = "Delivery scheduling and tracking"),
        (name = "Payments", description = "Payment sessions and provider webhooks"),
        (name = "Dashboard", description = "Per-role summaries"),
        (name = "Admin", description = "Administration endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

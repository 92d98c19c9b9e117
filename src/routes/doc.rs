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
    dto::orders::{
        CancelOrderRequest, CheckoutItem, CheckoutRequest, CheckoutResponse, OrderDetail,
        OrderList, ReportIssueRequest,
    },
    models::{Order, OrderItem, OrderStatus, Payment, PaymentMethod, PaymentStatus},
    response::{ApiResponse, Meta},
    routes::{health, orders, params},
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
        orders::checkout,
        orders::list_orders,
        orders::list_selling_orders,
        orders::get_order,
        orders::confirm_order,
        orders::ship_order,
        orders::complete_order,
        orders::report_issue,
        orders::confirm_lost,
        orders::cancel_order
    ),
    components(
        schemas(
            Order,
            OrderItem,
            Payment,
            OrderStatus,
            PaymentStatus,
            PaymentMethod,
            CheckoutItem,
            CheckoutRequest,
            CheckoutResponse,
            ReportIssueRequest,
            CancelOrderRequest,
            OrderDetail,
            OrderList,
            params::Pagination,
            params::OrderListQuery,
            Meta,
            ApiResponse<OrderDetail>,
            ApiResponse<OrderList>,
            ApiResponse<CheckoutResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Checkout and order queries"),
        (name = "Fulfillment", description = "Order status transitions"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

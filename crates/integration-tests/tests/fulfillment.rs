//! Imported orders forwarded to Omniful.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use channel_sync_core::OrderState;
use channel_sync_integration_tests::{FulfillmentCall, HUB_CODE, TestContext, event, order_data};

#[tokio::test]
async fn test_order_lifecycle_is_forwarded() {
    let ctx = TestContext::new().await;
    let oil = ctx.add_product("10", "Oud Oil", 100).await;

    ctx.post_webhook(&event("order.created", order_data("under_review")))
        .await;
    let calls = ctx.fulfillment.calls().await;
    assert_eq!(calls.len(), 2);
    let FulfillmentCall::Customer(customer) = &calls[0] else {
        panic!("expected a customer push, got {:?}", calls[0]);
    };
    assert_eq!(customer.first_name, "Sara");
    assert_eq!(customer.last_name, "Al Harbi");
    let FulfillmentCall::CreateOrder(order) = &calls[1] else {
        panic!("expected an order push, got {:?}", calls[1]);
    };
    assert_eq!(order.order_id, "64543212");
    assert_eq!(order.hub_code, HUB_CODE);
    assert_eq!(order.shipment_type, Some("omniful_generated"));
    assert_eq!(order.customer.id, "cus_1");
    assert_eq!(order.order_items.len(), 1);
    assert_eq!(order.order_items[0].sku_code, format!("sku-{}", oil.id));
    assert_eq!(order.invoice.subtotal, Decimal::from(100));
    assert_eq!(order.invoice.shipping_price, Decimal::from(25));
    assert_eq!(order.invoice.total_due, Decimal::new(14375, 2));
    assert_eq!(order.payment_method, "prepaid");

    // Same draft again: updated in place, customer not recreated.
    ctx.post_webhook(&event("order.updated", order_data("under_review")))
        .await;
    let calls = ctx.fulfillment.calls().await;
    assert_eq!(calls.len(), 3);
    assert!(matches!(&calls[2], FulfillmentCall::UpdateOrder(o) if o.shipment_type.is_none()));

    ctx.post_webhook(&event("order.updated", order_data("canceled")))
        .await;
    let orders = ctx.store.sale_orders().await;
    assert_eq!(orders[0].state, OrderState::Cancel);
    assert_eq!(
        ctx.fulfillment.calls().await[3..],
        [FulfillmentCall::CancelOrder("64543212".to_string())]
    );
}

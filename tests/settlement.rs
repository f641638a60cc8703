pub mod common;

use std::collections::HashSet;

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;
use ticketing::api;
use time::Duration;

async fn event_with(price: Decimal, quota: Option<i32>) -> api::Event {
    common::admin()
        .await
        .create_event(&common::new_event(
            Duration::days(7),
            vec![common::ticket_type("General", price, quota)],
        ))
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn checkout_issues_tickets() {
    let event = event_with(Decimal::new(15000, 2), Some(5)).await;
    let alice = common::alice().await;
    let order = alice.create_order(&[event.ticket_types[0].id]).await.unwrap();

    let paid = alice
        .checkout(&order.code, Decimal::new(15000, 2))
        .await
        .unwrap();
    assert_eq!(paid.status, api::order::Status::Paid);
    assert!(paid.paid_at.is_some());
    assert_eq!(paid.tickets.len(), 1);

    let ticket = &paid.tickets[0];
    assert!(ticket.code.starts_with("TKT-"));
    assert_eq!(ticket.status, api::ticket::Status::Active);
    assert_eq!(ticket.attendee_name, "Alice");
    assert_eq!(ticket.order_line_id, paid.lines[0].id);

    // Paying again is a no-op.
    let again = alice
        .checkout(&order.code, Decimal::new(15000, 2))
        .await
        .unwrap();
    assert_eq!(again.tickets.len(), 1);
    assert_eq!(again.tickets[0].code, ticket.code);
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn rejects_insufficient_payment() {
    let event = event_with(Decimal::new(15000, 2), Some(5)).await;
    let alice = common::alice().await;
    let order = alice.create_order(&[event.ticket_types[0].id]).await.unwrap();

    let failure = alice
        .checkout(&order.code, Decimal::new(14999, 2))
        .await
        .unwrap_err();
    assert_eq!(failure.status, StatusCode::BAD_REQUEST);
    assert_eq!(failure.code.as_deref(), Some("INSUFFICIENT_PAYMENT"));

    let order = alice.get_order(&order.code).await.unwrap();
    assert_eq!(order.status, api::order::Status::Pending);
    assert!(order.tickets.is_empty());
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn callback_issues_one_ticket_per_line() {
    let admin = common::admin().await;
    let first = event_with(Decimal::new(5000, 2), Some(5)).await;
    let second = event_with(Decimal::new(7500, 2), Some(100)).await;
    let alice = common::alice().await;
    let order = alice
        .create_order(&[first.ticket_types[0].id, second.ticket_types[0].id])
        .await
        .unwrap();
    assert_eq!(order.total_amount, Decimal::new(12500, 2));

    let ack = alice
        .callback(common::notification(&order, "settlement"))
        .await;
    assert!(ack.success);

    let paid = alice.get_order(&order.code).await.unwrap();
    assert_eq!(paid.status, api::order::Status::Paid);
    assert_eq!(paid.payment_method.as_deref(), Some("bank_transfer"));
    assert_eq!(paid.tickets.len(), 2);
    let codes = paid.tickets.iter().map(|t| &t.code).collect::<HashSet<_>>();
    assert_eq!(codes.len(), 2);

    // Issuance does not touch the ledger again.
    let first = admin.get_event(first.id).await.unwrap();
    assert_eq!(first.ticket_types[0].sold, 1);
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn duplicate_callback_has_no_effect() {
    let event = event_with(Decimal::new(5000, 2), Some(5)).await;
    let alice = common::alice().await;
    let order = alice.create_order(&[event.ticket_types[0].id]).await.unwrap();

    let notification = common::notification(&order, "capture");
    let (a, b) = tokio::join!(
        alice.callback(notification.clone()),
        alice.callback(notification.clone()),
    );
    assert!(a.success && b.success);
    alice.callback(notification).await;

    let paid = alice.get_order(&order.code).await.unwrap();
    assert_eq!(paid.status, api::order::Status::Paid);
    assert_eq!(paid.tickets.len(), 1);
    assert_eq!(alice.get_ticket(&paid.tickets[0].code).await.unwrap().id, paid.tickets[0].id);

    // A late failure does not undo the payment.
    alice.callback(common::notification(&order, "expire")).await;
    let paid = alice.get_order(&order.code).await.unwrap();
    assert_eq!(paid.status, api::order::Status::Paid);
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn failed_payment_releases_units() {
    let admin = common::admin().await;
    let event = event_with(Decimal::new(5000, 2), Some(1)).await;
    let alice = common::alice().await;
    let order = alice.create_order(&[event.ticket_types[0].id]).await.unwrap();

    alice.callback(common::notification(&order, "deny")).await;

    let failed = alice.get_order(&order.code).await.unwrap();
    assert_eq!(failed.status, api::order::Status::Failed);
    assert!(failed.tickets.is_empty());
    assert_eq!(admin.get_event(event.id).await.unwrap().ticket_types[0].sold, 0);

    let failure = alice
        .checkout(&order.code, Decimal::new(5000, 2))
        .await
        .unwrap_err();
    assert_eq!(failure.code.as_deref(), Some("INVALID_STATE_TRANSITION"));
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn acknowledges_garbage() {
    let client = common::Client::new();

    assert!(client.callback(json!({ "unexpected": true })).await.success);
    assert!(
        client
            .callback(json!({
                "order_id": "ORD-00000000-000000000000",
                "transaction_status": "settlement",
            }))
            .await
            .success
    );
}

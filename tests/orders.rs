pub mod common;

use reqwest::StatusCode;
use rust_decimal::Decimal;
use ticketing::api;
use time::Duration;

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn reserves_inventory_when_placing_order() {
    let admin = common::admin().await;
    let event = admin
        .create_event(&common::new_event(
            Duration::days(7),
            vec![common::ticket_type("General", Decimal::new(5000, 2), Some(10))],
        ))
        .await
        .unwrap();
    let general = &event.ticket_types[0];

    let order = common::alice().await.create_order(&[general.id]).await.unwrap();
    assert_eq!(order.status, api::order::Status::Pending);
    assert!(order.code.starts_with("ORD-"));
    assert_eq!(order.total_amount, Decimal::new(5000, 2));
    assert_eq!(order.lines.len(), 1);
    assert!(order.tickets.is_empty());

    let event = admin.get_event(event.id).await.unwrap();
    assert_eq!(event.ticket_types[0].sold, 1);
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn sells_last_unit_once() {
    let event = common::admin()
        .await
        .create_event(&common::new_event(
            Duration::days(7),
            vec![common::ticket_type("VIP", Decimal::new(100000, 2), Some(1))],
        ))
        .await
        .unwrap();
    let vip = event.ticket_types[0].id;

    let (alice, bob) = tokio::join!(common::alice(), common::bob());
    let items = [vip];
    let (a, b) = tokio::join!(alice.create_order(&items), bob.create_order(&items));

    let (won, lost) = match (a, b) {
        (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
        res => panic!("expected exactly one winner, got {res:?}"),
    };
    assert_eq!(won.status, api::order::Status::Pending);
    assert_eq!(lost.status, StatusCode::CONFLICT);
    assert_eq!(lost.code.as_deref(), Some("SOLD_OUT"));
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn rejects_second_order_for_same_event() {
    let event = common::admin()
        .await
        .create_event(&common::new_event(
            Duration::days(7),
            vec![
                common::ticket_type("General", Decimal::new(5000, 2), Some(10)),
                common::ticket_type("VIP", Decimal::new(9000, 2), Some(10)),
            ],
        ))
        .await
        .unwrap();
    let alice = common::alice().await;

    alice.create_order(&[event.ticket_types[0].id]).await.unwrap();

    let failure = alice
        .create_order(&[event.ticket_types[1].id])
        .await
        .unwrap_err();
    assert_eq!(failure.status, StatusCode::CONFLICT);
    assert_eq!(failure.code.as_deref(), Some("DUPLICATE_PURCHASE"));

    let failure = common::bob()
        .await
        .create_order(&[event.ticket_types[0].id, event.ticket_types[1].id])
        .await
        .unwrap_err();
    assert_eq!(failure.code.as_deref(), Some("DUPLICATE_PURCHASE"));
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn cancel_returns_units() {
    let admin = common::admin().await;
    let event = admin
        .create_event(&common::new_event(
            Duration::days(7),
            vec![common::ticket_type("General", Decimal::new(5000, 2), Some(1))],
        ))
        .await
        .unwrap();
    let general = event.ticket_types[0].id;
    let alice = common::alice().await;

    let order = alice.create_order(&[general]).await.unwrap();
    let canceled = alice.cancel_order(&order.code).await.unwrap();
    assert_eq!(canceled.status, api::order::Status::Canceled);
    assert_eq!(admin.get_event(event.id).await.unwrap().ticket_types[0].sold, 0);

    let failure = alice.cancel_order(&order.code).await.unwrap_err();
    assert_eq!(failure.code.as_deref(), Some("INVALID_STATE_TRANSITION"));

    // A canceled order does not block buying again.
    common::bob().await.create_order(&[general]).await.unwrap();
    alice.create_order(&[general]).await.unwrap_err();
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn keeps_orders_private() {
    let event = common::admin()
        .await
        .create_event(&common::new_event(
            Duration::days(7),
            vec![common::ticket_type("General", Decimal::new(5000, 2), Some(100))],
        ))
        .await
        .unwrap();
    let order = common::alice()
        .await
        .create_order(&[event.ticket_types[0].id])
        .await
        .unwrap();

    let failure = common::bob().await.get_order(&order.code).await.unwrap_err();
    assert_eq!(failure.status, StatusCode::FORBIDDEN);

    let seen = common::admin().await.get_order(&order.code).await.unwrap();
    assert_eq!(seen.id, order.id);
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn lists_orders_by_scope() {
    let alice = common::alice().await;
    let mine = alice.get_orders(0, 5).await.unwrap();
    assert!(mine.orders.len() <= 5);
    assert!(mine
        .orders
        .iter()
        .all(|o| o.user_id == api::user::Id::from(1)));

    let failure = alice.get_all_orders(0, 5).await.unwrap_err();
    assert_eq!(failure.status, StatusCode::FORBIDDEN);

    let all = common::admin().await.get_all_orders(0, 5).await.unwrap();
    assert!(all.total_count >= mine.total_count);
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn admins_do_not_buy() {
    let admin = common::admin().await;
    let event = admin
        .create_event(&common::new_event(
            Duration::days(7),
            vec![common::ticket_type("General", Decimal::new(5000, 2), Some(100))],
        ))
        .await
        .unwrap();

    let failure = admin
        .create_order(&[event.ticket_types[0].id])
        .await
        .unwrap_err();
    assert_eq!(failure.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn customers_do_not_create_events() {
    let failure = common::alice()
        .await
        .create_event(&common::new_event(Duration::days(7), Vec::new()))
        .await
        .unwrap_err();
    assert_eq!(failure.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn inactive_ticket_type_sells_nothing() {
    let event = common::admin()
        .await
        .create_event(&common::new_event(
            Duration::days(7),
            vec![common::ticket_type("Preview", Decimal::new(5000, 2), None)],
        ))
        .await
        .unwrap();

    let failure = common::alice()
        .await
        .create_order(&[event.ticket_types[0].id])
        .await
        .unwrap_err();
    assert_eq!(failure.code.as_deref(), Some("SOLD_OUT"));
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn failed_line_leaves_nothing_behind() {
    let admin = common::admin().await;
    let plenty = admin
        .create_event(&common::new_event(
            Duration::days(7),
            vec![common::ticket_type("General", Decimal::new(5000, 2), Some(10))],
        ))
        .await
        .unwrap();
    let scarce = admin
        .create_event(&common::new_event(
            Duration::days(7),
            vec![common::ticket_type("VIP", Decimal::new(9000, 2), Some(1))],
        ))
        .await
        .unwrap();
    common::bob()
        .await
        .create_order(&[scarce.ticket_types[0].id])
        .await
        .unwrap();

    let carol = common::carol().await;
    let before = carol.get_orders(0, 1).await.unwrap().total_count;

    let failure = carol
        .create_order(&[plenty.ticket_types[0].id, scarce.ticket_types[0].id])
        .await
        .unwrap_err();
    assert_eq!(failure.status, StatusCode::CONFLICT);
    assert_eq!(failure.code.as_deref(), Some("SOLD_OUT"));

    let plenty = admin.get_event(plenty.id).await.unwrap();
    assert_eq!(plenty.ticket_types[0].sold, 0);
    assert_eq!(carol.get_orders(0, 1).await.unwrap().total_count, before);

    // Nothing is held for the buyer either.
    carol.create_order(&[plenty.ticket_types[0].id]).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running server and a database loaded with schema.sql and fixtures.sql"]
async fn malformed_requests_get_the_envelope() {
    let alice = common::alice().await;

    for body in [
        r#"{"ticketTypeIds": ["not-a-uuid"]}"#,
        r#"{"ticketTypeIds": 1}"#,
        "{",
    ] {
        let failure = alice.post_raw("/orders", body).await.unwrap_err();
        assert_eq!(failure.status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(failure.code.as_deref(), Some("INVALID_INPUT"), "{body}");
    }

    let failure = alice
        .post_raw(
            "/orders/ORD-20261018-0A1B2C3D4E5F/checkout",
            r#"{"paymentAmount": "abc"}"#,
        )
        .await
        .unwrap_err();
    assert_eq!(failure.code.as_deref(), Some("INVALID_INPUT"));

    let failure = alice.get_raw("/events/not-a-uuid").await.unwrap_err();
    assert_eq!(failure.code.as_deref(), Some("INVALID_INPUT"));

    let failure = alice.get_raw("/orders?offset=abc").await.unwrap_err();
    assert_eq!(failure.code.as_deref(), Some("INVALID_INPUT"));
}

//! HTTP client for the end-to-end tests.
//!
//! Expects a server on `BASE_URL` backed by a database loaded with
//! `schema.sql` and `fixtures.sql`, running without a payment server key so
//! callbacks are accepted unsigned.

#![allow(dead_code)]

use constcat::concat;
use reqwest::{RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use ticketing::{api, db};
use time::{Duration, OffsetDateTime};

const BASE_URL: &str = "http://localhost:3000";

/// Failed request: HTTP status and the error code from the envelope.
#[derive(Debug, PartialEq)]
pub struct Failure {
    pub status: StatusCode,
    pub code: Option<String>,
}

pub struct Client {
    inner: reqwest::Client,
    pub auth_token: Option<String>,
}

impl Client {
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
            auth_token: None,
        }
    }

    pub async fn auth(mut self, login: &str, password: &str) -> Self {
        const URL: &str = concat!(BASE_URL, "/auth");

        let req = self.inner.post(URL).json(&json!({
            "login": login,
            "password": password,
        }));
        self.auth_token =
            Some(send::<String>(req).await.expect("failed to authenticate"));
        self
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub async fn user(&self) -> Result<api::User, Failure> {
        const URL: &str = concat!(BASE_URL, "/user");

        send(self.authorized(self.inner.get(URL))).await
    }

    pub async fn create_event(
        &self,
        new: &api::event::NewEvent,
    ) -> Result<api::Event, Failure> {
        const URL: &str = concat!(BASE_URL, "/events");

        send(self.authorized(self.inner.post(URL)).json(new)).await
    }

    pub async fn get_event(
        &self,
        id: api::event::Id,
    ) -> Result<api::Event, Failure> {
        const URL: &str = concat!(BASE_URL, "/events");

        send(self.authorized(self.inner.get(format!("{URL}/{id}")))).await
    }

    pub async fn create_order(
        &self,
        ticket_type_ids: &[db::ticket_type::Id],
    ) -> Result<api::Order, Failure> {
        const URL: &str = concat!(BASE_URL, "/orders");

        let body = api::order::NewOrder {
            ticket_type_ids: ticket_type_ids.to_vec(),
        };
        send(self.authorized(self.inner.post(URL)).json(&body)).await
    }

    pub async fn get_order(&self, code: &str) -> Result<api::Order, Failure> {
        const URL: &str = concat!(BASE_URL, "/orders");

        send(self.authorized(self.inner.get(format!("{URL}/{code}")))).await
    }

    pub async fn get_orders(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<api::order::List, Failure> {
        const URL: &str = concat!(BASE_URL, "/orders");

        let req = self
            .inner
            .get(format!("{URL}?offset={offset}&limit={limit}"));
        send(self.authorized(req)).await
    }

    pub async fn get_all_orders(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<api::order::List, Failure> {
        const URL: &str = concat!(BASE_URL, "/admin/orders");

        let req = self
            .inner
            .get(format!("{URL}?offset={offset}&limit={limit}"));
        send(self.authorized(req)).await
    }

    pub async fn cancel_order(
        &self,
        code: &str,
    ) -> Result<api::Order, Failure> {
        const URL: &str = concat!(BASE_URL, "/orders");

        let req = self.inner.post(format!("{URL}/{code}/cancel"));
        send(self.authorized(req)).await
    }

    pub async fn checkout(
        &self,
        code: &str,
        payment_amount: Decimal,
    ) -> Result<api::Order, Failure> {
        const URL: &str = concat!(BASE_URL, "/orders");

        let body = api::order::Checkout { payment_amount };
        let req = self.inner.post(format!("{URL}/{code}/checkout"));
        send(self.authorized(req).json(&body)).await
    }

    /// Posts a gateway notification; the server always acknowledges.
    pub async fn callback(&self, body: Value) -> api::Response<()> {
        const URL: &str = concat!(BASE_URL, "/payments/callback");

        self.inner
            .post(URL)
            .json(&body)
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .expect("callback was not acknowledged")
            .json()
            .await
            .expect("failed to get a response")
    }

    pub async fn get_tickets(&self) -> Result<Vec<api::Ticket>, Failure> {
        const URL: &str = concat!(BASE_URL, "/tickets");

        send(self.authorized(self.inner.get(URL))).await
    }

    pub async fn get_ticket(
        &self,
        code: &str,
    ) -> Result<api::Ticket, Failure> {
        const URL: &str = concat!(BASE_URL, "/tickets");

        send(self.authorized(self.inner.get(format!("{URL}/{code}")))).await
    }

    pub async fn check_in(&self, code: &str) -> Result<api::Ticket, Failure> {
        const URL: &str = concat!(BASE_URL, "/tickets");

        let req = self.inner.post(format!("{URL}/{code}/check-in"));
        send(self.authorized(req)).await
    }

    /// Sends an arbitrary, possibly malformed, JSON body to `path`.
    pub async fn post_raw(&self, path: &str, body: &str) -> Result<Value, Failure> {
        let req = self
            .inner
            .post(format!("{BASE_URL}{path}"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_owned());
        send(self.authorized(req)).await
    }

    pub async fn get_raw(&self, path: &str) -> Result<Value, Failure> {
        send(self.authorized(self.inner.get(format!("{BASE_URL}{path}")))).await
    }
}

async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, Failure> {
    let res = req.send().await.expect("failed to send a request");
    let status = res.status();
    let body = res
        .json::<api::Response<Value>>()
        .await
        .expect("failed to get a response");
    if !status.is_success() {
        return Err(Failure {
            status,
            code: body.code,
        });
    }
    assert!(body.success, "successful status with a failed envelope");
    Ok(serde_json::from_value(body.data.unwrap_or(Value::Null))
        .expect("unexpected response data"))
}

pub async fn alice() -> Client {
    Client::new().auth("alice", "password").await
}

pub async fn bob() -> Client {
    Client::new().auth("bob", "password").await
}

/// Buyer reserved for tests that compare order counts.
pub async fn carol() -> Client {
    Client::new().auth("carol", "password").await
}

pub async fn admin() -> Client {
    Client::new().auth("admin", "password").await
}

/// Ticket type on sale now, for [`new_event`].
pub fn ticket_type(
    name: &str,
    price: Decimal,
    quota: Option<i32>,
) -> api::event::NewTicketType {
    let now = OffsetDateTime::now_utc();
    api::event::NewTicketType {
        name: name.into(),
        price,
        quota,
        sale_starts_at: now - Duration::hours(1),
        sale_ends_at: now + Duration::days(1),
    }
}

/// Published event starting `starts_in` from now, with a unique name.
pub fn new_event(
    starts_in: Duration,
    ticket_types: Vec<api::event::NewTicketType>,
) -> api::event::NewEvent {
    let now = OffsetDateTime::now_utc();
    api::event::NewEvent {
        name: format!("Event {}", uuid::Uuid::new_v4().simple()),
        status: api::event::Status::Published,
        starts_at: now + starts_in,
        ends_at: now + starts_in + Duration::hours(3),
        ticket_types,
    }
}

/// Gateway notification body for `order`.
pub fn notification(order: &api::Order, transaction_status: &str) -> Value {
    json!({
        "order_id": order.code,
        "transaction_status": transaction_status,
        "payment_type": "bank_transfer",
        "transaction_id": uuid::Uuid::new_v4().to_string(),
        "status_code": "200",
        "gross_amount": order.total_amount.to_string(),
    })
}

use std::{error::Error as StdError, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        request, HeaderValue, Method,
    },
    routing::{get, post},
    RequestPartsExt as _, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{
    decode, encode, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::net;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter,
};

use ticketing::{
    api::{
        self,
        extract::{Json, Path, Query},
    },
    db,
    gateway::{self, SignatureKey, Unverified, Verifier},
    notify::{DbNotifier, Notifier},
    qr::{Renderer, SvgRenderer},
    service::{
        catalog, checkin,
        order::{self, Scope},
        settlement::{self, Settlement},
        Error,
    },
    Config,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn StdError>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().await?;

    let pool = db::connect(config.db)?;
    // Fail fast on a wrong database URL.
    drop(pool.get().await?);

    let verifier: Arc<dyn Verifier> = match config.payment.server_key {
        Some(key) => Arc::new(SignatureKey::new(key)),
        None => {
            tracing::warn!(
                "no payment server key configured, \
                 gateway callbacks are accepted unverified",
            );
            Arc::new(Unverified)
        }
    };

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);
    for origin in &config.http.cors.allowed_origins {
        cors = cors.allow_origin(origin.parse::<HeaderValue>()?);
    }

    let app = Router::new()
        .route("/auth", post(auth))
        .route("/user", get(get_user))
        .route("/events", post(create_event))
        .route("/events/:id", get(get_event))
        .route("/orders", get(list_my_orders).post(create_order))
        .route("/orders/:code", get(get_order))
        .route("/orders/:code/cancel", post(cancel_order))
        .route("/orders/:code/checkout", post(checkout))
        .route("/admin/orders", get(list_all_orders))
        .route("/payments/callback", post(payment_callback))
        .route("/tickets", get(list_tickets))
        .route("/tickets/:code", get(get_ticket))
        .route("/tickets/:code/check-in", post(check_in))
        .layer(cors)
        .with_state(Arc::new(AppState {
            notifier: Arc::new(DbNotifier::new(pool.clone())),
            renderer: Arc::new(SvgRenderer::new(config.qr)),
            verifier,
            pool,
            jwt_expiration_time: config.jwt.expiration_time,
            jwt_decoding_key: DecodingKey::from_secret(
                config.jwt.secret.as_bytes(),
            ),
            jwt_encoding_key: EncodingKey::from_secret(
                config.jwt.secret.as_bytes(),
            ),
        }));

    let listener = net::TcpListener::bind(config.http.server.addr).await?;
    tracing::info!(addr = %config.http.server.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Deserialize)]
struct AuthInput {
    login: String,
    password: String,
}

async fn auth(
    State(state): State<SharedAppState>,
    Json(AuthInput { login, password }): Json<AuthInput>,
) -> Result<api::Response<String>, Error> {
    let password_hash = api::user::PasswordHash::new(&password);

    let user = state
        .pool
        .get()
        .await?
        .get_user_by_login(&login)
        .await?
        .filter(|u| u.password_hash == password_hash)
        .ok_or(Error::Unauthorized)?;

    let expires_at = OffsetDateTime::now_utc() + state.jwt_expiration_time;
    let token = encode(
        &Header::default(),
        &AuthClaims {
            user_id: user.id,
            exp: expires_at.unix_timestamp(),
        },
        &state.jwt_encoding_key,
    )?;

    Ok(api::Response::ok("authenticated", token))
}

async fn get_user(
    CurrentUser(my): CurrentUser,
) -> Result<api::Response<api::User>, Error> {
    Ok(api::Response::ok("current user", my.into()))
}

async fn create_event(
    State(state): State<SharedAppState>,
    CurrentUser(my): CurrentUser,
    Json(new): Json<api::event::NewEvent>,
) -> Result<api::Response<api::Event>, Error> {
    let (event, ticket_types) =
        catalog::create_event(&state.pool, &my, new.into()).await?;
    Ok(api::Response::created(
        "event created",
        api::Event::new(event, ticket_types),
    ))
}

async fn get_event(
    State(state): State<SharedAppState>,
    _: AuthClaims,
    Path(id): Path<api::event::Id>,
) -> Result<api::Response<api::Event>, Error> {
    let (event, ticket_types) = catalog::get_event(&state.pool, id).await?;
    Ok(api::Response::ok("event", api::Event::new(event, ticket_types)))
}

async fn create_order(
    State(state): State<SharedAppState>,
    CurrentUser(my): CurrentUser,
    Json(api::order::NewOrder { ticket_type_ids }): Json<api::order::NewOrder>,
) -> Result<api::Response<api::Order>, Error> {
    let order = order::create(&state.pool, &my, &ticket_type_ids).await?;
    Ok(api::Response::created("order placed", order.into()))
}

#[derive(Deserialize)]
struct PageInput {
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    20
}

const MAX_LIMIT: usize = 100;

async fn list_my_orders(
    State(state): State<SharedAppState>,
    CurrentUser(my): CurrentUser,
    Query(page): Query<PageInput>,
) -> Result<api::Response<api::order::List>, Error> {
    list_orders(&state, &my, Scope::Mine, page).await
}

async fn list_all_orders(
    State(state): State<SharedAppState>,
    CurrentUser(my): CurrentUser,
    Query(page): Query<PageInput>,
) -> Result<api::Response<api::order::List>, Error> {
    list_orders(&state, &my, Scope::All, page).await
}

async fn list_orders(
    state: &AppState,
    my: &db::User,
    scope: Scope,
    PageInput { offset, limit }: PageInput,
) -> Result<api::Response<api::order::List>, Error> {
    let (orders, total_count) =
        order::list(&state.pool, my, scope, offset, limit.min(MAX_LIMIT))
            .await?;
    Ok(api::Response::ok(
        "orders",
        api::order::List {
            orders: orders.into_iter().map(api::Order::from).collect(),
            total_count,
        },
    ))
}

async fn get_order(
    State(state): State<SharedAppState>,
    CurrentUser(my): CurrentUser,
    Path(code): Path<String>,
) -> Result<api::Response<api::Order>, Error> {
    let (order, tickets) = order::get(&state.pool, &my, &code).await?;
    Ok(api::Response::ok("order", api::Order::new(order, tickets)))
}

async fn cancel_order(
    State(state): State<SharedAppState>,
    CurrentUser(my): CurrentUser,
    Path(code): Path<String>,
) -> Result<api::Response<api::Order>, Error> {
    let order = order::cancel(&state.pool, &my, &code).await?;
    Ok(api::Response::ok("order canceled", order.into()))
}

async fn checkout(
    State(state): State<SharedAppState>,
    CurrentUser(my): CurrentUser,
    Path(code): Path<String>,
    Json(api::order::Checkout { payment_amount }): Json<api::order::Checkout>,
) -> Result<api::Response<api::Order>, Error> {
    let settlement = settlement::checkout(
        &state.pool,
        state.renderer.as_ref(),
        state.notifier.as_ref(),
        &my,
        &code,
        payment_amount,
    )
    .await?;

    Ok(match settlement {
        Settlement::Applied { order, tickets } => api::Response::ok(
            "order paid, tickets issued",
            api::Order::new(order, tickets),
        ),
        Settlement::AlreadySettled(order) => {
            let tickets = state
                .pool
                .get()
                .await?
                .get_tickets_by_order(order.id)
                .await?;
            api::Response::ok(
                "order is already paid",
                api::Order::new(order, tickets),
            )
        }
    })
}

/// Always acknowledges, so the gateway never retries because of our own
/// failures.
async fn payment_callback(
    State(state): State<SharedAppState>,
    payload: Result<Json<gateway::Callback>, Error>,
) -> api::Response<()> {
    let callback = match payload {
        Ok(Json(callback)) => callback,
        Err(e) => {
            tracing::warn!(error = %e, "malformed payment callback");
            return api::Response::ok("callback received", ());
        }
    };

    let order_code = callback.order_id.clone();
    match settlement::handle_callback(
        &state.pool,
        state.renderer.as_ref(),
        state.notifier.as_ref(),
        state.verifier.as_ref(),
        callback,
    )
    .await
    {
        Ok(settlement) => tracing::debug!(
            order = %order_code,
            status = %settlement.order().status,
            "payment callback processed",
        ),
        Err(e) if e.is_internal() => tracing::error!(
            order = %order_code,
            error = %e,
            "payment callback failed",
        ),
        Err(e) => tracing::warn!(
            order = %order_code,
            code = e.code(),
            error = %e,
            "payment callback not applied",
        ),
    }
    api::Response::ok("callback received", ())
}

async fn list_tickets(
    State(state): State<SharedAppState>,
    CurrentUser(my): CurrentUser,
) -> Result<api::Response<Vec<api::Ticket>>, Error> {
    let tickets = checkin::list_tickets(&state.pool, &my).await?;
    Ok(api::Response::ok(
        "tickets",
        tickets.into_iter().map(api::Ticket::from).collect(),
    ))
}

async fn get_ticket(
    State(state): State<SharedAppState>,
    CurrentUser(my): CurrentUser,
    Path(code): Path<String>,
) -> Result<api::Response<api::Ticket>, Error> {
    let ticket = checkin::get_ticket(&state.pool, &my, &code).await?;
    Ok(api::Response::ok("ticket", ticket.into()))
}

async fn check_in(
    State(state): State<SharedAppState>,
    CurrentUser(my): CurrentUser,
    Path(code): Path<String>,
) -> Result<api::Response<api::Ticket>, Error> {
    let ticket =
        checkin::check_in(&state.pool, state.notifier.as_ref(), &my, &code)
            .await?;
    Ok(api::Response::ok("ticket checked in", ticket.into()))
}

type SharedAppState = Arc<AppState>;

struct AppState {
    pool: db::Pool,

    renderer: Arc<dyn Renderer>,

    notifier: Arc<dyn Notifier>,

    verifier: Arc<dyn Verifier>,

    jwt_expiration_time: Duration,

    jwt_decoding_key: DecodingKey,

    jwt_encoding_key: EncodingKey,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct AuthClaims {
    user_id: api::user::Id,
    exp: i64,
}

#[async_trait]
impl FromRequestParts<SharedAppState> for AuthClaims {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| Error::Unauthorized)?;
        let token_data = decode::<Self>(
            bearer.token(),
            &state.jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(|_| Error::Unauthorized)?;

        Ok(token_data.claims)
    }
}

/// Authenticated caller, loaded fresh so role changes apply immediately.
struct CurrentUser(db::User);

#[async_trait]
impl FromRequestParts<SharedAppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = AuthClaims::from_request_parts(parts, state).await?;
        let user = state
            .pool
            .get()
            .await?
            .get_user_by_id(claims.user_id)
            .await?
            .ok_or(Error::Unauthorized)?;
        Ok(Self(user))
    }
}

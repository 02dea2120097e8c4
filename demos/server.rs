//! REST API server example for the tour booking ledger.
//!
//! Run with: `cargo run --example server`
//!
//! Every response uses the `{"success": bool, ...}` envelope: successful
//! calls carry their payload under `records`/`results`, failures carry a
//! `message` or a field-keyed `errors` map.
//!
//! The caller's identity comes from the `X-User-Id` and `X-Is-Admin`
//! headers; a real deployment would put an authentication layer in front.
//!
//! ## Endpoints
//!
//! - `POST /tour-countries` / `POST /tour-cities` / `POST /tour-hotels` /
//!   `POST /tours` - build up the catalog (admin)
//! - `GET /tour-countries`, `GET /tour-countries/{slug}` - public catalog
//! - `GET /tours` - search available tours
//! - `POST /tour-bookings` - book places on a tour
//! - `GET /tour-bookings` - list all bookings (admin)
//! - `GET /users/{id}/tour-bookings` - list one user's bookings
//! - `PUT /tour-bookings/{id}` - verify a booking (admin)
//! - `DELETE /tour-bookings/{id}` - delete a booking (admin)
//! - `PUT /tour-bookings/{id}/pay-remaining` - settle the remainder
//! - `GET /tour-payments` - list all payments (admin)
//! - `GET /analytics?type=...` - occupancy and booking-count reports (admin)
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:3000/tour-bookings \
//!   -H "Content-Type: application/json" -H "X-User-Id: 7" \
//!   -d '{"tour_id": 1, "adults_count": 2, "children_count": 1}'
//!
//! curl http://localhost:3000/analytics?type=tour_occupancy_by_city \
//!   -H "X-User-Id: 1" -H "X-Is-Admin: true"
//! ```

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tour_ledger_rs::{
    BookingId, Catalog, City, CityId, Country, CountryId, Hotel, HotelId, Ledger, LedgerError,
    Principal, Tour, TourId, TourSearch, UserId, analytics,
};

// === Request DTOs ===

#[derive(Debug, Deserialize)]
struct CountryRequest {
    id: u32,
    slug: String,
    name: String,
    #[serde(default)]
    description: String,
    image_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CityRequest {
    id: u32,
    country_id: u32,
    name: String,
    #[serde(default)]
    description: String,
    image_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HotelRequest {
    id: u32,
    city_id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TourRequest {
    id: u32,
    hotel_id: u32,
    start_date: NaiveDateTime,
    end_date: NaiveDateTime,
    max_participant_count: u16,
    adult_price: Decimal,
}

#[derive(Debug, Deserialize)]
struct BookingRequest {
    tour_id: u32,
    adults_count: u16,
    children_count: u16,
}

#[derive(Debug, Deserialize)]
struct TourSearchParams {
    city_id: Option<u32>,
    country_id: Option<u32>,
    start_date_from: Option<NaiveDate>,
    start_date_to: Option<NaiveDate>,
    min_days: Option<u32>,
    adults_count: Option<u16>,
    children_count: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct AnalyticsParams {
    #[serde(rename = "type")]
    report: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

// === Application State ===

/// Shared application state containing the booking ledger.
#[derive(Clone)]
struct AppState {
    ledger: Arc<Ledger>,
}

// === Error Handling ===

/// Wrapper translating domain errors into enveloped HTTP responses.
enum ApiError {
    Domain(LedgerError),
    MissingIdentity,
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            // Access failures carry no detail about the protected resource.
            ApiError::Domain(LedgerError::AccessDenied) => {
                (StatusCode::FORBIDDEN, json!({ "success": false }))
            }
            ApiError::Domain(err @ LedgerError::CapacityExceeded { .. }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "success": false,
                    "errors": { "adults_count": [err.to_string()] },
                }),
            ),
            ApiError::Domain(err) => {
                let status = match &err {
                    LedgerError::CountryNotFound
                    | LedgerError::CityNotFound
                    | LedgerError::HotelNotFound
                    | LedgerError::TourNotFound
                    | LedgerError::BookingNotFound => StatusCode::NOT_FOUND,
                    LedgerError::DuplicateId
                    | LedgerError::DuplicateSlug
                    | LedgerError::DuplicatePayment => StatusCode::CONFLICT,
                    LedgerError::UnverifiedBooking => StatusCode::UNPROCESSABLE_ENTITY,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, json!({ "success": false, "message": err.to_string() }))
            }
            ApiError::MissingIdentity => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "message": "missing X-User-Id header" }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Reads the acting principal from the identity headers.
fn principal_from(headers: &HeaderMap) -> Result<Principal, ApiError> {
    let user_id = headers
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or(ApiError::MissingIdentity)?;
    let is_admin = headers
        .get("X-Is-Admin")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    Ok(Principal {
        user_id: UserId(user_id),
        is_admin,
    })
}

fn require_admin(headers: &HeaderMap) -> Result<Principal, ApiError> {
    let principal = principal_from(headers)?;
    if !principal.is_admin {
        return Err(ApiError::Domain(LedgerError::AccessDenied));
    }
    Ok(principal)
}

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

fn success_records<T: serde::Serialize>(records: T) -> Json<Value> {
    Json(json!({ "success": true, "records": records }))
}

// === Catalog Handlers ===

async fn add_country(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CountryRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&headers)?;
    state.ledger.catalog().add_country(Country {
        id: CountryId(request.id),
        slug: request.slug,
        name: request.name,
        description: request.description,
        image_path: request.image_path,
    })?;
    Ok(success())
}

async fn list_countries(State(state): State<AppState>) -> Json<Value> {
    success_records(state.ledger.catalog().countries())
}

async fn get_country(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let country = state
        .ledger
        .catalog()
        .country_by_slug(&slug)
        .ok_or(LedgerError::CountryNotFound)?;
    Ok(success_records(country))
}

async fn add_city(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CityRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&headers)?;
    state.ledger.catalog().add_city(City {
        id: CityId(request.id),
        country_id: CountryId(request.country_id),
        name: request.name,
        description: request.description,
        image_path: request.image_path,
    })?;
    Ok(success())
}

async fn add_hotel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<HotelRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&headers)?;
    state.ledger.catalog().add_hotel(Hotel {
        id: HotelId(request.id),
        city_id: CityId(request.city_id),
        name: request.name,
    })?;
    Ok(success())
}

async fn add_tour(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TourRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&headers)?;
    state.ledger.catalog().add_tour(Tour {
        id: TourId(request.id),
        hotel_id: HotelId(request.hotel_id),
        start_date: request.start_date,
        end_date: request.end_date,
        max_participant_count: request.max_participant_count,
        adult_price: request.adult_price,
    })?;
    Ok(success())
}

async fn search_tours(
    State(state): State<AppState>,
    Query(params): Query<TourSearchParams>,
) -> Json<Value> {
    let search = TourSearch {
        city_id: params.city_id.map(CityId),
        country_id: params.country_id.map(CountryId),
        start_date_from: params.start_date_from,
        start_date_to: params.start_date_to,
        min_days: params.min_days,
        adults_count: params.adults_count.unwrap_or(1),
        children_count: params.children_count.unwrap_or(0),
    };
    success_records(state.ledger.search_tours(&search))
}

async fn delete_tour(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u32>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&headers)?;
    state.ledger.delete_tour(TourId(id))?;
    Ok(success())
}

// === Booking Handlers ===

async fn make_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BookingRequest>,
) -> Result<Json<Value>, ApiError> {
    let principal = principal_from(&headers)?;
    let record = state.ledger.make_booking(
        TourId(request.tour_id),
        principal.user_id,
        request.adults_count,
        request.children_count,
    )?;
    Ok(success_records(record))
}

async fn list_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&headers)?;
    Ok(success_records(state.ledger.list_bookings()))
}

async fn list_user_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u32>,
) -> Result<Json<Value>, ApiError> {
    let principal = principal_from(&headers)?;
    let records = state
        .ledger
        .list_bookings_for_user(&principal, UserId(id))?;
    Ok(success_records(records))
}

async fn verify_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u32>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&headers)?;
    state.ledger.verify_booking(BookingId(id))?;
    Ok(success())
}

async fn delete_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u32>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&headers)?;
    state.ledger.delete_booking(BookingId(id))?;
    Ok(success())
}

async fn pay_remaining(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u32>,
) -> Result<Json<Value>, ApiError> {
    let principal = principal_from(&headers)?;
    let payment = state.ledger.pay_remaining(&principal, BookingId(id))?;
    Ok(success_records(payment))
}

async fn list_payments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&headers)?;
    Ok(success_records(state.ledger.payments()))
}

// === Analytics Handlers ===

async fn get_analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AnalyticsParams>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&headers)?;

    let default = analytics::DateRange::all_time();
    let range = analytics::DateRange::new(
        params.start_date.unwrap_or(default.start),
        params.end_date.unwrap_or(default.end),
    );

    let results = match params.report.as_str() {
        "tour_bookings_count_by_city" => {
            json!(analytics::bookings_count_by_city(&state.ledger, &range))
        }
        "tour_bookings_count_by_country" => {
            json!(analytics::bookings_count_by_country(&state.ledger, &range))
        }
        "tour_occupancy_by_city" => {
            json!(analytics::occupancy_by_city(&state.ledger, &range))
        }
        _ => json!({}),
    };

    Ok(Json(json!({ "success": true, "results": results })))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/tour-countries", post(add_country).get(list_countries))
        .route("/tour-countries/{slug}", get(get_country))
        .route("/tour-cities", post(add_city))
        .route("/tour-hotels", post(add_hotel))
        .route("/tours", post(add_tour).get(search_tours))
        .route("/tours/{id}", delete(delete_tour))
        .route("/tour-bookings", post(make_booking).get(list_bookings))
        .route(
            "/tour-bookings/{id}",
            put(verify_booking).delete(delete_booking),
        )
        .route("/tour-bookings/{id}/pay-remaining", put(pay_remaining))
        .route("/users/{id}/tour-bookings", get(list_user_bookings))
        .route("/tour-payments", get(list_payments))
        .route("/analytics", get(get_analytics))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tour_ledger_rs=debug".into()),
        )
        .init();

    let state = AppState {
        ledger: Arc::new(Ledger::new(Arc::new(Catalog::new()))),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Tour ledger API server running on http://127.0.0.1:3000");

    axum::serve(listener, app).await.unwrap();
}

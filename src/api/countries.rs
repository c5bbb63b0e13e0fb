//! Country catalog endpoints.
//!
//! - GET `/` - Filtered, paginated listing
//! - GET `/{slug}` - Country details

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::Auth;
use crate::db::{Country, CountryFilter, Database};
use crate::impl_has_auth_state;
use crate::token::TokenConfig;

/// Default listing page size.
const DEFAULT_PAGE_SIZE: i64 = 20;

/// Upper bound on requested page size.
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone)]
pub struct CountriesState {
    pub db: Database,
    pub tokens: Arc<TokenConfig>,
}

impl_has_auth_state!(CountriesState);

pub fn router(state: CountriesState) -> Router {
    Router::new()
        .route("/", get(list_countries))
        .route("/{slug}", get(show_country))
        .with_state(state)
}

#[derive(Deserialize)]
struct CountriesQuery {
    name: Option<String>,
    capital: Option<String>,
    region: Option<String>,
    language: Option<String>,
    currency: Option<String>,
    calling_code: Option<String>,
    page: Option<i64>,
    items: Option<i64>,
}

#[derive(Serialize)]
struct CountryResponse {
    id: String,
    name: String,
    official_name: Option<String>,
    alpha2_code: Option<String>,
    alpha3_code: Option<String>,
    capital: Option<String>,
    region: Option<String>,
    subregion: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
    population: Option<String>,
    area: Option<String>,
    currencies: Option<String>,
    language: Option<String>,
    calling_code: Option<String>,
    time_zones: Option<String>,
    borders: Option<String>,
    flag: Option<String>,
}

impl From<&Country> for CountryResponse {
    fn from(country: &Country) -> Self {
        Self {
            id: country.slug.clone(),
            name: country.name.clone(),
            official_name: country.official_name.clone(),
            alpha2_code: country.alpha2_code.clone(),
            alpha3_code: country.alpha3_code.clone(),
            capital: country.capital.clone(),
            region: country.region.clone(),
            subregion: country.subregion.clone(),
            latitude: country.latitude.clone(),
            longitude: country.longitude.clone(),
            population: country.population.clone(),
            area: country.area.clone(),
            currencies: country.currencies.clone(),
            language: country.language.clone(),
            calling_code: country.calling_code.clone(),
            time_zones: country.time_zones.clone(),
            borders: country.borders.clone(),
            flag: country.flag.clone(),
        }
    }
}

#[derive(Serialize)]
struct Pagination {
    count: i64,
    page: i64,
    items: i64,
    pages: i64,
}

#[derive(Serialize)]
struct ListCountriesResponse {
    countries: Vec<CountryResponse>,
    pagination: Pagination,
}

/// List countries with optional filters and pagination.
async fn list_countries(
    State(state): State<CountriesState>,
    Auth(_current): Auth,
    Query(query): Query<CountriesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = CountryFilter {
        name: query.name,
        capital: query.capital,
        region: query.region,
        language: query.language,
        currency: query.currency,
        calling_code: query.calling_code,
    };

    let page = query.page.unwrap_or(1).max(1);
    let items = query.items.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let count = state
        .db
        .countries()
        .count(&filter)
        .await
        .db_err("Failed to count countries")?;
    let countries = state
        .db
        .countries()
        .list(&filter, items, (page - 1) * items)
        .await
        .db_err("Failed to list countries")?;

    Ok(Json(ListCountriesResponse {
        countries: countries.iter().map(CountryResponse::from).collect(),
        pagination: Pagination {
            count,
            page,
            items,
            pages: (count as u64).div_ceil(items as u64) as i64,
        },
    }))
}

/// Show one country by slug.
async fn show_country(
    State(state): State<CountriesState>,
    Auth(_current): Auth,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let country = state
        .db
        .countries()
        .get_by_slug(&slug)
        .await
        .db_err("Failed to get country")?
        .ok_or_else(|| ApiError::not_found("Not found"))?;

    Ok(Json(CountryResponse::from(&country)))
}

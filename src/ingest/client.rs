//! HTTP client for the upstream country data API.

use serde::Deserialize;
use std::collections::BTreeMap;
use url::Url;

use super::IngestError;

/// One country as the upstream API describes it. Field names follow the
/// upstream payload; everything is optional because the feed is uneven.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountryData {
    pub name: Option<String>,
    #[serde(rename = "alpha2Code")]
    pub alpha2_code: Option<String>,
    #[serde(rename = "alpha3Code")]
    pub alpha3_code: Option<String>,
    #[serde(rename = "latLng")]
    pub lat_lng: Option<LatLng>,
    pub official_name: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub subregion: Option<String>,
    pub population: Option<u64>,
    pub area: Option<f64>,
    pub currencies: Option<BTreeMap<String, CurrencyInfo>>,
    pub languages: Option<BTreeMap<String, String>>,
    #[serde(rename = "callingCode")]
    pub calling_code: Option<String>,
    pub timezones: Option<Vec<String>>,
    pub borders: Option<Vec<String>>,
    pub flag: Option<FlagUrls>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatLng {
    pub country: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrencyInfo {
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlagUrls {
    pub large: Option<String>,
    pub medium: Option<String>,
    pub small: Option<String>,
}

pub struct CountryApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CountryApiClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Fetch the full country feed, keyed by country code.
    pub async fn all_countries(&self) -> Result<BTreeMap<String, CountryData>, IngestError> {
        let url = self
            .base_url
            .join("countries")
            .map_err(IngestError::BadUrl)?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(IngestError::Http)?
            .error_for_status()
            .map_err(IngestError::Http)?;

        response.json().await.map_err(IngestError::Http)
    }
}

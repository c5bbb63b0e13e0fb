//! Country catalog ingestion: fetch the upstream feed and reconcile it into
//! the local catalog on a schedule.

mod client;

pub use client::{CountryApiClient, CountryData};

use std::time::Duration;
use tracing::{error, info};

use crate::db::{CountryAttrs, Database};

/// Interval between catalog refreshes.
const UPDATE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60); // 24 hours

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateStats {
    pub created: u64,
    pub updated: u64,
    pub errors: u64,
}

enum Outcome {
    Created,
    Updated,
    Unchanged,
}

/// Fetch the upstream feed and reconcile every entry. Per-country failures
/// are counted and logged; they never abort the run.
pub async fn run_update(
    db: &Database,
    client: &CountryApiClient,
) -> Result<UpdateStats, IngestError> {
    info!("Starting country catalog update");

    let countries = client.all_countries().await?;

    let mut stats = UpdateStats::default();
    for (code, data) in countries {
        match reconcile_country(db, &data).await {
            Ok(Outcome::Created) => stats.created += 1,
            Ok(Outcome::Updated) => stats.updated += 1,
            Ok(Outcome::Unchanged) => {}
            Err(e) => {
                stats.errors += 1;
                error!(code = %code, error = %e, "Failed to process country");
            }
        }
    }

    info!(
        created = stats.created,
        updated = stats.updated,
        errors = stats.errors,
        "Country catalog update complete"
    );
    Ok(stats)
}

/// Insert an unknown country or refresh a stale one. The ISO alpha-2 code is
/// the reconcile key.
async fn reconcile_country(db: &Database, data: &CountryData) -> Result<Outcome, IngestError> {
    let attrs = country_attrs(data)?;

    match db
        .countries()
        .find_by_alpha2(&attrs.alpha2_code)
        .await
        .map_err(IngestError::Db)?
    {
        None => {
            let slug = uuid::Uuid::new_v4().simple().to_string();
            db.countries()
                .create(&slug, &attrs)
                .await
                .map_err(IngestError::Db)?;
            info!(name = %attrs.name, "Created country");
            Ok(Outcome::Created)
        }
        Some(existing) => {
            if db
                .countries()
                .update_stale(existing.id, &attrs)
                .await
                .map_err(IngestError::Db)?
            {
                info!(name = %attrs.name, "Updated country");
                Ok(Outcome::Updated)
            } else {
                Ok(Outcome::Unchanged)
            }
        }
    }
}

/// Map an upstream record onto catalog attributes. Name and alpha-2 code are
/// required; everything else degrades to absent.
pub(crate) fn country_attrs(data: &CountryData) -> Result<CountryAttrs, IngestError> {
    let name = data
        .name
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or(IngestError::MissingField("name"))?;
    let alpha2_code = data
        .alpha2_code
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or(IngestError::MissingField("alpha2Code"))?;

    let lat_lng = data.lat_lng.as_ref().and_then(|l| l.country.as_deref());

    Ok(CountryAttrs {
        name,
        alpha2_code,
        alpha3_code: data.alpha3_code.clone(),
        latitude: lat_lng.and_then(|c| c.first()).map(f64::to_string),
        longitude: lat_lng.and_then(|c| c.get(1)).map(f64::to_string),
        official_name: data.official_name.clone(),
        capital: data.capital.clone(),
        region: data.region.clone(),
        subregion: data.subregion.clone(),
        population: data.population.map(|p| p.to_string()),
        area: data.area.map(|a| a.to_string()),
        currencies: data.currencies.as_ref().map(|currencies| {
            currencies
                .iter()
                .map(|(code, info)| match (&info.name, &info.symbol) {
                    (Some(name), Some(symbol)) => format!("{}: {} ({})", code, name, symbol),
                    (Some(name), None) => format!("{}: {}", code, name),
                    _ => code.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ")
        }),
        language: data.languages.as_ref().map(|languages| {
            languages
                .iter()
                .map(|(code, name)| format!("{}: {}", code, name))
                .collect::<Vec<_>>()
                .join(", ")
        }),
        calling_code: data.calling_code.clone(),
        time_zones: data.timezones.as_ref().map(|t| t.join(", ")),
        borders: data.borders.as_ref().map(|b| b.join(", ")),
        flag: data.flag.as_ref().and_then(|flag| {
            flag.large
                .clone()
                .or_else(|| flag.medium.clone())
                .or_else(|| flag.small.clone())
        }),
    })
}

/// Spawn a background task that refreshes the catalog periodically, starting
/// immediately. Returns a handle that can be used to abort the task.
pub fn spawn_update_scheduler(db: Database, client: CountryApiClient) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPDATE_INTERVAL);

        loop {
            interval.tick().await;
            if let Err(e) = run_update(&db, &client).await {
                error!(error = %e, "Country catalog update failed");
            }
        }
    })
}

/// Errors that can occur during a catalog update.
#[derive(Debug)]
pub enum IngestError {
    /// The upstream request failed
    Http(reqwest::Error),
    /// The configured base URL cannot be extended to an endpoint
    BadUrl(url::ParseError),
    /// A catalog write failed
    Db(sqlx::Error),
    /// An upstream record is missing a required field
    MissingField(&'static str),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Http(e) => write!(f, "Upstream request failed: {}", e),
            IngestError::BadUrl(e) => write!(f, "Invalid country API URL: {}", e),
            IngestError::Db(e) => write!(f, "Database error: {}", e),
            IngestError::MissingField(field) => write!(f, "Record is missing {}", field),
        }
    }
}

impl std::error::Error for IngestError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CountryFilter;
    use super::client::{CurrencyInfo, FlagUrls, LatLng};
    use std::collections::BTreeMap;

    fn sample_data() -> CountryData {
        CountryData {
            name: Some("France".to_string()),
            alpha2_code: Some("FR".to_string()),
            alpha3_code: Some("FRA".to_string()),
            lat_lng: Some(LatLng {
                country: Some(vec![46.0, 2.0]),
            }),
            official_name: Some("French Republic".to_string()),
            capital: Some("Paris".to_string()),
            region: Some("Europe".to_string()),
            subregion: Some("Western Europe".to_string()),
            population: Some(67_000_000),
            area: Some(643_801.0),
            currencies: Some(BTreeMap::from([(
                "EUR".to_string(),
                CurrencyInfo {
                    name: Some("Euro".to_string()),
                    symbol: Some("€".to_string()),
                },
            )])),
            languages: Some(BTreeMap::from([(
                "fr".to_string(),
                "French".to_string(),
            )])),
            calling_code: Some("33".to_string()),
            timezones: Some(vec!["UTC+01:00".to_string()]),
            borders: Some(vec!["BEL".to_string(), "DEU".to_string()]),
            flag: Some(FlagUrls {
                large: None,
                medium: Some("https://flags.example/fr-medium.png".to_string()),
                small: Some("https://flags.example/fr-small.png".to_string()),
            }),
        }
    }

    #[test]
    fn test_country_attrs_mapping() {
        let attrs = country_attrs(&sample_data()).unwrap();

        assert_eq!(attrs.name, "France");
        assert_eq!(attrs.alpha2_code, "FR");
        assert_eq!(attrs.latitude.as_deref(), Some("46"));
        assert_eq!(attrs.longitude.as_deref(), Some("2"));
        assert_eq!(attrs.population.as_deref(), Some("67000000"));
        assert_eq!(attrs.currencies.as_deref(), Some("EUR: Euro (€)"));
        assert_eq!(attrs.language.as_deref(), Some("fr: French"));
        assert_eq!(attrs.time_zones.as_deref(), Some("UTC+01:00"));
        assert_eq!(attrs.borders.as_deref(), Some("BEL, DEU"));
        // Largest available flag wins
        assert_eq!(
            attrs.flag.as_deref(),
            Some("https://flags.example/fr-medium.png")
        );
    }

    #[test]
    fn test_country_attrs_requires_name_and_code() {
        let mut data = sample_data();
        data.name = None;
        assert!(country_attrs(&data).is_err());

        let mut data = sample_data();
        data.alpha2_code = Some("   ".to_string());
        assert!(country_attrs(&data).is_err());
    }

    #[tokio::test]
    async fn test_reconcile_creates_then_skips_fresh() {
        let db = Database::open(":memory:").await.unwrap();
        let data = sample_data();

        let outcome = reconcile_country(&db, &data).await.unwrap();
        assert!(matches!(outcome, Outcome::Created));

        let country = db.countries().find_by_alpha2("FR").await.unwrap().unwrap();
        assert_eq!(country.name, "France");
        assert_eq!(country.slug.len(), 32);

        // A second pass within a day leaves the row alone
        let outcome = reconcile_country(&db, &data).await.unwrap();
        assert!(matches!(outcome, Outcome::Unchanged));

        assert_eq!(
            db.countries().count(&CountryFilter::default()).await.unwrap(),
            1
        );
    }

    #[test]
    fn test_upstream_payload_parses() {
        let payload = r#"{
            "FR": {
                "name": "France",
                "alpha2Code": "FR",
                "alpha3Code": "FRA",
                "latLng": {"country": [46.0, 2.0]},
                "capital": "Paris",
                "region": "Europe",
                "population": 67000000,
                "area": 643801.0,
                "currencies": {"EUR": {"name": "Euro", "symbol": "€"}},
                "languages": {"fr": "French"},
                "callingCode": "33",
                "timezones": ["UTC+01:00"],
                "borders": ["BEL"],
                "flag": {"small": "https://flags.example/fr.png"}
            },
            "XX": {}
        }"#;

        let parsed: BTreeMap<String, CountryData> = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["FR"].capital.as_deref(), Some("Paris"));
        // A sparse record still parses; reconcile rejects it later
        assert!(country_attrs(&parsed["XX"]).is_err());
    }
}

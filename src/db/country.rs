use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct CountryStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct Country {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub alpha2_code: Option<String>,
    pub alpha3_code: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub official_name: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub subregion: Option<String>,
    pub population: Option<String>,
    pub area: Option<String>,
    pub currencies: Option<String>,
    pub language: Option<String>,
    pub calling_code: Option<String>,
    pub time_zones: Option<String>,
    pub borders: Option<String>,
    pub flag: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct CountryRow {
    id: i64,
    slug: String,
    name: String,
    alpha2_code: Option<String>,
    alpha3_code: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
    official_name: Option<String>,
    capital: Option<String>,
    region: Option<String>,
    subregion: Option<String>,
    population: Option<String>,
    area: Option<String>,
    currencies: Option<String>,
    language: Option<String>,
    calling_code: Option<String>,
    time_zones: Option<String>,
    borders: Option<String>,
    flag: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<CountryRow> for Country {
    fn from(row: CountryRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            alpha2_code: row.alpha2_code,
            alpha3_code: row.alpha3_code,
            latitude: row.latitude,
            longitude: row.longitude,
            official_name: row.official_name,
            capital: row.capital,
            region: row.region,
            subregion: row.subregion,
            population: row.population,
            area: row.area,
            currencies: row.currencies,
            language: row.language,
            calling_code: row.calling_code,
            time_zones: row.time_zones,
            borders: row.borders,
            flag: row.flag,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Catalog attributes as supplied by ingestion.
#[derive(Debug, Clone, Default)]
pub struct CountryAttrs {
    pub name: String,
    pub alpha2_code: String,
    pub alpha3_code: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub official_name: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub subregion: Option<String>,
    pub population: Option<String>,
    pub area: Option<String>,
    pub currencies: Option<String>,
    pub language: Option<String>,
    pub calling_code: Option<String>,
    pub time_zones: Option<String>,
    pub borders: Option<String>,
    pub flag: Option<String>,
}

/// Listing filters. Name and currency match substrings, the rest are exact.
#[derive(Debug, Clone, Default)]
pub struct CountryFilter {
    pub name: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub language: Option<String>,
    pub currency: Option<String>,
    pub calling_code: Option<String>,
}

impl CountryFilter {
    /// Build the WHERE clause and its bind values for this filter.
    fn clause(&self) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();

        if let Some(name) = non_blank(&self.name) {
            conditions.push("name LIKE ?");
            binds.push(format!("%{}%", name));
        }
        if let Some(capital) = non_blank(&self.capital) {
            conditions.push("capital = ?");
            binds.push(capital.to_string());
        }
        if let Some(region) = non_blank(&self.region) {
            conditions.push("region = ?");
            binds.push(region.to_string());
        }
        if let Some(language) = non_blank(&self.language) {
            conditions.push("language LIKE ?");
            binds.push(format!("%{}%", language));
        }
        if let Some(currency) = non_blank(&self.currency) {
            conditions.push("currencies LIKE ?");
            binds.push(format!("%{}%", currency));
        }
        if let Some(calling_code) = non_blank(&self.calling_code) {
            conditions.push("calling_code = ?");
            binds.push(calling_code.to_string());
        }

        if conditions.is_empty() {
            (String::new(), binds)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), binds)
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

const COUNTRY_COLUMNS: &str = "id, slug, name, alpha2_code, alpha3_code, latitude, longitude, \
     official_name, capital, region, subregion, population, area, currencies, language, \
     calling_code, time_zones, borders, flag, created_at, updated_at";

impl CountryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new catalog entry. Returns the country ID.
    pub async fn create(&self, slug: &str, attrs: &CountryAttrs) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO countries (slug, name, alpha2_code, alpha3_code, latitude, longitude, \
             official_name, capital, region, subregion, population, area, currencies, language, \
             calling_code, time_zones, borders, flag) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(slug)
        .bind(&attrs.name)
        .bind(&attrs.alpha2_code)
        .bind(&attrs.alpha3_code)
        .bind(&attrs.latitude)
        .bind(&attrs.longitude)
        .bind(&attrs.official_name)
        .bind(&attrs.capital)
        .bind(&attrs.region)
        .bind(&attrs.subregion)
        .bind(&attrs.population)
        .bind(&attrs.area)
        .bind(&attrs.currencies)
        .bind(&attrs.language)
        .bind(&attrs.calling_code)
        .bind(&attrs.time_zones)
        .bind(&attrs.borders)
        .bind(&attrs.flag)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Refresh an existing entry, but only when it has not been touched for a
    /// day. Returns whether a write happened.
    pub async fn update_stale(&self, id: i64, attrs: &CountryAttrs) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE countries SET name = ?, alpha3_code = ?, latitude = ?, longitude = ?, \
             official_name = ?, capital = ?, region = ?, subregion = ?, population = ?, area = ?, \
             currencies = ?, language = ?, calling_code = ?, time_zones = ?, borders = ?, \
             flag = ?, updated_at = datetime('now') \
             WHERE id = ? AND updated_at < datetime('now', '-1 day')",
        )
        .bind(&attrs.name)
        .bind(&attrs.alpha3_code)
        .bind(&attrs.latitude)
        .bind(&attrs.longitude)
        .bind(&attrs.official_name)
        .bind(&attrs.capital)
        .bind(&attrs.region)
        .bind(&attrs.subregion)
        .bind(&attrs.population)
        .bind(&attrs.area)
        .bind(&attrs.currencies)
        .bind(&attrs.language)
        .bind(&attrs.calling_code)
        .bind(&attrs.time_zones)
        .bind(&attrs.borders)
        .bind(&attrs.flag)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Get a country by its slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Country>, sqlx::Error> {
        let row: Option<CountryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM countries WHERE slug = ?",
            COUNTRY_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Country::from))
    }

    /// Get a country by its ISO alpha-2 code (the ingestion reconcile key).
    pub async fn find_by_alpha2(&self, alpha2_code: &str) -> Result<Option<Country>, sqlx::Error> {
        let row: Option<CountryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM countries WHERE alpha2_code = ?",
            COUNTRY_COLUMNS
        ))
        .bind(alpha2_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Country::from))
    }

    /// Count countries matching the filter.
    pub async fn count(&self, filter: &CountryFilter) -> Result<i64, sqlx::Error> {
        let (clause, binds) = filter.clause();
        let sql = format!("SELECT COUNT(*) FROM countries{}", clause);
        let mut query = sqlx::query_as(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }
        let count: (i64,) = query.fetch_one(&self.pool).await?;
        Ok(count.0)
    }

    /// List countries matching the filter, ordered by name, paginated.
    pub async fn list(
        &self,
        filter: &CountryFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Country>, sqlx::Error> {
        let (clause, binds) = filter.clause();
        let sql = format!(
            "SELECT {} FROM countries{} ORDER BY name LIMIT ? OFFSET ?",
            COUNTRY_COLUMNS, clause
        );
        let mut query = sqlx::query_as(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }
        let rows: Vec<CountryRow> = query.bind(limit).bind(offset).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Country::from).collect())
    }
}

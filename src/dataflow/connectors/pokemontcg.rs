use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::USER_AGENT;
use crate::dataflow::PageSource;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("couldn't build the HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid cards endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("request for page {page} failed: {source}")]
    Transport {
        page: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("page {page} answered with HTTP {status}")]
    Status { page: u32, status: StatusCode },
    #[error("couldn't decode page {page}: {source}")]
    Decode {
        page: u32,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SetRef {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Images {
    #[serde(default, deserialize_with = "lenient_string")]
    pub small: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub large: Option<String>,
}

/// One card as the API returns it.
///
/// Every field is optional and badly typed values degrade to `None` instead of
/// failing the whole page: numbers and booleans in text slots are kept as their
/// JSON text, anything else is dropped.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub set: Option<SetRef>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub images: Option<Images>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub supertype: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub subtypes: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hp: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub types: Option<Vec<String>>,
}

/// One page of the `/cards` collection.
///
/// Parsed as leniently as the cards inside it: entries of `data` that aren't
/// objects are skipped, and a `totalCount` given as a numeric string is
/// accepted. Anything else in that slot leaves the total unknown.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    #[serde(default, deserialize_with = "lenient_records")]
    pub data: Vec<RawRecord>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_count: Option<u64>,
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(items.into_iter().filter_map(scalar_text).collect())),
        _ => Ok(None),
    }
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;

    if !value.is_object() {
        return Ok(None);
    }

    Ok(serde_json::from_value(value).ok())
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => Ok(number.as_u64()),
        Value::String(text) => Ok(text.trim().parse().ok()),
        _ => Ok(None),
    }
}

fn lenient_records<'de, D>(deserializer: D) -> Result<Vec<RawRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    let total = items.len();

    let records: Vec<RawRecord> = items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    if records.len() < total {
        warn!("Skipped {} malformed cards in page", total - records.len());
    }

    Ok(records)
}

/// Appends `cards` to the base url, keeping any path the base already has
/// (`https://api.pokemontcg.io/v2` becomes `https://api.pokemontcg.io/v2/cards`)
fn cards_endpoint(base_url: &Url) -> Result<Url, url::ParseError> {
    let mut base = base_url.clone();

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join("cards")
}

/// HTTP connector for the Pokemon TCG API `/cards` collection
#[derive(Debug)]
pub struct PokemonTcgClient {
    client: Client,
    cards_url: Url,
}

impl PokemonTcgClient {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            cards_url: cards_endpoint(base_url)?,
        })
    }

    fn get_request(&self, page: u32, page_size: u16) -> reqwest::RequestBuilder {
        self.client
            .request(Method::GET, self.cards_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("page", page.to_string()),
                ("pageSize", page_size.to_string()),
            ])
    }

    async fn execute(&self, page: u32, request: Request) -> Result<Response, FetchError> {
        self.client
            .execute(request)
            .await
            .map_err(|source| FetchError::Transport { page, source })
    }
}

#[async_trait]
impl PageSource for PokemonTcgClient {
    async fn fetch_page(&self, page: u32, page_size: u16) -> Result<PageResponse, FetchError> {
        let request = self
            .get_request(page, page_size)
            .build()
            .map_err(|source| FetchError::Transport { page, source })?;

        debug!("GET {}", request.url());

        let response = self.execute(page, request).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status { page, status });
        }

        response
            .json::<PageResponse>()
            .await
            .map_err(|source| FetchError::Decode { page, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> PokemonTcgClient {
        let base = Url::parse(&server.uri()).unwrap();
        PokemonTcgClient::new(&base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn cards_endpoint_keeps_base_path() {
        let base = Url::parse("https://api.pokemontcg.io/v2").unwrap();
        assert_eq!(
            cards_endpoint(&base).unwrap().as_str(),
            "https://api.pokemontcg.io/v2/cards"
        );

        let base = Url::parse("https://api.pokemontcg.io/v2/").unwrap();
        assert_eq!(
            cards_endpoint(&base).unwrap().as_str(),
            "https://api.pokemontcg.io/v2/cards"
        );
    }

    #[test]
    fn raw_record_tolerates_missing_and_mistyped_fields() {
        let record: RawRecord = serde_json::from_value(json!({
            "id": "base1-4",
            "hp": 120,
            "set": "not an object",
            "images": { "small": "https://images.example/4.png", "large": null },
            "subtypes": ["Stage 2", 3, null, { "x": 1 }],
            "types": "Fire",
            "supertype": null,
            "unknownField": [1, 2, 3]
        }))
        .unwrap();

        assert_eq!(record.id.as_deref(), Some("base1-4"));
        assert_eq!(record.name, None);
        assert_eq!(record.hp.as_deref(), Some("120"));
        assert_eq!(record.set, None);
        assert_eq!(
            record.images,
            Some(Images {
                small: Some("https://images.example/4.png".to_string()),
                large: None,
            })
        );
        assert_eq!(
            record.subtypes,
            Some(vec!["Stage 2".to_string(), "3".to_string()])
        );
        assert_eq!(record.types, None);
        assert_eq!(record.supertype, None);
    }

    #[test]
    fn page_response_defaults_missing_fields() {
        let page: PageResponse = serde_json::from_value(json!({})).unwrap();

        assert!(page.data.is_empty());
        assert_eq!(page.total_count, None);
    }

    #[test]
    fn page_response_tolerates_odd_shapes() {
        let page: PageResponse = serde_json::from_value(json!({
            "data": [{ "id": "sv1-1" }, null, "sv1-2", 7, { "id": "sv1-3" }],
            "totalCount": "300"
        }))
        .unwrap();

        let ids: Vec<_> = page.data.iter().map(|card| card.id.as_deref()).collect();
        assert_eq!(ids, [Some("sv1-1"), Some("sv1-3")]);
        assert_eq!(page.total_count, Some(300));

        let page: PageResponse = serde_json::from_value(json!({
            "data": { "id": "sv1-1" },
            "totalCount": -4
        }))
        .unwrap();

        assert!(page.data.is_empty());
        assert_eq!(page.total_count, None);

        let page: PageResponse = serde_json::from_value(json!({
            "data": null,
            "totalCount": null
        }))
        .unwrap();

        assert!(page.data.is_empty());
        assert_eq!(page.total_count, None);
    }

    #[tokio::test]
    async fn fetch_page_accepts_string_total_and_null_cards() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cards"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [null, { "id": "sv1-1", "name": "Bulbasaur" }],
                "totalCount": "300"
            })))
            .mount(&server)
            .await;

        let page = client_for(&server).fetch_page(1, 250).await.unwrap();

        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].name.as_deref(), Some("Bulbasaur"));
        assert_eq!(page.total_count, Some(300));
    }

    #[tokio::test]
    async fn fetch_page_sends_pagination_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cards"))
            .and(query_param("page", "3"))
            .and(query_param("pageSize", "25"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": "sv1-1", "name": "Sprigatito" },
                    { "id": "sv1-2", "name": "Floragato" }
                ],
                "page": 3,
                "pageSize": 25,
                "count": 2,
                "totalCount": 52
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client_for(&server).fetch_page(3, 25).await.unwrap();

        assert_eq!(page.total_count, Some(52));
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[1].name.as_deref(), Some("Floragato"));
    }

    #[tokio::test]
    async fn fetch_page_maps_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cards"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_page(1, 250).await.unwrap_err();

        assert!(matches!(
            err,
            FetchError::Status {
                page: 1,
                status: StatusCode::TOO_MANY_REQUESTS
            }
        ));
    }

    #[tokio::test]
    async fn fetch_page_reports_undecodable_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cards"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_page(2, 250).await.unwrap_err();

        assert!(matches!(err, FetchError::Decode { page: 2, .. }));
    }

    #[tokio::test]
    async fn fetch_page_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cards"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": [], "totalCount": 0 }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let client = PokemonTcgClient::new(&base, Duration::from_millis(50)).unwrap();
        let err = client.fetch_page(1, 250).await.unwrap_err();

        match err {
            FetchError::Transport { page, source } => {
                assert_eq!(page, 1);
                assert!(source.is_timeout());
            }
            other => panic!("expected a transport timeout, got {other:?}"),
        }
    }
}

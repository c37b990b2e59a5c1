use crate::models::Station;
use anyhow::{anyhow, Context, Result};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const MAX_BODY_BYTES: usize = 1_000_000;

/// A successful station-list fetch: the stations plus the count the backend
/// reported alongside them.
#[derive(Debug, Clone)]
pub struct StationList {
    pub stations: Vec<Station>,
    pub count: usize,
}

/// Client for the two backend endpoints. One fixed base URL, no retries;
/// every failure is terminal for its triggering request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self> {
        let base = parse_base_url(base)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("radiodial/0.1 (terminal station browser)"),
        );
        let http = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http, base })
    }

    pub async fn stations(&self) -> Result<StationList> {
        let url = format!("{}/stations", self.base);
        tracing::debug!(%url, "fetching station list");
        let resp = self.http.get(url).send().await.context("Station list request failed")?;
        let bytes = read_limited(resp, MAX_BODY_BYTES).await?;
        parse_stations(&bytes)
    }

    pub async fn countries(&self) -> Result<Vec<String>> {
        let url = format!("{}/countries", self.base);
        tracing::debug!(%url, "fetching country list");
        let resp = self.http.get(url).send().await.context("Country list request failed")?;
        let bytes = read_limited(resp, MAX_BODY_BYTES).await?;
        parse_countries(&bytes)
    }
}

#[derive(Debug, Deserialize)]
struct StationsResponse {
    success: bool,
    #[serde(default)]
    stations: Vec<Station>,
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountriesResponse {
    success: bool,
    #[serde(default)]
    countries: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

fn parse_stations(bytes: &[u8]) -> Result<StationList> {
    let resp: StationsResponse =
        serde_json::from_slice(bytes).context("Invalid station list response")?;
    if !resp.success {
        return Err(anyhow!(
            "Station list request rejected: {}",
            resp.error.as_deref().unwrap_or("unknown error")
        ));
    }
    let count = resp.count.unwrap_or(resp.stations.len());
    Ok(StationList {
        stations: resp.stations,
        count,
    })
}

fn parse_base_url(s: &str) -> Result<String> {
    let url = Url::parse(s).with_context(|| format!("Invalid API base URL: {s}"))?;
    match url.scheme() {
        "http" | "https" => Ok(s.trim_end_matches('/').to_string()),
        other => Err(anyhow!("Unsupported API base URL scheme: {other}")),
    }
}

fn parse_countries(bytes: &[u8]) -> Result<Vec<String>> {
    let resp: CountriesResponse =
        serde_json::from_slice(bytes).context("Invalid country list response")?;
    if !resp.success {
        return Err(anyhow!(
            "Country list request rejected: {}",
            resp.error.as_deref().unwrap_or("unknown error")
        ));
    }
    Ok(resp.countries)
}

async fn read_limited(resp: reqwest::Response, limit: usize) -> Result<Vec<u8>> {
    if let Some(len) = resp.content_length() {
        if len as usize > limit {
            return Err(anyhow!("HTTP response too large ({len} bytes)"));
        }
    }

    let mut data: Vec<u8> = Vec::new();
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("HTTP body read error")?;
        if data.len().saturating_add(chunk.len()) > limit {
            return Err(anyhow!("HTTP response exceeded size limit"));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_station_list() {
        let body = r#"{
            "success": true,
            "count": 2,
            "stations": [
                {"name":"Jazz FM","stream_url":"u1","country":"France","codec":"MP3","bitrate":128},
                {"name":"Rock Hits","stream_url":"u2"}
            ]
        }"#;
        let list = parse_stations(body.as_bytes()).unwrap();
        assert_eq!(list.count, 2);
        assert_eq!(list.stations[0].bitrate, Some(128));
        assert_eq!(list.stations[1].country, None);
    }

    #[test]
    fn unsuccessful_station_response_is_an_error() {
        let body = r#"{"success": false, "error": "database on fire"}"#;
        let err = parse_stations(body.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("database on fire"));
    }

    #[test]
    fn malformed_station_body_is_an_error() {
        assert!(parse_stations(b"<html>502</html>").is_err());
    }

    #[test]
    fn missing_count_falls_back_to_list_length() {
        let body = r#"{"success": true, "stations": [{"name":"A","stream_url":"u"}]}"#;
        assert_eq!(parse_stations(body.as_bytes()).unwrap().count, 1);
    }

    #[test]
    fn parses_country_list() {
        let body = r#"{"success": true, "count": 2, "countries": ["France", "Germany"]}"#;
        assert_eq!(parse_countries(body.as_bytes()).unwrap(), ["France", "Germany"]);
    }

    #[test]
    fn unsuccessful_country_response_is_an_error() {
        assert!(parse_countries(br#"{"success": false}"#).is_err());
    }

    #[test]
    fn validates_base_url_scheme() {
        assert!(parse_base_url("localhost:5000/api").is_err());
        assert!(parse_base_url("ftp://radio.local/api").is_err());
        assert_eq!(
            parse_base_url("http://localhost:5000/api/").unwrap(),
            "http://localhost:5000/api"
        );
    }
}

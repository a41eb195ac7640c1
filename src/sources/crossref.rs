//! Crossref metadata source.
//!
//! Uses the Crossref REST API: `GET /works/{doi}` for exact lookups and
//! `GET /works?query.*=...` for ranked bibliographic search.

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::OnceLock;
use url::Url;

use crate::config::LookupConfig;
use crate::models::{Author, NormalizedRecord, RecordBuilder, SearchRequest};
use crate::sources::{LookupSource, SourceError};
use crate::utils::{with_retry, HttpClient, RetryConfig};

/// Fields requested from search results
const SELECT_FIELDS: &str = "DOI,title,author,container-title,published,published-print,\
published-online,issued,volume,issue,page,article-number,publisher";

/// Crossref metadata source
#[derive(Debug, Clone)]
pub struct CrossRefSource {
    client: HttpClient,
    base_url: Url,
    mailto: Option<String>,
    retry: RetryConfig,
}

impl CrossRefSource {
    /// Create a source from explicit lookup and retry settings
    pub fn new(config: &LookupConfig, retry: RetryConfig) -> Result<Self, SourceError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            SourceError::InvalidRequest(format!("invalid base URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SourceError::InvalidRequest(format!(
                "invalid base URL {}",
                config.base_url
            )));
        }

        Ok(Self {
            client: HttpClient::from_config(config)?,
            base_url,
            mailto: config
                .mailto
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            retry,
        })
    }

    /// URL of `/works` plus extra path segments
    fn works_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidRequest("base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .push("works")
            .extend(segments);
        if let Some(mailto) = &self.mailto {
            url.query_pairs_mut().append_pair("mailto", mailto);
        }
        Ok(url)
    }

    fn search_url(&self, request: &SearchRequest) -> Result<Url, SourceError> {
        let mut url = self.works_url(std::iter::empty())?;
        {
            let mut pairs = url.query_pairs_mut();
            let terms = [
                ("query.title", &request.title),
                ("query.author", &request.author),
                ("query.container-title", &request.container),
                ("query.bibliographic", &request.bibliographic),
            ];
            for (key, value) in terms {
                if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                    pairs.append_pair(key, value);
                }
            }
            if let Some(year) = request.year {
                pairs.append_pair(
                    "filter",
                    &format!("from-pub-date:{},until-pub-date:{}", year, year),
                );
            }
            pairs.append_pair("rows", &request.rows.max(1).to_string());
            pairs.append_pair("select", SELECT_FIELDS);
        }
        Ok(url)
    }

    /// GET a JSON document, retrying transient failures
    async fn fetch<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, SourceError> {
        let client = &self.client;
        with_retry(self.retry, || {
            let url = url.clone();
            async move {
                let response = client.get(url).await?;
                let response = check_status(response, what).await?;
                let bytes = response.bytes().await?;
                serde_json::from_slice::<T>(&bytes).map_err(SourceError::from)
            }
        })
        .await
    }
}

/// Map HTTP status codes onto source errors
async fn check_status(response: Response, what: &str) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => Err(SourceError::NotFound(what.to_string())),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            Err(SourceError::RateLimit(retry_after))
        }
        s if s.is_server_error() => Err(SourceError::Server(s.as_u16())),
        s => {
            let body = response.text().await.unwrap_or_default();
            let message = body.trim().chars().take(200).collect::<String>();
            Err(SourceError::Api {
                status: s.as_u16(),
                message: if message.is_empty() {
                    what.to_string()
                } else {
                    message
                },
            })
        }
    }
}

#[async_trait]
impl LookupSource for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "Crossref"
    }

    async fn get_by_doi(&self, doi: &str) -> Result<NormalizedRecord, SourceError> {
        let url = self.works_url(doi.split('/'))?;
        tracing::debug!("Fetching DOI {} from Crossref", doi);

        let data: CRWorkResponse = self.fetch(url, doi).await?;
        Ok(data.message.into_record())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<NormalizedRecord>, SourceError> {
        let url = self.search_url(request)?;
        tracing::debug!("Searching Crossref: {}", url);

        let data: CRSearchResponse = self.fetch(url, "search").await?;
        Ok(data
            .message
            .items
            .into_iter()
            .map(CRItem::into_record)
            .collect())
    }
}

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("markup pattern is valid"))
}

/// Strip inline markup (`<i>`, `<sub>`, `<mml:math>`...) and collapse whitespace
fn clean_text(text: &str) -> String {
    let stripped = markup_regex().replace_all(text, "");
    let decoded = stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ===== Crossref API Types =====

#[derive(Debug, Deserialize)]
struct CRWorkResponse {
    message: CRItem,
}

#[derive(Debug, Deserialize)]
struct CRSearchResponse {
    message: CRSearchMessage,
}

#[derive(Debug, Deserialize)]
struct CRSearchMessage {
    #[serde(default)]
    items: Vec<CRItem>,
}

#[derive(Debug, Deserialize)]
struct CRAuthor {
    given: Option<String>,
    family: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CRDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl CRDate {
    fn year(&self) -> Option<i32> {
        self.date_parts.first().and_then(|parts| parts.first().copied().flatten())
    }
}

#[derive(Debug, Deserialize)]
struct CRItem {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<CRAuthor>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    published: Option<CRDate>,
    #[serde(rename = "published-print")]
    published_print: Option<CRDate>,
    #[serde(rename = "published-online")]
    published_online: Option<CRDate>,
    issued: Option<CRDate>,
    volume: Option<String>,
    issue: Option<String>,
    page: Option<String>,
    #[serde(rename = "article-number")]
    article_number: Option<String>,
    publisher: Option<String>,
}

impl CRItem {
    fn year(&self) -> Option<i32> {
        [
            &self.published,
            &self.published_print,
            &self.published_online,
            &self.issued,
        ]
        .into_iter()
        .filter_map(|date| date.as_ref().and_then(CRDate::year))
        .next()
    }

    fn into_record(self) -> NormalizedRecord {
        let year = self.year();

        let authors = self
            .author
            .into_iter()
            .filter_map(|a| match (a.family, a.given, a.name) {
                (Some(family), given, _) => Some(Author::new(family, given.unwrap_or_default())),
                (None, _, Some(name)) => Some(Author::literal(name)),
                (None, Some(given), None) => Some(Author::literal(given)),
                (None, None, None) => None,
            })
            .filter(|a| !a.family.is_empty())
            .collect();

        let mut builder = RecordBuilder::new().authors(authors);
        if let Some(title) = self.title.iter().map(|t| clean_text(t)).find(|t| !t.is_empty()) {
            builder = builder.title(title);
        }

        let journal = self
            .container_title
            .iter()
            .map(|t| clean_text(t))
            .find(|t| !t.is_empty())
            .or_else(|| self.publisher.clone());
        if let Some(journal) = journal {
            builder = builder.journal(journal);
        }
        if let Some(year) = year {
            builder = builder.year(year);
        }
        if let Some(volume) = self.volume {
            builder = builder.volume(volume);
        }
        if let Some(issue) = self.issue {
            builder = builder.issue(issue);
        }
        if let Some(pages) = self.page.or(self.article_number) {
            builder = builder.pages(pages);
        }
        if let Some(publisher) = self.publisher {
            builder = builder.publisher(publisher);
        }
        if let Some(doi) = self.doi {
            builder = builder.doi(doi);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Query;
    use mockito::Matcher;
    use std::time::Duration;

    const WORK_JSON: &str = r#"{
        "status": "ok",
        "message-type": "work",
        "message": {
            "DOI": "10.1126/science.1127647",
            "title": ["Reducing the Dimensionality of Data with <i>Neural</i>   Networks"],
            "author": [
                {"given": "G. E.", "family": "Hinton", "sequence": "first"},
                {"given": "R. R.", "family": "Salakhutdinov", "sequence": "additional"}
            ],
            "container-title": ["Science"],
            "published": {"date-parts": [[2006, 7, 28]]},
            "volume": "313",
            "issue": "5786",
            "page": "504-507",
            "publisher": "American Association for the Advancement of Science"
        }
    }"#;

    fn source_for(server: &mockito::Server, max_attempts: u32) -> CrossRefSource {
        let config = LookupConfig {
            base_url: server.url(),
            requests_per_second: 0.0,
            ..LookupConfig::default()
        };
        let retry = RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        };
        CrossRefSource::new(&config, retry).unwrap()
    }

    #[tokio::test]
    async fn test_get_by_doi_parses_work() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works/10.1126/science.1127647")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(WORK_JSON)
            .create_async()
            .await;

        let source = source_for(&server, 1);
        let record = source.get_by_doi("10.1126/science.1127647").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            record.title.as_deref(),
            Some("Reducing the Dimensionality of Data with Neural Networks")
        );
        assert_eq!(record.authors.len(), 2);
        assert_eq!(record.authors[0], Author::new("Hinton", "G. E."));
        assert_eq!(record.journal.as_deref(), Some("Science"));
        assert_eq!(record.year, Some(2006));
        assert_eq!(record.volume.as_deref(), Some("313"));
        assert_eq!(record.issue.as_deref(), Some("5786"));
        assert_eq!(record.pages.as_deref(), Some("504-507"));
        assert_eq!(record.doi.as_deref(), Some("10.1126/science.1127647"));
    }

    #[tokio::test]
    async fn test_search_sends_structured_terms() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            r#"{{"status":"ok","message":{{"total-results":1,"items":[{}]}}}}"#,
            serde_json::from_str::<serde_json::Value>(WORK_JSON).unwrap()["message"]
        );
        let mock = server
            .mock("GET", "/works")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query.author".into(), "Hinton".into()),
                Matcher::UrlEncoded("query.container-title".into(), "Science".into()),
                Matcher::UrlEncoded(
                    "filter".into(),
                    "from-pub-date:2006,until-pub-date:2006".into(),
                ),
                Matcher::UrlEncoded("rows".into(), "3".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let source = source_for(&server, 1);
        let query = Query::AuthorJournalYear {
            author: "Hinton".to_string(),
            journal: "Science".to_string(),
            year: Some(2006),
        };
        let record = source.resolve(&query, 3).await.unwrap();

        mock.assert_async().await;
        assert_eq!(record.doi.as_deref(), Some("10.1126/science.1127647"));
    }

    #[tokio::test]
    async fn test_search_hit_is_completed_from_works_record() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"ok","message":{"total-results":1,"items":[{
                    "DOI": "10.1126/science.1127647",
                    "title": ["Reducing the dimensionality of data with neural networks"],
                    "author": [{"given": "G. E.", "family": "Hinton"}],
                    "container-title": ["Science"],
                    "published": {"date-parts": [[2006]]}
                }]}}"#,
            )
            .create_async()
            .await;
        let work = server
            .mock("GET", "/works/10.1126/science.1127647")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(WORK_JSON)
            .create_async()
            .await;

        let source = source_for(&server, 1);
        let query = Query::TitleYear {
            title: "Reducing the dimensionality of data".to_string(),
            year: Some(2006),
        };
        let record = source.resolve(&query, 3).await.unwrap();

        search.assert_async().await;
        work.assert_async().await;
        assert_eq!(record.volume.as_deref(), Some("313"));
        assert_eq!(record.issue.as_deref(), Some("5786"));
        assert_eq!(record.pages.as_deref(), Some("504-507"));
        assert_eq!(record.authors.len(), 2);
    }

    #[tokio::test]
    async fn test_search_hit_kept_when_works_record_missing() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"ok","message":{"total-results":1,"items":[{
                    "DOI": "10.1038/gone",
                    "title": ["A withdrawn record"],
                    "author": [{"given": "Jane", "family": "Smith"}]
                }]}}"#,
            )
            .create_async()
            .await;
        let _work = server
            .mock("GET", "/works/10.1038/gone")
            .with_status(404)
            .with_body("Resource not found.")
            .create_async()
            .await;

        let source = source_for(&server, 1);
        let query = Query::TitleYear {
            title: "A withdrawn record".to_string(),
            year: None,
        };
        let record = source.resolve(&query, 3).await.unwrap();
        assert_eq!(record.title.as_deref(), Some("A withdrawn record"));
        assert!(record.volume.is_none());
    }

    #[tokio::test]
    async fn test_empty_search_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"ok","message":{"total-results":0,"items":[]}}"#)
            .create_async()
            .await;

        let source = source_for(&server, 1);
        let query = Query::TitleYear {
            title: "No such paper".to_string(),
            year: None,
        };
        assert!(matches!(
            source.resolve(&query, 3).await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_404_is_not_found_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works/10.1038/missing")
            .with_status(404)
            .with_body("Resource not found.")
            .expect(1)
            .create_async()
            .await;

        let source = source_for(&server, 3);
        let result = source.get_by_doi("10.1038/missing").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works/10.1038/flaky")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let source = source_for(&server, 3);
        let result = source.get_by_doi("10.1038/flaky").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(SourceError::Server(503))));
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works/10.1038/busy")
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(2)
            .create_async()
            .await;

        let source = source_for(&server, 2);
        let result = source.get_by_doi("10.1038/busy").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(SourceError::RateLimit(Some(0)))));
    }

    #[tokio::test]
    async fn test_bad_request_is_permanent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body("Invalid filter")
            .expect(1)
            .create_async()
            .await;

        let source = source_for(&server, 3);
        let query = Query::TitleYear {
            title: "anything".to_string(),
            year: None,
        };
        let result = source.resolve(&query, 1).await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(SourceError::Api { status: 400, ref message }) if message == "Invalid filter"
        ));
    }

    #[test]
    fn test_mailto_is_sent_as_query_parameter() {
        let config = LookupConfig {
            base_url: "https://api.crossref.org".to_string(),
            mailto: Some(" lab@example.org ".to_string()),
            ..LookupConfig::default()
        };
        let source = CrossRefSource::new(&config, RetryConfig::no_retry()).unwrap();
        let url = source.works_url(["10.1000", "abc"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.crossref.org/works/10.1000/abc?mailto=lab%40example.org"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = LookupConfig {
            base_url: "not a url".to_string(),
            ..LookupConfig::default()
        };
        assert!(CrossRefSource::new(&config, RetryConfig::no_retry()).is_err());
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("CO<sub>2</sub>  capture &amp; storage"),
            "CO2 capture & storage"
        );
        assert_eq!(clean_text("a < b and c > d"), "a < b and c > d");
    }

    #[test]
    fn test_item_fallbacks() {
        let item: CRItem = serde_json::from_str(
            r#"{
                "title": ["Consensus statement"],
                "author": [{"name": "WHO Working Group"}],
                "publisher": "Elsevier",
                "issued": {"date-parts": [[null]]},
                "published-online": {"date-parts": [[2020, 3]]},
                "article-number": "e123"
            }"#,
        )
        .unwrap();
        let record = item.into_record();
        assert_eq!(record.authors, vec![Author::literal("WHO Working Group")]);
        assert_eq!(record.journal.as_deref(), Some("Elsevier"));
        assert_eq!(record.year, Some(2020));
        assert_eq!(record.pages.as_deref(), Some("e123"));
        assert_eq!(record.doi, None);
    }
}

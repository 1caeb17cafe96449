//! Cursor-based pagination against the GitHub GraphQL search API.
//!
//! The pagination loop is written against the [`RepositorySearch`] trait so
//! it can be exercised without the network; [`GithubSearchClient`] is the
//! production implementation.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
const USER_AGENT: &str = concat!("ck-harvest/", env!("CARGO_PKG_VERSION"));

const SEARCH_QUERY: &str = r#"
query TopRepositories($searchQuery: String!, $pageSize: Int!, $after: String) {
  search(query: $searchQuery, type: REPOSITORY, first: $pageSize, after: $after) {
    repositoryCount
    pageInfo {
      endCursor
      hasNextPage
    }
    edges {
      node {
        ... on Repository {
          name
          url
        }
      }
    }
  }
}
"#;

/// A repository returned by the search, identified by name and API URL.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepositoryRef {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge {
    pub node: RepositoryRef,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// One page of search results.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub repository_count: u64,
    pub page_info: PageInfo,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl SearchPage {
    /// The page returned when the API gave us nothing usable: no edges and
    /// no continuation, so pagination ends with whatever has accumulated.
    fn empty() -> Self {
        Self {
            repository_count: 0,
            page_info: PageInfo {
                end_cursor: None,
                has_next_page: false,
            },
            edges: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<GraphqlData>,
}

#[derive(Debug, Deserialize)]
struct GraphqlData {
    search: Option<SearchPage>,
}

#[async_trait]
pub trait RepositorySearch {
    /// Fetch a single page of results, continuing from `after` when given.
    async fn search_page(&self, after: Option<&str>) -> Result<SearchPage>;
}

/// GitHub GraphQL search client.
pub struct GithubSearchClient {
    client: reqwest::Client,
    token: String,
    search_term: String,
    page_size: u32,
}

impl GithubSearchClient {
    pub fn new(token: String, search_term: String, page_size: u32) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            token,
            search_term,
            page_size,
        })
    }
}

#[async_trait]
impl RepositorySearch for GithubSearchClient {
    async fn search_page(&self, after: Option<&str>) -> Result<SearchPage> {
        // The cursor travels as a GraphQL variable; the query text itself is
        // never rewritten between requests.
        let body = serde_json::json!({
            "query": SEARCH_QUERY,
            "variables": {
                "searchQuery": self.search_term,
                "pageSize": self.page_size,
                "after": after,
            },
        });

        let response = match self
            .client
            .post(GITHUB_GRAPHQL_URL)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!("Search request failed, treating as end of results: {err}");
                return Ok(SearchPage::empty());
            }
        };

        let status = response.status();
        let payload: GraphqlResponse = match response.json().await {
            Ok(payload) => payload,
            Err(err) => {
                warn!("Search response (status {status}) was not valid JSON, treating as end of results: {err}");
                return Ok(SearchPage::empty());
            }
        };

        match payload.data.and_then(|data| data.search) {
            Some(page) => Ok(page),
            None => {
                warn!("Search response (status {status}) carried no search data, treating as end of results");
                Ok(SearchPage::empty())
            }
        }
    }
}

/// Accumulate repositories page by page until `max_repositories` are
/// collected or the API reports no further pages, whichever comes first.
/// The result is clipped to exactly `max_repositories` entries even if the
/// last page overshoots.
pub async fn collect_repositories(
    search: &dyn RepositorySearch,
    max_repositories: usize,
) -> Result<Vec<RepositoryRef>> {
    let mut repositories: Vec<RepositoryRef> = Vec::new();
    let mut after: Option<String> = None;

    while repositories.len() < max_repositories {
        let page = search.search_page(after.as_deref()).await?;

        if repositories.is_empty() && page.repository_count > 0 {
            info!("Search matched {} repositories", page.repository_count);
        }
        repositories.extend(page.edges.into_iter().map(|edge| edge.node));

        if !page.page_info.has_next_page {
            break;
        }
        match page.page_info.end_cursor {
            Some(cursor) => after = Some(cursor),
            None => {
                warn!("Page reported a continuation but carried no cursor, stopping");
                break;
            }
        }
    }

    repositories.truncate(max_repositories);
    Ok(repositories)
}

use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::error::QueryError;
use crate::query::StoryQuery;
use crate::scheduler::Scheduler;
use crate::story::Story;

const TOP_STORIES: usize = 10;

pub struct AppState {
    pub query: StoryQuery,
    pub scheduler: Arc<Scheduler>,
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub heading: &'static str,
    pub stories: Vec<Story>,
    pub refreshing: bool,
    pub last_updated: Option<String>,
}

#[derive(Template)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub query: String,
    pub stories: Vec<Story>,
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/top", get(top))
        .route("/search", get(search))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn listing(
    state: &AppState,
    heading: &'static str,
    limit: Option<usize>,
) -> IndexTemplate {
    IndexTemplate {
        heading,
        stories: state.query.list_all(limit).await,
        refreshing: state.scheduler.is_refreshing(),
        last_updated: state
            .query
            .last_updated()
            .await
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
    }
}

// Route handlers
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    HtmlTemplate(listing(&state, "All stories", None).await)
}

pub async fn top(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    HtmlTemplate(listing(&state, "Latest stories", Some(TOP_STORIES)).await)
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let Some(query) = params.q else {
        return (StatusCode::NOT_ACCEPTABLE, "Search parameter was not given").into_response();
    };

    let stories = match state.query.search(&query).await {
        Ok(stories) => stories,
        // A blank query renders the same "no results" notice as a miss.
        Err(QueryError::EmptyQuery) => Vec::new(),
    };

    HtmlTemplate(SearchTemplate { query, stories }).into_response()
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SchedulerSettings;
    use crate::store::StoryStore;
    use crate::story::Source;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    fn create_test_app(stories: Vec<Story>) -> Router {
        let store = Arc::new(StoryStore::with_stories(stories));
        let scheduler = Arc::new(Scheduler::new(
            Vec::new(),
            store.clone(),
            SchedulerSettings {
                refresh_interval: Duration::from_secs(20),
                cycle_timeout: Duration::from_secs(5),
                channel_capacity: 8,
            },
        ));
        let state = Arc::new(AppState {
            query: StoryQuery::new(store),
            scheduler,
        });

        router(state)
    }

    fn seeded_stories() -> Vec<Story> {
        vec![
            Story::new(
                "Go concurrency patterns",
                "rob",
                "https://go.dev/talks/concurrency",
                Source::HackerNews,
            ),
            Story::new("Learning Rust", "ferris", "https://rust-lang.org", Source::Reddit),
            Story::new(
                "Go vs Rust",
                "gopher",
                "https://example.com/go-vs-rust",
                Source::HackerNews,
            ),
        ]
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    mod health_tests {
        use super::*;

        #[tokio::test]
        async fn test_health_endpoint() {
            let (status, body) = get(create_test_app(Vec::new()), "/health").await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, "OK");
        }
    }

    mod index_tests {
        use super::*;

        #[tokio::test]
        async fn test_index_empty_store() {
            let (status, body) = get(create_test_app(Vec::new()), "/").await;

            assert_eq!(status, StatusCode::OK);
            assert!(body.contains("name=\"q\""));
        }

        #[tokio::test]
        async fn test_index_newest_first() {
            let (status, body) = get(create_test_app(seeded_stories()), "/").await;

            assert_eq!(status, StatusCode::OK);
            let newest = body.find("Go vs Rust").unwrap();
            let middle = body.find("Learning Rust").unwrap();
            let oldest = body.find("Go concurrency patterns").unwrap();
            assert!(newest < middle && middle < oldest);

            assert!(body.contains("#HackerNews"));
            assert!(body.contains("#Reddit"));
            assert!(body.contains("ferris"));
            assert!(body.contains("rust-lang.org"));
        }

        #[tokio::test]
        async fn test_index_escapes_titles() {
            let stories = vec![Story::new(
                "<script>alert(1)</script>",
                "mallory",
                "",
                Source::Reddit,
            )];
            let (_, body) = get(create_test_app(stories), "/").await;

            assert!(!body.contains("<script>alert(1)</script>"));
            assert!(body.contains("&lt;script&gt;"));
        }

        #[tokio::test]
        async fn test_top_is_capped() {
            let stories = (0..25)
                .map(|i| Story::new(format!("Story number {:02}", i), "", "", Source::HackerNews))
                .collect();
            let (status, body) = get(create_test_app(stories), "/top").await;

            assert_eq!(status, StatusCode::OK);
            assert!(body.contains("Story number 24"));
            assert!(body.contains("Story number 15"));
            assert!(!body.contains("Story number 14"));
        }
    }

    mod search_tests {
        use super::*;

        #[tokio::test]
        async fn test_search_matches_in_store_order() {
            let (status, body) = get(create_test_app(seeded_stories()), "/search?q=go").await;

            assert_eq!(status, StatusCode::OK);
            let first = body.find("Go concurrency patterns").unwrap();
            let second = body.find("Go vs Rust").unwrap();
            assert!(first < second);
            assert!(!body.contains("Learning Rust"));
            assert!(body.contains("Back"));
        }

        #[tokio::test]
        async fn test_search_is_case_insensitive() {
            let (_, body) = get(create_test_app(seeded_stories()), "/search?q=RUST").await;

            assert!(body.contains("Learning Rust"));
            assert!(body.contains("Go vs Rust"));
        }

        #[tokio::test]
        async fn test_search_no_results() {
            let (status, body) = get(create_test_app(seeded_stories()), "/search?q=python").await;

            assert_eq!(status, StatusCode::OK);
            assert!(body.contains("Sorry, no results with 'python'"));
        }

        #[tokio::test]
        async fn test_search_empty_query_shows_notice() {
            let (status, body) = get(create_test_app(seeded_stories()), "/search?q=").await;

            assert_eq!(status, StatusCode::OK);
            assert!(body.contains("Sorry, no results"));
            assert!(!body.contains("Learning Rust"));
        }

        #[tokio::test]
        async fn test_search_missing_parameter() {
            let (status, body) = get(create_test_app(seeded_stories()), "/search").await;

            assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
            assert_eq!(body, "Search parameter was not given");
        }
    }

    mod search_params_tests {
        use super::*;

        #[test]
        fn test_missing_q() {
            let params: SearchParams = serde_urlencoded::from_str("").unwrap();
            assert_eq!(params.q, None);
        }

        #[test]
        fn test_decoded_q() {
            let params: SearchParams = serde_urlencoded::from_str("q=go+vs+rust").unwrap();
            assert_eq!(params.q.as_deref(), Some("go vs rust"));
        }
    }
}

// src/services/catalog.rs

//! Remote catalog API client.
//!
//! Authenticated JSON client for show lookup, season metadata and the user
//! lists that episodes are synchronized into.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{
    CatalogSeason, CatalogShow, Config, ListItem, ListSnapshot, RemoteId, RemoteList, SearchResult,
};
use crate::pipeline::reconcile::{BatchResponse, ListWriter};
use crate::utils::http::create_client_with_headers;

const API_VERSION: &str = "2";

/// Client for the remote catalog API.
pub struct CatalogClient {
    config: Arc<Config>,
    client: Client,
}

impl CatalogClient {
    /// Create a client; fails when credentials are missing.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let headers = Self::auth_headers(&config)?;
        let client = create_client_with_headers(&config.http, headers)?;
        Ok(Self { config, client })
    }

    fn auth_headers(config: &Config) -> Result<HeaderMap> {
        let catalog = &config.catalog;
        if catalog.client_id.trim().is_empty() {
            return Err(AppError::auth("catalog.client_id is not set"));
        }
        if catalog.access_token.trim().is_empty() {
            return Err(AppError::auth("catalog.access_token is not set"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("trakt-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            "trakt-api-key",
            HeaderValue::from_str(catalog.client_id.trim())
                .map_err(|_| AppError::auth("catalog.client_id is not a valid header value"))?,
        );
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", catalog.access_token.trim()))
            .map_err(|_| AppError::auth("catalog.access_token is not a valid header value"))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        Ok(headers)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.catalog.api_url.trim_end_matches('/'), path)
    }

    /// List owner path segment; `me` when no username is configured.
    fn user(&self) -> &str {
        match self.config.catalog.username.trim() {
            "" => "me",
            user => user,
        }
    }

    /// Map a non-success response to an error carrying its body.
    async fn check(response: Response, context: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::auth(format!("{context}: {status}")));
        }
        Err(AppError::upstream(context, format!("{status}: {}", body.trim())))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, context: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send().await?;
        let response = Self::check(response, context).await?;
        Ok(response.json().await?)
    }

    /// Look a show up by TMDB id.
    pub async fn find_show_by_tmdb(&self, tmdb_id: u64) -> Result<Option<CatalogShow>> {
        let results: Vec<SearchResult> = self
            .get_json(&format!("/search/tmdb/{tmdb_id}?type=show"), "show search by TMDB id")
            .await?;
        Ok(results.into_iter().find_map(|r| r.show))
    }

    /// Look a show up by free-text title.
    pub async fn search_show(&self, title: &str) -> Result<Option<CatalogShow>> {
        let response = self
            .client
            .get(self.url("/search/show"))
            .query(&[("query", title)])
            .send()
            .await?;
        let results: Vec<SearchResult> = Self::check(response, "show search").await?.json().await?;
        Ok(results.into_iter().find_map(|r| r.show))
    }

    /// Catalog show id for a library show: explicit id, then TMDB id, then title search.
    pub async fn resolve_show_id(
        &self,
        catalog_id: Option<&str>,
        tmdb_id: Option<u64>,
        title: &str,
    ) -> Result<String> {
        if let Some(id) = catalog_id.filter(|id| !id.trim().is_empty()) {
            return Ok(id.trim().to_string());
        }

        let show = match tmdb_id {
            Some(tmdb_id) => self.find_show_by_tmdb(tmdb_id).await?,
            None => self.search_show(title).await?,
        };
        let show = show.ok_or_else(|| AppError::upstream("show search", format!("no catalog show for '{title}'")))?;

        let id = show
            .ids
            .trakt
            .map(|id| id.to_string())
            .or(show.ids.slug)
            .ok_or_else(|| AppError::upstream("show search", format!("'{}' has no id", show.title)))?;

        log::info!("Found catalog show {} ({})", show.title, id);
        Ok(id)
    }

    /// Every season with its episodes.
    pub async fn fetch_seasons(&self, show_id: &str) -> Result<Vec<CatalogSeason>> {
        self.get_json(
            &format!("/shows/{show_id}/seasons?extended=episodes,full"),
            "season listing",
        )
        .await
    }

    pub async fn user_lists(&self) -> Result<Vec<RemoteList>> {
        self.get_json(&format!("/users/{}/lists", self.user()), "user lists")
            .await
    }

    /// The user's list named `name`, created when missing.
    pub async fn find_or_create_list(&self, name: &str) -> Result<RemoteList> {
        if let Some(list) = self.user_lists().await?.into_iter().find(|l| l.name == name) {
            log::info!("Using existing list '{}'", name);
            return Ok(list);
        }

        log::info!("Creating list '{}'", name);
        let body = json!({
            "name": name,
            "privacy": self.config.catalog.list_privacy,
        });
        let response = self
            .client
            .post(self.url(&format!("/users/{}/lists", self.user())))
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(response, "list creation").await?.json().await?)
    }

    /// Episode ids currently in a list.
    pub async fn list_snapshot(&self, list: &RemoteList) -> Result<ListSnapshot> {
        let list_id = Self::list_id(list)?;
        let items: Vec<ListItem> = self
            .get_json(
                &format!("/users/{}/lists/{}/items", self.user(), list_id),
                "list items",
            )
            .await?;
        let snapshot = ListSnapshot::from_items(&items);
        log::info!("List '{}' holds {} episodes", list.name, snapshot.len());
        Ok(snapshot)
    }

    fn list_id(list: &RemoteList) -> Result<String> {
        list.ids
            .trakt
            .map(|id| id.to_string())
            .or_else(|| list.ids.slug.clone())
            .ok_or_else(|| AppError::upstream("list lookup", format!("list '{}' has no id", list.name)))
    }

    /// Writer that adds episodes to `list`.
    pub fn list_writer(&self, list: &RemoteList) -> Result<CatalogListWriter<'_>> {
        Ok(CatalogListWriter {
            client: self,
            list_id: Self::list_id(list)?,
        })
    }

    async fn add_to_list(&self, list_id: &str, ids: &[RemoteId]) -> Result<BatchResponse> {
        let body = add_items_payload(ids);
        let response = self
            .client
            .post(self.url(&format!("/users/{}/lists/{}/items", self.user(), list_id)))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let body = if status == StatusCode::CREATED || status == StatusCode::TOO_MANY_REQUESTS {
            String::new()
        } else {
            response.text().await.unwrap_or_default()
        };
        Ok(batch_response(status, &body))
    }

    /// Delete one of the user's lists.
    pub async fn delete_list(&self, list: &RemoteList) -> Result<()> {
        let list_id = Self::list_id(list)?;
        let response = self
            .client
            .delete(self.url(&format!("/users/{}/lists/{}", self.user(), list_id)))
            .send()
            .await?;
        Self::check(response, "list deletion").await?;
        log::info!("Deleted list '{}'", list.name);
        Ok(())
    }
}

/// Interpret the status of an add-items request.
fn batch_response(status: StatusCode, body: &str) -> BatchResponse {
    match status {
        StatusCode::CREATED => BatchResponse::Accepted,
        StatusCode::TOO_MANY_REQUESTS => BatchResponse::Throttled,
        other => BatchResponse::Rejected {
            status: other.as_u16(),
            message: body.trim().to_string(),
        },
    }
}

fn add_items_payload(ids: &[RemoteId]) -> serde_json::Value {
    let episodes: Vec<_> = ids.iter().map(|id| json!({ "ids": { "trakt": id } })).collect();
    json!({ "episodes": episodes, "type": "show" })
}

/// [`ListWriter`] backed by one catalog list.
pub struct CatalogListWriter<'a> {
    client: &'a CatalogClient,
    list_id: String,
}

#[async_trait]
impl ListWriter for CatalogListWriter<'_> {
    async fn add_episodes(&self, ids: &[RemoteId]) -> Result<BatchResponse> {
        self.client.add_to_list(&self.list_id, ids).await
    }
}

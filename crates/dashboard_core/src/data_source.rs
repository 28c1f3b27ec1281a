use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use shared::{
    domain::RecordId,
    error::ApiError,
    protocol::{Cursor, DataEnvelope, Page},
};
use tracing::debug;
use url::Url;

use crate::{
    error::{TransportError, TransportErrorKind},
    resources::Resource,
};

/// Data layer consumed by the pager and the mutation coordinator.
#[async_trait]
pub trait DataSource<R: Resource>: Send + Sync {
    async fn list(&self, cursor: Option<&Cursor>) -> Result<Page<R::Record>, TransportError>;
    async fn create(&self, payload: &R::Payload) -> Result<R::Record, TransportError>;
    async fn update(&self, id: RecordId, payload: &R::Payload)
        -> Result<R::Record, TransportError>;
    async fn remove(&self, id: RecordId) -> Result<(), TransportError>;

    /// Marks the record as the current one. Collections without the notion refuse.
    async fn activate(&self, id: RecordId) -> Result<R::Record, TransportError> {
        Err(TransportError::new(
            TransportErrorKind::Rejected,
            format!("{} {id} cannot be activated", R::LABEL),
        ))
    }
}

#[derive(Serialize)]
struct ListQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

/// REST binding for `/api/v1/<resource>` endpoints.
pub struct HttpDataSource<R> {
    http: Client,
    collection_url: String,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> HttpDataSource<R> {
    pub fn new(http: Client, api_base_url: &Url) -> Self {
        let base = api_base_url.as_str().trim_end_matches('/');
        Self {
            http,
            collection_url: format!("{base}/api/v1/{}", R::PATH),
            _resource: PhantomData,
        }
    }

    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    fn record_url(&self, id: RecordId) -> String {
        format!("{}/{}", self.collection_url, id.0)
    }
}

async fn check_status(res: Response) -> Result<Response, TransportError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    let api_error = serde_json::from_str::<ApiError>(&body).ok();
    Err(TransportError::from_status(status.as_u16(), api_error))
}

#[async_trait]
impl<R: Resource> DataSource<R> for HttpDataSource<R> {
    async fn list(&self, cursor: Option<&Cursor>) -> Result<Page<R::Record>, TransportError> {
        debug!(resource = R::PATH, cursor = ?cursor, "listing page");
        let res = self
            .http
            .get(&self.collection_url)
            .query(&ListQuery {
                cursor: cursor.map(Cursor::as_str),
            })
            .send()
            .await?;
        let body: serde_json::Value = check_status(res).await?.json().await?;
        Ok(Page::from_list_body(body, R::ITEMS_KEY)?)
    }

    async fn create(&self, payload: &R::Payload) -> Result<R::Record, TransportError> {
        let res = self
            .http
            .post(&self.collection_url)
            .json(payload)
            .send()
            .await?;
        let envelope: DataEnvelope<R::Record> = check_status(res).await?.json().await?;
        Ok(envelope.data)
    }

    async fn update(
        &self,
        id: RecordId,
        payload: &R::Payload,
    ) -> Result<R::Record, TransportError> {
        let res = self
            .http
            .put(self.record_url(id))
            .json(payload)
            .send()
            .await?;
        let envelope: DataEnvelope<R::Record> = check_status(res).await?.json().await?;
        Ok(envelope.data)
    }

    async fn remove(&self, id: RecordId) -> Result<(), TransportError> {
        let res = self.http.delete(self.record_url(id)).send().await?;
        check_status(res).await?;
        Ok(())
    }

    async fn activate(&self, id: RecordId) -> Result<R::Record, TransportError> {
        debug!(resource = R::PATH, %id, "activating record");
        let res = self
            .http
            .put(format!("{}/activate", self.record_url(id)))
            .send()
            .await?;
        let envelope: DataEnvelope<R::Record> = check_status(res).await?.json().await?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
#[path = "tests/data_source_tests.rs"]
mod tests;

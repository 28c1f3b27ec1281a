use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use url::Url;

use crate::{
    config::DashboardSettings,
    data_source::{DataSource, HttpDataSource},
    mutation::MutationCoordinator,
    notifications::NotificationRegistry,
    orchestrator::ListOrchestrator,
    pager::CursorPager,
    resources::Resource,
};

/// One signed-in dashboard visit. Owns the notification registry that every
/// page's coordinator writes into; `close` tears it down on navigation away.
pub struct DashboardSession {
    settings: DashboardSettings,
    http: Client,
    api_base_url: Url,
    registry: Arc<NotificationRegistry>,
}

impl DashboardSession {
    pub fn new(settings: DashboardSettings) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Self::with_client(settings, http)
    }

    pub fn with_client(settings: DashboardSettings, http: Client) -> Result<Self> {
        let api_base_url = settings.api_base_url()?;
        let registry = Arc::new(NotificationRegistry::new(
            settings.superseded_resolution,
            settings.event_buffer,
        ));
        Ok(Self {
            settings,
            http,
            api_base_url,
            registry,
        })
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<NotificationRegistry> {
        &self.registry
    }

    /// List page for `R` backed by the HTTP API.
    pub fn board<R: Resource>(&self) -> Arc<ListOrchestrator<R>> {
        let source: Arc<dyn DataSource<R>> =
            Arc::new(HttpDataSource::<R>::new(self.http.clone(), &self.api_base_url));
        self.board_with_source(source)
    }

    pub fn board_with_source<R: Resource>(
        &self,
        source: Arc<dyn DataSource<R>>,
    ) -> Arc<ListOrchestrator<R>> {
        let pager = Arc::new(CursorPager::with_event_buffer(
            source.clone(),
            self.settings.event_buffer,
        ));
        let coordinator = Arc::new(MutationCoordinator::new(source, self.registry.clone()));
        Arc::new(ListOrchestrator::new(
            pager,
            coordinator,
            self.settings.fetch_interval(),
        ))
    }

    pub async fn close(&self) {
        tracing::info!("dashboard session closed");
        self.registry.shutdown().await;
    }
}

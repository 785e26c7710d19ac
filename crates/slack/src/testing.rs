//! In-memory fakes shared by this crate's tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use datadada_core::catalog::{CatalogError, CatalogKind, CatalogSource, ListRecord};
use tokio::sync::Mutex;

use crate::blocks::{MessageTemplate, ModalView};
use crate::client::{SlackApiError, SlackClient};

#[derive(Default)]
pub struct RecordingClient {
    state: Mutex<RecordedCalls>,
}

#[derive(Default)]
struct RecordedCalls {
    posts: Vec<(String, MessageTemplate)>,
    views: Vec<(String, ModalView)>,
    post_failures: VecDeque<SlackApiError>,
    view_failures: VecDeque<SlackApiError>,
}

impl RecordingClient {
    pub async fn fail_next_post(&self, error: SlackApiError) {
        self.state.lock().await.post_failures.push_back(error);
    }

    pub async fn fail_next_view(&self, error: SlackApiError) {
        self.state.lock().await.view_failures.push_back(error);
    }

    pub async fn posts(&self) -> Vec<(String, MessageTemplate)> {
        self.state.lock().await.posts.clone()
    }

    pub async fn views(&self) -> Vec<(String, ModalView)> {
        self.state.lock().await.views.clone()
    }
}

#[async_trait]
impl SlackClient for RecordingClient {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.post_failures.pop_front() {
            return Err(error);
        }
        state.posts.push((channel.to_owned(), message.clone()));
        Ok(())
    }

    async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<(), SlackApiError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.view_failures.pop_front() {
            return Err(error);
        }
        state.views.push((trigger_id.to_owned(), view.clone()));
        Ok(())
    }
}

/// Catalog that answers every kind with the same scripted result.
pub struct StaticCatalog {
    result: Result<Vec<ListRecord>, CatalogError>,
    requested: Mutex<Vec<CatalogKind>>,
}

impl StaticCatalog {
    pub fn records(records: Vec<ListRecord>) -> Self {
        Self { result: Ok(records), requested: Mutex::new(Vec::new()) }
    }

    pub fn failing(error: CatalogError) -> Self {
        Self { result: Err(error), requested: Mutex::new(Vec::new()) }
    }

    pub async fn requested(&self) -> Vec<CatalogKind> {
        self.requested.lock().await.clone()
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn fetch_records(&self, kind: CatalogKind) -> Result<Vec<ListRecord>, CatalogError> {
        self.requested.lock().await.push(kind);
        self.result.clone()
    }
}

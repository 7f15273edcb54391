//! Resource endpoints

use async_trait::async_trait;
use fintrack_core::{ClientResult, PaginatedResponse, QueryPairs, Resource, ResourceBackend};
use uuid::Uuid;

use crate::{decode, ApiClient};

impl ApiClient {
    fn item_url<R: Resource>(&self, id: Uuid) -> String {
        format!("{}{}/{}", self.base_url, R::PATH, id)
    }
}

#[async_trait]
impl<R: Resource> ResourceBackend<R> for ApiClient {
    async fn list(&self, query: &QueryPairs) -> ClientResult<PaginatedResponse<R::Record>> {
        log::debug!("GET {} {:?}", R::PATH, query);
        let request = self.http.get(self.url(R::PATH)).query(query);
        decode(self.send_authorized(request).await?).await
    }

    async fn create(&self, data: &R::Create) -> ClientResult<R::Record> {
        log::debug!("POST {}", R::PATH);
        let request = self.http.post(self.url(R::PATH)).json(data);
        decode(self.send_authorized(request).await?).await
    }

    async fn update(&self, id: Uuid, data: &R::Patch) -> ClientResult<R::Record> {
        log::debug!("PATCH {}/{}", R::PATH, id);
        let request = self.http.patch(self.item_url::<R>(id)).json(data);
        decode(self.send_authorized(request).await?).await
    }

    async fn remove(&self, id: Uuid) -> ClientResult<()> {
        log::debug!("DELETE {}/{}", R::PATH, id);
        self.send_authorized(self.http.delete(self.item_url::<R>(id)))
            .await
            .map(|_| ())
    }
}

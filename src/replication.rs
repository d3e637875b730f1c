use tracing::{info, warn};

use crate::{
    domain::{BlogPost, BlogPostPatch, NewBlogPost, PageParams},
    mirror::{MirrorClient, MirrorOperation},
};

/// Best-effort replication of blog operations to the mirror service.
///
/// Write methods are called only after the primary store committed; read
/// methods are called before the primary lookup and carry request
/// parameters only. Every method runs exactly one mirror call on the
/// calling task and swallows the outcome into a log record; a mirror
/// failure can never reach the caller of the primary operation.
pub struct Replicator {
    client: MirrorClient,
}

impl Replicator {
    pub fn new(client: MirrorClient) -> Self {
        Self { client }
    }

    pub async fn mirror_created(&self, post: NewBlogPost, created: &BlogPost) {
        let op = MirrorOperation::Create { post };
        match self.client.execute(&op).await {
            Ok(response) => info!(?op, ?response, "mirrored blog post create"),
            Err(err) => warn!(%err, ?op, primary_result = ?created, "mirror create failed"),
        }
    }

    pub async fn mirror_updated(&self, post_id: i64, patch: BlogPostPatch, updated: &BlogPost) {
        let op = MirrorOperation::Update { post_id, patch };
        match self.client.execute(&op).await {
            Ok(response) => info!(?op, ?response, "mirrored blog post update"),
            Err(err) => warn!(%err, ?op, primary_result = ?updated, "mirror update failed"),
        }
    }

    pub async fn mirror_deleted(&self, post_id: i64) {
        let op = MirrorOperation::Delete { post_id };
        match self.client.execute(&op).await {
            Ok(_) => info!(?op, "mirrored blog post delete"),
            Err(err) => warn!(%err, ?op, "mirror delete failed"),
        }
    }

    pub async fn mirror_list(&self, page: PageParams) {
        let op = MirrorOperation::List { page };
        match self.client.execute(&op).await {
            Ok(response) => info!(?op, ?response, "mirrored blog post list"),
            Err(err) => warn!(%err, ?op, "mirror list failed"),
        }
    }

    pub async fn mirror_retrieve(&self, post_id: i64) {
        let op = MirrorOperation::Retrieve { post_id };
        match self.client.execute(&op).await {
            Ok(response) => info!(?op, ?response, "mirrored blog post retrieve"),
            Err(err) => warn!(%err, ?op, "mirror retrieve failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn replicator_for(uri: &str) -> Replicator {
        Replicator::new(MirrorClient::new(uri))
    }

    #[tokio::test]
    async fn successful_mirror_call_reaches_the_server() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/blog/4"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        replicator_for(&server.uri()).mirror_deleted(4).await;
    }

    #[tokio::test]
    async fn mirror_status_failure_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog"))
            .respond_with(ResponseTemplate::new(500).set_body_string("mirror down"))
            .expect(1)
            .mount(&server)
            .await;

        // Returns unit either way; nothing to unwrap, nothing panics.
        replicator_for(&server.uri())
            .mirror_list(PageParams {
                limit: 10,
                offset: 0,
            })
            .await;
    }

    #[tokio::test]
    async fn unreachable_mirror_is_swallowed() {
        let replicator = replicator_for("http://127.0.0.1:1");
        replicator
            .mirror_created(
                NewBlogPost {
                    title: "t".to_string(),
                    body: "b".to_string(),
                },
                &BlogPost {
                    id: 1,
                    title: "t".to_string(),
                    body: "b".to_string(),
                    created_at: "2025-01-01T00:00:00Z".to_string(),
                    updated_at: "2025-01-01T00:00:00Z".to_string(),
                },
            )
            .await;
    }

    #[tokio::test]
    async fn malformed_success_body_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog/9"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        replicator_for(&server.uri()).mirror_retrieve(9).await;
    }
}

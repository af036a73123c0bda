use std::sync::Arc;

use lingo_shared::clients::db::create_pool;
use lingo_shared::clients::minio::MinioClient;
use lingo_shared::clients::rabbitmq::RabbitMQClient;

use lingo_social::blobs::{BlobStore, MemoryBlobStore, S3BlobStore};
use lingo_social::config::{AppConfig, StorageBackend};
use lingo_social::events::{self, EventPublisher};
use lingo_social::store::{MemoryStore, PgStore, SocialStore};
use lingo_social::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lingo_shared::middleware::init_tracing("lingo-social");
    let metrics = lingo_shared::middleware::init_metrics()?;

    let config = AppConfig::load()?;
    let port = config.port;

    let (store, blobs): (Arc<dyn SocialStore>, Arc<dyn BlobStore>) = match config.storage {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database_url, config.db_pool_size)?;
            let minio = MinioClient::new(
                &config.minio_endpoint,
                &config.minio_access_key,
                &config.minio_secret_key,
                &config.minio_bucket,
            )
            .await;
            (
                Arc::new(PgStore::new(pool)),
                Arc::new(S3BlobStore::new(
                    minio,
                    config.upload_url_ttl_secs,
                    config.download_url_ttl_secs,
                )),
            )
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage, data is lost on restart");
            (Arc::new(MemoryStore::new()), Arc::new(MemoryBlobStore::new()))
        }
    };

    let publisher = if config.events_enabled {
        EventPublisher::new(RabbitMQClient::connect(&config.rabbitmq_url).await?)
    } else {
        tracing::warn!("event publishing disabled");
        EventPublisher::disabled()
    };

    let state = Arc::new(AppState::new(store, blobs, publisher, config));

    // Purge social data when the auth service deletes a user
    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_user_deleted(sub_state).await {
            tracing::error!(error = %e, "user.deleted subscriber failed");
        }
    });

    let app = lingo_social::router(state, Some(metrics));

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "lingo-social starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use kidson::classifier::{OpenAiClassifier, SuitabilityClassifier};
use kidson::config::KidsonConfig;
use kidson::search::NaverSearchClient;
use kidson::service::NearbyPlaceService;
use kidson::web;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = KidsonConfig::load()?;

    let provider = Arc::new(NaverSearchClient::new(config.naver.clone())?);
    let classifier: Option<Arc<dyn SuitabilityClassifier>> = if config.classifier.is_usable() {
        Some(Arc::new(OpenAiClassifier::new(config.classifier.clone())))
    } else {
        None
    };

    let service = Arc::new(NearbyPlaceService::new(
        provider,
        classifier,
        config.search.clone(),
        config.classifier.clone(),
        &config.cache,
    ));

    web::run(config.server.port, service).await
}

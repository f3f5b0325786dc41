use async_trait::async_trait;
use fnd_core::{Classifier, ClassifierSource, Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::artifact::{Artifact, ArtifactClassifier};

pub const DEFAULT_MODEL_PATH: &str = "models/model_1_5_2.json";
pub const DEFAULT_BLOB_NAME: &str = "model_1_5_2.json";
pub const DEFAULT_CONTAINER: &str = "models";

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub model_path: PathBuf,
    pub blob_name: String,
    /// Fail instead of warning when the artifact was trained with another toolchain.
    pub strict_version: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            blob_name: DEFAULT_BLOB_NAME.to_string(),
            strict_version: false,
        }
    }
}

/// Remote location holding trained artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn download(&self, blob_name: &str) -> Result<Vec<u8>>;
}

/// Blob container reachable over plain HTTP GET.
pub struct HttpArtifactStore {
    client: reqwest::Client,
    base_url: url::Url,
    container: String,
}

impl HttpArtifactStore {
    pub fn new(base_url: &str, container: &str) -> Result<Self> {
        let base_url = url::Url::parse(base_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url,
            container: container.trim_matches('/').to_string(),
        })
    }

    fn blob_url(&self, blob_name: &str) -> Result<url::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(&self.container)
            .push(blob_name);
        Ok(url)
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn download(&self, blob_name: &str) -> Result<Vec<u8>> {
        let url = self.blob_url(blob_name)?;
        info!("Downloading model artifact from {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ArtifactUnavailable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::ArtifactUnavailable(format!(
                "blob store returned status {}",
                status.as_u16()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::ArtifactUnavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Loads the classifier from disk, fetching it from the store on a local miss.
pub struct ArtifactLoader {
    config: LoaderConfig,
    store: Option<Arc<dyn ArtifactStore>>,
}

impl ArtifactLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config, store: None }
    }

    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub async fn load(&self) -> Result<ArtifactClassifier> {
        let path = self.config.model_path.as_path();
        if !path.exists() {
            self.fetch_remote(path).await?;
        }

        info!("Loading model from {}", path.display());
        let bytes = tokio::fs::read(path).await?;
        let artifact = Artifact::parse(&bytes)?;
        artifact.check_version(self.config.strict_version)?;

        let classifier = ArtifactClassifier::new(artifact);
        classifier.self_test();
        Ok(classifier)
    }

    async fn fetch_remote(&self, path: &Path) -> Result<()> {
        let Some(store) = &self.store else {
            return Err(Error::ArtifactNotFound(path.display().to_string()));
        };

        info!("Model not found locally, downloading {}", self.config.blob_name);
        let bytes = store.download(&self.config.blob_name).await.map_err(|e| match e {
            Error::ArtifactUnavailable(_) => e,
            other => Error::ArtifactUnavailable(other.to_string()),
        })?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, &bytes).await?;
        info!("Model downloaded to {}", path.display());
        Ok(())
    }
}

/// Loads the classifier on first use and keeps it for the process lifetime.
/// Failed loads are not remembered, so the next caller retries.
pub struct LazyClassifier {
    loader: ArtifactLoader,
    cell: OnceCell<Arc<dyn Classifier>>,
}

impl LazyClassifier {
    pub fn new(loader: ArtifactLoader) -> Self {
        Self {
            loader,
            cell: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

#[async_trait]
impl ClassifierSource for LazyClassifier {
    async fn classifier(&self) -> Result<Arc<dyn Classifier>> {
        let classifier = self
            .cell
            .get_or_try_init(|| async {
                match self.loader.load().await {
                    Ok(classifier) => Ok(Arc::new(classifier) as Arc<dyn Classifier>),
                    Err(e) => {
                        error!("Error loading model: {}", e);
                        Err(e)
                    }
                }
            })
            .await?;
        Ok(classifier.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::tests::sample_artifact_json;
    use axum::{extract::Path as AxumPath, http::StatusCode, routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyStore {
        calls: AtomicUsize,
        fail_first: usize,
    }

    #[async_trait]
    impl ArtifactStore for FlakyStore {
        async fn download(&self, _blob_name: &str) -> Result<Vec<u8>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(Error::ArtifactUnavailable("store offline".to_string()))
            } else {
                Ok(sample_artifact_json("1.5.2").into_bytes())
            }
        }
    }

    fn config_in(dir: &Path) -> LoaderConfig {
        LoaderConfig {
            model_path: dir.join("nested").join("model.json"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_without_store() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ArtifactLoader::new(config_in(dir.path()));
        assert!(matches!(loader.load().await, Err(Error::ArtifactNotFound(_))));
    }

    #[tokio::test]
    async fn test_lazy_retries_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FlakyStore { calls: AtomicUsize::new(0), fail_first: 1 });
        let loader = ArtifactLoader::new(config_in(dir.path())).with_store(store.clone());
        let lazy = LazyClassifier::new(loader);

        let first = lazy.classifier().await;
        assert!(matches!(first, Err(Error::ArtifactUnavailable(_))));
        assert!(!lazy.is_loaded());

        let classifier = lazy.classifier().await.unwrap();
        assert!(classifier.score("Council approves budget").unwrap().is_real);
        assert!(lazy.is_loaded());
        assert!(dir.path().join("nested").join("model.json").exists());

        lazy.classifier().await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_strict_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, sample_artifact_json("0.24.1")).unwrap();

        let lenient = ArtifactLoader::new(LoaderConfig { model_path: path.clone(), ..Default::default() });
        assert!(lenient.load().await.is_ok());

        let strict = ArtifactLoader::new(LoaderConfig {
            model_path: path,
            strict_version: true,
            ..Default::default()
        });
        assert!(matches!(strict.load().await, Err(Error::VersionMismatch { .. })));
    }

    #[tokio::test]
    async fn test_http_store() {
        let app = Router::new().route(
            "/models/:blob",
            get(|AxumPath(blob): AxumPath<String>| async move {
                if blob == "model_1_5_2.json" {
                    Ok(sample_artifact_json("1.5.2"))
                } else {
                    Err(StatusCode::NOT_FOUND)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let store = HttpArtifactStore::new(&format!("http://{}", addr), "models").unwrap();
        let bytes = store.download("model_1_5_2.json").await.unwrap();
        assert!(Artifact::parse(&bytes).is_ok());

        assert!(matches!(
            store.download("missing.json").await,
            Err(Error::ArtifactUnavailable(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let loader = ArtifactLoader::new(config_in(dir.path())).with_store(Arc::new(store));
        let classifier = loader.load().await.unwrap();
        assert_eq!(classifier.vocabulary_size(), Some(4));
    }

    #[test]
    fn test_blob_url() {
        let store = HttpArtifactStore::new("https://blobs.example.com/", "models").unwrap();
        assert_eq!(
            store.blob_url("model_1_5_2.json").unwrap().as_str(),
            "https://blobs.example.com/models/model_1_5_2.json"
        );
    }
}

use crate::config::CameraConfig;
use crate::error::{PipelineError, RetrievalError};
use crate::frame::RawFrame;

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Frame buffer handed back by a fetch, with the retrieval outcome.
///
/// The buffer always comes back so it can be reused next cycle; on failure
/// it is empty.
#[derive(Debug)]
pub struct FetchResult {
    pub frame: RawFrame,
    pub outcome: Result<(), RetrievalError>,
}

/// Source of compressed camera images
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fill `frame` with one complete image.
    ///
    /// Returns `Err` only when the frame buffer itself was lost.
    async fn fetch(&self, frame: RawFrame) -> Result<FetchResult, PipelineError>;

    fn describe(&self) -> String;
}

/// Run a blocking read on the blocking pool, moving the frame in and out
async fn fetch_on_blocking_pool<F>(
    mut frame: RawFrame,
    read: F,
) -> Result<FetchResult, PipelineError>
where
    F: FnOnce(&mut RawFrame) -> Result<(), RetrievalError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let outcome = read(&mut frame);
        FetchResult { frame, outcome }
    })
    .await
    .map_err(|e| PipelineError::Task {
        details: format!("image fetch task: {}", e),
    })
}

/// HTTP snapshot endpoint (single JPEG per GET)
pub struct HttpImageSource {
    agent: ureq::Agent,
    url: Url,
    timeout: Duration,
}

impl HttpImageSource {
    pub fn new(config: &CameraConfig) -> Result<Self, RetrievalError> {
        let mut url = Url::parse(&config.url).map_err(|e| RetrievalError::InvalidUrl {
            url: config.url.clone(),
            details: e.to_string(),
        })?;

        // ureq sends basic auth taken from the URL userinfo
        if !config.username.is_empty() {
            let password = (!config.password.is_empty()).then_some(config.password.as_str());
            url.set_username(&config.username)
                .and_then(|_| url.set_password(password))
                .map_err(|_| RetrievalError::InvalidUrl {
                    url: config.url.clone(),
                    details: "URL cannot carry credentials".to_string(),
                })?;
        }

        let timeout = config.fetch_timeout();
        // One bound for the whole request, body included
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout(timeout)
            .build();

        Ok(Self {
            agent,
            url,
            timeout,
        })
    }
}

fn fetch_http(
    agent: &ureq::Agent,
    url: &str,
    frame: &mut RawFrame,
    timeout: Duration,
) -> Result<(), RetrievalError> {
    let deadline = Instant::now() + timeout;

    let response = match agent.get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(status, _)) => return Err(RetrievalError::Status { status }),
        Err(ureq::Error::Transport(transport)) => {
            return Err(RetrievalError::Transport {
                details: transport.to_string(),
            })
        }
    };

    if response.status() != 200 {
        return Err(RetrievalError::Status {
            status: response.status(),
        });
    }

    let length = response
        .header("Content-Length")
        .and_then(|value| value.trim().parse::<usize>().ok())
        .ok_or(RetrievalError::MissingLength)?;
    debug!("Camera responded with {} bytes", length);

    let mut reader = response.into_reader();
    frame.read_from(&mut reader, length, deadline)
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, frame: RawFrame) -> Result<FetchResult, PipelineError> {
        let agent = self.agent.clone();
        let url = self.url.to_string();
        let timeout = self.timeout;
        fetch_on_blocking_pool(frame, move |frame| {
            fetch_http(&agent, &url, frame, timeout)
        })
        .await
    }

    fn describe(&self) -> String {
        let mut url = self.url.clone();
        let _ = url.set_password(None);
        url.to_string()
    }
}

/// JPEG file on disk, re-read every cycle
pub struct FileImageSource {
    path: PathBuf,
    timeout: Duration,
}

impl FileImageSource {
    pub fn new<P: Into<PathBuf>>(path: P, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    async fn fetch(&self, frame: RawFrame) -> Result<FetchResult, PipelineError> {
        let path = self.path.clone();
        let timeout = self.timeout;
        fetch_on_blocking_pool(frame, move |frame| {
            let deadline = Instant::now() + timeout;
            let mut file = std::fs::File::open(&path)?;
            let length = file.metadata()?.len() as usize;
            frame.read_from(&mut file, length, deadline)
        })
        .await
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

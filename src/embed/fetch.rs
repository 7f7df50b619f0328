use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use super::{EmbedOptions, FetchError};

/// Source of image bytes.
pub trait Fetcher {
    fn get(&self, locator: &str) -> Result<Vec<u8>, FetchError>;
}

impl<F> Fetcher for &F
where
    F: Fetcher + ?Sized,
{
    fn get(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        (**self).get(locator)
    }
}

/// Reads existing local files first, then falls back to one blocking
/// http(s) request.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    client: reqwest::blocking::Client,
    base_dir: Option<PathBuf>,
}

impl DefaultFetcher {
    pub fn new(options: &EmbedOptions) -> Result<Self, FetchError> {
        let mut builder = reqwest::blocking::Client::builder().user_agent(options.user_agent.clone());
        if let Some(timeout) = options.fetch_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|source| FetchError::Client { source })?;
        Ok(Self {
            client,
            base_dir: options.base_dir.clone(),
        })
    }

    fn local_path(&self, locator: &str) -> Option<PathBuf> {
        let path = Path::new(locator);
        let candidate = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        candidate.is_file().then_some(candidate)
    }

    fn download(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(%url, "fetching image");
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|err| FetchError::http(url.as_str(), err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .map_err(|err| FetchError::http(url.as_str(), err))?;
        Ok(body.to_vec())
    }
}

impl Fetcher for DefaultFetcher {
    fn get(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        if let Some(path) = self.local_path(locator) {
            return fs::read(&path).map_err(|err| FetchError::io(path, err));
        }

        let url = Url::parse(locator).map_err(|_| FetchError::unsupported(locator))?;
        match url.scheme() {
            "http" | "https" => self.download(&url),
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| FetchError::unsupported(locator))?;
                fs::read(&path).map_err(|err| FetchError::io(path, err))
            }
            _ => Err(FetchError::unsupported(locator)),
        }
    }
}

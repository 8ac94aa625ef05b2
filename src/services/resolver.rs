// watchlog stream resolution
// The extraction layer that turns a URL into stream metadata lives outside this
// crate; it is plugged in through `StreamResolver`.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::types::errors::ResolveError;
use crate::types::history::StreamInfo;

/// Resolves a stream URL into its metadata and related streams.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<StreamInfo, ResolveError>;
}

/// Resolver over a fixed set of known streams, keyed by URL.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    streams: HashMap<String, StreamInfo>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `info` under its item URL, replacing an earlier registration.
    pub fn insert(&mut self, info: StreamInfo) {
        self.streams.insert(info.item.url.clone(), info);
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

#[async_trait]
impl StreamResolver for StaticResolver {
    async fn resolve(&self, url: &str) -> Result<StreamInfo, ResolveError> {
        self.streams
            .get(url)
            .cloned()
            .ok_or_else(|| ResolveError::UnsupportedUrl(url.to_string()))
    }
}

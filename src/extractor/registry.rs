use crate::extractor::traits::{Extractor, ExtractorDescriptor};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Ordered set of available extractors
///
/// Registration order is preserved; priority ordering is the orchestrator's
/// concern.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an extractor. Names are expected to be unique but this is not
    /// enforced; duplicates stay queryable in registration order.
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        debug!("Registering extractor: {}", extractor.name());
        self.extractors.push(extractor);
    }

    /// Extractors whose domains match the URL host, in registration order.
    /// An unparseable URL yields an empty list.
    pub fn extractors_for(&self, url: &str) -> Vec<Arc<dyn Extractor>> {
        self.extractors
            .iter()
            .filter(|e| e.supports(url))
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<ExtractorDescriptor> {
        self.extractors.iter().map(|e| e.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.extractors.iter().map(|e| e.name()))
            .finish()
    }
}

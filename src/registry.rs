//! Name-to-factory lookup for metric engines.
//!
//! The registry is an explicit value: callers build one (usually with
//! [`MetricRegistry::with_builtin`]), optionally register more metrics, and
//! hand it to the batch coordinator. Enumeration follows first-registration
//! order; re-registering a name replaces its factory in place.

use crate::glcm::GlcmConfig;
use crate::image::ImageView;
use crate::metric::{
    MetricEngine, MsvConfig, MsvMetric, NipcConfig, NipcMetric, TextureMetric, ZnccConfig,
    ZnccMetric, CORRELATION, HOMOGENEITY, MSV, NIPC, ZNCC,
};
use crate::util::SimScoreResult;
use std::sync::Arc;

/// Builds an engine from a floating-point reference image.
pub type MetricFactory =
    Arc<dyn Fn(ImageView<'_, f32>) -> SimScoreResult<Box<dyn MetricEngine>> + Send + Sync>;

struct Entry {
    name: String,
    factory: MetricFactory,
}

/// Ordered registry of metric factories.
#[derive(Default)]
pub struct MetricRegistry {
    entries: Vec<Entry>,
}

impl MetricRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the five built-in metrics and default configurations.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(MSV, |img| {
            Ok(Box::new(MsvMetric::new(img, MsvConfig::default())?) as Box<dyn MetricEngine>)
        });
        registry.register(NIPC, |img| {
            Ok(Box::new(NipcMetric::new(img, NipcConfig::default())?) as Box<dyn MetricEngine>)
        });
        registry.register(ZNCC, |img| {
            Ok(Box::new(ZnccMetric::new(img, ZnccConfig::default())?) as Box<dyn MetricEngine>)
        });
        registry.register(CORRELATION, |img| {
            Ok(Box::new(TextureMetric::correlation(img, GlcmConfig::default())?)
                as Box<dyn MetricEngine>)
        });
        registry.register(HOMOGENEITY, |img| {
            Ok(Box::new(TextureMetric::homogeneity(img, GlcmConfig::default())?)
                as Box<dyn MetricEngine>)
        });
        registry
    }

    /// Registers `factory` under `name`.
    ///
    /// An existing name keeps its position and takes the new factory.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(ImageView<'_, f32>) -> SimScoreResult<Box<dyn MetricEngine>> + Send + Sync + 'static,
    {
        let name = name.into();
        let factory: MetricFactory = Arc::new(factory);
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.factory = factory,
            None => self.entries.push(Entry { name, factory }),
        }
    }

    /// Builds the engine registered under `name`.
    ///
    /// Unknown names yield `Ok(None)`; a reference the metric cannot use
    /// yields the factory's error (typically `InvalidReference`).
    pub fn get(
        &self,
        name: &str,
        reference: ImageView<'_, f32>,
    ) -> SimScoreResult<Option<Box<dyn MetricEngine>>> {
        match self.entries.iter().find(|entry| entry.name == name) {
            Some(entry) => (entry.factory)(reference).map(Some),
            None => Ok(None),
        }
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    /// Registered names in first-registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no metric is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

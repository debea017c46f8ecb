use std::path::Path;
use std::sync::Arc;

use fw_runtime::{BackendRegistry, Config, ModelHandle, RuntimeError, Session};
use tracing::{info, info_span};

use crate::error::ServiceError;
use crate::payload::decode_base64_image;
use crate::preprocess::ImagePreprocessor;

/// MNIST digit resolution.
pub const DEFAULT_RESOLUTION: (u32, u32) = (28, 28);

/// Classifies base64 encoded images with one loaded model.
///
/// The model is loaded (or injected) once when the service is built and
/// shared read-only between requests. Each request opens its own session on
/// the backend it names.
#[derive(Debug)]
pub struct ForwardService {
    model: Arc<ModelHandle>,
    registry: BackendRegistry,
    input_name: String,
    output_name: String,
    preprocessor: ImagePreprocessor,
}

impl ForwardService {
    /// Build a service around an already loaded model.
    ///
    /// # Errors
    /// `UnknownInput` / `UnknownOutput` if the model does not declare the
    /// given names.
    pub fn new(
        model: Arc<ModelHandle>,
        registry: BackendRegistry,
        input_name: impl Into<String>,
        output_name: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let input_name = input_name.into();
        let output_name = output_name.into();
        if model.input(&input_name).is_none() {
            return Err(RuntimeError::UnknownInput(input_name).into());
        }
        if model.output(&output_name).is_none() {
            return Err(RuntimeError::UnknownOutput(output_name).into());
        }
        let (width, height) = DEFAULT_RESOLUTION;
        Ok(ForwardService {
            model,
            registry,
            input_name,
            output_name,
            preprocessor: ImagePreprocessor::new(width, height),
        })
    }

    /// Load the model at `path` and build a service around it. A model that
    /// fails to load is reported here, not on the first request.
    pub fn load(
        path: impl AsRef<Path>,
        config: Config,
        registry: BackendRegistry,
        input_name: impl Into<String>,
        output_name: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let model = ModelHandle::load(path, config)?;
        Self::new(Arc::new(model), registry, input_name, output_name)
    }

    /// Resize inputs to `width x height` instead of 28x28.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.preprocessor = ImagePreprocessor::new(width, height);
        self
    }

    pub fn model(&self) -> &Arc<ModelHandle> {
        &self.model
    }

    pub fn preprocessor(&self) -> &ImagePreprocessor {
        &self.preprocessor
    }

    /// Run one request: decode `base64_image`, preprocess it, and return the
    /// flattened output of the model on `backend`.
    pub fn forward(&self, base64_image: &str, backend: &str) -> Result<Vec<f32>, ServiceError> {
        let bytes = decode_base64_image(base64_image)?;
        self.forward_bytes(&bytes, backend)
    }

    /// Like [`forward`](Self::forward) for an image that is already decoded
    /// from base64.
    pub fn forward_bytes(&self, image: &[u8], backend: &str) -> Result<Vec<f32>, ServiceError> {
        let _span = info_span!("forward", backend).entered();

        let input = self.preprocessor.preprocess(image)?;
        let backend = self.registry.create(backend)?;

        let mut session = Session::open(backend.as_ref(), &self.model)?;
        let output = session
            .feed(&self.input_name, input)?
            .forward()?
            .output(&self.output_name)?;
        session.release();

        let values = output.to_f32_vec().map_err(RuntimeError::from)?;
        info!(output = %self.output_name, len = values.len(), "forward finished");
        Ok(values)
    }
}

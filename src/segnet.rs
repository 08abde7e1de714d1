//! The segmentation wrapper: construction, dispatch and ownership of the
//! native engine handle.
//!
//! A [`SegNet`] starts out empty. [`SegNet::init`] runs construction against
//! an [`EngineFactory`]; a failed construction leaves it empty, and every
//! operation on an empty wrapper fails with `InvalidState` without touching
//! any engine.
//!
//! The engine is reference counted so the `tensorNet` base object can share
//! it. The native handle itself is released by the engine's `Drop`, once,
//! when the last reference goes away, on whichever thread that happens.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::buffer::{Access, DeviceBuffer};
use crate::convert::{self, ArgVector};
use crate::engine::{EngineFactory, RenderMode, SegmentationEngine};
use crate::error::{Error, Result};
use crate::network::{ConstructParams, ModelSource, NetworkType};

/// Value returned in the result tuple of a successful operation.
pub const PLACEHOLDER_RESULT: i64 = 2;

/// Arguments shared by `Process` and `Overlay`.
#[derive(Clone, Copy, Debug)]
pub struct ImageRequest {
    pub image: DeviceBuffer,
    pub width: i64,
    pub height: i64,
}

impl ImageRequest {
    pub fn new(image: DeviceBuffer, width: i64, height: i64) -> Self {
        Self {
            image,
            width,
            height,
        }
    }
}

#[derive(Default)]
pub struct SegNet {
    engine: Option<Arc<dyn SegmentationEngine>>,
    source: Option<ModelSource>,
}

impl SegNet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct the engine described by `params`.
    ///
    /// A non-empty argv takes precedence over the network name. Any
    /// previously held engine is released first.
    pub fn init(&mut self, factory: &dyn EngineFactory, params: &ConstructParams) -> Result<()> {
        self.engine = None;
        self.source = None;

        let (engine, source) = if params.uses_argv() {
            info!("segNet loading network using argv command line params");
            let mut args = ArgVector::new(&params.argv)?;
            let engine = factory.create_from_args(&mut args);
            (engine, ModelSource::CommandLine(params.argv.clone()))
        } else {
            info!(network = %params.network, "segNet loading built-in network");
            let network = match factory.network_type_from_str(&params.network) {
                // Aliases and other spellings the native resolver may not know.
                NetworkType::Custom => NetworkType::resolve(&params.network),
                network => network,
            };
            if network.is_custom() {
                error!(network = %params.network, "segNet invalid built-in network was requested");
                return Err(Error::invalid_argument(format!(
                    "segNet invalid built-in network was requested ('{}')",
                    params.network
                )));
            }
            (factory.create(network), ModelSource::BuiltIn(network))
        };

        let Some(engine) = engine else {
            error!(network = source.network_name(), "segNet failed to load network");
            return Err(Error::construction(format!(
                "segNet failed to load network '{}'",
                source.network_name()
            )));
        };

        self.engine = Some(Arc::from(engine));
        self.source = Some(source);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.is_some()
    }

    /// Shared reference to the engine, for the base object.
    pub fn engine(&self) -> Option<Arc<dyn SegmentationEngine>> {
        self.engine.clone()
    }

    pub fn source(&self) -> Option<&ModelSource> {
        self.source.as_ref()
    }

    /// Run segmentation on the image.
    pub fn process(&self, request: &ImageRequest) -> Result<i64> {
        self.dispatch("Process", Access::Read, request, |engine, image, width, height| {
            engine.process(image, width, height)
        })
    }

    /// Render the segmentation as a blended overlay, or as a mask when
    /// `mode` is [`RenderMode::Mask`].
    pub fn overlay(&self, request: &ImageRequest, mode: RenderMode) -> Result<i64> {
        self.dispatch("Overlay", Access::Write, request, |engine, image, width, height| match mode {
            RenderMode::Mask => engine.mask(image, width, height),
            RenderMode::Overlay => engine.overlay(image, width, height),
        })
    }

    fn dispatch<F>(&self, op: &str, access: Access, request: &ImageRequest, call: F) -> Result<i64>
    where
        F: FnOnce(&dyn SegmentationEngine, std::ptr::NonNull<f32>, u32, u32) -> bool,
    {
        let engine = self
            .engine
            .as_deref()
            .ok_or_else(|| Error::invalid_state("segNet invalid object instance"))?;

        let (Some(width), Some(height)) = (
            convert::dimension(request.width),
            convert::dimension(request.height),
        ) else {
            return Err(Error::invalid_argument(format!(
                "segNet.{op}() image dimensions are invalid ({}x{})",
                request.width, request.height
            )));
        };

        let image = request.image.image_ptr(op, access, width, height)?;

        debug!(op, width, height, "segNet dispatch");
        if !call(engine, image, width, height) {
            error!(op, width, height, "segNet native call failed");
            return Err(Error::operation(format!(
                "segNet.{op}() encountered an error segmenting the image"
            )));
        }

        Ok(PLACEHOLDER_RESULT)
    }
}

impl Drop for SegNet {
    fn drop(&mut self) {
        debug!(loaded = self.engine.is_some(), "segNet dealloc");
    }
}

//! Python classes: `tensorNet`, `segNet` and `segNet.Segmentation`.
//!
//! Arguments are extracted into typed values before any work happens. An
//! argument of the wrong shape raises `InvalidArgumentError` rather than the
//! interpreter's `TypeError`, so callers only ever see the module's own
//! exception hierarchy.

use std::sync::Arc;

use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use pyo3::types::{PyTuple, PyType};

use crate::buffer::DeviceBuffer;
use crate::engine::{EngineFactory, RenderMode, SegmentationEngine};
use crate::error::{
    ConstructionError, InvalidArgumentError, InvalidStateError, OperationError, SegNetError,
};
use crate::network::{ConstructParams, ModelSource, DEFAULT_NETWORK};
use crate::registry;
use crate::segnet::{ImageRequest, SegNet};

/// A positional or keyword argument extracted as `T`.
pub struct Arg<T>(pub T);

impl<'py, T: FromPyObject<'py>> FromPyObject<'py> for Arg<T> {
    fn extract_bound(ob: &Bound<'py, PyAny>) -> PyResult<Self> {
        T::extract_bound(ob).map(Arg).map_err(|err| {
            let type_name = ob
                .get_type()
                .name()
                .map(|n| n.to_string())
                .unwrap_or_else(|_| "<unknown>".to_string());
            InvalidArgumentError::new_err(format!("unexpected {type_name}: {err}"))
        })
    }
}

/// Base inference object. Holds a shared reference to the loaded engine.
#[pyclass(subclass, name = "tensorNet", module = "jetson_segnet")]
pub struct PyTensorNet {
    net: Option<Arc<dyn SegmentationEngine>>,
    source: Option<ModelSource>,
}

#[pymethods]
impl PyTensorNet {
    /// Name of the built-in network, or `"custom"` for argv construction.
    #[pyo3(name = "GetNetworkName")]
    fn network_name(&self) -> Option<String> {
        self.source.as_ref().map(|s| s.network_name().to_string())
    }

    /// Whether an engine is loaded.
    #[pyo3(name = "IsLoaded")]
    fn is_loaded(&self) -> bool {
        self.net.is_some()
    }
}

/// Image Segmentation DNN - segments objects in an image
///
/// segNet(network="aerial-fpv", argv=None)
///
///   network (string) -- name of a built-in network to use
///   argv (strings)   -- command line arguments passed to segNet; when
///                       non-empty they take precedence over `network`
#[pyclass(
    extends = PyTensorNet,
    subclass,
    name = "segNet",
    module = "jetson_segnet"
)]
pub struct PySegNet {
    inner: SegNet,
}

#[pymethods]
impl PySegNet {
    #[new]
    #[pyo3(signature = (network = None, argv = None))]
    fn new(
        network: Option<Arg<String>>,
        argv: Option<Arg<Vec<String>>>,
    ) -> PyResult<(Self, PyTensorNet)> {
        tracing::debug!("segNet.__init__()");
        let params = ConstructParams {
            network: network.map_or_else(|| DEFAULT_NETWORK.to_string(), |n| n.0),
            argv: argv.map(|a| a.0).unwrap_or_default(),
        };

        Self::construct(registry::get()?.factory()?, &params)
    }

    /// Process(image, width, height) -> (int,)
    ///
    /// Segment an RGBA float image held in CUDA memory.
    #[pyo3(name = "Process", signature = (image, width, height))]
    fn process<'py>(
        &self,
        py: Python<'py>,
        image: &Bound<'py, PyAny>,
        width: Arg<i64>,
        height: Arg<i64>,
    ) -> PyResult<Bound<'py, PyTuple>> {
        let request = ImageRequest::new(DeviceBuffer::extract(image), width.0, height.0);
        let value = self.inner.process(&request)?;
        PyTuple::new(py, [value])
    }

    /// Overlay(image, width, height, mask=False) -> (int,)
    ///
    /// Render the last segmentation into `image`, as a blended overlay or,
    /// when `mask` is true, as a class-colour mask.
    #[pyo3(name = "Overlay", signature = (image, width, height, mask = None))]
    fn overlay<'py>(
        &self,
        py: Python<'py>,
        image: &Bound<'py, PyAny>,
        width: Arg<i64>,
        height: Arg<i64>,
        mask: Option<&Bound<'py, PyAny>>,
    ) -> PyResult<Bound<'py, PyTuple>> {
        let mask = match mask {
            Some(flag) => flag.is_truthy()?,
            None => false,
        };
        let request = ImageRequest::new(DeviceBuffer::extract(image), width.0, height.0);
        let value = self.inner.overlay(&request, RenderMode::from_flag(mask))?;
        PyTuple::new(py, [value])
    }

    #[classattr]
    #[pyo3(name = "Segmentation")]
    fn segmentation_type(py: Python<'_>) -> Py<PyType> {
        py.get_type::<PySegmentation>().unbind()
    }

    fn __repr__(&self) -> String {
        match self.inner.source() {
            Some(source) => format!("<segNet network='{}'>", source.network_name()),
            None => "<segNet (not loaded)>".to_string(),
        }
    }
}

impl PySegNet {
    fn construct(
        factory: &dyn EngineFactory,
        params: &ConstructParams,
    ) -> PyResult<(Self, PyTensorNet)> {
        let mut inner = SegNet::new();
        inner.init(factory, params)?;

        let base = PyTensorNet::from(&inner);
        Ok((Self { inner }, base))
    }
}

/// Image Segmentation Result
///
/// Segmentation(imageBytes=0)
#[pyclass(name = "Segmentation", module = "jetson_segnet.segNet")]
#[derive(Clone, Debug, Default)]
pub struct PySegmentation {
    image_bytes: u32,
}

#[pymethods]
impl PySegmentation {
    #[new]
    #[pyo3(signature = (imageBytes = 0))]
    #[allow(non_snake_case)]
    fn new(imageBytes: u32) -> Self {
        tracing::debug!(imageBytes, "segNet.Segmentation.__init__()");
        Self {
            image_bytes: imageBytes,
        }
    }

    /// Size of the segmented image in bytes.
    #[getter(ImageBytes)]
    fn image_bytes(&self) -> u32 {
        self.image_bytes
    }

    #[setter(ImageBytes)]
    fn set_image_bytes(&mut self, value: Option<u32>) -> PyResult<()> {
        let value = value.ok_or_else(|| {
            PyTypeError::new_err("Not permitted to delete segNet.Segmentation.ImageBytes attribute")
        })?;
        self.image_bytes = value;
        Ok(())
    }

    fn __repr__(&self) -> String {
        format!("<segNet.Segmentation ImageBytes={}>", self.image_bytes)
    }
}

/// Add the classes and exception types to `m`.
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    m.add_class::<PyTensorNet>()?;
    m.add_class::<PySegNet>()?;
    m.add("SegNetError", py.get_type::<SegNetError>())?;
    m.add("InvalidArgumentError", py.get_type::<InvalidArgumentError>())?;
    m.add("InvalidStateError", py.get_type::<InvalidStateError>())?;
    m.add("ConstructionError", py.get_type::<ConstructionError>())?;
    m.add("OperationError", py.get_type::<OperationError>())?;
    Ok(())
}

impl From<&SegNet> for PyTensorNet {
    fn from(net: &SegNet) -> Self {
        Self {
            net: net.engine(),
            source: net.source().cloned(),
        }
    }
}

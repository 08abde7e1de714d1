//! Python bindings for the `segNet` image segmentation network.
//!
//! The crate builds a `cdylib` imported by Python as `jetson_segnet`. The
//! network itself lives in a native library loaded at run time; this layer
//! only marshals arguments and results across the boundary:
//!
//! - `segNet(network="aerial-fpv", argv=None)` loads a built-in network, or
//!   one described by command-line style arguments
//! - `segNet.Process(image, width, height)` segments a CUDA image
//! - `segNet.Overlay(image, width, height, mask=False)` renders the result
//!
//! Every call is synchronous and runs on the caller's thread.
//!
//! ```python
//! import jetson_segnet
//!
//! net = jetson_segnet.segNet("cityscapes-hd")
//! net.Process(img, width, height)
//! net.Overlay(img, width, height)
//! ```

pub mod buffer;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod network;
pub mod python;
pub mod registry;
pub mod segnet;

use pyo3::prelude::*;

pub use engine::{EngineFactory, RenderMode, SegmentationEngine};
pub use error::{Error, Result};
pub use network::{ConstructParams, NetworkType};
pub use segnet::{ImageRequest, SegNet};

#[pymodule]
fn jetson_segnet(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let config = config::BindingConfig::from_env();
    logging::init(&config);
    registry::init(&config);

    python::register(m)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}

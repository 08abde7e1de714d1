//! Run-time bindings to the native segmentation library.
//!
//! The library exports a flat C interface over its `segNet` class:
//!
//! ```c
//! void* segNet_Create(int networkType);
//! void* segNet_CreateFromArgs(int argc, char** argv);
//! int   segNet_NetworkTypeFromStr(const char* name);
//! bool  segNet_Process(void* net, float* image, uint32_t width, uint32_t height);
//! bool  segNet_Overlay(void* net, float* image, uint32_t width, uint32_t height);
//! bool  segNet_Mask(void* net, float* image, uint32_t width, uint32_t height);
//! void  segNet_Destroy(void* net);   /* optional */
//! ```
//!
//! Symbols are resolved once with `libloading` when the module is
//! registered, so the extension imports on machines without the library and
//! reports the problem when a network is first constructed.
//!
//! **Ownership:** every non-null handle returned by a create call is owned
//! by exactly one [`NativeEngine`], which calls `segNet_Destroy` in `Drop`
//! when the library provides it.

use std::ffi::{CString, OsStr};
use std::ptr::NonNull;
use std::sync::Arc;

use libc::{c_char, c_int, c_void};
use libloading::Library;
use tracing::{debug, info, warn};

use crate::convert::ArgVector;
use crate::engine::{EngineFactory, SegmentationEngine};
use crate::network::NetworkType;

type CreateFn = unsafe extern "C" fn(network: c_int) -> *mut c_void;
type CreateFromArgsFn = unsafe extern "C" fn(argc: c_int, argv: *mut *mut c_char) -> *mut c_void;
type NetworkTypeFromStrFn = unsafe extern "C" fn(name: *const c_char) -> c_int;
type RenderFn = unsafe extern "C" fn(net: *mut c_void, image: *mut f32, width: u32, height: u32) -> bool;
type DestroyFn = unsafe extern "C" fn(net: *mut c_void);

/// Resolved entry points. The function pointers stay valid while `_library`
/// is loaded.
pub struct NativeLibrary {
    create: CreateFn,
    create_from_args: CreateFromArgsFn,
    network_type_from_str: NetworkTypeFromStrFn,
    process: RenderFn,
    overlay: RenderFn,
    mask: RenderFn,
    destroy: Option<DestroyFn>,
    _library: Library,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to load {path}: {source}")]
    Open {
        path: String,
        source: libloading::Error,
    },
    #[error("{path} does not export {symbol}: {source}")]
    Symbol {
        path: String,
        symbol: &'static str,
        source: libloading::Error,
    },
}

impl NativeLibrary {
    /// Load the library and resolve every entry point.
    pub fn open(path: impl AsRef<OsStr>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let shown = path.to_string_lossy().into_owned();

        // Loading runs the library's initialisers; nothing else can be checked.
        let library = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
            path: shown.clone(),
            source,
        })?;

        macro_rules! symbol {
            ($name:literal, $ty:ty) => {{
                let sym = unsafe { library.get::<$ty>(concat!($name, "\0").as_bytes()) };
                match sym {
                    Ok(sym) => *sym,
                    Err(source) => {
                        return Err(LoadError::Symbol {
                            path: shown,
                            symbol: $name,
                            source,
                        })
                    }
                }
            }};
        }

        let create = symbol!("segNet_Create", CreateFn);
        let create_from_args = symbol!("segNet_CreateFromArgs", CreateFromArgsFn);
        let network_type_from_str = symbol!("segNet_NetworkTypeFromStr", NetworkTypeFromStrFn);
        let process = symbol!("segNet_Process", RenderFn);
        let overlay = symbol!("segNet_Overlay", RenderFn);
        let mask = symbol!("segNet_Mask", RenderFn);
        let destroy = unsafe { library.get::<DestroyFn>(b"segNet_Destroy\0") }
            .ok()
            .map(|sym| *sym);
        if destroy.is_none() {
            warn!(path = %shown, "segNet_Destroy not exported; engines are never released");
        }

        info!(path = %shown, "loaded segmentation library");
        Ok(Self {
            create,
            create_from_args,
            network_type_from_str,
            process,
            overlay,
            mask,
            destroy,
            _library: library,
        })
    }
}

/// [`EngineFactory`] backed by the loaded library.
#[derive(Clone)]
pub struct NativeFactory {
    lib: Arc<NativeLibrary>,
}

impl NativeFactory {
    pub fn new(lib: NativeLibrary) -> Self {
        Self { lib: Arc::new(lib) }
    }

    fn wrap(&self, handle: *mut c_void) -> Option<Box<dyn SegmentationEngine>> {
        let handle = NonNull::new(handle)?;
        debug!(handle = ?handle, "segNet engine created");
        Some(Box::new(NativeEngine {
            handle,
            lib: Arc::clone(&self.lib),
        }))
    }
}

impl EngineFactory for NativeFactory {
    fn network_type_from_str(&self, name: &str) -> NetworkType {
        let Ok(name) = CString::new(name) else {
            return NetworkType::Custom;
        };
        let raw = unsafe { (self.lib.network_type_from_str)(name.as_ptr()) };
        NetworkType::from_raw(raw)
    }

    fn create(&self, network: NetworkType) -> Option<Box<dyn SegmentationEngine>> {
        let handle = unsafe { (self.lib.create)(network.as_raw()) };
        self.wrap(handle)
    }

    fn create_from_args(&self, args: &mut ArgVector) -> Option<Box<dyn SegmentationEngine>> {
        // `args` keeps the strings alive for the duration of the call.
        let handle = unsafe { (self.lib.create_from_args)(args.argc(), args.argv()) };
        self.wrap(handle)
    }
}

/// Sole owner of one native `segNet` instance.
pub struct NativeEngine {
    handle: NonNull<c_void>,
    lib: Arc<NativeLibrary>,
}

// The handle is only dereferenced by the native library, and every entry
// point runs with the GIL held, so calls never overlap.
unsafe impl Send for NativeEngine {}
unsafe impl Sync for NativeEngine {}

impl NativeEngine {
    fn render(&self, entry: RenderFn, image: NonNull<f32>, width: u32, height: u32) -> bool {
        unsafe { entry(self.handle.as_ptr(), image.as_ptr(), width, height) }
    }
}

impl SegmentationEngine for NativeEngine {
    fn process(&self, image: NonNull<f32>, width: u32, height: u32) -> bool {
        self.render(self.lib.process, image, width, height)
    }

    fn overlay(&self, image: NonNull<f32>, width: u32, height: u32) -> bool {
        self.render(self.lib.overlay, image, width, height)
    }

    fn mask(&self, image: NonNull<f32>, width: u32, height: u32) -> bool {
        self.render(self.lib.mask, image, width, height)
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        if let Some(destroy) = self.lib.destroy {
            debug!(handle = ?self.handle, "segNet engine destroyed");
            unsafe { destroy(self.handle.as_ptr()) };
        }
    }
}

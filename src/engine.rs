//! Seams between the binding and the native segmentation library.

use std::ptr::NonNull;

use crate::convert::ArgVector;
use crate::network::NetworkType;

/// Which rendering entry point an overlay call dispatches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Overlay,
    Mask,
}

impl RenderMode {
    pub fn from_flag(mask: bool) -> Self {
        if mask {
            RenderMode::Mask
        } else {
            RenderMode::Overlay
        }
    }
}

/// A loaded segmentation network.
///
/// `image` points at `width * height` RGBA float pixels in device memory and
/// is valid only for the duration of the call. Each method returns the
/// native success flag. Engines are shared between the wrapper and its base
/// object and may be called from any Python thread, one caller at a time.
pub trait SegmentationEngine: Send + Sync {
    fn process(&self, image: NonNull<f32>, width: u32, height: u32) -> bool;
    fn overlay(&self, image: NonNull<f32>, width: u32, height: u32) -> bool;
    fn mask(&self, image: NonNull<f32>, width: u32, height: u32) -> bool;
}

/// Constructs engines, either from a built-in network or from raw
/// command-line style arguments. `None` means the native factory failed.
pub trait EngineFactory: Send + Sync {
    fn network_type_from_str(&self, name: &str) -> NetworkType;
    fn create(&self, network: NetworkType) -> Option<Box<dyn SegmentationEngine>>;
    fn create_from_args(&self, args: &mut ArgVector) -> Option<Box<dyn SegmentationEngine>>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Counting doubles for the native library.

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default)]
    pub struct EngineCalls {
        pub process: AtomicUsize,
        pub overlay: AtomicUsize,
        pub mask: AtomicUsize,
        pub dropped: AtomicUsize,
        pub last_dims: Mutex<Option<(u32, u32)>>,
    }

    impl EngineCalls {
        pub fn process(&self) -> usize {
            self.process.load(Ordering::SeqCst)
        }

        pub fn overlay(&self) -> usize {
            self.overlay.load(Ordering::SeqCst)
        }

        pub fn mask(&self) -> usize {
            self.mask.load(Ordering::SeqCst)
        }

        pub fn dropped(&self) -> usize {
            self.dropped.load(Ordering::SeqCst)
        }

        pub fn total(&self) -> usize {
            self.process() + self.overlay() + self.mask()
        }

        pub fn last_dims(&self) -> Option<(u32, u32)> {
            *self.last_dims.lock().unwrap()
        }
    }

    pub struct MockEngine {
        calls: Arc<EngineCalls>,
        succeed: bool,
    }

    impl MockEngine {
        pub fn new(succeed: bool) -> (Self, Arc<EngineCalls>) {
            let calls = Arc::new(EngineCalls::default());
            let engine = Self {
                calls: Arc::clone(&calls),
                succeed,
            };
            (engine, calls)
        }

        fn record(&self, counter: &AtomicUsize, width: u32, height: u32) -> bool {
            counter.fetch_add(1, Ordering::SeqCst);
            *self.calls.last_dims.lock().unwrap() = Some((width, height));
            self.succeed
        }
    }

    impl SegmentationEngine for MockEngine {
        fn process(&self, _image: NonNull<f32>, width: u32, height: u32) -> bool {
            self.record(&self.calls.process, width, height)
        }

        fn overlay(&self, _image: NonNull<f32>, width: u32, height: u32) -> bool {
            self.record(&self.calls.overlay, width, height)
        }

        fn mask(&self, _image: NonNull<f32>, width: u32, height: u32) -> bool {
            self.record(&self.calls.mask, width, height)
        }
    }

    impl Drop for MockEngine {
        fn drop(&mut self) {
            self.calls.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Factory double. Engines it hands out report `engine_succeeds`.
    pub struct MockFactory {
        accept: bool,
        engine_succeeds: AtomicBool,
        builtin_calls: AtomicUsize,
        argv_calls: AtomicUsize,
        pub last_network: Mutex<Option<NetworkType>>,
        pub last_argv: Mutex<Vec<String>>,
        engine_calls: Mutex<Option<Arc<EngineCalls>>>,
    }

    impl MockFactory {
        pub fn new(accept: bool) -> Self {
            Self {
                accept,
                engine_succeeds: AtomicBool::new(true),
                builtin_calls: AtomicUsize::new(0),
                argv_calls: AtomicUsize::new(0),
                last_network: Mutex::new(None),
                last_argv: Mutex::new(Vec::new()),
                engine_calls: Mutex::new(None),
            }
        }

        pub fn with_failing_engine(self) -> Self {
            self.engine_succeeds.store(false, Ordering::SeqCst);
            self
        }

        pub fn builtin_calls(&self) -> usize {
            self.builtin_calls.load(Ordering::SeqCst)
        }

        pub fn argv_calls(&self) -> usize {
            self.argv_calls.load(Ordering::SeqCst)
        }

        /// Counters of the most recently created engine.
        pub fn engine_calls(&self) -> Arc<EngineCalls> {
            self.engine_calls
                .lock()
                .unwrap()
                .clone()
                .expect("no engine created")
        }

        fn make_engine(&self) -> Option<Box<dyn SegmentationEngine>> {
            if !self.accept {
                return None;
            }
            let (engine, calls) = MockEngine::new(self.engine_succeeds.load(Ordering::SeqCst));
            *self.engine_calls.lock().unwrap() = Some(calls);
            Some(Box::new(engine))
        }
    }

    impl EngineFactory for MockFactory {
        // Like the native resolver, only exact short names are recognised.
        fn network_type_from_str(&self, name: &str) -> NetworkType {
            NetworkType::BUILT_IN
                .into_iter()
                .find(|ty| ty.name() == name)
                .unwrap_or(NetworkType::Custom)
        }

        fn create(&self, network: NetworkType) -> Option<Box<dyn SegmentationEngine>> {
            self.builtin_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_network.lock().unwrap() = Some(network);
            self.make_engine()
        }

        fn create_from_args(&self, args: &mut ArgVector) -> Option<Box<dyn SegmentationEngine>> {
            self.argv_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_argv.lock().unwrap() = args.to_strings();
            self.make_engine()
        }
    }
}

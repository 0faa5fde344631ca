//! # Layer Trait
//!
//! Tower-style middleware composition for dispatchers.
//!
//! ## Overview
//!
//! The [`Layer`] trait wraps a dispatcher to add behavior around its verbs
//! without changing what the verbs do. The crate ships one such layer,
//! [`TracingLayer`](crate::TracingLayer), which logs every call.
//!
//! ```text
//! Passthrough ──▶ Layer::layer() ──▶ Traced<Passthrough>
//! ```
//!
//! Each middleware provides:
//! 1. A wrapper struct that implements the verb traits by delegating
//! 2. A `Layer` implementation that creates the wrapper
//!
//! ## Fluent Composition
//!
//! ```rust
//! use passthrough_fs::{LayerExt, MountContext, Passthrough, TracingLayer};
//!
//! let backing = tempfile::tempdir().unwrap();
//! let fs = Passthrough::new(MountContext::new(backing.path()).unwrap())
//!     .layer(TracingLayer::new());
//! # let _ = fs;
//! ```

use crate::FsOps;

/// A layer that wraps a dispatcher to add functionality.
///
/// # Design Notes
///
/// - `layer(self, backend)` consumes both the layer and the backend
/// - The resulting `Backend` should implement [`FsOps`] so it can be mounted
///   or wrapped again
pub trait Layer<B> {
    /// The resulting backend type after applying this layer.
    type Backend;

    /// Wrap the given backend with this layer's functionality.
    fn layer(self, backend: B) -> Self::Backend;
}

/// Extension trait for fluent layer composition.
///
/// Provides `.layer()` on any [`FsOps`] dispatcher.
///
/// # Example
///
/// ```rust
/// use passthrough_fs::{FsOps, Layer, LayerExt};
///
/// fn add_middleware<B, L>(backend: B, layer: L) -> L::Backend
/// where
///     B: FsOps,
///     L: Layer<B>,
/// {
///     backend.layer(layer)
/// }
/// ```
pub trait LayerExt: FsOps + Sized {
    /// Apply a layer to this backend.
    fn layer<L: Layer<Self>>(self, layer: L) -> L::Backend {
        layer.layer(self)
    }
}

impl<B: FsOps> LayerExt for B {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MountContext, Passthrough};

    #[test]
    fn layer_ext_is_auto_implemented() {
        fn _check<B: FsOps + LayerExt>() {}
        _check::<Passthrough>();
    }

    #[test]
    fn layer_composes_types() {
        struct Tagged<B> {
            inner: B,
            tag: &'static str,
        }

        struct TagLayer(&'static str);

        impl<B: FsOps> Layer<B> for TagLayer {
            type Backend = Tagged<B>;

            fn layer(self, backend: B) -> Self::Backend {
                Tagged {
                    inner: backend,
                    tag: self.0,
                }
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let backend = Passthrough::new(MountContext::new(dir.path()).unwrap());
        let wrapped = backend.layer(TagLayer("outer"));

        assert_eq!(wrapped.tag, "outer");
        assert_eq!(wrapped.inner.context().root(), dir.path().canonicalize().unwrap());
    }
}

//! Module image loader with a path-keyed cache and scoped dependency resolution.
//!
//! Images are read into memory and decoded from the buffer, so the file on
//! disk is never held open and can be rebuilt while its module is cached.
//! References are linked transitively through a [`ResolutionScope`] opened for
//! the directory of the module being loaded.

mod cache;
mod core;
mod error;
mod module;
mod resolver;
mod scope;


pub use self::cache::ModuleCache;
pub use self::core::ModuleLoader;
pub use self::error::{
    DependencyResolutionFailure, LoadError, Probe, ProbeOutcome, ResolutionFailure,
};
pub use self::module::Module;
pub use self::resolver::{DirectoryResolver, HostResolver, Resolution, Resolve};
pub use self::scope::ResolutionScope;

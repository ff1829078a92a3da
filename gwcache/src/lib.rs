#[cfg(feature = "core")]
#[doc(inline)]
pub use gwcache_core as core;

#[cfg(feature = "signal")]
#[doc(inline)]
pub use gwcache_signal as signal;

#[cfg(feature = "store")]
#[doc(inline)]
pub use gwcache_store as store;

#[cfg(feature = "dataset")]
#[doc(inline)]
pub use gwcache_dataset as dataset;

//! Registry trait for self-registering implementations.
//!
//! Every pluggable implementation (storage backends, the platform client,
//! the availability probe) declares the name it is configured under and the
//! factory that builds it from its TOML table.

/// Base trait for implementation registries.
///
/// Each implementation module provides a `Registry` struct implementing
/// this trait, tying its configuration name to its factory function.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this
	/// implementation, e.g. "memory" for `storage.implementations.memory`.
	const NAME: &'static str;

	/// The factory function type this implementation provides; each module
	/// defines its own (StorageFactory, PlatformFactory, ...).
	type Factory;

	/// Returns the factory able to create instances of this implementation
	/// from its configuration.
	fn factory() -> Self::Factory;
}

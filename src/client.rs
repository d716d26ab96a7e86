//! Run lifecycle client.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;
mod poll;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_support;

pub use builder::SubconsciousBuilder;
pub use self::core::Subconscious;
pub use stream::RunStream;

//! Compiled contract artifacts and ABI encoding.

mod abi;
mod source;
mod types;

pub use abi::{constructor_args, encode_constructor, encode_function};
pub use source::{ArtifactSource, FoundryArtifacts, StaticArtifacts};
pub use types::{AbiError, Artifact, ArtifactError};

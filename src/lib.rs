//! A tree-walking runtime core for an ECMA-262-style scripting language.
//!
//! The crate consumes already-parsed programs (see [`ast`]) and provides the
//! object/value runtime around them: prototype-based objects, the coercion
//! and equality algorithms, lexical environments with closures, and the
//! completion-driven call/construct protocol.

pub mod ast;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod types;

pub use config::EngineConfig;
pub use error::EngineError;
pub use interpreter::{
    Completion, Interpreter, JsResult, PropertyDescriptor, PropertyDescriptorPatch,
};
pub use types::{JsBigInt, JsObject, JsString, JsSymbol, JsValue, PropertyKey, PropertyKeyLike};

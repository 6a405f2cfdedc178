// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Primitive value types shared by the tidyimp crates.
//!
//! This crate holds the pieces that everything else builds on:
//!
//! - [`text`]: 1-indexed source positions and an immutable text model
//!   that preserves the terminal-newline convention of its input.
//! - [`idents`]: Python identifier validity and dotted names.
//! - [`flags`]: the `__future__` compiler-flag bitset.

pub mod flags;
pub mod idents;
pub mod text;

pub use flags::CompilerFlags;
pub use idents::{is_identifier, BadDottedNameError, DottedName};
pub use text::{FilePos, FileText, PositionError};

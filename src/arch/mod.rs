// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Architecture backends
//!
//! Each backend implements [`Arch`](crate::Arch). Bare-metal ports live
//! with their boards; this crate ships the host backend used for
//! development and testing.

#[cfg(feature = "std")]
pub mod host;

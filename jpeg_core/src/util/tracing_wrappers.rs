// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Logging entry points that compile to nothing unless the `tracing` feature is on.

#[cfg(feature = "tracing")]
pub use tracing::{debug, instrument, trace};

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "tracing"))]
pub(crate) use debug;

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "tracing"))]
pub(crate) use trace;


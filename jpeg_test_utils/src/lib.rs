// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Helpers shared by the `jpeg_core` test suites: an MSB-first bit writer for building
//! synthetic entropy-coded segments, the example Huffman tables of ITU-T T.81 Annex K,
//! and approximate-equality assertions.

mod bit_writer;
pub mod tables;

pub use bit_writer::BitWriter;

/// Panics unless `left` and `right` differ by at most `max_error`. NaN is never close to
/// anything.
#[macro_export]
macro_rules! assert_almost_eq {
    ($left:expr, $right:expr, $max_error:expr $(,)?) => {{
        let (left, right, max_error) = ($left, $right, $max_error);
        let delta = if left > right { left - right } else { right - left };
        if !(delta <= max_error) {
            panic!("assertion failed: `{left:?}` and `{right:?}` differ by more than `{max_error:?}`");
        }
    }};
}

/// Element-wise [`assert_almost_eq!`] over two slices or arrays of the same length.
#[macro_export]
macro_rules! assert_all_almost_eq {
    ($left:expr, $right:expr, $max_error:expr $(,)?) => {{
        let (left, right, max_error) = (&$left, &$right, $max_error);
        assert_eq!(left.len(), right.len(), "length mismatch");
        for (index, (&l, &r)) in left.iter().zip(right.iter()).enumerate() {
            let delta = if l > r { l - r } else { r - l };
            if !(delta <= max_error) {
                panic!(
                    "assertion failed at index {index}: `{l:?}` and `{r:?}` differ by more than `{max_error:?}`"
                );
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn close_values() {
        assert_almost_eq!(1.0000001f64, 1.0000002, 0.000001);
        assert_almost_eq!(100, 101, 2);
        assert_almost_eq!(-3i16, 0, 3);
        assert_all_almost_eq!([1.0f64, 2.0], [1.05, 1.95], 0.1);
    }

    #[test]
    #[should_panic]
    fn far_values() {
        assert_almost_eq!(1.0, 1.2, 0.1);
    }

    #[test]
    #[should_panic]
    fn nan_is_never_close() {
        assert_almost_eq!(f64::NAN, f64::NAN, 0.1);
    }

    #[test]
    #[should_panic]
    fn length_mismatch() {
        assert_all_almost_eq!([1.0f64, 2.0], [1.0f64], 0.1);
    }
}

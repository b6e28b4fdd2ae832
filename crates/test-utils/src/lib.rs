//! Shared test utilities for the chart workspace.
//!
//! This crate provides:
//! - Synthetic chart stores (dalle grids + sidecars in a temp dir)
//! - Approximate equality assertions
//!
//! # Usage
//!
//! ```ignore
//! use test_utils::ChartFixture;
//!
//! let fixture = ChartFixture::new();
//! fixture.add_georeferenced("7330", 2048, 2048, 10.0, [0.0, 20480.0]);
//! let store = fixture.store();
//! ```

pub mod fixtures;

pub use fixtures::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Approximate equality of two positions (anything with `x`/`y` fields).
#[macro_export]
macro_rules! assert_position_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (l, r) = ($left, $right);
        $crate::assert_approx_eq!(l.x, r.x, $epsilon);
        $crate::assert_approx_eq!(l.y, r.y, $epsilon);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_fixture_writes_dalles() {
        let fixture = ChartFixture::new();
        fixture.add_scanned("a", 1500, 900);
        let store = fixture.store();

        let info = store.read_sidecar("a").unwrap();
        assert_eq!((info.width, info.height), (1500, 900));
        assert!(info.georef.is_none());

        let right = store.load_dalle("a", 1, 0).unwrap().unwrap();
        assert_eq!(right.dimensions(), (476, 900));
        assert_eq!(right.get_pixel(0, 0), &dalle_color(1, 0));
        assert!(store.load_dalle("a", 2, 0).unwrap().is_none());
    }

    #[test]
    fn test_remove_dalle() {
        let fixture = ChartFixture::new();
        fixture.add_georeferenced("b", 2048, 1024, 5.0, [0.0, 5120.0]);
        fixture.remove_dalle("b", 1, 0);
        let store = fixture.store();
        assert!(store.load_dalle("b", 0, 0).unwrap().is_some());
        assert!(store.load_dalle("b", 1, 0).unwrap().is_none());
    }
}

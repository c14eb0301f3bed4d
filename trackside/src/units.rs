//! Conversion between physical distances (feet) and drawing units (pixels).

/// Feet per mile.
pub const FEET_PER_MILE: f64 = 5280.0;

/// Miles per hour to feet per second.
pub fn mph_to_fps(mph: f64) -> f64 {
    mph * FEET_PER_MILE / 3600.0
}

/// Feet per second to miles per hour.
pub fn fps_to_mph(fps: f64) -> f64 {
    fps * 3600.0 / FEET_PER_MILE
}

/// Distance in feet covered in `tick_ms` milliseconds at `mph`.
pub fn step_feet(mph: f64, tick_ms: f64) -> f64 {
    mph_to_fps(mph) * tick_ms / 1000.0
}

/// The map scale. Every operation that turns geometry into physical
/// length takes one of these explicitly.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Scale {
    pub feet_per_pixel: f64,
}

impl Default for Scale {
    fn default() -> Scale {
        Scale { feet_per_pixel: 2.0 }
    }
}

impl Scale {
    pub fn new(feet_per_pixel: f64) -> Scale {
        assert!(feet_per_pixel > 0.0, "scale must be positive");
        Scale { feet_per_pixel }
    }

    pub fn to_feet(&self, pixels: f64) -> f64 {
        pixels * self.feet_per_pixel
    }

    pub fn to_pixels(&self, feet: f64) -> f64 {
        feet / self.feet_per_pixel
    }
}

#[test]
fn test_conversions() {
    let s = Scale::new(2.5);
    assert_eq!(s.to_feet(10.0), 25.0);
    assert_eq!(s.to_pixels(25.0), 10.0);
    assert!((mph_to_fps(60.0) - 88.0).abs() < 1e-9);
    assert!((fps_to_mph(88.0) - 60.0).abs() < 1e-9);
    // 60 mph for 500 ms
    assert!((step_feet(60.0, 500.0) - 44.0).abs() < 1e-9);
}

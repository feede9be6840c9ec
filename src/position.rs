//! Where the decline button jumps to next.

use bevy::math::Vec2;
use rand::Rng;

/// A new position must clear the old one by this much on at least one axis.
pub const MIN_DODGE_DISTANCE: f32 = 150.0;
pub const MAX_SAMPLES: usize = 1000;

/// Decline button footprint, kept clear of the right and bottom edges.
pub const DECLINE_PADDING: Vec2 = Vec2::new(80.0, 40.0);

/// Samples a point in `[m/2, W-m] x [m/2, H-m]` far enough from `current`.
///
/// Without a current position any in-bounds sample is accepted. After
/// [`MAX_SAMPLES`] draws the last sample is returned as-is.
pub fn next_position<R: Rng + ?Sized>(
    current: Option<Vec2>,
    viewport: Vec2,
    padding: Vec2,
    rng: &mut R,
) -> Vec2 {
    let xs = axis_range(viewport.x, padding.x);
    let ys = axis_range(viewport.y, padding.y);

    let mut sample = Vec2::new(sample_axis(xs, rng), sample_axis(ys, rng));
    let Some(current) = current else {
        return sample;
    };
    for _ in 1..MAX_SAMPLES {
        if far_enough(current, sample) {
            break;
        }
        sample = Vec2::new(sample_axis(xs, rng), sample_axis(ys, rng));
    }
    sample
}

pub fn far_enough(from: Vec2, to: Vec2) -> bool {
    (to.x - from.x).abs() >= MIN_DODGE_DISTANCE || (to.y - from.y).abs() >= MIN_DODGE_DISTANCE
}

fn axis_range(extent: f32, margin: f32) -> (f32, f32) {
    let lo = margin / 2.0;
    let hi = extent - margin;
    if hi > lo {
        (lo, hi)
    } else {
        // Viewport narrower than the button; pin to the middle
        let mid = (extent / 2.0).max(0.0);
        (mid, mid)
    }
}

fn sample_axis<R: Rng + ?Sized>((lo, hi): (f32, f32), rng: &mut R) -> f32 {
    if hi > lo {
        rng.random_range(lo..hi)
    } else {
        lo
    }
}

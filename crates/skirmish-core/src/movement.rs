//! Movement with obstacle collision.
//!
//! Every mobile agent moves through [`move_with_collisions`]: a circle is
//! moved along X, then along Y, rejecting any axis step that would overlap an
//! obstacle, so agents slide along walls instead of sticking at corners.

use glam::Vec2;

use crate::geometry::Obstacle;

/// Checks if a circle overlaps an obstacle (closest-point distance test).
#[must_use]
pub fn circle_overlaps(center: Vec2, radius: f32, obstacle: &Obstacle) -> bool {
    obstacle.closest_point(center).distance_squared(center) < radius * radius
}

/// Checks if a circle overlaps any obstacle.
#[must_use]
pub fn circle_overlaps_any(center: Vec2, radius: f32, obstacles: &[Obstacle]) -> bool {
    obstacles
        .iter()
        .any(|obstacle| circle_overlaps(center, radius, obstacle))
}

/// Clamps a position into `[radius, world_size - radius]` on both axes.
#[must_use]
pub fn clamp_to_world(position: Vec2, radius: f32, world_size: f32) -> Vec2 {
    let lo = radius.min(world_size * 0.5);
    let hi = (world_size - radius).max(lo);
    position.clamp(Vec2::splat(lo), Vec2::splat(hi))
}

/// Moves a circular collider by `delta`, resolving X before Y.
///
/// An axis step is rejected outright when the circle would overlap an
/// obstacle at the new position. Each axis candidate is clamped to the world
/// before testing, and the final result is clamped again so out-of-bounds
/// starting points are pulled back in.
#[must_use]
pub fn move_with_collisions(
    position: Vec2,
    delta: Vec2,
    radius: f32,
    obstacles: &[Obstacle],
    world_size: f32,
) -> Vec2 {
    let mut result = position;

    let candidate = clamp_to_world(Vec2::new(result.x + delta.x, result.y), radius, world_size);
    if !circle_overlaps_any(candidate, radius, obstacles) {
        result.x = candidate.x;
    }

    let candidate = clamp_to_world(Vec2::new(result.x, result.y + delta.y), radius, world_size);
    if !circle_overlaps_any(candidate, radius, obstacles) {
        result.y = candidate.y;
    }

    clamp_to_world(result, radius, world_size)
}

/// Result of a sub-stepped move.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    /// Final position
    pub end: Vec2,
    /// Position after every sub-step, in order
    pub path: Vec<Vec2>,
}

/// Moves a long displacement in sub-steps no longer than half the radius.
///
/// Used by dashes and rams so a single large delta cannot hop over a thin
/// obstacle.
#[must_use]
pub fn sweep_with_collisions(
    position: Vec2,
    delta: Vec2,
    radius: f32,
    obstacles: &[Obstacle],
    world_size: f32,
) -> Sweep {
    let step_len = (radius * 0.5).max(1.0);
    let steps = (delta.length() / step_len).ceil().max(1.0) as usize;
    let step = delta / steps as f32;

    let mut current = position;
    let mut path = Vec::with_capacity(steps);
    for _ in 0..steps {
        current = move_with_collisions(current, step, radius, obstacles, world_size);
        path.push(current);
    }

    Sweep { end: current, path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WORLD: f32 = 1000.0;

    #[test]
    fn test_free_move() {
        let end =
            move_with_collisions(Vec2::new(100.0, 100.0), Vec2::new(10.0, -5.0), 10.0, &[], WORLD);
        assert_eq!(end, Vec2::new(110.0, 95.0));
    }

    #[test]
    fn test_x_blocked_y_slides() {
        let wall = [Obstacle::new(120.0, 0.0, 20.0, 400.0)];
        let end = move_with_collisions(
            Vec2::new(105.0, 200.0),
            Vec2::new(10.0, 10.0),
            10.0,
            &wall,
            WORLD,
        );
        // X rejected, Y applied: slides along the wall
        assert_eq!(end, Vec2::new(105.0, 210.0));
    }

    #[test]
    fn test_clamped_to_world() {
        let end =
            move_with_collisions(Vec2::new(15.0, 990.0), Vec2::new(-50.0, 50.0), 10.0, &[], WORLD);
        assert_eq!(end, Vec2::new(10.0, 990.0));
    }

    #[test]
    fn test_zero_delta_is_identity() {
        let start = Vec2::new(300.0, 300.0);
        assert_eq!(move_with_collisions(start, Vec2::ZERO, 12.0, &[], WORLD), start);
    }

    #[test]
    fn test_sweep_stops_at_thin_wall() {
        let wall = [Obstacle::new(200.0, 0.0, 2.0, 1000.0)];
        let sweep = sweep_with_collisions(
            Vec2::new(100.0, 500.0),
            Vec2::new(300.0, 0.0),
            10.0,
            &wall,
            WORLD,
        );
        assert!(sweep.end.x < 200.0);
        assert!(!sweep.path.is_empty());
        // A single unstepped move would have tunneled
        let start = Vec2::new(100.0, 500.0);
        let jumped = move_with_collisions(start, Vec2::new(300.0, 0.0), 10.0, &wall, WORLD);
        assert!(jumped.x > 200.0);
    }

    fn obstacle_strategy() -> impl Strategy<Value = Obstacle> {
        (100.0f32..800.0, 100.0f32..800.0, 10.0f32..150.0, 10.0f32..150.0)
            .prop_map(|(x, y, w, h)| Obstacle::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn prop_never_ends_inside_obstacle_or_out_of_bounds(
            obstacles in prop::collection::vec(obstacle_strategy(), 0..6),
            start in (0.0f32..WORLD, 0.0f32..WORLD),
            delta in (-300.0f32..300.0, -300.0f32..300.0),
            radius in 2.0f32..30.0,
        ) {
            let start = Vec2::new(start.0, start.1);
            prop_assume!(start.x >= radius && start.x <= WORLD - radius);
            prop_assume!(start.y >= radius && start.y <= WORLD - radius);
            prop_assume!(!circle_overlaps_any(start, radius, &obstacles));

            let end =
                move_with_collisions(start, Vec2::new(delta.0, delta.1), radius, &obstacles, WORLD);

            prop_assert!(!circle_overlaps_any(end, radius, &obstacles));
            prop_assert!(end.x >= radius && end.x <= WORLD - radius);
            prop_assert!(end.y >= radius && end.y <= WORLD - radius);
        }
    }
}

//! String-pulling compression of cell-by-cell routes.

use gridwalk_core::{OccupancyView, Vec2};

/// Reduces a raw route to the waypoints needed to keep mutual line of sight.
///
/// The first point is always kept. From each anchor the scan visits every
/// remaining point and keeps the farthest one visible from the anchor, which
/// then becomes the next anchor. When nothing beyond the immediate successor
/// is visible the successor is kept so compression always makes progress.
/// Routes of two points or fewer are returned unchanged, and running the
/// compressor on its own output returns the same points.
#[must_use]
pub fn compress(view: &OccupancyView<'_>, points: &[Vec2]) -> Vec<Vec2> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut compressed = vec![points[0]];
    let mut anchor = 0;

    while anchor < last {
        let mut next = anchor + 1;
        for candidate in anchor + 2..=last {
            if view.line_of_sight(points[anchor], points[candidate]) {
                next = candidate;
            }
        }
        compressed.push(points[next]);
        anchor = next;
    }

    compressed
}

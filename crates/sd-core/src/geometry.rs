//! Geometry the tree needs for grouping: bounding boxes, rotation and the
//! projection of children in and out of a group's coordinate space.

use crate::model::{AttrConfig, StyleConfig};
use serde::{Deserialize, Serialize};

// ─── Rect ────────────────────────────────────────────────────────────────

/// Axis-aligned box in canvas (or group-local) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right() && y >= self.top && y <= self.bottom()
    }

    /// AABB overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right()
            && self.right() > other.left
            && self.top < other.bottom()
            && self.bottom() > other.top
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        Rect::new(
            left,
            top,
            self.right().max(other.right()) - left,
            self.bottom().max(other.bottom()) - top,
        )
    }

    /// Grow by `pad` on every side, plus `extra_top` above.
    pub fn expand(&self, pad: f64, extra_top: f64) -> Rect {
        Rect::new(
            self.left - pad,
            self.top - pad - extra_top,
            self.width + pad * 2.0,
            self.height + pad * 2.0 + extra_top,
        )
    }
}

impl From<&StyleConfig> for Rect {
    fn from(s: &StyleConfig) -> Self {
        Rect::new(s.left, s.top, s.width, s.height)
    }
}

// ─── Rotation ────────────────────────────────────────────────────────────

/// Rotate the vector `(x, y)` clockwise by `degrees` (screen coordinates,
/// y pointing down).
pub fn rotate_vec(x: f64, y: f64, degrees: f64) -> (f64, f64) {
    if degrees == 0.0 {
        return (x, y);
    }
    let (sin, cos) = degrees.to_radians().sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

/// Axis-aligned bounds of a box rotated about its own centre.
pub fn rotated_bounds(style: &StyleConfig) -> Rect {
    let rect = Rect::from(style);
    if style.rotate % 360.0 == 0.0 {
        return rect;
    }
    let (sin, cos) = style.rotate.to_radians().sin_cos();
    let w = (style.width * cos).abs() + (style.height * sin).abs();
    let h = (style.width * sin).abs() + (style.height * cos).abs();
    let (cx, cy) = rect.center();
    Rect::new(cx - w / 2.0, cy - h / 2.0, w, h)
}

/// Union of the rotated bounds of every style, `None` when empty.
pub fn bounding_box<'a>(styles: impl IntoIterator<Item = &'a StyleConfig>) -> Option<Rect> {
    styles
        .into_iter()
        .map(rotated_bounds)
        .reduce(|acc, r| acc.union(&r))
}

fn normalize_degrees(deg: f64) -> f64 {
    let d = deg % 360.0;
    if d < 0.0 { d + 360.0 } else { d }
}

// ─── Group projection ────────────────────────────────────────────────────

/// Pixel offsets applied around a new group's bounds.
///
/// These are layout constants rather than contracts: tune them against the
/// renderer's group chrome. All default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupLayout {
    /// Space between the children's union box and the group edge.
    pub padding: f64,
    /// Extra space reserved above the children (group header).
    pub header_height: f64,
}

impl GroupLayout {
    /// Frame of a new group around `children`.
    pub fn frame<'a>(&self, children: impl IntoIterator<Item = &'a StyleConfig>) -> Option<Rect> {
        bounding_box(children).map(|r| r.expand(self.padding, self.header_height))
    }
}

/// Geometry written back into a child when it leaves its group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub rotate: f64,
}

/// Position of `child` relative to a group frame placed at `frame`.
pub fn to_group_local(child: &StyleConfig, frame: &Rect) -> (f64, f64) {
    (child.left - frame.left, child.top - frame.top)
}

/// Map a child's group-local geometry into the group's parent space.
///
/// The group transform is: scale about the group centre, rotate about the
/// group centre, then translate to the group's position. The child's own
/// rotation is added to the group's; its size is scaled per axis. Skew is
/// left as it was.
pub fn project_out_of_group(
    child: &StyleConfig,
    group: &StyleConfig,
    group_attr: &AttrConfig,
) -> Projected {
    let (gcx, gcy) = (group.width / 2.0, group.height / 2.0);
    let (ccx, ccy) = (child.left + child.width / 2.0, child.top + child.height / 2.0);

    let dx = (ccx - gcx) * group_attr.scale_x;
    let dy = (ccy - gcy) * group_attr.scale_y;
    let (rx, ry) = rotate_vec(dx, dy, group.rotate);

    let width = child.width * group_attr.scale_x;
    let height = child.height * group_attr.scale_y;
    let cx = group.left + gcx + rx;
    let cy = group.top + gcy + ry;

    let rotate = if group.rotate == 0.0 {
        child.rotate
    } else {
        normalize_degrees(child.rotate + group.rotate)
    };

    Projected {
        left: cx - width / 2.0,
        top: cy - height / 2.0,
        width,
        height,
        rotate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(left: f64, top: f64, width: f64, height: f64) -> StyleConfig {
        StyleConfig {
            left,
            top,
            width,
            height,
            ..Default::default()
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn union_covers_both() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 5.0, 10.0, 20.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 0.0, 30.0, 25.0));
    }

    #[test]
    fn rect_hit_tests() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(r.contains(15.0, 30.0));
        assert!(!r.contains(31.0, 15.0));
        assert!(r.intersects(&Rect::new(25.0, 25.0, 10.0, 10.0)));
        assert!(!r.intersects(&Rect::new(30.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn rotated_quarter_turn_swaps_extent() {
        let mut s = style(0.0, 0.0, 100.0, 20.0);
        s.rotate = 90.0;
        let r = rotated_bounds(&s);
        assert!(close(r.width, 20.0));
        assert!(close(r.height, 100.0));
        assert!(close(r.left, 40.0));
        assert!(close(r.top, -40.0));
    }

    #[test]
    fn frame_applies_padding_and_header() {
        let layout = GroupLayout {
            padding: 5.0,
            header_height: 10.0,
        };
        let a = style(10.0, 10.0, 10.0, 10.0);
        let b = style(30.0, 40.0, 10.0, 10.0);
        let f = layout.frame([&a, &b]).unwrap();
        assert_eq!(f, Rect::new(5.0, -5.0, 40.0, 60.0));
    }

    #[test]
    fn empty_frame_is_none() {
        assert!(GroupLayout::default().frame(std::iter::empty()).is_none());
    }

    #[test]
    fn identity_group_projection_is_translation() {
        let group = style(100.0, 50.0, 200.0, 100.0);
        let child = style(10.0, 20.0, 30.0, 40.0);
        let p = project_out_of_group(&child, &group, &AttrConfig::default());
        assert_eq!((p.left, p.top, p.width, p.height), (110.0, 70.0, 30.0, 40.0));
        assert_eq!(p.rotate, 0.0);
    }

    #[test]
    fn scaled_group_scales_about_centre() {
        let group = style(0.0, 0.0, 100.0, 100.0);
        let child = style(0.0, 0.0, 50.0, 50.0);
        let attr = AttrConfig {
            scale_x: 2.0,
            scale_y: 2.0,
            ..Default::default()
        };
        let p = project_out_of_group(&child, &group, &attr);
        // child centre (25,25) is 25 left/up of group centre → 50 after scaling
        assert!(close(p.left, -50.0));
        assert!(close(p.top, -50.0));
        assert!(close(p.width, 100.0));
    }

    #[test]
    fn rotated_group_rotates_child_about_group_centre() {
        let mut group = style(0.0, 0.0, 100.0, 100.0);
        group.rotate = 90.0;
        let child = style(50.0, 40.0, 50.0, 20.0);
        let p = project_out_of_group(&child, &group, &AttrConfig::default());
        // child centre (75,50) → offset (25,0) → rotated (0,25) → centre (50,75)
        assert!(close(p.left + p.width / 2.0, 50.0));
        assert!(close(p.top + p.height / 2.0, 75.0));
        assert!(close(p.rotate, 90.0));
    }

    #[test]
    fn negative_rotation_normalizes() {
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(450.0), 90.0);
    }
}

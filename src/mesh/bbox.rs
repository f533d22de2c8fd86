//! Part bounding boxes and their unions.

use glam::Vec3;

/// Axis-aligned bounding box of a part or mesh.
///
/// Serialized form is the six floats `[minX, minY, minZ, maxX, maxY, maxZ]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl BBox {
    /// Box spanning `min..max`.
    pub fn from_min_max(min: [f32; 3], max: [f32; 3]) -> Self {
        Self {
            min: Vec3::from_array(min),
            max: Vec3::from_array(max),
        }
    }

    /// Box from the six-float layout.
    pub fn from_array(v: [f32; 6]) -> Self {
        Self::from_min_max([v[0], v[1], v[2]], [v[3], v[4], v[5]])
    }

    /// Six-float layout `[min.xyz, max.xyz]`.
    pub fn to_array(&self) -> [f32; 6] {
        [
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y,
            self.max.z,
        ]
    }

    /// Expand in place to enclose `other`.
    pub fn grow(&mut self, other: &BBox) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Centre point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Length of the diagonal.
    pub fn diagonal(&self) -> f32 {
        (self.max - self.min).length()
    }
}

/// Grow `original` to encompass `addition`. An absent original is replaced
/// wholesale by a copy of `addition`.
pub fn grow_bbox(original: Option<BBox>, addition: &BBox) -> BBox {
    match original {
        None => *addition,
        Some(mut bbox) => {
            bbox.grow(addition);
            bbox
        }
    }
}

/// Union of every box in `boxes`, or `None` for an empty iterator.
pub fn union<'a>(boxes: impl IntoIterator<Item = &'a BBox>) -> Option<BBox> {
    boxes
        .into_iter()
        .fold(None, |acc, b| Some(grow_bbox(acc, b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growing_nothing_clones_the_addition() {
        let addition = BBox::from_array([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let grown = grow_bbox(None, &addition);
        assert_eq!(grown.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn growing_expands_each_axis_independently() {
        let original = BBox::from_array([0.0, 0.0, 0.0, 10.0, 10.0, 10.0]);
        let addition = BBox::from_array([-1.0, 5.0, 5.0, 5.0, 15.0, 15.0]);
        let grown = grow_bbox(Some(original), &addition);
        assert_eq!(grown.to_array(), [-1.0, 0.0, 0.0, 10.0, 15.0, 15.0]);
    }

    #[test]
    fn union_of_many() {
        let boxes = [
            BBox::from_array([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]),
            BBox::from_array([2.0, -1.0, 0.5, 3.0, 0.0, 0.75]),
        ];
        let u = union(&boxes).unwrap();
        assert_eq!(u.to_array(), [0.0, -1.0, 0.0, 3.0, 1.0, 1.0]);
        assert_eq!(u.center(), Vec3::new(1.5, 0.0, 0.5));
        let empty: [BBox; 0] = [];
        assert!(union(&empty).is_none());
    }
}

//! Skeletal model: a fixed bone hierarchy driven by averaged relative
//! joint angles, recomputed by forward kinematics every tick.
//!
//! Bones live in an arena addressed by index; a bone's parent is a validated
//! index into the same arena, resolved once from the startup table. A table
//! that is not a tree (duplicate name, dangling parent, cycle, zero or
//! several roots) is rejected at construction.

pub mod measures;

pub use measures::{ArmHeight, ContractionIndex};

use crate::sample::is_no_data;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::{Add, Sub};
use tracing::warn;

/// 3D point/vector in skeleton space (meters, y up).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Row-major 3x3 rotation matrix.
#[derive(Debug, Clone, Copy)]
pub struct Mat3 {
    m: [[f64; 3]; 3],
}

impl Mat3 {
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    pub fn rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]],
        }
    }

    pub fn rotation_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            m: [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]],
        }
    }

    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            m: [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Bone-local rotation: tilt about x, then rotation about y, then
    /// lateral tilt about z.
    pub fn from_tilt_rotate_lateral(tilt: f64, rotate: f64, lateral: f64) -> Self {
        Self::rotation_x(tilt)
            .mul(&Self::rotation_y(rotate))
            .mul(&Self::rotation_z(lateral))
    }

    pub fn mul(&self, other: &Mat3) -> Mat3 {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        Mat3 { m: out }
    }

    pub fn apply(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.m[0][0] * v.x + self.m[0][1] * v.y + self.m[0][2] * v.z,
            self.m[1][0] * v.x + self.m[1][1] * v.y + self.m[1][2] * v.z,
            self.m[2][0] * v.x + self.m[2][1] * v.y + self.m[2][2] * v.z,
        )
    }
}

/// Which way a bone's segment extends from its anchor at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn unit(self) -> Vec3 {
        match self {
            Direction::Up => Vec3::new(0.0, 1.0, 0.0),
            Direction::Down => Vec3::new(0.0, -1.0, 0.0),
        }
    }
}

/// One row of the static bone table.
#[derive(Debug, Clone, Copy)]
pub struct BoneSpec {
    pub name: &'static str,
    /// Parent bone name; empty for the root.
    pub parent: &'static str,
    /// Rest anchor offset from the parent's anchor.
    pub offset: [f64; 3],
    /// Segment length from anchor to end point.
    pub length: f64,
    pub direction: Direction,
}

/// Standard full-body bone table. Offsets approximate an adult performer,
/// hips at the origin, y up.
pub const STANDARD_BONE_TABLE: &[BoneSpec] = &[
    BoneSpec { name: "Root", parent: "", offset: [0.0, 0.0, 0.0], length: 0.0, direction: Direction::Up },
    BoneSpec { name: "Hip", parent: "Root", offset: [0.0, 0.0, 0.0], length: 0.23, direction: Direction::Up },
    BoneSpec { name: "Tummy", parent: "Hip", offset: [0.0, 0.23, 0.0], length: 0.17, direction: Direction::Up },
    BoneSpec { name: "ChestBottom", parent: "Tummy", offset: [0.0, 0.17, 0.0], length: 0.10, direction: Direction::Up },
    BoneSpec { name: "ChestTop", parent: "ChestBottom", offset: [0.0, 0.10, 0.0], length: 0.13, direction: Direction::Up },
    BoneSpec { name: "Neck", parent: "ChestTop", offset: [0.0, 0.13, 0.0], length: 0.13, direction: Direction::Up },
    BoneSpec { name: "Head", parent: "Neck", offset: [0.0, 0.13, 0.0], length: 0.15, direction: Direction::Up },
    BoneSpec { name: "LeftCollar", parent: "ChestTop", offset: [0.14, 0.10, 0.0], length: 0.0, direction: Direction::Up },
    BoneSpec { name: "LeftUpperArm", parent: "LeftCollar", offset: [0.04, 0.0, 0.0], length: 0.28, direction: Direction::Down },
    BoneSpec { name: "LeftForeArm", parent: "LeftUpperArm", offset: [0.0, -0.28, 0.0], length: 0.26, direction: Direction::Down },
    BoneSpec { name: "LeftHand", parent: "LeftForeArm", offset: [0.0, -0.26, 0.0], length: 0.18, direction: Direction::Down },
    BoneSpec { name: "RightCollar", parent: "ChestTop", offset: [-0.14, 0.10, 0.0], length: 0.0, direction: Direction::Up },
    BoneSpec { name: "RightUpperArm", parent: "RightCollar", offset: [-0.04, 0.0, 0.0], length: 0.28, direction: Direction::Down },
    BoneSpec { name: "RightForeArm", parent: "RightUpperArm", offset: [0.0, -0.28, 0.0], length: 0.26, direction: Direction::Down },
    BoneSpec { name: "RightHand", parent: "RightForeArm", offset: [0.0, -0.26, 0.0], length: 0.18, direction: Direction::Down },
    BoneSpec { name: "LeftThigh", parent: "Root", offset: [0.09, 0.0, 0.0], length: 0.42, direction: Direction::Down },
    BoneSpec { name: "LeftLowerLeg", parent: "LeftThigh", offset: [0.0, -0.42, 0.0], length: 0.44, direction: Direction::Down },
    BoneSpec { name: "RightThigh", parent: "Root", offset: [-0.09, 0.0, 0.0], length: 0.42, direction: Direction::Down },
    BoneSpec { name: "RightLowerLeg", parent: "RightThigh", offset: [0.0, -0.42, 0.0], length: 0.44, direction: Direction::Down },
];

/// Bone table validation errors. Any of these refuses construction.
#[derive(Debug, PartialEq, Eq)]
pub enum SkeletonError {
    DuplicateBone(String),
    DanglingParent { bone: String, parent: String },
    Cycle(String),
    NoRoot,
    MultipleRoots(String),
}

impl std::fmt::Display for SkeletonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkeletonError::DuplicateBone(name) => write!(f, "duplicate bone name: {name}"),
            SkeletonError::DanglingParent { bone, parent } => {
                write!(f, "bone {bone} references unknown parent {parent}")
            }
            SkeletonError::Cycle(name) => write!(f, "bone table cycles through {name}"),
            SkeletonError::NoRoot => write!(f, "bone table has no root"),
            SkeletonError::MultipleRoots(name) => {
                write!(f, "bone table has a second root: {name}")
            }
        }
    }
}

impl std::error::Error for SkeletonError {}

struct Bone {
    name: String,
    parent: Option<usize>,
    offset: Vec3,
    length: f64,
    direction: Direction,
    /// Current relative angles: tilt, rotate, lateral (radians).
    angles: [f64; 3],
    anchor: Vec3,
    end: Vec3,
}

/// Fixed bone hierarchy with per-tick forward kinematics.
pub struct Skeleton {
    bones: Vec<Bone>,
    index: HashMap<String, usize>,
}

impl Skeleton {
    /// Build and validate a skeleton from a bone table.
    pub fn from_table(table: &[BoneSpec]) -> Result<Self, SkeletonError> {
        let mut index = HashMap::new();
        for (i, spec) in table.iter().enumerate() {
            if index.insert(spec.name.to_string(), i).is_some() {
                return Err(SkeletonError::DuplicateBone(spec.name.to_string()));
            }
        }

        let mut root: Option<&str> = None;
        let mut bones = Vec::with_capacity(table.len());
        for spec in table {
            let parent = if spec.parent.is_empty() {
                match root {
                    None => root = Some(spec.name),
                    Some(_) => return Err(SkeletonError::MultipleRoots(spec.name.to_string())),
                }
                None
            } else {
                match index.get(spec.parent) {
                    Some(&p) => Some(p),
                    None => {
                        return Err(SkeletonError::DanglingParent {
                            bone: spec.name.to_string(),
                            parent: spec.parent.to_string(),
                        })
                    }
                }
            };
            bones.push(Bone {
                name: spec.name.to_string(),
                parent,
                offset: Vec3::new(spec.offset[0], spec.offset[1], spec.offset[2]),
                length: spec.length,
                direction: spec.direction,
                angles: [0.0; 3],
                anchor: Vec3::ZERO,
                end: Vec3::ZERO,
            });
        }

        if root.is_none() {
            return Err(SkeletonError::NoRoot);
        }

        // Walking any parent chain must terminate within bone-count steps.
        for (i, bone) in bones.iter().enumerate() {
            let mut cursor = bone.parent;
            let mut steps = 0;
            while let Some(p) = cursor {
                steps += 1;
                if steps > bones.len() {
                    return Err(SkeletonError::Cycle(bones[i].name.clone()));
                }
                cursor = bones[p].parent;
            }
        }

        let mut skeleton = Self { bones, index };
        skeleton.update();
        Ok(skeleton)
    }

    /// The standard full-body skeleton.
    pub fn standard() -> Self {
        // The static table is validated by tests; a panic here is a build
        // defect, not a runtime condition.
        Self::from_table(STANDARD_BONE_TABLE).expect("standard bone table is a valid tree")
    }

    /// Store a bone's current relative angles (tilt, rotate, lateral).
    /// Sentinel channels are skipped; unknown bones are logged and ignored.
    pub fn set_relative_angles(&mut self, name: &str, angles: [f64; 3]) {
        let Some(&i) = self.index.get(name) else {
            warn!(bone = name, "relative angles for unknown bone");
            return;
        };
        for (slot, value) in self.bones[i].angles.iter_mut().zip(angles) {
            if !is_no_data(value) {
                *slot = value;
            }
        }
    }

    /// Recompute every bone's world anchor and end point by composing its
    /// full ancestor chain. Nothing is cached across ticks.
    pub fn update(&mut self) {
        for i in 0..self.bones.len() {
            let (anchor, orientation) = self.world_transform(i);
            let bone = &mut self.bones[i];
            bone.anchor = anchor;
            bone.end = anchor + orientation.apply(bone.direction.unit().scale(bone.length));
        }
    }

    fn world_transform(&self, index: usize) -> (Vec3, Mat3) {
        let bone = &self.bones[index];
        let local = Mat3::from_tilt_rotate_lateral(bone.angles[0], bone.angles[1], bone.angles[2]);
        match bone.parent {
            None => (bone.offset, local),
            Some(parent) => {
                let (parent_anchor, parent_orientation) = self.world_transform(parent);
                let anchor = parent_anchor + parent_orientation.apply(bone.offset);
                (anchor, parent_orientation.mul(&local))
            }
        }
    }

    /// World anchor point of a bone. Unknown names are logged and yield
    /// `None`; computation elsewhere continues.
    pub fn anchor_position(&self, name: &str) -> Option<Vec3> {
        match self.index.get(name) {
            Some(&i) => Some(self.bones[i].anchor),
            None => {
                warn!(bone = name, "anchor lookup for unknown bone");
                None
            }
        }
    }

    /// World end point of a bone. Unknown names are logged and yield `None`.
    pub fn end_position(&self, name: &str) -> Option<Vec3> {
        match self.index.get(name) {
            Some(&i) => Some(self.bones[i].end),
            None => {
                warn!(bone = name, "end lookup for unknown bone");
                None
            }
        }
    }

    pub fn has_bone(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn bone_names(&self) -> impl Iterator<Item = &str> {
        self.bones.iter().map(|b| b.name.as_str())
    }

    /// All current end points, in table order.
    pub fn end_points(&self) -> Vec<Vec3> {
        self.bones.iter().map(|b| b.end).collect()
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }
}

//! Geometric transform utilities shared by the input samplers and the control loop.
//!
//! Two coordinate conventions meet in this pipeline. The IK solver and the goal live in the
//! ROS convention (Z up), while the robot model, the goal marker and the VR controller are
//! tracked in the render convention (Y up). Moving a pose between them is always explicit:
//! the pose is conjugated by a fixed 90 degree rotation about X (see [`convert_frame`]).
//!
//! Relative goals are displacements from the end effector pose captured when the session
//! started. [`relative_to_absolute`] adds the translation in the outer frame and pre-multiplies
//! the rotation, so a goal accumulated from world-frame increments stays world-frame.
//!
//! All functions are pure.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use std::f64::consts::FRAC_PI_2;
use crate::kinematic_traits::Pose;

/// Which axis is "up" for a pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// Z up, as used by the solver and the robot description.
    Ros,
    /// Y up, as used by the renderer and the VR runtime.
    Render,
}

/// Pose tagged with the convention it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramedPose {
    pub pose: Pose,
    pub convention: Convention,
}

impl FramedPose {
    pub fn ros(pose: Pose) -> Self {
        FramedPose { pose, convention: Convention::Ros }
    }

    pub fn render(pose: Pose) -> Self {
        FramedPose { pose, convention: Convention::Render }
    }

    /// The same displacement expressed in the `target` convention.
    pub fn to(&self, target: Convention) -> FramedPose {
        let pose = match (self.convention, target) {
            (Convention::Ros, Convention::Render) => convert_frame(&self.pose, &ros_to_render()),
            (Convention::Render, Convention::Ros) => convert_frame(&self.pose, &render_to_ros()),
            _ => self.pose,
        };
        FramedPose { pose, convention: target }
    }
}

/// Rotation that re-expresses ROS (Z up) quantities in the render (Y up) convention.
/// ROS (x, y, z) becomes render (x, z, -y).
pub fn ros_to_render() -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::identity(),
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2),
    )
}

/// Inverse of [`ros_to_render`].
pub fn render_to_ros() -> Isometry3<f64> {
    ros_to_render().inverse()
}

/// Applies `delta` in the local frame of `base`.
pub fn compose(base: &Pose, delta: &Pose) -> Pose {
    renormalized(&(base * delta))
}

pub fn invert(pose: &Pose) -> Pose {
    pose.inverse()
}

/// Conjugates `pose` by the frame change: `frame * pose * frame⁻¹`.
pub fn convert_frame(pose: &Pose, frame_transform: &Isometry3<f64>) -> Pose {
    renormalized(&(frame_transform * pose * frame_transform.inverse()))
}

/// Absolute pose reached by displacing `initial` by `relative`: translations add up in the
/// outer frame, the relative rotation is pre-multiplied.
pub fn relative_to_absolute(relative: &Pose, initial: &Pose) -> Pose {
    Isometry3::from_parts(
        Translation3::from(initial.translation.vector + relative.translation.vector),
        UnitQuaternion::new_normalize((relative.rotation * initial.rotation).into_inner()),
    )
}

/// Inverse of [`relative_to_absolute`] for the same `initial` pose.
pub fn absolute_to_relative(absolute: &Pose, initial: &Pose) -> Pose {
    Isometry3::from_parts(
        Translation3::from(absolute.translation.vector - initial.translation.vector),
        UnitQuaternion::new_normalize((absolute.rotation * initial.rotation.inverse()).into_inner()),
    )
}

/// Euclidean distance between the positions of two poses.
pub fn position_distance(a: &Pose, b: &Pose) -> f64 {
    (a.translation.vector - b.translation.vector).norm()
}

/// Geodesic angle between the orientations of two poses, in [0, PI].
pub fn orientation_angle(a: &Pose, b: &Pose) -> f64 {
    a.rotation.angle_to(&b.rotation)
}

/// Pose with the rotation quaternion rescaled to unit length, countering drift accumulated
/// over many compositions.
pub fn renormalized(pose: &Pose) -> Pose {
    Isometry3::from_parts(
        pose.translation,
        UnitQuaternion::new_normalize(pose.rotation.into_inner()),
    )
}

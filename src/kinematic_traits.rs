//! Boundaries between the pose pipeline and the collaborators it drives: the
//! kinematic model of the arm, the external IK solver and the joint model that
//! receives the solved values.

extern crate nalgebra as na;

use na::{Isometry3, UnitQuaternion, Vector3};
use crate::error::TeleopError;

/// Pose is used a pose of the robot end effector. It contains both Cartesian position and
/// rotation quaternion.
/// ```
/// extern crate nalgebra as na;
/// use na::{Isometry3, Translation3, UnitQuaternion, Vector3};
///
/// type Pose = Isometry3<f64>;
///
/// let translation = Translation3::new(1.0, 0.0, 0.0);
/// // The quaternion should be normalized to represent a valid rotation.
/// let rotation = UnitQuaternion::from_quaternion(na::Quaternion::new(1.0, 0.0, 0.0, 1.0).normalize());
/// let transform = Pose::from_parts(translation, rotation);
/// ```
pub type Pose = Isometry3<f64>;

/// Six rotary joints of the reference arm, in radians.
pub type Joints = [f64; 6];

/// Joint values as returned by the IK solver: one value per entry of `joint_ordering`.
pub type JointValues = Vec<f64>;

pub const JOINTS_AT_ZERO: Joints = [0.0; 6];

/// Forward kinematics of a serial arm.
pub trait Kinematics: Send + Sync {
    fn forward(&self, qs: &Joints) -> Pose;
}

/// External numerical IK solver. The goal is relative to the pose the solver was
/// configured with, expressed in the solver (ROS, Z-up) frame.
pub trait IkSolver: Send {
    /// Solve for the goal `position` and `quaternion` given as `[w, x, y, z]`.
    /// Returns joint values aligned with the configured joint ordering.
    fn solve(&mut self, position: &Vector3<f64>, quaternion: [f64; 4]) -> Result<JointValues, TeleopError>;

    /// Forget any internal state (warm start, history) and optionally seed it with
    /// previously reached goals.
    fn reset(&mut self, previous_goals: &[Pose]);
}

/// Joint type as reported by the robot description. Only movable, non-mimic joints are
/// driven by the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointType {
    Revolute,
    Continuous,
    Prismatic,
    Fixed,
    Mimic,
}

impl JointType {
    pub fn is_controllable(&self) -> bool {
        !matches!(self, JointType::Fixed | JointType::Mimic)
    }
}

/// Externally owned joint/robot model. The control loop writes into it but does not own it.
pub trait JointModel: Send {
    /// Current end effector pose in the render (Y-up) frame.
    fn end_effector_pose(&self) -> Pose;

    /// Sets the value of the named joint. Returns false if there is no such joint.
    fn set_joint_value(&mut self, name: &str, value: f64) -> bool;

    fn joint_value(&self, name: &str) -> Option<f64>;

    /// All joints with their types, in model order.
    fn joints(&self) -> Vec<(String, JointType)>;
}

/// Quaternion in `[w, x, y, z]` order, as the solver boundary expects it.
pub fn quaternion_wxyz(q: &UnitQuaternion<f64>) -> [f64; 4] {
    [q.w, q.i, q.j, q.k]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_and_mimic_not_controllable() {
        assert!(JointType::Revolute.is_controllable());
        assert!(JointType::Continuous.is_controllable());
        assert!(JointType::Prismatic.is_controllable());
        assert!(!JointType::Fixed.is_controllable());
        assert!(!JointType::Mimic.is_controllable());
    }

    #[test]
    fn test_quaternion_order() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2);
        let wxyz = quaternion_wxyz(&q);
        assert!((wxyz[0] - q.quaternion().w).abs() < 1e-12);
        assert!((wxyz[3] - q.quaternion().k).abs() < 1e-12);
        assert!(wxyz[1].abs() < 1e-12 && wxyz[2].abs() < 1e-12);
    }
}

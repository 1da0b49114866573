//! Helper functions

use nalgebra::Vector6;
use crate::kinematic_traits::{Joints, Pose};

/// Checks if all elements in the array are finite
pub fn is_valid(qs: &Joints) -> bool {
    qs.iter().all(|&q| q.is_finite())
}

pub(crate) fn vector6_to_joints(v: Vector6<f64>) -> Joints {
    [v[0], v[1], v[2], v[3], v[4], v[5]]
}

/// Format joint values, converting radians to degrees.
pub fn format_joints(joints: &[f64]) -> String {
    let row: Vec<String> = joints.iter().map(|q| format!("{:5.2}", q.to_degrees())).collect();
    format!("[{}]", row.join(" "))
}

/// Format the pose as position in meters and orientation as roll, pitch, yaw in degrees.
pub fn format_pose(pose: &Pose) -> String {
    let t = pose.translation.vector;
    let (roll, pitch, yaw) = pose.rotation.euler_angles();
    format!("[{:.4}, {:.4}, {:.4}] rpy [{:.1}, {:.1}, {:.1}]",
            t.x, t.y, t.z, roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
}

/// formatting for YAML output
pub(crate) fn deg(x: &f64) -> String {
    if *x == 0.0 {
        return "0".to_string();
    }
    format!("deg({:.4})", x.to_degrees())
}

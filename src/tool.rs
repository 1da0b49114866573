//! Provides tool and base for the simulated arm.
//! Both Tool and Base take arbitrary implementation of Kinematics and are such
//! implementations themselves. Hence, they can be cascaded: the arm standing on a pedestal,
//! holding a pen whose tip is the end effector the goal is about:
//! ```
//! use std::sync::Arc;
//! use nalgebra::Isometry3;
//! use rs_xr_teleop::kinematic_traits::{Joints, Kinematics, Pose};
//! use rs_xr_teleop::kinematics_impl::OPWKinematics;
//! use rs_xr_teleop::parameters::opw_kinematics::Parameters;
//! use rs_xr_teleop::tool::{Base, Tool};
//!
//! let arm = OPWKinematics::new(Parameters::staubli_tx2_140());
//!
//! // Half meter high pedestal
//! let on_pedestal = Base {
//!   robot: Arc::new(arm),
//!   base: Isometry3::translation(0.0, 0.0, 0.5),
//! };
//!
//! // Pen sticking out 12 cm along the flange axis
//! let with_pen = Tool {
//!   robot: Arc::new(on_pedestal),
//!   tool: Isometry3::translation(0.0, 0.0, 0.12),
//! };
//!
//! let joints: Joints = [0.0, 0.1, 0.2, 0.3, 0.0, 0.5];
//! let tip: Pose = with_pen.forward(&joints);
//! println!("The pen tip is at: {:?}", tip);
//! ```

extern crate nalgebra as na;

use std::sync::Arc;
use na::Isometry3;
use crate::kinematic_traits::{Joints, Kinematics, Pose};

/// Fixed tool attached to the flange. The pose of the Tool is the pose of the tool center
/// point, not of the flange.
#[derive(Clone)]
pub struct Tool {
    pub robot: Arc<dyn Kinematics>,

    /// Transformation from the flange to the tool center point.
    pub tool: Isometry3<f64>,
}

/// Fixed base the arm is installed on, possibly rotated (arms may hang upside down or be
/// installed at an angle).
#[derive(Clone)]
pub struct Base {
    pub robot: Arc<dyn Kinematics>,

    /// Transformation from the world origin to the arm base.
    pub base: Isometry3<f64>,
}

impl Kinematics for Tool {
    fn forward(&self, qs: &Joints) -> Pose {
        self.robot.forward(qs) * self.tool
    }
}

impl Kinematics for Base {
    fn forward(&self, joints: &Joints) -> Pose {
        self.base * self.robot.forward(joints)
    }
}

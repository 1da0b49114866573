//! Simulated robot model the control loop drives when no external model is attached.
//!
//! The arm itself is an OPW manipulator, optionally on a base and with a tool. Around its six
//! revolute joints the model may carry fixed joints (flange adapters) and a gripper with a
//! driven finger and a mimic finger, so that it exposes the same mix of joint types as a
//! robot loaded from its description.

use std::sync::Arc;
use nalgebra::Isometry3;
use tracing::trace;

use crate::frame::ros_to_render;
use crate::kinematic_traits::{JointModel, JointType, Joints, Kinematics, Pose};
use crate::kinematics_impl::OPWKinematics;
use crate::parameters::opw_kinematics::Parameters;
use crate::tool::{Base, Tool};

#[derive(Debug, Clone)]
struct SimulatedJoint {
    name: String,
    joint_type: JointType,
    value: f64,
    /// Index of the joint this one follows, and the multiplier.
    mimics: Option<(usize, f64)>,
}

pub struct SimulatedArm {
    joints: Vec<SimulatedJoint>,
    /// Indices into `joints` of the six arm joints, in kinematic order.
    arm: [usize; 6],
    kinematics: Arc<dyn Kinematics>,
}

impl SimulatedArm {
    /// Bare arm with joints named `joint_1` to `joint_6`.
    pub fn new(parameters: Parameters) -> Self {
        Self::with_kinematics(Arc::new(OPWKinematics::new(parameters)),
                              std::array::from_fn(|i| format!("joint_{}", i + 1)))
    }

    /// Arm on `base` holding `tool`. The end effector is the tool center point.
    pub fn mounted(parameters: Parameters, base: Isometry3<f64>, tool: Isometry3<f64>) -> Self {
        let on_base = Base {
            robot: Arc::new(OPWKinematics::new(parameters)),
            base,
        };
        let with_tool = Tool {
            robot: Arc::new(on_base),
            tool,
        };
        Self::with_kinematics(Arc::new(with_tool), std::array::from_fn(|i| format!("joint_{}", i + 1)))
    }

    pub fn with_kinematics(kinematics: Arc<dyn Kinematics>, arm_joints: [String; 6]) -> Self {
        let joints = arm_joints.into_iter().map(|name| SimulatedJoint {
            name,
            joint_type: JointType::Revolute,
            value: 0.0,
            mimics: None,
        }).collect();
        SimulatedArm {
            joints,
            arm: [0, 1, 2, 3, 4, 5],
            kinematics,
        }
    }

    /// Adds a fixed joint, that cannot be set.
    pub fn with_fixed_joint(mut self, name: &str) -> Self {
        self.joints.push(SimulatedJoint {
            name: name.to_string(),
            joint_type: JointType::Fixed,
            value: 0.0,
            mimics: None,
        });
        self
    }

    /// Adds a prismatic gripper finger and a second finger mirroring it.
    pub fn with_gripper(mut self, finger: &str, mirrored_finger: &str, multiplier: f64) -> Self {
        let driven = self.joints.len();
        self.joints.push(SimulatedJoint {
            name: finger.to_string(),
            joint_type: JointType::Prismatic,
            value: 0.0,
            mimics: None,
        });
        self.joints.push(SimulatedJoint {
            name: mirrored_finger.to_string(),
            joint_type: JointType::Mimic,
            value: 0.0,
            mimics: Some((driven, multiplier)),
        });
        self
    }

    /// Kinematics of the arm in the ROS convention, as the solver needs it.
    pub fn kinematics(&self) -> Arc<dyn Kinematics> {
        self.kinematics.clone()
    }

    /// Names of the six arm joints in kinematic order.
    pub fn arm_joint_names(&self) -> [String; 6] {
        std::array::from_fn(|i| self.joints[self.arm[i]].name.clone())
    }

    pub fn arm_joints(&self) -> Joints {
        std::array::from_fn(|i| self.joints[self.arm[i]].value)
    }

    /// End effector in the ROS convention.
    pub fn ros_pose(&self) -> Pose {
        self.kinematics.forward(&self.arm_joints())
    }
}

impl JointModel for SimulatedArm {
    fn end_effector_pose(&self) -> Pose {
        ros_to_render() * self.ros_pose()
    }

    fn set_joint_value(&mut self, name: &str, value: f64) -> bool {
        let Some(index) = self.joints.iter().position(|j| j.name == name) else {
            return false;
        };
        if !self.joints[index].joint_type.is_controllable() {
            trace!("Joint {} is not driven directly", name);
            return false;
        }
        self.joints[index].value = value;
        for joint in self.joints.iter_mut() {
            if let Some((master, multiplier)) = joint.mimics {
                if master == index {
                    joint.value = value * multiplier;
                }
            }
        }
        true
    }

    fn joint_value(&self, name: &str) -> Option<f64> {
        self.joints.iter().find(|j| j.name == name).map(|j| j.value)
    }

    fn joints(&self) -> Vec<(String, JointType)> {
        self.joints.iter().map(|j| (j.name.clone(), j.joint_type)).collect()
    }
}

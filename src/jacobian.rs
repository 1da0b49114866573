//! Numerical Jacobian of the simulated arm and the reference IK solver built on it.
//!
//! The solver iterates damped least squares steps from the last solution towards the goal.
//! It is no match for a dedicated solver, but is good enough to close the loop in tests and
//! in the demo, and it behaves the same way at the boundary: a goal relative to the pose at
//! the starting configuration goes in, one value per configured joint comes out.

extern crate nalgebra as na;

use std::sync::Arc;
use na::{Matrix6, Vector3, Vector6, UnitQuaternion, Isometry3, Translation3, Quaternion};
use na::linalg::SVD;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::config::{RobotInfo, SolverConfig};
use crate::error::TeleopError;
use crate::frame::relative_to_absolute;
use crate::kinematic_traits::{IkSolver, JointValues, Joints, Kinematics, Pose};
use crate::utils::{is_valid, vector6_to_joints};

/// Perturbation used for numerical differentiation.
const DIFFERENTIATION_STEP: f64 = 1e-6;

/// Struct representing the Jacobian matrix
pub struct Jacobian {
    /// Maps joint velocities to end effector velocities. Each column corresponds to a joint,
    /// the rows to linear (first three) and angular (last three) velocity.
    matrix: Matrix6<f64>,

    /// The disturbance value used for computing the Jacobian
    epsilon: f64,
}

impl Jacobian {
    /// Computes the Jacobian matrix for the given robot and joint configuration.
    pub fn new<K: Kinematics + ?Sized>(robot: &K, qs: &Joints, epsilon: f64) -> Self {
        let matrix = compute_jacobian(robot, qs, epsilon);
        Self { matrix, epsilon }
    }

    pub fn matrix(&self) -> &Matrix6<f64> {
        &self.matrix
    }

    /// Joint velocities that achieve the desired end effector velocity (linear, then angular).
    /// Uses the inverse of the Jacobian, or the pseudoinverse when it is singular.
    pub fn velocities_from_vector(&self, desired_end_effector_velocity: &Vector6<f64>) -> Result<Joints, &'static str> {
        let joint_velocities = match self.matrix.try_inverse() {
            Some(jacobian_inverse) => jacobian_inverse * desired_end_effector_velocity,
            None => {
                let svd = SVD::new(self.matrix, true, true);
                let jacobian_pseudoinverse = svd.pseudo_inverse(self.epsilon)
                    .map_err(|_| "Unable to compute the pseudoinverse of the Jacobian matrix")?;
                jacobian_pseudoinverse * desired_end_effector_velocity
            }
        };
        Ok(vector6_to_joints(joint_velocities))
    }

    /// Damped least squares step `Jᵀ (J Jᵀ + λ² I)⁻¹ e`. Stays bounded near singularities,
    /// where the plain inverse explodes.
    pub fn damped_step(&self, error: &Vector6<f64>, damping: f64) -> Result<Joints, &'static str> {
        let j = &self.matrix;
        let regularized = j * j.transpose() + Matrix6::identity() * (damping * damping);
        let inverse = regularized.try_inverse()
            .ok_or("Damped Jacobian product is not invertible")?;
        Ok(vector6_to_joints(j.transpose() * inverse * error))
    }
}

/// Computes the Jacobian matrix for a given robot and joint configuration by perturbing
/// each joint by `epsilon`. Columns are evaluated in parallel.
pub fn compute_jacobian<K: Kinematics + ?Sized>(robot: &K, joints: &Joints, epsilon: f64) -> Matrix6<f64> {
    let mut jacobian = Matrix6::zeros();
    let current_pose = robot.forward(joints);
    let current_position = current_pose.translation.vector;
    let current_orientation = current_pose.rotation;

    let jacobian_columns: Vec<_> = (0..6).into_par_iter().map(|i| {
        let mut perturbed_qs = *joints;
        perturbed_qs[i] += epsilon;
        let perturbed_pose = robot.forward(&perturbed_qs);

        let delta_position = (perturbed_pose.translation.vector - current_position) / epsilon;
        let delta_orientation = (perturbed_pose.rotation * current_orientation.inverse()).scaled_axis() / epsilon;

        (delta_position, delta_orientation)
    }).collect();

    for (i, (delta_position, delta_orientation)) in jacobian_columns.into_iter().enumerate() {
        jacobian.fixed_view_mut::<3, 1>(0, i).copy_from(&delta_position);
        jacobian.fixed_view_mut::<3, 1>(3, i).copy_from(&delta_orientation);
    }

    jacobian
}

/// Position and orientation error from `pose` to `target`, as a 6D twist.
fn pose_error(pose: &Pose, target: &Pose) -> Vector6<f64> {
    let dp = target.translation.vector - pose.translation.vector;
    let dr = (target.rotation * pose.rotation.inverse()).scaled_axis();
    Vector6::new(dp.x, dp.y, dp.z, dr.x, dr.y, dr.z)
}

/// Reference [`IkSolver`] for an arm with six joints, working in the arm (ROS) frame.
pub struct JacobianSolver {
    robot: Arc<dyn Kinematics>,
    config: SolverConfig,

    /// For each entry of `joint_ordering`, the arm joint it names, if any.
    mapping: Vec<Option<usize>>,
    /// Values returned for entries that are not arm joints.
    passive: Vec<f64>,

    initial_joints: Joints,
    initial_pose: Pose,
    current: Joints,
}

impl JacobianSolver {
    /// `arm_joints` names the six joints `robot` is parameterized by, in order. The solver
    /// starts from `robot_info.starting_config`, the relative goals it receives are
    /// displacements from the pose there.
    pub fn new(robot: Arc<dyn Kinematics>, arm_joints: &[String; 6], robot_info: &RobotInfo,
               config: SolverConfig) -> Result<Self, TeleopError> {
        robot_info.validate()?;
        let mapping: Vec<Option<usize>> = robot_info.joint_ordering.iter()
            .map(|name| arm_joints.iter().position(|j| j == name))
            .collect();
        let missing: Vec<&String> = arm_joints.iter()
            .filter(|j| !robot_info.joint_ordering.contains(j))
            .collect();
        if !missing.is_empty() {
            return Err(TeleopError::Config(format!(
                "joint_ordering does not list the arm joints {:?}", missing)));
        }

        let mut initial_joints = [0.0; 6];
        for (index, arm_joint) in mapping.iter().enumerate() {
            if let Some(arm_joint) = arm_joint {
                initial_joints[*arm_joint] = robot_info.starting_value(index);
            }
        }
        let passive = (0..mapping.len()).map(|i| robot_info.starting_value(i)).collect();
        let initial_pose = robot.forward(&initial_joints);
        debug!("Solver reference pose {:?}", initial_pose.translation.vector);

        Ok(JacobianSolver {
            robot,
            config,
            mapping,
            passive,
            initial_joints,
            initial_pose,
            current: initial_joints,
        })
    }

    /// Arm pose at the starting configuration, the reference of the relative goals.
    pub fn initial_pose(&self) -> Pose {
        self.initial_pose
    }

    /// Last solution.
    pub fn current(&self) -> Joints {
        self.current
    }

    /// Iterates from the last solution towards `target` (absolute, arm frame). Returns the
    /// joints reached and whether the tolerance was met.
    pub fn solve_absolute(&mut self, target: &Pose) -> Result<(Joints, bool), TeleopError> {
        let mut qs = self.current;
        let mut converged = false;
        for iteration in 0..self.config.max_iterations {
            let pose = self.robot.forward(&qs);
            let error = pose_error(&pose, target);
            if error.fixed_rows::<3>(0).norm() < self.config.tolerance
                && error.fixed_rows::<3>(3).norm() < self.config.tolerance {
                trace!("Converged after {} iterations", iteration);
                converged = true;
                break;
            }
            let jacobian = Jacobian::new(self.robot.as_ref(), &qs, DIFFERENTIATION_STEP);
            let step = if self.config.damping > 0.0 {
                jacobian.damped_step(&error, self.config.damping)
            } else {
                jacobian.velocities_from_vector(&error)
            }.map_err(|e| TeleopError::Solver(e.to_string()))?;
            for (q, dq) in qs.iter_mut().zip(step.iter()) {
                *q += dq;
            }
        }
        if !is_valid(&qs) {
            return Err(TeleopError::Solver("solution is not finite".to_string()));
        }
        self.current = qs;
        Ok((qs, converged))
    }
}

impl IkSolver for JacobianSolver {
    fn solve(&mut self, position: &Vector3<f64>, quaternion: [f64; 4]) -> Result<JointValues, TeleopError> {
        let [w, x, y, z] = quaternion;
        let relative = Isometry3::from_parts(
            Translation3::from(*position),
            UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)),
        );
        let target = relative_to_absolute(&relative, &self.initial_pose);
        let (qs, converged) = self.solve_absolute(&target)?;
        if !converged {
            trace!("Goal not reached, returning the closest configuration");
        }
        Ok(self.mapping.iter().zip(self.passive.iter())
            .map(|(arm_joint, passive)| arm_joint.map_or(*passive, |j| qs[j]))
            .collect())
    }

    fn reset(&mut self, _previous_goals: &[Pose]) {
        debug!("Solver reset to the starting configuration");
        self.current = self.initial_joints;
    }
}

//! Session configuration: robot info consumed by the solver, input sensitivities,
//! loop timing. Every section is optional in YAML and defaults to the values the
//! teleoperation front end has been tuned with, except `robot_info.joint_ordering` that
//! must be provided.

use serde::Deserialize;
use std::time::Duration;

use crate::error::TeleopError;

/// Robot description as consumed by the IK solver. The list order of `joint_ordering` is the
/// order of values returned by the solver.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RobotInfo {
    pub joint_ordering: Vec<String>,

    /// Initial joint values, aligned with `joint_ordering`. Empty means all zero.
    pub starting_config: Vec<f64>,

    /// Fixed joints leading to the end effector link, informational only.
    pub ee_fixed_joints: Vec<String>,
}

impl RobotInfo {
    pub fn new(joint_ordering: &[&str], starting_config: &[f64]) -> Self {
        RobotInfo {
            joint_ordering: joint_ordering.iter().map(|s| s.to_string()).collect(),
            starting_config: starting_config.to_vec(),
            ee_fixed_joints: Vec::new(),
        }
    }

    /// Index of the joint in the solver output.
    pub fn index_of(&self, joint: &str) -> Option<usize> {
        self.joint_ordering.iter().position(|j| j == joint)
    }

    /// Starting value of the joint at `index`.
    pub fn starting_value(&self, index: usize) -> f64 {
        self.starting_config.get(index).copied().unwrap_or(0.0)
    }

    pub fn validate(&self) -> Result<(), TeleopError> {
        if self.joint_ordering.is_empty() {
            return Err(TeleopError::Config(
                "robot_info.joint_ordering is empty, the solver is not configured".to_string()));
        }
        if !self.starting_config.is_empty() && self.starting_config.len() != self.joint_ordering.len() {
            return Err(TeleopError::JointCount {
                expected: self.joint_ordering.len(),
                found: self.starting_config.len(),
            });
        }
        if let Some(bad) = self.starting_config.iter().find(|v| !v.is_finite()) {
            return Err(TeleopError::Config(format!("starting_config must be finite (got {})", bad)));
        }
        Ok(())
    }
}

/// Tuning of the reference Jacobian solver.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub damping: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            max_iterations: 50,
            tolerance: 1e-4,
            damping: 1e-3,
        }
    }
}

/// Mouse sensitivities. Translation scales are meters per pixel (or per wheel step),
/// rotation scales radians per pixel (or per wheel step).
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MouseConfig {
    pub move_trans_scale: f64,
    pub move_rot_scale: f64,
    pub wheel_trans_scale: f64,
    pub wheel_rot_scale: f64,
}

impl Default for MouseConfig {
    fn default() -> Self {
        MouseConfig {
            move_trans_scale: 1e-4,
            move_rot_scale: 3e-4,
            wheel_trans_scale: 3e-2,
            wheel_rot_scale: 3e-2,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub poll_period_ms: u64,

    /// Multiplier from controller meters to goal meters.
    pub distance_scale: f64,

    /// If true, the frame-to-frame rotation is sent, otherwise the raw controller orientation.
    pub relative_rotation: bool,

    /// For each ROS goal axis (x, y, z), the component of the render frame controller delta
    /// feeding it.
    pub axis_map: [usize; 3],
    pub axis_signs: [f64; 3],

    /// Squeezes and touchpad presses closer than this are a double tap.
    pub double_tap_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            poll_period_ms: 5,
            distance_scale: 1.0,
            relative_rotation: true,
            axis_map: [2, 0, 1],
            axis_signs: [1.0, 1.0, 1.0],
            double_tap_ms: 300,
        }
    }
}

impl ControllerConfig {
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }

    pub fn double_tap(&self) -> Duration {
        Duration::from_millis(self.double_tap_ms)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ControlLoopConfig {
    pub period_ms: u64,
    pub distance_threshold: f64,
    pub angle_threshold: f64,
    pub stats_capacity: usize,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        ControlLoopConfig {
            period_ms: 5,
            distance_threshold: 1e-3,
            angle_threshold: 1e-3,
            stats_capacity: 200,
        }
    }
}

impl ControlLoopConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeleopConfig {
    pub robot_info: RobotInfo,
    pub solver: SolverConfig,
    pub mouse: MouseConfig,
    pub controller: ControllerConfig,
    pub control_loop: ControlLoopConfig,
}

impl TeleopConfig {
    /// Configuration with default tuning for the given robot.
    pub fn for_robot(robot_info: RobotInfo) -> Self {
        TeleopConfig { robot_info, ..Default::default() }
    }

    pub fn validate(&self) -> Result<(), TeleopError> {
        self.robot_info.validate()?;
        if self.control_loop.period_ms == 0 || self.controller.poll_period_ms == 0 {
            return Err(TeleopError::Config("loop and poll periods must be positive".to_string()));
        }
        if self.control_loop.stats_capacity == 0 {
            return Err(TeleopError::Config("stats_capacity must be positive".to_string()));
        }
        if let Some(axis) = self.controller.axis_map.iter().find(|&&a| a > 2) {
            return Err(TeleopError::Config(format!("axis_map entries must be 0, 1 or 2 (got {})", axis)));
        }
        if !self.controller.distance_scale.is_finite() {
            return Err(TeleopError::Config("distance_scale must be finite".to_string()));
        }
        Ok(())
    }
}

#[cfg(feature = "allow_filesystem")]
mod yaml {
    use std::io::ErrorKind;
    use std::path::Path;

    use super::TeleopConfig;
    use crate::error::TeleopError;

    impl TeleopConfig {
        /// Read the session configuration from YAML file. YAML file like this is supported:
        /// ```yaml
        /// robot_info:
        ///   joint_ordering: [joint_1, joint_2, joint_3, joint_4, joint_5, joint_6]
        ///   starting_config: [0.0, 0.3, -0.2, 0.0, 0.5, 0.0]
        /// mouse:
        ///   move_trans_scale: 2.0e-4
        /// control_loop:
        ///   period_ms: 10
        /// ```
        /// Only `robot_info.joint_ordering` is mandatory. A missing file is reported as
        /// a missing resource, as the session cannot start without it.
        pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, TeleopError> {
            let path = path.as_ref();
            let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
                ErrorKind::NotFound => TeleopError::MissingResource {
                    resource: "solver configuration".to_string(),
                    path: path.display().to_string(),
                },
                _ => TeleopError::Io(e),
            })?;
            Self::from_yaml_str(&contents)
        }

        pub fn from_yaml_str(contents: &str) -> Result<Self, TeleopError> {
            let config: TeleopConfig = serde_saphyr::from_str(contents)
                .map_err(|e| TeleopError::Parse(format!("{}", e)))?;
            config.validate()?;
            Ok(config)
        }
    }
}

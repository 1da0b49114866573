//! Fixed-period control loop turning the accumulated goal into joint values.
//!
//! Every tick the relative goal is snapshotted, moved to the render convention and made
//! absolute against the end effector pose captured at session start. If the robot is not
//! already there, the solver is asked for joint values, which are applied to every movable
//! joint that the solver knows about.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{ControlLoopConfig, RobotInfo};
use crate::error::TeleopError;
use crate::frame::{orientation_angle, position_distance, relative_to_absolute, Convention, FramedPose};
use crate::goal::GoalHandle;
use crate::kinematic_traits::{quaternion_wxyz, IkSolver, JointModel, Pose};
use crate::periodic::PeriodicTask;
use crate::statistics::{TimingSamples, WindowReport};
use crate::ui::SharedUi;

pub type SharedJointModel = Arc<Mutex<dyn JointModel>>;

/// Moves every movable joint listed in `joint_ordering` to its starting value. Returns the
/// number of joints set.
pub fn apply_starting_config(model: &mut dyn JointModel, robot_info: &RobotInfo, ui: &SharedUi) -> usize {
    let mut applied = 0;
    for (name, joint_type) in model.joints() {
        if !joint_type.is_controllable() {
            continue;
        }
        if let Some(index) = robot_info.index_of(&name) {
            let value = robot_info.starting_value(index);
            if model.set_joint_value(&name, value) {
                ui.lock().joint_value(&name, value);
                applied += 1;
            }
        }
    }
    applied
}

pub struct ControlLoop {
    goal: GoalHandle,
    solver: Box<dyn IkSolver>,
    model: SharedJointModel,
    robot_info: RobotInfo,
    config: ControlLoopConfig,
    ui: SharedUi,

    /// End effector pose (render convention) the relative goal is measured from.
    initial_ee: Pose,
    seen_reset_epoch: u64,

    timing: TimingSamples,
    last_report: Option<WindowReport>,
    previous_tick: Option<Instant>,
    ticks: u64,
    solves: u64,
}

impl ControlLoop {
    /// Captures the current end effector pose as the reference of the relative goal. Fails
    /// if the solver configuration is unusable: the loop must not start without it.
    pub fn new(goal: GoalHandle, solver: Box<dyn IkSolver>, model: SharedJointModel,
               robot_info: RobotInfo, config: ControlLoopConfig, ui: SharedUi) -> Result<Self, TeleopError> {
        robot_info.validate()?;
        if config.stats_capacity == 0 {
            return Err(TeleopError::Config("stats_capacity must be positive".to_string()));
        }
        let initial_ee = model.lock().end_effector_pose();
        let seen_reset_epoch = goal.snapshot().reset_epoch;
        Ok(ControlLoop {
            goal,
            solver,
            model,
            robot_info,
            config,
            ui,
            initial_ee,
            seen_reset_epoch,
            timing: TimingSamples::new(config.stats_capacity),
            last_report: None,
            previous_tick: None,
            ticks: 0,
            solves: 0,
        })
    }

    pub fn initial_ee(&self) -> Pose {
        self.initial_ee
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn solves(&self) -> u64 {
        self.solves
    }

    /// Summary of the last completed timing window.
    pub fn last_report(&self) -> Option<WindowReport> {
        self.last_report
    }

    pub fn model(&self) -> &SharedJointModel {
        &self.model
    }

    /// Absolute target pose (render convention) for the current goal.
    pub fn target(&self) -> Pose {
        let relative = FramedPose::ros(self.goal.snapshot().pose()).to(Convention::Render);
        relative_to_absolute(&relative.pose, &self.initial_ee)
    }

    /// One control period. Returns true if the solver ran and joint values were applied,
    /// false if the robot was already at the target.
    pub fn tick(&mut self) -> Result<bool, TeleopError> {
        let now = Instant::now();
        if let Some(previous) = self.previous_tick {
            self.timing.record_tick_interval(now - previous);
        }
        self.previous_tick = Some(now);
        self.ticks += 1;

        let goal = self.goal.snapshot();
        if goal.reset_epoch != self.seen_reset_epoch {
            debug!("Goal reset, resetting the solver");
            self.solver.reset(&[]);
            self.seen_reset_epoch = goal.reset_epoch;
        }

        let relative = FramedPose::ros(goal.pose()).to(Convention::Render);
        let target = relative_to_absolute(&relative.pose, &self.initial_ee);
        self.ui.lock().goal_marker(&target);

        let current = self.model.lock().end_effector_pose();
        let distance = position_distance(&current, &target);
        let angle = orientation_angle(&current, &target);
        if distance <= self.config.distance_threshold && angle <= self.config.angle_threshold {
            return Ok(false);
        }

        let started = Instant::now();
        let values = self.solver.solve(&goal.position, quaternion_wxyz(&goal.orientation))?;
        self.record_solve(started.elapsed());
        self.solves += 1;

        if values.len() != self.robot_info.joint_ordering.len() {
            return Err(TeleopError::JointCount {
                expected: self.robot_info.joint_ordering.len(),
                found: values.len(),
            });
        }
        self.apply(&values);
        Ok(true)
    }

    fn apply(&mut self, values: &[f64]) {
        let mut model = self.model.lock();
        let mut ui = self.ui.lock();
        for (name, joint_type) in model.joints() {
            if !joint_type.is_controllable() {
                continue;
            }
            // Joints the solver does not know about are left alone
            let Some(index) = self.robot_info.index_of(&name) else {
                continue;
            };
            if model.set_joint_value(&name, values[index]) {
                ui.joint_value(&name, values[index]);
            }
        }
    }

    fn record_solve(&mut self, duration: Duration) {
        if let Some(report) = self.timing.record_solver_duration(duration) {
            if let Some(ticks) = &report.tick_intervals {
                info!("Tick interval over the last {} ticks: {}", ticks.samples, ticks);
            }
            if let Some(solver) = &report.solver_durations {
                info!("Solver time over the last {} solves: {}", solver.samples, solver);
            }
            self.last_report = Some(report);
        }
    }
}

/// Runs the loop every `period` on its own thread. `after_tick` receives the loop and
/// whether the robot moved. A tick still in progress when the next one is due (e.g. driven
/// from another thread) makes that one skip rather than wait. Failed ticks are logged and
/// the loop keeps running.
pub fn spawn_control_task<F>(control: Arc<Mutex<ControlLoop>>, period: Duration, mut after_tick: F)
    -> io::Result<PeriodicTask>
where
    F: FnMut(&ControlLoop, bool) + Send + 'static,
{
    PeriodicTask::spawn("control-loop", period, move || {
        let Some(mut control) = control.try_lock() else {
            debug!("Previous tick still running, skipping");
            return;
        };
        match control.tick() {
            Ok(updated) => after_tick(&control, updated),
            Err(e) => warn!("Control loop tick failed: {}", e),
        }
    })
}

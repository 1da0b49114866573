//! One teleoperation session: the goal, both input samplers, the tool arsenal, the control
//! loop and the task, wired together and torn down together.
//!
//! Swapping the robot means shutting the session down and building a new one: the goal, the
//! timing samples and the initial end effector pose all belong to the robot they were
//! captured for.

use std::sync::Arc;

use nalgebra::Isometry3;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::arsenal::{Arsenal, Grip, ModelGrip};
use crate::config::TeleopConfig;
use crate::control_loop::{apply_starting_config, spawn_control_task, ControlLoop, SharedJointModel};
use crate::controller::{ControllerSampler, GamepadDirection, GoalFeed, Polling, PoseSource, SharedMoveSink, SqueezeAction};
use crate::error::TeleopError;
use crate::goal::GoalHandle;
use crate::jacobian::JacobianSolver;
use crate::kinematic_traits::{IkSolver, Pose};
use crate::mouse::MouseSampler;
use crate::parameters::opw_kinematics::Parameters;
use crate::periodic::PeriodicTask;
use crate::simulated_arm::SimulatedArm;
use crate::task::TaskControl;
use crate::ui::SharedUi;

/// Where the session moves on a touchpad press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchpadAction {
    PreviousTool,
    NextTool,
    FinishRound,
    Reground,
    None,
}

impl From<GamepadDirection> for TouchpadAction {
    fn from(direction: GamepadDirection) -> Self {
        match direction {
            GamepadDirection::Left => TouchpadAction::PreviousTool,
            GamepadDirection::Right => TouchpadAction::NextTool,
            GamepadDirection::Backward => TouchpadAction::FinishRound,
            GamepadDirection::Forward => TouchpadAction::Reground,
            GamepadDirection::Center => TouchpadAction::None,
        }
    }
}

pub struct TeleopSession {
    config: TeleopConfig,
    goal: GoalHandle,
    ui: SharedUi,
    mouse: MouseSampler,
    controller: ControllerSampler,
    arsenal: Arc<Mutex<Arsenal>>,
    control: Arc<Mutex<ControlLoop>>,
    tasks: Arc<Mutex<TaskControl>>,
    control_task: Option<PeriodicTask>,
}

impl TeleopSession {
    /// Puts the model into the starting configuration, then captures its end effector pose as
    /// the reference of the goal. Fails, starting nothing, if the configuration is unusable.
    pub fn new(config: TeleopConfig, model: SharedJointModel, solver: Box<dyn IkSolver>,
               pose_source: Arc<dyn PoseSource>, ui: SharedUi, polling: Polling) -> Result<Self, TeleopError> {
        Self::with_grip(config, model, solver, pose_source, ui, polling, Box::new(ModelGrip::default()))
    }

    pub fn with_grip(config: TeleopConfig, model: SharedJointModel, solver: Box<dyn IkSolver>,
                     pose_source: Arc<dyn PoseSource>, ui: SharedUi, polling: Polling,
                     grip: Box<dyn Grip>) -> Result<Self, TeleopError> {
        config.validate()?;
        let applied = apply_starting_config(&mut *model.lock(), &config.robot_info, &ui);
        debug!("Starting configuration applied to {} joints", applied);

        let goal = GoalHandle::new();
        let control = ControlLoop::new(goal.clone(), solver, model, config.robot_info.clone(),
                                       config.control_loop, ui.clone())?;

        let mouse = MouseSampler::new(goal.clone(), config.mouse, ui.clone());
        let feed = GoalFeed::new(goal.clone(), config.controller);
        let arsenal = Arc::new(Mutex::new(
            Arsenal::new(grip, Box::new(feed), goal.clone(), ui.clone())));
        let sink: SharedMoveSink = arsenal.clone();
        let controller = ControllerSampler::new(goal.clone(), config.controller, pose_source,
                                                sink, ui.clone(), polling);

        info!("Session ready, {} joints", config.robot_info.joint_ordering.len());
        Ok(TeleopSession {
            config,
            goal,
            ui,
            mouse,
            controller,
            arsenal,
            control: Arc::new(Mutex::new(control)),
            tasks: Arc::new(Mutex::new(TaskControl::default())),
            control_task: None,
        })
    }

    /// Session driving a simulated OPW arm with the reference Jacobian solver. The arm joints
    /// are `joint_1` to `joint_6`, and must be listed in `robot_info.joint_ordering`.
    pub fn simulated(config: TeleopConfig, parameters: Parameters, base: Isometry3<f64>,
                     pose_source: Arc<dyn PoseSource>, ui: SharedUi, polling: Polling) -> Result<Self, TeleopError> {
        let arm = SimulatedArm::mounted(parameters, base, Isometry3::identity());
        let solver = JacobianSolver::new(arm.kinematics(), &arm.arm_joint_names(),
                                         &config.robot_info, config.solver)?;
        let model: SharedJointModel = Arc::new(Mutex::new(arm));
        Self::new(config, model, Box::new(solver), pose_source, ui, polling)
    }

    pub fn config(&self) -> &TeleopConfig {
        &self.config
    }

    pub fn goal(&self) -> &GoalHandle {
        &self.goal
    }

    pub fn ui(&self) -> &SharedUi {
        &self.ui
    }

    pub fn mouse(&mut self) -> &mut MouseSampler {
        &mut self.mouse
    }

    pub fn controller(&mut self) -> &mut ControllerSampler {
        &mut self.controller
    }

    pub fn arsenal(&self) -> &Arc<Mutex<Arsenal>> {
        &self.arsenal
    }

    pub fn control(&self) -> &Arc<Mutex<ControlLoop>> {
        &self.control
    }

    pub fn tasks(&self) -> &Arc<Mutex<TaskControl>> {
        &self.tasks
    }

    /// Current end effector pose, render convention.
    pub fn end_effector_pose(&self) -> Pose {
        self.control.lock().model().lock().end_effector_pose()
    }

    pub fn is_running(&self) -> bool {
        self.control_task.as_ref().is_some_and(|t| t.is_running())
    }

    /// One control period driven by the caller, followed by the task update. Not to be mixed
    /// with [`start`](Self::start): while the periodic runner holds the loop, this blocks.
    pub fn step(&mut self) -> Result<bool, TeleopError> {
        let (updated, ee) = {
            let mut control = self.control.lock();
            let updated = control.tick()?;
            let ee = control.model().lock().end_effector_pose();
            (updated, ee)
        };
        self.tasks.lock().update(&ee);
        Ok(updated)
    }

    /// Starts the control loop on its own thread. Does nothing if already running.
    pub fn start(&mut self) -> Result<(), TeleopError> {
        if self.is_running() {
            return Ok(());
        }
        let tasks = self.tasks.clone();
        let task = spawn_control_task(self.control.clone(), self.config.control_loop.period(),
                                      move |control, _updated| {
            let ee = control.model().lock().end_effector_pose();
            tasks.lock().update(&ee);
        })?;
        info!("Control loop started, period {:?}", task.period());
        self.control_task = Some(task);
        Ok(())
    }

    /// Stops the control loop and the controller polling. The goal is kept.
    pub fn stop(&mut self) {
        if let Some(task) = self.control_task.take() {
            task.stop();
            info!("Control loop stopped after {} periods", task.runs());
        }
        self.controller.disengage();
    }

    /// Trigger press, toggling the controller engagement. Disengaging with the tongs in the
    /// grip also opens them, dropping the brick the task holds. Returns the new engagement.
    pub fn on_select(&mut self) -> Result<bool, TeleopError> {
        let engaged = self.controller.on_select()?;
        if !engaged && self.arsenal.lock().current().grasps() {
            let placed = self.tasks.lock().release();
            debug!("Tongs opened, brick placed: {}", placed);
        }
        Ok(engaged)
    }

    pub fn on_squeeze(&mut self) -> SqueezeAction {
        self.controller.on_squeeze()
    }

    /// Per frame touchpad check. Returns what the press did, if the touchpad was pressed.
    pub fn update(&mut self, in_xr_session: bool) -> Option<TouchpadAction> {
        let direction = self.controller.update(in_xr_session)?;
        let action = TouchpadAction::from(direction);
        self.on_touchpad(action);
        Some(action)
    }

    pub fn on_touchpad(&mut self, action: TouchpadAction) {
        match action {
            TouchpadAction::PreviousTool => self.arsenal.lock().prev_tool(),
            TouchpadAction::NextTool => self.arsenal.lock().next_tool(),
            TouchpadAction::FinishRound => {
                let mut tasks = self.tasks.lock();
                tasks.finish_round();
                info!("Round {}", tasks.round());
            }
            TouchpadAction::Reground => info!("Reground requested"),
            TouchpadAction::None => info!("Touchpad pressed in the center"),
        }
    }

    /// Stops everything and leaves the tasks.
    pub fn shutdown(mut self) {
        self.stop();
        info!("Session closed");
    }
}

impl Drop for TeleopSession {
    fn drop(&mut self) {
        self.stop();
    }
}

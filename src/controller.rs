//! VR controller input.
//!
//! The trigger ("select") toggles engagement. While engaged, the controller world pose is
//! polled every few milliseconds and the difference from the previous sample is forwarded
//! to the move sink (normally the arsenal, which feeds the goal). Disengaging just stops
//! the polling: unlike losing the mouse pointer lock, the goal is kept.
//!
//! Besides the trigger, the squeeze button resets the goal (or toggles stereo when pressed
//! twice quickly) and the touchpad, when pressed, pauses control and reports the direction
//! it was pressed in.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bitflags::bitflags;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::error::TeleopError;
use crate::frame::{convert_frame, render_to_ros};
use crate::goal::{GoalHandle, InputSource};
use crate::kinematic_traits::Pose;
use crate::periodic::PeriodicTask;
use crate::ui::SharedUi;

/// World pose of the tracked controller grip, in the render convention. None while tracking
/// is lost.
pub trait PoseSource: Send + Sync {
    fn world_pose(&self) -> Option<Pose>;
}

/// Receiver of controller motion deltas.
pub trait ControllerMoveSink: Send {
    /// Returns true if the delta moved the goal.
    fn on_controller_move(&mut self, delta: &ControllerDelta) -> bool;
}

pub type SharedMoveSink = Arc<Mutex<dyn ControllerMoveSink>>;

bitflags! {
    /// Pressed buttons of the controller gamepad.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GamepadButtons: u32 {
        const TRIGGER  = 0b0001;
        const SQUEEZE  = 0b0010;
        const TOUCHPAD = 0b0100;
        const MENU     = 0b1000;
    }
}

/// Buttons and touchpad axes, as carried by the controller "connected" event and refreshed
/// on every frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GamepadSnapshot {
    pub buttons: GamepadButtons,
    /// Touchpad x (right positive) and y (down positive), both in [-1, 1].
    pub axes: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamepadDirection {
    Left,
    Right,
    Backward,
    Forward,
    Center,
}

impl GamepadSnapshot {
    pub fn new(buttons: GamepadButtons, x: f64, y: f64) -> Self {
        GamepadSnapshot { buttons, axes: [x, y] }
    }

    /// Where on the touchpad the thumb rests.
    pub fn direction(&self) -> GamepadDirection {
        let [x, y] = self.axes;
        if x < -0.7 && y.abs() < 0.4 {
            GamepadDirection::Left
        } else if x > 0.7 && y.abs() < 0.4 {
            GamepadDirection::Right
        } else if y > 0.7 && x.abs() < 0.4 {
            GamepadDirection::Backward
        } else if y < -0.7 && x.abs() < 0.4 {
            GamepadDirection::Forward
        } else {
            GamepadDirection::Center
        }
    }
}

/// Motion of the controller between two polls, render convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerDelta {
    /// Position difference, already multiplied by the distance scale.
    pub position: Vector3<f64>,

    /// Frame to frame rotation, or the raw orientation in absolute rotation mode.
    pub rotation: UnitQuaternion<f64>,
}

impl ControllerDelta {
    /// Computes the delta between two samples.
    pub fn between(previous: &Pose, current: &Pose, config: &ControllerConfig) -> Self {
        let position = (current.translation.vector - previous.translation.vector) * config.distance_scale;
        let rotation = if config.relative_rotation {
            UnitQuaternion::new_normalize((current.rotation * previous.rotation.inverse()).into_inner())
        } else {
            current.rotation
        };
        ControllerDelta { position, rotation }
    }

    /// Position step and rotation for the goal (ROS convention). The position is remapped
    /// component-wise by `axis_map` and `axis_signs`, the rotation is conjugated into the
    /// ROS frame.
    pub fn to_ros(&self, config: &ControllerConfig) -> (Vector3<f64>, UnitQuaternion<f64>) {
        let step = Vector3::from_fn(|i, _| config.axis_signs[i] * self.position[config.axis_map[i]]);
        let rotation = convert_frame(
            &Isometry3::from_parts(Translation3::identity(), self.rotation),
            &render_to_ros(),
        ).rotation;
        (step, rotation)
    }
}

/// Move sink that feeds controller deltas into the goal.
pub struct GoalFeed {
    goal: GoalHandle,
    config: ControllerConfig,
}

impl GoalFeed {
    pub fn new(goal: GoalHandle, config: ControllerConfig) -> Self {
        GoalFeed { goal, config }
    }
}

impl ControllerMoveSink for GoalFeed {
    fn on_controller_move(&mut self, delta: &ControllerDelta) -> bool {
        let (step, rotation) = delta.to_ros(&self.config);
        self.goal.accumulate(InputSource::Controller, &step, &rotation)
    }
}

/// How the engaged sampler is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polling {
    /// Own periodic thread at `poll_period_ms`.
    Periodic,
    /// Caller calls [`ControllerSampler::poll`].
    Manual,
}

/// What the squeeze button did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqueezeAction {
    Reset,
    Stereo(bool),
}

struct Poller {
    source: Arc<dyn PoseSource>,
    sink: SharedMoveSink,
    config: ControllerConfig,
    previous: Option<Pose>,
}

impl Poller {
    fn poll(&mut self) -> Option<ControllerDelta> {
        let current = self.source.world_pose()?;
        let delta = self.previous
            .as_ref()
            .map(|previous| ControllerDelta::between(previous, &current, &self.config));
        self.previous = Some(current);
        if let Some(delta) = &delta {
            self.sink.lock().on_controller_move(delta);
        }
        delta
    }
}

pub struct ControllerSampler {
    goal: GoalHandle,
    config: ControllerConfig,
    ui: SharedUi,
    polling: Polling,
    poller: Arc<Mutex<Poller>>,
    task: Option<PeriodicTask>,
    engaged: bool,
    gamepad: Option<GamepadSnapshot>,
    last_squeeze: Option<Instant>,
    last_touchpad: Option<Instant>,
    stereo: bool,
}

impl ControllerSampler {
    pub fn new(goal: GoalHandle, config: ControllerConfig, source: Arc<dyn PoseSource>,
               sink: SharedMoveSink, ui: SharedUi, polling: Polling) -> Self {
        let poller = Poller { source, sink, config, previous: None };
        ControllerSampler {
            goal,
            config,
            ui,
            polling,
            poller: Arc::new(Mutex::new(poller)),
            task: None,
            engaged: false,
            gamepad: None,
            last_squeeze: None,
            last_touchpad: None,
            stereo: false,
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn is_connected(&self) -> bool {
        self.gamepad.is_some()
    }

    pub fn stereo(&self) -> bool {
        self.stereo
    }

    /// Trigger press: engage if disengaged, disengage otherwise. Returns the new engagement.
    pub fn on_select(&mut self) -> Result<bool, TeleopError> {
        if self.engaged {
            self.disengage();
        } else {
            self.engage()?;
        }
        Ok(self.engaged)
    }

    fn engage(&mut self) -> Result<(), TeleopError> {
        self.goal.claim(InputSource::Controller)?;
        {
            let mut poller = self.poller.lock();
            poller.previous = poller.source.world_pose();
        }
        if self.polling == Polling::Periodic {
            let poller = self.poller.clone();
            let task = PeriodicTask::spawn("controller-poll", self.config.poll_period(), move || {
                poller.lock().poll();
            });
            match task {
                Ok(task) => self.task = Some(task),
                Err(e) => {
                    self.goal.release(InputSource::Controller);
                    return Err(TeleopError::Io(e));
                }
            }
        }
        self.engaged = true;
        info!("Controller engaged");
        Ok(())
    }

    /// Stops polling immediately. The goal is not reset.
    pub fn disengage(&mut self) {
        if let Some(task) = self.task.take() {
            task.stop();
        }
        if self.engaged {
            self.engaged = false;
            self.goal.release(InputSource::Controller);
            info!("Controller disengaged");
        }
    }

    /// One poll in [`Polling::Manual`] mode. Returns the delta forwarded to the sink, if any:
    /// nothing is forwarded while disengaged, on the first sample and while tracking is lost.
    pub fn poll(&mut self) -> Option<ControllerDelta> {
        if !self.engaged || self.polling != Polling::Manual {
            return None;
        }
        self.poller.lock().poll()
    }

    pub fn on_connected(&mut self, gamepad: GamepadSnapshot) {
        info!("Controller connected");
        self.gamepad = Some(gamepad);
    }

    /// Treated as disengage, the goal is kept.
    pub fn on_disconnected(&mut self) {
        warn!("Controller disconnected");
        self.disengage();
        self.gamepad = None;
    }

    /// Refreshes the button and axis state.
    pub fn on_gamepad(&mut self, gamepad: GamepadSnapshot) {
        if self.gamepad.is_some() {
            self.gamepad = Some(gamepad);
        }
    }

    pub fn on_squeeze(&mut self) -> SqueezeAction {
        self.squeeze_at(Instant::now())
    }

    /// A squeeze resets the goal, unless it follows the previous one within the double tap
    /// interval, which toggles stereo view instead.
    pub fn squeeze_at(&mut self, now: Instant) -> SqueezeAction {
        let quick = within(self.last_squeeze, now, self.config.double_tap());
        self.last_squeeze = Some(now);
        if quick {
            self.stereo = !self.stereo;
            info!("Stereo: {}", self.stereo);
            self.ui.lock().stereo(self.stereo);
            SqueezeAction::Stereo(self.stereo)
        } else {
            info!("Reset robot pose");
            self.goal.reset();
            SqueezeAction::Reset
        }
    }

    pub fn update(&mut self, in_xr_session: bool) -> Option<GamepadDirection> {
        self.update_at(in_xr_session, Instant::now())
    }

    /// Checks the touchpad once per frame. A press (debounced by the double tap interval)
    /// pauses control and returns where the touchpad was pressed.
    pub fn update_at(&mut self, in_xr_session: bool, now: Instant) -> Option<GamepadDirection> {
        let gamepad = self.gamepad?;
        if !in_xr_session || !gamepad.buttons.contains(GamepadButtons::TOUCHPAD) {
            return None;
        }
        let bounced = within(self.last_touchpad, now, self.config.double_tap());
        self.last_touchpad = Some(now);
        if bounced {
            return None;
        }
        self.disengage();
        let direction = gamepad.direction();
        debug!("Touchpad pressed {:?}", direction);
        Some(direction)
    }
}

impl Drop for ControllerSampler {
    fn drop(&mut self) {
        self.disengage();
    }
}

fn within(last: Option<Instant>, now: Instant, interval: Duration) -> bool {
    last.is_some_and(|last| now.saturating_duration_since(last) <= interval)
}

//! Mouse input under the pointer lock gesture model.
//!
//! Clicking the control canvas requests the pointer lock. While locked, relative mouse motion
//! moves the goal (translate mode) or turns it (rotate mode), the secondary button toggles the
//! mode and the wheel makes fixed steps along (or about) the vertical axis. Losing the lock,
//! including by ESC, releases the goal and resets it, so stale motion can never resume later.
//!
//! Axis mapping, in the ROS goal frame: moving the mouse up (negative dy) goes forward along
//! +x, moving it left (negative dx) goes along +y. In rotate mode the same motion turns the
//! goal about x (vertical motion) and y (horizontal motion).

use nalgebra::{UnitQuaternion, Vector3};
use tracing::{debug, info};

use crate::config::MouseConfig;
use crate::error::TeleopError;
use crate::goal::{GoalHandle, InputSource};
use crate::ui::{IndicatorState, SharedUi};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseMode {
    #[default]
    Translate,
    Rotate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Secondary,
    Middle,
}

/// Platform pointer lock. Requests may be refused (no user gesture, another element holds it).
pub trait PointerLock {
    fn request_pointer_lock(&mut self) -> bool;
    fn exit_pointer_lock(&mut self);
}

pub struct MouseSampler {
    goal: GoalHandle,
    config: MouseConfig,
    ui: SharedUi,
    state: LockState,
    mode: MouseMode,
}

impl MouseSampler {
    pub fn new(goal: GoalHandle, config: MouseConfig, ui: SharedUi) -> Self {
        MouseSampler {
            goal,
            config,
            ui,
            state: LockState::Unlocked,
            mode: MouseMode::Translate,
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn mode(&self) -> MouseMode {
        self.mode
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::Locked
    }

    /// User clicked the control canvas: request the lock and, if granted, engage.
    pub fn on_canvas_click(&mut self, lock: &mut dyn PointerLock) -> Result<LockState, TeleopError> {
        if self.is_locked() {
            return Ok(self.state);
        }
        if lock.request_pointer_lock() {
            if let Err(e) = self.on_pointer_lock_change(true) {
                lock.exit_pointer_lock();
                return Err(e);
            }
        }
        Ok(self.state)
    }

    /// Releases the lock from our side. The platform normally reports the change too, which is
    /// then a no-op.
    pub fn exit(&mut self, lock: &mut dyn PointerLock) {
        if self.is_locked() {
            lock.exit_pointer_lock();
            // Ignoring the result: unlocking cannot fail
            let _ = self.on_pointer_lock_change(false);
        }
    }

    /// Platform reported pointer lock change. Edge triggered: repeated reports of the same
    /// state are ignored. Fails if the VR controller owns the goal, in which case the sampler
    /// stays unlocked.
    pub fn on_pointer_lock_change(&mut self, locked: bool) -> Result<(), TeleopError> {
        match (self.state, locked) {
            (LockState::Unlocked, true) => {
                self.goal.claim(InputSource::Mouse)?;
                self.state = LockState::Locked;
                info!("Pointer locked, mouse controls the goal");
            }
            (LockState::Locked, false) => {
                self.state = LockState::Unlocked;
                self.goal.release(InputSource::Mouse);
                self.goal.reset();
                info!("Pointer unlocked, goal reset");
            }
            _ => return Ok(()),
        }
        self.redraw();
        Ok(())
    }

    pub fn on_mouse_down(&mut self, button: MouseButton) {
        if !self.is_locked() {
            return;
        }
        match button {
            MouseButton::Secondary => {
                self.mode = match self.mode {
                    MouseMode::Translate => MouseMode::Rotate,
                    MouseMode::Rotate => MouseMode::Translate,
                };
                debug!("Mouse mode {:?}", self.mode);
                self.redraw();
            }
            MouseButton::Primary => self.redraw(),
            MouseButton::Middle => {}
        }
    }

    /// Relative pointer motion in screen pixels. Returns true if the goal was updated.
    pub fn on_mouse_move(&mut self, dx: f64, dy: f64) -> bool {
        if !self.is_locked() {
            return false;
        }
        match self.mode {
            MouseMode::Rotate => {
                let scale = self.config.move_rot_scale;
                self.accumulate(&Vector3::zeros(), &euler_xyz(-dy * scale, -dx * scale, 0.0))
            }
            MouseMode::Translate => {
                let scale = self.config.move_trans_scale;
                self.accumulate(&Vector3::new(-dy * scale, -dx * scale, 0.0), &UnitQuaternion::identity())
            }
        }
    }

    /// Wheel motion. Only the sign counts: every event is one fixed step, whatever the device
    /// reports as magnitude.
    pub fn on_wheel(&mut self, delta_y: f64) -> bool {
        if !self.is_locked() {
            return false;
        }
        let sign = step_sign(delta_y);
        match self.mode {
            MouseMode::Rotate => {
                let step = euler_xyz(0.0, 0.0, sign * self.config.wheel_rot_scale);
                self.accumulate(&Vector3::zeros(), &step)
            }
            MouseMode::Translate => {
                let step = Vector3::new(0.0, 0.0, sign * self.config.wheel_trans_scale);
                self.accumulate(&step, &UnitQuaternion::identity())
            }
        }
    }

    fn accumulate(&self, position: &Vector3<f64>, rotation: &UnitQuaternion<f64>) -> bool {
        self.goal.accumulate(InputSource::Mouse, position, rotation)
    }

    fn redraw(&self) {
        self.ui.lock().indicator(IndicatorState {
            locked: self.is_locked(),
            mode: self.mode,
        });
    }
}

/// -1, 0 or 1. Unlike `f64::signum`, zero stays zero.
fn step_sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Rotation from intrinsic X, then Y, then Z Euler angles (R = Rx * Ry * Rz), the order
/// the render frame uses for Euler angles.
pub(crate) fn euler_xyz(x: f64, y: f64, z: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), x)
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), y)
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), z)
}

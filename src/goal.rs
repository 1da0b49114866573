//! The relative end effector goal, shared by the input samplers (writers) and the control
//! loop (reader).
//!
//! The goal is expressed in the ROS convention and is a displacement from the end effector
//! pose captured at session start. Incremental rotations are pre-multiplied, i.e. applied in
//! the outer frame, so that the same mouse motion always turns the goal about the same world
//! axis no matter how it is currently oriented.
//!
//! Only one producer may feed the goal at a time: the mouse while the pointer is locked or
//! the VR controller while engaged. A producer must [`GoalHandle::claim`] the goal before its
//! deltas are accepted.

use std::sync::Arc;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::TeleopError;
use crate::kinematic_traits::Pose;

/// Producers that may own the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Mouse,
    Controller,
}

/// Accumulated displacement from the initial end effector pose.
#[derive(Debug, Clone)]
pub struct GoalAccumulator {
    position: Vector3<f64>,
    orientation: UnitQuaternion<f64>,

    /// Incremented on every reset. The control loop compares it with the value it saw last
    /// to know when the solver must be reset too.
    reset_epoch: u64,

    active: Option<InputSource>,
}

/// Immutable copy of the goal taken once per control loop tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalSnapshot {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub reset_epoch: u64,
}

impl GoalSnapshot {
    pub fn pose(&self) -> Pose {
        Isometry3::from_parts(Translation3::from(self.position), self.orientation)
    }
}

impl Default for GoalAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl GoalAccumulator {
    pub fn new() -> Self {
        GoalAccumulator {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            reset_epoch: 0,
            active: None,
        }
    }

    /// `position += delta_position`, `orientation = delta_orientation * orientation`.
    /// No clamping: how far the goal may drift is up to the task layer.
    pub fn accumulate(&mut self, delta_position: &Vector3<f64>, delta_orientation: &UnitQuaternion<f64>) {
        self.position += delta_position;
        self.orientation = UnitQuaternion::new_normalize(
            (delta_orientation * self.orientation).into_inner());
    }

    pub fn reset(&mut self) {
        self.position = Vector3::zeros();
        self.orientation = UnitQuaternion::identity();
        self.reset_epoch += 1;
    }

    pub fn snapshot(&self) -> GoalSnapshot {
        GoalSnapshot {
            position: self.position,
            orientation: self.orientation,
            reset_epoch: self.reset_epoch,
        }
    }

    pub fn active(&self) -> Option<InputSource> {
        self.active
    }
}

/// Cloneable handle to the goal owned by the session.
#[derive(Debug, Clone, Default)]
pub struct GoalHandle {
    inner: Arc<Mutex<GoalAccumulator>>,
}

impl GoalHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `source` the only producer whose deltas are accepted. Claiming again from the
    /// owner is a no-op.
    pub fn claim(&self, source: InputSource) -> Result<(), TeleopError> {
        let mut goal = self.inner.lock();
        match goal.active {
            Some(active) if active != source => {
                Err(TeleopError::InputBusy { requested: source, active })
            }
            _ => {
                goal.active = Some(source);
                debug!("Goal claimed by {:?}", source);
                Ok(())
            }
        }
    }

    /// Frees the goal if `source` owns it.
    pub fn release(&self, source: InputSource) {
        let mut goal = self.inner.lock();
        if goal.active == Some(source) {
            goal.active = None;
            debug!("Goal released by {:?}", source);
        }
    }

    pub fn active(&self) -> Option<InputSource> {
        self.inner.lock().active
    }

    /// Accumulates a delta from `source`. Deltas from a producer that does not own the goal
    /// are dropped and false is returned.
    pub fn accumulate(&self, source: InputSource,
                      delta_position: &Vector3<f64>, delta_orientation: &UnitQuaternion<f64>) -> bool {
        let mut goal = self.inner.lock();
        if goal.active != Some(source) {
            warn!("Dropping delta from {:?}, goal is owned by {:?}", source, goal.active);
            return false;
        }
        goal.accumulate(delta_position, delta_orientation);
        true
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn snapshot(&self) -> GoalSnapshot {
        self.inner.lock().snapshot()
    }
}

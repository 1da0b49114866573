//! Notification sink towards the user interface (sliders, lock indicator, goal marker,
//! tool panel). The pipeline only ever writes into it.

use std::sync::Arc;
use parking_lot::Mutex;

use crate::kinematic_traits::Pose;
use crate::mouse::MouseMode;

/// UI sink shared between the samplers, the control loop and the arsenal.
pub type SharedUi = Arc<Mutex<dyn UiSink>>;

pub fn null_ui() -> SharedUi {
    Arc::new(Mutex::new(NullUi))
}

/// State shown by the 2D lock/mode indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorState {
    pub locked: bool,
    pub mode: MouseMode,
}

pub trait UiSink: Send {
    /// Joint value applied by the control loop; the slider and its label follow.
    fn joint_value(&mut self, _name: &str, _value: f64) {}

    /// Pointer lock or translate/rotate mode changed.
    fn indicator(&mut self, _state: IndicatorState) {}

    /// Goal marker moved to the absolute target pose (render frame).
    fn goal_marker(&mut self, _pose: &Pose) {}

    /// Tool panel highlight moved to (left, top) in panel units.
    fn tool_highlight(&mut self, _index: usize, _left: f64, _top: f64) {}

    /// Stereo rendering toggled by a quick double squeeze.
    fn stereo(&mut self, _enabled: bool) {}
}

/// Sink that ignores everything, for headless sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullUi;

impl UiSink for NullUi {}

/// Sink that remembers the last notification of each kind.
#[derive(Debug, Default, Clone)]
pub struct RecordingUi {
    pub joint_labels: Vec<(String, f64)>,
    pub indicator: Option<IndicatorState>,
    pub marker: Option<Pose>,
    pub highlight: Option<(usize, f64, f64)>,
    pub stereo: Option<bool>,
}

impl UiSink for RecordingUi {
    fn joint_value(&mut self, name: &str, value: f64) {
        match self.joint_labels.iter_mut().find(|(n, _)| n == name) {
            Some(label) => label.1 = value,
            None => self.joint_labels.push((name.to_string(), value)),
        }
    }

    fn indicator(&mut self, state: IndicatorState) {
        self.indicator = Some(state);
    }

    fn goal_marker(&mut self, pose: &Pose) {
        self.marker = Some(*pose);
    }

    fn tool_highlight(&mut self, index: usize, left: f64, top: f64) {
        self.highlight = Some((index, left, top));
    }

    fn stereo(&mut self, enabled: bool) {
        self.stereo = Some(enabled);
    }
}

impl RecordingUi {
    pub fn label(&self, name: &str) -> Option<f64> {
        self.joint_labels.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

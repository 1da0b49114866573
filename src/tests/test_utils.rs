//! Fixtures shared by the cross-module tests.

use std::sync::Arc;

use nalgebra::Isometry3;
use parking_lot::Mutex;

use crate::config::{RobotInfo, TeleopConfig};
use crate::controller::{Polling, PoseSource};
use crate::kinematic_traits::Pose;
use crate::mouse::PointerLock;
use crate::parameters::opw_kinematics::Parameters;
use crate::session::TeleopSession;
use crate::ui::RecordingUi;

pub(crate) const ARM_JOINTS: [&str; 6] = ["joint_1", "joint_2", "joint_3", "joint_4", "joint_5", "joint_6"];
pub(crate) const STARTING_CONFIG: [f64; 6] = [0.0, 0.2, -0.2, 0.0, 0.5, 0.0];

/// Controller pose replaying whatever the test puts in.
#[derive(Default)]
pub(crate) struct ScriptedController {
    pose: Mutex<Option<Pose>>,
}

impl ScriptedController {
    pub(crate) fn set(&self, pose: Pose) {
        *self.pose.lock() = Some(pose);
    }
}

impl PoseSource for ScriptedController {
    fn world_pose(&self) -> Option<Pose> {
        *self.pose.lock()
    }
}

/// Pointer lock that grants every request.
#[derive(Default)]
pub(crate) struct Canvas {
    pub(crate) locked: bool,
}

impl PointerLock for Canvas {
    fn request_pointer_lock(&mut self) -> bool {
        self.locked = true;
        true
    }

    fn exit_pointer_lock(&mut self) {
        self.locked = false;
    }
}

pub(crate) fn teleop_config() -> TeleopConfig {
    TeleopConfig::for_robot(RobotInfo::new(&ARM_JOINTS, &STARTING_CONFIG))
}

pub(crate) struct Fixture {
    pub(crate) session: TeleopSession,
    pub(crate) ui: Arc<Mutex<RecordingUi>>,
    pub(crate) controller: Arc<ScriptedController>,
}

/// Simulated irb2400 session with the controller polled by the test.
pub(crate) fn simulated_session(config: TeleopConfig, base: Isometry3<f64>) -> Fixture {
    let ui = Arc::new(Mutex::new(RecordingUi::default()));
    let controller = Arc::new(ScriptedController::default());
    controller.set(Pose::identity());
    let session = TeleopSession::simulated(config, Parameters::irb2400_10(), base,
                                           controller.clone(), ui.clone(), Polling::Manual)
        .expect("Simulated session must start");
    Fixture { session, ui, controller }
}

/// Steps the session `n` times.
pub(crate) fn settle(session: &mut TeleopSession, n: usize) {
    for _ in 0..n {
        session.step().expect("Control loop period must not fail");
    }
}

pub(crate) fn assert_close(actual: &nalgebra::Vector3<f64>, expected: &nalgebra::Vector3<f64>, tolerance: f64) {
    assert!((actual - expected).norm() < tolerance,
            "Expected {:?}, got {:?} (tolerance {})", expected, actual, tolerance);
}

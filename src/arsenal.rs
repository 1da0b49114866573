//! Tool arbiter: which physical attachment (bare controller, pen, tongs) is shown in the
//! controller grip. Switching tools changes only the visible model and the tool panel
//! highlight, controller motion is passed through untouched.

use nalgebra::Isometry3;
use tracing::{debug, info};

use crate::controller::{ControllerDelta, ControllerMoveSink};
use crate::goal::GoalHandle;
use crate::ui::SharedUi;

/// Panel slot width of one tool image, panel units.
const SLOT_WIDTH: f64 = 260.0;
const HIGHLIGHT_MARGIN: f64 = 7.5;
const IMAGE_MARGIN: f64 = 15.0;

/// Name of the tool that grasps, see [`InputTool::grasps`].
pub const TONGS: &str = "tongs";

#[derive(Debug, Clone, PartialEq)]
pub struct InputTool {
    pub name: String,
    pub image_url: String,
    /// Tool tip relative to the grip, render convention.
    pub tip: Isometry3<f64>,
}

impl InputTool {
    pub fn new(name: &str, image_url: &str, tip: Isometry3<f64>) -> Self {
        InputTool { name: name.to_string(), image_url: image_url.to_string(), tip }
    }

    pub fn controller() -> Self {
        Self::new("controller", "images/vive_controller.png", Isometry3::identity())
    }

    pub fn pen() -> Self {
        Self::new("pen", "images/marker.png",
                  Isometry3::translation(0.0, 0.0, -0.12))
    }

    pub fn tongs() -> Self {
        Self::new(TONGS, "images/tongs.png",
                  Isometry3::translation(0.0, 0.0, -0.15))
    }

    /// Letting go of the trigger with this tool opens the gripper.
    pub fn grasps(&self) -> bool {
        self.name == TONGS
    }
}

/// The controller grip holding the visible tool model.
pub trait Grip: Send {
    fn attach(&mut self, tool: &InputTool);
    fn detach(&mut self, tool: &InputTool);
}

/// Grip that only keeps track of the attached models.
#[derive(Debug, Default, Clone)]
pub struct ModelGrip {
    attached: Vec<String>,
}

impl ModelGrip {
    pub fn attached(&self) -> &[String] {
        &self.attached
    }
}

impl Grip for ModelGrip {
    fn attach(&mut self, tool: &InputTool) {
        if !self.attached.contains(&tool.name) {
            debug!("Attaching {}", tool.name);
            self.attached.push(tool.name.clone());
        }
    }

    fn detach(&mut self, tool: &InputTool) {
        self.attached.retain(|name| name != &tool.name);
    }
}

pub struct Arsenal {
    tools: Vec<InputTool>,
    current: usize,
    grip: Box<dyn Grip>,
    feed: Box<dyn ControllerMoveSink>,
    goal: GoalHandle,
    ui: SharedUi,
}

impl Arsenal {
    /// Arsenal with the controller, pen and tongs, holding the controller.
    pub fn new(grip: Box<dyn Grip>, feed: Box<dyn ControllerMoveSink>,
               goal: GoalHandle, ui: SharedUi) -> Self {
        Self::with_tools(vec![InputTool::controller(), InputTool::pen(), InputTool::tongs()],
                         grip, feed, goal, ui)
    }

    /// An empty tool list falls back to the bare controller.
    pub fn with_tools(mut tools: Vec<InputTool>, mut grip: Box<dyn Grip>,
                      feed: Box<dyn ControllerMoveSink>, goal: GoalHandle, ui: SharedUi) -> Self {
        if tools.is_empty() {
            tools.push(InputTool::controller());
        }
        grip.attach(&tools[0]);
        Arsenal { tools, current: 0, grip, feed, goal, ui }
    }

    pub fn add(&mut self, tool: InputTool) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[InputTool] {
        &self.tools
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &InputTool {
        &self.tools[self.current]
    }

    pub fn next_tool(&mut self) {
        self.current = (self.current + 1) % self.tools.len();
        self.change_tool();
    }

    pub fn prev_tool(&mut self) {
        self.current = (self.current + self.tools.len() - 1) % self.tools.len();
        self.change_tool();
    }

    fn change_tool(&mut self) {
        for (i, tool) in self.tools.iter().enumerate() {
            if i == self.current {
                self.grip.attach(tool);
            } else {
                self.grip.detach(tool);
            }
        }
        let (left, top) = self.highlight_position();
        self.ui.lock().tool_highlight(self.current, left, top);
        info!("Tool: {}", self.current().name);
    }

    /// Position of the highlight frame behind the current tool image.
    pub fn highlight_position(&self) -> (f64, f64) {
        (HIGHLIGHT_MARGIN + self.current as f64 * SLOT_WIDTH, HIGHLIGHT_MARGIN)
    }

    /// Position of the image of the tool at `index` on the panel.
    pub fn image_position(index: usize) -> (f64, f64) {
        (IMAGE_MARGIN + index as f64 * SLOT_WIDTH, IMAGE_MARGIN)
    }

    pub fn robot_reset(&self) {
        self.goal.reset();
    }
}

impl ControllerMoveSink for Arsenal {
    fn on_controller_move(&mut self, delta: &ControllerDelta) -> bool {
        self.feed.on_controller_move(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use nalgebra::{UnitQuaternion, Vector3};
    use parking_lot::Mutex;
    use crate::controller::GoalFeed;
    use crate::goal::InputSource;
    use crate::ui::{null_ui, RecordingUi};

    /// Shares its state with the test.
    #[derive(Clone, Default)]
    struct SharedGrip(Arc<Mutex<ModelGrip>>);

    impl Grip for SharedGrip {
        fn attach(&mut self, tool: &InputTool) {
            self.0.lock().attach(tool);
        }

        fn detach(&mut self, tool: &InputTool) {
            self.0.lock().detach(tool);
        }
    }

    fn arsenal(goal: &GoalHandle, ui: SharedUi) -> (Arsenal, SharedGrip) {
        let grip = SharedGrip::default();
        let feed = Box::new(GoalFeed::new(goal.clone(), Default::default()));
        (Arsenal::new(Box::new(grip.clone()), feed, goal.clone(), ui), grip)
    }

    #[test]
    fn test_starts_with_controller() {
        let goal = GoalHandle::new();
        let (arsenal, grip) = arsenal(&goal, null_ui());
        assert_eq!(arsenal.current().name, "controller");
        assert_eq!(grip.0.lock().attached(), ["controller"]);
    }

    #[test]
    fn test_cycles_both_ways() {
        let goal = GoalHandle::new();
        let ui = Arc::new(Mutex::new(RecordingUi::default()));
        let (mut arsenal, grip) = arsenal(&goal, ui.clone());

        arsenal.next_tool();
        assert_eq!(arsenal.current().name, "pen");
        assert_eq!(grip.0.lock().attached(), ["pen"]);
        assert_eq!(ui.lock().highlight, Some((1, 267.5, 7.5)));

        arsenal.next_tool();
        arsenal.next_tool();
        assert_eq!(arsenal.current_index(), 0);

        arsenal.prev_tool();
        assert_eq!(arsenal.current().name, "tongs");
        assert_eq!(grip.0.lock().attached(), ["tongs"]);
        assert_eq!(ui.lock().highlight, Some((2, 527.5, 7.5)));
    }

    #[test]
    fn test_single_tool_wraps_to_itself() {
        let goal = GoalHandle::new();
        let feed = Box::new(GoalFeed::new(goal.clone(), Default::default()));
        let mut arsenal = Arsenal::with_tools(Vec::new(), Box::new(ModelGrip::default()),
                                              feed, goal, null_ui());
        arsenal.prev_tool();
        assert_eq!(arsenal.current_index(), 0);
        arsenal.next_tool();
        assert_eq!(arsenal.current_index(), 0);
    }

    #[test]
    fn test_move_passes_through() {
        let goal = GoalHandle::new();
        let (mut arsenal, _) = arsenal(&goal, null_ui());
        goal.claim(InputSource::Controller).unwrap();
        let delta = ControllerDelta {
            position: Vector3::new(0.0, 0.0, 0.02),
            rotation: UnitQuaternion::identity(),
        };
        arsenal.next_tool();
        assert!(arsenal.on_controller_move(&delta));
        // Switching tools changes nothing in the pose math
        assert!((goal.snapshot().position.x - 0.02).abs() < 1e-12);

        arsenal.robot_reset();
        assert_eq!(goal.snapshot().position, Vector3::zeros());
    }

    #[test]
    fn test_image_positions() {
        assert_eq!(Arsenal::image_position(0), (15.0, 15.0));
        assert_eq!(Arsenal::image_position(2), (535.0, 15.0));
    }
}

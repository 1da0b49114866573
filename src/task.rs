//! Task layer fed with the end effector pose on every control period: drawing on a tilted
//! board and pick-and-place of bricks. Both work in the render convention, the same one the
//! joint model reports the end effector pose in.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use nalgebra::{Isometry3, Point2, Point3, Translation3, Vector3};
use tracing::{debug, info};

use crate::kinematic_traits::Pose;
use crate::mouse::euler_xyz;

/// Capabilities every task offers to [`TaskControl`].
pub trait Task {
    fn name(&self) -> &str;

    /// Number of rounds the task has.
    fn rounds(&self) -> usize;

    /// Task selected: set up its scene.
    fn init(&mut self);

    /// Another task selected: tear everything down.
    fn quit(&mut self);

    /// Clear the state of the current round.
    fn reset(&mut self);

    /// Load and start the given round.
    fn next_round(&mut self, round: usize);

    /// Called every control period with the current end effector pose.
    fn update(&mut self, ee_pose: &Pose);

    /// Adjusts the absolute goal pose before it is reached, if the task has an opinion.
    fn snap_goal(&self, goal: &Pose) -> Pose {
        *goal
    }
}

/// Pen contact distance from the board plane.
const CONTACT_DISTANCE: f64 = 0.01;

/// Goals closer than this to the board plane are pulled onto it.
const SNAPPING_DISTANCE: f64 = 0.05;

/// Stroke length limit, points beyond it are dropped.
const MAX_STROKE_POINTS: usize = 5000;

/// Board pose in the world: x and y span the writing surface, z is its normal.
pub fn board_to_world() -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(0.65, 1.0, 0.0),
        euler_xyz(-FRAC_PI_2, -FRAC_PI_4, -FRAC_PI_2),
    )
}

/// One continuous pen contact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stroke {
    /// Pen positions on the board surface, board coordinates.
    pub board: Vec<Point2<f64>>,
    /// The same positions in world coordinates.
    pub world: Vec<Point3<f64>>,
}

impl Stroke {
    fn push(&mut self, on_board: Point2<f64>, world: Point3<f64>) {
        if self.board.len() < MAX_STROKE_POINTS {
            self.board.push(on_board);
            self.world.push(world);
        }
    }

    pub fn len(&self) -> usize {
        self.board.len()
    }

    pub fn is_empty(&self) -> bool {
        self.board.is_empty()
    }
}

/// Target curve to trace, in board coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetCurve {
    pub name: String,
    pub points: Vec<Point2<f64>>,
}

impl TargetCurve {
    pub fn rectangle() -> Self {
        TargetCurve {
            name: "rectangle".to_string(),
            points: vec![
                Point2::new(-0.18, -0.1),
                Point2::new(-0.18, 0.15),
                Point2::new(0.32, 0.15),
                Point2::new(0.32, -0.1),
            ],
        }
    }

    /// Upper half of a 0.3 m circle centered at (0.12, -0.12).
    pub fn arc() -> Self {
        let segments = 64;
        let points = (0..=segments / 2)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / segments as f64;
                Point2::new(0.12 + 0.3 * angle.cos(), -0.12 + 0.3 * angle.sin())
            })
            .collect();
        TargetCurve { name: "arc".to_string(), points }
    }

    /// Curve points in world coordinates.
    pub fn world_points(&self) -> Vec<Point3<f64>> {
        let board = board_to_world();
        self.points.iter().map(|p| board * Point3::new(p.x, p.y, 0.0)).collect()
    }
}

#[derive(Debug, Clone)]
pub struct DrawingTask {
    curves: Vec<TargetCurve>,
    target: Option<usize>,
    strokes: Vec<Stroke>,
    drawing: bool,
    loaded: bool,
}

impl Default for DrawingTask {
    fn default() -> Self {
        Self::new(vec![TargetCurve::rectangle(), TargetCurve::arc()])
    }
}

impl DrawingTask {
    pub fn new(curves: Vec<TargetCurve>) -> Self {
        DrawingTask { curves, target: None, strokes: Vec::new(), drawing: false, loaded: false }
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn target(&self) -> Option<&TargetCurve> {
        self.target.and_then(|i| self.curves.get(i))
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn clear_strokes(&mut self) {
        self.strokes.clear();
        self.drawing = false;
    }
}

impl Task for DrawingTask {
    fn name(&self) -> &str {
        "drawing"
    }

    fn rounds(&self) -> usize {
        self.curves.len()
    }

    fn init(&mut self) {
        self.loaded = true;
        self.clear_strokes();
    }

    fn quit(&mut self) {
        self.reset();
        self.clear_strokes();
        self.loaded = false;
    }

    fn reset(&mut self) {
        self.target = None;
    }

    fn next_round(&mut self, round: usize) {
        self.clear_strokes();
        if round < self.curves.len() {
            self.target = Some(round);
            debug!("Drawing target: {}", self.curves[round].name);
        }
    }

    fn update(&mut self, ee_pose: &Pose) {
        let board = board_to_world();
        let tip = board.inverse_transform_point(&Point3::from(ee_pose.translation.vector));
        if tip.z.abs() < CONTACT_DISTANCE {
            if !self.drawing {
                self.strokes.push(Stroke::default());
                self.drawing = true;
            }
            let on_board = Point2::new(tip.x, tip.y);
            let world = board * Point3::new(tip.x, tip.y, 0.0);
            if let Some(stroke) = self.strokes.last_mut() {
                stroke.push(on_board, world);
            }
        } else {
            self.drawing = false;
        }
    }

    fn snap_goal(&self, goal: &Pose) -> Pose {
        let board = board_to_world();
        let mut on_board = board.inverse_transform_point(&Point3::from(goal.translation.vector));
        if on_board.z.abs() < SNAPPING_DISTANCE {
            on_board.z = 0.0;
        }
        Isometry3::from_parts(Translation3::from((board * on_board).coords), goal.rotation)
    }
}

/// A brick to carry from its start to its target position.
#[derive(Debug, Clone, PartialEq)]
pub struct Brick {
    pub start: Point3<f64>,
    pub target: Point3<f64>,
    pub position: Point3<f64>,
    pub held: bool,
    pub placed: bool,
    /// Brick position relative to the end effector while held.
    grasp_offset: Vector3<f64>,
}

impl Brick {
    pub fn new(start: Point3<f64>, target: Point3<f64>) -> Self {
        Brick { start, target, position: start, held: false, placed: false, grasp_offset: Vector3::zeros() }
    }

    fn restart(&mut self) {
        self.position = self.start;
        self.held = false;
        self.placed = false;
    }
}

#[derive(Debug, Clone)]
pub struct PickAndPlace {
    rounds: Vec<Vec<Brick>>,
    bricks: Vec<Brick>,
    grasp_radius: f64,
    place_tolerance: f64,
    scene_loaded: bool,
}

impl Default for PickAndPlace {
    fn default() -> Self {
        let brick = |start: [f64; 3], target: [f64; 3]| {
            Brick::new(Point3::from(start), Point3::from(target))
        };
        Self::new(vec![
            vec![brick([0.8, 0.02, 0.2], [0.5, 0.0, 0.75])],
            vec![brick([0.6, 0.02, 0.5], [0.8, 0.0, -0.5])],
            vec![brick([0.8, 0.02, -0.75], [0.5, 0.0, 0.5])],
        ])
    }
}

impl PickAndPlace {
    pub fn new(rounds: Vec<Vec<Brick>>) -> Self {
        PickAndPlace { rounds, bricks: Vec::new(), grasp_radius: 0.05, place_tolerance: 0.05, scene_loaded: false }
    }

    pub fn with_tolerances(mut self, grasp_radius: f64, place_tolerance: f64) -> Self {
        self.grasp_radius = grasp_radius;
        self.place_tolerance = place_tolerance;
        self
    }

    pub fn bricks(&self) -> &[Brick] {
        &self.bricks
    }

    pub fn gripper_occupied(&self) -> bool {
        self.bricks.iter().any(|b| b.held)
    }

    pub fn is_scene_loaded(&self) -> bool {
        self.scene_loaded
    }

    /// Every brick of the round is on its target.
    pub fn is_done(&self) -> bool {
        !self.bricks.is_empty() && self.bricks.iter().all(|b| b.placed)
    }

    /// Opens the gripper. A brick dropped close enough to its target counts as placed.
    /// Returns true if a brick was placed.
    pub fn release(&mut self) -> bool {
        let tolerance = self.place_tolerance;
        let mut placed = false;
        for brick in self.bricks.iter_mut().filter(|b| b.held) {
            brick.held = false;
            if (brick.position - brick.target).norm() <= tolerance {
                brick.position = brick.target;
                brick.placed = true;
                placed = true;
                info!("Brick placed at {:?}", brick.target);
            }
        }
        placed
    }
}

impl Task for PickAndPlace {
    fn name(&self) -> &str {
        "pickplace"
    }

    fn rounds(&self) -> usize {
        self.rounds.len()
    }

    fn init(&mut self) {
        self.scene_loaded = true;
    }

    fn quit(&mut self) {
        self.reset();
        self.scene_loaded = false;
    }

    fn reset(&mut self) {
        self.bricks.clear();
    }

    fn next_round(&mut self, round: usize) {
        if let Some(bricks) = self.rounds.get(round) {
            self.bricks = bricks.clone();
            self.bricks.iter_mut().for_each(Brick::restart);
        }
    }

    fn update(&mut self, ee_pose: &Pose) {
        let ee = Point3::from(ee_pose.translation.vector);
        let mut occupied = self.gripper_occupied();
        for brick in self.bricks.iter_mut().filter(|b| !b.placed) {
            if brick.held {
                brick.position = ee + ee_pose.rotation * brick.grasp_offset;
            } else if !occupied && (brick.position - ee).norm() <= self.grasp_radius {
                brick.held = true;
                brick.grasp_offset = ee_pose.rotation.inverse() * (brick.position - ee);
                occupied = true;
                debug!("Brick picked at {:?}", brick.position);
            }
        }
    }
}

/// The tasks as tagged variants.
#[derive(Debug, Clone)]
pub enum TaskKind {
    Drawing(DrawingTask),
    PickAndPlace(PickAndPlace),
}

impl TaskKind {
    fn task(&self) -> &dyn Task {
        match self {
            TaskKind::Drawing(t) => t,
            TaskKind::PickAndPlace(t) => t,
        }
    }

    fn task_mut(&mut self) -> &mut dyn Task {
        match self {
            TaskKind::Drawing(t) => t,
            TaskKind::PickAndPlace(t) => t,
        }
    }
}

impl Task for TaskKind {
    fn name(&self) -> &str {
        self.task().name()
    }

    fn rounds(&self) -> usize {
        self.task().rounds()
    }

    fn init(&mut self) {
        self.task_mut().init()
    }

    fn quit(&mut self) {
        self.task_mut().quit()
    }

    fn reset(&mut self) {
        self.task_mut().reset()
    }

    fn next_round(&mut self, round: usize) {
        self.task_mut().next_round(round)
    }

    fn update(&mut self, ee_pose: &Pose) {
        self.task_mut().update(ee_pose)
    }

    fn snap_goal(&self, goal: &Pose) -> Pose {
        self.task().snap_goal(goal)
    }
}

/// Selects the task and walks it through its rounds.
#[derive(Debug, Clone)]
pub struct TaskControl {
    tasks: Vec<TaskKind>,
    current: Option<usize>,
    previous: Option<usize>,
    round: usize,
}

impl Default for TaskControl {
    fn default() -> Self {
        Self::new(vec![
            TaskKind::PickAndPlace(PickAndPlace::default()),
            TaskKind::Drawing(DrawingTask::default()),
        ])
    }
}

impl TaskControl {
    pub fn new(tasks: Vec<TaskKind>) -> Self {
        TaskControl { tasks, current: None, previous: None, round: 0 }
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn current(&self) -> Option<&TaskKind> {
        self.current.and_then(|i| self.tasks.get(i))
    }

    /// Selects the task by name and initializes it. Unknown names (like "none") deselect,
    /// quitting the running task.
    pub fn select(&mut self, name: &str) -> bool {
        self.current = self.tasks.iter().position(|t| t.name() == name);
        match self.current {
            Some(_) => {
                self.init();
                true
            }
            None => {
                if let Some(previous) = self.previous.take().and_then(|i| self.tasks.get_mut(i)) {
                    info!("Task {} stopped", previous.name());
                    previous.quit();
                }
                self.round = 0;
                false
            }
        }
    }

    /// Starts the current task from round 0, quitting whichever task ran before.
    pub fn init(&mut self) {
        self.round = 0;
        if let Some(previous) = self.previous.and_then(|i| self.tasks.get_mut(i)) {
            previous.quit();
        }
        self.previous = self.current;
        if let Some(task) = self.current.and_then(|i| self.tasks.get_mut(i)) {
            info!("Task {} started", task.name());
            task.init();
        }
        self.next_round();
    }

    /// Advances to the following round, back to the first one after the last.
    pub fn finish_round(&mut self) {
        let rounds = self.current().map_or(0, |t| t.rounds());
        self.round = if self.round + 1 < rounds { self.round + 1 } else { 0 };
        self.next_round();
    }

    pub fn next_round(&mut self) {
        let round = self.round;
        if let Some(task) = self.current.and_then(|i| self.tasks.get_mut(i)) {
            task.reset();
            task.next_round(round);
            debug!("Task {} round {}", task.name(), round);
        }
    }

    pub fn update(&mut self, ee_pose: &Pose) {
        if let Some(task) = self.current.and_then(|i| self.tasks.get_mut(i)) {
            task.update(ee_pose);
        }
    }

    pub fn snap_goal(&self, goal: &Pose) -> Pose {
        self.current().map_or(*goal, |t| t.snap_goal(goal))
    }

    /// Opens the gripper if the current task holds anything. Returns true if a brick landed
    /// on its target.
    pub fn release(&mut self) -> bool {
        match self.current.and_then(|i| self.tasks.get_mut(i)) {
            Some(TaskKind::PickAndPlace(task)) => task.release(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;

    fn on_board(x: f64, y: f64, z: f64) -> Pose {
        let world = board_to_world() * Point3::new(x, y, z);
        Isometry3::from_parts(Translation3::from(world.coords), UnitQuaternion::identity())
    }

    #[test]
    fn test_board_is_tilted() {
        let board = board_to_world();
        let normal = board.rotation * Vector3::z();
        assert!((normal.norm() - 1.0).abs() < 1e-12);
        // Neither vertical nor horizontal
        assert!(normal.y.abs() > 0.1 && normal.y.abs() < 0.9);
    }

    #[test]
    fn test_strokes_start_and_end_with_contact() {
        let mut drawing = DrawingTask::default();
        drawing.init();
        drawing.next_round(0);
        assert_eq!(drawing.target().unwrap().name, "rectangle");

        drawing.update(&on_board(0.0, 0.0, 0.1));
        assert!(drawing.strokes().is_empty());

        drawing.update(&on_board(0.0, 0.0, 0.005));
        drawing.update(&on_board(0.01, 0.0, -0.005));
        assert_eq!(drawing.strokes().len(), 1);
        let stroke = &drawing.strokes()[0];
        assert_eq!(stroke.len(), 2);
        // Projected onto the board
        assert!((stroke.board[1] - Point2::new(0.01, 0.0)).norm() < 1e-9);
        let back = board_to_world().inverse_transform_point(&stroke.world[1]);
        assert!(back.z.abs() < 1e-9);

        drawing.update(&on_board(0.02, 0.0, 0.02));
        drawing.update(&on_board(0.03, 0.0, 0.0));
        assert_eq!(drawing.strokes().len(), 2);

        drawing.next_round(1);
        assert!(drawing.strokes().is_empty());
        assert_eq!(drawing.target().unwrap().name, "arc");
    }

    #[test]
    fn test_snap_goal() {
        let drawing = DrawingTask::default();
        let near = on_board(0.1, 0.1, 0.04);
        let snapped = drawing.snap_goal(&near);
        let local = board_to_world().inverse_transform_point(&Point3::from(snapped.translation.vector));
        assert!(local.z.abs() < 1e-9);
        assert!((local.x - 0.1).abs() < 1e-9);

        let far = on_board(0.1, 0.1, 0.06);
        assert!((drawing.snap_goal(&far).translation.vector - far.translation.vector).norm() < 1e-12);
    }

    #[test]
    fn test_target_curve_in_world() {
        let curve = TargetCurve::arc();
        assert_eq!(curve.points.len(), 33);
        for point in curve.world_points() {
            let local = board_to_world().inverse_transform_point(&point);
            assert!(local.z.abs() < 1e-9);
        }
    }

    #[test]
    fn test_pick_and_place() {
        let mut task = PickAndPlace::new(vec![vec![
            Brick::new(Point3::new(0.5, 0.0, 0.0), Point3::new(0.5, 0.0, 0.5)),
        ]]);
        task.init();
        task.next_round(0);
        assert_eq!(task.bricks().len(), 1);

        let at = |x: f64, y: f64, z: f64| Isometry3::translation(x, y, z);
        task.update(&at(0.0, 0.0, 0.0));
        assert!(!task.gripper_occupied());

        task.update(&at(0.5, 0.0, 0.01));
        assert!(task.gripper_occupied());

        task.update(&at(0.5, 0.0, 0.3));
        assert!((task.bricks()[0].position - Point3::new(0.5, 0.0, 0.29)).norm() < 1e-9);
        // Too far from the target
        assert!(!task.release());
        assert!(!task.bricks()[0].placed);

        task.update(&at(0.5, 0.0, 0.31));
        task.update(&at(0.5, 0.0, 0.505));
        task.update(&at(0.5, 0.0, 0.5));
        assert!(task.gripper_occupied());
        task.update(&at(0.5, 0.0, 0.51));
        assert!(task.release());
        assert!(task.is_done());
        assert_eq!(task.bricks()[0].position, Point3::new(0.5, 0.0, 0.5));
    }

    #[test]
    fn test_rounds_wrap() {
        let mut control = TaskControl::default();
        assert!(control.select("pickplace"));
        assert_eq!(control.round(), 0);
        control.finish_round();
        control.finish_round();
        assert_eq!(control.round(), 2);
        control.finish_round();
        assert_eq!(control.round(), 0);
    }

    #[test]
    fn test_switching_quits_previous() {
        let mut control = TaskControl::default();
        control.select("pickplace");
        control.update(&Isometry3::translation(0.8, 0.02, 0.2));
        match control.current() {
            Some(TaskKind::PickAndPlace(task)) => assert!(task.gripper_occupied()),
            other => panic!("Unexpected task {:?}", other),
        }

        control.select("drawing");
        assert_eq!(control.current().map(|t| t.name()), Some("drawing"));
        // Quitting cleared the bricks
        match &control.tasks[0] {
            TaskKind::PickAndPlace(task) => {
                assert!(task.bricks().is_empty());
                assert!(!task.is_scene_loaded());
            }
            other => panic!("Unexpected task {:?}", other),
        }

        assert!(!control.select("none"));
        assert!(control.current().is_none());
        // No task, nothing to update
        control.update(&Pose::identity());
        control.finish_round();
        assert!(!control.release());
    }

    #[test]
    fn test_deselect_quits_running_task() {
        let mut control = TaskControl::default();
        control.select("drawing");
        control.update(&on_board(0.0, 0.0, 0.0));
        match control.current() {
            Some(TaskKind::Drawing(task)) => assert_eq!(task.strokes().len(), 1),
            other => panic!("Unexpected task {:?}", other),
        }

        assert!(!control.select("none"));
        match &control.tasks[1] {
            TaskKind::Drawing(task) => {
                assert!(!task.is_loaded());
                assert!(task.strokes().is_empty());
                assert!(task.target().is_none());
            }
            other => panic!("Unexpected task {:?}", other),
        }
        // Selecting again after the deselect does not quit anything twice
        assert!(control.select("drawing"));
        assert_eq!(control.round(), 0);
    }

    #[test]
    fn test_release_places_carried_brick() {
        let mut control = TaskControl::default();
        control.select("pickplace");
        control.update(&Isometry3::translation(0.8, 0.02, 0.2));
        control.update(&Isometry3::translation(0.5, 0.0, 0.75));
        control.update(&Isometry3::translation(0.5, 0.0, 0.75));
        match control.current() {
            Some(TaskKind::PickAndPlace(task)) => {
                assert!(task.gripper_occupied());
                assert!(!task.is_done());
            }
            other => panic!("Unexpected task {:?}", other),
        }

        assert!(control.release());
        match control.current() {
            Some(TaskKind::PickAndPlace(task)) => {
                assert!(!task.gripper_occupied());
                assert!(task.is_done());
            }
            other => panic!("Unexpected task {:?}", other),
        }
    }
}

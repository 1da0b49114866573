#[cfg(test)]
mod tests {
    use nalgebra::{Isometry3, Point3, Vector3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::controller::SqueezeAction;
    use crate::error::TeleopError;
    use crate::frame::orientation_angle;
    use crate::goal::InputSource;
    use crate::mouse::{LockState, MouseButton, MouseMode};
    use crate::session::TouchpadAction;
    use crate::task::{Brick, PickAndPlace, TaskControl, TaskKind};
    use crate::tests::test_utils::{assert_close, settle, simulated_session, teleop_config, Canvas};

    const REACHED: f64 = 1.5e-3;

    #[test]
    fn test_mouse_moves_robot_and_lock_loss_returns_it() {
        let mut fixture = simulated_session(teleop_config(), Isometry3::identity());
        let session = &mut fixture.session;
        let initial = session.control().lock().initial_ee();

        let mut canvas = Canvas::default();
        assert_eq!(session.mouse().on_canvas_click(&mut canvas).unwrap(), LockState::Locked);
        // Mouse up by 100 pixels is 1 cm forward along ROS x, which is render x too
        assert!(session.mouse().on_mouse_move(0.0, -100.0));
        settle(session, 5);
        let moved = session.end_effector_pose().translation.vector - initial.translation.vector;
        assert_close(&moved, &Vector3::new(0.01, 0.0, 0.0), REACHED);
        assert!(orientation_angle(&session.end_effector_pose(), &initial) < REACHED);

        // Escape: the goal resets, the solver restarts and the robot goes back
        session.mouse().on_pointer_lock_change(false).unwrap();
        assert!(session.goal().snapshot().pose().translation.vector.norm() < 1e-12);
        settle(session, 5);
        assert_close(&session.end_effector_pose().translation.vector, &initial.translation.vector, REACHED);

        // Motion after the lock is lost goes nowhere
        assert!(!session.mouse().on_mouse_move(0.0, -100.0));
        assert!(!session.step().unwrap());
    }

    #[test]
    fn test_rotate_mode_turns_end_effector_in_place() {
        let mut fixture = simulated_session(teleop_config(), Isometry3::identity());
        let session = &mut fixture.session;
        let initial = session.control().lock().initial_ee();

        session.mouse().on_canvas_click(&mut Canvas::default()).unwrap();
        session.mouse().on_mouse_down(MouseButton::Secondary);
        assert_eq!(session.mouse().mode(), MouseMode::Rotate);
        // 1000 pixels left at 3e-4 rad per pixel
        session.mouse().on_mouse_move(-1000.0, 0.0);
        settle(session, 10);

        let reached = session.end_effector_pose();
        let target = session.control().lock().target();
        assert!(orientation_angle(&reached, &target) < REACHED);
        assert!((orientation_angle(&reached, &initial) - 0.3).abs() < REACHED);
        assert_close(&reached.translation.vector, &initial.translation.vector, REACHED);
        assert_eq!(fixture.ui.lock().indicator.map(|i| i.mode), Some(MouseMode::Rotate));
    }

    #[test]
    fn test_controller_engagement_toggle() {
        let mut fixture = simulated_session(teleop_config(), Isometry3::identity());
        let session = &mut fixture.session;
        let initial = session.control().lock().initial_ee();

        assert!(session.controller().on_select().unwrap());
        assert_eq!(session.goal().active(), Some(InputSource::Controller));

        // Mouse cannot take the goal while the controller holds it
        let mut canvas = Canvas::default();
        assert!(matches!(session.mouse().on_canvas_click(&mut canvas),
                         Err(TeleopError::InputBusy { requested: InputSource::Mouse, active: InputSource::Controller })));
        assert!(!canvas.locked);

        // Controller 2 cm towards the viewer (render -z) is ROS -x with the default axis map
        fixture.controller.set(Isometry3::translation(0.0, 0.0, -0.02));
        assert!(session.controller().poll().is_some());
        assert_close(&session.goal().snapshot().position, &Vector3::new(-0.02, 0.0, 0.0), 1e-12);
        settle(session, 5);
        let moved = session.end_effector_pose().translation.vector - initial.translation.vector;
        assert_close(&moved, &Vector3::new(-0.02, 0.0, 0.0), REACHED);

        // Disengaging keeps the goal, and the robot where it is
        assert!(!session.controller().on_select().unwrap());
        fixture.controller.set(Isometry3::translation(0.0, 0.0, -0.5));
        assert!(session.controller().poll().is_none());
        assert_close(&session.goal().snapshot().position, &Vector3::new(-0.02, 0.0, 0.0), 1e-12);
        assert_eq!(session.goal().active(), None);

        // Squeeze resets
        assert_eq!(session.on_squeeze(), SqueezeAction::Reset);
        settle(session, 5);
        assert_close(&session.end_effector_pose().translation.vector, &initial.translation.vector, REACHED);
    }

    #[test]
    fn test_timing_window_through_session() {
        let mut config = teleop_config();
        config.control_loop.stats_capacity = 4;
        let mut fixture = simulated_session(config, Isometry3::identity());
        let session = &mut fixture.session;
        session.mouse().on_canvas_click(&mut Canvas::default()).unwrap();

        for _ in 0..4 {
            session.mouse().on_mouse_move(-50.0, 0.0);
            assert!(session.step().unwrap());
        }
        let report = session.control().lock().last_report().expect("window complete");
        assert_eq!(report.solver_durations.map(|s| s.samples), Some(4));
        assert_eq!(report.tick_intervals.map(|s| s.samples), Some(3));
    }

    #[test]
    fn test_random_mouse_motion_accumulates() {
        let mut fixture = simulated_session(teleop_config(), Isometry3::identity());
        let session = &mut fixture.session;
        session.mouse().on_canvas_click(&mut Canvas::default()).unwrap();
        let scale = session.config().mouse.move_trans_scale;

        let mut rng = StdRng::seed_from_u64(7);
        let mut expected = Vector3::zeros();
        for _ in 0..500 {
            let dx: f64 = rng.gen_range(-40.0..40.0);
            let dy: f64 = rng.gen_range(-40.0..40.0);
            session.mouse().on_mouse_move(dx, dy);
            expected += Vector3::new(-dy * scale, -dx * scale, 0.0);
        }
        assert_close(&session.goal().snapshot().position, &expected, 1e-9);

        session.mouse().on_mouse_down(MouseButton::Secondary);
        for _ in 0..500 {
            session.mouse().on_mouse_move(rng.gen_range(-400.0..400.0), rng.gen_range(-400.0..400.0));
        }
        let orientation = session.goal().snapshot().orientation;
        assert!((orientation.into_inner().norm() - 1.0).abs() < 1e-9);
        // Rotation does not move the position
        assert_close(&session.goal().snapshot().position, &expected, 1e-9);

        session.mouse().on_pointer_lock_change(false).unwrap();
        let goal = session.goal().snapshot();
        assert_eq!(goal.position, Vector3::zeros());
        assert!(goal.orientation.angle() < 1e-12);
    }

    fn brick_state(session: &crate::session::TeleopSession) -> (bool, bool, bool) {
        match session.tasks().lock().current() {
            Some(TaskKind::PickAndPlace(task)) => {
                let brick = &task.bricks()[0];
                (brick.held, brick.placed, task.is_done())
            }
            other => panic!("Unexpected task {:?}", other),
        }
    }

    #[test]
    fn test_tongs_pick_carry_and_place() {
        let mut fixture = simulated_session(teleop_config(), Isometry3::identity());
        let session = &mut fixture.session;
        let initial = Point3::from(session.control().lock().initial_ee().translation.vector);

        // Brick right at the end effector, its target 2 cm away along render -x
        let target = initial + Vector3::new(-0.02, 0.0, 0.0);
        let bricks = PickAndPlace::new(vec![vec![Brick::new(initial, target)]])
            .with_tolerances(0.05, 0.01);
        *session.tasks().lock() = TaskControl::new(vec![TaskKind::PickAndPlace(bricks)]);
        assert!(session.tasks().lock().select("pickplace"));

        settle(session, 1);
        assert_eq!(brick_state(session), (true, false, false));

        // The bare controller does not open anything
        assert!(session.on_select().unwrap());
        assert!(!session.on_select().unwrap());
        assert_eq!(brick_state(session), (true, false, false));

        session.on_touchpad(TouchpadAction::PreviousTool);
        assert!(session.arsenal().lock().current().grasps());

        assert!(session.on_select().unwrap());
        fixture.controller.set(Isometry3::translation(0.0, 0.0, -0.02));
        assert!(session.controller().poll().is_some());
        settle(session, 5);
        let carried = match session.tasks().lock().current() {
            Some(TaskKind::PickAndPlace(task)) => task.bricks()[0].position,
            other => panic!("Unexpected task {:?}", other),
        };
        assert_close(&carried.coords, &target.coords, REACHED);
        assert_eq!(brick_state(session), (true, false, false));

        // Letting go of the trigger opens the tongs on the target
        assert!(!session.on_select().unwrap());
        assert_eq!(brick_state(session), (false, true, true));
        settle(session, 2);
        assert_eq!(brick_state(session), (false, true, true));
    }
}

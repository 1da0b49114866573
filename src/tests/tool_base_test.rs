#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;
    use std::sync::Arc;

    use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

    use crate::config::{RobotInfo, SolverConfig};
    use crate::frame::ros_to_render;
    use crate::jacobian::JacobianSolver;
    use crate::kinematic_traits::{IkSolver, JointModel, Kinematics};
    use crate::parameters::opw_kinematics::Parameters;
    use crate::simulated_arm::SimulatedArm;
    use crate::tests::test_utils::{assert_close, settle, simulated_session, teleop_config, Canvas, ARM_JOINTS, STARTING_CONFIG};

    #[test]
    fn test_goal_is_relative_to_the_tool_on_pedestal() {
        // 0.5 m pedestal, turned by 90 degrees about the vertical
        let base = Isometry3::from_parts(Translation3::new(0.0, 0.0, 0.5),
                                         UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2));
        let mut fixture = simulated_session(teleop_config(), base);
        let session = &mut fixture.session;
        let initial = session.control().lock().initial_ee();
        // Render y is ROS z, so the pedestal lifts the end effector in render y
        assert!(initial.translation.y > 1.0);

        session.mouse().on_canvas_click(&mut Canvas::default()).unwrap();
        // One wheel step of 3 cm along ROS z, whatever the base rotation is
        session.mouse().on_wheel(120.0);
        settle(session, 5);
        let moved = session.end_effector_pose().translation.vector - initial.translation.vector;
        assert_close(&moved, &Vector3::new(0.0, 0.03, 0.0), 1.5e-3);
    }

    #[test]
    fn test_solver_and_model_agree_on_tool() {
        let tool = Isometry3::translation(0.0, 0.0, 0.15);
        let mut arm = SimulatedArm::mounted(Parameters::irb2400_10(), Isometry3::identity(), tool);
        let info = RobotInfo::new(&ARM_JOINTS, &STARTING_CONFIG);
        let mut solver = JacobianSolver::new(arm.kinematics(), &arm.arm_joint_names(), &info,
                                             SolverConfig::default()).unwrap();
        for (name, value) in ARM_JOINTS.iter().zip(STARTING_CONFIG) {
            arm.set_joint_value(name, value);
        }
        assert!((solver.initial_pose().translation.vector
            - arm.kinematics().forward(&STARTING_CONFIG).translation.vector).norm() < 1e-12);

        // Turning the tool tip about its own position
        let turn = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.2);
        let values = solver.solve(&Vector3::zeros(), [turn.w, turn.i, turn.j, turn.k]).unwrap();
        for (name, value) in ARM_JOINTS.iter().zip(values) {
            arm.set_joint_value(name, value);
        }
        let reached = arm.end_effector_pose();
        let expected_tip = ros_to_render() * solver.initial_pose();
        assert_close(&reached.translation.vector, &expected_tip.translation.vector, 1e-3);
        assert!((reached.rotation.angle_to(&expected_tip.rotation) - 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_shared_kinematics() {
        let arm = SimulatedArm::new(Parameters::staubli_tx2_140());
        let kinematics: Arc<dyn Kinematics> = arm.kinematics();
        let ros = kinematics.forward(&[0.0; 6]);
        let render = arm.end_effector_pose();
        assert_close(&(ros_to_render() * ros).translation.vector, &render.translation.vector, 1e-12);
    }
}

//! Real-time pose-goal pipeline for teleoperating a robot arm with the mouse or a VR controller.
//!
//! Two input producers accumulate motion into one relative goal pose: the mouse while the
//! pointer is locked to the control canvas, and the VR controller while its trigger has
//! engaged it. Only one of them owns the goal at a time. A fixed-period control loop reads
//! the goal, makes it absolute against the end effector pose captured when the session
//! started, and, if the robot is not there yet, asks an IK solver for joint values that it
//! applies to the robot model.
//!
//! # Features
//!
//! - Explicit frame conventions: the goal and the solver live in the ROS convention (Z up),
//!   the robot model, the goal marker and the controller in the render convention (Y up).
//! - Producer arbitration and goal reset on pointer lock loss, so stale motion never resumes.
//! - Fixed-period runners with immediate, idempotent cancellation, and a control loop that
//!   skips a period rather than overlapping solves.
//! - Sliding timing statistics of the loop period and the solver, reported per window.
//! - Tool arsenal for the controller grip, squeeze and touchpad gestures.
//! - Drawing and pick-and-place tasks fed with the end effector pose.
//! - A simulated six-axis ortho-parallel arm with a damped least squares Jacobian solver,
//!   usable to run the complete pipeline without external solver or renderer.
//!
//! # Configuration
//!
//! The session is configured with [`config::TeleopConfig`], that can be read from YAML when
//! the `allow_filesystem` feature (default) is enabled. Only the joint ordering of the
//! solver is mandatory, everything else has defaults.

pub mod kinematic_traits;
pub mod frame;
pub mod goal;
pub mod error;
pub mod config;
pub mod ui;

pub mod periodic;
pub mod statistics;

pub mod mouse;
pub mod controller;
pub mod arsenal;
pub mod control_loop;
pub mod task;
pub mod session;

pub mod parameters;
pub mod parameters_robots;
pub mod kinematics_impl;
pub mod tool;
pub mod jacobian;
pub mod simulated_arm;

pub mod utils;

#[cfg(test)]
mod tests;

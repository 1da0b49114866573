use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use nalgebra::Isometry3;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rs_xr_teleop::config::{RobotInfo, TeleopConfig};
use rs_xr_teleop::controller::{Polling, PoseSource};
use rs_xr_teleop::kinematic_traits::Pose;
use rs_xr_teleop::mouse::{MouseButton, PointerLock};
use rs_xr_teleop::parameters::opw_kinematics::Parameters;
use rs_xr_teleop::session::TeleopSession;
use rs_xr_teleop::ui::null_ui;
use rs_xr_teleop::utils::format_pose;

/// Drives a simulated arm through a scripted mouse session and prints where it went.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Session configuration (YAML). Without it, the simulated arm defaults are used.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of control periods to run.
    #[arg(long, default_value_t = 400)]
    ticks: u32,

    /// Run the control loop on its own thread in real time instead of stepping it.
    #[arg(long)]
    realtime: bool,

    /// Simulated arm: irb2400_10, igus_rebel, kuka_kr6_r700_sixx or staubli_tx2_140.
    #[arg(long, default_value = "irb2400_10")]
    robot: String,
}

/// Pointer lock that is always granted.
struct Canvas;

impl PointerLock for Canvas {
    fn request_pointer_lock(&mut self) -> bool {
        true
    }

    fn exit_pointer_lock(&mut self) {}
}

/// No VR runtime in the demo.
struct NoController;

impl PoseSource for NoController {
    fn world_pose(&self) -> Option<Pose> {
        None
    }
}

fn default_config() -> TeleopConfig {
    TeleopConfig::for_robot(RobotInfo::new(
        &["joint_1", "joint_2", "joint_3", "joint_4", "joint_5", "joint_6"],
        &[0.0, 0.3, -0.2, 0.0, 0.6, 0.0],
    ))
}

#[cfg(feature = "allow_filesystem")]
fn load_config(args: &Args) -> Result<TeleopConfig> {
    match &args.config {
        Some(path) => TeleopConfig::from_yaml_file(path)
            .with_context(|| format!("Reading the session configuration from {}", path.display())),
        None => Ok(default_config()),
    }
}

#[cfg(not(feature = "allow_filesystem"))]
fn load_config(args: &Args) -> Result<TeleopConfig> {
    match &args.config {
        Some(_) => Err(anyhow!("Built without the allow_filesystem feature, --config is not supported")),
        None => Ok(default_config()),
    }
}

/// Mouse input of one period: the script moves forward and sideways, turns, steps the wheel
/// and lets the robot settle, a quarter of the run each.
fn scripted_input(session: &mut TeleopSession, tick: u32, ticks: u32) {
    let quarter = (ticks / 4).max(1);
    let mouse = session.mouse();
    match tick / quarter {
        0 => {
            mouse.on_mouse_move(-5.0, -10.0);
        }
        1 => {
            if tick % quarter == 0 {
                mouse.on_mouse_down(MouseButton::Secondary);
            }
            mouse.on_mouse_move(4.0, 0.0);
        }
        2 => {
            if tick % 20 == 0 {
                mouse.on_wheel(-100.0);
            }
        }
        _ => {}
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let parameters = Parameters::by_name(&args.robot)
        .ok_or_else(|| anyhow!("Unknown robot {}", args.robot))?;
    let period = config.control_loop.period();

    let mut session = TeleopSession::simulated(config, parameters, Isometry3::identity(),
                                               Arc::new(NoController), null_ui(), Polling::Manual)
        .context("Starting the teleoperation session")?;
    info!("Robot {}:\n{}", args.robot, parameters.to_yaml());
    println!("Initial end effector: {}", format_pose(&session.end_effector_pose()));

    let mut canvas = Canvas;
    session.mouse().on_canvas_click(&mut canvas)?;

    if args.realtime {
        session.start()?;
        for tick in 0..args.ticks {
            scripted_input(&mut session, tick, args.ticks);
            spin_sleep::sleep(period);
        }
        session.stop();
    } else {
        for tick in 0..args.ticks {
            scripted_input(&mut session, tick, args.ticks);
            session.step().context("Control loop period")?;
        }
    }

    {
        let control = session.control().lock();
        println!("Target:              {}", format_pose(&control.target()));
        println!("Reached:             {}", format_pose(&control.model().lock().end_effector_pose()));
        println!("Periods: {}, solves: {}", control.ticks(), control.solves());
        match control.last_report() {
            Some(report) => {
                if let Some(ticks) = report.tick_intervals {
                    println!("Period:      {}", ticks);
                }
                if let Some(solver) = report.solver_durations {
                    println!("Solver time: {}", solver);
                }
            }
            None => println!("Not enough solves for a timing window"),
        }
    }

    // Losing the pointer lock drops the goal, the robot returns to where it started
    session.mouse().exit(&mut canvas);
    for _ in 0..20 {
        session.step()?;
    }
    println!("After unlock:        {}", format_pose(&session.end_effector_pose()));

    session.shutdown();
    Ok(())
}

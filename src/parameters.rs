//! Geometric parameters of the reference six-axis arm

pub mod opw_kinematics {
    use crate::utils::deg;

    /// Parameters of an ortho-parallel arm with spherical wrist. See
    /// [parameters_robots.rs](parameters_robots.rs) for concrete robot models.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Parameters {
        /// Offset of joint 2 from the axis of joint 1, along x.
        pub a1: f64,

        /// Offset between joint 3 and the wrist, perpendicular to the forearm.
        pub a2: f64,

        /// Lateral offset between joint 1 and joint 2, zero for most arms.
        pub b: f64,

        /// Height of joint 2 above the base.
        pub c1: f64,

        /// Length of the upper arm (joint 2 to joint 3).
        pub c2: f64,

        /// Length of the forearm (joint 3 to the wrist center).
        pub c3: f64,

        /// Distance from the wrist center to the flange.
        pub c4: f64,

        /// Joint angles at which the model is in its reference zero position.
        pub offsets: [f64; 6],

        /// Direction of positive rotation for each joint, -1 reverses it.
        pub sign_corrections: [i8; 6],
    }

    impl Parameters {
        /// Convert to string yaml representation (quick viewing, etc).
        pub fn to_yaml(&self) -> String {
            format!(
                "opw_kinematics_geometric_parameters:\n  \
              a1: {}\n  \
              a2: {}\n  \
              b: {}\n  \
              c1: {}\n  \
              c2: {}\n  \
              c3: {}\n  \
              c4: {}\n\
            opw_kinematics_joint_offsets: [{}]\n\
            opw_kinematics_joint_sign_corrections: [{}]\n",
                self.a1,
                self.a2,
                self.b,
                self.c1,
                self.c2,
                self.c3,
                self.c4,
                self.offsets.iter().map(deg)
                    .collect::<Vec<_>>().join(","),
                self.sign_corrections.iter().map(|x| x.to_string())
                    .collect::<Vec<_>>().join(","),
            )
        }

        /// Longest distance the flange can be from joint 2, ignoring joint limits.
        pub fn reach(&self) -> f64 {
            self.c2 + (self.a2 * self.a2 + self.c3 * self.c3).sqrt() + self.c4
        }
    }
}

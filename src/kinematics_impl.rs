use crate::kinematic_traits::{Joints, Kinematics, Pose};
use crate::parameters::opw_kinematics::Parameters;
use nalgebra::{Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};

/// Forward kinematics of an ortho-parallel arm with spherical wrist.
#[derive(Debug, Clone, Copy)]
pub struct OPWKinematics {
    parameters: Parameters,
}

impl OPWKinematics {
    /// Creates a new `OPWKinematics` instance with the given parameters.
    pub fn new(parameters: Parameters) -> Self {
        OPWKinematics { parameters }
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

impl Kinematics for OPWKinematics {
    fn forward(&self, joints: &Joints) -> Pose {
        let p = &self.parameters;
        let q: [f64; 6] = std::array::from_fn(|i| joints[i] * p.sign_corrections[i] as f64 - p.offsets[i]);

        let psi3 = f64::atan2(p.a2, p.c3);
        let k = f64::sqrt(p.a2 * p.a2 + p.c3 * p.c3);

        // Wrist center in the plane of the arm, then turned by joint 1
        let cx1 = p.c2 * f64::sin(q[1]) + k * f64::sin(q[1] + q[2] + psi3) + p.a1;
        let cy1 = p.b;
        let cz1 = p.c2 * f64::cos(q[1]) + k * f64::cos(q[1] + q[2] + psi3);

        let cx0 = cx1 * f64::cos(q[0]) - cy1 * f64::sin(q[0]);
        let cy0 = cx1 * f64::sin(q[0]) + cy1 * f64::cos(q[0]);
        let cz0 = cz1 + p.c1;

        let (s1, c1) = q[0].sin_cos();
        let (s2, c2) = q[1].sin_cos();
        let (s3, c3) = q[2].sin_cos();
        let (s4, c4) = q[3].sin_cos();
        let (s5, c5) = q[4].sin_cos();
        let (s6, c6) = q[5].sin_cos();

        let r_0c = Matrix3::new(
            c1 * c2 * c3 - c1 * s2 * s3, -s1, c1 * c2 * s3 + c1 * s2 * c3,
            s1 * c2 * c3 - s1 * s2 * s3, c1, s1 * c2 * s3 + s1 * s2 * c3,
            -s2 * c3 - c2 * s3, 0.0, -s2 * s3 + c2 * c3,
        );

        let r_ce = Matrix3::new(
            c4 * c5 * c6 - s4 * s6, -c4 * c5 * s6 - s4 * c6, c4 * s5,
            s4 * c5 * c6 + c4 * s6, -s4 * c5 * s6 + c4 * c6, s4 * s5,
            -s5 * c6, s5 * s6, c5,
        );

        let r_oe = r_0c * r_ce;

        let translation = Vector3::new(cx0, cy0, cz0) + p.c4 * r_oe * Vector3::z();
        let rotation = Rotation3::from_matrix_unchecked(r_oe);

        Pose::from_parts(Translation3::from(translation),
                         UnitQuaternion::from_rotation_matrix(&rotation))
    }
}

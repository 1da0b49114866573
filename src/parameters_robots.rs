//! Hardcoded parameters for the arms the simulated session can drive

pub mod opw_kinematics {
    use crate::parameters::opw_kinematics::Parameters;
    use std::f64::consts::PI;

    impl Default for Parameters {
        fn default() -> Self {
            Self::irb2400_10()
        }
    }

    impl Parameters {
        /// All lengths zero, no offsets, no sign corrections.
        pub fn new() -> Self {
            Parameters {
                a1: 0.0,
                a2: 0.0,
                b: 0.0,
                c1: 0.0,
                c2: 0.0,
                c3: 0.0,
                c4: 0.0,
                offsets: [0.0; 6],
                sign_corrections: [1; 6],
            }
        }

        /// Parameters by robot name as accepted on the command line.
        pub fn by_name(name: &str) -> Option<Self> {
            match name {
                "irb2400_10" => Some(Self::irb2400_10()),
                "igus_rebel" => Some(Self::igus_rebel()),
                "kuka_kr6_r700_sixx" => Some(Self::kuka_kr6_r700_sixx()),
                "staubli_tx2_140" => Some(Self::staubli_tx2_140()),
                _ => None,
            }
        }

        pub fn irb2400_10() -> Self {
            Parameters {
                a1: 0.100,
                a2: -0.135,
                b: 0.000,
                c1: 0.615,
                c2: 0.705,
                c3: 0.755,
                c4: 0.085,
                offsets: [0.0, 0.0, -PI / 2.0, 0.0, 0.0, 0.0],
                ..Self::new()
            }
        }

        pub fn igus_rebel() -> Self {
            Parameters {
                a1: 0.149,
                a2: -0.119,
                b: 0.,
                c1: 0.1,
                c2: 0.2384,
                c3: 0.17,
                c4: 0.1208,
                offsets: [0.0; 6],
                sign_corrections: [-1, 1, 1, 1, 1, 1],
            }
        }

        pub fn kuka_kr6_r700_sixx() -> Self {
            Parameters {
                a1: 0.025,
                a2: -0.035,
                b: 0.000,
                c1: 0.400,
                c2: 0.315,
                c3: 0.365,
                c4: 0.080,
                offsets: [0.0, -PI / 2.0, 0.0, 0.0, 0.0, 0.0],
                sign_corrections: [-1, 1, 1, -1, 1, -1],
            }
        }

        // See https://www.staubli.com/content/dam/robotics/products/robots/tx2/TX2-140-160-datasheet-EN.pdf.
        pub fn staubli_tx2_140() -> Self {
            Parameters {
                a1: 0.150,
                a2: 0.000,
                b: 0.000,
                c1: 0.550,
                c2: 0.625,
                c3: 0.625,
                c4: 0.110,
                ..Self::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parameters::opw_kinematics::Parameters;

    #[test]
    fn test_by_name() {
        assert_eq!(Parameters::by_name("irb2400_10"), Some(Parameters::irb2400_10()));
        assert_eq!(Parameters::by_name("staubli_tx2_140"), Some(Parameters::staubli_tx2_140()));
        assert_eq!(Parameters::by_name("unknown"), None);
        assert_eq!(Parameters::default(), Parameters::irb2400_10());
    }
}

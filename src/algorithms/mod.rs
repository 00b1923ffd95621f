//! Lucas-Kanade image alignment.
//!
//! Three formulations of the same Gauss-Newton problem share the
//! [`AlignBase`] driver and differ in where the Jacobian and gradient are
//! evaluated and how increments are composed with the current warp. See
//! Baker & Matthews, "Lucas-Kanade 20 Years On: A Unifying Framework".

pub mod align_base;
pub mod forward_additive;
pub mod forward_compositional;
pub mod inverse_compositional;
pub mod normal_equations;

pub use align_base::{AlignBase, AlignmentAlgorithm, LevelContext, SingleStepResult};
pub use forward_additive::{AlignForwardAdditive, ForwardAdditive};
pub use forward_compositional::{AlignForwardCompositional, ForwardCompositional};
pub use inverse_compositional::{AlignInverseCompositional, InverseCompositional};
pub use normal_equations::NormalEquations;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmKind {
    ForwardAdditive,
    ForwardCompositional,
    InverseCompositional,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 3] = [
        AlgorithmKind::ForwardAdditive,
        AlgorithmKind::ForwardCompositional,
        AlgorithmKind::InverseCompositional,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmKind::ForwardAdditive => "forward-additive",
            AlgorithmKind::ForwardCompositional => "forward-compositional",
            AlgorithmKind::InverseCompositional => "inverse-compositional",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlgorithmKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "forward-additive" | "fa" => Ok(AlgorithmKind::ForwardAdditive),
            "forward-compositional" | "fc" => Ok(AlgorithmKind::ForwardCompositional),
            "inverse-compositional" | "ic" => Ok(AlgorithmKind::InverseCompositional),
            other => Err(anyhow::anyhow!("Unknown alignment algorithm: {}", other)),
        }
    }
}

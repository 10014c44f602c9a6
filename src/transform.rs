use std::fmt;
use clap::ValueEnum;

/// Transformation applied by MultiStackReg when aligning a channel pair
///
/// The display strings are the exact names the Fiji macro expects.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum TransformationType {
    #[default]
    #[value(name = "Rigid Body", alias = "rigid-body")]
    RigidBody,
    #[value(name = "Translation", alias = "translation")]
    Translation,
    #[value(name = "Scaled Rotation", alias = "scaled-rotation")]
    ScaledRotation,
    #[value(name = "Affine", alias = "affine")]
    Affine,
}

impl fmt::Display for TransformationType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransformationType::RigidBody => write!(f, "Rigid Body"),
            TransformationType::Translation => write!(f, "Translation"),
            TransformationType::ScaledRotation => write!(f, "Scaled Rotation"),
            TransformationType::Affine => write!(f, "Affine"),
        }
    }
}

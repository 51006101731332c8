//! tiepoint-transform - Fitting image-to-map transforms from tie points
//!
//! This crate fits the mapping from image pixels to Web Mercator meters:
//!
//! - Linear families: translation, rotation/scale/translation, affine
//! - Projective (homography) transforms
//! - Quadratic transforms, including the analytically invertible
//!   [`Quadratic2Transform`]
//! - An orbital pinhole [`CameraModelTransform`] seeded from metadata
//! - Automatic family selection by tie-point count
//! - JSON records for storing fitted transforms
//!
//! Nonlinear families are refined with Levenberg-Marquardt
//! (see [`optimize`]).

pub mod camera;
mod error;
pub mod linear;
pub mod optimize;
pub mod projective;
pub mod quadratic;
pub mod ray;
pub mod serial;
pub mod transform;

pub use camera::{
    CameraMetadata, CameraMetadataSource, CameraModelTransform, ImageId, StaticMetadataSource,
};
pub use error::{TransformError, TransformResult};
pub use linear::{
    AffineTransform, LinearTransform, RotateScaleTranslateTransform, RstParams,
    TranslateTransform,
};
pub use optimize::{OptimizeReport, SolveOptions, optimize};
pub use projective::{ProjectiveTransform, projective_inverse};
pub use quadratic::{QUADRATIC2_SCALE, Quadratic2Transform, QuadraticTransform, solve_quad};
pub use serial::SerializedTransform;
pub use transform::{
    PointTransform, Transform, TransformKind, fit_transform, select_transform_kind,
};

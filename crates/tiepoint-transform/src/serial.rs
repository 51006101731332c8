//! JSON records for fitted transforms
//!
//! A record carries the family tag under `type` plus whichever fields that
//! family needs:
//!
//! | type                   | fields                            |
//! |------------------------|-----------------------------------|
//! | `translate`            | `matrix`                          |
//! | `rotateScaleTranslate` | `params` (`tx, ty, scale, theta`), `matrix` |
//! | `affine`, `projective` | `matrix` (3x3)                    |
//! | `quadratic`            | `matrix` (3x5)                    |
//! | `quadratic2`           | `matrix` (3x3), `quadraticTerms`  |
//! | `cameraModel`          | `params`, `imageId`, `width`, `height` |
//!
//! `CameraModelTransform` is accepted as an alias of `cameraModel`.

use crate::camera::{CameraMetadataSource, CameraModelTransform, ImageId};
use crate::error::{TransformError, TransformResult};
use crate::linear::{
    AffineTransform, RotateScaleTranslateTransform, RstParams, TranslateTransform,
};
use crate::projective::ProjectiveTransform;
use crate::quadratic::{Quadratic2Transform, QuadraticTransform};
use crate::transform::{Transform, TransformKind};
use nalgebra::storage::RawStorage;
use nalgebra::{Dim, Matrix, Matrix3, Matrix3x5};
use serde::{Deserialize, Serialize};

/// Serialized form of a [`Transform`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedTransform {
    #[serde(rename = "type")]
    pub kind: TransformKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quadratic_terms: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl SerializedTransform {
    fn new(kind: TransformKind) -> Self {
        Self {
            kind,
            matrix: None,
            params: None,
            quadratic_terms: None,
            image_id: None,
            width: None,
            height: None,
        }
    }

    fn with_matrix<R, C, S>(mut self, m: &Matrix<f64, R, C, S>) -> Self
    where
        R: Dim,
        C: Dim,
        S: RawStorage<f64, R, C>,
    {
        self.matrix = Some(rows_of(m));
        self
    }

    pub fn to_json(&self) -> TransformResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> TransformResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn require_matrix(&self) -> TransformResult<&[Vec<f64>]> {
        self.matrix
            .as_deref()
            .ok_or_else(|| missing(self.kind, "matrix"))
    }

    fn require_params(&self, len: usize) -> TransformResult<&[f64]> {
        let params = self
            .params
            .as_deref()
            .ok_or_else(|| missing(self.kind, "params"))?;
        if params.len() != len {
            return Err(TransformError::InvalidSerialization(format!(
                "{:?} expects {len} params, got {}",
                self.kind,
                params.len()
            )));
        }
        Ok(params)
    }
}

fn missing(kind: TransformKind, field: &str) -> TransformError {
    TransformError::InvalidSerialization(format!("{kind:?} record is missing {field}"))
}

fn rows_of<R: Dim, C: Dim, S: RawStorage<f64, R, C>>(m: &Matrix<f64, R, C, S>) -> Vec<Vec<f64>> {
    m.row_iter().map(|row| row.iter().copied().collect()).collect()
}

/// Flatten nested rows after checking they form an `nrows x ncols` grid.
fn flatten_rows(rows: &[Vec<f64>], nrows: usize, ncols: usize) -> TransformResult<Vec<f64>> {
    if rows.len() != nrows || rows.iter().any(|r| r.len() != ncols) {
        return Err(TransformError::InvalidSerialization(format!(
            "expected a {nrows}x{ncols} matrix"
        )));
    }
    Ok(rows.iter().flatten().copied().collect())
}

fn matrix3(rows: &[Vec<f64>]) -> TransformResult<Matrix3<f64>> {
    Ok(Matrix3::from_row_slice(&flatten_rows(rows, 3, 3)?))
}

impl Transform {
    /// Serialize into a record.
    pub fn to_serialized(&self) -> SerializedTransform {
        let record = SerializedTransform::new(self.kind());
        match self {
            Transform::Translate(t) => record.with_matrix(t.matrix()),
            Transform::RotateScaleTranslate(t) => SerializedTransform {
                params: Some(t.params().to_vec()),
                ..record.with_matrix(t.matrix())
            },
            Transform::Affine(t) => record.with_matrix(t.matrix()),
            Transform::Projective(t) => record.with_matrix(t.matrix()),
            Transform::Quadratic(t) => record.with_matrix(t.matrix()),
            Transform::Quadratic2(t) => SerializedTransform {
                quadratic_terms: Some(t.quadratic_terms().to_vec()),
                ..record.with_matrix(t.matrix())
            },
            Transform::CameraModel(t) => {
                let (width, height) = t.image_size();
                SerializedTransform {
                    params: Some(t.params().to_vec()),
                    image_id: t.image_id().map(ToString::to_string),
                    width: Some(width),
                    height: Some(height),
                    ..record
                }
            }
        }
    }

    /// Rebuild a transform from a record.
    ///
    /// Camera records must carry `width` and `height`; use
    /// [`Transform::from_serialized_with`] to fill them from metadata.
    pub fn from_serialized(record: &SerializedTransform) -> TransformResult<Self> {
        Self::from_serialized_with(record, None)
    }

    /// Rebuild a transform, looking up missing camera image sizes in
    /// `source`.
    pub fn from_serialized_with(
        record: &SerializedTransform,
        source: Option<&dyn CameraMetadataSource>,
    ) -> TransformResult<Self> {
        Ok(match record.kind {
            TransformKind::Translate => {
                let m = matrix3(record.require_matrix()?)?;
                Transform::Translate(TranslateTransform::new(m[(0, 2)], m[(1, 2)]))
            }
            TransformKind::RotateScaleTranslate => {
                let t = match &record.params {
                    Some(_) => {
                        let p = record.require_params(4)?;
                        RotateScaleTranslateTransform::from_params(RstParams {
                            tx: p[0],
                            ty: p[1],
                            scale: p[2],
                            theta: p[3],
                        })
                    }
                    None => RotateScaleTranslateTransform::from_matrix(&matrix3(
                        record.require_matrix()?,
                    )?),
                };
                Transform::RotateScaleTranslate(t)
            }
            TransformKind::Affine => {
                Transform::Affine(AffineTransform::from_matrix(matrix3(record.require_matrix()?)?))
            }
            TransformKind::Projective => Transform::Projective(ProjectiveTransform::from_matrix(
                matrix3(record.require_matrix()?)?,
            )),
            TransformKind::Quadratic => {
                let flat = flatten_rows(record.require_matrix()?, 3, 5)?;
                Transform::Quadratic(QuadraticTransform::from_matrix(Matrix3x5::from_row_slice(
                    &flat,
                )))
            }
            TransformKind::Quadratic2 => {
                let m = matrix3(record.require_matrix()?)?;
                let terms = record
                    .quadratic_terms
                    .as_deref()
                    .ok_or_else(|| missing(record.kind, "quadraticTerms"))?;
                let terms: [f64; 4] = terms.try_into().map_err(|_| {
                    TransformError::InvalidSerialization(
                        "quadraticTerms must have 4 entries".to_string(),
                    )
                })?;
                Transform::Quadratic2(Quadratic2Transform::new(m, terms))
            }
            TransformKind::CameraModel => {
                let p = record.require_params(5)?;
                let image_id = record
                    .image_id
                    .as_deref()
                    .map(str::parse::<ImageId>)
                    .transpose()?;
                let (width, height) = match (record.width, record.height) {
                    (Some(w), Some(h)) => (w, h),
                    _ => {
                        let meta = image_id
                            .as_ref()
                            .zip(source)
                            .and_then(|(id, source)| source.lookup(id))
                            .ok_or_else(|| {
                                TransformError::MetadataUnavailable(
                                    "camera record has no image size".to_string(),
                                )
                            })?;
                        (meta.width, meta.height)
                    }
                };
                let t = CameraModelTransform::new([p[0], p[1], p[2], p[3], p[4]], width, height);
                Transform::CameraModel(match image_id {
                    Some(id) => t.with_image_id(id),
                    None => t,
                })
            }
        })
    }

    pub fn to_json(&self) -> TransformResult<String> {
        self.to_serialized().to_json()
    }

    pub fn from_json(json: &str) -> TransformResult<Self> {
        Self::from_serialized(&SerializedTransform::from_json(json)?)
    }
}

//! Local reference frames on the shell surface

use crate::error::{ShellError, ShellResult};
use crate::math::{Mat3, Vec3};

/// Builds the right-handed orthonormal frame `[t1 t2 n]` used to express the
/// strain at a point; the third column always follows the surface normal.
pub trait Transform: Send + Sync {
    fn compute_transform(&self, xxi1: &Vec3, xxi2: &Vec3, n0: &Vec3) -> Mat3;
}

fn frame_from(t1_dir: &Vec3, n0: &Vec3) -> Mat3 {
    let n = n0.normalize();
    let t1 = (t1_dir - t1_dir.dot(&n) * n).normalize();
    let t2 = n.cross(&t1);
    Mat3::from_columns(&[t1, t2, n])
}

/// Frame aligned with the first parametric tangent
pub struct NaturalFrame;

impl Transform for NaturalFrame {
    fn compute_transform(&self, xxi1: &Vec3, _xxi2: &Vec3, n0: &Vec3) -> Mat3 {
        frame_from(xxi1, n0)
    }
}

/// Frame aligned with a fixed reference axis projected onto the tangent plane
pub struct RefAxisFrame {
    axis: Vec3,
}

impl RefAxisFrame {
    pub fn new(axis: Vec3) -> ShellResult<Self> {
        if axis.norm() < 1e-10 {
            return Err(ShellError::InvalidInput(
                "reference axis must be nonzero".into(),
            ));
        }
        Ok(Self {
            axis: axis.normalize(),
        })
    }
}

impl Transform for RefAxisFrame {
    fn compute_transform(&self, xxi1: &Vec3, _xxi2: &Vec3, n0: &Vec3) -> Mat3 {
        let n = n0.normalize();
        let proj = self.axis - self.axis.dot(&n) * n;
        if proj.norm() < 1e-10 {
            // Axis normal to the surface here; the projection is undefined.
            log::warn!("reference axis is normal to the shell surface, using the natural frame");
            return frame_from(xxi1, n0);
        }
        frame_from(&proj, n0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn check_frame(t: &Mat3, n0: &Vec3) {
        // Orthonormal, right-handed, normal-aligned.
        let eye = t.transpose() * t;
        assert_relative_eq!((eye - Mat3::identity()).norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(t.determinant(), 1.0, epsilon = 1e-12);
        let n = n0.normalize();
        for i in 0..3 {
            assert_relative_eq!(t[(i, 2)], n[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn natural_frame_follows_first_tangent() {
        let xxi1 = Vec3::new(1.0, 0.4, 0.2);
        let xxi2 = Vec3::new(-0.1, 1.0, 0.0);
        let n0 = xxi1.cross(&xxi2);
        let t = NaturalFrame.compute_transform(&xxi1, &xxi2, &n0);
        check_frame(&t, &n0);
        // t1 lies in span(xxi1, n): no component along n x xxi1.
        let c = t.column(0).dot(&n0.cross(&xxi1));
        assert_relative_eq!(c, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn ref_axis_frame_projects_the_axis() {
        let axis = Vec3::new(0.0, 1.0, 0.5);
        let tr = RefAxisFrame::new(axis).unwrap();
        let xxi1 = Vec3::new(1.0, 0.0, 0.0);
        let xxi2 = Vec3::new(0.0, 1.0, 0.0);
        let n0 = Vec3::new(0.0, 0.0, 1.0);
        let t = tr.compute_transform(&xxi1, &xxi2, &n0);
        check_frame(&t, &n0);
        // Projection of the axis onto the tangent plane is +y.
        assert_relative_eq!(t[(1, 0)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn ref_axis_rejects_zero_axis() {
        assert!(RefAxisFrame::new(Vec3::zeros()).is_err());
    }
}

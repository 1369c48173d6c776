//! Generalized force projection.
//!
//! For mode m the generalized force is the projection of the whole floor
//! force field onto the mode shape:
//!
//! ```text
//! F_m(t) = Σ_floor Fx(t)·DX_m + Fy(t)·DY_m + Mz(t)·RZ_m
//! ```
//!
//! Floors without a force column are unloaded and contribute nothing.

use hfpi_model::{ForceTable, ForcesData, ModalShape, ModelError, StructuralModel};
use nalgebra::DVector;

use crate::error::Result;

/// One generalized force history per active mode, in mode order.
pub fn project_forces(forces: &ForcesData, structure: &StructuralModel) -> Result<Vec<DVector<f64>>> {
    if !forces.is_scaled() {
        return Err(ModelError::NotScaled.into());
    }
    forces.check_floors(structure.num_floors())?;

    structure
        .active_modes()
        .map(|(_, shape)| project_onto_shape(forces, shape))
        .collect()
}

/// Generalized force for a single shape.
///
/// # Errors
/// [`ModelError::UnknownFloor`] if a force column has no row in the shape.
pub fn project_onto_shape(forces: &ForcesData, shape: &ModalShape) -> Result<DVector<f64>> {
    let mut generalized = DVector::zeros(forces.num_samples());
    accumulate(&mut generalized, forces.fx(), &shape.dx)?;
    accumulate(&mut generalized, forces.fy(), &shape.dy)?;
    accumulate(&mut generalized, forces.mz(), &shape.rz)?;
    Ok(generalized)
}

fn accumulate(out: &mut DVector<f64>, table: &ForceTable, component: &DVector<f64>) -> Result<()> {
    for (floor, column) in table.columns() {
        let weight = component.get(floor).ok_or(ModelError::UnknownFloor {
            floor,
            floors: component.len(),
        })?;
        out.axpy(*weight, &column, 1.0);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfpi_model::{DimensionalParameters, Floor, Mode};
    use nalgebra::DMatrix;

    fn structure() -> StructuralModel {
        let floors = (0..3)
            .map(|i| Floor {
                height: 3.0 * (i + 1) as f64,
                center_of_rotation: (0.0, 0.0),
                mass: 1e5,
                moment_of_inertia: 2.5e6,
                radius_of_gyration: 5.0,
            })
            .collect();
        let shapes = vec![
            ModalShape::new(vec![0.5, 1.0, 2.0], vec![0.0; 3], vec![0.0; 3]).unwrap(),
            ModalShape::new(vec![0.0; 3], vec![1.0, 1.0, 1.0], vec![0.1, 0.2, 0.3]).unwrap(),
        ];
        let modes = vec![Mode::new(1, 2.0).unwrap(), Mode::new(2, 1.0).unwrap()];
        StructuralModel::new(modes, floors, shapes, 2).unwrap()
    }

    fn scaled(fx: ForceTable, fy: ForceTable, mz: ForceTable) -> ForcesData {
        let n = fx.num_samples();
        let time = (0..n).map(|i| i as f64 * 0.01).collect();
        // unit factors: q·B·H = 1 and q·B²·H = 1
        let dims = DimensionalParameters::new(1.0, 1.0, 1.0)
            .unwrap()
            .with_air_density(2.0)
            .unwrap();
        ForcesData::new(time, fx, fy, mz).unwrap().scale(&dims).unwrap()
    }

    #[test]
    fn projects_each_component_onto_its_shape() {
        let fx = ForceTable::new(vec![0, 2], DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 2.0, 3.0]))
            .unwrap();
        let fy = ForceTable::new(vec![1], DMatrix::from_row_slice(2, 1, &[4.0, 5.0])).unwrap();
        let mz = ForceTable::new(vec![2], DMatrix::from_row_slice(2, 1, &[10.0, 20.0])).unwrap();
        let forces = scaled(fx, fy, mz);

        let projected = project_forces(&forces, &structure()).unwrap();
        assert_eq!(projected.len(), 2);
        // mode 1: Fx·DX with floor 1 unloaded
        assert_eq!(projected[0][0], 1.0 * 0.5 + 1.0 * 2.0);
        assert_eq!(projected[0][1], 2.0 * 0.5 + 3.0 * 2.0);
        // mode 2: Fy·DY + Mz·RZ
        assert_eq!(projected[1][0], 4.0 + 10.0 * 0.3);
        assert_eq!(projected[1][1], 5.0 + 20.0 * 0.3);
    }

    #[test]
    fn refuses_non_dimensional_forces() {
        let t = || ForceTable::new(vec![0], DMatrix::zeros(2, 1)).unwrap();
        let raw = ForcesData::new(vec![0.0, 1.0], t(), t(), t()).unwrap();
        let err = project_forces(&raw, &structure()).expect_err("should fail");
        assert!(err.to_string().contains("non-dimensional"));
    }

    #[test]
    fn rejects_force_column_outside_model() {
        let t = |floor| ForceTable::new(vec![floor], DMatrix::zeros(2, 1)).unwrap();
        let forces = scaled(t(0), t(1), t(7));
        assert!(project_forces(&forces, &structure()).is_err());
    }

    #[test]
    fn single_shape_projection_checks_floor_count() {
        let t = |floor| ForceTable::new(vec![floor], DMatrix::from_element(2, 1, 1.0)).unwrap();
        let forces = scaled(t(0), t(0), t(2));
        let short = ModalShape::new(vec![1.0, 1.0], vec![1.0, 1.0], vec![1.0, 1.0]).unwrap();
        let err = project_onto_shape(&forces, &short).expect_err("floor 2 is not in the shape");
        assert!(err.to_string().contains("floor 2"), "{err}");

        let full = ModalShape::new(vec![1.0; 3], vec![2.0; 3], vec![3.0; 3]).unwrap();
        let projected = project_onto_shape(&forces, &full).unwrap();
        assert_eq!(projected[1], 1.0 + 2.0 + 3.0);
    }
}

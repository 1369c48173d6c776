//! Modal expansion: from one generalized displacement history back to
//! floor-wise physical quantities, and modal superposition.

use hfpi_model::{Axes, CaseResult, Floor, ModalShape};
use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SolverError};

/// Contribution of a single mode, every matrix shaped samples × floors.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalResponse {
    pub displacement: Axes<DMatrix<f64>>,
    pub static_equivalent_force: Axes<DMatrix<f64>>,
}

impl ModalResponse {
    pub fn new(x_gen: &DVector<f64>, shape: &ModalShape, floors: &[Floor], wp: f64) -> Result<Self> {
        Ok(Self {
            displacement: real_displacement(x_gen, shape),
            static_equivalent_force: static_equivalent_force(x_gen, shape, floors, wp)?,
        })
    }

    fn shape(&self) -> (usize, usize) {
        self.displacement.x.shape()
    }
}

/// x_gen(t)·DX, x_gen(t)·DY and x_gen(t)·RZ for every floor.
pub fn real_displacement(x_gen: &DVector<f64>, shape: &ModalShape) -> Axes<DMatrix<f64>> {
    Axes {
        x: x_gen * shape.dx.transpose(),
        y: x_gen * shape.dy.transpose(),
        z: x_gen * shape.rz.transpose(),
    }
}

/// Inertial force of the modal displacement: ωp²·M·DX, ωp²·M·DY and
/// ωp²·M·R²·RZ per floor, times x_gen(t).
///
/// # Errors
/// [`SolverError::ShapeMismatch`] unless every shape component has one row
/// per floor.
pub fn static_equivalent_force(
    x_gen: &DVector<f64>,
    shape: &ModalShape,
    floors: &[Floor],
    wp: f64,
) -> Result<Axes<DMatrix<f64>>> {
    let rows = [shape.dx.len(), shape.dy.len(), shape.rz.len()];
    if rows.iter().any(|&r| r != floors.len()) {
        return Err(SolverError::ShapeMismatch(format!(
            "shape rows {rows:?} for {} floors",
            floors.len()
        )));
    }
    let w2 = wp * wp;
    let weights = |component: &DVector<f64>, inertia: &dyn Fn(&Floor) -> f64| {
        DVector::from_iterator(
            floors.len(),
            floors
                .iter()
                .zip(component.iter())
                .map(|(floor, c)| w2 * inertia(floor) * c),
        )
    };
    let mass = |f: &Floor| f.mass;
    let rotary = |f: &Floor| f.mass * f.radius_of_gyration * f.radius_of_gyration;

    Ok(Axes {
        x: x_gen * weights(&shape.dx, &mass).transpose(),
        y: x_gen * weights(&shape.dy, &mass).transpose(),
        z: x_gen * weights(&shape.rz, &rotary).transpose(),
    })
}

/// Modal superposition: elementwise sum of every mode's contribution.
pub fn combine_modes(responses: &[ModalResponse]) -> Result<CaseResult> {
    let (first, rest) = responses.split_first().ok_or(SolverError::NoModes)?;
    let mut displacement = first.displacement.clone();
    let mut sef = first.static_equivalent_force.clone();

    for response in rest {
        if response.shape() != first.shape() {
            return Err(SolverError::ShapeMismatch(format!(
                "{:?} vs {:?}",
                response.shape(),
                first.shape()
            )));
        }
        add_assign(&mut displacement, &response.displacement);
        add_assign(&mut sef, &response.static_equivalent_force);
    }

    Ok(CaseResult::new(displacement, sef)?)
}

fn add_assign(total: &mut Axes<DMatrix<f64>>, other: &Axes<DMatrix<f64>>) {
    total.x += &other.x;
    total.y += &other.y;
    total.z += &other.z;
}

/// Directional aggregation over stored case results
///
/// Synthetic results with hand-picked static-equivalent forces for two
/// directions go through the result store; grouping by direction must
/// reproduce the known extremes exactly.
use hfpi_io::ResultStore;
use hfpi_model::{
    Axes, CaseParameters, CaseResult, DimensionalParameters, Floor, ForceTable, ForcesData,
    Parameter,
};
use hfpi_solver::{Signal, directional_table, extremes, group_by, load_completed};
use nalgebra::DMatrix;

fn floors() -> Vec<Floor> {
    [10.0, 20.0]
        .iter()
        .map(|&height| Floor {
            height,
            center_of_rotation: (0.0, 0.0),
            mass: 1e5,
            moment_of_inertia: 2.5e6,
            radius_of_gyration: 5.0,
        })
        .collect()
}

/// Result whose SEF x and y are `rows` (samples × 2 floors), z zero.
fn result(rows: &[[f64; 2]]) -> CaseResult {
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    let sef_x = DMatrix::from_row_slice(rows.len(), 2, &flat);
    let zeros = || DMatrix::zeros(rows.len(), 2);
    CaseResult::new(
        Axes {
            x: zeros(),
            y: zeros(),
            z: zeros(),
        },
        Axes {
            x: sef_x.clone(),
            y: -sef_x,
            z: zeros(),
        },
    )
    .unwrap()
}

/// Physical forces with Fx = `value` on both floors.
fn applied(value: f64) -> ForcesData {
    let dims = DimensionalParameters::new(1.0, 1.0, 1.0)
        .unwrap()
        .with_air_density(2.0)
        .unwrap();
    let fx = ForceTable::new(vec![0, 1], DMatrix::from_row_slice(2, 2, &[value, value, -value, 0.0]))
        .unwrap();
    let none = || ForceTable::new(vec![], DMatrix::zeros(2, 0)).unwrap();
    ForcesData::new(vec![0.0, 1.0], fx, none(), none())
        .unwrap()
        .scale(&dims)
        .unwrap()
}

#[test]
fn test_grouping_by_direction_reproduces_known_extremes() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultStore::open(dir.path()).unwrap();

    // direction 0: base shear x per sample = [3, 7, -4]
    let d0 = CaseParameters::new(0.0, 0.02, 50.0);
    store.save(&d0, &result(&[[1.0, 2.0], [3.0, 4.0], [-5.0, 1.0]])).unwrap();
    // direction 90: two damping ratios, base shear x = [10, -2] and [6, 0]
    let d90a = CaseParameters::new(90.0, 0.01, 50.0);
    let d90b = CaseParameters::new(90.0, 0.02, 50.0);
    store.save(&d90a, &result(&[[4.0, 6.0], [-1.0, -1.0]])).unwrap();
    store.save(&d90b, &result(&[[3.0, 3.0], [0.0, 0.0]])).unwrap();

    // a planned case without a result is skipped
    let never_ran = CaseParameters::new(180.0, 0.02, 50.0);
    let cases = load_completed(&store, &[d0, d90a, d90b, never_ran]).unwrap();
    assert_eq!(cases.len(), 3);

    let groups = group_by(&cases, Parameter::Direction);
    assert_eq!(groups.len(), 2);

    let e0 = extremes(&groups[0].cases, Signal::StaticEquivalentForce, &floors())
        .unwrap()
        .unwrap();
    assert_eq!(e0.x.min, -4.0);
    assert_eq!(e0.x.max, 7.0);
    assert_eq!(e0.x.mean, 2.0);
    assert_eq!(e0.y.min, -7.0);
    assert_eq!(e0.y.max, 4.0);

    let e90 = extremes(&groups[1].cases, Signal::StaticEquivalentForce, &floors())
        .unwrap()
        .unwrap();
    assert_eq!(e90.x.min, -2.0);
    assert_eq!(e90.x.max, 10.0);
    assert_eq!(e90.x.mean, 3.5);

    let rows = directional_table(&cases, &floors(), |p| Ok(applied(p.direction / 90.0 + 1.0)))
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].equivalent_force, e0);
    assert_eq!(rows[1].equivalent_force, e90);

    // applied Fx per sample: [2v, -v]
    assert_eq!(rows[0].static_force.x.max, 2.0);
    assert_eq!(rows[0].static_force.x.min, -1.0);
    assert_eq!(rows[1].static_force.x.max, 4.0);
    // overturning about y: Σ Fx·Z = [30v, -10v]
    assert_eq!(rows[1].static_moment.y.max, 60.0);
    assert_eq!(rows[1].static_moment.y.min, -20.0);
    // SEF overturning about y for direction 0, largest at sample 1: 3·10 + 4·20
    assert_eq!(rows[0].equivalent_moment.y.max, 110.0);
}

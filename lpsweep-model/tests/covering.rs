//! End-to-end covering model: assign rooms to workers under an hours
//! cap, paying per worker used and for overloaded shifts.

use lpsweep_core::{MicrolpSolver, ObjectiveSense, Solver, VarDomain};
use lpsweep_model::{
    BuildSpec, CostSpec, EntityTable, GroupKind, ModelBuilder, ModelInputs, TemplateRule,
};

const WORKERS: &str = "\
Worker_ID,Shift_Cost
W_1,200
W_2,200
";

const ROOMS: &str = "\
Room_ID,Cleaning_Time_Hours
R_1,2
R_2,3
R_3,4
";

fn covering_inputs() -> ModelInputs {
    let workers = EntityTable::from_reader("workers", "Worker_ID", WORKERS.as_bytes()).unwrap();
    let rooms = EntityTable::from_reader("rooms", "Room_ID", ROOMS.as_bytes()).unwrap();
    let mut inputs = ModelInputs::new();
    inputs.add_table(workers).add_table(rooms);
    inputs
}

fn covering_spec() -> BuildSpec {
    BuildSpec::new("room-covering", ObjectiveSense::Minimize)
        .with_group(
            "assign",
            GroupKind::Pair {
                rows: "workers".into(),
                cols: "rooms".into(),
            },
            VarDomain::Binary,
            CostSpec::free(),
        )
        .with_group(
            "used",
            GroupKind::PerEntity {
                table: "workers".into(),
            },
            VarDomain::Binary,
            CostSpec::free().plus_row_attr("Shift_Cost"),
        )
        .with_group(
            "overloaded",
            GroupKind::PerEntity {
                table: "workers".into(),
            },
            VarDomain::Binary,
            CostSpec::fixed(75.0),
        )
        .with_template(
            "cover",
            TemplateRule::ColCover {
                group: "assign".into(),
                times: 1.0,
            },
        )
        .with_template(
            "hours",
            TemplateRule::RowWeightedCapacity {
                group: "assign".into(),
                weight_attr: "Cleaning_Time_Hours".into(),
                cap: 8.0,
            },
        )
        .with_template(
            "activate",
            TemplateRule::Activation {
                assign_group: "assign".into(),
                flag_group: "used".into(),
            },
        )
        .with_template(
            "overload",
            TemplateRule::Indicator {
                assign_group: "assign".into(),
                flag_group: "overloaded".into(),
                weight_attr: "Cleaning_Time_Hours".into(),
                threshold: 6.0,
                big_m: None,
            },
        )
}

#[test]
fn test_toy_covering_assignment() {
    // Rooms of 2+3+4 = 9 hours across two 8-hour workers: both workers
    // are needed, and a split exists that keeps every shift at or below
    // the 6-hour overload threshold, so the optimum pays two shifts and
    // no overload premium.
    let inputs = covering_inputs();
    let model = ModelBuilder::new(&inputs).build(&covering_spec()).unwrap();
    let result = MicrolpSolver::new().solve(&model).unwrap();

    assert!(result.status.is_optimal());
    assert!((result.obj_val - 400.0).abs() < 1e-6);

    let times = [2.0, 3.0, 4.0];
    let rooms = ["R_1", "R_2", "R_3"];
    for worker in ["W_1", "W_2"] {
        let load: f64 = rooms
            .iter()
            .zip(times)
            .map(|(room, time)| {
                let var = model.var_index(&format!("assign[{worker},{room}]")).unwrap();
                time * result.x[var]
            })
            .sum();
        assert!(load <= 8.0 + 1e-6, "{worker} overloaded: {load}");
    }

    // Every room covered exactly once.
    for room in rooms {
        let covered: f64 = ["W_1", "W_2"]
            .iter()
            .map(|worker| {
                let var = model.var_index(&format!("assign[{worker},{room}]")).unwrap();
                result.x[var]
            })
            .sum();
        assert!((covered - 1.0).abs() < 1e-6, "{room} covered {covered} times");
    }

    // No overload flag set at the optimum.
    for worker in ["W_1", "W_2"] {
        let var = model.var_index(&format!("overloaded[{worker}]")).unwrap();
        assert!(result.x[var] < 0.5);
    }
}

#[test]
fn test_overload_premium_paid_when_unavoidable() {
    // Tighten the threshold to 4 hours: whichever worker takes two
    // rooms exceeds it, so exactly one overload premium is paid.
    let inputs = covering_inputs();
    let mut spec = covering_spec();
    let pos = spec.template_position("overload").unwrap();
    *spec.templates[pos].rule.param_mut().unwrap() = 4.0;

    let model = ModelBuilder::new(&inputs).build(&spec).unwrap();
    let result = MicrolpSolver::new().solve(&model).unwrap();

    assert!(result.status.is_optimal());
    assert!((result.obj_val - 475.0).abs() < 1e-6);
}

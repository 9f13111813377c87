//! Models compiled into the CLI.

use linmip_solver::{ConstraintOp, LinearExpr, Model, ModelError};

use ConstraintOp::{Eq, Ge, Le};

pub struct BundledModel {
    pub name: &'static str,
    pub description: &'static str,
    pub build: fn() -> Result<Model, ModelError>,
}

pub const MODELS: &[BundledModel] = &[
    BundledModel {
        name: "blending",
        description: "Two-product blending and production plan (LP)",
        build: blending,
    },
    BundledModel {
        name: "plant-opening",
        description: "Three plants with fixed opening costs and min/max shipments (MIP)",
        build: plant_opening,
    },
    BundledModel {
        name: "whisky",
        description: "Whisky blend profit under grade composition limits (LP)",
        build: whisky,
    },
    BundledModel {
        name: "production",
        description: "Two-product plan under shared machine capacity (LP)",
        build: production,
    },
    BundledModel {
        name: "refinery",
        description: "Crude refinery scheduling with distillation and cracking (LP)",
        build: refinery,
    },
    BundledModel {
        name: "pipes",
        description: "Flow-balanced pipe cost minimization (LP)",
        build: pipes,
    },
];

pub fn find(name: &str) -> Option<&'static BundledModel> {
    MODELS.iter().find(|m| m.name == name)
}

/// Declare nonnegative continuous variables, binding each to a local.
macro_rules! continuous {
    ($model:expr, $($var:ident = $name:literal),+ $(,)?) => {
        $(let $var = $model.add_continuous($name)?;)+
    };
}

fn blending() -> Result<Model, ModelError> {
    let mut m = Model::new("blending");
    continuous!(
        m,
        a1 = "A1", b1 = "B1", a2 = "A2", b2 = "B2", sm = "SM", y = "Y", v = "V", w = "W",
        hmu = "HMU", hn = "HN", he = "HE", ya = "YA", yb = "YB", va = "VA", vb = "VB",
        wa = "WA", wb = "WB", a = "A", b = "B",
    );

    m.maximize(
        35.0 * a1 + 30.0 * b1 + 28.0 * a2 + 24.0 * b2 + 150.0 * sm
            - 7.0 * y
            - 9.0 * v
            - 5.0 * w
            - 100.0 * hmu
            - 5.0 * hn
            - 7.0 * he,
    )?;

    m.add_constraint(ya + yb - y, Eq, 0.0, "split_y")?;
    m.add_constraint(va + vb - v, Eq, 0.0, "split_v")?;
    m.add_constraint(wa + wb - w, Eq, 0.0, "split_w")?;
    m.add_constraint(ya + va + wa - a, Eq, 0.0, "mix_a")?;
    m.add_constraint(yb + vb + wb - b, Eq, 0.0, "mix_b")?;

    // (label, Y/V/W coefficients, op, factor on A, factor on B)
    let quality: [(&str, [f64; 3], ConstraintOp, f64, f64); 11] = [
        ("capacity", [3500.0, 300.0, 500.0], Le, 3900.0, 4500.0),
        ("demand", [45.0, 60.0, 30.0], Ge, 50.0, 40.0),
        ("resource", [30.0, 25.0, 35.0], Le, 30.0, 33.0),
        ("w_share", [0.0, 0.0, 4.0], Le, 3.0, 3.0),
        ("min", [150.0, 130.0, 50.0], Ge, 70.0, 80.0),
        ("max", [150.0, 130.0, 50.0], Le, 130.0, 140.0),
        ("min2", [40.0, 70.0, 50.0], Ge, 45.0, 45.0),
        ("min3", [5.7, 3.3, 4.1], Ge, 3.7, 3.5),
        ("min4", [20.0, 30.0, 20.0], Ge, 22.0, 22.0),
        ("w_share2", [0.0, 0.0, 12.0], Le, 5.0, 10.0),
        ("min5", [130.0, 180.0, 100.0], Ge, 140.0, 120.0),
    ];
    for (label, [cy, cv, cw], op, fa, fb) in quality {
        m.add_constraint(cy * ya + cv * va + cw * wa - fa * a, op, 0.0, format!("{}_a", label))?;
        m.add_constraint(cy * yb + cv * vb + cw * wb - fb * b, op, 0.0, format!("{}_b", label))?;
    }

    m.add_constraint(0.0667 * a + 0.05 * b - hmu, Eq, 0.0, "hours_hmu")?;
    m.add_constraint(hmu + sm, Eq, 24.0, "hours_day")?;
    m.add_constraint(0.5 * a + 0.4 * b - hn - he, Eq, 0.0, "hours_labour")?;
    m.add_constraint(hn, Le, 150.0, "hours_normal")?;
    m.add_constraint(he, Le, 30.0, "hours_extra")?;

    m.add_constraint(a1 + a2 - a, Eq, 0.0, "sales_a")?;
    m.add_constraint(b1 + b2 - b, Eq, 0.0, "sales_b")?;
    m.add_constraint(a1, Eq, 150.0, "contract_a")?;
    m.add_constraint(b1, Eq, 200.0, "contract_b")?;

    Ok(m)
}

fn plant_opening() -> Result<Model, ModelError> {
    const DEMAND: [f64; 3] = [2500.0, 1800.0, 3500.0];
    // (name, fixed cost, unit cost, max per route, min per route)
    const PLANTS: [(&str, f64, f64, f64, f64); 3] = [
        ("A", 4000.0, 6.0, 2300.0, 400.0),
        ("B", 3000.0, 5.0, 2000.0, 300.0),
        ("C", 2000.0, 8.0, 3300.0, 500.0),
    ];

    let mut m = Model::new("plant-opening");
    let mut objective = LinearExpr::new();
    let mut served = vec![LinearExpr::new(); DEMAND.len()];

    for (plant, fixed, unit, max, min) in PLANTS {
        let open = m.add_binary(format!("I{}", plant))?;
        objective += fixed * open;
        for (route, total) in served.iter_mut().enumerate() {
            let ship = m.add_continuous(format!("{}{}", plant, route + 1))?;
            objective += unit * ship;
            *total += ship;
            m.add_constraint(ship - max * open, Le, 0.0, format!("cap_{}{}", plant, route + 1))?;
            m.add_constraint(ship - min * open, Ge, 0.0, format!("min_{}{}", plant, route + 1))?;
        }
    }
    for (route, (expr, demand)) in served.into_iter().zip(DEMAND).enumerate() {
        m.add_constraint(expr, Eq, demand, format!("demand_{}", route + 1))?;
    }

    m.minimize(objective)?;
    Ok(m)
}

fn whisky() -> Result<Model, ModelError> {
    let mut m = Model::new("whisky");
    continuous!(
        m,
        a = "A", b = "B", c = "C", e = "E", k = "K", t = "T", ae = "AE", ak = "AK", at = "AT",
        be = "BE", bk = "BK", bt = "BT", ce = "CE", ck = "CK", ct = "CT",
    );

    m.maximize(6.8 * e + 5.7 * k + 4.5 * t - 7.0 * a - 5.0 * b - 4.0 * c)?;

    m.add_constraint(a, Le, 2000.0, "supply_a")?;
    m.add_constraint(b, Le, 2500.0, "supply_b")?;
    m.add_constraint(c, Le, 1200.0, "supply_c")?;
    m.add_constraint(ae + ak + at - a, Eq, 0.0, "use_a")?;
    m.add_constraint(be + bk + bt - b, Eq, 0.0, "use_b")?;
    m.add_constraint(ce + ck + ct - c, Eq, 0.0, "use_c")?;
    m.add_constraint(ae + be + ce - e, Eq, 0.0, "blend_e")?;
    m.add_constraint(ak + bk + ck - k, Eq, 0.0, "blend_k")?;
    m.add_constraint(at + bt + ct - t, Eq, 0.0, "blend_t")?;
    m.add_constraint(0.6 * e - ae, Le, 0.0, "e_min_a")?;
    m.add_constraint(ce - 0.2 * e, Le, 0.0, "e_max_c")?;
    m.add_constraint(0.15 * k - ak, Le, 0.0, "k_min_a")?;
    m.add_constraint(ck - 0.6 * k, Le, 0.0, "k_max_c")?;
    m.add_constraint(ct - 0.5 * t, Le, 0.0, "t_max_c")?;

    Ok(m)
}

fn production() -> Result<Model, ModelError> {
    let mut m = Model::new("production");
    continuous!(m, xa = "XA", xc = "XC");

    m.maximize(15000.0 * xa + 12500.0 * xc)?;

    m.add_constraint(xa * (1.0 / 25000.0) + xc * (1.0 / 40000.0), Le, 1.0, "machine_1")?;
    m.add_constraint(xa * (1.0 / 33333.0) + xc * (1.0 / 16667.0), Le, 1.0, "machine_2")?;
    m.add_constraint(xa, Le, 22500.0, "market_a")?;
    m.add_constraint(xc, Le, 15000.0, "market_c")?;
    m.add_constraint(xa, Ge, 12000.0, "contract_a")?;
    m.add_constraint(xc, Ge, 8000.0, "contract_c")?;
    m.add_constraint(xa, Le, 18000.0, "storage_a")?;

    Ok(m)
}

fn refinery() -> Result<Model, ModelError> {
    let mut m = Model::new("refinery");
    continuous!(
        m,
        nfc = "NFC", doc = "DOC", foc = "FOC", sacps = "SACPS", tdfps = "TDFPS",
        chups = "CHUPS", salps = "SALPS", neups = "NEUPS", aps = "APS", acc = "ACC",
        nfvnf = "NFVNF", nfvfo = "NFVFO", dovcc = "DOVCC", dovdo = "DOVDO", dovfo = "DOVFO",
        gopcc = "GOPCC", crrfo = "CRRFO", nccnf = "NCCNF", nccdo = "NCCDO", dccdo = "DCCDO",
        dccfo = "DCCFO",
    );

    m.maximize(
        35.0 * nfc + 30.0 * doc + 24.0 * foc
            - 27.0 * sacps
            - 25.0 * tdfps
            - 23.0 * chups
            - 22.0 * salps
            - 20.0 * neups
            - 0.4 * aps
            - 0.25 * acc,
    )?;

    let crudes = [sacps, tdfps, chups, salps, neups];
    let crude_mix = |yields: [f64; 5]| -> LinearExpr { crudes.iter().zip(yields).map(|(&x, y)| y * x).sum() };

    m.add_constraint(crudes.iter().copied().sum::<LinearExpr>() - aps, Eq, 0.0, "distillation_feed")?;
    m.add_constraint(aps, Le, 500.0, "distillation_capacity")?;
    for (crude, (name, cap)) in crudes
        .iter()
        .zip([("sac", 120.0), ("tdf", 120.0), ("chu", 150.0), ("sal", 110.0), ("neu", 150.0)])
    {
        m.add_constraint(*crude, Le, cap, format!("supply_{}", name))?;
    }

    m.add_constraint(
        crude_mix([0.22, 0.2, 0.15, 0.08, 0.03]) - nfvnf - nfvfo,
        Eq,
        0.0,
        "yield_naphtha",
    )?;
    m.add_constraint(
        crude_mix([0.28, 0.26, 0.3, 0.26, 0.28]) - dovcc - dovdo - dovfo,
        Eq,
        0.0,
        "yield_diesel",
    )?;
    m.add_constraint(crude_mix([0.4, 0.37, 0.35, 0.3, 0.32]) - gopcc, Eq, 0.0, "yield_gasoil")?;
    m.add_constraint(crude_mix([0.08, 0.15, 0.18, 0.24, 0.35]) - crrfo, Eq, 0.0, "yield_residue")?;

    m.add_constraint(dovcc + gopcc - acc, Eq, 0.0, "cracker_feed")?;
    m.add_constraint(acc, Le, 395.0, "cracker_capacity")?;
    m.add_constraint(0.25 * dovcc + 0.55 * gopcc - nccnf - nccdo, Eq, 0.0, "cracked_naphtha")?;
    m.add_constraint(0.85 * dovcc + 0.6 * gopcc - dccdo - dccfo, Eq, 0.0, "cracked_diesel")?;

    m.add_constraint(nfvnf + nccnf - nfc, Eq, 0.0, "naphtha_blend")?;
    m.add_constraint(59.0 * nfvnf + 98.0 * nccnf - 80.0 * nfc, Ge, 0.0, "naphtha_octane")?;
    m.add_constraint(nfc, Ge, 150.0, "naphtha_min")?;
    m.add_constraint(nfc, Le, 350.0, "naphtha_max")?;

    m.add_constraint(dovdo + dccdo + nccdo - doc, Eq, 0.0, "diesel_blend")?;
    m.add_constraint(nccdo - 0.1 * doc, Le, 0.0, "diesel_naphtha_share")?;
    m.add_constraint(doc, Ge, 150.0, "diesel_min")?;
    m.add_constraint(doc, Le, 350.0, "diesel_max")?;

    m.add_constraint(nfvfo + dovfo + dccfo + crrfo - foc, Eq, 0.0, "fuel_blend")?;
    m.add_constraint(
        60.0 * nfvfo + 42.0 * dovfo + 52.0 * dccfo + 14.0 * crrfo - 21.0 * foc,
        Ge,
        0.0,
        "fuel_viscosity",
    )?;
    m.add_constraint(foc, Le, 400.0, "fuel_max")?;

    Ok(m)
}

fn pipes() -> Result<Model, ModelError> {
    let mut m = Model::new("pipes");
    continuous!(
        m,
        r1 = "R1", r2 = "R2", r3 = "R3", r4 = "R4", r5 = "R5", r6 = "R6", va = "VA", v4 = "V4",
        vb = "VB",
    );

    m.minimize(16.0 * r1 + 36.0 * r2 + 64.0 * r3 + 324.0 * r4 + 100.0 * r5 + 64.0 * r6)?;

    let links = [(va, r1, 4.0), (va, r2, 6.0), (va, r3, 8.0), (v4, r4, 18.0), (vb, r5, 10.0), (vb, r6, 8.0)];
    for (i, (flow, r, k)) in links.into_iter().enumerate() {
        m.add_constraint(flow - k * r, Eq, 0.0, format!("link_{}", i + 1))?;
    }
    for (name, flow) in [("a", va), ("4", v4), ("b", vb)] {
        m.add_constraint(flow, Le, 10.0, format!("flow_{}_max", name))?;
        m.add_constraint(flow, Ge, 2.0, format!("flow_{}_min", name))?;
    }

    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use linmip_solver::{solve, SolutionStatus};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!((actual - expected).abs() <= tol, "got {} (expected {})", actual, expected);
    }

    #[test]
    fn test_every_model_builds_and_solves() {
        for bundled in MODELS {
            let model = (bundled.build)().unwrap();
            let solution = solve(&model).unwrap();

            assert_eq!(solution.status(), SolutionStatus::Optimal, "model {}", bundled.name);
            assert!(
                model.is_feasible(solution.values().unwrap(), 1e-5),
                "model {} solution violates a constraint",
                bundled.name
            );
        }
    }

    #[test]
    fn test_names_are_unique() {
        for (i, bundled) in MODELS.iter().enumerate() {
            assert!(MODELS[i + 1..].iter().all(|other| other.name != bundled.name));
            assert!(find(bundled.name).is_some());
        }
        assert!(find("missing").is_none());
    }

    #[test]
    fn test_pipes_optimum() {
        // Every flow sits at its minimum of 2
        let solution = solve(&pipes().unwrap()).unwrap();
        assert_close(solution.objective_value().unwrap(), 108.0, 1e-6);
        for name in ["VA", "V4", "VB"] {
            assert_close(solution.value_by_name(name).unwrap(), 2.0, 1e-6);
        }
    }

    #[test]
    fn test_production_optimum() {
        // Product C stays at its contract minimum; machine 2 limits product A
        let solution = solve(&production().unwrap()).unwrap();
        let xa = 33333.0 * (1.0 - 8000.0 / 16667.0);

        assert_close(solution.value_by_name("XC").unwrap(), 8000.0, 1e-4);
        assert_close(solution.value_by_name("XA").unwrap(), xa, 1e-4);
        assert_close(solution.objective_value().unwrap(), 15000.0 * xa + 12500.0 * 8000.0, 1e-2);
        assert!(solution.binding_constraints(1e-6).contains(&"machine_2"));
    }

    #[test]
    fn test_plant_opening_opens_a_and_b() {
        let solution = solve(&plant_opening().unwrap()).unwrap();

        assert!(solution.is_mip());
        assert_close(solution.objective_value().unwrap(), 48400.0, 1e-3);
        assert_eq!(solution.value_by_name("IA"), Some(1.0));
        assert_eq!(solution.value_by_name("IB"), Some(1.0));
        assert_eq!(solution.value_by_name("IC"), Some(0.0));
        assert_close(solution.value_by_name("B1").unwrap(), 2000.0, 1e-4);
        assert_close(solution.value_by_name("A2").unwrap(), 400.0, 1e-4);
    }

    #[test]
    fn test_blending_honours_contracts() {
        let solution = solve(&blending().unwrap()).unwrap();

        assert_close(solution.value_by_name("A1").unwrap(), 150.0, 1e-6);
        assert_close(solution.value_by_name("B1").unwrap(), 200.0, 1e-6);
        let hours = solution.value_by_name("HMU").unwrap() + solution.value_by_name("SM").unwrap();
        assert_close(hours, 24.0, 1e-6);
    }
}

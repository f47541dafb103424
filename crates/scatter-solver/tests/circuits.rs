//! End-to-end circuit evaluation on every available backend.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::Arc;

use nalgebra::DVector;
use num_complex::Complex64;
use scatter_devices::{PortSpec, unitary};
use scatter_model::{
    FnModel, Instance, Model, ModelMap, Netlist, Params, SDict, SMatrix, ScatterError, SharedModel,
};
use scatter_solver::{
    AdditiveBackend, Backend, BackendRegistry, Circuit, CircuitOptions, FilipssonGunnarBackend,
    registry,
};

const NEFF: f64 = 2.34;

fn phase(wl: f64, length: f64) -> Complex64 {
    Complex64::from_polar(1.0, 2.0 * PI * NEFF * length / wl)
}

/// Lossless dispersionless waveguide.
fn waveguide() -> SharedModel {
    FnModel::new("waveguide", ["in0", "out0"], |p: &Params| {
        let length = p.get_or("length", 10.0);
        let samples = p.wl.samples();
        let t = DVector::from_iterator(samples.len(), samples.iter().map(|&wl| phase(wl, length)));
        let mut s = SDict::new(p.batch());
        s.insert("in0", "out0", t)?;
        Ok(s.reciprocal().into())
    })
    .shared()
}

/// Partially reflecting mirror with real reflection `r`.
fn mirror() -> SharedModel {
    FnModel::new("mirror", ["in0", "out0"], |p: &Params| {
        let r = p.get_or("r", 0.5);
        let t = Complex64::new(0.0, (1.0 - r * r).sqrt());
        let mut s = SDict::new(p.batch());
        s.insert_constant("in0", "in0", Complex64::new(r, 0.0));
        s.insert_constant("out0", "out0", Complex64::new(r, 0.0));
        s.insert_constant("in0", "out0", t);
        Ok(s.reciprocal().into())
    })
    .shared()
}

fn models() -> ModelMap {
    let mut models = ModelMap::new();
    models.insert("waveguide".to_string(), waveguide());
    models.insert("mirror".to_string(), mirror());
    models.insert("splitter".to_string(), unitary(&PortSpec::counts(1, 2)).unwrap());
    models.insert("combiner".to_string(), unitary(&PortSpec::counts(2, 1)).unwrap());
    models
}

fn mzi(delta_length: f64) -> Netlist {
    Netlist::new()
        .instance("lft", Instance::new("splitter"))
        .instance("top", Instance::new("waveguide").with_setting("length", 10.0))
        .instance(
            "btm",
            Instance::new("waveguide").with_setting("length", 10.0 + delta_length),
        )
        .instance("rgt", Instance::new("combiner"))
        .connect("lft,out0", "top,in0")
        .connect("lft,out1", "btm,in0")
        .connect("top,out0", "rgt,in0")
        .connect("btm,out0", "rgt,in1")
        .expose("in0", "lft,in0")
        .expose("out0", "rgt,out0")
}

fn fabry_perot() -> Netlist {
    Netlist::new()
        .instance("m1", Instance::new("mirror"))
        .instance("gap", Instance::new("waveguide").with_setting("length", 5.0))
        .instance("m2", Instance::new("mirror"))
        .connect("m1,out0", "gap,in0")
        .connect("gap,out0", "m2,in0")
        .expose("in0", "m1,in0")
        .expose("out0", "m2,out0")
}

fn backends() -> Vec<Arc<dyn Backend>> {
    let mut all: Vec<Arc<dyn Backend>> = vec![Arc::new(FilipssonGunnarBackend)];
    #[cfg(feature = "lapack")]
    all.push(Arc::new(scatter_solver::LapackBackend));
    all
}

fn transmission(s: &SMatrix, from: &str, to: &str) -> Vec<Complex64> {
    s.value(from, to).unwrap().iter().copied().collect()
}

#[test]
fn mzi_matches_two_path_interference() {
    let delta = 0.7;
    let wl = 1.55;
    let expected = 0.5 * (phase(wl, 10.0) + phase(wl, 10.0 + delta));

    for backend in backends() {
        let circuit =
            Circuit::with_backend("mzi", &mzi(delta), &models(), backend.clone()).unwrap();
        assert_eq!(circuit.ports(), &["in0".to_string(), "out0".to_string()]);

        let s = circuit.evaluate(&Params::wl(wl)).unwrap();
        let t = transmission(&s, "in0", "out0")[0];
        assert!(
            (t - expected).norm() < 1e-9,
            "{}: got {t}, expected {expected}",
            backend.name()
        );
        let back = transmission(&s, "out0", "in0")[0];
        assert!((back - t).norm() < 1e-9, "{} is not reciprocal", backend.name());
    }
}

#[test]
fn balanced_mzi_transmits_everything() {
    for backend in backends() {
        let circuit = Circuit::with_backend("mzi", &mzi(0.0), &models(), backend).unwrap();
        let s = circuit.evaluate(&Params::wl(1.31)).unwrap();
        assert!((transmission(&s, "in0", "out0")[0].norm() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn fabry_perot_resolves_the_feedback_loop() {
    let r: f64 = 0.5;
    let wl = 1.55;
    let t = Complex64::new(0.0, (1.0 - r * r).sqrt());
    let p = phase(wl, 5.0);
    let expected = t * p * t / (Complex64::new(1.0, 0.0) - r * r * p * p);

    for backend in backends() {
        let circuit =
            Circuit::with_backend("fp", &fabry_perot(), &models(), backend.clone()).unwrap();
        let s = circuit.evaluate(&Params::wl(wl)).unwrap();
        let got = transmission(&s, "in0", "out0")[0];
        assert!(
            (got - expected).norm() < 1e-9,
            "{}: got {got}, expected {expected}",
            backend.name()
        );

        // lossless mirrors: reflected and transmitted power add up to one
        let refl = transmission(&s, "in0", "in0")[0];
        assert!((refl.norm_sqr() + got.norm_sqr() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn backends_agree_over_a_sweep() {
    let sweep: Vec<f64> = (0..7).map(|i| 1.50 + 0.01 * i as f64).collect();
    let params = Params::wl(sweep.clone());

    let results: Vec<Vec<Complex64>> = backends()
        .into_iter()
        .map(|backend| {
            let circuit = Circuit::with_backend("fp", &fabry_perot(), &models(), backend).unwrap();
            transmission(&circuit.evaluate(&params).unwrap(), "in0", "out0")
        })
        .collect();

    for other in &results[1..] {
        for (a, b) in results[0].iter().zip(other) {
            assert!((a - b).norm() < 1e-9);
        }
    }
}

#[test]
fn sweep_equals_stacked_scalar_evaluations() {
    let sweep = vec![1.30, 1.31, 1.55, 1.60];
    for backend in backends() {
        let circuit = Circuit::with_backend("mzi", &mzi(1.3), &models(), backend).unwrap();
        let s = circuit.evaluate(&Params::wl(sweep.clone())).unwrap();
        let batched = transmission(&s, "in0", "out0");
        assert_eq!(batched.len(), sweep.len());
        for (k, &wl) in sweep.iter().enumerate() {
            let single = transmission(&circuit.evaluate(&Params::wl(wl)).unwrap(), "in0", "out0");
            assert!((single[0] - batched[k]).norm() < 1e-12);
        }
    }
}

#[test]
fn additive_paths_match_reduction_without_feedback() {
    let sweep: Vec<f64> = (0..5).map(|i| 1.52 + 0.02 * i as f64).collect();
    let params = Params::wl(sweep.clone());
    let evaluate = |backend: Arc<dyn Backend>| {
        Circuit::with_backend("mzi", &mzi(0.9), &models(), backend)
            .unwrap()
            .evaluate(&params)
            .unwrap()
    };
    let fg: Arc<dyn Backend> = Arc::new(FilipssonGunnarBackend);
    let additive: Arc<dyn Backend> = Arc::new(AdditiveBackend);
    let reduced = evaluate(fg);
    let summed = evaluate(additive);

    for (from, to) in [("in0", "out0"), ("out0", "in0")] {
        let a = transmission(&reduced, from, to);
        let b = transmission(&summed, from, to);
        assert_eq!(b.len(), sweep.len());
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).norm() < 1e-12, "{from}->{to}: {x} vs {y}");
        }
    }
}

#[test]
fn additive_resolves_by_name() {
    let options = CircuitOptions {
        backend: "additive".to_string(),
    };
    let circuit = Circuit::new("mzi", &mzi(0.0), &models(), &options).unwrap();
    assert_eq!(circuit.backend().name(), "additive");
    let s = circuit.evaluate(&Params::wl(1.55)).unwrap();
    assert!((transmission(&s, "in0", "out0")[0].norm() - 1.0).abs() < 1e-9);
}

#[test]
fn circuits_nest_as_models() {
    let mut outer_models = models();
    let inner = Circuit::new("mzi", &mzi(0.0), &models(), &CircuitOptions::default()).unwrap();
    outer_models.insert("mzi".to_string(), Arc::new(inner));

    let chain = Netlist::new()
        .instance("a", Instance::new("mzi"))
        .instance("b", Instance::new("mzi"))
        .connect("a,out0", "b,in0")
        .expose("in0", "a,in0")
        .expose("out0", "b,out0");

    let circuit = Circuit::new("chain", &chain, &outer_models, &CircuitOptions::default()).unwrap();
    let s = circuit.evaluate(&Params::wl(1.55)).unwrap();
    let expected = phase(1.55, 10.0).powi(2);
    assert!((transmission(&s, "in0", "out0")[0] - expected).norm() < 1e-9);
}

#[test]
fn unknown_model_aborts_analysis() {
    let netlist = mzi(0.0).instance("extra", Instance::new("ring"));
    let err = Circuit::new("bad", &netlist, &models(), &CircuitOptions::default()).unwrap_err();
    assert!(matches!(err, ScatterError::UnknownModel(_)));
}

#[test]
fn malformed_graphs_abort_analysis() {
    let dangling = mzi(0.0).connect("rgt,out9", "lft,in0");
    let err = Circuit::new("bad", &dangling, &models(), &CircuitOptions::default()).unwrap_err();
    assert!(matches!(err, ScatterError::DanglingPort(_)));

    let reused = mzi(0.0).expose("tap", "top,out0");
    let err = Circuit::new("bad", &reused, &models(), &CircuitOptions::default()).unwrap_err();
    assert!(matches!(err, ScatterError::PortReuse(_)));
}

#[test]
fn unknown_backend_is_reported() {
    let options = CircuitOptions {
        backend: "klu".to_string(),
    };
    let err = Circuit::new("mzi", &mzi(0.0), &models(), &options).unwrap_err();
    assert_eq!(err, ScatterError::UnknownBackend("klu".to_string()));
}

#[test]
fn default_always_resolves() {
    let default = registry().get("default").unwrap();
    #[cfg(feature = "lapack")]
    assert_eq!(default.name(), "lapack");
    #[cfg(not(feature = "lapack"))]
    assert_eq!(default.name(), "filipsson_gunnar");
    assert!(registry().get("fg").is_ok());
}

#[test]
fn fallback_registry_still_evaluates() {
    let fallback = BackendRegistry::with_accelerated(Err(
        scatter_solver::DependencyUnavailable::new("lapack", "not installed"),
    ));
    let circuit =
        Circuit::with_backend("mzi", &mzi(0.0), &models(), fallback.default_backend()).unwrap();
    let s = circuit.evaluate(&Params::wl(1.55)).unwrap();
    assert!((transmission(&s, "in0", "out0")[0].norm() - 1.0).abs() < 1e-9);
}

#[test]
fn stage_functions_run_on_the_default_backend() {
    let netlist = mzi(0.4);
    let models = models();
    let analyzed = scatter_solver::analyze_instances(&netlist.instances, &models).unwrap();
    let plan =
        scatter_solver::analyze_circuit(&analyzed, &netlist.connections, &netlist.ports).unwrap();

    let params = Params::wl(1.55);
    let matrices: BTreeMap<String, SMatrix> = netlist
        .instances
        .iter()
        .map(|(name, inst)| {
            let s = models[&inst.component]
                .evaluate(&params.merged(&inst.settings))
                .unwrap();
            (name.clone(), s)
        })
        .collect();
    let s = scatter_solver::evaluate_circuit(&plan, &matrices).unwrap();

    let expected = 0.5 * (phase(1.55, 10.0) + phase(1.55, 10.4));
    assert!((transmission(&s, "in0", "out0")[0] - expected).norm() < 1e-9);
}

#[test]
fn mixing_backends_is_rejected() {
    let netlist = mzi(0.0);
    let models = models();
    let fg = FilipssonGunnarBackend;
    let analyzed = fg.analyze_instances(&netlist.instances, &models).unwrap();
    let mut plan = fg
        .analyze_circuit(&analyzed, &netlist.connections, &netlist.ports)
        .unwrap();
    plan.backend = "lapack".to_string();

    let err = fg.evaluate_circuit(&plan, &BTreeMap::new()).unwrap_err();
    assert!(matches!(err, ScatterError::BackendMismatch { .. }));
}

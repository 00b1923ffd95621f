use approx::assert_relative_eq;
use lk_align::warp::{Params, Point};
use lk_align::*;

fn sample_warps() -> Vec<DynWarp> {
    vec![
        DynWarp::from_parameters(WarpMode::Translation, &[3.0, -4.0]).unwrap(),
        DynWarp::from_parameters(WarpMode::Euclidean, &[3.0, -4.0, 0.3]).unwrap(),
        DynWarp::from_parameters(WarpMode::Similarity, &[3.0, -4.0, 0.1, 0.2]).unwrap(),
        DynWarp::from_parameters(WarpMode::Affine, &[3.0, -4.0, 0.1, 0.05, -0.02, 0.2]).unwrap(),
        DynWarp::from_parameters(
            WarpMode::Perspective,
            &[3.0, -4.0, 0.1, 0.05, -0.02, 0.2, 1e-3, -2e-3],
        )
        .unwrap(),
    ]
}

#[test]
fn test_inverse_undoes_warp() {
    let p = Point::new(7.0, 11.0);
    for w in sample_warps() {
        let inv = w.inverse().unwrap();
        assert_eq!(inv.mode(), w.mode());
        assert_relative_eq!(inv.apply(&w.apply(&p)), p, epsilon = 1e-9);
    }
}

#[test]
fn test_scaling_between_levels() {
    let p = Point::new(5.0, 9.0);
    for w in sample_warps() {
        let coarse = w.scaled(-2);
        assert_relative_eq!(coarse.apply(&(p / 4.0)), w.apply(&p) / 4.0, epsilon = 1e-9);
        assert_relative_eq!(coarse.scaled(2).matrix(), w.matrix(), epsilon = 1e-12);
    }
}

#[test]
fn test_compositional_updates_cancel() {
    let delta = Params::<6>::new(0.5, -0.25, 0.01, 0.02, -0.01, 0.03);
    let start = AffineWarp::from_dynamic(&sample_warps()[3]).unwrap();
    let mut w = start;
    w.update_forward_compositional(&delta);
    w.update_inverse_compositional(&delta);
    assert_relative_eq!(w.matrix(), start.matrix(), epsilon = 1e-12);
}

#[test]
fn test_forward_additive_update() {
    let mut w = EuclideanWarp::new(1.0, 2.0, 0.1);
    w.update_forward_additive(&Params::<3>::new(0.5, -1.0, 0.05));
    assert_relative_eq!(w.parameters(), Params::<3>::new(1.5, 1.0, 0.15), epsilon = 1e-12);
}

#[test]
fn test_similarity_canonical_parameters() {
    let w = SimilarityWarp::from_canonical(10.0, 15.0, 0.18, 1.1);
    let c = w.parameters_canonical();
    assert_relative_eq!(c[2], 0.18, epsilon = 1e-12);
    assert_relative_eq!(c[3], 1.1, epsilon = 1e-12);
    let p = w.apply(&Point::new(1.0, 0.0));
    assert_relative_eq!(p, Point::new(10.0 + 1.1 * 0.18f64.cos(), 15.0 + 1.1 * 0.18f64.sin()), epsilon = 1e-12);
}

#[test]
fn test_dynamic_warp_json() {
    for w in sample_warps() {
        let json = serde_json::to_string(&w).unwrap();
        let back: DynWarp = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mode(), w.mode());
        assert_relative_eq!(back.parameters(), w.parameters(), epsilon = 1e-12);
    }
    assert!(serde_json::from_str::<DynWarp>(r#"{"mode":"affine","parameters":[1.0,2.0]}"#).is_err());
}

#[test]
fn test_parameter_count_checked() {
    assert!(DynWarp::from_parameters(WarpMode::Similarity, &[1.0, 2.0, 3.0]).is_err());
    let mut w = DynWarp::identity(WarpMode::Euclidean);
    assert_eq!(w.num_parameters(), 3);
    assert!(w.set_parameters(&nalgebra::DVector::from_vec(vec![1.0, 2.0])).is_err());
    w.set_parameters(&nalgebra::DVector::from_vec(vec![1.0, 2.0, 0.5])).unwrap();
    w.set_identity();
    assert_eq!(w, DynWarp::identity(WarpMode::Euclidean));
}

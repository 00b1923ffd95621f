use lk_align::analysis::calculate_corner_error;
use lk_align::*;
use ndarray::Array2;
use std::sync::Arc;

fn create_scene(mode: WarpMode) -> SyntheticScene {
    SyntheticScene::generate(&SyntheticParams {
        mode,
        seed: 7,
        ..SyntheticParams::default()
    })
    .unwrap()
}

/// Runs every level coarse to fine through the run-time dispatched aligner
fn align_scene(
    kind: AlgorithmKind,
    scene: &SyntheticScene,
    levels: usize,
    iterations: usize,
) -> DynWarp {
    let mut aligner = AlignerBuilder::new()
        .mode(scene.initial.mode())
        .algorithm(kind)
        .build();
    aligner
        .prepare(&scene.template, &scene.target, &scene.initial, levels)
        .unwrap();

    let mut warp = scene.initial;
    for level in 0..aligner.num_levels() {
        aligner.set_level(level);
        aligner.align_until(&mut warp, iterations, 0.0).unwrap();
    }
    warp
}

fn corner_error(scene: &SyntheticScene, warp: &DynWarp) -> f64 {
    let (rows, cols) = scene.template.dim();
    calculate_corner_error(warp, &scene.ground_truth, cols, rows)
}

#[test]
fn test_translation_converges_all_algorithms() {
    let scene = create_scene(WarpMode::Translation);
    for kind in AlgorithmKind::ALL {
        for levels in [1, 2] {
            let warp = align_scene(kind, &scene, levels, 100);
            let p = warp.parameters();
            assert!(
                (p[0] - 20.0).abs() < 0.2 && (p[1] - 20.0).abs() < 0.2,
                "{} with {} level(s) ended at {}",
                kind,
                levels,
                warp
            );
        }
    }
}

#[test]
fn test_small_crop_translation_within_one_percent() {
    let texture = ImageTransformer::box_blur(&random_texture(100, 100, 7), 5);
    let template = PatchExtractor::extract_patch(&texture, 20, 20, 10, 10).unwrap();
    let scene = SyntheticScene {
        target: texture,
        template,
        ground_truth: TranslationWarp::new(20.0, 20.0).to_dynamic(),
        initial: TranslationWarp::new(18.0, 18.0).to_dynamic(),
    };

    for kind in AlgorithmKind::ALL {
        for levels in [1, 2] {
            let warp = align_scene(kind, &scene, levels, 100);
            let p = warp.parameters();
            assert!(
                ((p[0] - 20.0) / 20.0).abs() < 0.01 && ((p[1] - 20.0) / 20.0).abs() < 0.01,
                "{} with {} level(s) ended at {}",
                kind,
                levels,
                warp
            );
        }
    }
}

#[test]
fn test_euclidean_converges_all_algorithms() {
    let scene = create_scene(WarpMode::Euclidean);
    for kind in AlgorithmKind::ALL {
        let warp = align_scene(kind, &scene, 1, 100);
        assert!(corner_error(&scene, &warp) < 0.1, "{} ended at {}", kind, warp);
        let p = warp.parameters();
        assert!((p[2] - 0.18).abs() < 0.18 * 0.02);
    }
}

#[test]
fn test_similarity_converges_all_algorithms() {
    let scene = create_scene(WarpMode::Similarity);
    for kind in AlgorithmKind::ALL {
        let warp = align_scene(kind, &scene, 1, 100);
        assert!(corner_error(&scene, &warp) < 0.1, "{} ended at {}", kind, warp);

        let canonical = SimilarityWarp::from_dynamic(&warp).unwrap().parameters_canonical();
        for (estimate, truth) in canonical.iter().zip([10.0, 15.0, 0.18, 1.0]) {
            assert!(
                ((estimate - truth) / truth).abs() < 0.02,
                "{}: canonical {} against {}",
                kind,
                estimate,
                truth
            );
        }
    }
}

#[test]
fn test_affine_converges_all_algorithms() {
    let scene = create_scene(WarpMode::Affine);
    for kind in AlgorithmKind::ALL {
        let warp = align_scene(kind, &scene, 1, 100);
        assert!(corner_error(&scene, &warp) < 0.2, "{} ended at {}", kind, warp);
    }
}

#[test]
fn test_perspective_improves_on_initial_guess() {
    let scene = create_scene(WarpMode::Perspective);
    let initial_error = corner_error(&scene, &scene.initial);
    let warp = align_scene(AlgorithmKind::InverseCompositional, &scene, 1, 100);
    assert!(corner_error(&scene, &warp) < initial_error * 0.5);
}

#[test]
fn test_flat_images_give_zero_increment() {
    let template = Array2::from_elem((10, 10), 128.0f32);
    let target = Array2::from_elem((40, 40), 128.0f32);
    for kind in AlgorithmKind::ALL {
        let mut aligner = AlignerBuilder::new()
            .mode(WarpMode::Affine)
            .algorithm(kind)
            .build();
        let mut warp = DynWarp::from_parameters(WarpMode::Affine, &[5.0, 5.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap();
        let before = warp;
        aligner.prepare(&template, &target, &warp, 1).unwrap();
        aligner.align(&mut warp).unwrap();

        assert_eq!(aligner.iteration(), 1);
        assert_eq!(aligner.last_increment().norm(), 0.0);
        assert_eq!(aligner.last_error(), f64::MAX);
        assert!(aligner.last_step_degenerate());
        assert_eq!(warp, before);
    }
}

#[test]
fn test_degenerate_step_reports_infinite_error_change() {
    let scene = create_scene(WarpMode::Translation);
    let mut warp = TranslationWarp::from_dynamic(&scene.initial).unwrap();
    let mut aligner = AlignInverseCompositional::<TranslationWarp, 2>::new();
    aligner
        .prepare(&scene.template, &scene.target, &warp, 1)
        .unwrap();

    aligner.align(&mut warp);
    assert!(!aligner.last_step_degenerate());
    assert_eq!(aligner.error_change(), f64::NEG_INFINITY);

    let mut outside = TranslationWarp::new(500.0, 500.0);
    aligner.align(&mut outside);
    assert!(aligner.last_step_degenerate());
    assert_eq!(aligner.error_change(), f64::INFINITY);
}

#[test]
fn test_inverse_compositional_ignores_template_outside_target() {
    let scene = create_scene(WarpMode::Translation);
    let mut warp = TranslationWarp::new(500.0, 500.0);
    let mut aligner = AlignInverseCompositional::<TranslationWarp, 2>::new();
    aligner
        .prepare(&scene.template, &scene.target, &warp, 1)
        .unwrap();
    aligner.align(&mut warp);

    assert_eq!(warp, TranslationWarp::new(500.0, 500.0));
    assert_eq!(aligner.last_error(), f64::MAX);
}

#[test]
fn test_history_records_every_iteration() {
    let scene = create_scene(WarpMode::Translation);
    let mut warp = TranslationWarp::from_dynamic(&scene.initial).unwrap();
    let mut aligner = AlignForwardCompositional::<TranslationWarp, 2>::new();
    aligner
        .prepare(&scene.template, &scene.target, &warp, 1)
        .unwrap();

    let history = aligner.align_with_history(&mut warp, 10, 0.0);
    assert_eq!(history.len(), 10);
    assert_eq!(history.last(), Some(&warp));
    assert_eq!(aligner.iteration(), 10);
    assert!(aligner.error_change().is_finite());
}

#[test]
fn test_align_levels_matches_manual_schedule() {
    let scene = create_scene(WarpMode::Euclidean);
    let start = EuclideanWarp::from_dynamic(&scene.initial).unwrap();

    let mut scheduled = start;
    let mut a = AlignForwardAdditive::<EuclideanWarp, 3>::new();
    a.prepare(&scene.template, &scene.target, &scheduled, 2).unwrap();
    a.align_levels(&mut scheduled, &[5, 8], 0.0);

    let mut manual = start;
    let mut b = AlignForwardAdditive::<EuclideanWarp, 3>::new();
    b.prepare(&scene.template, &scene.target, &manual, 2).unwrap();
    b.set_level(0).align_until(&mut manual, 5, 0.0);
    b.set_level(1).align_until(&mut manual, 8, 0.0);

    assert_eq!(a.iteration(), 13);
    assert_eq!(scheduled, manual);
}

#[test]
fn test_shared_target_pyramid() {
    let scene = create_scene(WarpMode::Translation);
    let target = Arc::new(ImagePyramid::create(&scene.target, 2).unwrap());
    let template = Arc::new(ImagePyramid::create(&scene.template, 2).unwrap());

    let mut ic = AlignInverseCompositional::<TranslationWarp, 2>::new();
    let mut fa = AlignForwardAdditive::<TranslationWarp, 2>::new();
    let start = TranslationWarp::from_dynamic(&scene.initial).unwrap();
    ic.prepare_pyramids(template.clone(), target.clone(), &start)
        .unwrap();
    fa.prepare_pyramids(template.clone(), target.clone(), &start)
        .unwrap();
    assert!(Arc::ptr_eq(ic.target_pyramid(), fa.target_pyramid()));

    let (mut w_ic, mut w_fa) = (start, start);
    ic.align_levels(&mut w_ic, &[50], 0.0);
    fa.align_levels(&mut w_fa, &[50], 0.0);
    assert!((w_ic.parameters() - w_fa.parameters()).norm() < 0.05);
}

#[test]
fn test_mismatched_pyramid_depths_rejected() {
    let scene = create_scene(WarpMode::Translation);
    let target = Arc::new(ImagePyramid::create(&scene.target, 3).unwrap());
    let template = Arc::new(ImagePyramid::create(&scene.template, 2).unwrap());
    let mut aligner = AlignForwardCompositional::<TranslationWarp, 2>::new();
    assert!(aligner
        .prepare_pyramids(template, target, &TranslationWarp::identity())
        .is_err());
}

#[test]
fn test_dynamic_aligner_rejects_other_modes() {
    let scene = create_scene(WarpMode::Translation);
    let mut aligner = AlignerBuilder::new()
        .mode(WarpMode::Translation)
        .algorithm(AlgorithmKind::ForwardAdditive)
        .build();
    assert_eq!(aligner.mode(), WarpMode::Translation);
    assert_eq!(aligner.kind(), AlgorithmKind::ForwardAdditive);

    let mut affine = DynWarp::identity(WarpMode::Affine);
    assert!(aligner
        .prepare(&scene.template, &scene.target, &affine, 1)
        .is_err());
    aligner
        .prepare(&scene.template, &scene.target, &scene.initial, 1)
        .unwrap();
    assert!(aligner.align(&mut affine).is_err());
}

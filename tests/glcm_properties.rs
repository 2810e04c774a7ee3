use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simscore::glcm::{accumulate_parallel, accumulate_sequential, quantized_phase};
use simscore::{
    Glcm, GlcmConfig, ImageView, MetricEngine, ScaleStrategy, SimScoreError, TextureEngine,
    TextureMetric,
};

fn make_image(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.push(value as f32);
        }
    }
    data
}

fn random_levels(width: usize, height: usize, levels: u8, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width * height)
        .map(|_| rng.random_range(0..levels))
        .collect()
}

#[test]
fn probabilities_sum_to_one() {
    let data = make_image(70, 45);
    let view = ImageView::from_slice(&data, 70, 45).unwrap();
    for cfg in [
        GlcmConfig::neighbour(),
        GlcmConfig {
            levels: 16,
            dx: -2,
            dy: 3,
            scale: ScaleStrategy::None,
        },
    ] {
        let glcm = Glcm::from_image(view, &cfg).unwrap();
        assert_eq!(glcm.levels(), cfg.levels);
        assert!(glcm.pair_count() > 0);
        assert!((glcm.total() - 1.0).abs() < 1e-6);
        assert!(glcm.probabilities().iter().all(|&p| p >= 0.0));
    }
}

#[test]
fn offsets_are_checked_against_the_resized_grid() {
    // 48x48 shrinks to 32x32 under the default scale strategy.
    let data = make_image(48, 48);
    let view = ImageView::from_slice(&data, 48, 48).unwrap();

    for (dx, dy) in [(40, 0), (0, -32), (32, 32)] {
        let cfg = GlcmConfig {
            dx,
            dy,
            ..GlcmConfig::default()
        };
        assert!(
            matches!(Glcm::from_image(view, &cfg), Err(SimScoreError::InvalidInput(_))),
            "({dx}, {dy})"
        );
        assert!(
            matches!(
                TextureMetric::homogeneity(view, cfg),
                Err(SimScoreError::InvalidInput(_))
            ),
            "({dx}, {dy})"
        );
        assert!(TextureMetric::correlation(view, cfg).is_err(), "({dx}, {dy})");
    }

    let edge = GlcmConfig {
        dx: 31,
        ..GlcmConfig::default()
    };
    let glcm = Glcm::from_image(view, &edge).unwrap();
    assert_eq!(glcm.pair_count(), 32);
    assert!((glcm.total() - 1.0).abs() < 1e-9);
}

#[test]
fn empty_counts_read_as_correlated_but_not_homogeneous() {
    let glcm = Glcm::from_counts(vec![0; 4], 2);
    assert_eq!(glcm.pair_count(), 0);
    assert_eq!(glcm.total(), 0.0);
    assert_eq!(glcm.correlation(), 1.0);
    assert_eq!(glcm.homogeneity(), 0.0);
}

#[test]
fn statistics_match_hand_computed_matrix() {
    // counts: (0,0)=1 (0,1)=1 (1,1)=2
    let glcm = Glcm::from_counts(vec![1, 1, 0, 2], 2);
    assert_eq!(glcm.get(0, 1), Some(0.25));
    assert_eq!(glcm.get(1, 1), Some(0.5));
    assert_eq!(glcm.get(2, 0), None);

    let (mean_x, mean_y) = glcm.means();
    assert!((mean_x - 0.5).abs() < 1e-12);
    assert!((mean_y - 0.75).abs() < 1e-12);

    let (var_x, var_y) = glcm.variances();
    assert!((var_x - 0.25).abs() < 1e-12);
    assert!((var_y - 0.1875).abs() < 1e-12);

    // 0.25 + 0.25 / 2 + 0.5
    assert!((glcm.homogeneity() - 0.875).abs() < 1e-12);
    // cov = 0.25*(-.5)(-.75) + 0.25*(-.5)(.25) + 0.5*(.5)(.25) = 0.125
    let expected = 0.125 / (0.25f64 * 0.1875).sqrt();
    assert!((glcm.correlation() - expected).abs() < 1e-12);
}

#[test]
fn degenerate_variance_counts_as_perfect_correlation() {
    let mut counts = vec![0u64; 9];
    counts[4] = 10;
    let glcm = Glcm::from_counts(counts, 3);
    assert_eq!(glcm.correlation(), 1.0);
    assert_eq!(glcm.homogeneity(), 1.0);
}

#[test]
fn parallel_accumulation_matches_sequential() {
    let (width, height) = (131, 97);
    let src = random_levels(width, height, 32, 1);
    let tgt = random_levels(width, height, 32, 2);
    let src_view = ImageView::from_slice(&src, width, height).unwrap();
    let tgt_view = ImageView::from_slice(&tgt, width, height).unwrap();

    for (dx, dy) in [(0, 0), (1, 0), (0, 1), (-3, 2), (5, -7)] {
        let par = accumulate_parallel(src_view, tgt_view, 32, dx, dy);
        let seq = accumulate_sequential(src_view, tgt_view, 32, dx, dy);
        assert_eq!(par, seq, "offset ({dx}, {dy})");

        let expected_pairs = (width - dx.unsigned_abs() as usize) * (height - dy.unsigned_abs() as usize);
        assert_eq!(par.iter().sum::<u64>(), expected_pairs as u64);
    }
}

#[test]
fn quantized_phase_uses_the_full_level_range() {
    let data = make_image(33, 20);
    let view = ImageView::from_slice(&data, 33, 20).unwrap();
    let levels = quantized_phase(view, 32).unwrap();
    assert_eq!(levels.size(), (33, 20));
    assert_eq!(levels.data().iter().copied().min(), Some(0));
    assert_eq!(levels.data().iter().copied().max(), Some(31));
}

#[test]
fn texture_metrics_of_identical_images_are_one() {
    let data = make_image(64, 64);
    let view = ImageView::from_slice(&data, 64, 64).unwrap();

    let homogeneity = TextureMetric::homogeneity(view, GlcmConfig::default()).unwrap();
    assert!((homogeneity.score(view).unwrap() - 1.0).abs() < 1e-12);

    let correlation = TextureMetric::correlation(view, GlcmConfig::default()).unwrap();
    assert!((correlation.score(view).unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn texture_scores_drop_for_unrelated_images() {
    let reference = make_image(64, 64);
    let mut rng = StdRng::seed_from_u64(9);
    let noise: Vec<f32> = (0..64 * 64).map(|_| f32::from(rng.random::<u8>())).collect();
    let ref_view = ImageView::from_slice(&reference, 64, 64).unwrap();
    let noise_view = ImageView::from_slice(&noise, 64, 64).unwrap();

    let homogeneity = TextureMetric::homogeneity(ref_view, GlcmConfig::default()).unwrap();
    let score = homogeneity.score(noise_view).unwrap();
    assert!(score > 0.0 && score < 0.9, "homogeneity {score}");
}

#[test]
fn shared_and_independent_paths_agree() {
    let reference = make_image(48, 40);
    let candidate: Vec<f32> = make_image(48, 40)
        .iter()
        .enumerate()
        .map(|(i, v)| if i % 5 == 0 { 255.0 - v } else { *v })
        .collect();
    let ref_view = ImageView::from_slice(&reference, 48, 40).unwrap();
    let cand_view = ImageView::from_slice(&candidate, 48, 40).unwrap();

    let correlation = TextureMetric::correlation(ref_view, GlcmConfig::default()).unwrap();
    let homogeneity = TextureMetric::homogeneity(ref_view, GlcmConfig::default()).unwrap();

    let shared = correlation.cooccurrence(cand_view).unwrap();
    assert_eq!(shared, homogeneity.cooccurrence(cand_view).unwrap());

    let corr_independent = correlation.score(cand_view).unwrap();
    let homo_independent = homogeneity.score(cand_view).unwrap();
    assert!((correlation.score_glcm(&shared) - corr_independent).abs() < 1e-12);
    assert!((homogeneity.score_glcm(&shared) - homo_independent).abs() < 1e-12);
}

#[test]
fn flat_reference_and_bad_levels_are_rejected() {
    let flat = vec![9.0f32; 32 * 32];
    let view = ImageView::from_slice(&flat, 32, 32).unwrap();
    assert_eq!(
        TextureMetric::correlation(view, GlcmConfig::default()).err(),
        Some(SimScoreError::InvalidReference {
            reason: "zero variance"
        })
    );

    let data = make_image(32, 32);
    let view = ImageView::from_slice(&data, 32, 32).unwrap();
    let cfg = GlcmConfig {
        levels: 300,
        ..GlcmConfig::default()
    };
    assert!(matches!(
        TextureMetric::homogeneity(view, cfg),
        Err(SimScoreError::InvalidInput(_))
    ));
}

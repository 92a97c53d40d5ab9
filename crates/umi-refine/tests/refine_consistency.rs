//! Rerank consistency: refining an exact coarse index must reproduce the
//! flat index's answers exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use umi_refine::{RefineConfig, RefineIndex};
use umi_vector::{FlatIndex, Metric, VectorIndex};

fn random_batch(rng: &mut StdRng, n: usize, dims: usize) -> Vec<f32> {
    (0..n * dims).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

#[test]
fn test_refine_over_flat_coarse_matches_flat() {
    let dims = 8;
    let mut rng = StdRng::seed_from_u64(42);
    let data = random_batch(&mut rng, 200, dims);
    let queries = random_batch(&mut rng, 10, dims);

    for metric in [Metric::L2, Metric::InnerProduct] {
        let mut flat = FlatIndex::new(dims, metric);
        flat.add(&data).unwrap();

        let coarse = FlatIndex::new(dims, metric);
        let mut refine =
            RefineIndex::with_config(coarse, RefineConfig { k_factor: 1.0 }).unwrap();
        refine.add(&data).unwrap();

        for k in [1, 5, 13] {
            let expected = flat.search(&queries, k).unwrap();
            let actual = refine.search(&queries, k).unwrap();

            assert_eq!(actual.labels_flat(), expected.labels_flat());
            assert_eq!(actual.distances_flat(), expected.distances_flat());
        }
    }
}

#[test]
fn test_widening_the_coarse_pass_changes_nothing_when_coarse_is_exact() {
    let dims = 4;
    let mut rng = StdRng::seed_from_u64(7);
    let data = random_batch(&mut rng, 120, dims);
    let queries = random_batch(&mut rng, 6, dims);

    let mut flat = FlatIndex::new(dims, Metric::L2);
    flat.add(&data).unwrap();

    let coarse = FlatIndex::new(dims, Metric::L2);
    let mut refine = RefineIndex::with_config(coarse, RefineConfig { k_factor: 4.0 }).unwrap();
    refine.add(&data).unwrap();

    let k = 7;
    let expected = flat.search(&queries, k).unwrap();
    let actual = refine.search(&queries, k).unwrap();

    assert_eq!(actual.labels_flat(), expected.labels_flat());
    assert_eq!(actual.distances_flat(), expected.distances_flat());
}

#[test]
fn test_refine_search_matches_flat_when_k_exceeds_population() {
    let dims = 4;
    let mut rng = StdRng::seed_from_u64(3);
    let data = random_batch(&mut rng, 5, dims);
    let queries = random_batch(&mut rng, 3, dims);

    let mut flat = FlatIndex::new(dims, Metric::L2);
    flat.add(&data).unwrap();

    let coarse = FlatIndex::new(dims, Metric::L2);
    let mut refine = RefineIndex::with_config(coarse, RefineConfig { k_factor: 2.0 }).unwrap();
    refine.add(&data).unwrap();

    let expected = flat.search(&queries, 9).unwrap();
    let actual = refine.search(&queries, 9).unwrap();

    assert_eq!(actual.labels_flat(), expected.labels_flat());
}

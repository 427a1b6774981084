use criterion::measurement::Measurement;
use criterion::{criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion};
use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};
use rand::distr::{Distribution, Uniform};
use rand::{rngs::StdRng, SeedableRng};
use std::time::Duration;

use axis_stats::{median, range, sum, variance, Options};

#[derive(Clone)]
pub struct SparseMatrixConfig {
    seed: u64,
    matrix_sizes: Vec<(usize, usize)>,
    densities: Vec<f64>,
    thread_counts: Vec<usize>,
    measurement_time: u64,
    sample_size: usize,
}

impl Default for SparseMatrixConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            matrix_sizes: vec![(100, 100), (1000, 1000), (5000, 5000), (10000, 10000)],
            densities: vec![0.01, 0.1],
            thread_counts: vec![1, 4],
            measurement_time: 10,
            sample_size: 10,
        }
    }
}

fn create_test_matrix(rows: usize, cols: usize, density: f64, seed: u64) -> CooMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut coo = CooMatrix::new(rows, cols);
    let total_elements = (rows * cols) as f64 * density;
    let value_dist = Uniform::try_from(-1.0..1.0).unwrap();
    let row_dist = Uniform::try_from(0..rows).unwrap();
    let col_dist = Uniform::try_from(0..cols).unwrap();

    for _ in 0..total_elements as usize {
        let row = row_dist.sample(&mut rng);
        let col = col_dist.sample(&mut rng);
        let value = value_dist.sample(&mut rng);
        coo.push(row, col, value);
    }

    coo
}

fn configure_group<'a, M: Measurement>(
    c: &'a mut Criterion<M>,
    name: &str,
    config: &SparseMatrixConfig,
) -> BenchmarkGroup<'a, M> {
    let mut group = c.benchmark_group(name);
    group.measurement_time(Duration::from_secs(config.measurement_time));
    group.sample_size(config.sample_size);
    group
}

pub fn bench_sums(c: &mut Criterion) {
    let config = SparseMatrixConfig::default();
    let mut group = configure_group(c, "Sums", &config);

    for &(rows, cols) in config.matrix_sizes.iter() {
        for &density in config.densities.iter() {
            let seed = config.seed + (rows * cols) as u64;
            let coo = create_test_matrix(rows, cols, density, seed);
            let csr = CsrMatrix::from(&coo);
            let csc = CscMatrix::from(&coo);

            for &threads in config.thread_counts.iter() {
                let opt = Options {
                    skip_nan: false,
                    threads,
                };
                let params = format!("{}x{}_d{}_t{}", rows, cols, density, threads);

                // CSR rows take the direct strategy, CSC rows the running one.
                group.bench_with_input(
                    BenchmarkId::new("row_sum_direct", &params),
                    &opt,
                    |b, opt| {
                        b.iter(|| sum::by_row(&csr, opt).unwrap());
                    },
                );
                group.bench_with_input(
                    BenchmarkId::new("row_sum_running", &params),
                    &opt,
                    |b, opt| {
                        b.iter(|| sum::by_row(&csc, opt).unwrap());
                    },
                );
            }
        }
    }
    group.finish();
}

pub fn bench_variances(c: &mut Criterion) {
    let config = SparseMatrixConfig::default();
    let mut group = configure_group(c, "Variances", &config);

    for &(rows, cols) in config.matrix_sizes.iter() {
        for &density in config.densities.iter() {
            let seed = config.seed + (rows * cols) as u64;
            let coo = create_test_matrix(rows, cols, density, seed);
            let csr = CsrMatrix::from(&coo);
            let csc = CscMatrix::from(&coo);

            for &threads in config.thread_counts.iter() {
                let opt = Options {
                    skip_nan: false,
                    threads,
                };
                let params = format!("{}x{}_d{}_t{}", rows, cols, density, threads);

                group.bench_with_input(
                    BenchmarkId::new("row_variance_direct", &params),
                    &opt,
                    |b, opt| {
                        b.iter(|| variance::by_row(&csr, opt).unwrap());
                    },
                );
                group.bench_with_input(
                    BenchmarkId::new("row_variance_running", &params),
                    &opt,
                    |b, opt| {
                        b.iter(|| variance::by_row(&csc, opt).unwrap());
                    },
                );
            }
        }
    }
    group.finish();
}

pub fn bench_ranges(c: &mut Criterion) {
    let config = SparseMatrixConfig::default();
    let mut group = configure_group(c, "Ranges", &config);

    for &(rows, cols) in config.matrix_sizes.iter() {
        for &density in config.densities.iter() {
            let seed = config.seed + (rows * cols) as u64;
            let coo = create_test_matrix(rows, cols, density, seed);
            let csr = CsrMatrix::from(&coo);

            for &threads in config.thread_counts.iter() {
                let opt = Options {
                    skip_nan: false,
                    threads,
                };
                let params = format!("{}x{}_d{}_t{}", rows, cols, density, threads);

                group.bench_with_input(BenchmarkId::new("row_range", &params), &opt, |b, opt| {
                    b.iter(|| range::by_row(&csr, opt).unwrap());
                });
            }
        }
    }
    group.finish();
}

pub fn bench_medians(c: &mut Criterion) {
    let config = SparseMatrixConfig::default();
    let mut group = configure_group(c, "Medians", &config);

    for &(rows, cols) in config.matrix_sizes.iter() {
        for &density in config.densities.iter() {
            let seed = config.seed + (rows * cols) as u64;
            let coo = create_test_matrix(rows, cols, density, seed);
            let csr = CsrMatrix::from(&coo);

            for &threads in config.thread_counts.iter() {
                let opt = Options {
                    skip_nan: false,
                    threads,
                };
                let params = format!("{}x{}_d{}_t{}", rows, cols, density, threads);

                group.bench_with_input(BenchmarkId::new("row_median", &params), &opt, |b, opt| {
                    b.iter(|| median::by_row(&csr, opt).unwrap());
                });
            }
        }
    }
    group.finish();
}

criterion_group!(benches, bench_sums, bench_variances, bench_ranges, bench_medians);
criterion_main!(benches);

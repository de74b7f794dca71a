use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dasp_signal::{rate, Signal};
use vv_dsp::kernel::KernelLifecycle;
use vv_dsp::signal::filter::{SavgolConfig, SavgolKernel, SavgolMode};
use vv_dsp::signal::traits::Filter1D;
use vv_dsp::Real;

/// Ten seconds of a 25 Hz sine at 1666 Hz.
fn sine_10s() -> Vec<Real> {
    let sample_hz = 1666.;
    let mut signal = rate(sample_hz).const_hz(25.).sine();
    (0..10 * sample_hz as usize)
        .map(|_| signal.next() as Real)
        .collect()
}

///
/// Smoothing cost as the window grows. The normal equations are solved once
/// per call, so short inputs are dominated by the solve and long ones by the
/// correlation.
///
fn savgol_windows(c: &mut Criterion) {
    let sin_wave = sine_10s();
    let mut group = c.benchmark_group("savgol_smooth");
    for window_length in [5usize, 11, 31, 101] {
        let kernel = SavgolKernel::try_new(SavgolConfig {
            window_length,
            polyorder: 3,
            mode: SavgolMode::Reflect,
            ..Default::default()
        })
        .expect("valid savgol config");
        group.bench_with_input(
            BenchmarkId::from_parameter(window_length),
            &sin_wave,
            |b, sig| {
                b.iter(|| {
                    black_box(
                        kernel
                            .run_alloc(sig.as_slice())
                            .expect("benchmark input should satisfy savgol preconditions"),
                    )
                })
            },
        );
    }
    group.finish();
}

fn savgol_derivative(c: &mut Criterion) {
    let sin_wave = sine_10s();
    let kernel = SavgolKernel::try_new(SavgolConfig {
        window_length: 21,
        polyorder: 4,
        deriv: 2,
        delta: 1.0 / 1666.0,
        mode: SavgolMode::Nearest,
    })
    .expect("valid savgol config");
    let mut out = vec![0.0; sin_wave.len()];

    c.bench_function("savgol_deriv2_21", |b| {
        b.iter(|| {
            kernel
                .run_into(black_box(sin_wave.as_slice()), out.as_mut_slice())
                .expect("benchmark input should satisfy savgol preconditions");
        })
    });

    let mut scratch = vec![0.0; kernel.scratch_len(sin_wave.len())];
    c.bench_function("savgol_deriv2_21_scratch", |b| {
        b.iter(|| {
            kernel
                .run_with_scratch(black_box(sin_wave.as_slice()), &mut scratch, &mut out)
                .expect("benchmark input should satisfy savgol preconditions");
        })
    });
}

criterion_group!(benches, savgol_windows, savgol_derivative);
criterion_main!(benches);

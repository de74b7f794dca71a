use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dasp_signal::{rate, Signal};
use vv_dsp::kernel::KernelLifecycle;
use vv_dsp::signal::resample::{ResampleQuality, Resampler, ResamplerConfig};
use vv_dsp::Real;

///
/// One second of a 440 Hz tone at 44.1 kHz converted to 48 kHz
/// (`L / M = 160 / 147`) on both interpolation paths, and the sinc path
/// across kernel lengths.
///
fn cd_to_dat(c: &mut Criterion) {
    let sample_hz = 44_100.;
    let mut signal = rate(sample_hz).const_hz(440.).sine();
    let tone: Vec<Real> = (0..sample_hz as usize)
        .map(|_| signal.next() as Real)
        .collect();

    let mut group = c.benchmark_group("resample_160_147");
    let configs = [
        ("linear", ResampleQuality::Linear, 32),
        ("sinc", ResampleQuality::Sinc, 16),
        ("sinc", ResampleQuality::Sinc, 32),
        ("sinc", ResampleQuality::Sinc, 64),
    ];
    for (name, quality, taps) in configs {
        let rs = Resampler::try_new(ResamplerConfig {
            num: 160,
            den: 147,
            quality,
            taps,
        })
        .expect("valid resampler config");
        let mut out = vec![0.0; rs.output_len(tone.len())];
        group.bench_with_input(BenchmarkId::new(name, taps), &tone, |b, x| {
            b.iter(|| {
                rs.process_into(black_box(x.as_slice()), out.as_mut_slice())
                    .expect("output buffer sized by output_len")
            })
        });
    }
    group.finish();
}

criterion_group!(benches, cd_to_dat);
criterion_main!(benches);

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use vv_dsp::kernel::{ExecInvariantViolation, KernelLifecycle};
use vv_dsp::signal::filter::{
    biquad_chain_apply, fir_apply_fft, fir_design_lowpass, savgol_filter, Biquad, FirFilterConfig,
    FirFilterKernel, SavgolMode,
};
use vv_dsp::signal::interpolate::interpolate_linear_into;
use vv_dsp::signal::resample::{resample_rational, ResampleQuality};
use vv_dsp::signal::spectral::{dct_forward, fftshift, irfft, rfft, DctVariant, Stft, StftConfig};
use vv_dsp::signal::traits::StreamFilter1D;
use vv_dsp::signal::windows::{get_window, WindowKind};
use vv_dsp::{stats, Cpx};

const DEFAULT_PYTHON_BIN: &str = "python";

const PY_REFERENCE_SCRIPT: &str = r#"
import json
import sys
import time
import numpy as np
import scipy
import scipy.fft
import scipy.signal
import scipy.stats

env = json.loads(sys.stdin.read())
op = env["op"]
iters = int(env["iters"])
p = env["payload"]

def _as_array(key):
    return np.asarray(p[key], dtype=float)

def _interleave(z):
    z = np.asarray(z, dtype=complex).reshape(-1)
    return np.stack([z.real, z.imag], axis=1).reshape(-1)

def _compute():
    if op == "rfft":
        return _interleave(np.fft.rfft(_as_array("x")))
    if op == "irfft":
        spec = _as_array("spec").reshape((-1, 2))
        return np.fft.irfft(spec[:, 0] + 1j * spec[:, 1], n=int(p["n"]))
    if op == "fftshift":
        return np.fft.fftshift(_as_array("x"))
    if op == "dct":
        return float(p["scale"]) * scipy.fft.dct(_as_array("x"), type=int(p["type"]))
    if op == "dct3_half_sample":
        x = _as_array("x")
        n_len = len(x)
        k = np.arange(n_len)[:, None]
        n = np.arange(1, n_len)[None, :]
        return x[0] + 2.0 * (np.cos(np.pi * k * (n + 0.5) / n_len) @ x[1:])
    if op == "window":
        return scipy.signal.get_window(p["name"], int(p["n"]), fftbins=False)
    if op == "spectrogram":
        x = _as_array("x")
        m = int(p["m"])
        hop = int(p["hop"])
        w = scipy.signal.get_window("hann", m, fftbins=False)
        frames = (len(x) - m) // hop + 1
        rows = [np.abs(np.fft.fft(w * x[f * hop:f * hop + m])) for f in range(frames)]
        return np.concatenate(rows)
    if op == "firwin":
        return scipy.signal.firwin(int(p["taps"]), float(p["cutoff"]), window=p["window"])
    if op == "lfilter_fir":
        return scipy.signal.lfilter(_as_array("h"), [1.0], _as_array("x"))
    if op == "sosfilt":
        sos = _as_array("sos").reshape((-1, 6))
        return scipy.signal.sosfilt(sos, _as_array("x"))
    if op == "savgol_filter":
        return scipy.signal.savgol_filter(
            _as_array("x"),
            int(p["window_length"]),
            int(p["polyorder"]),
            deriv=int(p["deriv"]),
            delta=float(p["delta"]),
            mode=p["mode"],
        )
    if op == "interp":
        x = _as_array("x")
        return np.interp(_as_array("positions"), np.arange(len(x), dtype=float), x)
    if op == "stats":
        x = _as_array("x")
        return np.array([
            np.mean(x),
            np.var(x, ddof=1),
            np.var(x),
            np.sqrt(np.mean(x * x)),
            scipy.stats.skew(x),
            scipy.stats.kurtosis(x),
        ])

    raise RuntimeError(f"unsupported op: {op}")

y = np.asarray(_compute(), dtype=float).reshape(-1)

t0 = time.perf_counter_ns()
for _ in range(iters):
    _compute()
t1 = time.perf_counter_ns()

print(json.dumps({
    "output": y.tolist(),
    "avg_ns": (t1 - t0) / max(iters, 1),
    "python_version": sys.version.split()[0],
    "numpy_version": np.__version__,
    "scipy_version": scipy.__version__,
}))
"#;

#[derive(Debug, Serialize, Deserialize, Clone)]
struct PythonEval {
    output: Vec<f64>,
    avg_ns: f64,
    python_version: String,
    numpy_version: String,
    scipy_version: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ContractRow {
    case_id: String,
    pearson_r: f64,
    mae: f64,
    rmse: f64,
    max_abs: f64,
    tolerance: f64,
    passed: bool,
    rust_ns: f64,
    python_ns: f64,
    speedup_vs_python: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContractBundle {
    generated_epoch_seconds: u64,
    python_executable: String,
    python_version: String,
    numpy_version: String,
    scipy_version: String,
    rows: Vec<ContractRow>,
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("contracts") => run_contracts(),
        _ => {
            eprintln!("Usage:");
            eprintln!("  cargo run -p xtask -- contracts");
            Ok(())
        }
    }
}

fn run_contracts() -> Result<()> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let out_dir = PathBuf::from(format!("target/contracts/{ts}"));
    fs::create_dir_all(&out_dir).context("creating contract output directory")?;

    let python_bin = detect_python_bin();
    let mut rows = Vec::new();

    // Two tones plus a slow drift, shared by most cases.
    let signal: Vec<f64> = (0..512)
        .map(|i| {
            let t = i as f64 / 48.0;
            (1.3 * t).sin() + 0.4 * (5.1 * t).cos() + 0.02 * t
        })
        .collect();

    // FFT family
    {
        let spectrum = rfft(&signal).map_err(|e| anyhow!("rfft failed: {e}"))?;
        let candidate = interleave(&spectrum);
        let rust_ns = benchmark_avg_ns(200, || {
            rfft(&signal).map(|_| ()).map_err(|e| anyhow!("rfft bench failed: {e}"))
        })?;
        let py = python_eval(&python_bin, "rfft", json!({ "x": signal }), 200)?;
        record_case(&mut rows, "rfft_512", candidate, &py, rust_ns, 1e-9)?;

        let n = 300;
        let short = &signal[..n];
        let spec = rfft(short).map_err(|e| anyhow!("rfft failed: {e}"))?;
        let candidate = irfft(&spec, n).map_err(|e| anyhow!("irfft failed: {e}"))?;
        let rust_ns = benchmark_avg_ns(200, || {
            irfft(&spec, n).map(|_| ()).map_err(|e| anyhow!("irfft bench failed: {e}"))
        })?;
        let py = python_eval(
            &python_bin,
            "irfft",
            json!({ "spec": interleave(&spec), "n": n }),
            200,
        )?;
        record_case(&mut rows, "irfft_300", candidate, &py, rust_ns, 1e-9)?;

        let odd: Vec<f64> = (0..9).map(|i| i as f64).collect();
        let candidate = fftshift(&odd);
        let rust_ns = benchmark_avg_ns(1000, || {
            let _ = fftshift(&odd);
            Ok(())
        })?;
        let py = python_eval(&python_bin, "fftshift", json!({ "x": odd }), 1000)?;
        record_case(&mut rows, "fftshift_odd_9", candidate, &py, rust_ns, 0.0)?;
    }

    // DCT: the scipy unnormalised II and IV carry an extra factor of two. Our
    // DCT-III puts the half-sample shift on the summation index, which scipy
    // does not, so it is checked against a direct numpy evaluation.
    for (variant, ty, op, scale) in [
        (DctVariant::II, 2, "dct", 0.5),
        (DctVariant::III, 3, "dct3_half_sample", 1.0),
        (DctVariant::IV, 4, "dct", 0.5),
    ] {
        let x = &signal[..64];
        let candidate = dct_forward(x, variant).map_err(|e| anyhow!("dct failed: {e}"))?;
        let rust_ns = benchmark_avg_ns(200, || {
            dct_forward(x, variant)
                .map(|_| ())
                .map_err(|e| anyhow!("dct bench failed: {e}"))
        })?;
        let py = python_eval(
            &python_bin,
            op,
            json!({ "x": x, "type": ty, "scale": scale }),
            200,
        )?;
        record_case(&mut rows, &format!("dct{ty}_64"), candidate, &py, rust_ns, 1e-9)?;
    }

    // Windows
    for (kind, name) in [
        (WindowKind::Rectangular, "boxcar"),
        (WindowKind::Hann, "hann"),
        (WindowKind::Hamming, "hamming"),
        (WindowKind::Blackman, "blackman"),
    ] {
        let n = 33;
        let candidate = get_window(kind, n);
        let rust_ns = benchmark_avg_ns(1000, || {
            let _ = get_window(kind, n);
            Ok(())
        })?;
        let py = python_eval(&python_bin, "window", json!({ "name": name, "n": n }), 1000)?;
        record_case(&mut rows, &format!("window_{name}_33"), candidate, &py, rust_ns, 1e-12)?;
    }

    // Spectrogram
    {
        let (m, hop) = (64, 16);
        let mut stft = Stft::try_new(StftConfig {
            fft_size: m,
            hop_size: hop,
            window: WindowKind::Hann,
        })?;
        let candidate = stft
            .spectrogram_alloc(signal.as_slice())
            .map_err(|e| anyhow!("spectrogram failed: {e}"))?
            .into_raw_vec_and_offset()
            .0;
        let rust_ns = benchmark_avg_ns(50, || {
            stft.spectrogram_alloc(signal.as_slice())
                .map(|_| ())
                .map_err(|e| anyhow!("spectrogram bench failed: {e}"))
        })?;
        let py = python_eval(
            &python_bin,
            "spectrogram",
            json!({ "x": signal, "m": m, "hop": hop }),
            50,
        )?;
        record_case(&mut rows, "spectrogram_hann_64_16", candidate, &py, rust_ns, 1e-9)?;
    }

    // FIR design and application
    let h = fir_design_lowpass(31, 0.3, WindowKind::Hamming)
        .map_err(|e| anyhow!("fir design failed: {e}"))?;
    {
        let rust_ns = benchmark_avg_ns(500, || {
            fir_design_lowpass(31, 0.3, WindowKind::Hamming)
                .map(|_| ())
                .map_err(|e| anyhow!("fir design bench failed: {e}"))
        })?;
        let py = python_eval(
            &python_bin,
            "firwin",
            json!({ "taps": 31, "cutoff": 0.3, "window": "hamming" }),
            500,
        )?;
        record_case(&mut rows, "fir_design_31_hamming", h.clone(), &py, rust_ns, 1e-12)?;
    }
    {
        let py = python_eval(
            &python_bin,
            "lfilter_fir",
            json!({ "h": h, "x": signal }),
            200,
        )?;

        let mut kernel = FirFilterKernel::try_new(FirFilterConfig { coeffs: h.clone() })?;
        let candidate = kernel
            .run_alloc(signal.as_slice())
            .map_err(|e| anyhow!("fir direct failed: {e}"))?;
        let rust_ns = benchmark_avg_ns(200, || {
            kernel.reset();
            kernel
                .run_alloc(signal.as_slice())
                .map(|_| ())
                .map_err(|e| anyhow!("fir direct bench failed: {e}"))
        })?;
        record_case(&mut rows, "fir_direct_31", candidate, &py, rust_ns, 1e-12)?;

        let candidate = fir_apply_fft(&h, &signal).map_err(|e| anyhow!("fir fft failed: {e}"))?;
        let rust_ns = benchmark_avg_ns(200, || {
            fir_apply_fft(&h, &signal)
                .map(|_| ())
                .map_err(|e| anyhow!("fir fft bench failed: {e}"))
        })?;
        record_case(&mut rows, "fir_fft_31", candidate, &py, rust_ns, 1e-9)?;
    }

    // Biquad cascade against scipy's second-order sections.
    {
        let sections = reference_biquads();
        let sos: Vec<f64> = sections
            .iter()
            .flat_map(|s| [s.b0, s.b1, s.b2, 1.0, s.a1, s.a2])
            .collect();
        let mut chain = sections.clone();
        let mut candidate = vec![0.0; signal.len()];
        biquad_chain_apply(&mut chain, &signal, &mut candidate)
            .map_err(|e| anyhow!("biquad chain failed: {e}"))?;
        let mut scratch = vec![0.0; signal.len()];
        let rust_ns = benchmark_avg_ns(200, || {
            let mut chain = sections.clone();
            biquad_chain_apply(&mut chain, &signal, &mut scratch)
                .map_err(|e| anyhow!("biquad chain bench failed: {e}"))
        })?;
        let py = python_eval(&python_bin, "sosfilt", json!({ "sos": sos, "x": signal }), 200)?;
        record_case(&mut rows, "biquad_chain_2", candidate, &py, rust_ns, 1e-10)?;
    }

    // Savitzky-Golay
    for (mode, name, window_length, polyorder, deriv) in [
        (SavgolMode::Reflect, "mirror", 11, 3, 0),
        (SavgolMode::Nearest, "nearest", 11, 3, 0),
        (SavgolMode::Wrap, "wrap", 9, 2, 0),
        (SavgolMode::Reflect, "mirror", 15, 4, 1),
    ] {
        let delta = 1.0 / 48.0;
        let candidate = savgol_filter(&signal, window_length, polyorder, deriv, delta, mode)
            .map_err(|e| anyhow!("savgol failed: {e}"))?;
        let rust_ns = benchmark_avg_ns(100, || {
            savgol_filter(&signal, window_length, polyorder, deriv, delta, mode)
                .map(|_| ())
                .map_err(|e| anyhow!("savgol bench failed: {e}"))
        })?;
        let py = python_eval(
            &python_bin,
            "savgol_filter",
            json!({
                "x": signal,
                "window_length": window_length,
                "polyorder": polyorder,
                "deriv": deriv,
                "delta": delta,
                "mode": name,
            }),
            100,
        )?;
        let case_id = format!("savgol_{name}_{window_length}_{polyorder}_d{deriv}");
        record_case(&mut rows, &case_id, candidate, &py, rust_ns, 1e-8)?;
    }

    // Linear resampling and interpolation both sample the table at
    // fractional positions, which np.interp reproduces exactly.
    {
        let (num, den) = (3u32, 2u32);
        let candidate = resample_rational(&signal, num, den, ResampleQuality::Linear)
            .map_err(|e| anyhow!("resample failed: {e}"))?;
        let positions: Vec<f64> = (0..candidate.len())
            .map(|k| k as f64 * den as f64 / num as f64)
            .collect();
        let rust_ns = benchmark_avg_ns(200, || {
            resample_rational(&signal, num, den, ResampleQuality::Linear)
                .map(|_| ())
                .map_err(|e| anyhow!("resample bench failed: {e}"))
        })?;
        let py = python_eval(
            &python_bin,
            "interp",
            json!({ "x": signal, "positions": positions }),
            200,
        )?;
        record_case(&mut rows, "resample_linear_3_2", candidate, &py, rust_ns, 1e-12)?;

        let positions: Vec<f64> = (0..200).map(|k| -3.0 + k as f64 * 2.71).collect();
        let mut candidate = vec![0.0; positions.len()];
        interpolate_linear_into(&signal, &positions, &mut candidate)
            .map_err(|e| anyhow!("interpolate failed: {e}"))?;
        let mut scratch = vec![0.0; positions.len()];
        let rust_ns = benchmark_avg_ns(500, || {
            interpolate_linear_into(&signal, &positions, &mut scratch)
                .map_err(|e| anyhow!("interpolate bench failed: {e}"))
        })?;
        let py = python_eval(
            &python_bin,
            "interp",
            json!({ "x": signal, "positions": positions }),
            500,
        )?;
        record_case(&mut rows, "interp_linear_clamped", candidate, &py, rust_ns, 1e-12)?;
    }

    // Descriptive statistics
    let versions = {
        let run = |x: &[f64]| -> Result<Vec<f64>> {
            let err = |e: ExecInvariantViolation| anyhow!("stats failed: {e}");
            Ok(vec![
                stats::mean(x).map_err(err)?,
                stats::variance(x, false).map_err(err)?,
                stats::variance(x, true).map_err(err)?,
                stats::rms(x).map_err(err)?,
                stats::skewness(x).map_err(err)?,
                stats::kurtosis(x).map_err(err)?,
            ])
        };
        let candidate = run(&signal)?;
        let rust_ns = benchmark_avg_ns(200, || run(&signal).map(|_| ()))?;
        let py = python_eval(&python_bin, "stats", json!({ "x": signal }), 200)?;
        record_case(&mut rows, "stats_moments", candidate, &py, rust_ns, 1e-10)?;
        py
    };

    let bundle = ContractBundle {
        generated_epoch_seconds: ts,
        python_executable: python_bin.to_string_lossy().into_owned(),
        python_version: versions.python_version,
        numpy_version: versions.numpy_version,
        scipy_version: versions
            .scipy_version
            .unwrap_or_else(|| "unknown".to_string()),
        rows,
    };

    write_summary_csv(&out_dir.join("summary.csv"), &bundle.rows)?;
    fs::write(
        out_dir.join("summary.json"),
        serde_json::to_vec_pretty(&bundle).context("serializing summary bundle")?,
    )
    .context("writing summary.json")?;

    println!("Contract artifacts generated in: {}", out_dir.display());
    println!("  - {}", out_dir.join("summary.csv").display());
    println!("  - {}", out_dir.join("summary.json").display());
    println!("  - cases: {}", bundle.rows.len());

    let failed: Vec<&str> = bundle
        .rows
        .iter()
        .filter(|row| !row.passed)
        .map(|row| row.case_id.as_str())
        .collect();
    if !failed.is_empty() {
        bail!("{} contract case(s) out of tolerance: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

fn detect_python_bin() -> PathBuf {
    std::env::var_os("VV_DSP_PYTHON")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON_BIN))
}

fn python_eval(
    python_bin: &Path,
    op: &str,
    payload: serde_json::Value,
    iters: usize,
) -> Result<PythonEval> {
    let envelope = json!({
        "op": op,
        "iters": iters,
        "payload": payload
    });
    let mut child = Command::new(python_bin)
        .arg("-c")
        .arg(PY_REFERENCE_SCRIPT)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning python interpreter at {}", python_bin.display()))?;

    {
        let stdin = child.stdin.as_mut().context("opening python stdin")?;
        let bytes = serde_json::to_vec(&envelope).context("serializing python payload")?;
        stdin
            .write_all(&bytes)
            .context("writing payload to python stdin")?;
    }

    let output = child
        .wait_with_output()
        .context("waiting for python process")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("python execution failed for {op}: {stderr}");
    }
    let stdout = String::from_utf8(output.stdout).context("parsing python stdout utf8")?;
    serde_json::from_str(stdout.trim()).context("parsing python json")
}

fn record_case(
    rows: &mut Vec<ContractRow>,
    case_id: &str,
    candidate: Vec<f64>,
    py: &PythonEval,
    rust_ns: f64,
    tolerance: f64,
) -> Result<()> {
    if candidate.len() != py.output.len() {
        bail!(
            "case {case_id} has mismatched output lengths: rust={}, python={}",
            candidate.len(),
            py.output.len()
        );
    }
    // Tolerances are relative to the reference's peak magnitude.
    let scale = py.output.iter().fold(1.0f64, |acc, v| acc.max(v.abs()));
    let max_abs = max_abs_error(&candidate, &py.output);
    let passed = max_abs <= tolerance * scale;
    println!(
        "{} {case_id}: max_abs={max_abs:.3e}",
        if passed { "ok  " } else { "FAIL" }
    );
    rows.push(ContractRow {
        case_id: case_id.to_string(),
        pearson_r: pearson(&candidate, &py.output),
        mae: mean_abs_error(&candidate, &py.output),
        rmse: root_mean_squared_error(&candidate, &py.output),
        max_abs,
        tolerance,
        passed,
        rust_ns,
        python_ns: py.avg_ns,
        speedup_vs_python: py.avg_ns / rust_ns,
    });
    Ok(())
}

fn interleave(spectrum: &[Cpx]) -> Vec<f64> {
    spectrum.iter().flat_map(|z| [z.re, z.im]).collect()
}

// Two stable lowpass sections with complex pole pairs.
fn reference_biquads() -> Vec<Biquad> {
    vec![
        Biquad::new(
            4.165_992_044_065_786e-4,
            8.331_984_088_131_572e-4,
            4.165_992_044_065_786e-4,
            -1.479_798_894_397_216_8,
            0.558_229_412_897_742,
        ),
        Biquad::new(
            1.0,
            2.0,
            1.0,
            -1.700_964_331_943_526_7,
            0.788_499_739_815_039_8,
        ),
    ]
}

fn benchmark_avg_ns<F>(iters: usize, mut f: F) -> Result<f64>
where
    F: FnMut() -> Result<()>,
{
    let start = Instant::now();
    for _ in 0..iters {
        f()?;
    }
    Ok(start.elapsed().as_nanos() as f64 / iters as f64)
}

fn mean_abs_error(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .sum::<f64>()
        / a.len() as f64
}

fn root_mean_squared_error(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    (a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        / a.len() as f64)
        .sqrt()
}

fn max_abs_error(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        if a == b {
            1.0
        } else {
            0.0
        }
    } else {
        cov / (var_a.sqrt() * var_b.sqrt())
    }
}

fn write_summary_csv(path: &Path, rows: &[ContractRow]) -> Result<()> {
    let mut out = String::new();
    out.push_str(
        "case_id,pearson_r,mae,rmse,max_abs,tolerance,passed,rust_ns,python_ns,speedup_vs_python\n",
    );
    for row in rows {
        out.push_str(&format!(
            "{},{:.12},{:.12},{:.12},{:.12},{:e},{},{:.3},{:.3},{:.6}\n",
            row.case_id,
            row.pearson_r,
            row.mae,
            row.rmse,
            row.max_abs,
            row.tolerance,
            row.passed,
            row.rust_ns,
            row.python_ns,
            row.speedup_vs_python,
        ));
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}

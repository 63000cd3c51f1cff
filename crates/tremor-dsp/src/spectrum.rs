//! Frequency-domain analysis
//!
//! Single-sided amplitude spectrum for visualization and a Welch PSD
//! estimate used by the live variant to auto-detect the dominant tremor
//! frequency.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

/// Single-sided amplitude spectrum
///
/// Strictly positive frequency bins only; DC and the symmetric negative
/// half are dropped. Magnitudes are raw |coefficient| values, not a
/// normalized density.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spectrum {
    pub frequencies: Vec<f64>,
    pub magnitudes: Vec<f64>,
}

/// One-sided power spectral density from Welch's method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerSpectrum {
    pub frequencies: Vec<f64>,
    pub power: Vec<f64>,
}

/// Amplitude spectrum of a signal at DFT resolution `fs / N`
pub fn spectrum(signal: &[f64], fs: f64) -> Spectrum {
    let n = signal.len();
    if n < 2 {
        return Spectrum {
            frequencies: Vec::new(),
            magnitudes: Vec::new(),
        };
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);

    let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft.process(&mut buffer);

    // Strictly positive bins: k in 1..=(n-1)/2. For even n this also
    // drops the Nyquist bin, whose fftfreq convention is negative.
    let last = (n - 1) / 2;
    let mut frequencies = Vec::with_capacity(last);
    let mut magnitudes = Vec::with_capacity(last);
    for k in 1..=last {
        frequencies.push(k as f64 * fs / n as f64);
        magnitudes.push(buffer[k].norm());
    }

    Spectrum {
        frequencies,
        magnitudes,
    }
}

/// Welch PSD estimate: Hann-windowed segments, 50% overlap, averaged
/// modified periodograms with one-sided density scaling.
pub fn welch(signal: &[f64], fs: f64, nperseg: usize) -> PowerSpectrum {
    let n = signal.len();
    if n < 2 {
        return PowerSpectrum {
            frequencies: Vec::new(),
            power: Vec::new(),
        };
    }
    let nperseg = nperseg.min(n).max(2);

    let window: Vec<f64> = (0..nperseg)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / nperseg as f64).cos()))
        .collect();
    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let scale = 1.0 / (fs * window_power);

    let noverlap = nperseg / 2;
    let step = (nperseg - noverlap).max(1);

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(nperseg);

    let bins = nperseg / 2 + 1;
    let mut psd = vec![0.0; bins];
    let mut segments = 0usize;

    let mut start = 0;
    while start + nperseg <= n {
        let segment = &signal[start..start + nperseg];
        let mean = segment.iter().sum::<f64>() / nperseg as f64;

        let mut buffer: Vec<Complex<f64>> = segment
            .iter()
            .zip(&window)
            .map(|(&x, &w)| Complex::new((x - mean) * w, 0.0))
            .collect();
        fft.process(&mut buffer);

        for (k, value) in psd.iter_mut().enumerate() {
            let mut power = buffer[k].norm_sqr() * scale;
            // One-sided: double everything except DC and Nyquist
            if k != 0 && !(nperseg % 2 == 0 && k == nperseg / 2) {
                power *= 2.0;
            }
            *value += power;
        }

        segments += 1;
        start += step;
    }

    if segments > 1 {
        for value in &mut psd {
            *value /= segments as f64;
        }
    }

    let frequencies = (0..bins).map(|k| k as f64 * fs / nperseg as f64).collect();

    PowerSpectrum {
        frequencies,
        power: psd,
    }
}

/// Default Welch segment length for dominant-frequency detection
pub const WELCH_NPERSEG: usize = 1024;

/// Dominant frequency of a signal: Welch PSD argmax, DC bin excluded
pub fn dominant_frequency(signal: &[f64], fs: f64) -> Option<f64> {
    let psd = welch(signal, fs, WELCH_NPERSEG);
    if psd.power.len() < 2 || psd.power.iter().all(|&p| p == 0.0) {
        return None;
    }

    let peak = psd
        .power
        .iter()
        .enumerate()
        .skip(1)
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(k, _)| k)?;

    Some(psd.frequencies[peak])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_spectrum_peak_at_exact_bin() {
        // 5 Hz with N = 1000 at fs = 100 lands exactly on bin 50
        let fs = 100.0;
        let n = 1000;
        let signal = sine(5.0, fs, n);

        let result = spectrum(&signal, fs);
        assert_eq!(result.frequencies.len(), result.magnitudes.len());

        let peak = result
            .magnitudes
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        assert!((result.frequencies[peak] - 5.0).abs() < 1e-9);

        // Away from the peak, leakage should be negligible for an
        // exact-bin sinusoid
        let peak_mag = result.magnitudes[peak];
        for (i, &mag) in result.magnitudes.iter().enumerate() {
            if (i as i64 - peak as i64).abs() > 1 {
                assert!(mag < peak_mag * 1e-6, "bin {} magnitude {}", i, mag);
            }
        }
    }

    #[test]
    fn test_spectrum_excludes_dc_and_negative() {
        let fs = 100.0;
        let signal: Vec<f64> = sine(5.0, fs, 200).iter().map(|v| v + 50.0).collect();

        let result = spectrum(&signal, fs);
        assert!(result.frequencies.iter().all(|&f| f > 0.0));
        assert!(result.frequencies.iter().all(|&f| f < fs / 2.0));
    }

    #[test]
    fn test_welch_peak_location() {
        let fs = 100.0;
        let signal = sine(4.0, fs, 4096);

        let psd = welch(&signal, fs, 1024);
        let peak = psd
            .power
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(k, _)| k)
            .unwrap();

        // Bin spacing is fs/nperseg ~ 0.098 Hz
        assert!((psd.frequencies[peak] - 4.0).abs() < 0.2);
    }

    #[test]
    fn test_welch_clamps_segment_length() {
        let fs = 100.0;
        let signal = sine(4.0, fs, 300);
        let psd = welch(&signal, fs, 1024);
        assert_eq!(psd.power.len(), 300 / 2 + 1);
    }

    #[test]
    fn test_dominant_frequency_ignores_dc() {
        let fs = 100.0;
        // Large offset puts most raw energy at DC; detection must skip it
        let signal: Vec<f64> = sine(6.0, fs, 4096).iter().map(|v| v + 100.0).collect();

        let peak = dominant_frequency(&signal, fs).unwrap();
        assert!((peak - 6.0).abs() < 0.2, "detected {}", peak);
    }

    #[test]
    fn test_dominant_frequency_short_signal() {
        assert!(dominant_frequency(&[1.0], 100.0).is_none());
    }
}

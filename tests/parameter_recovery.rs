mod common;

use common::{mean_var, Generator};
use contdist_rs::diagnostics::goodness_of_fit;
use contdist_rs::{emg, exponential, normal, EmgVariant, FitMethod, FitOptions};
use rand_distr::{Distribution as _, Exp};

fn emg_options() -> FitOptions {
    FitOptions::default()
        .with_fixed("loc", 0.0)
        .with_fixed("scale", 1.0)
        .with_max_iterations(2000)
        .with_tolerance(1e-9)
}

#[test]
fn test_emg_mle_recovers_rate() {
    let (mu, sigma, lambda) = (0.0, 1.0, 0.5);
    let mut gen = Generator::new(2024);
    let data = gen.emg_data(10_000, mu, sigma, lambda);

    let spec = emg(EmgVariant::NumericInversion).unwrap();
    let fit = spec.fit(&data, &emg_options()).unwrap();

    assert!(fit.converged);
    assert_eq!(fit.distribution, "emg");
    assert_eq!(fit.get("loc"), Some(0.0));
    assert_eq!(fit.get("scale"), Some(1.0));

    let l_hat = fit.get("lambda").unwrap();
    assert!(
        (l_hat - lambda).abs() / lambda < 0.1,
        "lambda estimate {} too far from {}",
        l_hat,
        lambda
    );
    assert!((fit.get("mu").unwrap() - mu).abs() < 0.15);
    assert!((fit.get("sigma").unwrap() - sigma).abs() < 0.15);
}

#[test]
fn test_mle_beats_true_parameters_in_sample() {
    let mut gen = Generator::new(7);
    let data = gen.emg_data(5_000, 0.0, 1.0, 0.5);

    let spec = emg(EmgVariant::default()).unwrap();
    let fit = spec.fit(&data, &emg_options()).unwrap();

    let truth = spec.distribution(&[0.0, 1.0, 0.5]).unwrap();
    let true_nll = -truth.log_likelihood(&data).unwrap() / data.len() as f64;
    assert!(fit.objective <= true_nll + 1e-9);

    let fitted = fit.into_distribution(&spec).unwrap();
    let gof = goodness_of_fit(&fitted, &data, 3).unwrap();
    let gof_truth = goodness_of_fit(&truth, &data, 3).unwrap();
    assert!(gof.log_likelihood >= gof_truth.log_likelihood - 1e-6);
    assert!(gof.ks_statistic < 0.03);
}

#[test]
fn test_emg_method_of_moments_recovers_rate() {
    let mut gen = Generator::new(99);
    let data = gen.emg_data(10_000, 0.0, 1.0, 0.5);

    let spec = emg(EmgVariant::default()).unwrap();
    let fit = spec
        .fit(&data, &emg_options().with_method(FitMethod::MethodOfMoments))
        .unwrap();

    assert_eq!(fit.method, FitMethod::MethodOfMoments);
    let l_hat = fit.get("lambda").unwrap();
    assert!((l_hat - 0.5).abs() / 0.5 < 0.15, "lambda {}", l_hat);

    let (m, v) = mean_var(&data);
    let fitted = fit.into_distribution(&spec).unwrap().stats().unwrap();
    assert!((fitted.mean - m).abs() < 1e-3);
    assert!((fitted.variance - v).abs() < 1e-2);
}

#[test]
fn test_normal_location_scale_mle() {
    let mut gen = Generator::new(31);
    let data = gen.normal_data(5_000, 3.0, 2.0);
    let (m, v) = mean_var(&data);

    let fit = normal()
        .unwrap()
        .fit(&data, &FitOptions::default().with_max_iterations(2000))
        .unwrap();

    // MLE of a normal is the sample mean and the biased standard deviation.
    let n = data.len() as f64;
    let sd_mle = (v * (n - 1.0) / n).sqrt();
    assert!((fit.loc - m).abs() < 1e-3);
    assert!((fit.scale - sd_mle).abs() < 1e-3);
    assert!((fit.loc - 3.0).abs() < 0.1);
    assert!((fit.scale - 2.0).abs() < 0.1);
}

#[test]
fn test_exponential_scale_mle_is_sample_mean() {
    let mut gen = Generator::new(5);
    let exp = Exp::new(0.25).unwrap();
    let data: Vec<f64> = (0..5_000).map(|_| exp.sample(&mut gen.rng)).collect();
    let (m, _) = mean_var(&data);

    let fit = exponential()
        .unwrap()
        .fit(
            &data,
            &FitOptions::default()
                .with_fixed("loc", 0.0)
                .with_max_iterations(2000),
        )
        .unwrap();

    assert!(fit.shapes.is_empty());
    assert!((fit.scale - m).abs() / m < 1e-3);
    assert!((fit.scale - 4.0).abs() < 0.3);
}

#[test]
fn test_fit_with_partially_fixed_shapes() {
    let mut gen = Generator::new(12);
    let data = gen.emg_data(5_000, 1.0, 0.5, 2.0);

    let spec = emg(EmgVariant::default()).unwrap();
    let fit = spec
        .fit(&data, &emg_options().with_fixed("sigma", 0.5))
        .unwrap();

    assert_eq!(fit.get("sigma"), Some(0.5));
    assert!((fit.get("mu").unwrap() - 1.0).abs() < 0.05);
    assert!((fit.get("lambda").unwrap() - 2.0).abs() / 2.0 < 0.1);
}

use crate::error::{Result, SchedulerError};

/// Model weights. This is a slice for efficiency, but should always be 21 in length.
pub type Parameters = [f32];

pub static DEFAULT_PARAMETERS: [f32; 21] = [
    0.212, 1.2931, 2.3065, 8.2956, 6.4133, 0.8334, 3.0194, 0.001, 1.8722, 0.1666, 0.796, 1.4835,
    0.0614, 0.2629, 1.6483, 0.6014, 1.8729, 0.5425, 0.0912, 0.0658, 0.1542,
];

pub(crate) const S_MIN: f32 = 0.001;
pub(crate) const S_MAX: f32 = 36500.0;
pub(crate) const D_MIN: f32 = 1.0;
pub(crate) const D_MAX: f32 = 10.0;
pub(crate) const INIT_S_MAX: f32 = 100.0;

pub(crate) fn check_and_fill_parameters(parameters: &Parameters) -> Result<Vec<f32>> {
    let parameters = match parameters.len() {
        0 => DEFAULT_PARAMETERS.to_vec(),
        21 => parameters.to_vec(),
        _ => return Err(SchedulerError::InvalidParameters),
    };
    if parameters.iter().any(|&w| !w.is_finite()) {
        return Err(SchedulerError::InvalidParameters);
    }
    Ok(parameters)
}

pub(crate) fn clip_parameters(parameters: &Parameters) -> Vec<f32> {
    let clamps: [(f32, f32); 21] = [
        (S_MIN, INIT_S_MAX),
        (S_MIN, INIT_S_MAX),
        (S_MIN, INIT_S_MAX),
        (S_MIN, INIT_S_MAX),
        (D_MIN, D_MAX),
        (0.001, 4.0),
        (0.001, 4.0),
        (0.001, 0.75),
        (0.0, 4.5),
        (0.0, 0.8),
        (0.001, 3.5),
        (0.001, 5.0),
        (0.001, 0.25),
        (0.001, 0.9),
        (0.0, 4.0),
        (0.0, 1.0),
        (1.0, 6.0),
        (0.0, 2.0),
        (0.0, 2.0),
        (0.0, 0.8),
        (0.1, 0.8),
    ];

    parameters
        .iter()
        .zip(clamps)
        .map(|(w, (low, high))| w.clamp(low, high))
        .collect()
}

/// Axis mapping used by [`scale`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mapping {
    #[default]
    Linear,
    Logarithmic,
}

/// Maps `value` from the range `[from_low, from_high]` onto `[to_low, to_high]`.
///
/// Either side may be logarithmic; a logarithmic side requires both of its
/// bounds to be positive, otherwise the result is NaN.
#[must_use]
pub fn scale(
    value: f64,
    (from_low, from_high): (f64, f64),
    (to_low, to_high): (f64, f64),
    from: Mapping,
    to: Mapping,
) -> f64 {
    let normalized = match from {
        Mapping::Linear => (value - from_low) / (from_high - from_low),
        Mapping::Logarithmic => (value / from_low).log10() / (from_high / from_low).log10(),
    };
    match to {
        Mapping::Linear => normalized * (to_high - to_low) + to_low,
        Mapping::Logarithmic => to_low * 10f64.powf(normalized * (to_high / to_low).log10()),
    }
}

use crate::gauss::charge;
use crate::laplace::PotentialField;
use crate::model::{Element, ElementKind, ElementList};

/// Vacuum permittivity in F/m.
pub const EPSILON_0: f64 = 8.854_187_812_8e-12;

/// Speed of light in vacuum in m/s.
pub const SPEED_OF_LIGHT: f64 = 2.998e8;

/// Normalized charges on both trace polarities, per volt of excitation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Charges {
    /// Free-space charge on the `Trace+` conductors.
    pub air_pos: f64,
    /// Free-space charge on the `Trace-` conductors, sign flipped.
    pub air_neg: f64,
    /// Charge on the `Trace+` conductors with dielectrics in place.
    pub dielectric_pos: f64,
    /// Charge on the `Trace-` conductors with dielectrics in place, sign
    /// flipped.
    pub dielectric_neg: f64,
}

impl Charges {
    /// Integrates around every trace of `list`.
    ///
    /// `air` must be solved with dielectrics ignored and `dielectric` with
    /// them in place. A polarity without any trace reports NaN.
    #[must_use]
    pub fn measure<A, D>(air: &A, dielectric: &D, list: &ElementList, grid: f64, distance: f64) -> Self
    where
        A: PotentialField + ?Sized,
        D: PotentialField + ?Sized,
    {
        let in_air = |e: &Element| charge(air, None, e, grid, distance);
        let in_dielectric = |e: &Element| charge(dielectric, Some(list), e, grid, distance);

        Self {
            air_pos: total(list, ElementKind::TracePos, in_air),
            air_neg: -total(list, ElementKind::TraceNeg, in_air),
            dielectric_pos: total(list, ElementKind::TracePos, in_dielectric),
            dielectric_neg: -total(list, ElementKind::TraceNeg, in_dielectric),
        }
    }
}

/// Sum of `measure` over every element of `kind`; NaN if there is none.
fn total(list: &ElementList, kind: ElementKind, measure: impl Fn(&Element) -> f64) -> f64 {
    let mut elements = list.of_kind(kind).peekable();
    if elements.peek().is_none() {
        return f64::NAN;
    }
    elements.map(measure).sum()
}

/// Per-unit-length line parameters of one conductor polarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineParameters {
    /// Capacitance with dielectrics, F/m.
    pub capacitance: f64,
    /// Capacitance in free space, F/m.
    pub capacitance_air: f64,
    /// Inductance, H/m.
    pub inductance: f64,
    /// Characteristic impedance, Ω.
    pub impedance: f64,
}

impl LineParameters {
    /// Derives the parameters from the free-space and dielectric charge.
    #[must_use]
    pub fn from_charges(air: f64, dielectric: f64) -> Self {
        let capacitance_air = air * EPSILON_0;
        let capacitance = dielectric * EPSILON_0;
        let inductance = 1.0 / (SPEED_OF_LIGHT * SPEED_OF_LIGHT * capacitance_air);
        Self {
            capacitance,
            capacitance_air,
            inductance,
            impedance: (inductance / capacitance).sqrt(),
        }
    }

    /// Effective relative permittivity seen by the line.
    #[must_use]
    pub fn effective_permittivity(&self) -> f64 {
        self.capacitance / self.capacitance_air
    }
}

/// Parameters of a single-ended or differential line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineAnalysis {
    pub positive: LineParameters,
    pub negative: LineParameters,
}

impl LineAnalysis {
    /// Integrates both fields and derives the parameters of each polarity.
    #[must_use]
    pub fn compute<A, D>(air: &A, dielectric: &D, list: &ElementList, grid: f64, distance: f64) -> Self
    where
        A: PotentialField + ?Sized,
        D: PotentialField + ?Sized,
    {
        Self::from_charges(&Charges::measure(air, dielectric, list, grid, distance))
    }

    #[must_use]
    pub fn from_charges(charges: &Charges) -> Self {
        Self {
            positive: LineParameters::from_charges(charges.air_pos, charges.dielectric_pos),
            negative: LineParameters::from_charges(charges.air_neg, charges.dielectric_neg),
        }
    }

    /// Differential impedance: the series sum of both polarities.
    #[must_use]
    pub fn differential_impedance(&self) -> f64 {
        self.positive.impedance + self.negative.impedance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn free_space_line_has_free_space_impedance_ratio() {
        // Parallel plates, width w, separation h: Q = w / h per volt.
        let q = 1.0 / 0.6;
        let p = LineParameters::from_charges(q, q);
        let eta0 = 1.0 / (EPSILON_0 * SPEED_OF_LIGHT);
        assert_relative_eq!(p.impedance, eta0 * 0.6, max_relative = 1e-9);
        assert_relative_eq!(p.effective_permittivity(), 1.0);
    }

    #[test]
    fn dielectric_scales_impedance() {
        let air = LineParameters::from_charges(2.0, 2.0);
        let loaded = LineParameters::from_charges(2.0, 8.0);
        assert_relative_eq!(loaded.inductance, air.inductance);
        assert_relative_eq!(loaded.impedance, air.impedance / 2.0, max_relative = 1e-12);
        assert_relative_eq!(loaded.effective_permittivity(), 4.0);
    }

    #[test]
    fn missing_polarity_is_nan() {
        let charges = Charges {
            air_pos: 1.5,
            air_neg: f64::NAN,
            dielectric_pos: 3.0,
            dielectric_neg: f64::NAN,
        };
        let analysis = LineAnalysis::from_charges(&charges);
        assert!(analysis.positive.impedance.is_finite());
        assert!(analysis.negative.impedance.is_nan());
        assert!(analysis.differential_impedance().is_nan());
    }
}

//! Solves a microstrip cross-section and prints its line parameters.
//!
//! ```text
//! cargo run --release --example microstrip
//! RUST_LOG=rf2d=debug cargo run --release --example microstrip
//! ```

use std::process::ExitCode;
use std::thread;

use rf2d::analysis::LineAnalysis;
use rf2d::laplace::{Laplace, Outcome, SolveConfig, SolvedField, SolverEvent};
use rf2d::math::Point2;
use rf2d::model::{Element, ElementKind, ElementList};
use rf2d::units;

const TRACE_WIDTH: f64 = 0.3e-3;
const TRACE_HEIGHT: f64 = 35e-6;
const SUBSTRATE_HEIGHT: f64 = 0.2e-3;
const SUBSTRATE_EPSILON_R: f64 = 4.1;
const GND_THICKNESS: f64 = 0.1e-3;
const GAUSS_DISTANCE: f64 = 20e-6;

fn microstrip(config: &mut SolveConfig) -> ElementList {
    let half = (SUBSTRATE_HEIGHT * 5.0).max(TRACE_WIDTH);
    config.area.x_left = -half;
    config.area.x_right = half;
    config.area.y_top = SUBSTRATE_HEIGHT * 5.0;
    config.area.y_bottom = -SUBSTRATE_HEIGHT - GND_THICKNESS;

    let mut list = ElementList::new();
    list.add(Element::rectangle(
        ElementKind::TracePos,
        Point2::new(-TRACE_WIDTH / 2.0, 0.0),
        Point2::new(TRACE_WIDTH / 2.0, TRACE_HEIGHT),
    ));
    list.add(
        Element::rectangle(
            ElementKind::Dielectric,
            Point2::new(-half, 0.0),
            Point2::new(half, -SUBSTRATE_HEIGHT),
        )
        .with_epsilon_r(SUBSTRATE_EPSILON_R),
    );
    list.add(Element::rectangle(
        ElementKind::Gnd,
        Point2::new(-half, -SUBSTRATE_HEIGHT),
        Point2::new(half, -SUBSTRATE_HEIGHT - GND_THICKNESS),
    ));
    list
}

fn solve(config: SolveConfig, list: &ElementList) -> Option<std::sync::Arc<SolvedField>> {
    let mut laplace = Laplace::new()
        .with_config(config)
        .with_sink(|event: SolverEvent| {
            if let SolverEvent::Percentage(p) = event {
                if p % 10 == 0 {
                    tracing::info!(percent = p, "progress");
                }
            }
        });
    if !laplace.start_calculation(list) {
        return None;
    }
    match laplace.wait()? {
        Outcome::Converged { .. } | Outcome::NonConvergent { .. } => laplace.field(),
        Outcome::Aborted { .. } | Outcome::Failed(_) => None,
    }
}

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("microstrip=info".parse().unwrap_or_default())
        .add_directive("rf2d=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut config = SolveConfig {
        threads: thread::available_parallelism().map_or(1, usize::from),
        ..SolveConfig::default()
    };
    let list = microstrip(&mut config);

    let air = SolveConfig {
        ignore_dielectric: true,
        ..config
    };
    let Some(air_field) = solve(air, &list) else {
        tracing::error!("free-space solve failed");
        return ExitCode::FAILURE;
    };
    let Some(dielectric_field) = solve(config, &list) else {
        tracing::error!("dielectric solve failed");
        return ExitCode::FAILURE;
    };

    let line = LineAnalysis::compute(
        air_field.as_ref(),
        dielectric_field.as_ref(),
        &list,
        config.grid,
        GAUSS_DISTANCE,
    )
    .positive;

    println!("C    = {}", units::format(line.capacitance, "F/m", "fpnum ", 4));
    println!("L    = {}", units::format(line.inductance, "H/m", "fpnum ", 4));
    println!("Z0   = {}", units::format(line.impedance, "Ω", " k", 4));
    println!("εeff = {:.3}", line.effective_permittivity());
    ExitCode::SUCCESS
}

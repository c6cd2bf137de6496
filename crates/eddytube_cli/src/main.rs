//! Command-line frontend: runs the reference falling-magnet scenario with a
//! selected integration method and step size, then exports the trajectory.
//!
//! Usage: `eddytube <method> [dt] [end]`, where `<method>` is `euler` for
//! the fixed-step semi-implicit path or any name understood by
//! `Method::parse` for the adaptive path.

use anyhow::{bail, Context, Result};

use eddytube_core::driver::{integrate_adaptive, sample_times, AdaptiveOptions};
use eddytube_core::forces::StepForce;
use eddytube_core::io::write_trajectory;
use eddytube_core::recurrence::integrate_fixed;
use eddytube_core::settings::{cylinder_mass, InitialConditions, SimulationSettings};
use eddytube_core::solvers::Method;

const DEFAULT_DT: f64 = 5e-4;
const DEFAULT_END: f64 = 0.3;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(method_name) = args.next() else {
        bail!("usage: eddytube <method> [dt] [end]");
    };
    let dt = parse_or(args.next(), DEFAULT_DT).context("invalid dt")?;
    let end = parse_or(args.next(), DEFAULT_END).context("invalid end time")?;

    // The reference magnet: a short cylinder of sintered NdFeB.
    let mass = cylinder_mass(6.35e-3, 6.35e-3, 7459.0);
    let settings = SimulationSettings::new(mass, 9.81, dt, end)?;
    let ic = InitialConditions::default();
    let force = StepForce::new(0.06, 0.25, mass * 9.81)?;

    let trajectory = if method_name == "euler" {
        integrate_fixed(&settings, ic, &force)?
    } else {
        let options = AdaptiveOptions {
            method: Method::parse(&method_name)?,
            ..AdaptiveOptions::default()
        };
        let grid = sample_times(end, dt);
        integrate_adaptive(&settings, ic, &force, &grid, &options)?
    };

    // Embed method and step size so parameter sweeps never overwrite each
    // other.
    let filename = format!("ode_{method_name}_dt{dt:e}.dat");
    write_trajectory(&filename, &trajectory)
        .with_context(|| format!("writing {filename}"))?;
    println!(
        "wrote {} samples to {} (t = 0 .. {})",
        trajectory.len(),
        filename,
        trajectory.last().map_or(0.0, |s| s.t)
    );
    Ok(())
}

fn parse_or(arg: Option<String>, default: f64) -> Result<f64> {
    match arg {
        Some(s) => s
            .parse::<f64>()
            .with_context(|| format!("expected a number, got '{s}'")),
        None => Ok(default),
    }
}

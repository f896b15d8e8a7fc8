//! Text report and Bode CSV output.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;

use flyback_core::{BodePlot, Stage};
use flyback_solver::DesignReport;

/// Format `value` with an SI prefix, e.g. `12.45 uF`.
pub fn eng(value: f64, unit: &str) -> String {
    const PREFIXES: [(f64, &str); 7] = [
        (1e9, "G"),
        (1e6, "M"),
        (1e3, "k"),
        (1.0, ""),
        (1e-3, "m"),
        (1e-6, "u"),
        (1e-9, "n"),
    ];
    if !value.is_finite() || value == 0.0 {
        return format!("{} {}", value, unit).trim_end().to_string();
    }
    let magnitude = value.abs();
    let (scale, prefix) = PREFIXES
        .iter()
        .find(|(scale, _)| magnitude >= *scale)
        .copied()
        .unwrap_or((1e-12, "p"));
    format!("{:.4} {}{}", value / scale, prefix, unit)
        .trim_end()
        .to_string()
}

/// Writes aligned `label value` lines under a section heading.
struct Section<'a> {
    out: &'a mut String,
}

impl<'a> Section<'a> {
    fn new(out: &'a mut String, stage: Stage) -> Self {
        let title = stage.name();
        let _ = writeln!(out, "{}", title);
        let _ = writeln!(out, "{}", "=".repeat(title.len()));
        Self { out }
    }

    fn row(&mut self, label: &str, value: f64, unit: &str) -> &mut Self {
        let _ = writeln!(self.out, "  {:<34} {}", label, eng(value, unit));
        self
    }

    /// A dimensionless value, printed without a prefix.
    fn ratio(&mut self, label: &str, value: f64) -> &mut Self {
        let _ = writeln!(self.out, "  {:<34} {:.4}", label, value);
        self
    }

    fn percent(&mut self, label: &str, value: f64) -> &mut Self {
        let _ = writeln!(self.out, "  {:<34} {:.2} %", label, 100.0 * value);
        self
    }

    fn text(&mut self, label: &str, value: impl std::fmt::Display) -> &mut Self {
        let _ = writeln!(self.out, "  {:<34} {}", label, value);
        self
    }
}

/// Render every present stage of `report` as text.
pub fn render_text(report: &DesignReport) -> String {
    let mut out = String::new();
    if let Some(core) = &report.core {
        let _ = writeln!(out, "core: {}\n", core.model);
    }

    if let Some(b) = &report.bulk_capacitor {
        Section::new(&mut out, Stage::BulkCapacitor)
            .row("output power", b.power_out, "W")
            .row("input power", b.power_in, "W")
            .row("capacitance", b.capacitance, "F")
            .row("minimum DC voltage", b.volt_dc_min, "V")
            .row("maximum DC voltage", b.volt_dc_max, "V")
            .row("charge time", b.charge_time, "s")
            .row("capacitor RMS current", b.cap_current_rms, "A");
        out.push('\n');
    }
    if let Some(r) = &report.rectifier_bridge {
        Section::new(&mut out, Stage::RectifierBridge)
            .row("diode peak current", r.peak_current, "A")
            .row("diode average current", r.avg_current, "A")
            .row("diode RMS current", r.rms_current, "A")
            .row("total RMS current", r.rms_current_total, "A");
        out.push('\n');
    }
    if let Some(p) = &report.primary_electrical {
        Section::new(&mut out, Stage::PrimaryElectrical)
            .text("conduction mode", p.mode)
            .percent("maximum duty cycle", p.duty_max)
            .row("magnetizing inductance", p.inductance, "H")
            .row("peak current", p.current_peak, "A")
            .row("RMS current", p.current_rms, "A")
            .row("ripple current", p.current_ripple, "A");
        out.push('\n');
    }
    if let Some(a) = &report.core_area {
        Section::new(&mut out, Stage::CoreArea)
            .row("stored energy", a.energy, "J")
            .row("required area product", a.area_product, "m^4")
            .row("required geometry coefficient", a.geometry_coefficient, "m^5");
        if let Some(core) = &report.core {
            let ok = if a.is_satisfied_by(core) { "yes" } else { "no" };
            Section { out: &mut out }.text("selected core large enough", ok);
        }
        out.push('\n');
    }
    if let Some(e) = &report.electromagnetic {
        let mut s = Section::new(&mut out, Stage::Electromagnetic);
        s.text("primary turns", e.primary_turns)
            .text("search iterations", e.iterations)
            .row("air gap", e.gap_length, "m")
            .ratio("fringing factor", e.fringing_factor)
            .row("peak flux density", e.flux_density, "T")
            .percent("actual duty cycle", e.duty_actual)
            .row("actual reflected voltage", e.reflected_volt_actual, "V");
        for (i, turns) in e.rail_turns.iter().enumerate() {
            s.text(&format!("rail {} turns", i + 1), turns);
        }
        out.push('\n');
    }
    if let Some(w) = &report.winding {
        let mut s = Section::new(&mut out, Stage::Winding);
        for design in w.iter() {
            s.text(
                &design.kind.to_string(),
                format!(
                    "{} turns, {}, {:.2} layers, {}",
                    design.turns,
                    design.gauge,
                    design.layers,
                    eng(design.current_density, "A/m^2")
                ),
            );
        }
        out.push('\n');
    }
    if let Some(s) = &report.switch {
        Section::new(&mut out, Stage::Switch)
            .row("nominal drain voltage", s.volt_ds_nominal, "V")
            .row("maximum drain voltage", s.volt_ds_max, "V")
            .row("RMS current", s.current_rms, "A")
            .row("conduction loss", s.conduction_loss, "W")
            .row("drive loss", s.drive_loss, "W")
            .row("switching loss", s.switching_loss, "W")
            .row("output capacitance loss", s.coss_loss, "W")
            .row("total loss", s.total_loss, "W")
            .row("snubber capacitance", s.snubber.capacitance, "F")
            .row("snubber resistance", s.snubber.resistance, "ohm")
            .row("sense resistance", s.sense.resistance, "ohm");
        out.push('\n');
    }
    if let Some(o) = &report.output {
        let mut s = Section::new(&mut out, Stage::Output);
        for rail in &o.rails {
            s.text(
                &rail.kind.to_string(),
                format!(
                    "{} ESR {}, diode {} / {}",
                    eng(rail.capacitance, "F"),
                    eng(rail.esr, "ohm"),
                    eng(rail.diode_reverse_voltage, "V"),
                    eng(rail.diode_loss, "W")
                ),
            );
        }
        out.push('\n');
    }
    if let Some(f) = &report.output_filter {
        Section::new(&mut out, Stage::OutputFilter)
            .row("cutoff frequency", f.cutoff_frequency, "Hz")
            .row("inductance", f.inductance, "H")
            .row("capacitance", f.capacitance, "F")
            .row("attenuation at f_sw", f.attenuation_db, "dB")
            .row("output ripple", f.ripple_out, "V");
        out.push('\n');
    }
    if let Some(p) = &report.power_stage {
        let mut s = Section::new(&mut out, Stage::PowerStageSmallSignal);
        s.text("conduction mode", p.mode)
            .ratio("DC gain", p.gain)
            .row("output pole", p.omega_p, "rad/s")
            .row("ESR zero", p.omega_z, "rad/s")
            .row("RHP zero", p.omega_rhpz, "rad/s");
        if let Some(q) = p.quality_factor {
            s.ratio("sampling Q", q);
        }
        out.push('\n');
    }
    if let Some(o) = &report.opto_feedback {
        let mut s = Section::new(&mut out, Stage::OptoFeedback);
        s.row("divider upper", o.divider.r_upper, "ohm")
            .row("divider lower", o.divider.r_lower, "ohm")
            .row("LED resistor", o.r_led, "ohm")
            .row("bias resistor", o.r_bias, "ohm")
            .row("compensation capacitor", o.c_comp, "F")
            .row("compensation resistor", o.r_comp, "ohm")
            .row("pull-up capacitor", o.c_pullup, "F")
            .row("target crossover", o.crossover_target, "Hz");
        match (o.loop_crossover, o.phase_margin) {
            (Some(fc), Some(pm)) => {
                s.row("loop crossover", fc, "Hz").row("phase margin", pm, "deg");
            }
            _ => {
                s.text("loop crossover", "none in sweep");
            }
        }
        out.push('\n');
    }
    out
}

/// Write a Bode plot as `frequency_hz,magnitude_db,phase_deg` rows.
pub fn write_bode_csv<W: Write>(plot: &BodePlot, out: &mut W) -> io::Result<()> {
    writeln!(out, "frequency_hz,magnitude_db,phase_deg")?;
    for (f, mag, phase) in plot.points() {
        writeln!(out, "{},{},{}", f, mag, phase)?;
    }
    Ok(())
}

/// Write every available Bode plot of `report` into `dir`.
///
/// Returns the paths written.
pub fn write_bode_files(report: &DesignReport, dir: &Path) -> io::Result<Vec<std::path::PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let plots = [
        ("filter.csv", report.output_filter.as_ref().map(|f| &f.bode)),
        ("power_stage.csv", report.power_stage.as_ref().map(|p| &p.bode)),
        ("loop.csv", report.opto_feedback.as_ref().map(|o| &o.bode)),
    ];
    let mut written = Vec::new();
    for (name, plot) in plots {
        let Some(plot) = plot else { continue };
        let path = dir.join(name);
        let mut file = io::BufWriter::new(std::fs::File::create(&path)?);
        write_bode_csv(plot, &mut file)?;
        file.flush()?;
        log::info!("wrote {} points to {}", plot.len(), path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flyback_catalog::{CoreCatalog, MemoryCatalog};
    use flyback_core::DesignInputs;
    use flyback_solver::run_pipeline;

    #[test]
    fn test_eng_prefixes() {
        assert_eq!(eng(12.449e-6, "F"), "12.4490 uF");
        assert_eq!(eng(65e3, "Hz"), "65.0000 kHz");
        assert_eq!(eng(0.5, ""), "500.0000 m");
        assert_eq!(eng(0.0, "V"), "0 V");
        assert_eq!(eng(330e-12, "F"), "330.0000 pF");
    }

    #[test]
    fn test_bode_csv_layout() {
        let plot = BodePlot {
            frequency: vec![10.0, 100.0],
            magnitude_db: vec![20.0, 0.0],
            phase_deg: vec![-90.0, -135.0],
        };
        let mut buf = Vec::new();
        write_bode_csv(&plot, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["frequency_hz,magnitude_db,phase_deg", "10,20,-90", "100,0,-135"]);
    }

    #[test]
    fn test_report_files_and_text() {
        let core = MemoryCatalog::builtin().unwrap().lookup("EE25/13/7").unwrap();
        let report = run_pipeline(&DesignInputs::default(), &core).unwrap();

        let text = render_text(&report);
        for stage in Stage::ALL {
            assert!(text.contains(stage.name()), "missing section {}", stage);
        }

        let duty = report.primary_electrical.as_ref().unwrap().duty_max;
        let duty_line = format!("{:.2} %", 100.0 * duty);
        assert!(text.contains(&duty_line), "duty printed as:\n{}", text);
        assert!(!text.lines().any(|l| l.contains("duty") && l.trim_end().ends_with(" m")));

        let dir = tempfile::tempdir().unwrap();
        let written = write_bode_files(&report, dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        let loop_csv = std::fs::read_to_string(dir.path().join("loop.csv")).unwrap();
        let opto = report.opto_feedback.as_ref().unwrap();
        assert_eq!(loop_csv.lines().count(), opto.bode.len() + 1);
    }
}

//! Build script for slamstruder-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Parses and validates extruder.toml, then generates `config.rs`
//!   holding it as a `const`

use std::env;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use slamstruder_core::config::{
    ExtruderConfig, HeaterConfig, Limits, RetractConfig, StepperConfig, ThermistorCalibration,
};

fn main() {
    setup_linker();
    generate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Load extruder.toml and write it out as Rust
fn generate_config() {
    println!("cargo:rerun-if-changed=extruder.toml");

    let config_path = Path::new("extruder.toml");
    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read extruder.toml", &e.to_string()),
    };

    let config: ExtruderConfig = match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => fail("Invalid extruder.toml", &e.to_string()),
    };

    if let Err(e) = config.validate() {
        fail("Invalid extruder configuration", &format!("{:?}", e));
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("config.rs"), render(&config)).unwrap();

    println!("cargo:warning=extruder.toml validated successfully");
}

/// Abort the build with a boxed error message
fn fail(title: &str, detail: &str) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<57}║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        format_error_lines(detail)
    );
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.chars().count() > 64 {
                format!("{}...", line.chars().take(61).collect::<String>())
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the configuration as a Rust `const`
///
/// Floats go through `{:?}`, which always prints a valid float literal.
fn render(config: &ExtruderConfig) -> String {
    let mut out = String::new();
    out.push_str("// Generated by build.rs from extruder.toml. Do not edit.\n\n");
    out.push_str("pub const CONFIG: ExtruderConfig = ExtruderConfig {\n");
    render_thermistor(&mut out, &config.thermistor);
    render_heater(&mut out, &config.heater);
    render_stepper(&mut out, &config.stepper);
    render_retract(&mut out, &config.retract);
    render_limits(&mut out, "target_limits", &config.target_limits);
    render_limits(&mut out, "feed_limits", &config.feed_limits);
    out.push_str("};\n");
    out
}

fn render_thermistor(out: &mut String, t: &ThermistorCalibration) {
    writeln!(out, "    thermistor: ThermistorCalibration {{").unwrap();
    writeln!(out, "        coeff_a: {:?},", t.coeff_a).unwrap();
    writeln!(out, "        coeff_b: {:?},", t.coeff_b).unwrap();
    writeln!(out, "        coeff_c: {:?},", t.coeff_c).unwrap();
    writeln!(out, "        pullup_ohms: {},", t.pullup_ohms).unwrap();
    writeln!(out, "        adc_resolution_bits: {},", t.adc_resolution_bits).unwrap();
    writeln!(out, "        adc_averaging: {},", t.adc_averaging).unwrap();
    writeln!(out, "    }},").unwrap();
}

fn render_heater(out: &mut String, h: &HeaterConfig) {
    writeln!(out, "    heater: HeaterConfig {{").unwrap();
    writeln!(
        out,
        "        gains: PidGains::new({:?}, {:?}, {:?}),",
        h.gains.kp, h.gains.ki, h.gains.kd
    )
    .unwrap();
    writeln!(out, "        max_duty: {},", h.max_duty).unwrap();
    writeln!(out, "        duty_full_scale: {},", h.duty_full_scale).unwrap();
    writeln!(out, "        loop_period_us: {},", h.loop_period_us).unwrap();
    writeln!(out, "        fault_policy: SensorFaultPolicy::{:?},", h.fault_policy).unwrap();
    writeln!(out, "    }},").unwrap();
}

fn render_stepper(out: &mut String, s: &StepperConfig) {
    writeln!(out, "    stepper: StepperConfig {{").unwrap();
    writeln!(out, "        mm_per_step: {:?},", s.mm_per_step).unwrap();
    writeln!(out, "        initial_speed_mm_s: {:?},", s.initial_speed_mm_s).unwrap();
    writeln!(out, "        initial_direction: Direction::{:?},", s.initial_direction).unwrap();
    writeln!(out, "        fine_microstepping: {},", s.fine_microstepping).unwrap();
    writeln!(out, "        output_ratio: {:?},", s.output_ratio).unwrap();
    writeln!(out, "    }},").unwrap();
}

fn render_retract(out: &mut String, r: &RetractConfig) {
    writeln!(out, "    retract: RetractConfig {{").unwrap();
    writeln!(out, "        speed_mm_s: {:?},", r.speed_mm_s).unwrap();
    writeln!(out, "        length_mm: {:?},", r.length_mm).unwrap();
    writeln!(out, "    }},").unwrap();
}

fn render_limits(out: &mut String, name: &str, l: &Limits) {
    writeln!(out, "    {}: Limits {{", name).unwrap();
    writeln!(out, "        min: {:?},", l.min).unwrap();
    writeln!(out, "        max: {:?},", l.max).unwrap();
    writeln!(out, "        default: {:?},", l.default).unwrap();
    writeln!(out, "    }},").unwrap();
}

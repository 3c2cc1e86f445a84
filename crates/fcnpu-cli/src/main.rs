//! `fcnpu` — command-line runner for the FC layer accelerator model.
//!
//! ```text
//! USAGE:
//!   fcnpu run <layer.toml>            Run one cycle per input vector
//!   fcnpu run <layer.toml> --trace    ... printing every scheduling step
//!   fcnpu info <layer.toml>           Memory map and per-cycle schedule
//! ```

mod layer_file;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use fcnpu_driver::chip::{port, Activation};
use fcnpu_driver::{Accelerator, SimulatedMemory};
use layer_file::LayerFile;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fcnpu", about = "FC layer accelerator over serial memory", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run one cycle per input vector in the layer file.
    Run {
        /// Layer description (TOML).
        layer: PathBuf,
        /// Override the memory completion latency (steps).
        #[arg(long)]
        latency: Option<u32>,
        /// Print controller state and counters for every step.
        #[arg(long)]
        trace: bool,
        /// Write the final memory image to this file.
        #[arg(long)]
        dump: Option<PathBuf>,
    },
    /// Print the memory map and transfer schedule for a layer file.
    Info {
        /// Layer description (TOML).
        layer: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Run {
            layer,
            latency,
            trace,
            dump,
        } => cmd_run(&layer, latency, trace, dump.as_deref())?,
        Cmd::Info { layer } => cmd_info(&layer)?,
    }

    Ok(())
}

fn cmd_run(path: &Path, latency: Option<u32>, trace: bool, dump: Option<&Path>) -> Result<()> {
    let mut file = LayerFile::load(path)?;
    if let Some(l) = latency {
        file.memory.latency = l;
    }
    if file.params.inputs.is_empty() {
        bail!("{} has no [params] inputs to run", path.display());
    }

    let config = file.config()?;
    let memory = file.memory(&config)?;
    info!(
        "Loaded {}: {}→{} layer, {} input vectors, latency {}",
        path.display(),
        config.input_size,
        config.output_size,
        file.params.inputs.len(),
        memory.latency()
    );
    let mut npu = Accelerator::new(config, memory)?;

    for (cycle, input) in file.params.inputs.iter().enumerate() {
        println!("cycle {cycle}  input {input:?}");
        let results = if trace {
            run_traced(&mut npu, input)?
        } else {
            let report = npu.run(input)?;
            println!(
                "         {} steps  {} reads  {} writes  {} wait  ({:.2?}, {:.0} steps/s)",
                report.steps,
                report.reads,
                report.writes,
                report.wait_steps,
                report.duration,
                report.steps_per_second()
            );
            report.results
        };
        println!("         result {results:?}");
        println!("         port   0x{}", hex_port(&port::pack(&results)));
        // Transfer log only needs to span one cycle.
        npu.memory_mut().clear_history();
    }

    if let Some(out) = dump {
        std::fs::write(out, npu.memory().image())?;
        println!("memory image ({} bytes) written to {}", npu.memory().len(), out.display());
    }
    Ok(())
}

fn run_traced(npu: &mut Accelerator<SimulatedMemory>, input: &[Activation]) -> Result<Vec<Activation>> {
    let total_w = npu.config().weight_count();
    let total_o = npu.config().output_size;
    println!("  step  state            weights   biases    stored    done");

    let mut pending = Some(input);
    let mut step = 0u64;
    loop {
        let out = npu.step(pending.take())?;
        println!(
            "  {:>4}  {} {:<12}  {:>4}/{:<4} {:>3}/{:<4} {:>3}/{:<4} {}",
            step,
            out.state.encoding(),
            out.state.to_string(),
            npu.weight_count(),
            total_w,
            npu.bias_count(),
            total_o,
            npu.stored_count(),
            total_o,
            u8::from(out.done)
        );
        step += 1;
        if out.done {
            return Ok(npu.result().to_vec());
        }
    }
}

/// Port bytes as one hex word, most significant lane first.
fn hex_port(bytes: &[u8]) -> String {
    bytes.iter().rev().map(|b| format!("{b:02x}")).collect()
}

fn cmd_info(path: &Path) -> Result<()> {
    let file = LayerFile::load(path)?;
    let config = file.config()?;

    let regions = [
        ("weights", config.weight_region()),
        ("biases", config.bias_region()),
        ("results", config.output_region()),
    ];

    println!("Layer        : {} → {}", config.input_size, config.output_size);
    for (name, r) in regions {
        println!(
            "{:<13}: 0x{:08x}..0x{:08x}  ({} elements, {} bytes)",
            name,
            r.base,
            r.end(),
            r.elements,
            r.len_bytes()
        );
    }
    println!(
        "Memory       : {} bytes, latency {} steps",
        file.memory.size, file.memory.latency
    );
    match config.timeout_steps {
        Some(t) => println!("Timeout      : {t} steps per transfer"),
        None => println!("Timeout      : none (waits forever)"),
    }

    let reads = config.weight_count() + config.output_size;
    let writes = config.output_size;
    let steps = (reads + writes) as u64 * u64::from(file.memory.latency.max(1)) + 6;
    println!("Per cycle    : {reads} reads, {writes} writes, {steps} steps");
    println!("Output port  : {} bits", port::width_bits(config.output_size));
    Ok(())
}

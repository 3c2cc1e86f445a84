//! Single cycle against simulated memory
//!
//! Preloads a 4→3 layer into a simulated serial memory, runs one cycle and
//! prints the result vector together with the transfer schedule.

use fcnpu_driver::{Accelerator, LayerConfig, Result, SimulatedMemory};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("fcnpu_driver=info")
        .init();

    println!("FC layer accelerator: single cycle\n");

    let config = LayerConfig::contiguous(4, 3, 0x0000)?;
    let mut memory = SimulatedMemory::new(4096).with_latency(4);
    memory.write_elements(
        config.weight_base_addr,
        &[
            1, 2, 3, 4, //
            -1, -1, -1, -1, //
            10, 0, -10, 0,
        ],
    )?;
    memory.write_elements(config.bias_base_addr, &[0, 5, 100])?;

    println!(
        "weights @0x{:04x}  biases @0x{:04x}  results @0x{:04x}",
        config.weight_base_addr, config.bias_base_addr, config.output_base_addr
    );

    let mut npu = Accelerator::new(config, memory)?;
    let activations = [1, 2, 3, 4];
    println!("activations: {activations:?}");

    let report = npu.run(&activations)?;
    println!("results:     {:?}", report.results);
    println!(
        "{} steps, {} reads, {} writes, {} wait steps",
        report.steps, report.reads, report.writes, report.wait_steps
    );

    let out_base = npu.config().output_base_addr;
    let written = npu.memory().read_elements(out_base, report.results.len())?;
    if written == report.results {
        println!("\nWrite-back verification: PASSED");
    } else {
        println!("\nWrite-back verification: FAILED ({written:?})");
    }

    Ok(())
}

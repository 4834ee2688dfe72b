#![deny(warnings)]

mod cli;

use clap::Parser;
use logging::*;
use peakflow::features::loader;
use peakflow::trainer;

fn main() -> anyhow::Result<()> {
    let result = run();
    if let Err(e) = &result {
        error!(DEFAULT, "training failed"; "error" => %e);
    }
    logging::shutdown();
    result
}

fn run() -> anyhow::Result<()> {
    let log = DEFAULT.new(o!("function" => "main"));

    let cli = cli::Cli::parse();
    let csv_path = cli.csv_path()?;
    let output = cli.output_path()?;
    let options = cli.options();
    info!(log, "training";
        "csv" => csv_path.display().to_string(),
        "output" => output.display().to_string(),
        "seed" => options.simulation_seed,
        "test_ratio" => options.test_ratio,
        "alpha" => options.alpha,
    );

    let raw = loader::load_csv(&csv_path)?;
    let bundle = trainer::run_pipeline(&raw, &options)?;
    bundle.save(&output)?;

    let report = bundle.report();
    println!("\n=== Training Results ===");
    println!("Rows:   {} train / {} test", report.train_rows, report.test_rows);
    println!("MAE:    {:.2} L/min", report.mae);
    println!("R2:     {:.3}", report.r2);
    println!("Scale:  {:.4}", bundle.exposure_scale().denominator());
    println!("Saved:  {} ({})", output.display(), bundle.id());
    Ok(())
}

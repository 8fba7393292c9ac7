//! Fill a PDF form from a JSON data file
//! Run with:
//! cargo run --example fill_form -- template.pdf data.json out.pdf [--flatten] [--overlay]
//!
//! Pass `-` as the data file to print the form's schema and sample data
//! instead of filling. Set `RUST_LOG=debug` to trace each widget.

use anyhow::{bail, Context};
use form::{FillOptions, FormWrapper, OverlayOptions, PdfWrapper};
use std::fs;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let flatten = args.iter().any(|a| a == "--flatten");
    let overlay = args.iter().any(|a| a == "--overlay");
    let paths: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let [template, data, output] = paths.as_slice() else {
        bail!("usage: fill_form <template.pdf> <data.json|-> <output.pdf> [--flatten] [--overlay]");
    };

    let template_bytes =
        fs::read(template).with_context(|| format!("failed to read template {template}"))?;

    if data.as_str() == "-" {
        let form = FormWrapper::new(template_bytes)?;
        println!("=== Schema ===\n{}", serde_json::to_string_pretty(&form.schema())?);
        println!("\n=== Sample data ===\n{}", serde_json::to_string_pretty(&form.sample_data())?);
        return Ok(());
    }

    let json = fs::read_to_string(data).with_context(|| format!("failed to read data {data}"))?;

    let filled = if overlay {
        let mut pdf = PdfWrapper::new(template_bytes)?;
        pdf.fill_json(&json, OverlayOptions::default())?;
        pdf.read().to_vec()
    } else {
        let mut form = FormWrapper::new(template_bytes)?;
        let options = FillOptions {
            flatten,
            adobe_mode: true,
        };
        form.fill_json(&json, options)?;
        form.read().to_vec()
    };

    fs::write(output, &filled).with_context(|| format!("failed to write {output}"))?;
    println!("Wrote {} bytes -> {output}", filled.len());
    Ok(())
}

use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate the `cargo:` instructions for the cargo-derived `VERGEN_CARGO_*` env vars
    EmitBuilder::builder().all_cargo().emit()?;

    Ok(())
}

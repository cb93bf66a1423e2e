//! spec2proxy CLI
//!
//! Command-line interface for converting OpenAPI / Swagger specs into Apigee
//! API proxy bundles.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use spec2proxy_common::{ApiProxy, GeneratorError};
use spec2proxy_generator::BundleGenerator;
use spec2proxy_parser::{transform, SpecModel};
use spec2proxy_plugins::{parse_plugin_list, PluginContext, PluginPipeline, PluginRegistry};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "spec2proxy")]
#[command(
    version,
    about = "Generate Apigee API proxy bundles from OpenAPI specs",
    long_about = None
)]
#[command(after_help = "EXAMPLES:\n  \
    # Generate a bundle\n  \
    spec2proxy --oas petstore.yaml --out ./build\n\n  \
    # Apply plugins in order\n  \
    spec2proxy \\\n    \
    --oas petstore.yaml \\\n    \
    --out ./build \\\n    \
    --plugins visibility,apigee_policies,catch_all")]
struct Cli {
    /// Path to the OpenAPI 3 or Swagger 2 spec (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    oas: PathBuf,

    /// Output directory; the bundle is written to <DIR>/apiproxy
    #[arg(long, value_name = "DIR")]
    out: PathBuf,

    /// Comma-separated plugins, applied in order at both checkpoints
    #[arg(long, value_name = "LIST", default_value = "")]
    plugins: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let plugins = parse_plugin_list(&cli.plugins);
    let bundle = generate_command(&cli.oas, &cli.out, &plugins)?;

    println!("\n{}", "✓ Bundle generated successfully!".green().bold());
    println!("  Output: {}", bundle.display().to_string().yellow());
    Ok(())
}

/// `RUST_LOG` wins; otherwise `warn`, or `debug` with `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn generate_command(spec_path: &Path, output: &Path, plugins: &[String]) -> Result<PathBuf> {
    println!("{} Loading spec: {}", "→".cyan(), spec_path.display());
    let mut model = load_spec_model(spec_path)?;

    let mut pipeline = PluginPipeline::new(
        PluginRegistry::with_builtins(),
        PluginContext::for_spec_file(spec_path),
    );

    if plugins.is_empty() {
        debug!("No plugins requested");
    } else {
        println!("{} Plugins: {}", "→".cyan(), plugins.join(", ").yellow());
    }
    pipeline
        .process_spec_model(plugins, &mut model)
        .context("Failed to process spec model")?;

    let mut proxy = transform(&model).context("Failed to build proxy model")?;
    pipeline
        .process_proxy_model(plugins, &mut proxy)
        .context("Failed to process proxy model")?;

    print_summary(&proxy);

    println!("{} Writing bundle to {}", "→".cyan(), output.display());
    let generator = BundleGenerator::new(proxy).context("Invalid proxy model")?;
    generator
        .generate_to_directory(output)
        .context("Failed to write bundle")
}

/// Load the spec, listing every spec model problem before failing
fn load_spec_model(spec_path: &Path) -> Result<SpecModel> {
    match SpecModel::from_file(spec_path) {
        Ok(model) => Ok(model),
        Err(GeneratorError::SpecModel(errors)) => {
            eprintln!("{}", "✗ Spec model errors:".red().bold());
            for error in &errors {
                eprintln!("  • {}", error);
            }
            Err(GeneratorError::SpecModel(errors))
                .with_context(|| format!("Failed to load {}", spec_path.display()))
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load {}", spec_path.display())),
    }
}

fn print_summary(proxy: &ApiProxy) {
    println!("\n{}", "Proxy:".bold());
    println!("  Name: {}", proxy.name.yellow());
    for endpoint in &proxy.proxy_endpoints {
        println!(
            "  Proxy endpoint: {} ({}, {} flows)",
            endpoint.name.cyan(),
            endpoint.base_path,
            endpoint.flows.len()
        );
    }
    for endpoint in &proxy.target_endpoints {
        println!(
            "  Target endpoint: {} ({})",
            endpoint.name.cyan(),
            endpoint.connection.url
        );
    }
    println!("  Policies: {}", proxy.policies.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_requires_oas_and_out() {
        assert!(Cli::try_parse_from(["spec2proxy", "--out", "build"]).is_err());
        assert!(Cli::try_parse_from(["spec2proxy", "--oas", "spec.yaml"]).is_err());

        let cli = Cli::try_parse_from(["spec2proxy", "--oas", "spec.yaml", "--out", "build", "-v"])
            .unwrap();
        assert_eq!(cli.oas, PathBuf::from("spec.yaml"));
        assert!(cli.verbose);
        assert!(parse_plugin_list(&cli.plugins).is_empty());
    }

    #[test]
    fn test_cli_plugin_list() {
        let cli = Cli::try_parse_from([
            "spec2proxy",
            "--oas",
            "spec.yaml",
            "--out",
            "build",
            "--plugins",
            "visibility,catch_all",
        ])
        .unwrap();
        assert_eq!(
            parse_plugin_list(&cli.plugins),
            vec!["visibility".to_string(), "catch_all".to_string()]
        );
    }

    #[test]
    fn test_generate_command_writes_bundle() {
        let temp_dir = TempDir::new().unwrap();
        let spec_path = temp_dir.path().join("petstore.yaml");
        fs::write(
            &spec_path,
            concat!(
                "openapi: 3.0.0\ninfo: {title: Pet Store}\n",
                "paths:\n  /pets:\n    get:\n      operationId: listPets\n",
            ),
        )
        .unwrap();
        let out = temp_dir.path().join("build");

        let bundle = generate_command(&spec_path, &out, &["catch_all".to_string()]).unwrap();

        assert_eq!(bundle, out.join("apiproxy"));
        assert!(bundle.join("pet-store.xml").exists());
        assert!(bundle.join("policies/RF-HTTP404.xml").exists());
    }

    #[test]
    fn test_generate_command_reports_spec_errors() {
        let temp_dir = TempDir::new().unwrap();
        let spec_path = temp_dir.path().join("broken.yaml");
        fs::write(&spec_path, "openapi: 3.0.0\ninfo: {title: ''}\npaths:\n  pets: {}\n").unwrap();

        let err = generate_command(&spec_path, temp_dir.path(), &[]).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load"));
        assert!(!temp_dir.path().join("apiproxy").exists());
    }
}

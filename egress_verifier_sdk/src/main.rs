//! # Egress Verifier CLI
//!
//! Launches a probe workload in the network under test and reports which
//! egress endpoints are reachable. Exit code 0 only when every target passed.

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use egress_verifier_base::prelude::*;
use egress_verifier_sdk::backends::{create_backend, BackendOptions, ImageCatalog, Platform};
use egress_verifier_sdk::create_probe_registry;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "egress-verifier")]
#[command(version)]
#[command(about = "Verify outbound network access from inside a target network")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify egress from one or more targets
    Egress(EgressArgs),

    /// List registered probes
    Probes,
}

#[derive(Args)]
struct EgressArgs {
    /// Subnet to launch in (aws); repeat to verify several subnets in parallel
    #[arg(long = "subnet-id")]
    subnet_ids: Vec<String>,

    /// Machine image (aws) or container image (container)
    #[arg(long)]
    image_id: Option<String>,

    /// TOML file mapping regions to machine images
    #[arg(long)]
    image_catalog: Option<PathBuf>,

    #[arg(long)]
    instance_type: Option<String>,

    #[arg(long)]
    region: Option<String>,

    /// AWS CLI profile
    #[arg(long)]
    profile: Option<String>,

    #[arg(long = "security-group-id")]
    security_group_ids: Vec<String>,

    /// Per-attempt curl timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Probe id (see `egress-verifier probes`)
    #[arg(long)]
    probe: Option<String>,

    #[arg(long, value_enum, default_value = "aws")]
    platform: Platform,

    /// Container network (container platform)
    #[arg(long)]
    network: Option<String>,

    /// Use podman instead of docker (container platform)
    #[arg(long)]
    podman: bool,

    /// Captured console/log file to classify (replay platform)
    #[arg(long)]
    replay_file: Option<String>,

    /// Endpoint list file or directory of YAML files
    #[arg(long)]
    endpoints: Option<PathBuf>,

    /// Skip certificate verification for every endpoint
    #[arg(long)]
    no_tls: bool,

    /// CA directory for TLS verification; repeatable
    #[arg(long = "ca-path")]
    ca_paths: Vec<String>,

    #[arg(long)]
    proxy_cacert: Option<String>,

    #[arg(long)]
    http_proxy: Option<String>,

    #[arg(long)]
    https_proxy: Option<String>,

    #[arg(long)]
    no_proxy: Option<String>,

    /// Maximum concurrent workloads
    #[arg(long)]
    parallelism: Option<usize>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the JSON report(s) here
    #[arg(long)]
    json_out: Option<PathBuf>,

    /// Print the generated script instead of launching anything
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    let result = match cli.command {
        Commands::Probes => list_probes().map(|_| true),
        Commands::Egress(args) => {
            let cancel = CancellationToken::new();
            install_interrupt_handler(&cancel);
            run_egress(args, cancel)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

/// Ctrl-C cancels polling so launched workloads are still terminated
fn install_interrupt_handler(cancel: &CancellationToken) {
    let cancel = cancel.clone();
    let result = ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            eprintln!("Interrupted again, exiting without cleanup");
            std::process::exit(130);
        }
        eprintln!("Interrupt received, cancelling verification and terminating workloads");
        cancel.cancel();
    });
    if let Err(e) = result {
        log::warn!("Could not install interrupt handler: {}", e);
    }
}

fn list_probes() -> Result<(), Box<dyn std::error::Error>> {
    let registry = create_probe_registry()?;
    println!("Available probes:");
    for info in registry.list() {
        let marker = if info.is_default { " (default)" } else { "" };
        println!("  {}{}", info.probe_id, marker);
        if !info.description.is_empty() {
            println!("      {}", info.description);
        }
        println!("      tokens: {} / {}", info.starting_token, info.ending_token);
    }
    Ok(())
}

/// Layer CLI flags over the file/environment configuration
fn build_config(args: &EgressArgs) -> Result<VerifierConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => VerifierConfig::from_toml_file(path)?,
        None => VerifierConfig::default(),
    };

    if let Some(probe) = &args.probe {
        config.probe = probe.clone();
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(region) = &args.region {
        config.region = Some(region.clone());
    }
    if args.no_tls {
        config.no_tls = true;
    }
    if !args.ca_paths.is_empty() {
        config.ca_paths = args.ca_paths.clone();
    }
    if let Some(path) = &args.proxy_cacert {
        config.proxy_cacert = Some(path.clone());
    }
    if let Some(proxy) = &args.http_proxy {
        config.http_proxy = Some(proxy.clone());
    }
    if let Some(proxy) = &args.https_proxy {
        config.https_proxy = Some(proxy.clone());
    }
    if let Some(no_proxy) = &args.no_proxy {
        config.no_proxy = Some(no_proxy.clone());
    }
    if let Some(path) = &args.endpoints {
        config.endpoints_path = Some(path.clone());
    }
    if let Some(parallelism) = args.parallelism {
        config.parallelism = parallelism;
    }
    if args.platform == Platform::Container {
        // Local containers compete for this host's CPUs
        config.parallelism = config.parallelism.min(num_cpus::get().max(1));
    }
    if args.platform == Platform::Container && args.image_id.is_none() {
        log::debug!("No image given; container platform uses its default image");
    }

    config.validate()?;
    Ok(config)
}

fn run_egress(
    args: EgressArgs,
    cancel: CancellationToken,
) -> Result<bool, Box<dyn std::error::Error>> {
    let run_start = Utc::now();
    let config = build_config(&args)?;

    let registry = create_probe_registry()?;
    let probe = registry.get(&config.probe)?;
    log::info!("Using probe '{}'", probe.probe_id());

    let endpoints = EndpointList::load(config.endpoints_path.as_deref(), &config.endpoint_vars())?;
    let urls = endpoints.to_urls();
    log::info!(
        "Loaded {} endpoint URLs ({} TLS-disabled)",
        urls.len(),
        urls.tls_disabled.len()
    );
    let vars = config.to_probe_vars(&urls);

    let image_catalog = match &args.image_catalog {
        Some(path) => Some(ImageCatalog::from_file(path)?),
        None => None,
    };
    let base_options = BackendOptions {
        subnet_id: None,
        image_id: args.image_id.clone(),
        instance_type: args.instance_type.clone(),
        region: config.region.clone(),
        profile: args.profile.clone(),
        security_group_ids: args.security_group_ids.clone(),
        network: args.network.clone(),
        podman: args.podman,
        replay_file: args.replay_file.clone(),
        image_catalog,
    };

    // One backend per subnet on aws; a single target everywhere else
    let subnets: Vec<Option<String>> = if args.platform == Platform::Aws && !args.subnet_ids.is_empty() {
        args.subnet_ids.iter().cloned().map(Some).collect()
    } else {
        vec![None]
    };
    let mut backends = Vec::with_capacity(subnets.len());
    for subnet_id in subnets {
        let options = BackendOptions {
            subnet_id,
            ..base_options.clone()
        };
        backends.push(create_backend(args.platform, &options)?);
    }

    let verifier = EgressVerifier::new(probe.clone(), config.poll_config())
        .with_cancellation(cancel)
        .with_dry_run(args.dry_run)
        .with_tags(config.tags.clone());

    let targets: Vec<VerificationTarget<'_>> = backends
        .iter()
        .map(|backend| VerificationTarget {
            label: backend.target(),
            backend: backend.as_ref(),
            vars: vars.clone(),
        })
        .collect();

    let results = run_parallel(&verifier, &targets, config.parallelism);

    let mut reports = Vec::with_capacity(results.len());
    for result in &results {
        let output = match &result.outcome {
            Ok(output) => output,
            Err(e) => return Err(format!("verifying {}: {}", result.label, e).into()),
        };

        if args.dry_run {
            for line in output.debug_log() {
                println!("{}", line);
            }
        } else {
            for line in output.debug_log() {
                log::debug!("[{}] {}", result.label, line);
            }
        }

        println!("\n=== {} ({}) ===", result.label, result.backend);
        print!("{}", output.summary());

        reports.push(VerificationReport::from_output(
            output,
            probe.probe_id(),
            result.backend.clone(),
            result.label.clone(),
            run_start,
        ));
    }

    let overall = merge_results(results);
    let passed = overall.is_successful();
    println!(
        "\nOverall: {} ({} target{}, {} failures, {} exceptions, {} errors)",
        if passed { "PASS" } else { "FAIL" },
        reports.len(),
        if reports.len() == 1 { "" } else { "s" },
        overall.failures().len(),
        overall.exceptions().len(),
        overall.errors().len()
    );

    if let Some(path) = &args.json_out {
        let json = if reports.len() == 1 {
            reports[0].to_json()?
        } else {
            serde_json::to_string_pretty(&reports)?
        };
        std::fs::write(path, json)?;
        println!("[OK] Report saved to: {}", path.display());
    }

    Ok(passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> EgressArgs {
        let mut argv = vec!["egress-verifier", "egress"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Egress(args) => args,
            Commands::Probes => panic!("expected egress subcommand"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let args = parse(&[
            "--platform",
            "replay",
            "--replay-file",
            "console.log",
            "--timeout",
            "4",
            "--no-tls",
            "--ca-path",
            "/certs",
            "--probe",
            "legacy",
            "--parallelism",
            "3",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.timeout_secs, 4.0);
        assert!(config.no_tls);
        assert_eq!(config.ca_paths, vec!["/certs".to_string()]);
        assert_eq!(config.probe, "legacy");
        assert_eq!(config.parallelism, 3);
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let args = parse(&["--timeout", "0"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_replay_run_classifies_file() {
        let dir = tempfile::tempdir().unwrap();
        let console = dir.path().join("console.log");
        std::fs::write(
            &console,
            "boot\nNV_CURLJSON_BEGIN\n\
             @NV@{\"scheme\":\"HTTPS\",\"exitcode\":0,\"errormsg\":null,\"url\":\"https://quay.io:443\"}\n\
             @NV@{\"scheme\":null,\"exitcode\":7,\"errormsg\":\"Failed to connect\",\"url\":\"https://b.com:443\"}\n\
             NV_CURLJSON_END\n",
        )
        .unwrap();
        let endpoints = dir.path().join("endpoints.yaml");
        std::fs::write(&endpoints, "endpoints:\n  - host: quay.io\n    ports: [443]\n").unwrap();
        let report_path = dir.path().join("report.json");

        let args = parse(&[
            "--platform",
            "replay",
            "--replay-file",
            console.to_str().unwrap(),
            "--endpoints",
            endpoints.to_str().unwrap(),
            "--json-out",
            report_path.to_str().unwrap(),
        ]);
        let passed = run_egress(args, CancellationToken::new()).unwrap();
        assert!(!passed);

        let report = VerificationReport::from_json(&std::fs::read_to_string(&report_path).unwrap())
            .unwrap();
        assert_eq!(report.backend, "replay");
        assert_eq!(report.failures, vec!["https://b.com:443 (Failed to connect)".to_string()]);
    }

    #[test]
    fn test_cancelled_run_is_not_a_pass() {
        let dir = tempfile::tempdir().unwrap();
        let console = dir.path().join("console.log");
        std::fs::write(
            &console,
            "NV_CURLJSON_BEGIN\n\
             @NV@{\"scheme\":\"HTTPS\",\"exitcode\":0,\"errormsg\":null,\"url\":\"https://quay.io:443\"}\n\
             NV_CURLJSON_END\n",
        )
        .unwrap();
        let endpoints = dir.path().join("endpoints.yaml");
        std::fs::write(&endpoints, "endpoints:\n  - host: quay.io\n    ports: [443]\n").unwrap();

        let args = parse(&[
            "--platform",
            "replay",
            "--replay-file",
            console.to_str().unwrap(),
            "--endpoints",
            endpoints.to_str().unwrap(),
        ]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!run_egress(args, cancel).unwrap());
    }
}

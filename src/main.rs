//! labpki CLI application.
//!
//! Creates a lab's root CA and per-node certificates from a JSON lab
//! description.

use clap::{Args, Parser, Subcommand};
use labpki::authority::CertificateAuthority;
use labpki::config::{CaContext, SignerBackend, SignerConfig, DEFAULT_CFSSL};
use labpki::error::Result;
use labpki::lab::{LabDescription, NodeRegistry};
use labpki::signer::{CfsslSigner, LocalSigner, Signer};
use std::fs;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "labpki")]
#[command(about = "Root CA and node TLS certificates for network labs", long_about = None)]
struct Cli {
    /// Enable debug logging, including signer output
    #[arg(short, long, global = true, env = "LABPKI_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the lab's root CA
    Root {
        #[command(flatten)]
        lab: LabArgs,
    },

    /// Create the root CA and a certificate for every node
    Issue {
        #[command(flatten)]
        lab: LabArgs,

        /// Write the populated node records to this file as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct LabArgs {
    /// Lab description file
    #[arg(short = 't', long, env = "LABPKI_LAB")]
    lab: PathBuf,

    /// Lab name prefix (overrides the lab description)
    #[arg(short, long, env = "LABPKI_PREFIX")]
    prefix: Option<String>,

    /// Signer backend: cfssl or local
    #[arg(long, env = "LABPKI_SIGNER", default_value = "cfssl")]
    signer: SignerBackend,

    /// cfssl executable
    #[arg(long, env = "LABPKI_CFSSL", default_value = DEFAULT_CFSSL)]
    cfssl: PathBuf,

    /// Signer timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Root CA CSR template (defaults to the built-in template)
    #[arg(long)]
    root_template: Option<PathBuf>,

    /// Node CSR template (defaults to the built-in template)
    #[arg(long)]
    node_template: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Root { lab } => handle_root_command(&lab, cli.debug),
        Commands::Issue { lab, output } => handle_issue_command(&lab, output, cli.debug),
    };

    if let Err(e) = &result {
        error!(error = %e, "labpki failed");
    }
    result
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn load_lab(args: &LabArgs, debug: bool) -> Result<(CaContext, NodeRegistry)> {
    let mut lab = LabDescription::from_file(&args.lab)?;
    if let Some(prefix) = &args.prefix {
        lab.prefix = prefix.clone();
    }

    let mut ctx = CaContext::for_lab(&lab)
        .with_debug(debug)
        .with_signer(SignerConfig {
            backend: args.signer,
            executable: args.cfssl.clone(),
            leading_args: Vec::new(),
            timeout_secs: args.timeout,
        });
    if let Some(path) = &args.root_template {
        ctx = ctx.with_root_template(path);
    }
    if let Some(path) = &args.node_template {
        ctx = ctx.with_node_template(path);
    }

    Ok((ctx, lab.registry()))
}

fn build_authority(ctx: CaContext) -> CertificateAuthority<Box<dyn Signer>> {
    let signer: Box<dyn Signer> = match ctx.signer.backend {
        SignerBackend::Cfssl => Box::new(CfsslSigner::from_config(&ctx.signer)),
        SignerBackend::Local => Box::new(LocalSigner::new()),
    };
    CertificateAuthority::new(ctx, signer)
}

fn handle_root_command(args: &LabArgs, debug: bool) -> Result<()> {
    let (ctx, mut registry) = load_lab(args, debug)?;
    let mut ca = build_authority(ctx);

    ca.create_root_ca(&mut registry)?;

    println!(
        "✓ Created root CA: {}",
        ca.context().root_cert_path().display()
    );
    println!("  Trust anchor set on {} node(s)", registry.len());

    Ok(())
}

fn handle_issue_command(args: &LabArgs, output: Option<PathBuf>, debug: bool) -> Result<()> {
    let (ctx, mut registry) = load_lab(args, debug)?;
    let mut ca = build_authority(ctx);

    ca.create_root_ca(&mut registry)?;
    println!(
        "✓ Created root CA: {}",
        ca.context().root_cert_path().display()
    );

    let mut first_error = None;
    for (name, result) in ca.create_certs(&mut registry) {
        match result {
            Ok(()) => match registry.get(&name) {
                Some(node) if node.is_bridge() => println!("- Skipped bridge: {}", name),
                Some(node) => println!("✓ Created certificate: {} ({})", name, node.cert_dir().display()),
                None => {}
            },
            Err(e) => {
                println!("✗ Failed certificate: {}: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&registry.nodes())?;
        fs::write(&path, json)?;
        println!("  Node records written to: {}", path.display());
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

//! Build automation for productionapp
//!
//! Usage: cargo xtask <command>

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use xshell::{cmd, Shell};

const BIN: &str = "productionapp";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for productionapp")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the binary
    Build {
        #[arg(long)]
        release: bool,
    },
    /// Run tests
    Test {
        /// Only the tests/ integration suites
        #[arg(long)]
        integration: bool,
        /// Also run tests that need a live cluster (current kubeconfig context)
        #[arg(long)]
        cluster: bool,
    },
    /// Render the manifests a deploy would apply, without a cluster
    Manifests {
        #[arg(long)]
        image: String,
        #[arg(long, default_value = "preview")]
        name: String,
        #[arg(long, default_value = "80")]
        port: u16,
    },
    /// Package a release tarball under dist/
    Dist {
        /// Target triple (e.g., x86_64-unknown-linux-gnu)
        #[arg(long)]
        target: Option<String>,
    },
    /// Install the release binary
    Install {
        #[arg(long, default_value = "/usr/local")]
        prefix: String,
    },
    /// Formatting, clippy and tests
    Ci,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;
    sh.change_dir(project_root()?);

    match cli.command {
        Commands::Build { release } => build(&sh, release),
        Commands::Test {
            integration,
            cluster,
        } => test(&sh, integration, cluster),
        Commands::Manifests { image, name, port } => manifests(&sh, &image, &name, port),
        Commands::Dist { target } => dist(&sh, target),
        Commands::Install { prefix } => install(&sh, &prefix),
        Commands::Ci => ci(&sh),
    }
}

fn build(sh: &Shell, release: bool) -> Result<()> {
    if release {
        cmd!(sh, "cargo build --release --bin {BIN}").run()?;
        println!("✅ target/release/{}", BIN);
    } else {
        cmd!(sh, "cargo build --bin {BIN}").run()?;
        println!("✅ target/debug/{}", BIN);
    }
    Ok(())
}

fn test(sh: &Shell, integration: bool, cluster: bool) -> Result<()> {
    match (integration, cluster) {
        (true, true) => cmd!(sh, "cargo test --test '*' -- --include-ignored").run()?,
        (true, false) => cmd!(sh, "cargo test --test '*'").run()?,
        (false, true) => cmd!(sh, "cargo test --all -- --include-ignored").run()?,
        (false, false) => cmd!(sh, "cargo test --all").run()?,
    }
    println!("✅ All tests passed");
    Ok(())
}

fn manifests(sh: &Shell, image: &str, name: &str, port: u16) -> Result<()> {
    let port = port.to_string();
    cmd!(
        sh,
        "cargo run --quiet --bin {BIN} -- deploy --dry-run --name {name} --image {image} --port {port}"
    )
    .run()?;
    Ok(())
}

fn dist(sh: &Shell, target: Option<String>) -> Result<()> {
    let root = project_root()?;
    let binary_src = match &target {
        Some(triple) => {
            cmd!(sh, "cargo build --release --target {triple}").run()?;
            root.join(format!("target/{}/release/{}", triple, BIN))
        }
        None => {
            cmd!(sh, "cargo build --release").run()?;
            root.join(format!("target/release/{}", BIN))
        }
    };

    let dist_dir = root.join("dist");
    sh.create_dir(&dist_dir)?;
    sh.copy_file(&binary_src, dist_dir.join(BIN))?;

    let version = env!("CARGO_PKG_VERSION");
    let archive_name = match &target {
        Some(triple) => format!("{}-{}-{}.tar.gz", BIN, version, triple),
        None => format!("{}-{}.tar.gz", BIN, version),
    };
    cmd!(sh, "tar -czf {archive_name} -C dist {BIN}")
        .run()
        .context("Failed to create tarball")?;

    println!("✅ {}", archive_name);
    Ok(())
}

fn install(sh: &Shell, prefix: &str) -> Result<()> {
    let binary = project_root()?.join(format!("target/release/{}", BIN));
    if !binary.exists() {
        cmd!(sh, "cargo build --release --bin {BIN}").run()?;
    }

    let bin_dir = Path::new(prefix).join("bin");
    sh.create_dir(&bin_dir)?;
    let install_path = bin_dir.join(BIN);
    sh.copy_file(&binary, &install_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&install_path, std::fs::Permissions::from_mode(0o755))?;
    }

    println!("✅ Installed to: {}", install_path.display());
    Ok(())
}

fn ci(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo fmt --all -- --check").run()?;
    cmd!(sh, "cargo clippy --all-targets --all-features -- -D warnings").run()?;
    test(sh, false, false)?;
    println!("✅ All CI checks passed");
    Ok(())
}

fn project_root() -> Result<PathBuf> {
    match Path::new(env!("CARGO_MANIFEST_DIR")).parent() {
        Some(root) => Ok(root.to_path_buf()),
        None => bail!("xtask must live one level below the workspace root"),
    }
}

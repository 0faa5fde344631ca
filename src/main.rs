//! `passthroughfs`: mirror a local directory at a mount point.
//!
//! # Usage
//!
//! ```bash
//! passthroughfs /srv/data /mnt/mirror
//!
//! # Start from an empty mount point and let other users in
//! passthroughfs --clean-mount-point --allow-other /srv/data /mnt/mirror
//! ```
//!
//! Set `RUST_LOG=debug` to log every filesystem call.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use passthrough_fs::{
    FuseAdapter, LayerExt, MountContext, MountOptions, Passthrough, TracingLayer,
    prepare_mount_point,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "passthroughfs")]
#[command(about = "Mirror a local directory through FUSE")]
struct Args {
    /// Directory whose contents are exposed.
    root: PathBuf,

    /// Where the mirror is mounted.
    mount_point: PathBuf,

    /// Remove and recreate the mount point before mounting.
    #[arg(long)]
    clean_mount_point: bool,

    /// Allow other users to access the mount.
    #[arg(long)]
    allow_other: bool,

    /// Unmount automatically when the process exits.
    #[arg(long)]
    auto_unmount: bool,

    /// Mount read-only.
    #[arg(long)]
    read_only: bool,

    /// Filesystem name for the mount table.
    #[arg(long, default_value = passthrough_fs::DEFAULT_FSNAME)]
    fsname: String,
}

impl Args {
    fn mount_options(&self) -> MountOptions {
        MountOptions {
            fsname: self.fsname.clone(),
            allow_other: self.allow_other,
            auto_unmount: self.auto_unmount,
            read_only: self.read_only,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let ctx = MountContext::new(&args.root)
        .with_context(|| format!("invalid root {}", args.root.display()))?;
    prepare_mount_point(&args.mount_point, args.clean_mount_point)
        .with_context(|| format!("cannot prepare mount point {}", args.mount_point.display()))?;

    info!(
        "files of {} are mirrored at {}",
        ctx.root().display(),
        args.mount_point.display()
    );

    let fs = FuseAdapter::new(Passthrough::new(ctx).layer(TracingLayer::new()));
    let session = fuser::spawn_mount2(fs, &args.mount_point, &args.mount_options().to_fuser())
        .with_context(|| format!("failed to mount at {}", args.mount_point.display()))?;

    let (tx, rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("failed to set Ctrl-C handler")?;
    info!("press Ctrl-C to unmount");
    let _ = rx.recv();

    info!("shutdown signal received, unmounting filesystem");
    session.join();
    Ok(())
}

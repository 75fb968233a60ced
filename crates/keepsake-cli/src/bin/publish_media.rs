//! publish-media: upload the site's timeline photos, featured video and
//! music to the CDN, then save the public URLs to
//! `scripts/cloudinary-uploads.json`.
//!
//! Set CLOUDINARY_CLOUD_NAME and CLOUDINARY_UPLOAD_PRESET (a `.env` file in
//! the working directory is honoured). Run from the project root.

use anyhow::Context;
use clap::Parser;
use keepsake_cdn_client::CdnClient;
use keepsake_cli::{init_tracing, Publisher};
use keepsake_core::PublisherConfig;

#[derive(Parser, Debug)]
#[command(name = "publish-media", version)]
#[command(about = "Upload local media to the CDN and write the URL manifest")]
struct Args {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let _args = Args::parse();

    let config = PublisherConfig::from_env()
        .context("Missing CLOUDINARY_CLOUD_NAME or CLOUDINARY_UPLOAD_PRESET, or invalid settings")?;
    let client = CdnClient::new(&config)?;

    Publisher::new(&config, &client).run().await?;

    Ok(())
}

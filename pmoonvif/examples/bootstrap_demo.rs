//! Bootstrap d'une caméra ONVIF et affichage de la session obtenue.
//!
//! ```text
//! RUST_LOG=pmoonvif=debug cargo run -p pmoonvif --example bootstrap_demo -- \
//!     http://192.168.1.20 admin password [config.yaml]
//! ```

use std::env;
use std::path::PathBuf;

use anyhow::{Context, bail};
use pmoonvif::{Credentials, FeatureTag, OnvifClient, OnvifConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1);
    let (Some(address), Some(username), Some(password)) = (args.next(), args.next(), args.next())
    else {
        bail!("usage: bootstrap_demo <address> <username> <password> [config.yaml]");
    };
    let config_path = args.next().map(PathBuf::from);

    let config = OnvifConfig::load(config_path.as_deref()).context("loading configuration")?;
    let client = OnvifClient::new(config);

    let session = client
        .bootstrap(&address, Credentials::new(username, password))
        .with_context(|| format!("bootstrapping {}", address))?;

    println!("=====================");
    println!("Device       : {}", session.device_service_url());
    println!(
        "Identity     : {} {} (fw {}, s/n {})",
        session.identity.manufacturer,
        session.identity.model,
        session.identity.firmware_version,
        session.identity.serial_number
    );
    println!("Auth         : {}", session.auth_kind);
    println!("Clock skew   : {}s", session.clock_skew_seconds);
    println!();
    for feature in FeatureTag::ALL {
        match session.endpoint_url(feature) {
            Some(url) => println!("- {:<10} {}", feature, url),
            None => println!("- {:<10} (not advertised)", feature),
        }
    }
    println!("=====================");

    Ok(())
}

use crate::config::Config;
use anyhow::Result;
use tracing::info;

/// Prints the effective defaults as TOML. With `save`, writes them to the
/// user config file so later runs start from them.
pub fn run(save: bool) -> Result<()> {
    let config = Config::load();
    print!("{}", config.to_toml()?);

    if save {
        let path = config.save()?;
        info!("Saved config to {}", path.display());
    }
    Ok(())
}

//! Management commands: init

use anyhow::Result;
use devc_config::{write_scaffold, CONFIG_FILE_NAME};

use super::Context;

/// Write a minimal devcontainer.json unless one exists
pub fn init(ctx: &Context) -> Result<()> {
    let path = ctx.config_dir.join(CONFIG_FILE_NAME);
    if write_scaffold(&ctx.config_dir)? {
        println!("Created {}", path.display());
    } else {
        println!("{} already exists", path.display());
    }
    Ok(())
}

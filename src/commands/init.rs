use markpane::config::{DEFAULT_CONFIG_FILE, default_yaml};

use crate::InitArgs;

pub async fn run(args: &InitArgs) -> Result<(), anyhow::Error> {
    let path = if args.path.is_relative() {
        std::env::current_dir()?.join(&args.path)
    } else {
        args.path.clone()
    };

    if !path.exists() {
        if args.create {
            tokio::fs::create_dir_all(&path).await?;
            println!("Created directory {path}", path = path.display());
        } else {
            return Err(anyhow::anyhow!(
                "Directory does not exist: {path}",
                path = path.display()
            ));
        }
    }

    let config_file = path.join(DEFAULT_CONFIG_FILE);
    if config_file.exists() && !args.force {
        return Err(anyhow::anyhow!(
            "Config file already exists: {config_file} (use --force to replace it)",
            config_file = config_file.display()
        ));
    }

    tokio::fs::write(&config_file, default_yaml()).await?;

    println!(
        "Created config file {config_file}",
        config_file = config_file.display()
    );

    Ok(())
}

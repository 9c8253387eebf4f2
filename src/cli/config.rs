use crate::config::generate::generate_starter_config;
use std::fs;

/// Generate a commented starter config.
pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let content = generate_starter_config();

    if stdout {
        print!("{}", content);
        return Ok(());
    }

    let home = dirs::home_dir().ok_or("cannot determine home directory")?;
    let path = home.join(".config/upmon/config.yml");
    if path.exists() {
        return Err(format!(
            "config already exists at {}; use --stdout to print instead",
            path.display()
        )
        .into());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    println!("Wrote starter config to {}", path.display());
    println!("Edit it, then run 'upmon run'.");
    Ok(())
}

//! `gymcoach config`: Configuration commands.

use gymcoach_config::CoachConfig;

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", CoachConfig::default_toml());
    Ok(())
}

pub fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", config_path().display());
    Ok(())
}

pub fn check() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match CoachConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");
            if !config.has_api_key() {
                println!("   ⚠️  No API key set (set GYMCOACH_API_KEY or OPENAI_API_KEY)");
            }
            if config.tools.write_tools_enabled {
                println!("   ⚠️  Write tools enabled by default; every write still needs confirmation");
            }
            println!();
            println!("   Provider:  {} ({})", config.provider, config.api_url);
            println!("   Model:     {}", config.model);
            println!("   Scopes:    {}", config.context.scopes.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "));
            println!("   Tool loops: {}", config.agent.max_tool_loops);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }
    Ok(())
}

fn config_path() -> std::path::PathBuf {
    CoachConfig::config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_valid() {
        assert!(config_path().to_str().unwrap().ends_with("config.toml"));
    }

    #[test]
    fn default_toml_round_trips() {
        let config: CoachConfig = toml::from_str(&CoachConfig::default_toml()).unwrap();
        assert!(config.validate().is_ok());
    }
}

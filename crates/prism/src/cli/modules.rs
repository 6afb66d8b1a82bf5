//! The `prism modules` command.

use clap::{Args, Subcommand};
use prism_core::{Config, ModuleRegistry, DEFAULT_PRIORITY};
use serde::Serialize;

/// Arguments for the `modules` command.
#[derive(Args, Debug)]
pub struct ModulesArgs {
    #[command(subcommand)]
    pub command: ModulesCommand,
}

#[derive(Subcommand, Debug)]
pub enum ModulesCommand {
    /// List registered modules in execution order
    List {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct ModuleEntry {
    name: String,
    priority: Option<i32>,
}

fn entries(registry: &ModuleRegistry) -> Vec<ModuleEntry> {
    registry
        .all()
        .iter()
        .map(|m| ModuleEntry {
            name: m.name().to_string(),
            priority: (m.priority() != DEFAULT_PRIORITY).then(|| m.priority()),
        })
        .collect()
}

pub fn execute(args: ModulesArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        ModulesCommand::List { json } => {
            let registry = ModuleRegistry::builtin(config);
            let entries = entries(&registry);
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    let priority = entry
                        .priority
                        .map_or_else(|| "default".to_string(), |p| p.to_string());
                    println!("{priority:>8}  {}", entry.name);
                }
            }
            if !config.modules.disabled.is_empty() {
                tracing::info!("Disabled by config: {}", config.modules.disabled.join(", "));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_priority_shown_as_none() {
        let entries = entries(&ModuleRegistry::builtin(&Config::default()));
        assert_eq!(entries[0].priority, Some(20));
        assert!(entries.last().unwrap().priority.is_none());
    }
}

//! Project initialization command

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::config::{Config, CONFIG_FILE};

/// Initialize a new project
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Project directory
    #[arg(default_value = ".")]
    pub name: String,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    pub fn execute(&self) -> Result<()> {
        let project_dir = Path::new(&self.name);

        if project_dir.join(CONFIG_FILE).exists() && !self.force {
            anyhow::bail!(
                "{} already exists in {} (use --force to overwrite)",
                CONFIG_FILE,
                project_dir.display()
            );
        }

        eprintln!("{} Initializing new project...\n", "→".blue());

        fs::create_dir_all(project_dir.join("src"))
            .context("Failed to create project directory")?;

        let name = project_name(project_dir);
        self.write_file(project_dir, CONFIG_FILE, &generate_config(&name)?)?;
        self.write_file(project_dir, "src/main.js", MAIN_JS)?;
        self.write_file(project_dir, "index.html", &generate_index_html(&name))?;

        eprintln!("\n{} Project ready! Next steps:\n", "✓".green().bold());
        if self.name != "." {
            eprintln!("  cd {}", self.name);
        }
        eprintln!("  npm install mdui");
        eprintln!("  webroot dev\n");

        Ok(())
    }

    /// Write a scaffold file, leaving existing ones alone unless forced
    fn write_file(&self, dir: &Path, relative: &str, content: &str) -> Result<()> {
        let path = dir.join(relative);
        if path.exists() && !self.force {
            eprintln!("  {} Kept existing {}", "•".dimmed(), relative.cyan());
            return Ok(());
        }

        fs::write(&path, content).with_context(|| format!("Failed to write {}", relative))?;
        eprintln!("  {} Created {}", "✓".green(), relative.cyan());
        Ok(())
    }
}

fn project_name(dir: &Path) -> String {
    dir.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "webui".to_string())
}

fn generate_config(name: &str) -> Result<String> {
    let mut config = Config::default_config();
    config.project.name = name.to_string();
    toml::to_string_pretty(&config).context("Failed to serialize webroot.toml")
}

const MAIN_JS: &str = r#"const mdui = require('mdui');
require('mdui/mdui.css');

document.getElementById('app').textContent = 'Hello from webroot';
"#;

fn generate_index_html(name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>{}</title>
  </head>
  <body>
    <div id="app"></div>
    <script src="/src/main.js"></script>
  </body>
</html>
"#,
        name
    )
}

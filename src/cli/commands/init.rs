use crate::adapters::store::json_store::JsonFileStore;
use crate::cli::{context, output};
use crate::core::errors::{AuditrailError, Result};

/// Execute the `auditrail init` command.
///
/// Creates the store directory, empty data files and a commented default
/// config.
pub fn execute(verbose: bool) -> Result<()> {
    let dir = context::auditrail_dir();

    if dir.exists() {
        return Err(AuditrailError::InvalidConfig {
            detail: format!(
                "An audit store already exists at {} (nothing to do)",
                dir.display()
            ),
        });
    }

    output::header("Auditrail — Initializing store");

    JsonFileStore::create(dir)?;
    output::success(&format!("Created {}/", dir.display()));

    let config_content = r#"[auditrail]
version = "0.3.0"

[capture]
# Fields never written to the trail.
ignored_fields = []
# Separator in the combined "id:display" username form.
user_separator = ":"

[diff]
context_lines = 3

[retention]
default_days = 90
# Per-source overrides:
# [retention.sources]
# articles = 30

# Declare sources to get validation and display values:
# [sources.articles]
# columns = ["title", "body", "created", "modified"]
# required = ["title"]
# display_field = "title"

[monitor]
enabled = false
# [[monitor.rules]]
# type = "mass_delete"
# threshold = 10
# timeframe_minutes = 60
#
# [[monitor.channels]]
# type = "console"
"#;
    std::fs::write(dir.join("config.toml"), config_content)?;
    output::success("Generated config.toml with defaults");

    output::success("Store ready.\n");

    if verbose {
        println!("  Next steps:");
        println!("    auditrail record set articles 1 title=\"Hello\"");
        println!("    auditrail log");
        println!("    auditrail revert articles 1 <entry-id>");
        println!();
    }

    Ok(())
}

//! CLI subcommands — validate, create, update, delete, diff, import.

use crate::core::component::Action;
use crate::core::definition::{parse_credentials_file, parse_definition_file};
use crate::core::diff::GraphDiff;
use crate::core::document;
use crate::core::error::Result;
use crate::core::ops::{self, ImportFilter, Scope};
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a definition without compiling a plan
    Validate {
        /// Path to the definition
        #[arg(short, long, default_value = "infra.yaml")]
        file: PathBuf,
    },

    /// Compile a definition into an all-create plan
    Create {
        /// Path to the definition
        #[arg(short, long, default_value = "infra.yaml")]
        file: PathBuf,

        /// Path to the credentials payload
        #[arg(short, long, default_value = "credentials.yaml")]
        credentials: PathBuf,

        /// Job identifier stamped onto the produced graph
        #[arg(long)]
        id: Option<String>,

        /// Acting user stamped onto the produced graph
        #[arg(long)]
        user: Option<String>,

        /// Write the resulting graph document here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Diff a definition against an existing graph snapshot
    Update {
        /// Path to the definition
        #[arg(short, long, default_value = "infra.yaml")]
        file: PathBuf,

        /// Path to the existing graph document
        #[arg(short, long)]
        graph: PathBuf,

        /// Path to the credentials payload
        #[arg(short, long, default_value = "credentials.yaml")]
        credentials: PathBuf,

        /// Job identifier stamped onto the produced graph
        #[arg(long)]
        id: Option<String>,

        /// Acting user stamped onto the produced graph
        #[arg(long)]
        user: Option<String>,

        /// Write the resulting graph document here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Plan the teardown of an existing graph snapshot
    Delete {
        /// Path to the existing graph document
        #[arg(short, long)]
        graph: PathBuf,

        /// Path to the credentials payload
        #[arg(short, long, default_value = "credentials.yaml")]
        credentials: PathBuf,

        /// Job identifier stamped onto the produced graph
        #[arg(long)]
        id: Option<String>,

        /// Acting user stamped onto the produced graph
        #[arg(long)]
        user: Option<String>,

        /// Write the resulting graph document here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Diff two graph snapshots directly
    Diff {
        /// Graph document to start from
        #[arg(long)]
        from: PathBuf,

        /// Graph document to end at
        #[arg(long)]
        to: PathBuf,
    },

    /// Build a find-placeholder baseline for inventory import
    Import {
        /// Path to the credentials payload
        #[arg(short, long, default_value = "credentials.yaml")]
        credentials: PathBuf,

        /// Restrict the scan to these names
        #[arg(short, long)]
        name: Vec<String>,

        /// Job identifier stamped onto the produced graph
        #[arg(long)]
        id: Option<String>,

        /// Write the resulting graph document here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn dispatch(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Create {
            file,
            credentials,
            id,
            user,
            output,
        } => {
            let definition = parse_definition_file(&file)?;
            let credentials = parse_credentials_file(&credentials)?;
            let scope = scope_for(id, &definition.name, user);
            let diff = ops::create(&scope, &definition, &credentials)?;
            finish(&diff, output.as_deref())
        }
        Commands::Update {
            file,
            graph,
            credentials,
            id,
            user,
            output,
        } => {
            let definition = parse_definition_file(&file)?;
            let credentials = parse_credentials_file(&credentials)?;
            let existing = document::load(&graph)?;
            let scope = scope_for(id, &definition.name, user);
            let diff = ops::update(&scope, &definition, &existing, &credentials)?;
            finish(&diff, output.as_deref())
        }
        Commands::Delete {
            graph,
            credentials,
            id,
            user,
            output,
        } => {
            let credentials = parse_credentials_file(&credentials)?;
            let existing = document::load(&graph)?;
            let scope = scope_for(id, &existing.name, user);
            let diff = ops::delete(&scope, &existing, &credentials)?;
            finish(&diff, output.as_deref())
        }
        Commands::Diff { from, to } => {
            let from_graph = document::load(&from)?;
            let to_graph = document::load(&to)?;
            let scope = scope_for(None, &to_graph.name, None);
            let diff = ops::diff(&scope, &from_graph, &to_graph)?;
            finish(&diff, None)
        }
        Commands::Import {
            credentials,
            name,
            id,
            output,
        } => {
            let credentials = parse_credentials_file(&credentials)?;
            let scope = scope_for(id, "import", None);
            let filter = ImportFilter { names: name };
            let diff = ops::import(&scope, &credentials, &filter)?;
            finish(&diff, output.as_deref())
        }
    }
}

fn scope_for(id: Option<String>, name: &str, user: Option<String>) -> Scope {
    let mut scope = Scope::new(id.unwrap_or_else(|| name.to_string()), name);
    scope.user = user;
    scope
}

fn cmd_validate(file: &std::path::Path) -> Result<()> {
    let definition = parse_definition_file(file)?;
    definition.validate()?;
    let entries = definition.networks.len()
        + definition.instances.len()
        + definition.volumes.len()
        + definition.firewalls.len()
        + definition.nats.len()
        + definition.loadbalancers.len()
        + definition.databases.len();
    println!("Definition '{}' is valid ({} entries)", definition.name, entries);
    Ok(())
}

fn finish(diff: &GraphDiff, output: Option<&std::path::Path>) -> Result<()> {
    print_plan(diff);
    if let Some(path) = output {
        document::save(path, &diff.graph)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn action_symbol(action: Action) -> char {
    match action {
        Action::Create => '+',
        Action::Update => '~',
        Action::Replace => '!',
        Action::Delete => '-',
        Action::Find => '?',
        Action::None => ' ',
    }
}

fn print_plan(diff: &GraphDiff) {
    println!(
        "Planning: {} ({} components)",
        diff.graph.name,
        diff.graph.len()
    );
    println!();

    for component in diff.graph.components() {
        println!("  {} {}", action_symbol(component.action()), component.id());
        for change in diff
            .changelog
            .iter()
            .filter(|c| c.component_id == component.id())
        {
            println!("      {}: {} → {}", change.field, change.old, change.new);
        }
    }

    println!();
    println!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete, {} unchanged.",
        diff.to_create, diff.to_update, diff.to_replace, diff.to_delete, diff.unchanged
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_validate_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("infra.yaml");
        fs::write(
            &path,
            r#"
version: "1.0"
name: demo
networks:
  bar:
    subnet: 10.1.0.0/24
"#,
        )
        .unwrap();
        cmd_validate(&path).unwrap();
    }

    #[test]
    fn test_create_writes_graph_document() {
        let dir = tempfile::tempdir().unwrap();
        let def_path = dir.path().join("infra.yaml");
        let creds_path = dir.path().join("credentials.yaml");
        let out_path = dir.path().join("graph.yaml");
        fs::write(
            &def_path,
            r#"
version: "1.0"
name: demo
networks:
  bar:
    subnet: 10.1.0.0/24
instances:
  foo:
    image: debian-13
    cpus: 1
    memory: 2048
    network: bar
"#,
        )
        .unwrap();
        fs::write(
            &creds_path,
            "access_key: AKIA000\nsecret_key: secret\ndatacenter: eu-west-1\n",
        )
        .unwrap();

        dispatch(Commands::Create {
            file: def_path,
            credentials: creds_path,
            id: Some("job-1".to_string()),
            user: Some("ops".to_string()),
            output: Some(out_path.clone()),
        })
        .unwrap();

        let graph = document::load(&out_path).unwrap();
        assert_eq!(graph.id, "job-1");
        assert_eq!(graph.user.as_deref(), Some("ops"));
        assert!(graph.component("instance::foo").is_some());
    }

    #[test]
    fn test_action_symbols() {
        assert_eq!(action_symbol(Action::Create), '+');
        assert_eq!(action_symbol(Action::Delete), '-');
        assert_eq!(action_symbol(Action::Replace), '!');
    }
}

//! Command-line interface for gqlc.
//!
//! # Usage
//!
//! ```bash
//! # Check a type bundle for dangling type references
//! gqlc check shop_bundle.json
//!
//! # List the types of a bundle
//! gqlc types shop_bundle.json --kind object
//!
//! # Print the refetch query for a node, and the types it depends on
//! gqlc node shop_bundle.json Product gid://shop/Product/1 --field title --track
//!
//! # Send it
//! gqlc node shop_bundle.json Product gid://shop/Product/1 --url http://localhost:4000/graphql
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use gqlc_builder::{BuildResult, FieldOptions, OperationBuilder, TypeRecorder, TypeTracker};
use gqlc_runtime::DecodedValue;
use gqlc_schema::{TypeBundle, TypeKind, NODE_FIELD};
use gqlc_sdk::{Client, HttpTransport};
use gqlc_syntax::Operation;
use serde_json::Map;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "gqlc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindFilter {
    Object,
    Interface,
    Union,
    Enum,
    Scalar,
    Input,
}

impl KindFilter {
    fn matches(self, kind: TypeKind) -> bool {
        matches!(
            (self, kind),
            (Self::Object, TypeKind::Object)
                | (Self::Interface, TypeKind::Interface)
                | (Self::Union, TypeKind::Union)
                | (Self::Enum, TypeKind::Enum)
                | (Self::Scalar, TypeKind::Scalar)
                | (Self::Input, TypeKind::InputObject)
        )
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a type bundle for dangling type references
    Check {
        /// Type bundle JSON file
        bundle: PathBuf,
    },

    /// List the types of a bundle
    Types {
        /// Type bundle JSON file
        bundle: PathBuf,

        /// Only list types of this kind
        #[arg(short, long, value_enum)]
        kind: Option<KindFilter>,
    },

    /// Build the `node(id:)` query for a node type
    Node {
        /// Type bundle JSON file
        bundle: PathBuf,

        /// Concrete node type
        type_name: String,

        /// Node id
        id: String,

        /// Fields to select (defaults to `id`)
        #[arg(short, long = "field")]
        fields: Vec<String>,

        /// Print the types the query depends on
        #[arg(long)]
        track: bool,

        /// Send the query to this endpoint and print the result
        #[arg(long)]
        url: Option<String>,
    },

    /// Print version information
    Version,
}

pub async fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Check { bundle } => check_bundle(&bundle, cli.verbose),
        Commands::Types { bundle, kind } => list_types(&bundle, kind),
        Commands::Node {
            bundle,
            type_name,
            id,
            fields,
            track,
            url,
        } => {
            let bundle = Arc::new(load_bundle(&bundle)?);
            fetch_node(bundle, &type_name, &id, &fields, track, url.as_deref()).await
        }
        Commands::Version => {
            println!("gqlc {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    }
}

fn load_bundle(path: &Path) -> Result<TypeBundle, Box<dyn std::error::Error>> {
    let bundle = TypeBundle::from_path(path)?;
    debug!(path = %path.display(), types = bundle.len(), "loaded type bundle");
    Ok(bundle)
}

fn check_bundle(path: &Path, verbose: bool) -> Result<i32, Box<dyn std::error::Error>> {
    if verbose {
        println!("{} {}", "Checking".blue(), path.display());
    }

    let bundle = load_bundle(path)?;
    let issues = bundle.validate();

    if issues.is_empty() {
        println!(
            "{} {} ({} types)",
            "OK".green().bold(),
            path.display(),
            bundle.len()
        );
        return Ok(0);
    }

    eprintln!("{} {}", "Error".red().bold(), path.display());
    for issue in &issues {
        eprintln!("  {} {}", "-->".blue(), issue);
    }
    Ok(1)
}

fn list_types(path: &Path, kind: Option<KindFilter>) -> Result<i32, Box<dyn std::error::Error>> {
    let bundle = load_bundle(path)?;

    let mut types: Vec<_> = bundle
        .types()
        .filter(|ty| kind.map_or(true, |kind| kind.matches(ty.kind)))
        .collect();
    types.sort_by(|a, b| a.name.cmp(&b.name));

    for ty in types {
        let node = if ty.implements_node { " node" } else { "" };
        println!(
            "{:<32} {}{}",
            ty.name.bold(),
            ty.kind.as_str().dimmed(),
            node.cyan()
        );
    }
    Ok(0)
}

/// Builds `node(id: <id>) { ... on <type_name> { <fields> } }`.
pub fn node_query(
    bundle: &TypeBundle,
    type_name: &str,
    id: &str,
    fields: &[String],
    recorder: &dyn TypeRecorder,
) -> BuildResult<Operation> {
    OperationBuilder::query(bundle)
        .recorder(recorder)
        .build(|root| {
            root.add_with(NODE_FIELD, FieldOptions::new().arg("id", id), |node| {
                node.add_inline_fragment_on(type_name, |ty| {
                    if fields.is_empty() {
                        return ty.add_field("id");
                    }
                    for field in fields {
                        ty.add_field(field)?;
                    }
                    Ok(())
                })
            })
        })
}

async fn fetch_node(
    bundle: Arc<TypeBundle>,
    type_name: &str,
    id: &str,
    fields: &[String],
    track: bool,
    url: Option<&str>,
) -> Result<i32, Box<dyn std::error::Error>> {
    match bundle.get(type_name) {
        Some(ty) if ty.implements_node => {}
        Some(_) => {
            eprintln!("{} `{}` is not a node type", "Error".red().bold(), type_name);
            return Ok(1);
        }
        None => {
            eprintln!("{} unknown type `{}`", "Error".red().bold(), type_name);
            return Ok(1);
        }
    }

    let tracker = TypeTracker::new();
    if track {
        tracker.start_tracking();
    }
    let operation = node_query(&bundle, type_name, id, fields, &tracker)?;
    println!("{operation}");
    if track {
        println!("{} {}", "types:".dimmed(), tracker.tracked_types().join(", "));
    }

    let Some(url) = url else {
        return Ok(0);
    };

    let client = Client::new(bundle, HttpTransport::new(url));
    let response = client.send(&operation, Map::new()).await?;
    for error in &response.errors {
        eprintln!("{} {}", "error:".red().bold(), error.message);
    }

    let node = response
        .model
        .as_ref()
        .and_then(|root| root.model().get(NODE_FIELD))
        .and_then(DecodedValue::as_object);
    match node {
        Some(node) => {
            for (key, value) in node.model().values() {
                println!("{}: {}", key.bold(), render_value(value));
            }
            Ok(0)
        }
        None => {
            println!("{}", "node not found".yellow());
            Ok(1)
        }
    }
}

/// One-line rendering of a decoded value.
pub fn render_value(value: &DecodedValue) -> String {
    match value {
        DecodedValue::Null => "null".to_string(),
        DecodedValue::Scalar(json) => json.to_string(),
        DecodedValue::Object(object) => {
            let model = object.model();
            match model.id() {
                Some(id) => format!("{} {}", model.type_name(), id),
                None => model.type_name().to_string(),
            }
        }
        DecodedValue::List(items) => {
            let items: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", items.join(", "))
        }
        DecodedValue::Connection(connection) => format!(
            "{} nodes{}",
            connection.len(),
            if connection.has_next_page() { ", more" } else { "" }
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop_bundle() -> TypeBundle {
        TypeBundle::from_json_str(include_str!("../../../fixtures/shop_bundle.json")).unwrap()
    }

    #[test]
    fn test_cli_parse() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_node_command_args() {
        let cli = Cli::parse_from([
            "gqlc",
            "node",
            "bundle.json",
            "Product",
            "gid://shop/Product/1",
            "--field",
            "title",
            "-f",
            "handle",
            "--track",
        ]);
        match cli.command {
            Commands::Node {
                type_name,
                fields,
                track,
                url,
                ..
            } => {
                assert_eq!(type_name, "Product");
                assert_eq!(fields, vec!["title", "handle"]);
                assert!(track);
                assert!(url.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_node_query() {
        let bundle = shop_bundle();
        let tracker = TypeTracker::new();
        tracker.start_tracking();

        let fields = vec!["title".to_string(), "handle".to_string()];
        let operation =
            node_query(&bundle, "Product", "gid://shop/Product/1", &fields, &tracker).unwrap();
        assert_eq!(
            operation.to_string(),
            r#"query { node(id: "gid://shop/Product/1") { id __typename ... on Product { title handle } } }"#
        );

        let tracked = tracker.tracked_types();
        assert!(tracked.contains(&"Node".to_string()));
        assert!(tracked.contains(&"Product".to_string()));
    }

    #[test]
    fn test_node_query_defaults_to_id() {
        let bundle = shop_bundle();
        let operation = node_query(
            &bundle,
            "Collection",
            "gid://shop/Collection/1",
            &[],
            &TypeTracker::new(),
        )
        .unwrap();
        assert!(operation.to_string().contains("... on Collection { id }"));
    }

    #[test]
    fn test_kind_filter() {
        assert!(KindFilter::Input.matches(TypeKind::InputObject));
        assert!(!KindFilter::Object.matches(TypeKind::Interface));
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&DecodedValue::Null), "null");
        assert_eq!(
            render_value(&DecodedValue::Scalar(serde_json::json!("Bowler"))),
            r#""Bowler""#
        );
        assert_eq!(
            render_value(&DecodedValue::List(vec![
                DecodedValue::Scalar(serde_json::json!(1)),
                DecodedValue::Null,
            ])),
            "[1, null]"
        );
    }

    #[test]
    fn test_check_fixture() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/shop_bundle.json");
        assert_eq!(check_bundle(&path, false).unwrap(), 0);
        assert_eq!(list_types(&path, Some(KindFilter::Interface)).unwrap(), 0);
    }
}

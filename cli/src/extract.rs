#![deny(missing_docs)]

//! # Extract Command
//!
//! Maps command-line flags onto [`PipelineOptions`] and runs the extraction.

use std::path::PathBuf;

use oas2js_core::{
    run, AppResult, CircularPolicy, CompositeSpec, ConvertOptions, PipelineOptions, RunReport,
    TitlePolicy, DRAFT_2020_12,
};

/// Arguments for schema extraction.
#[derive(clap::Args, Debug, Clone)]
pub struct ExtractArgs {
    /// OpenAPI document to read (YAML or JSON).
    pub input: PathBuf,

    /// Directory receiving one `<title>.json` per schema. Created if missing.
    pub out_dir: PathBuf,

    /// Emit cyclic schemas with local `$defs` instead of failing.
    #[clap(long, env = "OAS2JS_ALLOW_CIRCULAR")]
    pub allow_circular: bool,

    /// Skip untitled body schemas instead of failing.
    #[clap(long, env = "OAS2JS_LENIENT")]
    pub lenient: bool,

    /// Synthesize a schema from collected ones, e.g. `Order=Customer,Cart`.
    /// Repeatable; `;` separates several specs in the environment variable.
    #[clap(long = "compose", value_name = "NAME=A,B", env = "OAS2JS_COMPOSE", value_delimiter = ';')]
    pub composites: Vec<CompositeSpec>,

    /// `$schema` URI stamped on every output file.
    #[clap(long, value_name = "URI", env = "OAS2JS_DIALECT", default_value = DRAFT_2020_12)]
    pub dialect: String,

    /// Leave `$schema` out of the output files.
    #[clap(long, conflicts_with = "dialect")]
    pub no_dialect: bool,

    /// Keep `x-*` extension keywords.
    #[clap(long)]
    pub keep_extensions: bool,
}

impl ExtractArgs {
    /// The pipeline settings these flags describe.
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            circular: if self.allow_circular {
                CircularPolicy::Share
            } else {
                CircularPolicy::Reject
            },
            titles: if self.lenient {
                TitlePolicy::Lenient
            } else {
                TitlePolicy::Strict
            },
            composites: self.composites.clone(),
            convert: ConvertOptions {
                dialect: (!self.no_dialect).then(|| self.dialect.clone()),
                keep_extensions: self.keep_extensions,
            },
        }
    }
}

/// Executes the extraction.
pub fn execute(args: &ExtractArgs) -> AppResult<RunReport> {
    run(&args.input, &args.out_dir, &args.options())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Parser, Debug)]
    struct Harness {
        #[clap(flatten)]
        args: ExtractArgs,
    }

    fn parse(argv: &[&str]) -> ExtractArgs {
        Harness::try_parse_from(std::iter::once("oas2js").chain(argv.iter().copied()))
            .unwrap()
            .args
    }

    #[test]
    fn test_defaults() {
        let options = parse(&["in.yaml", "out"]).options();
        assert_eq!(options, PipelineOptions::default());
    }

    #[test]
    fn test_flags_map_to_options() {
        let options = parse(&[
            "in.yaml",
            "out",
            "--allow-circular",
            "--lenient",
            "--compose",
            "Order=Customer, Cart",
            "--compose",
            "Pair=A,B",
            "--no-dialect",
            "--keep-extensions",
        ])
        .options();

        assert_eq!(options.circular, CircularPolicy::Share);
        assert_eq!(options.titles, TitlePolicy::Lenient);
        assert_eq!(
            options.composites,
            vec![
                CompositeSpec::new("Order", ["Customer", "Cart"]),
                CompositeSpec::new("Pair", ["A", "B"]),
            ]
        );
        assert_eq!(options.convert.dialect, None);
        assert!(options.convert.keep_extensions);
    }

    #[test]
    fn test_custom_dialect() {
        let options = parse(&["in.yaml", "out", "--dialect", "urn:custom"]).options();
        assert_eq!(options.convert.dialect.as_deref(), Some("urn:custom"));
    }

    #[test]
    fn test_malformed_composite_is_usage_error() {
        let result = Harness::try_parse_from(["oas2js", "in.yaml", "out", "--compose", "NoSources"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_execute_writes_files() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("openapi.json");
        fs::write(
            &input,
            r#"{"paths": {"/a": {"post": {"requestBody": {"content": {"application/json":
                {"schema": {"title": "Foo", "type": "object", "x-internal": true}}}}}}}}"#,
        )
        .unwrap();
        let out = dir.path().join("schemas");

        let args = parse(&[input.to_str().unwrap(), out.to_str().unwrap()]);
        let report = execute(&args).unwrap();
        assert_eq!(report.written, vec![out.join("Foo.json")]);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("Foo.json")).unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!({
                "$schema": DRAFT_2020_12,
                "title": "Foo",
                "type": "object"
            })
        );
    }

    #[test]
    fn test_execute_missing_input_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        let args = parse(&[missing.to_str().unwrap(), dir.path().to_str().unwrap()]);
        assert!(execute(&args).is_err());
    }
}

//! JSON input, config files and fragment output

use percolate::ast::build::*;
use percolate::{compile_fragments, compile_json, parse_json, CompileOptions, Error, LocationData};
use pretty_assertions::assert_eq;
use std::io::Write;

mod json {
    use super::*;
    use pretty_assertions::assert_eq;

    const PROGRAM: &str = r#"{
        "type": "Block",
        "expressions": [
            {
                "type": "Assign",
                "variable": {"type": "Value", "base": {"type": "Literal", "kind": "Identifier", "value": "a"}},
                "value": {"type": "Value", "base": {"type": "Literal", "kind": "Number", "value": "1"}},
                "loc": {"firstLine": 0, "firstColumn": 0, "lastLine": 0, "lastColumn": 4}
            }
        ]
    }"#;

    #[test]
    fn test_compile_json_program() {
        let options = CompileOptions::default().with_bare(true);
        assert_eq!(compile_json(PROGRAM, &options).unwrap(), "var a;\n\na = 1;\n");
    }

    #[test]
    fn test_top_level_array() {
        let json = r#"[{"type": "Literal", "kind": "Identifier", "value": "a"}]"#;
        let program = parse_json(json).unwrap();
        assert_eq!(program, vec![ident("a")]);
    }

    #[test]
    fn test_builder_trees_survive_serialization() {
        let tree = assign(id("f"), func(vec![param("x")], vec![call(id("g"), vec![id("x")])]));
        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(parse_json(&json).unwrap(), vec![tree]);
    }

    #[test]
    fn test_unknown_node_type() {
        let err = parse_json(r#"{"type": "Goto"}"#).unwrap_err();
        assert!(matches!(err, Error::AstError { .. }));
        assert!(err.to_string().starts_with("AstError: "));
    }
}

mod config {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"bare": true, "locals": ["a"]}}"#).unwrap();
        let options = CompileOptions::load(file.path()).unwrap();
        assert!(options.bare);
        let js = percolate::compile(vec![assign(id("a"), num("1"))], &options).unwrap();
        assert_eq!(js, "a = 1;\n");
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CompileOptions::load(dir.path().join("percolate.json")).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}

mod fragments {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fragments_keep_node_locations() {
        let location = LocationData::new(0, 0, 4);
        let program = vec![assign(id("a"), num("1")).with_loc(Some(location))];
        let options = CompileOptions::default().with_bare(true);
        let fragments = compile_fragments(program, &options).unwrap();
        let assign = fragments
            .iter()
            .find(|f| f.code == " = ")
            .expect("assignment operator fragment");
        assert_eq!(assign.location, Some(location));
        assert_eq!(assign.node_type, "Assign");
    }

    #[test]
    fn test_fragments_serialize_for_source_maps() {
        let options = CompileOptions::default().with_bare(true);
        let fragments = compile_fragments(vec![id("a")], &options).unwrap();
        let json = serde_json::to_value(&fragments).unwrap();
        let entries = json.as_array().unwrap();
        let name = entries.iter().find(|f| f["code"] == "a").unwrap();
        assert_eq!(name["nodeType"], "Literal");
        assert!(name["location"].is_null());
    }
}

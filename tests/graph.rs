use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

use reqtree::{build_graph, render_tree, BuildOptions, ModuleNode, ModulePath};

#[test]
fn renders_the_reference_scenario() {
    let temp = TempDir::new().unwrap();
    temp.child("index.js")
        .write_str("require('path');\nrequire('./a.js');\n")
        .unwrap();
    temp.child("a.js")
        .write_str("require('./b/index.js');\nrequire('./c.json');\n")
        .unwrap();
    temp.child("b/index.js")
        .write_str("require('../c.json');\n")
        .unwrap();
    temp.child("c.json").write_str("{}\n").unwrap();

    let entry = temp.child("index.js").path().canonicalize().unwrap();
    let rendered = render_tree(&entry, false, false).unwrap();

    let expected = format!(
        "{}\n\
         ├── path\n\
         └── a.js\n\
         \x20   ├── b/index.js\n\
         \x20   │   └── c.json\n\
         \x20   └── c.json\n",
        entry.display()
    );
    assert_eq!(rendered, expected);
}

#[test]
fn resolves_the_readdir_foreach_idiom() {
    let temp = TempDir::new().unwrap();
    temp.child("lib/index.js")
        .write_str(
            "var fs = require('fs'),\n\
             \x20   path = require('path');\n\
             \n\
             fs.readdirSync(__dirname).forEach(function (filepath) {\n\
             \x20 if (filepath !== 'index.js' && path.extname(filepath) === '.js') {\n\
             \x20   require(path.resolve(__dirname, filepath));\n\
             \x20 }\n\
             });\n",
        )
        .unwrap();
    temp.child("lib/a.js").write_str("require('./b.js');\n").unwrap();
    temp.child("lib/b.js").write_str("").unwrap();
    temp.child("lib/c.js").write_str("").unwrap();

    let entry = temp.child("lib/index.js").path().canonicalize().unwrap();
    let rendered = render_tree(&entry, false, true).unwrap();

    let expected = format!(
        "{}\n\
         ├── fs\n\
         ├── path\n\
         ├── a.js\n\
         │   └── b.js\n\
         ├── b.js\n\
         └── c.js\n",
        entry.display()
    );
    assert_eq!(rendered, expected);
}

#[test]
fn dynamic_calls_stay_unresolved_without_the_flag() {
    let temp = TempDir::new().unwrap();
    temp.child("index.js")
        .write_str("var name = './a.js';\nrequire(name);\n")
        .unwrap();
    temp.child("a.js").write_str("").unwrap();

    let entry = temp.child("index.js").path().canonicalize().unwrap();
    let rendered = render_tree(&entry, false, false).unwrap();

    assert!(predicate::str::contains("dynamic load  code=> require(name)").eval(&rendered));
    assert!(!predicate::str::contains("a.js").eval(&rendered));
}

#[test]
fn shebang_entry_files_parse() {
    let temp = TempDir::new().unwrap();
    temp.child("cli.js")
        .write_str("#!/usr/bin/env node\nrequire('./impl.js');\n")
        .unwrap();
    temp.child("impl.js").write_str("").unwrap();

    let entry = temp.child("cli.js").path().canonicalize().unwrap();
    let rendered = render_tree(&entry, false, false).unwrap();
    assert!(predicate::str::contains("└── impl.js").eval(&rendered));
}

#[test]
fn cycles_render_without_recursing_forever() {
    let temp = TempDir::new().unwrap();
    temp.child("a.js").write_str("require('./b.js');\n").unwrap();
    temp.child("b.js").write_str("require('./a.js');\n").unwrap();

    let entry = temp.child("a.js").path().canonicalize().unwrap();
    let rendered = render_tree(&entry, false, false).unwrap();

    let expected = format!(
        "{}\n\
         └── b.js\n\
         \x20   └── a.js\n",
        entry.display()
    );
    assert_eq!(rendered, expected);
}

#[test]
fn depth_limit_is_configurable() {
    let temp = TempDir::new().unwrap();
    temp.child("one.js").write_str("require('./two.js');\n").unwrap();
    temp.child("two.js").write_str("require('./three.js');\n").unwrap();
    temp.child("three.js").write_str("").unwrap();

    let entry = temp.child("one.js").path().canonicalize().unwrap();
    let options = BuildOptions {
        depth_limit: 1,
        ..Default::default()
    };
    let tree = build_graph(&entry, &options).unwrap();

    let two = temp.child("two.js").path().canonicalize().unwrap();
    let ModuleNode::Expanded(two_tree) = tree.get(&ModulePath::File(two)).unwrap() else {
        panic!("two.js should be expanded at depth 1");
    };
    let three = temp.child("three.js").path().canonicalize().unwrap();
    assert_eq!(
        two_tree.get(&ModulePath::File(three)),
        Some(&ModuleNode::Unexpanded)
    );
}

#[test]
fn two_runs_render_identically() {
    let temp = TempDir::new().unwrap();
    temp.child("index.js")
        .write_str("require('fs');\nrequire('./a.js');\nrequire(os);\n")
        .unwrap();
    temp.child("a.js").write_str("require('path');\n").unwrap();

    let entry = temp.child("index.js").path().canonicalize().unwrap();
    let first = render_tree(&entry, false, false).unwrap();
    let second = render_tree(&entry, false, false).unwrap();
    assert_eq!(first, second);
}

#[test]
fn missing_entry_is_an_error() {
    let temp = TempDir::new().unwrap();
    let missing = temp.child("missing.js").path().to_path_buf();
    assert!(render_tree(&missing, false, false).is_err());
}

use codexport_core::{
    Config, ExportLimits, ExportRules, ExportSelection, detect_stack, export_project,
    export_to_writer, parse_list,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn numbered_lines(count: usize) -> String {
    (1..=count).map(|i| format!("line {}\n", i)).collect()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn section<'a>(output: &'a str, relative: &str) -> Option<&'a str> {
    let header = format!("\n=== {} ===\n\n", relative);
    let start = output.find(&header)? + header.len();
    let rest = &output[start..];
    let end = rest.find("\n=== ").unwrap_or(rest.len());
    Some(&rest[..end])
}

#[test]
fn python_project_with_vendor_dir_and_long_file() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("proj");
    write(&root, "a.py", &numbered_lines(50));
    write(&root, "node_modules/x.js", "console.log(1);\n");
    write(&root, "big.py", &numbered_lines(2000));

    let rules = ExportRules::new(&parse_list(".py"), &parse_list("node_modules"), None);
    let output_path = temp_dir.path().join("out").join("exported_code.txt");
    let report = export_project(
        &root,
        &rules,
        &ExportSelection::Entire,
        ExportLimits::default(),
        &output_path,
    )
    .unwrap();

    assert_eq!(report.included, vec!["a.py", "big.py"]);
    assert_eq!(report.truncated, vec!["big.py"]);
    assert!(report.skipped.is_empty());

    let output = fs::read_to_string(&output_path).unwrap();
    assert!(!output.contains("x.js"));
    assert_eq!(section(&output, "a.py").unwrap(), numbered_lines(50) + "\n");

    let big = section(&output, "big.py").unwrap();
    assert_eq!(big.lines().count(), 1000);
    assert!(big.ends_with("line 1000\n"));
    assert!(!big.contains("line 1001"));
}

#[test]
fn rerun_is_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "z.rs", "fn z() {}\n");
    write(root, "src/lib.rs", "pub mod a;\n");
    write(root, "src/a.rs", "pub fn a() {}\n");
    write(root, "target/debug/build.rs", "generated\n");

    let rules = ExportRules::new(&parse_list(".rs"), &parse_list("target"), None);
    let run = || {
        let mut buf = Vec::new();
        export_to_writer(
            root,
            &rules,
            &ExportSelection::Entire,
            ExportLimits::default(),
            &mut buf,
        )
        .unwrap();
        buf
    };
    let first = run();
    assert_eq!(first, run());
    let text = String::from_utf8(first).unwrap();
    let a = text.find("=== src/a.rs ===").unwrap();
    let lib = text.find("=== src/lib.rs ===").unwrap();
    let z = text.find("=== z.rs ===").unwrap();
    assert!(a < lib && lib < z);
}

#[test]
fn explicit_selection_with_depth_limit() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "a.py", "a\n");
    write(root, "pkg/b.py", "b\n");
    write(root, "pkg/deep/c.py", "c\n");

    let rules = ExportRules::new(&parse_list(".py"), &[], Some(1));
    let selection = ExportSelection::from_paths(["pkg/b.py", "pkg/deep/c.py"]);
    let mut buf = Vec::new();
    let report =
        export_to_writer(root, &rules, &selection, ExportLimits::default(), &mut buf).unwrap();

    assert_eq!(report.included, vec!["pkg/b.py"]);
    assert_eq!(report.skipped, vec!["a.py"]);
}

#[test]
fn shared_signature_resolves_to_first_registered_stack() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "package.json", "{}");

    let mut config = Config::default();
    config.stacks.clear();
    config
        .create_stack("Svelte", parse_list(".svelte"), vec![], parse_list("package.json"))
        .unwrap();
    config
        .create_stack("Vue", parse_list(".vue"), vec![], parse_list("package.json"))
        .unwrap();

    assert_eq!(detect_stack(temp_dir.path(), &config), Some("Svelte"));
}

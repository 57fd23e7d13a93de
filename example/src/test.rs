use std::fs;

use boilerplate::{Renderer, UserConfig, Value};
use tempfile::TempDir;

use super::{namespace, plan, templates_dir};

fn renderer() -> Renderer {
    Renderer::new(UserConfig::from_iter([("author", "King Tubby")]))
}

#[test]
fn renders_bundled_templates() {
    let dest = TempDir::new().unwrap();
    let written = renderer()
        .render_directory(templates_dir(), dest.path(), &namespace("dub"))
        .unwrap();
    assert_eq!(written.len(), 4);

    let readme = fs::read_to_string(dest.path().join("README.md")).unwrap();
    assert_eq!(
        readme,
        "# dub\n\n### dub, generated from templates\n\nRun the test suite from `tests/`.\n\n## Dependencies\n\nrequests\n"
    );

    let license = fs::read_to_string(dest.path().join("LICENSE")).unwrap();
    assert!(license.contains(" King Tubby\n"));
    assert!(!license.contains("{{"));

    let docs = fs::read_to_string(dest.path().join("docs").join("index.md")).unwrap();
    assert!(docs.starts_with("# dub documentation\n"));
}

#[test]
fn optional_sections_collapse() {
    let mut ns = namespace("bare");
    ns.insert("plan", plan("bare").with("tests", false).with("deps", Vec::<String>::new()));
    let readme = renderer()
        .render_file(templates_dir().join("README.md"), &ns)
        .unwrap();
    assert_eq!(readme, "# bare\n\n### bare, generated from templates\n");

    let setup = renderer()
        .render_file(templates_dir().join("setup.cfg"), &ns)
        .unwrap();
    assert!(setup.ends_with("packages = find:\n"));
    assert!(setup.contains("author = King Tubby\n"));
}

#[test]
fn configured_author_wins_over_default() {
    let ns = renderer().namespace(&namespace("dub"));
    assert_eq!(ns.get("author"), Some(&Value::from("King Tubby")));
}

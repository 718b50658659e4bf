use std::path::Path;

const TABLES: [(&str, &str); 2] = [
    ("catalogs/extensions.json", "extensions"),
    ("catalogs/globs.json", "globs"),
];

const MANIFEST: &str = "catalogs/detectors";
const KNOWN_DETECTORS: [&str; 5] = ["magic", "extension", "glob", "text", "shell"];

fn main() {
    for (path, field) in TABLES {
        validate_table_file(Path::new(path), field);
    }
    validate_manifest(Path::new(MANIFEST));
    assert!(
        Path::new("catalogs/magic.mime").exists(),
        "\n\nCATALOG BUILD ERROR: catalogs/magic.mime not found\n"
    );
    set_build_dependencies();
}

fn read_file(path: &Path) -> String {
    assert!(
        path.exists(),
        "\n\nCATALOG BUILD ERROR: File not found\n\
         Path: {}\n",
        path.display()
    );

    std::fs::read_to_string(path).unwrap_or_else(|e| {
        panic!(
            "\n\nCATALOG BUILD ERROR: Failed to read file\n\
             Path: {}\n\
             Error: {e}\n",
            path.display()
        );
    })
}

fn validate_table_file(path: &Path, field: &str) {
    let contents = read_file(path);

    let table: serde_json::Value = serde_json::from_str(&contents).unwrap_or_else(|e| {
        panic!(
            "\n\nCATALOG BUILD ERROR: Invalid JSON\n\
             Path: {}\n\
             Error: {e}\n\
             Hint: Check for missing commas, brackets, or invalid syntax.\n",
            path.display()
        );
    });

    assert!(
        table.get("version").and_then(serde_json::Value::as_str).is_some(),
        "\n\nCATALOG BUILD ERROR: {} missing 'version' string\n",
        path.display()
    );

    let entries = table
        .get(field)
        .and_then(serde_json::Value::as_object)
        .unwrap_or_else(|| {
            panic!(
                "\n\nCATALOG BUILD ERROR: {} must have a top-level '{field}' object\n",
                path.display()
            );
        });

    for (key, types) in entries {
        let types = types.as_array().unwrap_or_else(|| {
            panic!(
                "\n\nCATALOG BUILD ERROR: {}: '{key}' must map to an array of MIME types\n",
                path.display()
            );
        });
        assert!(
            !types.is_empty(),
            "\n\nCATALOG BUILD ERROR: {}: '{key}' has no MIME types\n",
            path.display()
        );
        for mime_type in types {
            let valid = mime_type.as_str().is_some_and(is_valid_mime_type);
            assert!(
                valid,
                "\n\nCATALOG BUILD ERROR: {}: '{key}' has invalid MIME type {mime_type}\n\
                 Types must look like 'media/sub'.\n",
                path.display()
            );
        }
    }

    println!(
        "cargo:warning=Validated {}: {} entries",
        path.display(),
        entries.len()
    );
}

fn is_valid_mime_type(s: &str) -> bool {
    let token_ok = |t: &str| {
        !t.is_empty() && !t.chars().any(|c| c == '/' || c == ';' || c == ',' || c.is_whitespace())
    };
    s.split_once('/')
        .is_some_and(|(media, sub)| token_ok(media) && token_ok(sub))
}

fn validate_manifest(path: &Path) {
    let contents = read_file(path);
    let mut count = 0;
    for (i, line) in contents.lines().enumerate() {
        let id = line.trim();
        if id.is_empty() || id.starts_with('#') {
            continue;
        }
        assert!(
            KNOWN_DETECTORS.contains(&id),
            "\n\nCATALOG BUILD ERROR: {} line {}: unknown detector '{id}'\n\
             Known detectors: {}\n",
            path.display(),
            i + 1,
            KNOWN_DETECTORS.join(", ")
        );
        count += 1;
    }
    assert!(
        count > 0,
        "\n\nCATALOG BUILD ERROR: {} lists no detectors\n",
        path.display()
    );
}

fn set_build_dependencies() {
    // Tell cargo to rerun if the embedded tables change
    for (path, _) in TABLES {
        println!("cargo:rerun-if-changed={path}");
    }
    println!("cargo:rerun-if-changed={MANIFEST}");
    println!("cargo:rerun-if-changed=catalogs/magic.mime");

    // Tell cargo to rerun if build.rs changes
    println!("cargo:rerun-if-changed=build.rs");
}
